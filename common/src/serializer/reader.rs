use crate::crypto::{Hash, HASH_SIZE};
use thiserror::Error;

use super::Serializer;

#[derive(Debug, Clone, Error)]
pub enum ReaderError {
    #[error("Not enough bytes available: requested {requested}, remaining {remaining}")]
    NotEnoughBytes { requested: usize, remaining: usize },

    #[error("Invalid value")]
    InvalidValue,
}

/// Cursor over an immutable byte slice.
pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, total: 0 }
    }

    fn read_raw(&mut self, count: usize) -> Result<&'a [u8], ReaderError> {
        if self.size() < count {
            return Err(ReaderError::NotEnoughBytes {
                requested: count,
                remaining: self.size(),
            });
        }

        let bytes = &self.bytes[self.total..self.total + count];
        self.total += count;
        Ok(bytes)
    }

    pub fn read<T: Serializer>(&mut self) -> Result<T, ReaderError> {
        T::read(self)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        Ok(self.read_raw(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        let bytes = self.read_raw(4)?;
        let array = bytes.try_into().map_err(|_| ReaderError::InvalidValue)?;
        Ok(u32::from_be_bytes(array))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReaderError> {
        let bytes = self.read_raw(8)?;
        let array = bytes.try_into().map_err(|_| ReaderError::InvalidValue)?;
        Ok(u64::from_be_bytes(array))
    }

    pub fn read_bytes_32(&mut self) -> Result<[u8; 32], ReaderError> {
        let bytes = self.read_raw(32)?;
        bytes.try_into().map_err(|_| ReaderError::InvalidValue)
    }

    pub fn read_hash(&mut self) -> Result<Hash, ReaderError> {
        let bytes = self.read_raw(HASH_SIZE)?;
        let array = bytes.try_into().map_err(|_| ReaderError::InvalidValue)?;
        Ok(Hash::new(array))
    }

    /// Remaining unread bytes
    pub fn size(&self) -> usize {
        self.bytes.len() - self.total
    }

    pub fn total_read(&self) -> usize {
        self.total
    }
}
