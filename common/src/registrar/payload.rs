// Notification payload codec
//
// Push payments carry a payload selecting the operation the registrar
// should perform with the received funds. The wire form is a fixed-width
// selector followed by the operation arguments; today the set has a
// single member, subdomain registration.

use thiserror::Error;

use crate::{
    config::{OP_REGISTER_SUBDOMAIN, SELECTOR_SIZE},
    crypto::{Hash, HASH_SIZE},
    serializer::{Reader, ReaderError, Serializer, Writer},
};

#[derive(Debug, Clone, Error)]
pub enum PayloadError {
    #[error("Truncated payload: {0}")]
    Truncated(#[from] ReaderError),

    #[error("Unknown operation selector {0:#010x}")]
    UnknownSelector(u32),

    #[error("{0} trailing bytes after operation arguments")]
    TrailingBytes(usize),
}

/// Operations a registrar accepts through the push-payment channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrarCall {
    /// Register the child of the registrar's root node for the sender
    /// of the payment. `label` is the label hash of the subdomain.
    RegisterSubdomain { label: Hash },
}

impl RegistrarCall {
    /// Decode a notification payload, rejecting anything that is not an
    /// exact encoding of a known operation.
    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut reader = Reader::new(payload);
        let selector = reader.read_u32()?;
        let call = match selector {
            OP_REGISTER_SUBDOMAIN => RegistrarCall::RegisterSubdomain {
                label: reader.read_hash()?,
            },
            other => return Err(PayloadError::UnknownSelector(other)),
        };

        if reader.size() > 0 {
            return Err(PayloadError::TrailingBytes(reader.size()));
        }
        Ok(call)
    }
}

impl Serializer for RegistrarCall {
    fn write(&self, writer: &mut Writer) {
        match self {
            RegistrarCall::RegisterSubdomain { label } => {
                writer.write_u32(OP_REGISTER_SUBDOMAIN);
                writer.write_hash(label);
            }
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let selector = reader.read_u32()?;
        match selector {
            OP_REGISTER_SUBDOMAIN => Ok(RegistrarCall::RegisterSubdomain {
                label: reader.read_hash()?,
            }),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        match self {
            RegistrarCall::RegisterSubdomain { .. } => SELECTOR_SIZE + HASH_SIZE,
        }
    }
}
