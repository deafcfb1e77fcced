use crate::crypto::Hash;

// Reserved identifier of the registry root node, assigned to the deployer
// at registry genesis
pub const ROOT_NODE: Hash = Hash::zero();

// Atomic units per whole token (18 decimals)
pub const COIN_VALUE: u64 = 1_000_000_000_000_000_000;

// Width in bytes of a notification payload operation selector
pub const SELECTOR_SIZE: usize = 4;

// Operation selector for "register subdomain" notifications (b"regs")
pub const OP_REGISTER_SUBDOMAIN: u32 = 0x7265_6773;
