// RNS core library
//
// A hierarchical name ownership registry (`registry`) and a delegated
// subdomain sale mechanism (`registrar`) gated by fungible-token payment
// (`token`). The execution substrate is assumed to apply one operation at
// a time; see the registrar module for the ordering discipline around the
// two payment protocols.

pub mod config;
pub mod crypto;
pub mod name;
pub mod registrar;
pub mod registry;
pub mod serializer;
pub mod token;
