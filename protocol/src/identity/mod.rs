//! # Identity Module
//!
//! Account identities for the vault. Depositors, administrators, the vault
//! instance and the custodied asset are all plain 20-byte [`Address`]es;
//! authorization is decided by comparing addresses against the state record,
//! never by anything stored in the address itself.

pub mod address;

pub use address::{Address, AddressParseError, ADDRESS_LENGTH};
