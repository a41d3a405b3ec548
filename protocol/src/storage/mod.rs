//! # Storage Module
//!
//! The persistent side of a vault: the slot schema every generation agrees
//! on, and the single state record laid out by it.
//!
//! ## Architecture
//!
//! ```text
//! layout.rs: append-only slot schema, golden v1/v2/v3 layouts, upgrade check
//! record.rs: the state record: core fields + per-generation extensions
//! ```
//!
//! ## Design Decisions
//!
//! 1. **The schema is data, not convention.** Layouts are values that can be
//!    compared, fingerprinted and checked before an upgrade is accepted.
//!
//! 2. **Extensions are composed, not inherited.** Each generation's fields
//!    live in their own block, added once and never rebuilt.
//!
//! 3. **Balances are `u128`.** Wide enough for any fungible supply we care
//!    about; all arithmetic is checked.

pub mod layout;
pub mod record;

pub use layout::{FieldSlot, LayoutError, SlotKind, StorageLayout};
pub use record::{
    CoreFields, InitState, StateRecord, StorageError, WithdrawalFields, WithdrawalRequest,
    YieldFields,
};
