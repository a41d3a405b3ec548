// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Token Vault Core Library
//!
//! Primitives shared by every generation of the upgradeable token vault.
//! Logic generations come and go; what lives here does not: the identities
//! of the parties, the ledger the asset sits on, and the state record whose
//! layout every generation must respect.
//!
//! ## Architecture
//!
//! - **identity**: 20-byte account addresses.
//! - **clock**: time source; delays and accrual are evaluated per call.
//! - **ledger**: the external asset ledger interface and an in-memory token.
//! - **storage**: append-only slot layout and the persistent state record.
//! - **config**: fee/rate bounds, record capacity, version tags.
//!
//! ## Design Philosophy
//!
//! 1. State is never reinterpreted. If a slot meant something once, it means
//!    the same thing forever.
//! 2. No floating point. Fees and yield are integer basis-point arithmetic
//!    that rounds down.
//! 3. If it touches balances, it has tests. Plural.

pub mod clock;
pub mod config;
pub mod identity;
pub mod ledger;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::Address;
pub use ledger::{AssetLedger, InMemoryToken, LedgerError};
pub use storage::{StateRecord, StorageLayout};
