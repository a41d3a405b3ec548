//! # Storage Layout: Append-Only Slot Schema
//!
//! A vault's state record outlives every logic generation that operates on
//! it. The layout is the contract between them: each named field owns a
//! fixed slot, and a later generation may only claim slots from the reserved
//! tail. It may never move, retype, or drop a field an earlier generation
//! wrote.
//!
//! ```text
//! slot:  0 ......... 6 | 7 ....... 10 | 11 ...... 13 | 14 ............ 63
//!        generation 1  | generation 2 | generation 3 | reserved
//! ```
//!
//! [`StorageLayout::check_upgrade`] enforces this at upgrade time, so a
//! misordered layout is rejected before any logic module touches the record.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::RECORD_SLOT_CAPACITY;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Violations of the append-only layout rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The new layout belongs to an older generation.
    #[error("layout downgrade from generation {from} to {to}")]
    Downgrade {
        /// Generation currently committed.
        from: u8,
        /// Generation offered.
        to: u8,
    },

    /// A field present before is missing from the new layout.
    #[error("field '{0}' was removed")]
    FieldRemoved(String),

    /// A field kept its name but changed slot.
    #[error("field '{name}' moved from slot {from} to slot {to}")]
    FieldMoved {
        /// Field name.
        name: String,
        /// Committed slot.
        from: u16,
        /// Slot in the new layout.
        to: u16,
    },

    /// A slot kept its position but changed its name or type.
    #[error("slot {slot} changed from {before} to {after}")]
    SlotReinterpreted {
        /// Slot index.
        slot: u16,
        /// Committed field descriptor.
        before: String,
        /// Descriptor in the new layout.
        after: String,
    },

    /// An appended field does not sit at the next free slot.
    #[error("field '{name}' placed at slot {slot}, expected slot {expected}")]
    NonContiguous {
        /// Field name.
        name: String,
        /// Slot it claimed.
        slot: u16,
        /// Next free slot.
        expected: u16,
    },

    /// Two fields share a name.
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),

    /// The layouts disagree on the total record size.
    #[error("record capacity changed from {from} to {to} slots")]
    CapacityChanged {
        /// Committed capacity.
        from: u16,
        /// Offered capacity.
        to: u16,
    },

    /// Not enough reserved slots left for the new fields.
    #[error("reserved space exhausted: {requested} slots requested, {available} available")]
    ReservedSpaceExhausted {
        /// Slots the extension needs.
        requested: usize,
        /// Reserved slots left.
        available: u16,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The type stored in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotKind {
    Address,
    Bool,
    U16,
    U64,
    U128,
    Text,
    /// The one-shot initialization latch.
    InitLatch,
    /// Address -> u128 mapping.
    BalanceMap,
    /// Address -> u64 mapping.
    TimestampMap,
    /// Address -> withdrawal request mapping.
    RequestMap,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotKind::Address => "address",
            SlotKind::Bool => "bool",
            SlotKind::U16 => "u16",
            SlotKind::U64 => "u64",
            SlotKind::U128 => "u128",
            SlotKind::Text => "text",
            SlotKind::InitLatch => "init_latch",
            SlotKind::BalanceMap => "map<address,u128>",
            SlotKind::TimestampMap => "map<address,u64>",
            SlotKind::RequestMap => "map<address,request>",
        };
        f.write_str(s)
    }
}

/// A named field pinned to a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSlot {
    pub name: String,
    pub slot: u16,
    pub kind: SlotKind,
}

impl fmt::Display for FieldSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.name, self.kind, self.slot)
    }
}

/// The full slot assignment of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    generation: u8,
    capacity: u16,
    fields: Vec<FieldSlot>,
}

const V1_FIELDS: &[(&str, SlotKind)] = &[
    ("asset_reference", SlotKind::Address),
    ("administrator", SlotKind::Address),
    ("deposit_fee_bps", SlotKind::U16),
    ("total_deposits", SlotKind::U128),
    ("balances", SlotKind::BalanceMap),
    ("version_tag", SlotKind::Text),
    ("initialized", SlotKind::InitLatch),
];

const V2_FIELDS: &[(&str, SlotKind)] = &[
    ("deposits_paused", SlotKind::Bool),
    ("yield_rate_bps", SlotKind::U16),
    ("accrual_checkpoints", SlotKind::TimestampMap),
    ("accrual_epoch", SlotKind::U64),
];

const V3_FIELDS: &[(&str, SlotKind)] = &[
    ("withdrawal_delay_seconds", SlotKind::U64),
    ("withdrawal_requests", SlotKind::RequestMap),
    ("emergency_penalty_bps", SlotKind::U16),
];

impl StorageLayout {
    /// An empty layout of the given capacity. Every slot is reserved.
    pub fn empty(capacity: u16) -> Self {
        Self {
            generation: 0,
            capacity,
            fields: Vec::new(),
        }
    }

    /// Generation 1: the accounting core.
    pub fn v1() -> Self {
        Self::golden(1)
    }

    /// Generation 2: adds pause and yield accrual.
    pub fn v2() -> Self {
        Self::golden(2)
    }

    /// Generation 3: adds delayed and emergency withdrawal.
    pub fn v3() -> Self {
        Self::golden(3)
    }

    /// Golden layout for a known generation, `None` otherwise.
    pub fn for_generation(generation: u8) -> Option<Self> {
        match generation {
            1..=3 => Some(Self::golden(generation)),
            _ => None,
        }
    }

    fn golden(generation: u8) -> Self {
        let extensions = [V1_FIELDS, V2_FIELDS, V3_FIELDS];
        let mut layout = Self::empty(RECORD_SLOT_CAPACITY);
        for (index, fields) in extensions.iter().take(generation as usize).enumerate() {
            // The golden tables fit comfortably; an error here is a bug in the
            // tables themselves and is caught by the tests below.
            layout = layout
                .extend(index as u8 + 1, fields)
                .unwrap_or_else(|e| panic!("golden layout v{} is invalid: {e}", index + 1));
        }
        layout
    }

    /// Builds the next generation's layout by appending `fields` at the first
    /// reserved slot.
    pub fn extend(&self, generation: u8, fields: &[(&str, SlotKind)]) -> Result<Self, LayoutError> {
        if generation < self.generation {
            return Err(LayoutError::Downgrade {
                from: self.generation,
                to: generation,
            });
        }
        let available = self.reserved_slots();
        if fields.len() > available as usize {
            return Err(LayoutError::ReservedSpaceExhausted {
                requested: fields.len(),
                available,
            });
        }

        let mut next = self.clone();
        next.generation = generation;
        for (name, kind) in fields {
            if next.field(name).is_some() {
                return Err(LayoutError::DuplicateField((*name).to_string()));
            }
            let slot = next.next_free_slot();
            next.fields.push(FieldSlot {
                name: (*name).to_string(),
                slot,
                kind: *kind,
            });
        }
        Ok(next)
    }

    /// Generation that owns this layout.
    pub fn generation(&self) -> u8 {
        self.generation
    }

    /// Total slot count of the record.
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Named fields in slot order.
    pub fn fields(&self) -> &[FieldSlot] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSlot> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First slot not claimed by a named field.
    pub fn next_free_slot(&self) -> u16 {
        self.fields.len() as u16
    }

    /// Placeholder slots still available to future generations.
    pub fn reserved_slots(&self) -> u16 {
        self.capacity.saturating_sub(self.fields.len() as u16)
    }

    /// Verifies that `next` may replace `self` without reinterpreting any
    /// existing slot.
    ///
    /// Rules: same capacity, no downgrade, every committed field present at
    /// the same slot with the same kind, and new fields packed contiguously
    /// from the first reserved slot.
    pub fn check_upgrade(&self, next: &StorageLayout) -> Result<(), LayoutError> {
        if next.capacity != self.capacity {
            return Err(LayoutError::CapacityChanged {
                from: self.capacity,
                to: next.capacity,
            });
        }
        if next.generation < self.generation {
            return Err(LayoutError::Downgrade {
                from: self.generation,
                to: next.generation,
            });
        }

        for committed in &self.fields {
            match next.field(&committed.name) {
                None => return Err(LayoutError::FieldRemoved(committed.name.clone())),
                Some(found) if found.slot != committed.slot => {
                    return Err(LayoutError::FieldMoved {
                        name: committed.name.clone(),
                        from: committed.slot,
                        to: found.slot,
                    })
                }
                Some(found) if found.kind != committed.kind => {
                    return Err(LayoutError::SlotReinterpreted {
                        slot: committed.slot,
                        before: committed.to_string(),
                        after: found.to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        // The committed fields are a prefix; whatever follows must be packed.
        for (index, field) in next.fields.iter().enumerate() {
            let expected = index as u16;
            if let Some(committed) = self.fields.get(index) {
                if committed != field {
                    return Err(LayoutError::SlotReinterpreted {
                        slot: expected,
                        before: committed.to_string(),
                        after: field.to_string(),
                    });
                }
            } else if field.slot != expected {
                return Err(LayoutError::NonContiguous {
                    name: field.name.clone(),
                    slot: field.slot,
                    expected,
                });
            }
            if next.fields[..index].iter().any(|f| f.name == field.name) {
                return Err(LayoutError::DuplicateField(field.name.clone()));
            }
        }

        if next.fields.len() > next.capacity as usize {
            return Err(LayoutError::ReservedSpaceExhausted {
                requested: next.fields.len() - self.fields.len(),
                available: self.reserved_slots(),
            });
        }
        Ok(())
    }

    /// BLAKE3 digest over the slot assignment, as lowercase hex. Two layouts
    /// with the same fingerprint interpret every slot identically.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.capacity.to_le_bytes());
        for field in &self.fields {
            hasher.update(field.to_string().as_bytes());
            hasher.update(b";");
        }
        hasher.finalize().to_hex().to_string()
    }
}
