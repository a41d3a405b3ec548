//! # In-Memory Reference Token
//!
//! A minimal fungible token implementing [`AssetLedger`]. It plays the part
//! the mock token plays in deployment rehearsals: mint a supply to the
//! deployer, hand some to users, let them approve the vault.
//!
//! The token is shared between the vault and its users, so all book-keeping
//! sits behind a `parking_lot::RwLock` and every method takes `&self`.
//! Each transfer validates completely before writing, so a failed transfer
//! leaves every balance and allowance untouched.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::debug;

use super::{AssetLedger, LedgerError};
use crate::identity::Address;

#[derive(Debug, Default)]
struct TokenBook {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    frozen: HashSet<Address>,
    total_supply: u128,
}

impl TokenBook {
    fn check_not_frozen(&self, account: &Address) -> Result<(), LedgerError> {
        if self.frozen.contains(account) {
            return Err(LedgerError::AccountFrozen(*account));
        }
        Ok(())
    }

    /// Validates and applies a move of `amount` from `from` to `to`.
    fn move_units(&mut self, from: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        if from.is_zero() || to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        self.check_not_frozen(&from)?;
        self.check_not_frozen(&to)?;

        let available = self.balances.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                available,
                requested: amount,
            });
        }

        if from == to {
            return Ok(());
        }

        let recipient = self.balances.get(&to).copied().unwrap_or(0);
        let credited = recipient.checked_add(amount).ok_or(LedgerError::Overflow)?;

        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

/// A fungible token held entirely in memory.
#[derive(Debug)]
pub struct InMemoryToken {
    id: Address,
    symbol: String,
    book: RwLock<TokenBook>,
}

impl InMemoryToken {
    /// Creates a token and mints `initial_supply` units to `holder`.
    pub fn new(id: Address, symbol: &str, holder: Address, initial_supply: u128) -> Self {
        let mut book = TokenBook::default();
        if initial_supply > 0 {
            book.balances.insert(holder, initial_supply);
            book.total_supply = initial_supply;
        }
        Self {
            id,
            symbol: symbol.to_string(),
            book: RwLock::new(book),
        }
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Total units in existence.
    pub fn total_supply(&self) -> u128 {
        self.book.read().total_supply
    }

    /// Creates `amount` new units for `to`.
    pub fn mint(&self, to: Address, amount: u128) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let mut book = self.book.write();
        let supply = book
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let balance = book.balances.get(&to).copied().unwrap_or(0);
        let balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        book.total_supply = supply;
        book.balances.insert(to, balance);
        Ok(())
    }

    /// Sets the amount `spender` may pull from `owner`. Overwrites, does not add.
    pub fn approve(&self, owner: Address, spender: Address, amount: u128) {
        self.book.write().allowances.insert((owner, spender), amount);
        debug!(%owner, %spender, amount, "allowance set");
    }

    /// Units `spender` may still pull from `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.book
            .read()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Freezes or unfreezes an account. Frozen accounts can neither send nor
    /// receive.
    pub fn set_frozen(&self, account: Address, frozen: bool) {
        let mut book = self.book.write();
        if frozen {
            book.frozen.insert(account);
        } else {
            book.frozen.remove(&account);
        }
    }
}

impl AssetLedger for InMemoryToken {
    fn asset_id(&self) -> Address {
        self.id
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.book.read().balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&self, from: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        self.book.write().move_units(from, to, amount)?;
        debug!(token = %self.symbol, %from, %to, amount, "transfer");
        Ok(())
    }

    fn transfer_from(
        &self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let mut book = self.book.write();
        let allowed = book
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(0);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner,
                spender,
                available: allowed,
                requested: amount,
            });
        }
        book.move_units(owner, to, amount)?;
        book.allowances.insert((owner, spender), allowed - amount);
        debug!(token = %self.symbol, %spender, %owner, %to, amount, "transfer_from");
        Ok(())
    }
}
