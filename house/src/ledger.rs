//! Credit table of the House.
//!
//! Every unit of an asset held in House custody that is not locked as option
//! collateral, exercise proceeds or wrapped backing belongs to some owner's
//! credit here.

use alloc::collections::{BTreeMap, BTreeSet};
use alloy_primitives::{Address, U256};
use options::{ArithmeticOverflow, InsufficientBalance, OptionsError};

use crate::{HouseError, NotDepositor};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    credits: BTreeMap<(Address, Address), U256>,
    totals: BTreeMap<Address, U256>,
    delegates: BTreeSet<(Address, Address)>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn credit_of(&self, token: Address, owner: Address) -> U256 {
        self.credits
            .get(&(token, owner))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Sum of all credits in `token`.
    #[must_use]
    pub fn total(&self, token: Address) -> U256 {
        self.totals.get(&token).copied().unwrap_or(U256::ZERO)
    }

    pub fn totals(&self) -> impl Iterator<Item = (Address, U256)> + '_ {
        self.totals.iter().map(|(token, total)| (*token, *total))
    }

    /// Whether `caller` may debit credit owned by `owner`.
    #[must_use]
    pub fn is_entitled(&self, owner: Address, caller: Address) -> bool {
        owner == caller || self.delegates.contains(&(owner, caller))
    }

    pub fn set_delegate(&mut self, owner: Address, delegate: Address, approved: bool) {
        if approved {
            self.delegates.insert((owner, delegate));
        } else {
            self.delegates.remove(&(owner, delegate));
        }
    }

    /// # Errors
    /// - `ArithmeticOverflow`: If the credit or the running total would overflow
    pub fn credit(&mut self, token: Address, owner: Address, amount: U256) -> Result<(), HouseError> {
        let overflow = || OptionsError::ArithmeticOverflow(ArithmeticOverflow {});
        let total = self.total(token).checked_add(amount).ok_or_else(overflow)?;
        let balance = self
            .credit_of(token, owner)
            .checked_add(amount)
            .ok_or_else(overflow)?;

        self.set_total(token, total);
        self.set_credit(token, owner, balance);
        Ok(())
    }

    /// Removes credit on behalf of `caller`.
    ///
    /// # Errors
    /// - `NotDepositor`: If `caller` is not entitled to `owner`'s credit
    /// - `InsufficientBalance`: If `owner` has less than `amount`
    pub fn debit(
        &mut self,
        token: Address,
        owner: Address,
        caller: Address,
        amount: U256,
    ) -> Result<(), HouseError> {
        if !self.is_entitled(owner, caller) {
            return Err(HouseError::NotDepositor(NotDepositor { owner, caller }));
        }

        let balance = self.credit_of(token, owner);
        if balance < amount {
            return Err(OptionsError::InsufficientBalance(InsufficientBalance {
                owner,
                available: balance,
                requested: amount,
            })
            .into());
        }

        self.set_credit(token, owner, balance - amount);
        let total = self.total(token) - amount;
        self.set_total(token, total);
        Ok(())
    }

    fn set_credit(&mut self, token: Address, owner: Address, amount: U256) {
        if amount.is_zero() {
            self.credits.remove(&(token, owner));
        } else {
            self.credits.insert((token, owner), amount);
        }
    }

    fn set_total(&mut self, token: Address, amount: U256) {
        if amount.is_zero() {
            self.totals.remove(&token);
        } else {
            self.totals.insert(token, amount);
        }
    }
}
