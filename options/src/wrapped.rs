use alloc::collections::{BTreeMap, BTreeSet};
use alloy_primitives::{Address, U256};

use crate::{OptionId, OptionsError, UnauthorizedCaller};

/// Multi-token of bundled long+short pairs, one fungible id per option.
///
/// Only the minter (the house) issues or destroys wrapped units, because each
/// unit must stay backed by one long and one short held in custody.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedOptionToken {
    minter: Address,
    balances: BTreeMap<(OptionId, Address), U256>,
    supplies: BTreeMap<OptionId, U256>,
    operators: BTreeSet<(Address, Address)>,
}

impl WrappedOptionToken {
    #[must_use]
    pub const fn new(minter: Address) -> Self {
        Self {
            minter,
            balances: BTreeMap::new(),
            supplies: BTreeMap::new(),
            operators: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn minter(&self) -> Address {
        self.minter
    }

    #[must_use]
    pub fn balance_of(&self, oid: OptionId, owner: Address) -> U256 {
        self.balances
            .get(&(oid, owner))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    #[must_use]
    pub fn total_supply(&self, oid: OptionId) -> U256 {
        self.supplies.get(&oid).copied().unwrap_or(U256::ZERO)
    }

    #[must_use]
    pub fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool {
        self.operators.contains(&(owner, operator))
    }

    pub fn set_approval_for_all(&mut self, owner: Address, operator: Address, approved: bool) {
        if approved {
            self.operators.insert((owner, operator));
        } else {
            self.operators.remove(&(owner, operator));
        }
    }

    /// # Errors
    /// - `UnauthorizedCaller`: If `caller` is not the minter
    /// - `ArithmeticOverflow`: If the supply would overflow
    pub fn mint(
        &mut self,
        caller: Address,
        oid: OptionId,
        to: Address,
        amount: U256,
    ) -> Result<(), OptionsError> {
        self.ensure_minter(caller)?;

        let supply = self
            .total_supply(oid)
            .checked_add(amount)
            .ok_or(OptionsError::overflow())?;

        self.supplies.insert(oid, supply);
        let balance = self.balance_of(oid, to);
        self.set_balance(oid, to, balance + amount);
        Ok(())
    }

    /// # Errors
    /// - `UnauthorizedCaller`: If `caller` is not the minter
    /// - `InsufficientBalance`: If `from` holds less than `amount`
    pub fn burn(
        &mut self,
        caller: Address,
        oid: OptionId,
        from: Address,
        amount: U256,
    ) -> Result<(), OptionsError> {
        self.ensure_minter(caller)?;

        let balance = self.balance_of(oid, from);
        if balance < amount {
            return Err(OptionsError::insufficient_balance(from, balance, amount));
        }

        self.set_balance(oid, from, balance - amount);
        let supply = self.total_supply(oid) - amount;
        if supply.is_zero() {
            self.supplies.remove(&oid);
        } else {
            self.supplies.insert(oid, supply);
        }
        Ok(())
    }

    /// Moves wrapped units between holders.
    ///
    /// # Errors
    /// - `UnauthorizedCaller`: If `caller` is neither `from` nor an approved operator
    /// - `InsufficientBalance`: If `from` holds less than `amount`
    pub fn safe_transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        oid: OptionId,
        amount: U256,
    ) -> Result<(), OptionsError> {
        if caller != from && !self.is_approved_for_all(from, caller) {
            return Err(OptionsError::UnauthorizedCaller(UnauthorizedCaller {
                expected: from,
                actual: caller,
            }));
        }

        let balance = self.balance_of(oid, from);
        if balance < amount {
            return Err(OptionsError::insufficient_balance(from, balance, amount));
        }

        self.set_balance(oid, from, balance - amount);
        let recipient_balance = self.balance_of(oid, to);
        self.set_balance(oid, to, recipient_balance + amount);
        Ok(())
    }

    fn ensure_minter(&self, caller: Address) -> Result<(), OptionsError> {
        if caller == self.minter {
            Ok(())
        } else {
            Err(OptionsError::UnauthorizedCaller(UnauthorizedCaller {
                expected: self.minter,
                actual: caller,
            }))
        }
    }

    fn set_balance(&mut self, oid: OptionId, owner: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&(oid, owner));
        } else {
            self.balances.insert((oid, owner), balance);
        }
    }
}
