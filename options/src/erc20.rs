use alloc::collections::BTreeMap;
use alloy_primitives::{Address, U256};

use crate::{OptionsError, TokenExists, TransferFailed, UnauthorizedCaller, UnknownToken};

const BPS: u64 = 10_000;

/// Balances and allowances of a single fungible token.
///
/// Transfers follow ERC20 and report failure with `false`. Tokens with a
/// minter only mint and burn on that minter's behalf. Tokens without one are
/// free-mint test assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Erc20 {
    address: Address,
    balances: BTreeMap<Address, U256>,
    allowances: BTreeMap<Address, BTreeMap<Address, U256>>,
    total_supply: U256,
    minter: Option<Address>,
    transfer_fee_bps: u64,
}

impl Erc20 {
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_minter(address: Address, minter: Address) -> Self {
        Self {
            address,
            minter: Some(minter),
            ..Self::default()
        }
    }

    /// A token that burns `fee_bps` basis points of every transfer.
    #[must_use]
    pub fn with_transfer_fee(address: Address, fee_bps: u64) -> Self {
        Self {
            address,
            transfer_fee_bps: fee_bps.min(BPS),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub const fn minter(&self) -> Option<Address> {
        self.minter
    }

    #[must_use]
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&owner)
            .and_then(|m| m.get(&spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    #[must_use]
    pub const fn total_supply(&self) -> U256 {
        self.total_supply
    }

    fn ensure_minter(&self, caller: Address) -> Result<(), OptionsError> {
        match self.minter {
            Some(minter) if minter != caller => {
                Err(OptionsError::UnauthorizedCaller(UnauthorizedCaller {
                    expected: minter,
                    actual: caller,
                }))
            }
            _ => Ok(()),
        }
    }

    /// Mints `amount` to `to`.
    ///
    /// # Errors
    /// - `UnauthorizedCaller`: If the token has a minter other than `caller`
    /// - `ArithmeticOverflow`: If the total supply would overflow
    pub fn mint(&mut self, caller: Address, to: Address, amount: U256) -> Result<(), OptionsError> {
        self.ensure_minter(caller)?;

        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(OptionsError::overflow())?;

        self.total_supply = total_supply;
        let current_balance = self.balance_of(to);
        self.set_balance(to, current_balance + amount);
        Ok(())
    }

    /// Burns `amount` held by `from`.
    ///
    /// # Errors
    /// - `UnauthorizedCaller`: If the token has a minter other than `caller`
    /// - `InsufficientBalance`: If `from` holds less than `amount`
    pub fn burn(&mut self, caller: Address, from: Address, amount: U256) -> Result<(), OptionsError> {
        self.ensure_minter(caller)?;

        let balance = self.balance_of(from);
        if balance < amount {
            return Err(OptionsError::insufficient_balance(from, balance, amount));
        }

        self.set_balance(from, balance - amount);
        self.total_supply -= amount;
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> bool {
        let sender_balance = self.balance_of(from);

        if sender_balance < amount {
            return false;
        }

        let fee = amount * U256::from(self.transfer_fee_bps) / U256::from(BPS);
        let amount_after_fee = amount - fee;

        self.set_balance(from, sender_balance - amount);
        let recipient_balance = self.balance_of(to);
        self.set_balance(to, recipient_balance + amount_after_fee);
        self.total_supply -= fee;
        true
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> bool {
        let allowance = self.allowance(from, spender);

        if allowance < amount || self.balance_of(from) < amount {
            return false;
        }

        if !self.transfer(from, to, amount) {
            return false;
        }

        if allowance != U256::MAX {
            self.allowances
                .entry(from)
                .or_default()
                .insert(spender, allowance - amount);
        }

        true
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
    }

    fn set_balance(&mut self, account: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}

/// Every token deployed in the process, keyed by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBook {
    tokens: BTreeMap<Address, Erc20>,
}

impl TokenBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token under its own address.
    ///
    /// # Errors
    /// - `TokenExists`: If a token is already deployed at that address
    pub fn deploy(&mut self, token: Erc20) -> Result<(), OptionsError> {
        let address = token.address();
        if self.tokens.contains_key(&address) {
            return Err(OptionsError::TokenExists(TokenExists { token: address }));
        }

        self.tokens.insert(address, token);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, token: Address) -> Option<&Erc20> {
        self.tokens.get(&token)
    }

    fn token_mut(&mut self, token: Address) -> Result<&mut Erc20, OptionsError> {
        self.tokens
            .get_mut(&token)
            .ok_or(OptionsError::UnknownToken(UnknownToken { token }))
    }

    /// Balance of `account`, zero for tokens that were never deployed.
    #[must_use]
    pub fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.get(token)
            .map_or(U256::ZERO, |t| t.balance_of(account))
    }

    #[must_use]
    pub fn total_supply(&self, token: Address) -> U256 {
        self.get(token).map_or(U256::ZERO, Erc20::total_supply)
    }

    #[must_use]
    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.get(token)
            .map_or(U256::ZERO, |t| t.allowance(owner, spender))
    }

    /// # Errors
    /// - `UnknownToken`: If `token` is not deployed
    pub fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), OptionsError> {
        self.token_mut(token)?.approve(owner, spender, amount);
        Ok(())
    }

    /// # Errors
    /// - `UnknownToken`: If `token` is not deployed
    /// - `UnauthorizedCaller`: If `caller` is not the token's minter
    /// - `ArithmeticOverflow`: If the total supply would overflow
    pub fn mint(
        &mut self,
        caller: Address,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), OptionsError> {
        self.token_mut(token)?.mint(caller, to, amount)
    }

    /// # Errors
    /// - `UnknownToken`: If `token` is not deployed
    /// - `UnauthorizedCaller`: If `caller` is not the token's minter
    /// - `InsufficientBalance`: If `from` holds less than `amount`
    pub fn burn(
        &mut self,
        caller: Address,
        token: Address,
        from: Address,
        amount: U256,
    ) -> Result<(), OptionsError> {
        self.token_mut(token)?.burn(caller, from, amount)
    }

    /// Transfers `amount` from `from`, turning a `false` return into an error.
    ///
    /// # Errors
    /// - `UnknownToken`: If `token` is not deployed
    /// - `TransferFailed`: If the token refused the transfer
    pub fn safe_transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), OptionsError> {
        if self.token_mut(token)?.transfer(from, to, amount) {
            Ok(())
        } else {
            Err(transfer_failed(token, from, to, amount))
        }
    }

    /// Pulls `amount` from `from` using `spender`'s allowance.
    ///
    /// # Errors
    /// - `UnknownToken`: If `token` is not deployed
    /// - `TransferFailed`: If allowance or balance is short
    pub fn safe_transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), OptionsError> {
        if self
            .token_mut(token)?
            .transfer_from(spender, from, to, amount)
        {
            Ok(())
        } else {
            Err(transfer_failed(token, from, to, amount))
        }
    }
}

const fn transfer_failed(token: Address, from: Address, to: Address, amount: U256) -> OptionsError {
    OptionsError::TransferFailed(TransferFailed {
        token,
        from,
        to,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> Address {
        Address::from([0x7E; 20])
    }

    fn alice() -> Address {
        Address::from([0xA1; 20])
    }

    fn bob() -> Address {
        Address::from([0xB0; 20])
    }

    fn book_with(token: Erc20) -> TokenBook {
        let mut book = TokenBook::new();
        book.deploy(token).unwrap();
        book
    }

    #[test]
    fn test_mint_and_transfer() {
        let mut book = book_with(Erc20::new(token()));
        book.mint(alice(), token(), alice(), U256::from(1000)).unwrap();

        book.safe_transfer(token(), alice(), bob(), U256::from(400))
            .unwrap();

        assert_eq!(book.balance_of(token(), alice()), U256::from(600));
        assert_eq!(book.balance_of(token(), bob()), U256::from(400));
        assert_eq!(book.total_supply(token()), U256::from(1000));
    }

    #[test]
    fn test_safe_transfer_zero_amount() {
        let mut book = book_with(Erc20::new(token()));

        let result = book.safe_transfer(token(), alice(), bob(), U256::ZERO);

        assert!(result.is_ok());
    }

    #[test]
    fn test_transfer_more_than_balance_fails() {
        let mut book = book_with(Erc20::new(token()));
        book.mint(alice(), token(), alice(), U256::from(10)).unwrap();

        let result = book.safe_transfer(token(), alice(), bob(), U256::from(11));

        assert!(matches!(result, Err(OptionsError::TransferFailed(_))));
        assert_eq!(book.balance_of(token(), alice()), U256::from(10));
    }

    #[test]
    fn test_transfer_from_requires_allowance() {
        let mut book = book_with(Erc20::new(token()));
        book.mint(alice(), token(), alice(), U256::from(100)).unwrap();

        let result = book.safe_transfer_from(token(), bob(), alice(), bob(), U256::from(50));
        assert!(matches!(result, Err(OptionsError::TransferFailed(_))));

        book.approve(token(), alice(), bob(), U256::from(50)).unwrap();
        book.safe_transfer_from(token(), bob(), alice(), bob(), U256::from(50))
            .unwrap();

        assert_eq!(book.allowance(token(), alice(), bob()), U256::ZERO);
        assert_eq!(book.balance_of(token(), bob()), U256::from(50));
    }

    #[test]
    fn test_max_allowance_is_not_consumed() {
        let mut book = book_with(Erc20::new(token()));
        book.mint(alice(), token(), alice(), U256::from(100)).unwrap();
        book.approve(token(), alice(), bob(), U256::MAX).unwrap();

        book.safe_transfer_from(token(), bob(), alice(), bob(), U256::from(60))
            .unwrap();

        assert_eq!(book.allowance(token(), alice(), bob()), U256::MAX);
    }

    #[test]
    fn test_only_minter_mints_and_burns() {
        let minter = Address::from([0xC0; 20]);
        let mut book = book_with(Erc20::with_minter(token(), minter));

        let result = book.mint(alice(), token(), alice(), U256::from(1));
        assert!(matches!(result, Err(OptionsError::UnauthorizedCaller(_))));

        book.mint(minter, token(), alice(), U256::from(5)).unwrap();

        let result = book.burn(alice(), token(), alice(), U256::from(5));
        assert!(matches!(result, Err(OptionsError::UnauthorizedCaller(_))));

        let result = book.burn(minter, token(), alice(), U256::from(6));
        assert!(matches!(result, Err(OptionsError::InsufficientBalance(_))));

        book.burn(minter, token(), alice(), U256::from(5)).unwrap();
        assert_eq!(book.total_supply(token()), U256::ZERO);
    }

    #[test]
    fn test_fee_on_transfer_delivers_less() {
        let mut book = book_with(Erc20::with_transfer_fee(token(), 100));
        book.mint(alice(), token(), alice(), U256::from(1000)).unwrap();

        book.safe_transfer(token(), alice(), bob(), U256::from(1000))
            .unwrap();

        assert_eq!(book.balance_of(token(), bob()), U256::from(990));
        assert_eq!(book.total_supply(token()), U256::from(990));
    }

    #[test]
    fn test_deploy_twice_fails() {
        let mut book = book_with(Erc20::new(token()));

        let result = book.deploy(Erc20::new(token()));

        assert!(matches!(result, Err(OptionsError::TokenExists(_))));
    }

    #[test]
    fn test_unknown_token_reads_zero_and_rejects_writes() {
        let mut book = TokenBook::new();

        assert_eq!(book.balance_of(token(), alice()), U256::ZERO);
        let result = book.safe_transfer(token(), alice(), bob(), U256::ZERO);
        assert!(matches!(result, Err(OptionsError::UnknownToken(_))));
    }
}
