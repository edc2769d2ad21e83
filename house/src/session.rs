//! The handle a venue works through during one execute call.
//!
//! A session holds the only mutable borrow of the House state, so nothing
//! outside the current call can observe or change state until the House has
//! verified the result.

use alloy_primitives::{Address, U256};
use options::{CallContext, Core, Exercise, OptionId, OptionRecord};

use crate::{house::State, HouseError, Mode, PullNotPermitted};

pub struct Session<'a> {
    house: Address,
    ctx: CallContext,
    mode: Mode,
    state: &'a mut State,
}

impl<'a> Session<'a> {
    pub(crate) fn new(house: Address, ctx: CallContext, mode: Mode, state: &'a mut State) -> Self {
        Self {
            house,
            ctx,
            mode,
            state,
        }
    }

    /// Account that called `House::execute`.
    #[must_use]
    pub const fn caller(&self) -> Address {
        self.ctx.sender
    }

    #[must_use]
    pub const fn now(&self) -> u64 {
        self.ctx.timestamp
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Address of the House running this session.
    #[must_use]
    pub const fn house(&self) -> Address {
        self.house
    }

    #[must_use]
    pub fn core(&self) -> &Core {
        &self.state.core
    }

    /// # Errors
    /// - `UnknownOption`: If the series does not exist
    pub fn record(&self, oid: OptionId) -> Result<OptionRecord, HouseError> {
        Ok(*self.state.core.record(oid)?)
    }

    #[must_use]
    pub fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.state.tokens.balance_of(token, account)
    }

    #[must_use]
    pub fn credit_of(&self, token: Address, owner: Address) -> U256 {
        self.state.ledger.credit_of(token, owner)
    }

    #[must_use]
    pub fn wrapped_balance_of(&self, oid: OptionId, owner: Address) -> U256 {
        self.state.wrapped.balance_of(oid, owner)
    }

    /// Pulls `amount` of `token` from the caller's wallet into custody.
    ///
    /// # Errors
    /// - `PullNotPermitted`: If the call runs in settle-only mode
    /// - `TransferFailed`: If allowance or balance is short
    pub fn pull(&mut self, token: Address, amount: U256) -> Result<(), HouseError> {
        if amount.is_zero() {
            return Ok(());
        }
        if !self.mode.allows_pull() {
            return Err(HouseError::PullNotPermitted(PullNotPermitted { token, amount }));
        }

        let (house, caller) = (self.house, self.caller());
        self.state
            .tokens
            .safe_transfer_from(token, house, caller, house, amount)?;
        Ok(())
    }

    /// Takes `amount` of `token` from the caller, spending credit first and
    /// pulling whatever the credit does not cover.
    ///
    /// # Errors
    /// - `PullNotPermitted`: If credit falls short in settle-only mode
    /// - `TransferFailed`: If the remainder cannot be pulled
    pub fn collect(&mut self, token: Address, amount: U256) -> Result<(), HouseError> {
        let caller = self.caller();
        let from_credit = self.credit_of(token, caller).min(amount);

        if !from_credit.is_zero() {
            self.state.ledger.debit(token, caller, caller, from_credit)?;
        }
        self.pull(token, amount - from_credit)
    }

    /// Pulls `amount` long and `amount` short of `oid` from the caller's wallet.
    ///
    /// # Errors
    /// - `UnknownOption`: If the series does not exist
    /// - `PullNotPermitted`: If the call runs in settle-only mode
    /// - `TransferFailed`: If either leg cannot be pulled
    pub fn pull_claims(&mut self, oid: OptionId, amount: U256) -> Result<(), HouseError> {
        let record = self.record(oid)?;
        self.pull(record.long, amount)?;
        self.pull(record.short, amount)
    }

    /// Credits `owner`. Custody must cover it by the end of the call.
    ///
    /// # Errors
    /// - `ArithmeticOverflow`: If the credit would overflow
    pub fn credit(&mut self, token: Address, owner: Address, amount: U256) -> Result<(), HouseError> {
        self.state.ledger.credit(token, owner, amount)
    }

    /// Debits `owner` on behalf of the caller.
    ///
    /// # Errors
    /// - `NotDepositor`: If the caller is neither `owner` nor its delegate
    /// - `InsufficientBalance`: If `owner` has less than `amount`
    pub fn debit(&mut self, token: Address, owner: Address, amount: U256) -> Result<(), HouseError> {
        let caller = self.caller();
        self.state.ledger.debit(token, owner, caller, amount)
    }

    /// Sends `amount` of `token` out of custody.
    ///
    /// # Errors
    /// - `TransferFailed`: If custody holds less than `amount`
    pub fn push(&mut self, token: Address, to: Address, amount: U256) -> Result<(), HouseError> {
        let house = self.house;
        self.state.tokens.safe_transfer(token, house, to, amount)?;
        Ok(())
    }

    /// Writes `amount` options into custody. The base collateral must be in
    /// custody by the end of the call.
    ///
    /// # Errors
    /// - `UnknownOption`: If the series does not exist
    /// - `ExpiredOption`: If the option has expired
    pub fn mint_options(&mut self, oid: OptionId, amount: U256) -> Result<(), HouseError> {
        let (house, now) = (self.house, self.now());
        let state = &mut *self.state;
        state
            .core
            .mint_pair(&mut state.tokens, house, now, oid, amount, house)?;

        tracing::debug!(%oid, %amount, "options written");
        Ok(())
    }

    /// Burns `amount` custodied pairs and returns the base collateral released.
    ///
    /// # Errors
    /// - `ExpiredOption`: If the option has expired
    /// - `InsufficientBalance`: If custody holds fewer pairs
    pub fn close_options(&mut self, oid: OptionId, amount: U256) -> Result<U256, HouseError> {
        let (house, now) = (self.house, self.now());
        let state = &mut *self.state;
        Ok(state
            .core
            .burn_pair(&mut state.tokens, house, now, oid, amount, house)?)
    }

    /// Exercises `amount` custodied longs.
    ///
    /// # Errors
    /// - `ExpiredOption`: If the option has expired
    /// - `InsufficientBalance`: If custody holds fewer longs
    pub fn exercise_options(&mut self, oid: OptionId, amount: U256) -> Result<Exercise, HouseError> {
        let (house, now) = (self.house, self.now());
        let state = &mut *self.state;
        let exercise = state
            .core
            .burn_for_exercise(&mut state.tokens, house, now, oid, amount, house)?;

        tracing::debug!(%oid, %amount, quote_in = %exercise.quote_in, "options exercised");
        Ok(exercise)
    }

    /// Redeems `amount` custodied shorts against exercise proceeds and
    /// returns the quote payout.
    ///
    /// # Errors
    /// - `InsufficientExerciseProceeds`: If fewer units were exercised
    pub fn redeem_options(&mut self, oid: OptionId, amount: U256) -> Result<U256, HouseError> {
        let house = self.house;
        let state = &mut *self.state;
        Ok(state
            .core
            .burn_for_redeem(&mut state.tokens, house, oid, amount, house)?)
    }

    /// Burns `amount` custodied shorts after expiry and returns the base
    /// collateral they reclaim.
    ///
    /// # Errors
    /// - `NotExpired`: If the option has not expired
    /// - `InsufficientCollateral`: If less collateral is left
    pub fn reclaim_expired(&mut self, oid: OptionId, amount: U256) -> Result<U256, HouseError> {
        let (house, now) = (self.house, self.now());
        let state = &mut *self.state;
        Ok(state
            .core
            .burn_expired(&mut state.tokens, house, now, oid, amount, house)?)
    }

    /// Issues wrapped units to `receiver`. One custodied long and one
    /// custodied short must back each unit by the end of the call.
    ///
    /// # Errors
    /// - `ArithmeticOverflow`: If the wrapped supply would overflow
    pub fn wrap(&mut self, oid: OptionId, amount: U256, receiver: Address) -> Result<(), HouseError> {
        let house = self.house;
        self.state.wrapped.mint(house, oid, receiver, amount)?;
        Ok(())
    }

    /// Burns `amount` of the caller's wrapped units, freeing their backing.
    ///
    /// # Errors
    /// - `InsufficientBalance`: If the caller holds fewer wrapped units
    pub fn unwrap(&mut self, oid: OptionId, amount: U256) -> Result<(), HouseError> {
        let (house, caller) = (self.house, self.caller());
        self.state.wrapped.burn(house, oid, caller, amount)?;
        Ok(())
    }
}
