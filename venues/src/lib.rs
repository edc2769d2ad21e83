#![cfg_attr(not(any(test, feature = "std")), no_std)]

use alloy_primitives::{Address, U256};
use house::{HouseError, Session, Venue};
use options::{OptionId, OptionsError, UnauthorizedCaller};

/// Reference venue covering the full option lifecycle against House credit.
///
/// Positions are held as House credit in the long and short claim tokens.
/// Consumed assets come from the caller's credit, topped up from the
/// caller's wallet when the call runs in pull-and-settle mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicVenue {
    address: Address,
    house: Address,
}

impl BasicVenue {
    #[must_use]
    pub const fn new(address: Address, house: Address) -> Self {
        Self { address, house }
    }

    /// The only House this venue accepts sessions from.
    #[must_use]
    pub const fn house(&self) -> Address {
        self.house
    }

    fn ensure_house(&self, session: &Session<'_>) -> Result<(), HouseError> {
        if session.house() == self.house {
            Ok(())
        } else {
            Err(OptionsError::UnauthorizedCaller(UnauthorizedCaller {
                expected: self.house,
                actual: session.house(),
            })
            .into())
        }
    }
}

impl Venue for BasicVenue {
    fn address(&self) -> Address {
        self.address
    }

    /// Takes long and short from the caller's wallet when both are there and
    /// pulls are allowed, otherwise unwraps the caller's wrapped units.
    fn deposit(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;
        let caller = session.caller();

        let in_wallet = session.balance_of(record.long, caller) >= amount
            && session.balance_of(record.short, caller) >= amount;
        if session.mode().allows_pull() && in_wallet {
            session.pull_claims(oid, amount)?;
        } else {
            session.unwrap(oid, amount)?;
        }

        session.credit(record.long, receiver, amount)?;
        session.credit(record.short, receiver, amount)
    }

    /// Pays out the caller's own long and short credit. Moving another
    /// owner's credit goes through `House::withdraw`, which checks delegation.
    fn withdraw(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receivers: [Address; 2],
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;
        let caller = session.caller();

        session.debit(record.long, caller, amount)?;
        session.debit(record.short, caller, amount)?;
        session.push(record.long, receivers[0], amount)?;
        session.push(record.short, receivers[1], amount)
    }

    fn mint_options_then_wrap(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;

        session.collect(record.parameters.base, amount)?;
        session.mint_options(oid, amount)?;
        session.wrap(oid, amount, receiver)
    }

    fn split_options_and_deposit(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receivers: [Address; 2],
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;

        session.unwrap(oid, amount)?;
        session.credit(record.long, receivers[0], amount)?;
        session.credit(record.short, receivers[1], amount)
    }

    /// Burns the caller's long credit, charges the strike in quote and sends
    /// the base to `receiver`.
    fn exercise_from_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;
        let caller = session.caller();

        session.debit(record.long, caller, amount)?;
        let exercise = session.exercise_options(oid, amount)?;
        session.collect(record.parameters.quote, exercise.quote_in)?;
        session.push(record.parameters.base, receiver, exercise.base_out)?;

        tracing::debug!(%oid, %caller, %amount, paid = %exercise.quote_in, "exercised");
        Ok(())
    }

    fn redeem_from_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;
        let caller = session.caller();

        session.debit(record.short, caller, amount)?;
        let payout = session.redeem_options(oid, amount)?;
        session.push(record.parameters.quote, receiver, payout)
    }

    fn close_from_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;
        let caller = session.caller();

        session.debit(record.long, caller, amount)?;
        session.debit(record.short, caller, amount)?;
        let released = session.close_options(oid, amount)?;
        session.push(record.parameters.base, receiver, released)
    }

    fn close_from_wrapped_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;

        session.unwrap(oid, amount)?;
        let released = session.close_options(oid, amount)?;
        session.push(record.parameters.base, receiver, released)
    }

    fn close(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;

        session.pull_claims(oid, amount)?;
        let released = session.close_options(oid, amount)?;
        session.push(record.parameters.base, receiver, released)
    }

    fn deposit_token(
        &self,
        session: &mut Session<'_>,
        token: Address,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        session.pull(token, amount)?;
        session.credit(token, receiver, amount)
    }

    fn withdraw_token(
        &self,
        session: &mut Session<'_>,
        token: Address,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let caller = session.caller();
        session.debit(token, caller, amount)?;
        session.push(token, receiver, amount)
    }

    /// Writes `amount` options against base collateral and credits the long
    /// to the first receiver and the short to the second.
    fn write_options(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receivers: [Address; 2],
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;

        session.collect(record.parameters.base, amount)?;
        session.mint_options(oid, amount)?;
        session.credit(record.long, receivers[0], amount)?;
        session.credit(record.short, receivers[1], amount)
    }

    fn wrap_from_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;
        let caller = session.caller();

        session.debit(record.long, caller, amount)?;
        session.debit(record.short, caller, amount)?;
        session.wrap(oid, amount, receiver)
    }

    /// Burns the caller's short credit after expiry and returns the
    /// unexercised base collateral behind it.
    fn redeem_expired(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        self.ensure_house(session)?;
        let record = session.record(oid)?;
        let caller = session.caller();

        session.debit(record.short, caller, amount)?;
        let reclaimed = session.reclaim_expired(oid, amount)?;
        session.push(record.parameters.base, receiver, reclaimed)
    }
}
