//! The venue interface.
//!
//! Calldata handed to `House::execute` is decoded against `IVenue` and routed
//! to the matching `Venue` method. Every method defaults to `Unsupported`, so
//! a venue implements only the entry points it offers.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use options::OptionId;

use crate::{session::Session, HouseError, Unsupported};

use self::IVenue::IVenueCalls;

sol! {
    interface IVenue {
        function deposit(bytes32 oid, uint256 amount, address receiver) external;
        function withdraw(bytes32 oid, uint256 amount, address[2] receivers) external;
        function mintOptionsThenWrap(bytes32 oid, uint256 amount, address receiver) external;
        function splitOptionsAndDeposit(bytes32 oid, uint256 amount, address[2] receivers) external;
        function exerciseFromBalance(bytes32 oid, uint256 amount, address receiver) external;
        function redeemFromBalance(bytes32 oid, uint256 amount, address receiver) external;
        function closeFromBalance(bytes32 oid, uint256 amount, address receiver) external;
        function closeFromWrappedBalance(bytes32 oid, uint256 amount, address receiver) external;
        function close(bytes32 oid, uint256 amount, address receiver) external;
        function depositToken(address token, uint256 amount, address receiver) external;
        function withdrawToken(address token, uint256 amount, address receiver) external;
        function writeOptions(bytes32 oid, uint256 amount, address[2] receivers) external;
        function wrapFromBalance(bytes32 oid, uint256 amount, address receiver) external;
        function redeemExpired(bytes32 oid, uint256 amount, address receiver) external;
    }
}

const fn unsupported(selector: [u8; 4]) -> Result<(), HouseError> {
    Err(HouseError::Unsupported(Unsupported {
        selector: alloy_primitives::FixedBytes(selector),
    }))
}

/// A strategy module the House dispatches to.
///
/// Venues hold no assets and no authority: everything they do goes through
/// the `Session` and is checked by the House before it commits.
pub trait Venue {
    fn address(&self) -> Address;

    /// Moves long and short claims into credit of `receiver`.
    fn deposit(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receiver);
        unsupported(IVenue::depositCall::SELECTOR)
    }

    /// Pays long and short credit out to wallets.
    fn withdraw(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receivers: [Address; 2],
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receivers);
        unsupported(IVenue::withdrawCall::SELECTOR)
    }

    fn mint_options_then_wrap(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receiver);
        unsupported(IVenue::mintOptionsThenWrapCall::SELECTOR)
    }

    fn split_options_and_deposit(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receivers: [Address; 2],
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receivers);
        unsupported(IVenue::splitOptionsAndDepositCall::SELECTOR)
    }

    fn exercise_from_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receiver);
        unsupported(IVenue::exerciseFromBalanceCall::SELECTOR)
    }

    fn redeem_from_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receiver);
        unsupported(IVenue::redeemFromBalanceCall::SELECTOR)
    }

    fn close_from_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receiver);
        unsupported(IVenue::closeFromBalanceCall::SELECTOR)
    }

    fn close_from_wrapped_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receiver);
        unsupported(IVenue::closeFromWrappedBalanceCall::SELECTOR)
    }

    fn close(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receiver);
        unsupported(IVenue::closeCall::SELECTOR)
    }

    fn deposit_token(
        &self,
        session: &mut Session<'_>,
        token: Address,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, token, amount, receiver);
        unsupported(IVenue::depositTokenCall::SELECTOR)
    }

    fn withdraw_token(
        &self,
        session: &mut Session<'_>,
        token: Address,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, token, amount, receiver);
        unsupported(IVenue::withdrawTokenCall::SELECTOR)
    }

    fn write_options(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receivers: [Address; 2],
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receivers);
        unsupported(IVenue::writeOptionsCall::SELECTOR)
    }

    fn wrap_from_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receiver);
        unsupported(IVenue::wrapFromBalanceCall::SELECTOR)
    }

    fn redeem_expired(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        let _ = (session, oid, amount, receiver);
        unsupported(IVenue::redeemExpiredCall::SELECTOR)
    }
}

pub(crate) fn dispatch(
    venue: &dyn Venue,
    session: &mut Session<'_>,
    call: IVenueCalls,
) -> Result<(), HouseError> {
    match call {
        IVenueCalls::deposit(c) => venue.deposit(session, c.oid, c.amount, c.receiver),
        IVenueCalls::withdraw(c) => venue.withdraw(session, c.oid, c.amount, c.receivers),
        IVenueCalls::mintOptionsThenWrap(c) => {
            venue.mint_options_then_wrap(session, c.oid, c.amount, c.receiver)
        }
        IVenueCalls::splitOptionsAndDeposit(c) => {
            venue.split_options_and_deposit(session, c.oid, c.amount, c.receivers)
        }
        IVenueCalls::exerciseFromBalance(c) => {
            venue.exercise_from_balance(session, c.oid, c.amount, c.receiver)
        }
        IVenueCalls::redeemFromBalance(c) => {
            venue.redeem_from_balance(session, c.oid, c.amount, c.receiver)
        }
        IVenueCalls::closeFromBalance(c) => {
            venue.close_from_balance(session, c.oid, c.amount, c.receiver)
        }
        IVenueCalls::closeFromWrappedBalance(c) => {
            venue.close_from_wrapped_balance(session, c.oid, c.amount, c.receiver)
        }
        IVenueCalls::close(c) => venue.close(session, c.oid, c.amount, c.receiver),
        IVenueCalls::depositToken(c) => venue.deposit_token(session, c.token, c.amount, c.receiver),
        IVenueCalls::withdrawToken(c) => {
            venue.withdraw_token(session, c.token, c.amount, c.receiver)
        }
        IVenueCalls::writeOptions(c) => venue.write_options(session, c.oid, c.amount, c.receivers),
        IVenueCalls::wrapFromBalance(c) => {
            venue.wrap_from_balance(session, c.oid, c.amount, c.receiver)
        }
        IVenueCalls::redeemExpired(c) => {
            venue.redeem_expired(session, c.oid, c.amount, c.receiver)
        }
    }
}
