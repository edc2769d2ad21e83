mod fixture;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use fixture::*;
use house::{HouseError, IVenue, Mode, Session, Venue};
use options::{Erc20, OptionId, OptionsError};

fn venue_address() -> Address {
    Address::from([0x5E; 20])
}

/// Writes options with no collateral and closes them again before returning.
struct FlashWrite;

impl Venue for FlashWrite {
    fn address(&self) -> Address {
        venue_address()
    }

    fn write_options(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        _receivers: [Address; 2],
    ) -> Result<(), HouseError> {
        session.mint_options(oid, amount)?;
        let released = session.close_options(oid, amount)?;
        assert_eq!(released, amount);
        Ok(())
    }
}

/// Lends custody out and pulls it back from the borrower in the same call.
struct FlashLoan;

impl Venue for FlashLoan {
    fn address(&self) -> Address {
        venue_address()
    }

    fn deposit_token(
        &self,
        session: &mut Session<'_>,
        token: Address,
        amount: U256,
        _receiver: Address,
    ) -> Result<(), HouseError> {
        let borrower = session.caller();
        session.push(token, borrower, amount)?;
        session.pull(token, amount)
    }
}

/// Wraps freshly written options without collecting any collateral.
struct UnbackedMint;

impl Venue for UnbackedMint {
    fn address(&self) -> Address {
        venue_address()
    }

    fn mint_options_then_wrap(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        session.mint_options(oid, amount)?;
        session.wrap(oid, amount, receiver)
    }
}

/// Sends custody out without debiting anyone.
struct Skim;

impl Venue for Skim {
    fn address(&self) -> Address {
        venue_address()
    }

    fn withdraw_token(
        &self,
        session: &mut Session<'_>,
        token: Address,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        session.push(token, receiver, amount)
    }
}

/// Debits the named victim and pays the caller.
struct Sweep;

impl Venue for Sweep {
    fn address(&self) -> Address {
        venue_address()
    }

    fn withdraw_token(
        &self,
        session: &mut Session<'_>,
        token: Address,
        amount: U256,
        victim: Address,
    ) -> Result<(), HouseError> {
        session.debit(token, victim, amount)?;
        let caller = session.caller();
        session.push(token, caller, amount)
    }
}

/// Issues wrapped units on top of claims that are already credited.
struct DoubleWrap;

impl Venue for DoubleWrap {
    fn address(&self) -> Address {
        venue_address()
    }

    fn wrap_from_balance(
        &self,
        session: &mut Session<'_>,
        oid: OptionId,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        session.wrap(oid, amount, receiver)
    }
}

/// Credits the caller with nothing behind it.
struct Counterfeit;

impl Venue for Counterfeit {
    fn address(&self) -> Address {
        venue_address()
    }

    fn deposit_token(
        &self,
        session: &mut Session<'_>,
        token: Address,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
        session.credit(token, receiver, amount)
    }
}

fn write_call(oid: OptionId, amount: U256) -> Vec<u8> {
    IVenue::writeOptionsCall {
        oid,
        amount,
        receivers: [alice(), alice()],
    }
    .abi_encode()
}

fn token_call(token: Address, amount: U256, receiver: Address) -> (Vec<u8>, Vec<u8>) {
    (
        IVenue::depositTokenCall {
            token,
            amount,
            receiver,
        }
        .abi_encode(),
        IVenue::withdrawTokenCall {
            token,
            amount,
            receiver,
        }
        .abi_encode(),
    )
}

fn insolvent_token(result: Result<(), HouseError>) -> Address {
    match result {
        Err(HouseError::ExecutionFailed(inner)) => match *inner {
            HouseError::Insolvent(insolvent) => insolvent.token,
            other => panic!("expected Insolvent, got {other}"),
        },
        other => panic!("expected ExecutionFailed, got {other:?}"),
    }
}

#[test]
fn flash_write_and_close_in_one_call_succeeds() {
    let mut house = setup();
    let oid = create_call(&mut house, ether(1000));

    house
        .execute(
            &ctx(alice()),
            Mode::SettleOnly,
            &FlashWrite,
            &write_call(oid, ether(50)),
        )
        .unwrap();

    let supply = house.core().supply(oid).unwrap();
    assert_eq!(supply.collateral, U256::ZERO);
    assert_eq!(supply.written, ether(50));
    assert_eq!(house.tokens().balance_of(base(), house_address()), U256::ZERO);
}

#[test]
fn flash_loan_repaid_in_the_same_call_succeeds() {
    let mut house = setup();
    house
        .deposit(&ctx(bob()), base(), ether(100), bob())
        .unwrap();
    let (lend, _) = token_call(base(), ether(100), alice());

    house
        .execute(&ctx(alice()), Mode::PullAndSettle, &FlashLoan, &lend)
        .unwrap();

    assert_eq!(house.tokens().balance_of(base(), house_address()), ether(100));
    assert_eq!(house.tokens().balance_of(base(), alice()), ether(1000));
}

#[test]
fn flash_loan_without_pull_permission_rolls_back() {
    let mut house = setup();
    house
        .deposit(&ctx(bob()), base(), ether(100), bob())
        .unwrap();
    let before = house.clone();
    let (lend, _) = token_call(base(), ether(100), alice());

    let result = house.execute(&ctx(alice()), Mode::SettleOnly, &FlashLoan, &lend);

    assert!(matches!(
        result.as_ref().map_err(HouseError::reason),
        Err(HouseError::PullNotPermitted(_))
    ));
    assert_eq!(house, before);
}

#[test]
fn unbacked_mint_is_insolvent() {
    let mut house = setup();
    let oid = create_call(&mut house, ether(1000));
    let before = house.clone();
    let data = IVenue::mintOptionsThenWrapCall {
        oid,
        amount: ether(1),
        receiver: alice(),
    }
    .abi_encode();

    let result = house.execute(&ctx(alice()), Mode::PullAndSettle, &UnbackedMint, &data);

    assert_eq!(insolvent_token(result), base());
    assert_eq!(house, before);
}

#[test]
fn skimming_custody_is_insolvent() {
    let mut house = setup();
    house
        .deposit(&ctx(bob()), quote(), ether(10), bob())
        .unwrap();
    let before = house.clone();
    let (_, skim) = token_call(quote(), ether(1), alice());

    let result = house.execute(&ctx(alice()), Mode::SettleOnly, &Skim, &skim);

    assert_eq!(insolvent_token(result), quote());
    assert_eq!(house, before);
}

#[test]
fn sweeping_someone_elses_credit_is_not_depositor() {
    let mut house = setup();
    house
        .deposit(&ctx(bob()), quote(), ether(10), bob())
        .unwrap();
    house
        .deposit(&ctx(alice()), quote(), ether(10), alice())
        .unwrap();
    let before = house.clone();
    let (_, sweep) = token_call(quote(), ether(10), bob());

    let result = house.execute(&ctx(alice()), Mode::SettleOnly, &Sweep, &sweep);

    assert!(matches!(result, Err(HouseError::NotDepositor(_))));
    assert_eq!(house, before);
}

#[test]
fn wrapping_credited_claims_twice_is_insolvent() {
    let mut house = setup();
    let oid = create_call(&mut house, ether(1000));
    let (long, short) = house.token_data(oid).unwrap();

    // honest write: collateral collected, claims credited to alice
    struct Write;
    impl Venue for Write {
        fn address(&self) -> Address {
            Address::from([0x5F; 20])
        }

        fn write_options(
            &self,
            session: &mut Session<'_>,
            oid: OptionId,
            amount: U256,
            receivers: [Address; 2],
        ) -> Result<(), HouseError> {
            let record = session.record(oid)?;
            session.collect(record.parameters.base, amount)?;
            session.mint_options(oid, amount)?;
            session.credit(record.long, receivers[0], amount)?;
            session.credit(record.short, receivers[1], amount)
        }
    }
    house
        .execute(&ctx(alice()), Mode::PullAndSettle, &Write, &write_call(oid, ether(2)))
        .unwrap();

    let before = house.clone();
    let data = IVenue::wrapFromBalanceCall {
        oid,
        amount: ether(2),
        receiver: alice(),
    }
    .abi_encode();

    let result = house.execute(&ctx(alice()), Mode::SettleOnly, &DoubleWrap, &data);

    let token = insolvent_token(result);
    assert!(token == long || token == short);
    assert_eq!(house, before);
}

#[test]
fn counterfeit_credit_is_insolvent() {
    let mut house = setup();
    let (mint, _) = token_call(base(), ether(1), alice());

    let result = house.execute(&ctx(alice()), Mode::SettleOnly, &Counterfeit, &mint);

    assert_eq!(insolvent_token(result), base());
    assert_eq!(house.credit_of(base(), alice()), U256::ZERO);
}

#[test]
fn fee_on_transfer_deposit_is_insolvent() {
    let mut house = setup();
    let taxed = Address::from([0x33; 20]);
    house
        .deploy_asset(Erc20::with_transfer_fee(taxed, 100))
        .unwrap();
    fund(&mut house, taxed, alice(), ether(10));
    let before = house.clone();

    let direct = house.deposit(&ctx(alice()), taxed, ether(10), alice());
    assert!(matches!(direct, Err(HouseError::Insolvent(_))));
    assert_eq!(house, before);

    let (deposit, _) = token_call(taxed, ether(10), alice());
    let routed = house.execute(&ctx(alice()), Mode::PullAndSettle, &PassThrough, &deposit);
    assert_eq!(insolvent_token(routed), taxed);
    assert_eq!(house, before);
}

#[test]
fn core_errors_surface_as_execution_failed() {
    let mut house = setup();
    let oid = OptionId::repeat_byte(0x77);

    let result = house.execute(
        &ctx(alice()),
        Mode::SettleOnly,
        &FlashWrite,
        &write_call(oid, ether(1)),
    );

    match result {
        Err(HouseError::ExecutionFailed(inner)) => assert!(matches!(
            *inner,
            HouseError::Options(OptionsError::UnknownOption(_))
        )),
        other => panic!("expected ExecutionFailed, got {other:?}"),
    }
}
