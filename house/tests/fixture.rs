#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use house::{House, HouseError, Session, Venue};
use options::{math::WAD, CallContext, Core, Erc20, OptionId, OptionParameters};

pub const NOW: u64 = 1_700_000_000;
pub const EXPIRY: u64 = NOW + 30 * 24 * 60 * 60;

pub fn house_address() -> Address {
    Address::from([0x40; 20])
}

pub fn core_address() -> Address {
    Address::from([0xC0; 20])
}

pub fn base() -> Address {
    Address::from([0x11; 20])
}

pub fn quote() -> Address {
    Address::from([0x22; 20])
}

pub fn alice() -> Address {
    Address::from([0xA1; 20])
}

pub fn bob() -> Address {
    Address::from([0xB0; 20])
}

pub fn carol() -> Address {
    Address::from([0xCA; 20])
}

pub fn ether(n: u64) -> U256 {
    U256::from(n) * WAD
}

pub fn ctx(sender: Address) -> CallContext {
    CallContext::new(sender, NOW)
}

/// A House with base and quote deployed, and alice and bob each holding
/// 1000 of both with unlimited allowance for the House.
pub fn setup() -> House {
    let core = Core::new(core_address(), house_address());
    let mut house = House::new(house_address(), core).unwrap();

    for token in [base(), quote()] {
        house.deploy_asset(Erc20::new(token)).unwrap();
        for holder in [alice(), bob()] {
            fund(&mut house, token, holder, ether(1000));
        }
    }
    house
}

pub fn fund(house: &mut House, token: Address, holder: Address, amount: U256) {
    let spender = house.address();
    house.mint_asset(&ctx(holder), token, holder, amount).unwrap();
    house
        .approve(&ctx(holder), token, spender, U256::MAX)
        .unwrap();
}

pub fn create_call(house: &mut House, strike: U256) -> OptionId {
    house
        .create_option(
            &ctx(alice()),
            OptionParameters::new(base(), quote(), strike, EXPIRY, true),
        )
        .unwrap()
}

/// Moves plain assets between wallets and credit, nothing else.
pub struct PassThrough;

pub fn pass_through_address() -> Address {
    Address::from([0x9A; 20])
}

impl Venue for PassThrough {
    fn address(&self) -> Address {
        pass_through_address()
    }

    fn deposit_token(
        &self,
        session: &mut Session<'_>,
        token: Address,
        amount: U256,
        receiver: Address,
    ) -> Result<(), HouseError> {
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
        let caller = session.caller();
        session.debit(token, caller, amount)?;
        session.push(token, receiver, amount)
    }
}
