
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use arbitrary::{Arbitrary, Unstructured};
use fixture::*;
use house::{IVenue, Mode};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Actor {
    Alice,
    Bob,
}

impl Actor {
    fn address(self) -> Address {
        match self {
            Self::Alice => alice(),
            Self::Bob => bob(),
        }
    }

    fn other(self) -> Address {
        match self {
            Self::Alice => bob(),
            Self::Bob => alice(),
        }
    }
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Action {
    Write,
    MintThenWrap,
    Split,
    WrapFromBalance,
    Deposit,
    Withdraw,
    Exercise,
    Redeem,
    CloseFromBalance,
    CloseFromWrapped,
    Close,
    DepositQuote,
    WithdrawQuote,
    RedeemExpired,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Op {
    Call {
        actor: Actor,
        action: Action,
        amount: u8,
        pull: bool,
        to_other: bool,
    },
    Expire,
}

fn calldata(world: &World, action: Action, amount: U256, receiver: Address) -> Vec<u8> {
    let oid = world.oid;
    let receivers = [receiver, receiver];
    match action {
        Action::Write => IVenue::writeOptionsCall { oid, amount, receivers }.abi_encode(),
        Action::MintThenWrap => IVenue::mintOptionsThenWrapCall { oid, amount, receiver }.abi_encode(),
        Action::Split => IVenue::splitOptionsAndDepositCall { oid, amount, receivers }.abi_encode(),
        Action::WrapFromBalance => IVenue::wrapFromBalanceCall { oid, amount, receiver }.abi_encode(),
        Action::Deposit => IVenue::depositCall { oid, amount, receiver }.abi_encode(),
        Action::Withdraw => IVenue::withdrawCall { oid, amount, receivers }.abi_encode(),
        Action::Exercise => IVenue::exerciseFromBalanceCall { oid, amount, receiver }.abi_encode(),
        Action::Redeem => IVenue::redeemFromBalanceCall { oid, amount, receiver }.abi_encode(),
        Action::CloseFromBalance => IVenue::closeFromBalanceCall { oid, amount, receiver }.abi_encode(),
        Action::CloseFromWrapped => {
            IVenue::closeFromWrappedBalanceCall { oid, amount, receiver }.abi_encode()
        }
        Action::Close => IVenue::closeCall { oid, amount, receiver }.abi_encode(),
        Action::DepositQuote => IVenue::depositTokenCall {
            token: quote(),
            amount,
            receiver,
        }
        .abi_encode(),
        Action::WithdrawQuote => IVenue::withdrawTokenCall {
            token: quote(),
            amount,
            receiver,
        }
        .abi_encode(),
        Action::RedeemExpired => IVenue::redeemExpiredCall { oid, amount, receiver }.abi_encode(),
    }
}

/// Custody of every asset equals what the House owes for it, and nothing
/// leaks out of the closed set of wallets.
fn assert_conserved(world: &World) {
    let house = &world.house;
    let ledger = house.ledger();
    let supply = house.core().supply(world.oid).unwrap();
    let wrapped = house.wrapped().total_supply(world.oid);

    assert_eq!(world.custody(base()), ledger.total(base()) + supply.collateral);
    assert_eq!(world.custody(quote()), ledger.total(quote()) + supply.proceeds);
    assert_eq!(world.custody(world.long), ledger.total(world.long) + wrapped);
    assert_eq!(world.custody(world.short), ledger.total(world.short) + wrapped);

    for (token, minted) in [(base(), ether(2000)), (quote(), ether(2_000_000))] {
        let held = world.wallet(token, alice()) + world.wallet(token, bob()) + world.custody(token);
        assert_eq!(held, minted);
    }

    house
        .core()
        .check_invariants(world.oid, house.tokens())
        .unwrap();
}

fn run(ops: &[Op]) {
    // 1.5 quote per base so that wei-sized exercises round
    let mut world = World::new(U256::from(1_500_000_000_000_000_000u128));
    let mut now = NOW;

    for op in ops {
        let Op::Call {
            actor,
            action,
            amount,
            pull,
            to_other,
        } = *op
        else {
            now = EXPIRY;
            continue;
        };

        let receiver = if to_other { actor.other() } else { actor.address() };
        let mode = if pull { Mode::PullAndSettle } else { Mode::SettleOnly };
        let data = calldata(&world, action, U256::from(amount), receiver);

        let before = world.house.clone();
        if world.exec_at(actor.address(), mode, now, &data).is_err() {
            assert_eq!(world.house, before, "{op:?} failed without rolling back");
        }
        assert_conserved(&world);
    }
}

#[test]
fn scripted_lifecycle_conserves_assets() {
    let call = |actor, action, amount, pull| Op::Call {
        actor,
        action,
        amount,
        pull,
        to_other: false,
    };

    run(&[
        call(Actor::Alice, Action::Write, 9, true),
        call(Actor::Alice, Action::Withdraw, 4, true),
        call(Actor::Bob, Action::MintThenWrap, 5, true),
        call(Actor::Bob, Action::Split, 2, false),
        call(Actor::Alice, Action::Exercise, 3, true),
        call(Actor::Alice, Action::Redeem, 3, false),
        call(Actor::Bob, Action::CloseFromWrapped, 3, false),
        call(Actor::Alice, Action::Close, 4, true),
        call(Actor::Bob, Action::DepositQuote, 200, true),
        call(Actor::Bob, Action::WithdrawQuote, 50, false),
        Op::Expire,
        call(Actor::Alice, Action::Exercise, 1, true),
        call(Actor::Bob, Action::RedeemExpired, 2, false),
        call(Actor::Alice, Action::RedeemExpired, 2, false),
    ]);
}

proptest! {
    /// Property: any sequence of venue calls, successful or not, keeps
    /// custody equal to House liabilities and leaves failed calls without
    /// a trace
    #[test]
    fn prop_venue_calls_conserve_assets(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
        let mut input = Unstructured::new(&bytes);
        let ops: Vec<Op> = input.arbitrary().unwrap_or_default();
        run(&ops);
    }
}
