use alloc::{boxed::Box, collections::BTreeMap, vec::Vec};
use alloy_primitives::{Address, Log, U256};
use alloy_sol_types::{SolEvent, SolInterface};
use options::{
    ArithmeticOverflow, CallContext, Core, Erc20, OptionId, OptionParameters, OptionsError,
    TokenBook, WrappedOptionToken,
};

use crate::{
    ledger::Ledger,
    session::Session,
    venue::{dispatch, IVenue::IVenueCalls, Venue},
    CustodyLocked, DelegateUpdated, Deposited, Executed, HouseError, Insolvent, InvalidCalldata,
    ManagerMismatch, Mode, NotDepositor, ProtectedToken, Withdrawn,
};

/// Where a House call is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Snapshotting,
    VenueInvoked,
    Verifying,
    Committed,
    RolledBack,
}

/// What a withdrawal takes out of the House.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Credit in a single asset, paid to the first receiver.
    Asset(Address),
    /// Long and short credit of an option, paid to the first and second receiver.
    Options(OptionId),
    /// Wrapped pairs held by the owner, unwrapped into long and short.
    Wrapped(OptionId),
}

/// Everything a venue call can touch. Restored as a whole on failure.
///
/// Events of the call in flight wait in `pending`; committed history lives
/// on the House, outside the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct State {
    pub(crate) core: Core,
    pub(crate) tokens: TokenBook,
    pub(crate) wrapped: WrappedOptionToken,
    pub(crate) ledger: Ledger,
    pub(crate) pending: Vec<Log>,
}

impl State {
    pub(crate) fn emit(&mut self, address: Address, event: &impl SolEvent) {
        self.pending.push(Log {
            address,
            data: event.encode_log_data(),
        });
    }

    /// Checks every option's supply identities and that custody covers what
    /// the House owes in each asset.
    fn verify(&self, house: Address) -> Result<(), HouseError> {
        let mut owed: BTreeMap<Address, U256> = self.ledger.totals().collect();
        let mut owe = |token: Address, amount: U256| -> Result<(), HouseError> {
            let entry = owed.entry(token).or_default();
            *entry = entry
                .checked_add(amount)
                .ok_or(OptionsError::ArithmeticOverflow(ArithmeticOverflow {}))?;
            Ok(())
        };

        for (oid, record, supply) in self.core.iter() {
            self.core.check_invariants(oid, &self.tokens)?;

            let wrapped = self.wrapped.total_supply(oid);
            owe(record.parameters.base, supply.collateral)?;
            owe(record.parameters.quote, supply.proceeds)?;
            owe(record.long, wrapped)?;
            owe(record.short, wrapped)?;
        }

        for (token, liability) in owed {
            let held = self.tokens.balance_of(token, house);
            if held < liability {
                tracing::warn!(%token, %held, owed = %liability, "custody short of liabilities");
                return Err(HouseError::Insolvent(Insolvent {
                    token,
                    held,
                    owed: liability,
                }));
            }
        }
        Ok(())
    }
}

/// Central ledger and the only dispatcher of venue calls.
///
/// Every mutating call runs against a snapshot of the full state: the
/// call's effects are applied, solvency is verified, and on any error the
/// snapshot is put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct House {
    address: Address,
    state: State,
    phase: Phase,
    logs: Vec<Log>,
}

impl House {
    /// Builds a House around the registry it manages.
    ///
    /// # Errors
    /// - `ManagerMismatch`: If `core` is not managed by `address`
    pub fn new(address: Address, mut core: Core) -> Result<Self, HouseError> {
        if core.manager() != address {
            return Err(HouseError::ManagerMismatch(ManagerMismatch {
                expected: address,
                actual: core.manager(),
            }));
        }

        let logs = core.take_logs();
        Ok(Self {
            address,
            state: State {
                core,
                tokens: TokenBook::new(),
                wrapped: WrappedOptionToken::new(address),
                ledger: Ledger::new(),
                pending: Vec::new(),
            },
            phase: Phase::Idle,
            logs,
        })
    }

    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.state.core
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenBook {
        &self.state.tokens
    }

    #[must_use]
    pub const fn wrapped(&self) -> &WrappedOptionToken {
        &self.state.wrapped
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.state.ledger
    }

    #[must_use]
    pub fn credit_of(&self, token: Address, owner: Address) -> U256 {
        self.state.ledger.credit_of(token, owner)
    }

    /// Balance of `token` held by the House itself.
    #[must_use]
    pub fn custody(&self, token: Address) -> U256 {
        self.state.tokens.balance_of(token, self.address)
    }

    /// Committed House and registry events, oldest first.
    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    #[must_use]
    pub fn oid_from_parameters(parameters: &OptionParameters) -> OptionId {
        Core::oid_from_parameters(parameters)
    }

    /// # Errors
    /// - `UnknownOption`: If the series does not exist
    pub fn token_data(&self, oid: OptionId) -> Result<(Address, Address), HouseError> {
        Ok(self.state.core.token_data(oid)?)
    }

    /// Creates an option series in the managed registry.
    ///
    /// # Errors
    /// Any `create_option` error of the registry.
    pub fn create_option(
        &mut self,
        ctx: &CallContext,
        parameters: OptionParameters,
    ) -> Result<OptionId, HouseError> {
        self.transact(|state| Ok(state.core.create_option(&mut state.tokens, ctx, parameters)?))
    }

    /// Deploys a plain asset next to the House.
    ///
    /// # Errors
    /// - `ProtectedToken`: If the token has a minter or is a known claim token
    /// - `TokenExists`: If a token already sits at that address
    pub fn deploy_asset(&mut self, token: Erc20) -> Result<(), HouseError> {
        let address = token.address();
        if token.minter().is_some() || self.state.core.claim(address).is_some() {
            return Err(HouseError::ProtectedToken(ProtectedToken { token: address }));
        }
        Ok(self.state.tokens.deploy(token)?)
    }

    /// Mints a plain asset into a wallet.
    ///
    /// # Errors
    /// - `ProtectedToken`: If `token` is a claim token
    /// - `UnknownToken`: If `token` is not deployed
    pub fn mint_asset(
        &mut self,
        ctx: &CallContext,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HouseError> {
        if self.state.core.claim(token).is_some() {
            return Err(HouseError::ProtectedToken(ProtectedToken { token }));
        }
        Ok(self.state.tokens.mint(ctx.sender, token, to, amount)?)
    }

    /// Transfers from the sender's wallet.
    ///
    /// # Errors
    /// - `CustodyLocked`: If the sender is the House
    /// - `TransferFailed`: If the sender holds less than `amount`
    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HouseError> {
        self.ensure_outside(ctx, token)?;
        Ok(self.state.tokens.safe_transfer(token, ctx.sender, to, amount)?)
    }

    /// Sets the sender's allowance for `spender`.
    ///
    /// # Errors
    /// - `CustodyLocked`: If the sender is the House
    /// - `UnknownToken`: If `token` is not deployed
    pub fn approve(
        &mut self,
        ctx: &CallContext,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), HouseError> {
        self.ensure_outside(ctx, token)?;
        Ok(self.state.tokens.approve(token, ctx.sender, spender, amount)?)
    }

    fn ensure_outside(&self, ctx: &CallContext, token: Address) -> Result<(), HouseError> {
        if ctx.sender == self.address {
            tracing::warn!(%token, "direct move of custody refused");
            return Err(HouseError::CustodyLocked(CustodyLocked { token }));
        }
        Ok(())
    }

    /// Pulls `amount` of `asset` from the sender and credits it to `owner`.
    ///
    /// # Errors
    /// - `TransferFailed`: If the token refuses the pull
    /// - `Insolvent`: If less than `amount` arrived in custody
    pub fn deposit(
        &mut self,
        ctx: &CallContext,
        asset: Address,
        amount: U256,
        owner: Address,
    ) -> Result<(), HouseError> {
        let house = self.address;
        self.transact(|state| {
            state
                .tokens
                .safe_transfer_from(asset, house, ctx.sender, house, amount)?;
            state.ledger.credit(asset, owner, amount)?;
            state.emit(
                house,
                &Deposited {
                    token: asset,
                    owner,
                    amount,
                },
            );

            tracing::debug!(%asset, %owner, %amount, "deposited");
            Ok(())
        })
    }

    /// Pays a position of `owner` out of custody.
    ///
    /// # Errors
    /// - `NotDepositor`: If the sender is neither `owner` nor its delegate
    /// - `InsufficientBalance`: If `owner` holds less than `amount`
    /// - `UnknownOption`: If the position names an unknown option
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        owner: Address,
        position: Position,
        amount: U256,
        receivers: [Address; 2],
    ) -> Result<(), HouseError> {
        let house = self.address;
        let caller = ctx.sender;
        let [first, second] = receivers;

        self.transact(|state| {
            let pay = |state: &mut State, token: Address, to: Address| -> Result<(), HouseError> {
                state.tokens.safe_transfer(token, house, to, amount)?;
                state.emit(
                    house,
                    &Withdrawn {
                        token,
                        owner,
                        receiver: to,
                        amount,
                    },
                );
                Ok(())
            };

            match position {
                Position::Asset(token) => {
                    state.ledger.debit(token, owner, caller, amount)?;
                    pay(state, token, first)?;
                }
                Position::Options(oid) => {
                    let (long, short) = state.core.token_data(oid)?;
                    state.ledger.debit(long, owner, caller, amount)?;
                    state.ledger.debit(short, owner, caller, amount)?;
                    pay(state, long, first)?;
                    pay(state, short, second)?;
                }
                Position::Wrapped(oid) => {
                    if !state.ledger.is_entitled(owner, caller) {
                        return Err(HouseError::NotDepositor(NotDepositor { owner, caller }));
                    }
                    let (long, short) = state.core.token_data(oid)?;
                    state.wrapped.burn(house, oid, owner, amount)?;
                    pay(state, long, first)?;
                    pay(state, short, second)?;
                }
            }

            tracing::debug!(%owner, %caller, ?position, %amount, "withdrawn");
            Ok(())
        })
    }

    /// Lets `delegate` debit the sender's credit, or revokes it.
    pub fn set_delegate(&mut self, ctx: &CallContext, delegate: Address, approved: bool) {
        let owner = ctx.sender;
        self.state.ledger.set_delegate(owner, delegate, approved);
        let event = DelegateUpdated {
            owner,
            delegate,
            approved,
        };
        self.logs.push(Log {
            address: self.address,
            data: event.encode_log_data(),
        });
    }

    /// Moves wrapped units held by `from`.
    ///
    /// # Errors
    /// - `UnauthorizedCaller`: If the sender is neither `from` nor its operator
    /// - `InsufficientBalance`: If `from` holds less than `amount`
    pub fn transfer_wrapped(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        oid: OptionId,
        amount: U256,
    ) -> Result<(), HouseError> {
        Ok(self
            .state
            .wrapped
            .safe_transfer_from(ctx.sender, from, to, oid, amount)?)
    }

    pub fn set_wrapped_operator(&mut self, ctx: &CallContext, operator: Address, approved: bool) {
        self.state
            .wrapped
            .set_approval_for_all(ctx.sender, operator, approved);
    }

    /// Dispatches `data` to `venue` and commits its effects only if every
    /// option stays paired and custody still covers every liability.
    ///
    /// # Errors
    /// - `NotDepositor`: If the venue tried to debit credit the caller does not own
    /// - `ExecutionFailed`: For any other failure, wrapping the cause
    pub fn execute(
        &mut self,
        ctx: &CallContext,
        mode: Mode,
        venue: &dyn Venue,
        data: &[u8],
    ) -> Result<(), HouseError> {
        let call = IVenueCalls::abi_decode(data, true)
            .map_err(|_| wrap_failure(HouseError::InvalidCalldata(InvalidCalldata {})))?;

        let house = self.address;
        let target = venue.address();
        tracing::info!(
            caller = %ctx.sender,
            venue = %target,
            selector = %hex::encode(call.selector()),
            ?mode,
            "execute"
        );

        self.transact(|state| {
            let mut session = Session::new(house, *ctx, mode, state);
            dispatch(venue, &mut session, call)?;

            state.emit(
                house,
                &Executed {
                    caller: ctx.sender,
                    venue: target,
                },
            );
            Ok(())
        })
        .map_err(wrap_failure)
    }

    fn transact<T>(
        &mut self,
        apply: impl FnOnce(&mut State) -> Result<T, HouseError>,
    ) -> Result<T, HouseError> {
        self.enter(Phase::Snapshotting);
        let snapshot = self.state.clone();

        self.enter(Phase::VenueInvoked);
        let result = apply(&mut self.state).and_then(|value| {
            self.enter(Phase::Verifying);
            self.state.verify(self.address).map(|()| value)
        });

        match result {
            Ok(value) => {
                let mut committed = self.state.core.take_logs();
                committed.append(&mut self.state.pending);
                self.logs.append(&mut committed);
                self.enter(Phase::Committed);
                self.enter(Phase::Idle);
                Ok(value)
            }
            Err(err) => {
                self.state = snapshot;
                self.enter(Phase::RolledBack);
                tracing::debug!(%err, "rolled back");
                self.enter(Phase::Idle);
                Err(err)
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
    }
}

fn wrap_failure(err: HouseError) -> HouseError {
    match err {
        HouseError::NotDepositor(_) | HouseError::ExecutionFailed(_) => err,
        other => HouseError::ExecutionFailed(Box::new(other)),
    }
}
