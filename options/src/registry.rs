//! Option registry: creates option series and is the only issuer of their
//! long and short claim tokens.

use alloc::{collections::BTreeMap, vec::Vec};
use alloy_primitives::{keccak256, Address, Log, U256};
use alloy_sol_types::SolEvent;

use crate::{
    erc20::{Erc20, TokenBook},
    math::{mul_wad_down, mul_wad_up},
    BrokenPairing, CallContext, DuplicateOption, ExpiredOption, IdenticalAssets,
    InsufficientCollateral, InsufficientExerciseProceeds, InvalidExpiry, InvalidStrike,
    NotExpired, OptionCreated, OptionId, OptionParameters, OptionsError, TokenExists,
    UnauthorizedCaller, UnknownOption,
};

const LONG_TAG: &[u8] = b"LONG";
const SHORT_TAG: &[u8] = b"SHORT";

/// Which economic leg a claim token represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// Right to exercise.
    Long,
    /// Obligation backed by collateral.
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionRecord {
    pub parameters: OptionParameters,
    pub long: Address,
    pub short: Address,
}

impl OptionRecord {
    #[must_use]
    pub const fn token(&self, leg: Leg) -> Address {
        match leg {
            Leg::Long => self.long,
            Leg::Short => self.short,
        }
    }
}

/// Supply counters for one option series.
///
/// Balanced means:
/// - `long == collateral + reclaimed`
/// - `short == collateral + pending`
/// - `proceeds >= pending * strike` (rounded down)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Supply {
    pub long: U256,
    pub short: U256,
    /// Base units locked behind unexercised options.
    pub collateral: U256,
    /// Exercised units whose quote proceeds have not been redeemed yet.
    pub pending: U256,
    /// Shorts burned against collateral after expiry.
    pub reclaimed: U256,
    /// Quote units held for redeemers.
    pub proceeds: U256,
    pub written: U256,
    pub exercised: U256,
}

impl Supply {
    /// Checks the supply identities against the option's strike.
    #[must_use]
    pub fn is_balanced(&self, strike: U256) -> bool {
        let long_backed = self.collateral.checked_add(self.reclaimed) == Some(self.long);
        let short_backed = self.collateral.checked_add(self.pending) == Some(self.short);
        let proceeds_cover =
            mul_wad_down(self.pending, strike).is_ok_and(|owed| self.proceeds >= owed);

        long_backed && short_backed && proceeds_cover
    }
}

/// Assets released or collected by an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exercise {
    /// Base units the exerciser receives.
    pub base_out: U256,
    /// Quote units the exerciser must pay.
    pub quote_in: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OptionEntry {
    record: OptionRecord,
    supply: Supply,
}

/// The option registry.
///
/// Anyone may create an option series. Minting and burning claims is
/// restricted to the manager, which is the house that dispatches venues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Core {
    address: Address,
    manager: Address,
    options: BTreeMap<OptionId, OptionEntry>,
    claims: BTreeMap<Address, (OptionId, Leg)>,
    logs: Vec<Log>,
}

impl Core {
    #[must_use]
    pub const fn new(address: Address, manager: Address) -> Self {
        Self {
            address,
            manager,
            options: BTreeMap::new(),
            claims: BTreeMap::new(),
            logs: Vec::new(),
        }
    }

    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub const fn manager(&self) -> Address {
        self.manager
    }

    /// Events emitted by the registry, oldest first.
    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Hands the emitted events over to the caller, leaving none behind.
    pub fn take_logs(&mut self) -> Vec<Log> {
        core::mem::take(&mut self.logs)
    }

    /// Derives the option id without touching storage.
    #[must_use]
    pub fn oid_from_parameters(parameters: &OptionParameters) -> OptionId {
        parameters.id()
    }

    /// Creates an option series and deploys its long and short claim tokens.
    ///
    /// # Errors
    /// - `InvalidStrike`: If the strike is zero
    /// - `InvalidExpiry`: If the expiry is not after the current time
    /// - `IdenticalAssets`: If base and quote are the same asset
    /// - `DuplicateOption`: If the series already exists
    /// - `TokenExists`: If a token already sits at either claim address
    pub fn create_option(
        &mut self,
        tokens: &mut TokenBook,
        ctx: &CallContext,
        parameters: OptionParameters,
    ) -> Result<OptionId, OptionsError> {
        if parameters.strike.is_zero() {
            return Err(OptionsError::InvalidStrike(InvalidStrike {}));
        }
        if parameters.expiry <= ctx.timestamp {
            return Err(OptionsError::InvalidExpiry(InvalidExpiry {
                expiry: parameters.expiry,
                timestamp: ctx.timestamp,
            }));
        }
        if parameters.base == parameters.quote {
            return Err(OptionsError::IdenticalAssets(IdenticalAssets {
                asset: parameters.base,
            }));
        }

        let oid = parameters.id();
        if self.options.contains_key(&oid) {
            return Err(OptionsError::DuplicateOption(DuplicateOption { oid }));
        }

        let long = self.claim_address(oid, LONG_TAG);
        let short = self.claim_address(oid, SHORT_TAG);
        for claim in [long, short] {
            if tokens.get(claim).is_some() {
                return Err(OptionsError::TokenExists(TokenExists { token: claim }));
            }
        }
        tokens.deploy(Erc20::with_minter(long, self.address))?;
        tokens.deploy(Erc20::with_minter(short, self.address))?;

        let record = OptionRecord {
            parameters,
            long,
            short,
        };
        self.options.insert(
            oid,
            OptionEntry {
                record,
                supply: Supply::default(),
            },
        );
        self.claims.insert(long, (oid, Leg::Long));
        self.claims.insert(short, (oid, Leg::Short));

        let event = OptionCreated {
            oid,
            base: parameters.base,
            quote: parameters.quote,
            strike: parameters.strike,
            expiry: parameters.expiry,
            is_call: parameters.option_type.is_call(),
            long,
            short,
        };
        self.logs.push(Log {
            address: self.address,
            data: event.encode_log_data(),
        });

        tracing::debug!(%oid, %long, %short, creator = %ctx.sender, "option created");
        Ok(oid)
    }

    /// Long and short token addresses of an option.
    ///
    /// # Errors
    /// - `UnknownOption`: If the series does not exist
    pub fn token_data(&self, oid: OptionId) -> Result<(Address, Address), OptionsError> {
        let record = self.record(oid)?;
        Ok((record.long, record.short))
    }

    /// # Errors
    /// - `UnknownOption`: If the series does not exist
    pub fn record(&self, oid: OptionId) -> Result<&OptionRecord, OptionsError> {
        self.entry(oid).map(|entry| &entry.record)
    }

    /// # Errors
    /// - `UnknownOption`: If the series does not exist
    pub fn supply(&self, oid: OptionId) -> Result<Supply, OptionsError> {
        self.entry(oid).map(|entry| entry.supply)
    }

    /// Option and leg behind a claim token address, if it is one.
    #[must_use]
    pub fn claim(&self, token: Address) -> Option<(OptionId, Leg)> {
        self.claims.get(&token).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionId, &OptionRecord, &Supply)> + '_ {
        self.options
            .iter()
            .map(|(oid, entry)| (*oid, &entry.record, &entry.supply))
    }

    /// Writes `amount` options: one long and one short per unit, to `to`.
    ///
    /// # Errors
    /// - `UnauthorizedCaller`: If `caller` is not the manager
    /// - `UnknownOption`: If the series does not exist
    /// - `ExpiredOption`: If the option has expired
    pub fn mint_pair(
        &mut self,
        tokens: &mut TokenBook,
        caller: Address,
        now: u64,
        oid: OptionId,
        amount: U256,
        to: Address,
    ) -> Result<(), OptionsError> {
        self.ensure_manager(caller)?;
        let entry = self.entry(oid)?;
        ensure_live(oid, &entry.record, now)?;

        let mut supply = entry.supply;
        supply.long = add(supply.long, amount)?;
        supply.short = add(supply.short, amount)?;
        supply.collateral = add(supply.collateral, amount)?;
        supply.written = add(supply.written, amount)?;

        let record = entry.record;
        tokens.mint(self.address, record.long, to, amount)?;
        tokens.mint(self.address, record.short, to, amount)?;
        self.commit(tokens, oid, supply)
    }

    /// Burns `amount` long from `holder` for exercise.
    ///
    /// The exerciser owes `ceil(amount * strike)` quote and is owed `amount`
    /// base; moving those assets is up to the caller.
    ///
    /// # Errors
    /// - `UnauthorizedCaller`: If `caller` is not the manager
    /// - `UnknownOption`: If the series does not exist
    /// - `ExpiredOption`: If the option has expired
    /// - `InsufficientBalance`: If `holder` has less than `amount` long
    pub fn burn_for_exercise(
        &mut self,
        tokens: &mut TokenBook,
        caller: Address,
        now: u64,
        oid: OptionId,
        amount: U256,
        holder: Address,
    ) -> Result<Exercise, OptionsError> {
        self.ensure_manager(caller)?;
        let entry = self.entry(oid)?;
        ensure_live(oid, &entry.record, now)?;

        let quote_in = mul_wad_up(amount, entry.record.parameters.strike)?;
        let mut supply = entry.supply;
        supply.long = sub(supply.long, amount, holder)?;
        supply.collateral = sub(supply.collateral, amount, holder)?;
        supply.pending = add(supply.pending, amount)?;
        supply.exercised = add(supply.exercised, amount)?;
        supply.proceeds = add(supply.proceeds, quote_in)?;

        tokens.burn(self.address, entry.record.long, holder, amount)?;
        self.commit(tokens, oid, supply)?;

        Ok(Exercise {
            base_out: amount,
            quote_in,
        })
    }

    /// Burns `amount` short from `holder` against exercise proceeds and
    /// returns the quote payout, `floor(amount * strike)`.
    ///
    /// # Errors
    /// - `UnauthorizedCaller`: If `caller` is not the manager
    /// - `UnknownOption`: If the series does not exist
    /// - `InsufficientExerciseProceeds`: If fewer than `amount` units were exercised and not yet redeemed
    /// - `InsufficientBalance`: If `holder` has less than `amount` short
    pub fn burn_for_redeem(
        &mut self,
        tokens: &mut TokenBook,
        caller: Address,
        oid: OptionId,
        amount: U256,
        holder: Address,
    ) -> Result<U256, OptionsError> {
        self.ensure_manager(caller)?;
        let entry = self.entry(oid)?;

        let mut supply = entry.supply;
        if supply.pending < amount {
            return Err(OptionsError::InsufficientExerciseProceeds(
                InsufficientExerciseProceeds {
                    oid,
                    available: supply.pending,
                    requested: amount,
                },
            ));
        }

        let payout = mul_wad_down(amount, entry.record.parameters.strike)?;
        supply.short = sub(supply.short, amount, holder)?;
        supply.pending -= amount;
        supply.proceeds = supply.proceeds.checked_sub(payout).ok_or(
            OptionsError::InsufficientExerciseProceeds(InsufficientExerciseProceeds {
                oid,
                available: supply.proceeds,
                requested: payout,
            }),
        )?;

        tokens.burn(self.address, entry.record.short, holder, amount)?;
        self.commit(tokens, oid, supply)?;
        Ok(payout)
    }

    /// Burns a matched long+short pair before expiry and returns the base
    /// collateral released.
    ///
    /// # Errors
    /// - `UnauthorizedCaller`: If `caller` is not the manager
    /// - `UnknownOption`: If the series does not exist
    /// - `ExpiredOption`: If the option has expired
    /// - `InsufficientBalance`: If `owner` is short of either leg
    pub fn burn_pair(
        &mut self,
        tokens: &mut TokenBook,
        caller: Address,
        now: u64,
        oid: OptionId,
        amount: U256,
        owner: Address,
    ) -> Result<U256, OptionsError> {
        self.ensure_manager(caller)?;
        let entry = self.entry(oid)?;
        ensure_live(oid, &entry.record, now)?;

        let mut supply = entry.supply;
        supply.long = sub(supply.long, amount, owner)?;
        supply.short = sub(supply.short, amount, owner)?;
        supply.collateral = sub(supply.collateral, amount, owner)?;

        let record = entry.record;
        let short_held = tokens.balance_of(record.short, owner);
        if short_held < amount {
            return Err(OptionsError::insufficient_balance(owner, short_held, amount));
        }
        tokens.burn(self.address, record.long, owner, amount)?;
        tokens.burn(self.address, record.short, owner, amount)?;
        self.commit(tokens, oid, supply)?;
        Ok(amount)
    }

    /// Burns `amount` short after expiry and returns the unexercised base
    /// collateral it was backed by.
    ///
    /// # Errors
    /// - `UnauthorizedCaller`: If `caller` is not the manager
    /// - `UnknownOption`: If the series does not exist
    /// - `NotExpired`: If the option has not expired yet
    /// - `InsufficientCollateral`: If less than `amount` collateral is left
    /// - `InsufficientBalance`: If `holder` has less than `amount` short
    pub fn burn_expired(
        &mut self,
        tokens: &mut TokenBook,
        caller: Address,
        now: u64,
        oid: OptionId,
        amount: U256,
        holder: Address,
    ) -> Result<U256, OptionsError> {
        self.ensure_manager(caller)?;
        let entry = self.entry(oid)?;

        let expiry = entry.record.parameters.expiry;
        if now < expiry {
            return Err(OptionsError::NotExpired(NotExpired {
                oid,
                expiry,
                timestamp: now,
            }));
        }

        let mut supply = entry.supply;
        if supply.collateral < amount {
            return Err(OptionsError::InsufficientCollateral(InsufficientCollateral {
                oid,
                available: supply.collateral,
                requested: amount,
            }));
        }
        supply.short = sub(supply.short, amount, holder)?;
        supply.collateral -= amount;
        supply.reclaimed = add(supply.reclaimed, amount)?;

        tokens.burn(self.address, entry.record.short, holder, amount)?;
        self.commit(tokens, oid, supply)?;
        Ok(amount)
    }

    /// Verifies the supply identities of an option and that its claim token
    /// supplies agree with them.
    ///
    /// # Errors
    /// - `UnknownOption`: If the series does not exist
    /// - `BrokenPairing`: If any identity does not hold
    pub fn check_invariants(&self, oid: OptionId, tokens: &TokenBook) -> Result<(), OptionsError> {
        let entry = self.entry(oid)?;
        let supply = &entry.supply;

        let balanced = supply.is_balanced(entry.record.parameters.strike)
            && tokens.total_supply(entry.record.long) == supply.long
            && tokens.total_supply(entry.record.short) == supply.short;

        if balanced {
            Ok(())
        } else {
            tracing::warn!(%oid, ?supply, "option supply out of balance");
            Err(OptionsError::BrokenPairing(BrokenPairing { oid }))
        }
    }

    fn entry(&self, oid: OptionId) -> Result<&OptionEntry, OptionsError> {
        self.options
            .get(&oid)
            .ok_or(OptionsError::UnknownOption(UnknownOption { oid }))
    }

    fn commit(
        &mut self,
        tokens: &TokenBook,
        oid: OptionId,
        supply: Supply,
    ) -> Result<(), OptionsError> {
        if let Some(entry) = self.options.get_mut(&oid) {
            entry.supply = supply;
        }
        self.check_invariants(oid, tokens)
    }

    fn ensure_manager(&self, caller: Address) -> Result<(), OptionsError> {
        if caller == self.manager {
            Ok(())
        } else {
            Err(OptionsError::UnauthorizedCaller(UnauthorizedCaller {
                expected: self.manager,
                actual: caller,
            }))
        }
    }

    fn claim_address(&self, oid: OptionId, tag: &[u8]) -> Address {
        Address::from_word(keccak256(
            [self.address.as_slice(), oid.as_slice(), tag].concat(),
        ))
    }
}

fn ensure_live(oid: OptionId, record: &OptionRecord, now: u64) -> Result<(), OptionsError> {
    let expiry = record.parameters.expiry;
    if now < expiry {
        Ok(())
    } else {
        Err(OptionsError::ExpiredOption(ExpiredOption {
            oid,
            expiry,
            timestamp: now,
        }))
    }
}

fn add(a: U256, b: U256) -> Result<U256, OptionsError> {
    a.checked_add(b).ok_or(OptionsError::overflow())
}

fn sub(a: U256, b: U256, owner: Address) -> Result<U256, OptionsError> {
    a.checked_sub(b)
        .ok_or(OptionsError::insufficient_balance(owner, a, b))
}
