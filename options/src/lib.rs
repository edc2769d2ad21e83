#![cfg_attr(not(any(test, feature = "std")), no_std)]
extern crate alloc;

pub mod erc20;
pub mod math;
pub mod registry;
pub mod wrapped;

use alloc::vec::Vec;
use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::{sol, SolError};

pub use erc20::{Erc20, TokenBook};
pub use registry::{Core, Exercise, Leg, OptionRecord, Supply};
pub use wrapped::WrappedOptionToken;

/// Deterministic identifier of an option series.
pub type OptionId = B256;

/// Represents the type of option contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionType {
    /// Call option: Right to BUY underlying at strike price.
    #[default]
    Call,
    /// Put option: Right to SELL underlying at strike price.
    Put,
}

impl OptionType {
    /// Converts option type to u8 for encoding.
    ///
    /// # Returns
    /// - `0` for Call
    /// - `1` for Put
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Call => 0,
            Self::Put => 1,
        }
    }

    #[must_use]
    pub const fn from_is_call(is_call: bool) -> Self {
        if is_call {
            Self::Call
        } else {
            Self::Put
        }
    }

    #[must_use]
    pub const fn is_call(self) -> bool {
        matches!(self, Self::Call)
    }
}

/// Sender and block time of the call being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Address,
    pub timestamp: u64,
}

impl CallContext {
    #[must_use]
    pub const fn new(sender: Address, timestamp: u64) -> Self {
        Self { sender, timestamp }
    }
}

/// The five parameters that define an option series.
///
/// `strike` is the amount of quote asset paid per one unit of base asset,
/// as an 18-decimal fixed point number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionParameters {
    pub base: Address,
    pub quote: Address,
    pub strike: U256,
    pub expiry: u64,
    pub option_type: OptionType,
}

impl OptionParameters {
    #[must_use]
    pub const fn new(base: Address, quote: Address, strike: U256, expiry: u64, is_call: bool) -> Self {
        Self {
            base,
            quote,
            strike,
            expiry,
            option_type: OptionType::from_is_call(is_call),
        }
    }

    #[must_use]
    pub fn id(&self) -> OptionId {
        generate_option_id(
            self.base,
            self.quote,
            self.strike,
            self.expiry,
            self.option_type,
        )
    }
}

/// Generates a deterministic id for an option series.
///
/// The id is `keccak256(base, quote, strike, expiry, option_type)` over the
/// packed encoding, with strike and expiry as 32-byte big-endian words.
/// Every writer of the same parameters shares the same id, so the claim
/// tokens behind it are fungible.
///
/// # Parameters
/// - `base`: Address of the base (underlying) asset
/// - `quote`: Address of the quote asset
/// - `strike`: Strike price (18 decimals, quote per base)
/// - `expiry`: Expiration timestamp
/// - `option_type`: Call or Put
///
/// # Returns
/// Deterministic `B256` hash as option id
#[must_use]
pub fn generate_option_id(
    base: Address,
    quote: Address,
    strike: U256,
    expiry: u64,
    option_type: OptionType,
) -> OptionId {
    let encoded = [
        base.as_slice(),
        quote.as_slice(),
        strike.to_be_bytes::<32>().as_slice(),
        U256::from(expiry).to_be_bytes::<32>().as_slice(),
        &[option_type.to_u8()],
    ]
    .concat();

    keccak256(encoded)
}

sol! {
    /// Emitted once per option series, when its claim tokens are deployed.
    #[derive(Debug)]
    event OptionCreated(
        bytes32 indexed oid,
        address indexed base,
        address indexed quote,
        uint256 strike,
        uint64 expiry,
        bool is_call,
        address long,
        address short
    );
}

sol! {
    /// Errors that can occur in the option core and its tokens.
    #[derive(Debug)]
    error DuplicateOption(bytes32 oid);
    #[derive(Debug)]
    error UnknownOption(bytes32 oid);
    #[derive(Debug)]
    error InsufficientBalance(address owner, uint256 available, uint256 requested);
    #[derive(Debug)]
    error InsufficientExerciseProceeds(bytes32 oid, uint256 available, uint256 requested);
    #[derive(Debug)]
    error InsufficientCollateral(bytes32 oid, uint256 available, uint256 requested);
    #[derive(Debug)]
    error ExpiredOption(bytes32 oid, uint64 expiry, uint64 timestamp);
    #[derive(Debug)]
    error NotExpired(bytes32 oid, uint64 expiry, uint64 timestamp);
    #[derive(Debug)]
    error InvalidStrike();
    #[derive(Debug)]
    error InvalidExpiry(uint64 expiry, uint64 timestamp);
    #[derive(Debug)]
    error IdenticalAssets(address asset);
    #[derive(Debug)]
    error UnauthorizedCaller(address expected, address actual);
    #[derive(Debug)]
    error TransferFailed(address token, address from, address to, uint256 amount);
    #[derive(Debug)]
    error UnknownToken(address token);
    #[derive(Debug)]
    error TokenExists(address token);
    #[derive(Debug)]
    error BrokenPairing(bytes32 oid);
    #[derive(Debug)]
    error ArithmeticOverflow();
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// An option with the same parameters already exists.
    #[error("option {} already exists", .0.oid)]
    DuplicateOption(DuplicateOption),
    #[error("option {} does not exist", .0.oid)]
    UnknownOption(UnknownOption),
    #[error("{} holds {} but {} was requested", .0.owner, .0.available, .0.requested)]
    InsufficientBalance(InsufficientBalance),
    /// Redeem asked for more than prior exercises paid into the option.
    #[error("option {} has {} exercised units to redeem, {} requested", .0.oid, .0.available, .0.requested)]
    InsufficientExerciseProceeds(InsufficientExerciseProceeds),
    #[error("option {} has {} collateral left, {} requested", .0.oid, .0.available, .0.requested)]
    InsufficientCollateral(InsufficientCollateral),
    #[error("option {} expired at {}", .0.oid, .0.expiry)]
    ExpiredOption(ExpiredOption),
    #[error("option {} does not expire until {}", .0.oid, .0.expiry)]
    NotExpired(NotExpired),
    #[error("strike must be positive")]
    InvalidStrike(InvalidStrike),
    #[error("expiry {} is not after {}", .0.expiry, .0.timestamp)]
    InvalidExpiry(InvalidExpiry),
    #[error("base and quote are both {}", .0.asset)]
    IdenticalAssets(IdenticalAssets),
    #[error("caller {} is not {}", .0.actual, .0.expected)]
    UnauthorizedCaller(UnauthorizedCaller),
    #[error("transfer of {} {} from {} to {} failed", .0.amount, .0.token, .0.from, .0.to)]
    TransferFailed(TransferFailed),
    #[error("token {} is not deployed", .0.token)]
    UnknownToken(UnknownToken),
    #[error("token {} is already deployed", .0.token)]
    TokenExists(TokenExists),
    /// Long/short supplies no longer reconcile with collateral and proceeds.
    #[error("supply of option {} is out of balance", .0.oid)]
    BrokenPairing(BrokenPairing),
    #[error("arithmetic overflow")]
    ArithmeticOverflow(ArithmeticOverflow),
}

impl OptionsError {
    /// ABI-encoded revert payload (selector followed by arguments).
    #[must_use]
    pub fn revert_data(&self) -> Vec<u8> {
        match self {
            Self::DuplicateOption(e) => e.abi_encode(),
            Self::UnknownOption(e) => e.abi_encode(),
            Self::InsufficientBalance(e) => e.abi_encode(),
            Self::InsufficientExerciseProceeds(e) => e.abi_encode(),
            Self::InsufficientCollateral(e) => e.abi_encode(),
            Self::ExpiredOption(e) => e.abi_encode(),
            Self::NotExpired(e) => e.abi_encode(),
            Self::InvalidStrike(e) => e.abi_encode(),
            Self::InvalidExpiry(e) => e.abi_encode(),
            Self::IdenticalAssets(e) => e.abi_encode(),
            Self::UnauthorizedCaller(e) => e.abi_encode(),
            Self::TransferFailed(e) => e.abi_encode(),
            Self::UnknownToken(e) => e.abi_encode(),
            Self::TokenExists(e) => e.abi_encode(),
            Self::BrokenPairing(e) => e.abi_encode(),
            Self::ArithmeticOverflow(e) => e.abi_encode(),
        }
    }

    pub(crate) const fn overflow() -> Self {
        Self::ArithmeticOverflow(ArithmeticOverflow {})
    }

    pub(crate) const fn insufficient_balance(owner: Address, available: U256, requested: U256) -> Self {
        Self::InsufficientBalance(InsufficientBalance {
            owner,
            available,
            requested,
        })
    }
}
