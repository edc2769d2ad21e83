#![cfg_attr(not(any(test, feature = "std")), no_std)]
extern crate alloc;

mod house;
pub mod ledger;
pub mod session;
pub mod venue;

use alloc::{boxed::Box, vec::Vec};
use alloy_sol_types::{sol, SolError};
use options::OptionsError;

pub use house::{House, Phase, Position};
pub use ledger::Ledger;
pub use session::Session;
pub use venue::{IVenue, Venue};

/// How an execute call may source assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Only existing ledger credit may be consumed.
    SettleOnly = 0,
    /// Fresh assets may also be pulled from the caller's wallet.
    PullAndSettle = 1,
}

impl Mode {
    /// Converts a u8 to Mode.
    ///
    /// # Errors
    /// - `InvalidMode`: If `value` is neither 0 nor 1
    pub const fn from_u8(value: u8) -> Result<Self, HouseError> {
        match value {
            0 => Ok(Self::SettleOnly),
            1 => Ok(Self::PullAndSettle),
            _ => Err(HouseError::InvalidMode(InvalidMode { mode: value })),
        }
    }

    #[must_use]
    pub const fn allows_pull(self) -> bool {
        matches!(self, Self::PullAndSettle)
    }
}

impl TryFrom<u8> for Mode {
    type Error = HouseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value)
    }
}

sol! {
    /// Emitted after a venue call commits.
    #[derive(Debug)]
    event Executed(address indexed caller, address indexed venue);

    /// Emitted when assets are pulled into custody and credited.
    #[derive(Debug)]
    event Deposited(address indexed token, address indexed owner, uint256 amount);

    /// Emitted when credit leaves custody.
    #[derive(Debug)]
    event Withdrawn(
        address indexed token,
        address indexed owner,
        address receiver,
        uint256 amount
    );

    /// Emitted when an owner approves or revokes a delegate.
    #[derive(Debug)]
    event DelegateUpdated(address indexed owner, address indexed delegate, bool approved);
}

sol! {
    /// Errors that can occur in the House.
    #[derive(Debug)]
    error NotDepositor(address owner, address caller);
    #[derive(Debug)]
    error ExecutionFailed(bytes reason);
    #[derive(Debug)]
    error Insolvent(address token, uint256 held, uint256 owed);
    #[derive(Debug)]
    error PullNotPermitted(address token, uint256 amount);
    #[derive(Debug)]
    error InvalidCalldata();
    #[derive(Debug)]
    error InvalidMode(uint8 mode);
    #[derive(Debug)]
    error Unsupported(bytes4 selector);
    #[derive(Debug)]
    error ManagerMismatch(address expected, address actual);
    #[derive(Debug)]
    error CustodyLocked(address token);
    #[derive(Debug)]
    error ProtectedToken(address token);
}

#[derive(Debug, thiserror::Error)]
pub enum HouseError {
    #[error(transparent)]
    Options(#[from] OptionsError),
    /// Caller is neither the owner of the credit nor an approved delegate.
    #[error("{} may not move credit of {}", .0.caller, .0.owner)]
    NotDepositor(NotDepositor),
    /// A venue call was rolled back; holds the cause.
    #[error("execution failed: {0}")]
    ExecutionFailed(Box<HouseError>),
    #[error("custody of {} is {} but {} is owed", .0.token, .0.held, .0.owed)]
    Insolvent(Insolvent),
    #[error("settle-only call tried to pull {} of {}", .0.amount, .0.token)]
    PullNotPermitted(PullNotPermitted),
    #[error("calldata does not match the venue interface")]
    InvalidCalldata(InvalidCalldata),
    #[error("unknown mode {}", .0.mode)]
    InvalidMode(InvalidMode),
    #[error("venue does not support selector {}", .0.selector)]
    Unsupported(Unsupported),
    #[error("core is managed by {}, not {}", .0.actual, .0.expected)]
    ManagerMismatch(ManagerMismatch),
    /// House custody only moves inside a House call.
    #[error("custody of {} cannot be moved directly", .0.token)]
    CustodyLocked(CustodyLocked),
    /// Claim tokens and minter-controlled tokens are issued by the registry only.
    #[error("{} is not a freely minted asset", .0.token)]
    ProtectedToken(ProtectedToken),
}

impl HouseError {
    /// The innermost cause of a failed execute.
    #[must_use]
    pub fn reason(&self) -> &Self {
        match self {
            Self::ExecutionFailed(inner) => inner.reason(),
            other => other,
        }
    }

    /// ABI-encoded revert payload (selector followed by arguments).
    #[must_use]
    pub fn revert_data(&self) -> Vec<u8> {
        match self {
            Self::Options(e) => e.revert_data(),
            Self::NotDepositor(e) => e.abi_encode(),
            Self::ExecutionFailed(inner) => ExecutionFailed {
                reason: inner.revert_data().into(),
            }
            .abi_encode(),
            Self::Insolvent(e) => e.abi_encode(),
            Self::PullNotPermitted(e) => e.abi_encode(),
            Self::InvalidCalldata(e) => e.abi_encode(),
            Self::InvalidMode(e) => e.abi_encode(),
            Self::Unsupported(e) => e.abi_encode(),
            Self::ManagerMismatch(e) => e.abi_encode(),
            Self::CustodyLocked(e) => e.abi_encode(),
            Self::ProtectedToken(e) => e.abi_encode(),
        }
    }
}
