//! 18-decimal fixed point helpers for strike arithmetic.
//!
//! Amounts paid into the protocol round up, amounts paid out round down, so
//! the quote pool of an option can never be drained below what it owes.

use alloy_primitives::U256;

use crate::OptionsError;

/// One whole unit in 18-decimal fixed point.
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// `amount * strike / WAD`, truncated toward zero.
///
/// # Errors
/// - `ArithmeticOverflow`: If `amount * strike` does not fit in 256 bits
pub fn mul_wad_down(amount: U256, strike: U256) -> Result<U256, OptionsError> {
    amount
        .checked_mul(strike)
        .map(|product| product / WAD)
        .ok_or(OptionsError::overflow())
}

/// `amount * strike / WAD`, rounded away from zero.
///
/// # Errors
/// - `ArithmeticOverflow`: If `amount * strike` does not fit in 256 bits
pub fn mul_wad_up(amount: U256, strike: U256) -> Result<U256, OptionsError> {
    let product = amount
        .checked_mul(strike)
        .ok_or(OptionsError::overflow())?;
    let quotient = product / WAD;

    if (product % WAD).is_zero() {
        Ok(quotient)
    } else {
        Ok(quotient + U256::from(1))
    }
}
