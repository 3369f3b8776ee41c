//! Local withdrawal checks. None of these touch the network.

use std::str::FromStr;

use alloy::primitives::Address;
use rust_decimal::Decimal;

use crate::withdraw::error::ValidationError;
use crate::withdraw::types::WithdrawalContext;

/// Parse the amount as entered. Empty or zero means nothing was entered.
pub fn parse_amount(raw: &str) -> Result<Decimal, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::EmptyAmount);
    }
    let amount = Decimal::from_str(raw).map_err(|_| ValidationError::InvalidAmount)?;
    if amount.is_zero() {
        return Err(ValidationError::EmptyAmount);
    }
    if amount.is_sign_negative() {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(amount.normalize())
}

/// `0x`-prefixed, 20-byte hex address.
pub fn is_valid_address(raw: &str) -> bool {
    let raw = raw.trim();
    raw.len() == 42
        && (raw.starts_with("0x") || raw.starts_with("0X"))
        && Address::from_str(raw).is_ok()
}

/// Amount received after the fee, floored at zero.
pub fn payout(amount: Decimal, fee: Decimal) -> Decimal {
    (amount - fee).max(Decimal::ZERO)
}

/// Token selected, amount positive and covered by the balance.
pub fn check_amount(ctx: &WithdrawalContext) -> Result<Decimal, ValidationError> {
    if ctx.token.is_none() {
        return Err(ValidationError::NoToken);
    }
    let amount = parse_amount(&ctx.amount)?;
    if amount > ctx.available_balance {
        return Err(ValidationError::InsufficientBalance);
    }
    Ok(amount)
}

pub fn check_minimum(amount: Decimal, minimum: Decimal) -> Result<(), ValidationError> {
    if amount < minimum {
        return Err(ValidationError::BelowMinimum(minimum.normalize().to_string()));
    }
    Ok(())
}

pub fn check_address(destination: &str) -> Result<(), ValidationError> {
    if !is_valid_address(destination) {
        return Err(ValidationError::InvalidAddress);
    }
    Ok(())
}

/// All local checks in order, given a known minimum.
pub fn validate(ctx: &WithdrawalContext, minimum: Decimal) -> Result<Decimal, ValidationError> {
    let amount = check_amount(ctx)?;
    check_minimum(amount, minimum)?;
    check_address(&ctx.destination)?;
    Ok(amount)
}
