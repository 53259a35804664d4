use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Monetary amount in minor units (wei).
pub type Amount = u128;

/// Decimal places between one ether and one wei.
pub const ETHER_SCALE: u32 = 18;

const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// Converts an ether value to wei.
///
/// Returns `None` for negative values, values with a fractional wei part, or
/// values too large to represent.
pub fn ether_to_wei(ether: Decimal) -> Option<Amount> {
    if ether.is_sign_negative() && !ether.is_zero() {
        return None;
    }

    let wei = ether.checked_mul(Decimal::from(WEI_PER_ETHER))?;

    if !wei.fract().is_zero() {
        return None;
    }

    wei.to_u128()
}

/// Renders a wei amount as ether, trailing zeros removed.
///
/// Returns `None` when the amount does not fit a `Decimal` mantissa.
pub fn wei_to_ether(wei: Amount) -> Option<Decimal> {
    let wei = i128::try_from(wei).ok()?;

    Decimal::try_from_i128_with_scale(wei, ETHER_SCALE)
        .ok()
        .map(|d| d.normalize())
}
