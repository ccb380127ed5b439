use thiserror::Error;

/// Fractional digits of the pooled asset; one whole unit is `10^18` base units.
pub const ASSET_DECIMALS: u32 = 18;
pub const ONE_UNIT: u128 = 10u128.pow(ASSET_DECIMALS);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid digit in amount {0:?}")]
    InvalidDigit(String),
    #[error("amount {0:?} has more than {decimals} fractional digits", decimals = ASSET_DECIMALS)]
    TooPrecise(String),
    #[error("amount {0:?} does not fit in 128 bits of base units")]
    Overflow(String),
}

/// Parses a decimal string like `"2000"` or `"0.0001"` into base units.
pub fn parse_units(s: &str) -> Result<u128, UnitsError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(UnitsError::Empty);
    }
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(UnitsError::InvalidDigit(s.to_string()));
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(UnitsError::InvalidDigit(s.to_string()));
    }
    if fraction.len() > ASSET_DECIMALS as usize {
        return Err(UnitsError::TooPrecise(s.to_string()));
    }

    let overflow = || UnitsError::Overflow(s.to_string());
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        fraction.parse::<u128>().map_err(|_| overflow())?
            * 10u128.pow(ASSET_DECIMALS - fraction.len() as u32)
    };

    whole_units
        .checked_mul(ONE_UNIT)
        .and_then(|units| units.checked_add(fraction_units))
        .ok_or_else(overflow)
}

/// Inverse of [`parse_units`], without trailing fractional zeros.
pub fn format_units(amount: u128) -> String {
    let whole = amount / ONE_UNIT;
    let fraction = amount % ONE_UNIT;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:0width$}", fraction, width = ASSET_DECIMALS as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}
