use crate::providers::{ProviderError, ValidationSnafu};

/// Longest window the provider will be asked for, in days.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

/// Rejects lookback windows the chart API cannot serve.
pub fn validate_lookback(lookback_days: u32) -> Result<(), ProviderError> {
    if lookback_days == 0 || lookback_days > MAX_LOOKBACK_DAYS {
        return ValidationSnafu {
            message: format!("lookback must be within 1..={MAX_LOOKBACK_DAYS} days, got {lookback_days}"),
        }
        .fail();
    }
    Ok(())
}

/// Rejects symbols that would produce a malformed request path.
pub fn validate_symbol(symbol: &str) -> Result<(), ProviderError> {
    let ok = !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_'));
    if !ok {
        return ValidationSnafu {
            message: format!("invalid symbol {symbol:?}"),
        }
        .fail();
    }
    Ok(())
}

/// Query string for a daily chart request covering `lookback_days`.
pub fn construct_params(lookback_days: u32) -> Vec<(String, String)> {
    vec![
        ("range".to_string(), format!("{lookback_days}d")),
        ("interval".to_string(), "1d".to_string()),
        ("includePrePost".to_string(), "false".to_string()),
    ]
}
