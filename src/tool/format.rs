//! A small `%g`-style float formatter, used only by the presentational
//! `dump`/`ascii` tool operations -- not part of the binary format, so it
//! doesn't need to be bit-exact, just readable and stable.

/// Formats `value` the way C's `printf("%.<precision>g", value)` would:
/// scientific notation outside a sensible magnitude range, fixed-point
/// inside it, trailing zeros trimmed either way.
pub fn g(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return format!("{value}");
    }
    let precision = precision.max(1);
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= precision as i32 {
        let decimals = precision - 1;
        let formatted = format!("{value:.decimals$e}");
        trim_exponential(&formatted)
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_trailing_zeros(&format!("{value:.decimals$}"))
    }
}

/// Right-justifies `s` in a field `width` characters wide, as `%<width>s`
/// would (never truncates a longer string, matching printf's behavior).
pub fn pad(s: &str, width: usize) -> String {
    format!("{s:>width$}")
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    trimmed.trim_end_matches('.').to_string()
}

fn trim_exponential(s: &str) -> String {
    let Some((mantissa, exp)) = s.split_once('e') else {
        return s.to_string();
    };
    let mantissa = trim_trailing_zeros(mantissa);
    let exp_val: i32 = exp.parse().unwrap_or(0);
    format!("{mantissa}e{}{:02}", if exp_val < 0 { "-" } else { "+" }, exp_val.abs())
}
