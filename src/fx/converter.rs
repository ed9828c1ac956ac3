//! Stateless money conversion and formatting.
//!
//! Amounts in the base currency are multiplied by a rate (units of the target
//! currency per base unit). Intermediate results are rounded to 4 places to
//! suppress binary floating-point noise; display output uses exactly 2.

use super::currency::symbol_for;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    // Avoid "-0.00" in formatted output
    if rounded == 0.0 { 0.0 } else { rounded }
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn round4(value: f64) -> f64 {
    round_to(value, 4)
}

fn usable_rate(rate: f64) -> bool {
    rate.is_finite() && rate != 0.0
}

/// Convert a base-currency amount. An unusable rate (0, NaN, infinite) gives 0.
pub fn convert(amount_base: f64, rate: f64) -> f64 {
    if !usable_rate(rate) || !amount_base.is_finite() {
        return 0.0;
    }
    round4(amount_base * rate)
}

/// Convert a local-currency amount back to the base currency.
pub fn to_base(amount_local: f64, rate: f64) -> f64 {
    if !usable_rate(rate) || !amount_local.is_finite() {
        return 0.0;
    }
    round4(amount_local / rate)
}

/// Converted amount with exactly two decimals, e.g. `92.00`.
pub fn format(amount_base: f64, rate: f64) -> String {
    format!("{:.2}", round2(convert(amount_base, rate)))
}

/// Converted amount with symbol and thousands separators, e.g. `-€1,234.50`.
pub fn format_money(amount_base: f64, rate: f64, currency: &str) -> String {
    let value = round2(convert(amount_base, rate));
    let sign = if value < 0.0 { "-" } else { "" };
    let digits = group_thousands(&format!("{:.2}", value.abs()));

    let symbol = symbol_for(currency);
    if symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        format!("{}{} {}", sign, symbol, digits)
    } else {
        format!("{}{}{}", sign, symbol, digits)
    }
}

fn group_thousands(fixed: &str) -> String {
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed, ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if frac_part.is_empty() {
        grouped
    } else {
        format!("{}.{}", grouped, frac_part)
    }
}
