use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    /// Static USD-based rate used when no live or cached rate exists
    pub fallback_rate: Option<f64>,
}

const CURRENCIES: &[CurrencyInfo] = &[
    CurrencyInfo { code: "USD", name: "US Dollar", symbol: "$", fallback_rate: Some(1.0) },
    CurrencyInfo { code: "EUR", name: "Euro", symbol: "€", fallback_rate: Some(0.92) },
    CurrencyInfo { code: "GBP", name: "British Pound", symbol: "£", fallback_rate: Some(0.79) },
    CurrencyInfo { code: "JPY", name: "Japanese Yen", symbol: "¥", fallback_rate: Some(149.5) },
    CurrencyInfo { code: "CAD", name: "Canadian Dollar", symbol: "CA$", fallback_rate: Some(1.36) },
    CurrencyInfo { code: "AUD", name: "Australian Dollar", symbol: "A$", fallback_rate: Some(1.52) },
    CurrencyInfo { code: "CHF", name: "Swiss Franc", symbol: "CHF", fallback_rate: Some(0.88) },
    CurrencyInfo { code: "CNY", name: "Chinese Yuan", symbol: "CN¥", fallback_rate: Some(7.24) },
    CurrencyInfo { code: "INR", name: "Indian Rupee", symbol: "₹", fallback_rate: Some(83.1) },
    CurrencyInfo { code: "HKD", name: "Hong Kong Dollar", symbol: "HK$", fallback_rate: None },
    CurrencyInfo { code: "NZD", name: "New Zealand Dollar", symbol: "NZ$", fallback_rate: None },
    CurrencyInfo { code: "KRW", name: "South Korean Won", symbol: "₩", fallback_rate: None },
    CurrencyInfo { code: "BRL", name: "Brazilian Real", symbol: "R$", fallback_rate: None },
    CurrencyInfo { code: "MXN", name: "Mexican Peso", symbol: "MX$", fallback_rate: None },
    CurrencyInfo { code: "ILS", name: "Israeli New Shekel", symbol: "₪", fallback_rate: None },
    CurrencyInfo { code: "PHP", name: "Philippine Peso", symbol: "₱", fallback_rate: None },
    CurrencyInfo { code: "TWD", name: "New Taiwan Dollar", symbol: "NT$", fallback_rate: None },
    CurrencyInfo { code: "VND", name: "Vietnamese Dong", symbol: "₫", fallback_rate: None },
];

pub fn supported_currencies() -> &'static [CurrencyInfo] {
    CURRENCIES
}

pub fn currency_info(code: &str) -> Option<&'static CurrencyInfo> {
    CURRENCIES
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
}

pub fn currency_name(code: &str) -> Option<&'static str> {
    currency_info(code).map(|c| c.name)
}

/// ISO 4217 shape: exactly three ASCII letters.
pub fn is_valid_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Static rates relative to `base`. Only currencies with a fallback rate are
/// included; a base outside the table yields just `{base: 1}`.
pub fn fallback_rates(base: &str) -> BTreeMap<String, f64> {
    let base = base.trim().to_uppercase();
    let mut rates = BTreeMap::new();

    let base_rate = currency_info(&base).and_then(|c| c.fallback_rate);
    if let Some(base_rate) = base_rate {
        for info in CURRENCIES {
            if let Some(rate) = info.fallback_rate {
                rates.insert(info.code.to_string(), rate / base_rate);
            }
        }
    }

    rates.insert(base, 1.0);
    rates
}

/// Render a zero amount the way a display would show it in `code`.
fn render_zero(code: &str) -> String {
    match currency_info(code) {
        Some(info) if info.symbol.chars().all(|c| c.is_ascii_alphabetic()) => {
            format!("{} 0.00", info.symbol)
        }
        Some(info) => format!("{}0.00", info.symbol),
        None => format!("{} 0.00", code),
    }
}

/// Currency symbol for display. Derived by rendering a zero amount and
/// stripping the digits; anything unrecognised comes back as the code itself.
pub fn symbol_for(code: &str) -> String {
    if !is_valid_currency_code(code.trim()) {
        return code.to_string();
    }

    let re = match Regex::new(r"[\d\s.,]") {
        Ok(re) => re,
        Err(_) => return code.to_string(),
    };

    let symbol = re.replace_all(&render_zero(code.trim()), "").to_string();
    if symbol.is_empty() {
        code.to_string()
    } else {
        symbol
    }
}
