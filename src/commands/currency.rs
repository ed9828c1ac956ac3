use super::state::JournalState;
use crate::error::CoreResult;
use crate::fx::{CurrencyInfo, format_money, supported_currencies};

/// Rate from the base currency to the configured display currency.
pub async fn get_display_rate(state: &JournalState) -> CoreResult<f64> {
    state.rates.rate_for(&state.settings.display_currency).await
}

/// A base-currency amount rendered in the display currency, e.g. `-€1,234.50`.
/// Falls back to the base currency when the display currency has no rate.
pub async fn format_amount(state: &JournalState, amount_base: f64) -> String {
    let display = &state.settings.display_currency;

    match state.rates.rate_for(display).await {
        Ok(rate) => format_money(amount_base, rate, display),
        Err(e) => {
            log::warn!("{}, showing {} instead", e, state.settings.base_currency);
            format_money(amount_base, 1.0, &state.settings.base_currency)
        }
    }
}

pub fn list_currencies() -> Vec<CurrencyInfo> {
    supported_currencies().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::testing::TestJournal;

    #[tokio::test]
    async fn test_format_amount_uses_live_rate() {
        let mut journal = TestJournal::new();
        journal.state.settings.display_currency = "EUR".to_string();
        journal.provider.set_rates(&[("EUR", 0.5)]);

        assert_eq!(format_amount(&journal.state, -2469.0).await, "-€1,234.50");
        assert_eq!(get_display_rate(&journal.state).await.unwrap(), 0.5);
    }

    #[tokio::test]
    async fn test_format_amount_uses_fallback_when_provider_down() {
        let mut journal = TestJournal::new();
        journal.state.settings.display_currency = "EUR".to_string();
        journal.provider.set_failing(true);

        assert_eq!(format_amount(&journal.state, 100.0).await, "€92.00");
    }

    #[tokio::test]
    async fn test_unknown_display_currency_falls_back_to_base() {
        let mut journal = TestJournal::new();
        journal.state.settings.display_currency = "XYZ".to_string();
        journal.provider.set_failing(true);

        assert_eq!(format_amount(&journal.state, 12.5).await, "$12.50");
        assert!(matches!(
            get_display_rate(&journal.state).await,
            Err(CoreError::RateUnavailable(_))
        ));
    }

    #[test]
    fn test_list_currencies_includes_majors() {
        let codes: Vec<_> = list_currencies().iter().map(|c| c.code).collect();
        assert!(codes.contains(&"USD"));
        assert!(codes.contains(&"EUR"));
    }
}
