use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use maristock_core::Quantity;

/// Classification of a stock quantity against a product's alert threshold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    /// Stocked out.
    Empty,
    /// At or below half the threshold.
    Critical,
    /// Above half the threshold, at or below the threshold.
    Low,
    Ok,
}

impl StockLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockLevel::Empty => "empty",
            StockLevel::Critical => "critical",
            StockLevel::Low => "low",
            StockLevel::Ok => "ok",
        }
    }

    /// Anything an operator should act on.
    pub fn is_alarming(&self) -> bool {
        !matches!(self, StockLevel::Ok)
    }
}

impl core::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an available quantity against a per-product threshold.
///
/// A zero threshold (products without a configured alert level) only
/// distinguishes `Empty` from `Ok`.
pub fn classify(available: Quantity, threshold: Quantity) -> StockLevel {
    if available.is_zero() {
        return StockLevel::Empty;
    }
    let half = threshold.value() / Decimal::TWO;
    if available.value() <= half {
        StockLevel::Critical
    } else if available <= threshold {
        StockLevel::Low
    } else {
        StockLevel::Ok
    }
}

/// Per-level counts over a set of stock entries.
///
/// This is the figure warehouse dashboards surface ("N products stocked
/// out, M low").
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub empty: usize,
    pub critical: usize,
    pub low: usize,
    pub ok: usize,
}

impl AlertSummary {
    pub fn alarming(&self) -> usize {
        self.empty + self.critical + self.low
    }
}

/// Count stock levels over `(available, threshold)` pairs.
pub fn summarize<I>(entries: I) -> AlertSummary
where
    I: IntoIterator<Item = (Quantity, Quantity)>,
{
    let mut summary = AlertSummary::default();
    for (available, threshold) in entries {
        match classify(available, threshold) {
            StockLevel::Empty => summary.empty += 1,
            StockLevel::Critical => summary.critical += 1,
            StockLevel::Low => summary.low += 1,
            StockLevel::Ok => summary.ok += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn qty(value: Decimal) -> Quantity {
        Quantity::new(value).unwrap()
    }

    #[test]
    fn classifies_across_the_threshold_bands() {
        let threshold = qty(dec!(100));

        assert_eq!(classify(qty(dec!(0)), threshold), StockLevel::Empty);
        assert_eq!(classify(qty(dec!(0.01)), threshold), StockLevel::Critical);
        assert_eq!(classify(qty(dec!(50)), threshold), StockLevel::Critical);
        assert_eq!(classify(qty(dec!(50.01)), threshold), StockLevel::Low);
        assert_eq!(classify(qty(dec!(100)), threshold), StockLevel::Low);
        assert_eq!(classify(qty(dec!(100.01)), threshold), StockLevel::Ok);
    }

    #[test]
    fn zero_threshold_only_distinguishes_empty_from_ok() {
        let threshold = Quantity::ZERO;
        assert_eq!(classify(Quantity::ZERO, threshold), StockLevel::Empty);
        assert_eq!(classify(qty(dec!(0.01)), threshold), StockLevel::Ok);
        assert_eq!(classify(qty(dec!(1000)), threshold), StockLevel::Ok);
    }

    #[test]
    fn summarize_counts_each_band() {
        let threshold = qty(dec!(100));
        let summary = summarize(
            [dec!(0), dec!(10), dec!(60), dec!(99), dec!(250)]
                .into_iter()
                .map(|available| (qty(available), threshold)),
        );

        assert_eq!(
            summary,
            AlertSummary { empty: 1, critical: 1, low: 2, ok: 1 }
        );
        assert_eq!(summary.alarming(), 4);
    }

    proptest! {
        #[test]
        fn empty_only_at_zero(
            centitons in 0i64..1_000_000,
            threshold_centitons in 0i64..1_000_000,
        ) {
            let available = qty(Decimal::new(centitons, 2));
            let threshold = qty(Decimal::new(threshold_centitons, 2));
            let level = classify(available, threshold);
            prop_assert_eq!(level == StockLevel::Empty, available.is_zero());
        }

        #[test]
        fn level_is_monotone_in_available_quantity(
            a in 0i64..1_000_000,
            b in 0i64..1_000_000,
            threshold_centitons in 0i64..1_000_000,
        ) {
            // More stock never raises a more severe alert.
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let threshold = qty(Decimal::new(threshold_centitons, 2));
            let severity = |level: StockLevel| match level {
                StockLevel::Empty => 3,
                StockLevel::Critical => 2,
                StockLevel::Low => 1,
                StockLevel::Ok => 0,
            };
            let low_level = classify(qty(Decimal::new(lo, 2)), threshold);
            let high_level = classify(qty(Decimal::new(hi, 2)), threshold);
            prop_assert!(severity(high_level) <= severity(low_level));
        }
    }
}
