use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::orders::{DiscountSource, LineItem, StatusLabel};
use crate::pharmacies::DiscountOffer;

/// Pure order arithmetic and discount resolution
pub struct PriceCalculator;

impl PriceCalculator {
    /// Calculate the line total for one item
    ///
    /// # Arguments
    /// * `quantity` - Number of units ordered
    /// * `unit_price` - Price per unit captured at order time
    pub fn calculate_line_total(quantity: i32, unit_price: Decimal) -> Decimal {
        Decimal::from(quantity) * unit_price
    }

    /// Subtotal = Σ quantity × unit_price_at_order
    pub fn calculate_subtotal(items: &[LineItem]) -> Decimal {
        items
            .iter()
            .map(|item| Self::calculate_line_total(item.quantity, item.unit_price_at_order))
            .sum()
    }

    /// Reduce `subtotal` by `percent`
    ///
    /// A zero (or negative) percent returns the subtotal untouched so a no-op
    /// discount never introduces rounding drift.
    pub fn apply_discount(subtotal: Decimal, percent: Decimal) -> Decimal {
        if percent <= Decimal::ZERO {
            return subtotal;
        }
        subtotal - subtotal * (percent / Decimal::ONE_HUNDRED)
    }

    /// Resolve the effective discount, in strict priority order:
    /// 1. an explicit non-zero discount, used verbatim
    /// 2. the pharmacy's offer, if usable at `now`
    /// 3. zero
    pub fn resolve_discount(
        explicit: Option<Decimal>,
        offer: Option<&DiscountOffer>,
        now: DateTime<Utc>,
    ) -> (Decimal, DiscountSource) {
        if let Some(percent) = explicit.filter(|p| !p.is_zero()) {
            return (percent, DiscountSource::Explicit);
        }

        match offer {
            Some(offer) if offer.is_usable(now) => (offer.percent, DiscountSource::PharmacyOffer),
            _ => (Decimal::ZERO, DiscountSource::None),
        }
    }

    /// Zero-discount orders are auto-approved; discounted ones await approval
    pub fn settlement_for(discount_percent: Decimal) -> (bool, StatusLabel) {
        if discount_percent > Decimal::ZERO {
            (false, StatusLabel::DiscountApplied)
        } else {
            (true, StatusLabel::Normal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn item(quantity: i32, price: Decimal) -> LineItem {
        LineItem {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price_at_order: price,
        }
    }

    fn offer(percent: Decimal, expires_in_days: Option<i64>) -> DiscountOffer {
        DiscountOffer {
            percent,
            remaining_duration_units: 3,
            expires_at: expires_in_days.map(|days| Utc::now() + Duration::days(days)),
        }
    }

    #[test]
    fn test_calculate_line_total_basic() {
        assert_eq!(PriceCalculator::calculate_line_total(2, dec!(4.50)), dec!(9.00));
    }

    #[test]
    fn test_calculate_subtotal_example() {
        let items = vec![item(2, dec!(100)), item(3, dec!(50))];
        assert_eq!(PriceCalculator::calculate_subtotal(&items), dec!(350));
    }

    #[test]
    fn test_calculate_subtotal_empty() {
        assert_eq!(PriceCalculator::calculate_subtotal(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_apply_discount() {
        assert_eq!(PriceCalculator::apply_discount(dec!(350), dec!(10)), dec!(315));
        assert_eq!(PriceCalculator::apply_discount(dec!(99.99), dec!(12.5)), dec!(87.49125));
    }

    #[test]
    fn test_zero_discount_returns_subtotal_exactly() {
        let subtotal = dec!(12.99);
        let total = PriceCalculator::apply_discount(subtotal, Decimal::ZERO);
        assert_eq!(total, subtotal);
        assert_eq!(total.scale(), subtotal.scale());
    }

    #[test]
    fn test_explicit_discount_wins_over_offer() {
        let offer = offer(dec!(20), None);
        let (percent, source) =
            PriceCalculator::resolve_discount(Some(dec!(10)), Some(&offer), Utc::now());
        assert_eq!(percent, dec!(10));
        assert_eq!(source, DiscountSource::Explicit);
    }

    #[test]
    fn test_explicit_zero_falls_through_to_offer() {
        let offer = offer(dec!(15), Some(30));
        let (percent, source) =
            PriceCalculator::resolve_discount(Some(Decimal::ZERO), Some(&offer), Utc::now());
        assert_eq!(percent, dec!(15));
        assert_eq!(source, DiscountSource::PharmacyOffer);
    }

    #[test]
    fn test_expired_offer_is_ignored() {
        let offer = offer(dec!(15), Some(-1));
        let (percent, source) = PriceCalculator::resolve_discount(None, Some(&offer), Utc::now());
        assert_eq!(percent, Decimal::ZERO);
        assert_eq!(source, DiscountSource::None);
    }

    #[test]
    fn test_no_discount_anywhere() {
        let (percent, source) = PriceCalculator::resolve_discount(None, None, Utc::now());
        assert_eq!(percent, Decimal::ZERO);
        assert_eq!(source, DiscountSource::None);
    }

    #[test]
    fn test_settlement_for() {
        assert_eq!(PriceCalculator::settlement_for(Decimal::ZERO), (true, StatusLabel::Normal));
        assert_eq!(
            PriceCalculator::settlement_for(dec!(5)),
            (false, StatusLabel::DiscountApplied)
        );
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Subtotal equals the sum of quantity × captured unit price
    #[test]
    fn prop_subtotal_is_sum_of_line_totals() {
        proptest!(|(
            lines in prop::collection::vec((1i32..=1000, 1u32..=100_000u32), 1..=20)
        )| {
            let items: Vec<LineItem> = lines
                .iter()
                .map(|&(quantity, cents)| LineItem {
                    product_id: Uuid::new_v4(),
                    quantity,
                    unit_price_at_order: Decimal::from(cents) / Decimal::from(100),
                })
                .collect();

            let expected: Decimal = items
                .iter()
                .map(|i| Decimal::from(i.quantity) * i.unit_price_at_order)
                .sum();
            prop_assert_eq!(PriceCalculator::calculate_subtotal(&items), expected);
        });
    }

    /// A zero discount leaves the total equal to the subtotal
    #[test]
    fn prop_zero_discount_total_equals_subtotal() {
        proptest!(|(cents in 0u64..=10_000_000u64)| {
            let subtotal = Decimal::from(cents) / Decimal::from(100);
            prop_assert_eq!(PriceCalculator::apply_discount(subtotal, Decimal::ZERO), subtotal);
        });
    }

    /// Discounts between 0 and 100 never raise the total or push it below zero
    #[test]
    fn prop_discounted_total_is_bounded() {
        proptest!(|(
            cents in 0u64..=10_000_000u64,
            percent_hundredths in 0u32..=10_000u32
        )| {
            let subtotal = Decimal::from(cents) / Decimal::from(100);
            let percent = Decimal::from(percent_hundredths) / Decimal::from(100);
            let total = PriceCalculator::apply_discount(subtotal, percent);
            prop_assert!(total <= subtotal);
            prop_assert!(total >= Decimal::ZERO);
        });
    }
}
