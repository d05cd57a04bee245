// Monthly achievement-vs-target trend

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::Product;
use crate::orders::Order;

const PERCENTAGE_DP: u32 = 4;
const PERCENT_CHANGE_DP: u32 = 2;

/// One month of the trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyAchievementRecord {
    /// `YYYY-MM`
    #[schema(example = "2024-03")]
    pub month: String,
    pub total_achievement: i64,
    pub total_target: i64,
    /// achievement / target × 100, 4 decimal places
    pub percentage: Decimal,
    /// Change against the previous month's percentage, 2 decimal places
    pub percent_change: Decimal,
}

/// How product targets are summed into a month
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetSummation {
    /// Target added once per line-item occurrence; a product ordered twice
    /// in a month counts its target twice
    #[default]
    PerLineItem,
    /// Target added once per distinct product per month
    PerProductPerMonth,
}

impl FromStr for TargetSummation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_line_item" => Ok(TargetSummation::PerLineItem),
            "per_product_per_month" => Ok(TargetSummation::PerProductPerMonth),
            other => Err(format!("Invalid target summation: {}", other)),
        }
    }
}

/// Target a single line item contributes to its month
///
/// `first_in_month` is true when the product has not yet been seen in that
/// month's bucket.
pub fn month_target_contribution(summation: TargetSummation, target: i64, first_in_month: bool) -> i64 {
    match summation {
        TargetSummation::PerLineItem => target,
        TargetSummation::PerProductPerMonth if first_in_month => target,
        TargetSummation::PerProductPerMonth => 0,
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct MonthTotals {
    achievement: i64,
    target: i64,
}

/// Compute the month-by-month trend over every order
///
/// The twelve months of `year` are always present (zero-filled); months
/// outside `year` appear only when they have orders. Records are sorted by
/// month string. Products missing from `products` contribute no target.
pub fn compute_monthly_trend(
    orders: &[Order],
    products: &[Product],
    year: i32,
    summation: TargetSummation,
) -> Vec<MonthlyAchievementRecord> {
    let targets: HashMap<Uuid, i64> = products.iter().map(|p| (p.id, p.target)).collect();

    let mut months: BTreeMap<String, MonthTotals> = (1..=12)
        .map(|month| (format!("{:04}-{:02}", year, month), MonthTotals::default()))
        .collect();
    let mut seen: HashSet<(String, Uuid)> = HashSet::new();

    for order in orders {
        let month = order.created_at.format("%Y-%m").to_string();
        for item in &order.items {
            let first_in_month = seen.insert((month.clone(), item.product_id));
            let target = targets.get(&item.product_id).copied().unwrap_or(0);

            let totals = months.entry(month.clone()).or_default();
            totals.achievement += i64::from(item.quantity);
            totals.target += month_target_contribution(summation, target, first_in_month);
        }
    }

    let mut previous = Decimal::ZERO;
    months
        .into_iter()
        .map(|(month, totals)| {
            let percentage = percentage(totals.achievement, totals.target);
            let percent_change = percent_change(previous, percentage);
            previous = percentage;

            MonthlyAchievementRecord {
                month,
                total_achievement: totals.achievement,
                total_target: totals.target,
                percentage,
                percent_change,
            }
        })
        .collect()
}

fn percentage(achievement: i64, target: i64) -> Decimal {
    if target == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(achievement) / Decimal::from(target) * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(PERCENTAGE_DP, RoundingStrategy::MidpointAwayFromZero)
}

fn percent_change(previous: Decimal, current: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    ((current - previous) / previous * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(PERCENT_CHANGE_DP, RoundingStrategy::MidpointAwayFromZero)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::orders::{LineItem, StatusLabel};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    /// Orders inside the configured year always yield exactly twelve
    /// sorted records whose achievements add up to the ordered quantities
    #[test]
    fn prop_twelve_sorted_months_for_orders_in_year() {
        proptest!(|(
            lines in prop::collection::vec((1u32..=12, 1i32..=500, 0i64..=1000), 0..=40)
        )| {
            let mut products = Vec::new();
            let mut orders = Vec::new();
            for &(month, quantity, target) in &lines {
                let product = Product::new("SKU", "Generated", Decimal::ONE, target);
                orders.push(Order {
                    id: Uuid::new_v4(),
                    order_number: "ORD-0001".to_string(),
                    pharmacy_id: Uuid::new_v4(),
                    items: vec![LineItem {
                        product_id: product.id,
                        quantity,
                        unit_price_at_order: Decimal::ONE,
                    }],
                    subtotal: Decimal::ZERO,
                    discount_percent: Decimal::ZERO,
                    total: Decimal::ZERO,
                    settlement_status: true,
                    status_label: StatusLabel::Normal,
                    created_at: Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap(),
                });
                products.push(product);
            }

            let trend = compute_monthly_trend(&orders, &products, 2024, TargetSummation::PerLineItem);

            prop_assert_eq!(trend.len(), 12);
            prop_assert!(trend.windows(2).all(|w| w[0].month < w[1].month));

            let achieved: i64 = trend.iter().map(|r| r.total_achievement).sum();
            let ordered: i64 = lines.iter().map(|&(_, q, _)| i64::from(q)).sum();
            prop_assert_eq!(achieved, ordered);

            for record in &trend {
                if record.total_target == 0 {
                    prop_assert_eq!(record.percentage, Decimal::ZERO);
                }
                prop_assert!(record.percentage.scale() <= PERCENTAGE_DP);
            }
        });
    }
}
