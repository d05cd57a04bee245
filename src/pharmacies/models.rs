use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Discount offer embedded in a pharmacy
///
/// The offer is never auto-deleted: once `remaining_duration_units` reaches 0
/// it simply stops decrementing until it is replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiscountOffer {
    pub percent: Decimal,
    /// Billing periods the offer remains auto-applicable
    pub remaining_duration_units: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DiscountOffer {
    /// Offer as written by an accept-order action: expires `duration_units`
    /// months after `now`
    ///
    /// Fails when the expiry falls outside the representable date range, as
    /// an offer without `expires_at` would never expire.
    pub fn accepted(percent: Decimal, duration_units: i32, now: DateTime<Utc>) -> ApiResult<Self> {
        let months = Months::new(duration_units.max(0).unsigned_abs());
        let expires_at = now.checked_add_months(months).ok_or_else(|| {
            ApiError::validation(format!(
                "duration of {} months has no representable expiry",
                duration_units
            ))
        })?;

        Ok(Self {
            percent,
            remaining_duration_units: duration_units,
            expires_at: Some(expires_at),
        })
    }

    /// Usable iff the percent is positive and the offer has not expired
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        if self.percent <= Decimal::ZERO {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }

    /// Decrement the remaining duration, but only while it is positive
    pub fn consume(&mut self) {
        if self.remaining_duration_units > 0 {
            self.remaining_duration_units -= 1;
        }
    }
}

/// Pharmacy with its optional discount offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Pharmacy {
    pub id: Uuid,
    pub name: String,
    pub offer: Option<DiscountOffer>,
}

impl Pharmacy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            offer: None,
        }
    }

    pub fn with_offer(mut self, offer: DiscountOffer) -> Self {
        self.offer = Some(offer);
        self
    }
}

/// Flat row shape of the `pharmacies` table
#[derive(Debug, Clone, FromRow)]
pub(crate) struct PharmacyRow {
    pub id: Uuid,
    pub name: String,
    pub discount_percent: Option<Decimal>,
    pub discount_duration: Option<i32>,
    pub discount_expires_at: Option<DateTime<Utc>>,
}

impl From<PharmacyRow> for Pharmacy {
    fn from(row: PharmacyRow) -> Self {
        let offer = row.discount_percent.map(|percent| DiscountOffer {
            percent,
            remaining_duration_units: row.discount_duration.unwrap_or(0),
            expires_at: row.discount_expires_at,
        });

        Self {
            id: row.id,
            name: row.name,
            offer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_offer_without_expiry_is_usable() {
        let offer = DiscountOffer {
            percent: dec!(15),
            remaining_duration_units: 3,
            expires_at: None,
        };
        assert!(offer.is_usable(now()));
    }

    #[test]
    fn test_expired_offer_is_not_usable() {
        let offer = DiscountOffer {
            percent: dec!(15),
            remaining_duration_units: 3,
            expires_at: Some(now() - Duration::days(1)),
        };
        assert!(!offer.is_usable(now()));
    }

    #[test]
    fn test_offer_expiring_exactly_now_is_not_usable() {
        let offer = DiscountOffer {
            percent: dec!(15),
            remaining_duration_units: 3,
            expires_at: Some(now()),
        };
        assert!(!offer.is_usable(now()));
    }

    #[test]
    fn test_zero_percent_offer_is_not_usable() {
        let offer = DiscountOffer {
            percent: Decimal::ZERO,
            remaining_duration_units: 3,
            expires_at: None,
        };
        assert!(!offer.is_usable(now()));
    }

    #[test]
    fn test_consume_stops_at_zero() {
        let mut offer = DiscountOffer {
            percent: dec!(10),
            remaining_duration_units: 1,
            expires_at: None,
        };
        offer.consume();
        assert_eq!(offer.remaining_duration_units, 0);
        offer.consume();
        assert_eq!(offer.remaining_duration_units, 0);
        // exhausted offers keep their percent until replaced
        assert_eq!(offer.percent, dec!(10));
    }

    #[test]
    fn test_accepted_offer_expires_after_duration_months() {
        let offer = DiscountOffer::accepted(dec!(12.5), 3, now()).unwrap();
        assert_eq!(offer.remaining_duration_units, 3);
        assert_eq!(
            offer.expires_at,
            Some(Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_accepted_offer_with_overflowing_duration_is_rejected() {
        let result = DiscountOffer::accepted(dec!(10), i32::MAX, now());
        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_row_without_offer_columns() {
        let row = PharmacyRow {
            id: Uuid::new_v4(),
            name: "Green Cross".to_string(),
            discount_percent: None,
            discount_duration: None,
            discount_expires_at: None,
        };
        let pharmacy: Pharmacy = row.into();
        assert!(pharmacy.offer.is_none());
    }
}
