//! Coupon discount arithmetic and redemption checks. Prices are whole
//! currency units.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::round_dp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: u64,
    pub code: String,
    pub discount_type: DiscountType,
    /// Percent for `Percentage`, currency units for `Fixed`
    pub discount_value: f64,
    #[serde(default)]
    pub min_purchase: u64,
    #[serde(default)]
    pub max_discount: Option<u64>,
    #[serde(default)]
    pub max_uses: Option<u32>,
    #[serde(default)]
    pub max_uses_per_user: Option<u32>,
    #[serde(default)]
    pub current_uses: u32,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Empty means every course
    #[serde(default)]
    pub course_ids: Vec<u64>,
    /// Empty means every package
    #[serde(default)]
    pub package_ids: Vec<u64>,
    /// Empty means every user
    #[serde(default)]
    pub user_ids: Vec<u64>,
    #[serde(default)]
    pub first_purchase_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountBreakdown {
    pub discount_amount: u64,
    /// Share of the original price, 2 decimals
    pub discount_percentage: f64,
    pub final_price: u64,
}

pub fn calculate_discount(coupon: &Coupon, original_price: u64) -> DiscountBreakdown {
    if original_price < coupon.min_purchase {
        return DiscountBreakdown {
            discount_amount: 0,
            discount_percentage: 0.0,
            final_price: original_price,
        };
    }

    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let amount = (original_price as f64 * coupon.discount_value.max(0.0) / 100.0).round() as u64;
            coupon.max_discount.map_or(amount, |cap| amount.min(cap))
        }
        DiscountType::Fixed => coupon.discount_value.max(0.0).round() as u64,
    };
    let discount_amount = raw.min(original_price);

    let discount_percentage = if original_price > 0 {
        round_dp(discount_amount as f64 / original_price as f64 * 100.0, 2)
    } else {
        0.0
    };

    DiscountBreakdown {
        discount_amount,
        discount_percentage,
        final_price: original_price - discount_amount,
    }
}

/// Active, inside its validity period and under the global usage cap.
pub fn is_valid(coupon: &Coupon, now: DateTime<Utc>) -> bool {
    if !coupon.is_active {
        return false;
    }
    if coupon.valid_from.is_some_and(|from| now < from) {
        return false;
    }
    if coupon.valid_until.is_some_and(|until| now > until) {
        return false;
    }
    coupon.max_uses.map_or(true, |cap| coupon.current_uses < cap)
}

/// What is known about one learner's history with a coupon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponUsage {
    pub user_id: u64,
    /// Times this learner already redeemed the coupon
    pub uses_by_user: u32,
    pub completed_orders: u32,
}

pub fn can_be_used_by(coupon: &Coupon, usage: &CouponUsage, now: DateTime<Utc>) -> bool {
    if !is_valid(coupon, now) {
        return false;
    }
    if !coupon.user_ids.is_empty() && !coupon.user_ids.contains(&usage.user_id) {
        return false;
    }
    if coupon
        .max_uses_per_user
        .is_some_and(|cap| usage.uses_by_user >= cap)
    {
        return false;
    }
    !(coupon.first_purchase_only && usage.completed_orders > 0)
}

pub fn is_applicable_to_course(coupon: &Coupon, course_id: u64) -> bool {
    coupon.course_ids.is_empty() || coupon.course_ids.contains(&course_id)
}

pub fn is_applicable_to_package(coupon: &Coupon, package_id: u64) -> bool {
    coupon.package_ids.is_empty() || coupon.package_ids.contains(&package_id)
}

/// The item a coupon is redeemed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PurchaseTarget {
    Course { id: u64, price: u64 },
    Package { id: u64, price: u64 },
}

impl PurchaseTarget {
    pub fn price(&self) -> u64 {
        match self {
            Self::Course { price, .. } | Self::Package { price, .. } => *price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CouponRejection {
    NotFound,
    InvalidOrExpired,
    UsageLimitReached,
    NoTarget,
    NotApplicableToCourse,
    NotApplicableToPackage,
    MinimumPurchaseNotMet,
}

impl CouponRejection {
    pub fn message(self) -> &'static str {
        match self {
            Self::NotFound => "coupon code does not exist",
            Self::InvalidOrExpired => "coupon code is invalid or expired",
            Self::UsageLimitReached => "you have already used this coupon the maximum number of times",
            Self::NoTarget => "a course or a package is required to apply the coupon",
            Self::NotApplicableToCourse => "this coupon cannot be applied to this course",
            Self::NotApplicableToPackage => "this coupon cannot be applied to this package",
            Self::MinimumPurchaseNotMet => "minimum purchase amount not met",
        }
    }
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CouponValidation {
    Accepted {
        coupon_id: u64,
        code: String,
        discount: DiscountBreakdown,
    },
    Rejected {
        reason: CouponRejection,
    },
}

impl CouponValidation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn rejection(&self) -> Option<CouponRejection> {
        match self {
            Self::Rejected { reason } => Some(*reason),
            Self::Accepted { .. } => None,
        }
    }
}

fn reject(reason: CouponRejection) -> CouponValidation {
    CouponValidation::Rejected { reason }
}

/// Checks run in a fixed order; the first failure is reported.
pub fn validate_coupon(
    coupon: Option<&Coupon>,
    usage: &CouponUsage,
    target: Option<PurchaseTarget>,
    now: DateTime<Utc>,
) -> CouponValidation {
    let Some(coupon) = coupon else {
        return reject(CouponRejection::NotFound);
    };
    if !is_valid(coupon, now) {
        return reject(CouponRejection::InvalidOrExpired);
    }
    if !can_be_used_by(coupon, usage, now) {
        return reject(CouponRejection::UsageLimitReached);
    }
    let Some(target) = target else {
        return reject(CouponRejection::NoTarget);
    };
    match target {
        PurchaseTarget::Course { id, .. } if !is_applicable_to_course(coupon, id) => {
            return reject(CouponRejection::NotApplicableToCourse);
        }
        PurchaseTarget::Package { id, .. } if !is_applicable_to_package(coupon, id) => {
            return reject(CouponRejection::NotApplicableToPackage);
        }
        _ => {}
    }

    let discount = calculate_discount(coupon, target.price());
    if discount.discount_amount == 0 {
        return reject(CouponRejection::MinimumPurchaseNotMet);
    }

    CouponValidation::Accepted {
        coupon_id: coupon.id,
        code: coupon.code.clone(),
        discount,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 14, 9, 0, 0).unwrap()
    }

    fn coupon(discount_type: DiscountType, value: f64) -> Coupon {
        Coupon {
            id: 1,
            code: "BAC2026".to_string(),
            discount_type,
            discount_value: value,
            min_purchase: 0,
            max_discount: None,
            max_uses: None,
            max_uses_per_user: None,
            current_uses: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
            course_ids: Vec::new(),
            package_ids: Vec::new(),
            user_ids: Vec::new(),
            first_purchase_only: false,
        }
    }

    fn learner() -> CouponUsage {
        CouponUsage {
            user_id: 42,
            uses_by_user: 0,
            completed_orders: 0,
        }
    }

    #[test]
    fn percentage_is_capped_by_max_discount() {
        let mut c = coupon(DiscountType::Percentage, 20.0);
        c.max_discount = Some(150);
        let d = calculate_discount(&c, 1000);
        assert_eq!(d.discount_amount, 150);
        assert_eq!(d.final_price, 850);
        assert_eq!(d.discount_percentage, 15.0);
    }

    #[test]
    fn fixed_is_capped_by_price() {
        let c = coupon(DiscountType::Fixed, 500.0);
        let d = calculate_discount(&c, 300);
        assert_eq!(d.discount_amount, 300);
        assert_eq!(d.final_price, 0);
        assert_eq!(d.discount_percentage, 100.0);
    }

    #[test]
    fn below_minimum_gives_nothing() {
        let mut c = coupon(DiscountType::Percentage, 10.0);
        c.min_purchase = 2000;
        let d = calculate_discount(&c, 1500);
        assert_eq!(d.discount_amount, 0);
        assert_eq!(d.final_price, 1500);
        assert_eq!(calculate_discount(&coupon(DiscountType::Fixed, 10.0), 0).discount_percentage, 0.0);
    }

    #[test]
    fn percentage_rounds_to_whole_units() {
        let c = coupon(DiscountType::Percentage, 15.0);
        let d = calculate_discount(&c, 333);
        // 49.95 -> 50
        assert_eq!(d.discount_amount, 50);
        assert_eq!(d.discount_percentage, 15.02);
    }

    #[test]
    fn validity_window_and_global_cap() {
        let mut c = coupon(DiscountType::Fixed, 100.0);
        c.valid_from = Some(now() - Duration::days(1));
        c.valid_until = Some(now() + Duration::days(1));
        assert!(is_valid(&c, now()));
        assert!(!is_valid(&c, now() + Duration::days(2)));
        assert!(!is_valid(&c, now() - Duration::days(2)));

        c.max_uses = Some(10);
        c.current_uses = 10;
        assert!(!is_valid(&c, now()));

        let mut inactive = coupon(DiscountType::Fixed, 100.0);
        inactive.is_active = false;
        assert!(!is_valid(&inactive, now()));
    }

    #[test]
    fn per_user_rules() {
        let mut c = coupon(DiscountType::Fixed, 100.0);
        assert!(can_be_used_by(&c, &learner(), now()));

        c.user_ids = vec![7];
        assert!(!can_be_used_by(&c, &learner(), now()));
        c.user_ids.clear();

        c.max_uses_per_user = Some(1);
        let used = CouponUsage {
            uses_by_user: 1,
            ..learner()
        };
        assert!(!can_be_used_by(&c, &used, now()));

        c.max_uses_per_user = None;
        c.first_purchase_only = true;
        let returning = CouponUsage {
            completed_orders: 2,
            ..learner()
        };
        assert!(!can_be_used_by(&c, &returning, now()));
        assert!(can_be_used_by(&c, &learner(), now()));
    }

    #[test]
    fn validation_reports_first_failure() {
        let course = Some(PurchaseTarget::Course { id: 3, price: 4000 });
        assert_eq!(
            validate_coupon(None, &learner(), course, now()).rejection(),
            Some(CouponRejection::NotFound)
        );

        let mut c = coupon(DiscountType::Percentage, 25.0);
        c.course_ids = vec![9];
        assert_eq!(
            validate_coupon(Some(&c), &learner(), None, now()).rejection(),
            Some(CouponRejection::NoTarget)
        );
        assert_eq!(
            validate_coupon(Some(&c), &learner(), course, now()).rejection(),
            Some(CouponRejection::NotApplicableToCourse)
        );
        let package = Some(PurchaseTarget::Package { id: 5, price: 4000 });
        let accepted = validate_coupon(Some(&c), &learner(), package, now());
        assert!(accepted.is_accepted());
        if let CouponValidation::Accepted { discount, .. } = accepted {
            assert_eq!(discount.discount_amount, 1000);
        }

        c.min_purchase = 5000;
        let rejected = validate_coupon(Some(&c), &learner(), package, now());
        assert_eq!(rejected.rejection(), Some(CouponRejection::MinimumPurchaseNotMet));
        assert_eq!(
            CouponRejection::MinimumPurchaseNotMet.to_string(),
            "minimum purchase amount not met"
        );
    }

    #[test]
    fn invalid_coupon_is_reported_before_usage() {
        let mut c = coupon(DiscountType::Fixed, 100.0);
        c.is_active = false;
        c.max_uses_per_user = Some(0);
        let target = Some(PurchaseTarget::Course { id: 1, price: 500 });
        assert_eq!(
            validate_coupon(Some(&c), &learner(), target, now()).rejection(),
            Some(CouponRejection::InvalidOrExpired)
        );
    }
}
