//! Membership pricing using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::{BillingPeriod, MembershipPlan};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Build a USD price from an amount in cents.
    #[must_use]
    pub fn usd_cents(cents: i64) -> Self {
        Self::new(Decimal::new(cents, 2), CurrencyCode::USD)
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

impl MembershipPlan {
    /// List price for this plan and billing period.
    #[must_use]
    pub fn price(self, period: BillingPeriod) -> Price {
        let cents = match (self, period) {
            (Self::Basic, BillingPeriod::Monthly) => 999,
            (Self::Basic, BillingPeriod::Annual) => 9_999,
            (Self::Premium, BillingPeriod::Monthly) => 1_999,
            (Self::Premium, BillingPeriod::Annual) => 19_999,
        };
        Price::usd_cents(cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_prices() {
        assert_eq!(
            MembershipPlan::Basic.price(BillingPeriod::Monthly).display(),
            "$9.99"
        );
        assert_eq!(
            MembershipPlan::Premium.price(BillingPeriod::Annual).display(),
            "$199.99"
        );
    }

    #[test]
    fn test_annual_is_cheaper_than_twelve_months() {
        for plan in MembershipPlan::ALL {
            let monthly = plan.price(BillingPeriod::Monthly).amount * Decimal::from(12);
            assert!(plan.price(BillingPeriod::Annual).amount < monthly);
        }
    }
}
