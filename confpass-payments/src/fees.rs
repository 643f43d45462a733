//! Provider fee schedules.
//!
//! All arithmetic is in major units with `Decimal`; fees are rounded to the
//! nearest minor unit, half away from zero.

use crate::types::{Currency, PaymentProvider};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Percentage + flat fee with an optional waiver threshold and cap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fraction of the amount, e.g. `0.015` for 1.5%.
    pub percentage: Decimal,
    #[serde(default)]
    pub flat_fee: Decimal,
    /// The flat fee is not charged on amounts strictly below this.
    #[serde(default)]
    pub flat_fee_waived_below: Option<Decimal>,
    #[serde(default)]
    pub cap: Option<Decimal>,
}

impl FeeSchedule {
    pub fn percentage_only(percentage: Decimal) -> Self {
        Self {
            percentage,
            flat_fee: Decimal::ZERO,
            flat_fee_waived_below: None,
            cap: None,
        }
    }

    fn flat_fee_applies(&self, amount: Decimal) -> bool {
        !self.flat_fee.is_zero() && !self.flat_fee_waived_below.is_some_and(|t| amount < t)
    }

    /// Fee charged on a transaction of `amount`.
    pub fn fee_for(&self, amount: Decimal) -> Decimal {
        if amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let mut fee = amount * self.percentage;
        if self.flat_fee_applies(amount) {
            fee += self.flat_fee;
        }
        if let Some(cap) = self.cap {
            fee = fee.min(cap);
        }
        fee.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// What the merchant receives from a charge of `amount`.
    pub fn settlement_for(&self, amount: Decimal) -> Decimal {
        amount - self.fee_for(amount)
    }

    /// Smallest charge whose settlement covers `net`, so the customer bears the fee.
    pub fn gross_up(&self, net: Decimal) -> Decimal {
        if net <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let ceil = |v: Decimal| v.round_dp_with_strategy(2, RoundingStrategy::AwayFromZero);
        let keep = Decimal::ONE - self.percentage;
        if keep <= Decimal::ZERO {
            // percentage of 100% or more only settles under a cap
            return match self.cap {
                Some(cap) => net + cap,
                None => net,
            };
        }

        let without_flat = ceil(net / keep);
        let mut total = if self.flat_fee_applies(without_flat) {
            ceil((net + self.flat_fee) / keep)
        } else {
            without_flat
        };
        if let Some(cap) = self.cap {
            total = total.min(net + cap);
        }

        // Rounding can leave us a cent either side of the true minimum.
        for _ in 0..100 {
            if self.settlement_for(total) >= net {
                break;
            }
            total += CENT;
        }
        for _ in 0..100 {
            let lower = total - CENT;
            if lower <= Decimal::ZERO || self.settlement_for(lower) < net {
                break;
            }
            total = lower;
        }
        total
    }
}

/// Local (NGN) and international schedules for one provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderFees {
    pub local: FeeSchedule,
    pub international: FeeSchedule,
}

impl ProviderFees {
    /// Paystack: 1.5% + ₦100 (waived under ₦2,500) capped at ₦2,000; 3.9% otherwise.
    pub fn paystack() -> Self {
        Self {
            local: FeeSchedule {
                percentage: Decimal::new(15, 3),
                flat_fee: Decimal::new(100, 0),
                flat_fee_waived_below: Some(Decimal::new(2500, 0)),
                cap: Some(Decimal::new(2000, 0)),
            },
            international: FeeSchedule::percentage_only(Decimal::new(39, 3)),
        }
    }

    /// Flutterwave: 1.4% capped at ₦2,000; 3.8% otherwise.
    pub fn flutterwave() -> Self {
        Self {
            local: FeeSchedule {
                cap: Some(Decimal::new(2000, 0)),
                ..FeeSchedule::percentage_only(Decimal::new(14, 3))
            },
            international: FeeSchedule::percentage_only(Decimal::new(38, 3)),
        }
    }

    pub fn schedule_for(&self, currency: Currency) -> &FeeSchedule {
        match currency {
            Currency::Ngn => &self.local,
            _ => &self.international,
        }
    }

    pub fn breakdown(
        &self,
        provider: PaymentProvider,
        amount: Decimal,
        currency: Currency,
    ) -> FeeBreakdown {
        let fee = self.schedule_for(currency).fee_for(amount);
        FeeBreakdown {
            provider,
            currency,
            amount,
            fee,
            settlement: amount - fee,
        }
    }
}

/// Fee quote for a single charge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub provider: PaymentProvider,
    pub currency: Currency,
    /// Amount charged to the customer.
    pub amount: Decimal,
    pub fee: Decimal,
    /// Amount the merchant receives.
    pub settlement: Decimal,
}
