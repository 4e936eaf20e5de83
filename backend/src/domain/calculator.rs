//! Discount arithmetic for the gastronomic benefit.

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Result of applying the benefit discount to a raw purchase amount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountBreakdown {
    pub discount_applied: f64,
    pub final_amount: f64,
}

/// Round to two decimals, half-up at the cent boundary.
///
/// The epsilon nudge keeps values such as `1.005` (stored as `1.00499...`)
/// rounding the way they read.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let nudge = f64::EPSILON * value.abs().max(1.0);
    ((value + nudge.copysign(value)) * 100.0).round() / 100.0
}

/// Compute discount and final amount for a purchase.
///
/// `final_amount` never goes below zero.
pub fn calculate_discount(amount: f64, discount_percentage: f64) -> DiscountBreakdown {
    let discount_applied = round2(amount * discount_percentage / 100.0);
    let final_amount = round2(amount - discount_applied).max(0.0);
    DiscountBreakdown {
        discount_applied,
        final_amount,
    }
}

/// Amounts must be finite and strictly positive
pub fn validate_amount(field: &str, amount: f64) -> Result<(), DomainError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DomainError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

/// Percentages must lie in [0, 100]
pub fn validate_percentage(field: &str, value: f64) -> Result<(), DomainError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(DomainError::invalid(field, "must be between 0 and 100"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scenario() {
        let result = calculate_discount(1000.0, 15.0);
        assert_eq!(result.discount_applied, 150.0);
        assert_eq!(result.final_amount, 850.0);
    }

    #[test]
    fn test_rounding_half_up_at_cents() {
        assert_eq!(round2(1.005), 1.01);
        assert_eq!(round2(2.675), 2.68);
        assert_eq!(round2(10.004), 10.0);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(f64::NAN), 0.0);
    }

    #[test]
    fn test_discount_is_rounded() {
        // 45.50 * 12.5% = 5.6875
        let result = calculate_discount(45.5, 12.5);
        assert_eq!(result.discount_applied, 5.69);
        assert_eq!(result.final_amount, 39.81);
    }

    #[test]
    fn test_bounds_of_percentage() {
        let none = calculate_discount(250.0, 0.0);
        assert_eq!(none.discount_applied, 0.0);
        assert_eq!(none.final_amount, 250.0);

        let full = calculate_discount(250.0, 100.0);
        assert_eq!(full.discount_applied, 250.0);
        assert_eq!(full.final_amount, 0.0);
    }

    #[test]
    fn test_invariants_hold_over_a_grid() {
        let amounts = [0.01, 0.99, 1.0, 12.34, 99.99, 1000.0, 1234.56, 50000.0];
        let percentages = [0.0, 5.0, 12.5, 15.0, 33.3, 50.0, 99.9, 100.0];
        for &amount in &amounts {
            for &pct in &percentages {
                let r = calculate_discount(amount, pct);
                assert_eq!(r.discount_applied, round2(amount * pct / 100.0));
                assert_eq!(r.final_amount, round2(amount - r.discount_applied).max(0.0));
                assert!(r.final_amount >= 0.0, "negative final for {} @ {}", amount, pct);
            }
        }
    }

    #[test]
    fn test_validation_helpers() {
        assert!(validate_amount("amount", 10.0).is_ok());
        assert!(validate_amount("amount", 0.0).is_err());
        assert!(validate_amount("amount", -3.0).is_err());
        assert!(validate_amount("amount", f64::INFINITY).is_err());

        assert!(validate_percentage("discount_percentage", 0.0).is_ok());
        assert!(validate_percentage("discount_percentage", 100.0).is_ok());
        assert!(validate_percentage("discount_percentage", 100.1).is_err());
        assert!(validate_percentage("discount_percentage", -1.0).is_err());
    }
}
