//! Fee calculation.

use crate::error::{DomainError, DomainResult};

/// `rate × weight`. Both must be positive finite numbers.
pub fn calculate_fee(rate: f64, weight: f64) -> DomainResult<f64> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(DomainError::bad_request("Fee rate must be a positive number"));
    }
    if !(weight.is_finite() && weight > 0.0) {
        return Err(DomainError::bad_request("Parcel weight must be a positive number"));
    }
    Ok(rate * weight)
}
