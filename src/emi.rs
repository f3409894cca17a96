//! Equated Monthly Installment arithmetic.

use serde_json::Value;

use crate::errors::AppError;
use crate::models::{EmiBreakdown, EmiRequest};

/// Computes the fixed monthly installment for an amortizing loan.
///
/// `EMI = P * r * (1 + r)^N / ((1 + r)^N - 1)` with `r` the monthly rate
/// (`annual_rate_percent / 100 / 12`). Non-positive inputs are
/// `AppError::InvalidParameters`; a result that overflows is a
/// `AppError::CalculationError`.
///
/// The installment is rounded to cents first and the totals are derived from
/// that rounded installment, so `total_amount` is what the borrower actually
/// pays over the tenure.
pub fn calculate_emi(
    principal: f64,
    annual_rate_percent: f64,
    tenure_months: i64,
) -> Result<EmiBreakdown, AppError> {
    let monthly_rate = annual_rate_percent / 100.0 / 12.0;

    if !(principal > 0.0) || !(monthly_rate > 0.0) || tenure_months <= 0 {
        return Err(AppError::InvalidParameters);
    }

    let exponent = i32::try_from(tenure_months).map_err(|_| {
        AppError::CalculationError(format!("tenure {} months is out of range", tenure_months))
    })?;
    let growth = (1.0 + monthly_rate).powi(exponent);
    let emi = round_cents(principal * monthly_rate * growth / (growth - 1.0));
    let total_amount = round_cents(emi * tenure_months as f64);
    let total_interest = round_cents(total_amount - principal);

    if !emi.is_finite() || !total_amount.is_finite() || !total_interest.is_finite() {
        return Err(AppError::CalculationError(format!(
            "non-finite EMI for principal {}, rate {}, tenure {}",
            principal, annual_rate_percent, tenure_months
        )));
    }

    Ok(EmiBreakdown {
        emi,
        total_amount,
        total_interest,
        principal,
    })
}

/// Coerces a raw request, then calculates.
///
/// Missing inputs count as zero. Principal and rate accept JSON numbers or
/// decimal strings; tenure accepts numbers (truncated to whole months) or
/// integer strings. Anything else is a `CalculationError`.
pub fn calculate_from_request(req: &EmiRequest) -> Result<EmiBreakdown, AppError> {
    let principal = coerce_decimal("principal", &req.principal)?;
    let rate = coerce_decimal("rate", &req.rate)?;
    let tenure = coerce_months(&req.tenure)?;

    calculate_emi(principal, rate, tenure)
}

fn coerce_decimal(field: &str, value: &Value) -> Result<f64, AppError> {
    let n = match value {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64().ok_or_else(|| not_a_number(field, value))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| not_a_number(field, value))?,
        _ => return Err(not_a_number(field, value)),
    };
    if n.is_nan() {
        return Err(not_a_number(field, value));
    }
    Ok(n)
}

fn coerce_months(value: &Value) -> Result<i64, AppError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => match n.as_i64() {
            Some(months) => Ok(months),
            None => {
                let months = n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| not_a_number("tenure", value))?;
                // Saturating cast; anything past i32 is rejected by calculate_emi.
                Ok(months.trunc() as i64)
            }
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| not_a_number("tenure", value)),
        _ => Err(not_a_number("tenure", value)),
    }
}

fn not_a_number(field: &str, value: &Value) -> AppError {
    AppError::CalculationError(format!("{} is not a valid number: {}", field, value))
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
