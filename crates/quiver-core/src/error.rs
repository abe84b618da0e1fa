use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("invalid {field} ({value}): {reason}")]
    Validation {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("configuration error in {rule}: {reason}")]
    Configuration { rule: String, reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TuningError {
    pub(crate) fn configuration(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// Reject non-finite and non-positive measurements.
pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<f64, TuningError> {
    if !value.is_finite() {
        return Err(TuningError::Validation {
            field,
            value,
            reason: "must be a finite number",
        });
    }
    if value <= 0.0 {
        return Err(TuningError::Validation {
            field,
            value,
            reason: "must be greater than zero",
        });
    }
    Ok(value)
}

/// Reject non-finite and negative measurements; zero is allowed.
pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<f64, TuningError> {
    if !value.is_finite() {
        return Err(TuningError::Validation {
            field,
            value,
            reason: "must be a finite number",
        });
    }
    if value < 0.0 {
        return Err(TuningError::Validation {
            field,
            value,
            reason: "must not be negative",
        });
    }
    Ok(value)
}

/// Reject values above a plausibility ceiling.
pub(crate) fn require_at_most(
    field: &'static str,
    value: f64,
    max: f64,
) -> Result<f64, TuningError> {
    if value > max {
        return Err(TuningError::Validation {
            field,
            value,
            reason: "exceeds the plausible maximum",
        });
    }
    Ok(value)
}
