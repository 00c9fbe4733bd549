use crate::CoreError;

/// Floating point type used for every caller input and impact amount.
pub type Real = f64;

/// Reject NaN and infinities; `what` names the offending input.
pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}
