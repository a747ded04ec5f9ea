use crate::CoreError;

/// Floating point type used throughout the workspace
pub type Real = f64;

/// Two simulation instants closer than this are the same event time.
pub const EVENT_TIME_TOL: Real = 1e-10;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// True when any indicator changed sign between two evaluations.
///
/// Only the sign is compared (`> 0.0`), never the magnitude. Vectors of
/// different length are treated as a change.
pub fn sign_changed(previous: &[Real], current: &[Real]) -> bool {
    if previous.len() != current.len() {
        return true;
    }
    previous
        .iter()
        .zip(current)
        .any(|(a, b)| (*a > 0.0) != (*b > 0.0))
}
