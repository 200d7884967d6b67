//! Restart-indexed decay schedules.
//!
//! The exploration magnitude and the policy step size shrink by a constant
//! factor on every shrink-and-restart. The schedule is a pure function of the
//! restart count, so resuming from a checkpoint reproduces it exactly.
//!
//! # Data Integrity
//!
//! In debug builds, non-finite or non-positive initial values and factors
//! outside (0, 1] panic. In release builds they are sanitized: the factor
//! falls back to 1.0 (no decay).

/// `initial * factor^restarts`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    initial: f32,
    factor: f32,
}

impl ExponentialDecay {
    /// # Panics (debug only)
    ///
    /// Panics if `initial` is not finite and positive, or `factor` is outside (0, 1].
    pub fn new(initial: f32, factor: f32) -> Self {
        debug_assert!(
            initial.is_finite() && initial > 0.0,
            "ExponentialDecay: initial must be finite and positive, got {}",
            initial
        );
        debug_assert!(
            factor > 0.0 && factor <= 1.0,
            "ExponentialDecay: factor must lie in (0, 1], got {}",
            factor
        );

        let factor = if factor > 0.0 && factor <= 1.0 { factor } else { 1.0 };
        Self { initial, factor }
    }

    /// Value after `restarts` shrink-and-restarts.
    pub fn value_at(&self, restarts: usize) -> f32 {
        let exponent = i32::try_from(restarts).unwrap_or(i32::MAX);
        let value = self.initial * self.factor.powi(exponent);
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    pub fn initial(&self) -> f32 {
        self.initial
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }
}
