use std::marker::PhantomData;

/// Lowest accepted target power (w-s).
pub const MIN_POWER_WS: f64 = 50.0;
/// Highest accepted target power (w-s).
pub const MAX_POWER_WS: f64 = 5000.0;

#[derive(Debug, Clone, Copy)]
pub struct Unvalidated;

#[derive(Debug, Clone, Copy)]
pub struct Validated;

/// Inclusive range of target powers considered safe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerEnvelope {
    min: f64,
    max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope bounds must be finite (min={min}, max={max})")]
    NonFiniteBound { min: f64, max: f64 },
    #[error("envelope minimum {min} must be below maximum {max}")]
    Inverted { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum EnvelopeViolation {
    #[error("requested power {requested} is not finite")]
    NonFinite { requested: f64 },
    #[error("requested power {requested} is below the minimum of {limit}")]
    BelowMin { requested: f64, limit: f64 },
    #[error("requested power {requested} is above the maximum of {limit}")]
    AboveMax { requested: f64, limit: f64 },
}

impl PowerEnvelope {
    pub fn new(min: f64, max: f64) -> Result<Self, EnvelopeError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(EnvelopeError::NonFiniteBound { min, max });
        }
        if min >= max {
            return Err(EnvelopeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// The fixed transducer envelope, [`MIN_POWER_WS`, `MAX_POWER_WS`].
    pub const fn transducer() -> Self {
        Self {
            min: MIN_POWER_WS,
            max: MAX_POWER_WS,
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// True iff `min <= target <= max`.
    pub fn validate(&self, target: f64) -> bool {
        self.min <= target && target <= self.max
    }
}

impl Default for PowerEnvelope {
    fn default() -> Self {
        Self::transducer()
    }
}

/// Target power for a single ramp run.
///
/// Only a `RampTarget<Validated>` can be handed to the ramp engine, so an
/// out-of-envelope request has no path to the engine.
#[derive(Debug, Clone, Copy)]
pub struct RampTarget<State = Unvalidated> {
    value: f64,
    _state: PhantomData<State>,
}

impl RampTarget<Unvalidated> {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            _state: PhantomData,
        }
    }

    pub fn validate(
        self,
        envelope: &PowerEnvelope,
    ) -> Result<RampTarget<Validated>, EnvelopeViolation> {
        if !self.value.is_finite() {
            return Err(EnvelopeViolation::NonFinite {
                requested: self.value,
            });
        }
        if self.value < envelope.min {
            return Err(EnvelopeViolation::BelowMin {
                requested: self.value,
                limit: envelope.min,
            });
        }
        if self.value > envelope.max {
            return Err(EnvelopeViolation::AboveMax {
                requested: self.value,
                limit: envelope.max,
            });
        }

        Ok(RampTarget {
            value: self.value,
            _state: PhantomData,
        })
    }
}

impl RampTarget<Validated> {
    /// The pre-start power. Valid outside the envelope; a run toward it ends
    /// immediately.
    pub const fn zero() -> Self {
        Self {
            value: 0.0,
            _state: PhantomData,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}
