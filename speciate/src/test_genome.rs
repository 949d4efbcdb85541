//! A one-dimensional genome for exercising the engine
//! without a real genome implementation.
use crate::distance::DistanceControl;
use crate::{Error, Genome, Result};

use rand::{Rng, RngCore};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A genome consisting of a single value. The distance
/// between two scalars is the absolute difference of
/// their values.
#[derive(Clone, Debug)]
pub(crate) struct Scalar {
    value: f64,
    transient: bool,
    distance_calls: Arc<AtomicUsize>,
}

impl Scalar {
    pub(crate) fn new(value: f64) -> Scalar {
        Scalar {
            value,
            transient: true,
            distance_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn has_transient_state(&self) -> bool {
        self.transient
    }

    /// Number of distance computations this genome
    /// (or any of its clones) initiated.
    pub(crate) fn distance_calls(&self) -> usize {
        self.distance_calls.load(Ordering::SeqCst)
    }
}

impl Genome for Scalar {
    type Environment = ();

    /// Moves the receiver's value towards the donor's by
    /// `rate`, plus a small random nudge when `rate > 0`.
    fn crossover(
        &self,
        other: &Scalar,
        _environment: &(),
        rate: f32,
        rng: &mut dyn RngCore,
    ) -> Result<Scalar> {
        if !(self.value.is_finite() && other.value.is_finite()) {
            return Err(Error::genome("cannot mate non-finite scalars"));
        }
        let nudge = if rate > 0.0 {
            rng.gen_range(-0.01..0.01)
        } else {
            0.0
        };
        Ok(Scalar::new(
            self.value + (other.value - self.value) * rate as f64 + nudge,
        ))
    }

    fn distance(&self, other: &Scalar, _control: &DistanceControl) -> Result<f64> {
        self.distance_calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.value - other.value).abs())
    }

    fn reset(&mut self) {
        self.transient = false;
    }
}
