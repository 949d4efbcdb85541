use super::compatibility::CompatibilityControl;
use super::stagnation::StagnationControl;
use crate::distance::DistanceControl;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for population generation
/// and evolution. Fixed for the duration of a run.
///
/// # Note
/// All quantities expressing probabilities or fractions
/// should be in the range [0.0, 1.0]; [`validate`] rejects
/// settings where they are not.
///
/// [`validate`]: PopulationSettings::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationSettings {
    /// Size of the population. Every generation
    /// contains exactly this many members.
    pub size: NonZeroUsize,
    /// Whether the compatibility threshold is adjusted
    /// each generation to steer the species count
    /// towards [`species_target`].
    ///
    /// [`species_target`]: PopulationSettings::species_target
    pub dynamic_threshold: bool,
    /// Initial genetic distance threshold, beyond which
    /// genomes are considered as belonging to
    /// different species.
    pub compatibility_distance: f64,
    /// Desired number of species, when the
    /// threshold is dynamic.
    pub species_target: usize,
    /// Amount by which the threshold moves per generation.
    pub threshold_step: f64,
    /// Chance that both parents of a child are
    /// drawn from the same species.
    pub inbreed_rate: f32,
    /// Rate passed into every genome crossover.
    pub crossover_rate: f32,
    /// Number of generations without a fitness increase
    /// before a species (or the whole population)
    /// is considered _stagnated_.
    pub stagnation_limit: NonZeroUsize,
    /// Smallest fitness increase counted as an improvement.
    pub stagnation_tolerance: f64,
    /// Top fraction of each species kept when the whole
    /// population stagnates.
    pub clean_pct: f32,
    /// Compatibility distance coefficients.
    pub distance: DistanceControl,
    /// Seed for all of the population's randomness.
    /// Runs are entropy-seeded if absent.
    pub seed: Option<u64>,
}

impl PopulationSettings {
    /// Returns a "zero-valued" configuration.
    /// All values are 0, empty, `false`, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use speciate::PopulationSettings;
    ///
    /// let settings = PopulationSettings {
    ///     // Specify some values here...
    ///     compatibility_distance: 3.0,
    ///     // Default the rest...
    ///     ..PopulationSettings::zero()
    /// };
    /// ```
    pub const fn zero() -> PopulationSettings {
        PopulationSettings {
            size: NonZeroUsize::MIN,
            dynamic_threshold: false,
            compatibility_distance: 0.0,
            species_target: 0,
            threshold_step: 0.0,
            inbreed_rate: 0.0,
            crossover_rate: 0.0,
            stagnation_limit: NonZeroUsize::MIN,
            stagnation_tolerance: 0.0,
            clean_pct: 0.0,
            distance: DistanceControl::zero(),
            seed: None,
        }
    }

    /// Parses settings from RON, filling absent fields
    /// from [`Default`], and validates them.
    ///
    /// # Examples
    /// ```
    /// use speciate::PopulationSettings;
    ///
    /// let settings = PopulationSettings::from_ron(
    ///     "(size: 50, species_target: 5, seed: Some(3))",
    /// ).unwrap();
    ///
    /// assert_eq!(settings.size.get(), 50);
    /// assert_eq!(settings.seed, Some(3));
    /// ```
    pub fn from_ron(source: &str) -> Result<PopulationSettings> {
        let settings: PopulationSettings =
            ron::from_str(source).map_err(|e| Error::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every value is within its meaningful range.
    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("inbreed_rate", self.inbreed_rate),
            ("crossover_rate", self.crossover_rate),
            ("clean_pct", self.clean_pct),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidSettings(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(self.compatibility_distance.is_finite() && self.compatibility_distance > 0.0) {
            return Err(Error::InvalidSettings(format!(
                "compatibility_distance must be positive, got {}",
                self.compatibility_distance
            )));
        }
        if self.dynamic_threshold
            && !(self.threshold_step.is_finite() && self.threshold_step > 0.0)
        {
            return Err(Error::InvalidSettings(format!(
                "threshold_step must be positive for a dynamic threshold, got {}",
                self.threshold_step
            )));
        }
        if !(self.stagnation_tolerance.is_finite() && self.stagnation_tolerance >= 0.0) {
            return Err(Error::InvalidSettings(format!(
                "stagnation_tolerance must be non-negative, got {}",
                self.stagnation_tolerance
            )));
        }
        let factors = [
            self.distance.excess_factor,
            self.distance.disjoint_factor,
            self.distance.weight_factor,
        ];
        if factors.iter().any(|f| !(f.is_finite() && *f >= 0.0)) {
            return Err(Error::InvalidSettings(format!(
                "distance factors must be non-negative, got {:?}",
                factors
            )));
        }
        Ok(())
    }

    pub(crate) fn compatibility_control(&self) -> CompatibilityControl {
        CompatibilityControl {
            threshold: self.compatibility_distance,
            target: self.species_target,
            dynamic: self.dynamic_threshold,
            step: self.threshold_step,
        }
    }

    pub(crate) fn stagnation_control(&self) -> StagnationControl {
        StagnationControl {
            limit: self.stagnation_limit,
            tolerance: self.stagnation_tolerance,
        }
    }
}

impl Default for PopulationSettings {
    fn default() -> PopulationSettings {
        PopulationSettings {
            size: NonZeroUsize::new(150).unwrap_or(NonZeroUsize::MIN),
            dynamic_threshold: true,
            compatibility_distance: 3.0,
            species_target: 10,
            threshold_step: 0.1,
            inbreed_rate: 0.999,
            crossover_rate: 0.75,
            stagnation_limit: NonZeroUsize::new(15).unwrap_or(NonZeroUsize::MIN),
            stagnation_tolerance: 1e-6,
            clean_pct: 0.2,
            distance: DistanceControl::default(),
            seed: None,
        }
    }
}
