use serde::{Deserialize, Serialize};

use std::cmp::Ordering;

/// Parameters of the compatibility threshold control loop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityControl {
    /// Initial distance threshold.
    pub threshold: f64,
    /// Species count the threshold is steered towards.
    pub target: usize,
    /// Whether the threshold moves at all.
    pub dynamic: bool,
    /// Fixed amount the threshold moves per update.
    pub step: f64,
}

/// Maintains the distance threshold deciding species
/// membership, nudging it every generation so that the
/// observed species count approaches the target.
///
/// The step is fixed, with no proportional gain; species
/// counts change slowly enough between generations for this
/// to settle.
#[derive(Clone, Debug)]
pub struct CompatibilityManager {
    threshold: f64,
    control: CompatibilityControl,
}

impl CompatibilityManager {
    /// Creates a manager starting at `control.threshold`.
    pub fn new(control: CompatibilityControl) -> CompatibilityManager {
        CompatibilityManager {
            threshold: control.threshold,
            control,
        }
    }

    /// Returns the current distance threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Moves the threshold according to the species count
    /// observed this generation: down when there are too
    /// few species, up when there are too many.
    ///
    /// The threshold never reaches zero; if a full step down
    /// would cross it, the step is halved until it doesn't.
    ///
    /// # Examples
    /// ```
    /// use speciate::populations::{CompatibilityControl, CompatibilityManager};
    ///
    /// let mut manager = CompatibilityManager::new(CompatibilityControl {
    ///     threshold: 0.25,
    ///     target: 10,
    ///     dynamic: true,
    ///     step: 0.3,
    /// });
    ///
    /// manager.update(2);
    /// assert_eq!(manager.threshold(), 0.25 - 0.15);
    /// manager.update(12);
    /// assert!(manager.threshold() > 0.25 - 0.15);
    /// ```
    pub fn update(&mut self, observed_species: usize) {
        if !self.control.dynamic {
            return;
        }
        match observed_species.cmp(&self.control.target) {
            Ordering::Less => {
                let mut step = self.control.step;
                while self.threshold - step <= 0.0 && step > 0.0 {
                    step /= 2.0;
                }
                if self.threshold - step > 0.0 {
                    self.threshold -= step;
                }
            }
            Ordering::Greater => self.threshold += self.control.step,
            Ordering::Equal => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(threshold: f64, target: usize) -> CompatibilityControl {
        CompatibilityControl {
            threshold,
            target,
            dynamic: true,
            step: 0.5,
        }
    }

    #[test]
    fn static_threshold_never_moves() {
        let mut manager = CompatibilityManager::new(CompatibilityControl {
            dynamic: false,
            ..control(2.0, 5)
        });
        manager.update(0);
        manager.update(100);
        assert_eq!(manager.threshold(), 2.0);
    }

    #[test]
    fn threshold_follows_species_count() {
        let mut manager = CompatibilityManager::new(control(2.0, 5));
        manager.update(1);
        assert_eq!(manager.threshold(), 1.5);
        manager.update(9);
        assert_eq!(manager.threshold(), 2.0);
        manager.update(5);
        assert_eq!(manager.threshold(), 2.0);
    }

    #[test]
    fn threshold_stays_positive() {
        let mut manager = CompatibilityManager::new(control(0.6, 5));
        for _ in 0..200 {
            manager.update(0);
            assert!(manager.threshold() > 0.0);
        }
    }

    /// Species count modelled as inversely proportional to
    /// the threshold, as happens for a fixed distance spread.
    #[test]
    fn species_count_converges_to_target() {
        let spread = 12.0;
        let species_at = |threshold: f64| ((spread / threshold).ceil() as usize).max(1);
        let mut manager = CompatibilityManager::new(CompatibilityControl {
            threshold: 10.0,
            target: 6,
            dynamic: true,
            step: 0.1,
        });
        for _ in 0..200 {
            let observed = species_at(manager.threshold());
            manager.update(observed);
        }
        let observed = species_at(manager.threshold());
        assert!((5..=7).contains(&observed), "observed {}", observed);
        assert!(manager.threshold() > 0.0);
    }
}
