use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Parameters of stagnation tracking.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StagnationControl {
    /// Consecutive non-improving updates after
    /// which a lineage is stagnant.
    pub limit: NonZeroUsize,
    /// Smallest increase over the best fitness
    /// seen so far that counts as an improvement.
    pub tolerance: f64,
}

/// Counts how many consecutive updates a lineage
/// (a species, or the whole population) has gone
/// without improving on its own best fitness.
#[derive(Clone, Debug)]
pub struct StagnationManager {
    control: StagnationControl,
    count: usize,
    best: f64,
}

impl StagnationManager {
    /// Creates a manager with no history. Fitness values
    /// are non-negative, so the initial best is 0.
    pub fn new(control: StagnationControl) -> StagnationManager {
        StagnationManager {
            control,
            count: 0,
            best: 0.0,
        }
    }

    /// Records this generation's best fitness and
    /// returns whether the lineage is now stagnant.
    ///
    /// # Examples
    /// ```
    /// use speciate::populations::{StagnationControl, StagnationManager};
    /// use std::num::NonZeroUsize;
    ///
    /// let mut manager = StagnationManager::new(StagnationControl {
    ///     limit: NonZeroUsize::new(2).unwrap(),
    ///     tolerance: 1e-6,
    /// });
    ///
    /// assert!(!manager.update(1.0));
    /// assert!(!manager.update(1.0));
    /// assert!(manager.update(0.5));
    /// ```
    pub fn update(&mut self, fitness: f64) -> bool {
        if fitness - self.best >= self.control.tolerance && fitness > self.best {
            self.count = 0;
            self.best = fitness;
        } else {
            self.count += 1;
        }
        self.is_stagnant()
    }

    /// Returns whether the lineage has reached the
    /// configured stagnation limit.
    pub fn is_stagnant(&self) -> bool {
        self.count >= self.control.limit.get()
    }

    /// Returns the number of consecutive non-improving updates.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the best fitness recorded so far.
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Forgets the non-improving streak, keeping the best fitness.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
