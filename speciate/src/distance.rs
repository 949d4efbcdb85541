//! Compatibility distance between genomes, and the
//! per-generation cache that avoids recomputing it.
mod cache;

pub use cache::DistanceCache;

use crate::{Error, Innovation, Result};

use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::hash::BuildHasher;

/// Coefficients of the compatibility distance.
///
/// Passed unchanged into every [`Genome::distance`] call.
///
/// [`Genome::distance`]: crate::Genome::distance
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceControl {
    /// Weight of excess genes (`c1`).
    pub excess_factor: f64,
    /// Weight of disjoint genes (`c2`).
    pub disjoint_factor: f64,
    /// Weight of the average weight difference
    /// of shared genes (`c3`).
    pub weight_factor: f64,
    /// Genomes with fewer genes than this are not
    /// normalized by their size, so that small genomes
    /// are not over-penalized for each mismatch.
    pub innovation_max: usize,
}

impl DistanceControl {
    /// Returns a "zero-valued" control. All factors are 0,
    /// which makes every pair of genomes identical.
    pub const fn zero() -> DistanceControl {
        DistanceControl {
            excess_factor: 0.0,
            disjoint_factor: 0.0,
            weight_factor: 0.0,
            innovation_max: 0,
        }
    }
}

impl Default for DistanceControl {
    /// The coefficients used in the 2002 NEAT experiments.
    fn default() -> DistanceControl {
        DistanceControl {
            excess_factor: 1.0,
            disjoint_factor: 1.0,
            weight_factor: 0.4,
            innovation_max: 20,
        }
    }
}

/// Returns the compatibility distance between two
/// innovation-weight maps.
///
/// The larger map `L` determines the excess count `|L| - |S|`
/// and the normalizer: `|L|` if it reaches
/// [`innovation_max`], `1.0` otherwise. Genes present in
/// only one map are disjoint; genes present in both
/// contribute their absolute weight difference to an average,
/// which defaults to `1.0` when nothing is shared.
///
/// # Errors
/// Returns [`Error::MalformedDistance`] if any weight is
/// not finite, as such a distance would corrupt speciation.
///
/// [`innovation_max`]: DistanceControl::innovation_max
///
/// # Examples
/// ```
/// use speciate::distance::{distance, DistanceControl};
/// use std::collections::HashMap;
///
/// let control = DistanceControl {
///     excess_factor: 1.0,
///     disjoint_factor: 1.0,
///     weight_factor: 0.5,
///     innovation_max: 20,
/// };
/// let one: HashMap<usize, f64> = [(0, 1.0), (1, 2.0), (2, 0.5)].into_iter().collect();
/// let two: HashMap<usize, f64> = [(0, 1.5), (1, 2.0)].into_iter().collect();
///
/// // One excess gene, one disjoint gene, average weight difference 0.25.
/// let d = distance(&one, &two, &control).unwrap();
/// assert!((d - (1.0 + 1.0 + 0.5 * 0.25)).abs() < 1e-12);
/// assert_eq!(d, distance(&two, &one, &control).unwrap());
/// ```
pub fn distance<S: BuildHasher>(
    one: &HashMap<Innovation, f64, S>,
    two: &HashMap<Innovation, f64, S>,
    control: &DistanceControl,
) -> Result<f64> {
    check_weights(one)?;
    check_weights(two)?;

    let (larger, smaller) = if one.len() >= two.len() {
        (one, two)
    } else {
        (two, one)
    };

    let excess = (larger.len() - smaller.len()) as f64;
    let normalizer = if larger.len() < control.innovation_max || larger.is_empty() {
        1.0
    } else {
        larger.len() as f64
    };

    let mut shared = Vec::with_capacity(smaller.len());
    let mut disjoint_larger = 0usize;
    for (innovation, weight) in larger.iter() {
        match smaller.get(innovation) {
            Some(other) => shared.push((*innovation, (weight - other).abs())),
            None => disjoint_larger += 1,
        }
    }
    let disjoint_smaller = smaller
        .keys()
        .filter(|innovation| !larger.contains_key(innovation))
        .count();

    // Averaged in innovation order so that the result
    // does not depend on argument or hash order.
    shared.sort_unstable_by_key(|(innovation, _)| *innovation);
    let weight_difference = if shared.is_empty() {
        1.0
    } else {
        let mut average = 0.0;
        for (n, (_, difference)) in shared.iter().enumerate() {
            average += (difference - average) / (n + 1) as f64;
        }
        average
    };

    Ok(control.excess_factor * excess / normalizer
        + control.disjoint_factor * (disjoint_larger + disjoint_smaller) as f64 / normalizer
        + control.weight_factor * weight_difference)
}

fn check_weights<S: BuildHasher>(weights: &HashMap<Innovation, f64, S>) -> Result<()> {
    match weights.iter().find(|(_, w)| !w.is_finite()) {
        Some((innovation, weight)) => Err(Error::MalformedDistance(format!(
            "gene {} has non-finite weight {}",
            innovation, weight
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(Innovation, f64)]) -> HashMap<Innovation, f64> {
        entries.iter().copied().collect()
    }

    const CONTROL: DistanceControl = DistanceControl {
        excess_factor: 1.0,
        disjoint_factor: 2.0,
        weight_factor: 0.4,
        innovation_max: 4,
    };

    #[test]
    fn identical_maps_are_zero_apart() {
        let m = map(&[(0, 0.5), (3, -1.0), (7, 2.0)]);
        assert_eq!(distance(&m, &m, &CONTROL).unwrap(), 0.0);
    }

    #[test]
    fn empty_maps_share_nothing() {
        let empty = map(&[]);
        assert_eq!(distance(&empty, &empty, &CONTROL).unwrap(), 0.4);
    }

    #[test]
    fn small_genomes_are_not_normalized() {
        let one = map(&[(0, 1.0), (1, 1.0), (2, 1.0)]);
        let two = map(&[(0, 1.0)]);
        // |L| = 3 < innovation_max: normalizer is 1.
        // excess 2, disjoint 2 (both from L), weight diff 0.
        assert_eq!(distance(&one, &two, &CONTROL).unwrap(), 2.0 + 2.0 * 2.0);
    }

    #[test]
    fn large_genomes_are_normalized() {
        let one = map(&[(0, 1.0), (1, 1.0), (2, 1.0), (3, 1.0)]);
        let two = map(&[(0, 1.0), (1, 1.0), (5, 1.0)]);
        // |L| = 4: excess 1, disjoint 2 + 1, weight diff 0.
        let expected = 1.0 * 1.0 / 4.0 + 2.0 * 3.0 / 4.0;
        assert!((distance(&one, &two, &CONTROL).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn no_shared_genes_counts_as_maximally_different_weights() {
        let one = map(&[(0, 1.0)]);
        let two = map(&[(1, 1.0)]);
        assert_eq!(distance(&one, &two, &CONTROL).unwrap(), 2.0 * 2.0 + 0.4);
    }

    #[test]
    fn distance_is_symmetric() {
        let one = map(&[(0, 0.1), (1, -0.7), (2, 3.3), (4, 1.1), (9, 0.2)]);
        let two = map(&[(0, 0.3), (2, 1.3), (3, -2.0), (4, 1.0), (8, 0.25)]);
        assert_eq!(
            distance(&one, &two, &CONTROL).unwrap(),
            distance(&two, &one, &CONTROL).unwrap()
        );
    }

    #[test]
    fn non_finite_weights_are_rejected() {
        let one = map(&[(0, f64::NAN)]);
        let two = map(&[(0, 1.0)]);
        assert!(matches!(
            distance(&one, &two, &CONTROL),
            Err(Error::MalformedDistance(_))
        ));
        assert!(distance(&two, &one, &CONTROL).is_err());
    }
}
