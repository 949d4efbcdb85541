use speciate::Innovation;

use thiserror::Error;

/// Errors raised while mating or comparing weight genomes.
#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    /// A gene's weight is NaN or infinite.
    #[error("gene {0} has non-finite weight {1}")]
    NonFiniteWeight(Innovation, f64),
    /// The genome has no genes left.
    #[error("genome has no genes")]
    EmptyGenome,
}
