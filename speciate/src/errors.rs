use crate::populations::GenomeId;

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error raised by a [`Genome`] implementation.
///
/// [`Genome`]: crate::Genome
pub type GenomeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that abort a generation cycle.
///
/// A failed cycle leaves no partial generation behind;
/// callers wishing to continue must restart evolution.
#[derive(Debug, Error)]
pub enum Error {
    /// A genome's innovation-weight map could not be compared.
    #[error("malformed distance input: {0}")]
    MalformedDistance(String),

    /// The fitness function returned a negative or non-finite value.
    #[error("fitness function returned {fitness} for genome {genome}")]
    InvalidFitness { genome: GenomeId, fitness: f32 },

    /// A genome operation (crossover or distance) failed.
    #[error("genome operation failed: {0}")]
    Genome(#[source] GenomeError),

    /// Selection was attempted with no species to draw from.
    #[error("attempted selection on a population with no species")]
    NoSpecies,

    /// A species was asked for a member it does not contain.
    #[error("species {0} has no members")]
    EmptySpecies(crate::populations::SpeciesId),

    /// Population settings failed validation.
    #[error("invalid population settings: {0}")]
    InvalidSettings(String),
}

impl Error {
    /// Wraps an error raised by a genome implementation.
    pub fn genome<E>(error: E) -> Error
    where
        E: Into<GenomeError>,
    {
        Error::Genome(error.into())
    }
}
