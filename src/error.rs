//! Error taxonomy shared by the engines.
//!
//! Engines return these errors; the [`router`](crate::router) converts every
//! one of them into an unverified [`VerificationResult`](crate::VerificationResult)
//! so nothing escapes the verification boundary.

use thiserror::Error;

/// Failures raised by the primality, Diophantine, Collatz and Sidon engines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{field} must be a positive integer")]
    /// A problem-domain integer was zero or negative.
    NonPositive {
        /// Name of the offending value.
        field: &'static str,
    },
    #[error("{0}")]
    /// Input was structurally valid but violates a domain constraint.
    InvalidInput(String),
    #[error("no prime exists in [{min}, {max}]")]
    /// The interval was scanned exhaustively and holds no prime.
    NoPrimeInRange {
        /// Inclusive lower bound.
        min: u64,
        /// Inclusive upper bound.
        max: u64,
    },
    #[error("could not verify n={start} within {limit} steps")]
    /// The Collatz ceiling was hit before the sequence reached 1.
    StepLimitExceeded {
        /// Starting value of the sequence.
        start: u64,
        /// Step ceiling in force.
        limit: u64,
    },
    #[error("intermediate value exceeded 128 bits while iterating n={start}")]
    /// A trajectory left the representable range; inconclusive, not divergent.
    Overflow {
        /// Starting value of the sequence.
        start: u64,
    },
    #[error("{0} is beyond the deterministic Miller-Rabin bound")]
    /// No published deterministic witness set covers the candidate.
    BeyondDeterministicBound(String),
    #[error("search too large: {0}")]
    /// Exhaustive search parameters exceed the configured limits.
    SearchTooLarge(String),
}
