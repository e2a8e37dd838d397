#![deny(missing_docs)]

//! # conjecture_engine
//!
//! Claim verification and task generation for three open problems in
//! number theory: the Erdős–Straus conjecture, the Collatz conjecture and
//! Sidon sets.
//!
//! Answers arrive as loosely-shaped JSON (`problem`, `taskType`,
//! `parameters`, `answer`).  The [`router`] resolves field spellings through
//! a single alias table in [`schema`], builds a typed [`Claim`] and hands it
//! to the matching engine.  Every engine is pure: identical inputs always
//! produce identical [`VerificationResult`]s.
//!
//! ## Modules
//!
//! * [`primes`]: deterministic Miller-Rabin for every `u64` and for
//!   unbounded integers up to the proven witness bound, plus random prime
//!   selection for task parameters.
//! * [`egyptian`]: exact verification and bounded search for
//!   `4/n = 1/x + 1/y + 1/z`.
//! * [`collatz`]: step-bounded trajectories.  Running out of steps is
//!   reported as inconclusive, never as divergence.
//! * [`sidon`]: Sidon set checks and backtracking enumeration.
//! * [`generator`]: tiered, duplicate-free task batches.
//!
//! ## Usage
//!
//! ```rust
//! use conjecture_engine::{VerificationInput, Verifier};
//! use serde_json::json;
//!
//! let input: VerificationInput = serde_json::from_value(json!({
//!     "problem": "collatz",
//!     "taskType": "COMPUTE",
//!     "parameters": { "n": 27, "metric": "stopping_time" },
//!     "answer": { "stoppingTime": 111 }
//! }))
//! .unwrap();
//! let result = Verifier::default().verify(&input);
//! assert!(result.verified);
//! ```

pub mod collatz;
pub mod config;
pub mod egyptian;
pub mod error;
pub mod generator;
pub mod primes;
pub mod prng;
pub mod router;
pub mod schema;
pub mod sidon;
mod verdict;

pub use config::{ConfigError, EngineConfig};
pub use egyptian::{find_solution, Decomposition};
pub use error::EngineError;
pub use generator::{Difficulty, GeneratedTask, TaskGenerator, TaskKind, VerificationType};
pub use primes::{is_prime, next_prime, prev_prime, random_prime_in_range};
pub use prng::SeededRng;
pub use router::{verify, VerificationInput, Verifier};
pub use schema::{Claim, FieldError, Problem, TaskType};
pub use verdict::VerificationResult;
