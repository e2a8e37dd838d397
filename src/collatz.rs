//! Bounded Collatz simulation.
//!
//! The state machine maps `n` to `n/2` when even and `3n + 1` when odd and
//! stops at `1`.  Every walk is capped by a step ceiling; a walk that hits
//! the ceiling (or leaves the 128-bit range) is inconclusive and is never
//! reported as divergent.

use crate::config::{EngineConfig, DEFAULT_COLLATZ_STEP_LIMIT};
use crate::error::EngineError;
use crate::verdict::{int_value, VerificationResult};
use num_bigint::BigInt;
use serde_json::{json, Value};

/// Applies one Collatz step, or `None` if `3n + 1` overflows.
#[inline]
pub fn step(n: u128) -> Option<u128> {
    if n % 2 == 0 {
        Some(n / 2)
    } else {
        n.checked_mul(3)?.checked_add(1)
    }
}

/// Collatz simulator with a fixed step ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollatzEngine {
    step_limit: u64,
    max_range_span: u64,
}

impl Default for CollatzEngine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Aggregate of a range walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSummary {
    /// Number of starting values examined.
    pub count: u64,
    /// Starting values that reached 1, with the longest stopping time seen.
    pub longest: Option<(u64, u64)>,
    /// Starting values that could not be resolved within the ceiling.
    pub unresolved: Vec<u64>,
}

impl RangeSummary {
    /// `true` when every starting value reached 1 within the ceiling.
    pub fn all_reach_one(&self) -> bool {
        self.unresolved.is_empty()
    }
}

impl CollatzEngine {
    /// Creates an engine with the given step ceiling.
    pub fn new(step_limit: u64) -> Self {
        Self {
            step_limit,
            max_range_span: EngineConfig::default().max_range_span,
        }
    }

    /// Creates an engine from the shared config.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            step_limit: config.collatz_step_limit,
            max_range_span: config.max_range_span,
        }
    }

    /// Returns the step ceiling.
    pub fn step_limit(&self) -> u64 {
        self.step_limit
    }

    fn walk<F: FnMut(u128)>(&self, n: u64, mut visit: F) -> Result<u64, EngineError> {
        if n == 0 {
            return Err(EngineError::NonPositive { field: "n" });
        }
        let mut current = n as u128;
        let mut steps = 0u64;
        visit(current);
        while current != 1 {
            if steps >= self.step_limit {
                return Err(EngineError::StepLimitExceeded {
                    start: n,
                    limit: self.step_limit,
                });
            }
            current = step(current).ok_or(EngineError::Overflow { start: n })?;
            steps += 1;
            visit(current);
        }
        Ok(steps)
    }

    /// Number of steps for `n` to reach 1.
    pub fn stopping_time(&self, n: u64) -> Result<u64, EngineError> {
        self.walk(n, |_| {})
    }

    /// Largest value visited on the way to 1, including `n` itself.
    pub fn max_value(&self, n: u64) -> Result<u128, EngineError> {
        let mut peak = 0u128;
        self.walk(n, |v| peak = peak.max(v))?;
        Ok(peak)
    }

    /// The full trajectory from `n` down to 1, inclusive at both ends.
    pub fn sequence(&self, n: u64) -> Result<Vec<u128>, EngineError> {
        let mut values = Vec::new();
        self.walk(n, |v| values.push(v))?;
        Ok(values)
    }

    /// Compares a claimed stopping time against the recomputed one.
    pub fn verify_stopping_time(&self, n: u64, claimed: &BigInt) -> VerificationResult {
        match self.stopping_time(n) {
            Ok(actual) if BigInt::from(actual) == *claimed => {
                VerificationResult::accept(format!("Stopping time of {n} is {actual}"))
                    .with_computed(json!({ "stoppingTime": actual }))
            }
            Ok(actual) => VerificationResult::reject(format!(
                "Incorrect stopping time for n={n}: claimed {claimed}, actual {actual}"
            ))
            .with_computed(json!({ "stoppingTime": actual })),
            Err(err) => VerificationResult::reject(err.to_string()),
        }
    }

    /// Compares a claimed peak value against the recomputed one.
    pub fn verify_max_value(&self, n: u64, claimed: &BigInt) -> VerificationResult {
        match self.max_value(n) {
            Ok(actual) if BigInt::from(actual) == *claimed => {
                VerificationResult::accept(format!("Maximum value reached from {n} is {actual}"))
                    .with_computed(json!({ "maxValue": int_value(actual) }))
            }
            Ok(actual) => VerificationResult::reject(format!(
                "Incorrect maximum value for n={n}: claimed {claimed}, actual {actual}"
            ))
            .with_computed(json!({ "maxValue": int_value(actual) })),
            Err(err) => VerificationResult::reject(err.to_string()),
        }
    }

    /// Compares a claimed trajectory element by element, including length.
    pub fn verify_sequence(&self, n: u64, claimed: &[BigInt]) -> VerificationResult {
        let actual = match self.sequence(n) {
            Ok(actual) => actual,
            Err(err) => return VerificationResult::reject(err.to_string()),
        };
        let computed = json!({ "length": actual.len() });
        if let Some(index) = actual
            .iter()
            .zip(claimed)
            .position(|(a, c)| BigInt::from(*a) != *c)
        {
            return VerificationResult::reject(format!(
                "Sequence for n={n} diverges at index {index}: claimed {}, actual {}",
                claimed[index], actual[index]
            ))
            .with_computed(computed);
        }
        if actual.len() != claimed.len() {
            return VerificationResult::reject(format!(
                "Sequence for n={n} has length {}, claimed length {}",
                actual.len(),
                claimed.len()
            ))
            .with_computed(computed);
        }
        VerificationResult::accept(format!(
            "Sequence for n={n} is correct ({} terms)",
            actual.len()
        ))
        .with_computed(computed)
    }

    /// Walks every start in `[start, end]`.
    ///
    /// Bounds are validated before any walk begins.
    pub fn summarize_range(&self, start: u64, end: u64) -> Result<RangeSummary, EngineError> {
        if start == 0 {
            return Err(EngineError::NonPositive { field: "range_start" });
        }
        if end == 0 {
            return Err(EngineError::NonPositive { field: "range_end" });
        }
        if start > end {
            return Err(EngineError::InvalidInput(format!(
                "range_start ({start}) must not exceed range_end ({end})"
            )));
        }
        let span = end - start + 1;
        if span > self.max_range_span {
            return Err(EngineError::SearchTooLarge(format!(
                "range of {span} values exceeds the limit of {}",
                self.max_range_span
            )));
        }
        let mut summary = RangeSummary {
            count: span,
            longest: None,
            unresolved: Vec::new(),
        };
        for n in start..=end {
            match self.stopping_time(n) {
                Ok(time) => {
                    if summary.longest.map_or(true, |(_, best)| time > best) {
                        summary.longest = Some((n, time));
                    }
                }
                Err(_) => summary.unresolved.push(n),
            }
        }
        Ok(summary)
    }

    /// Checks the claim that every start in `[start, end]` reaches 1.
    ///
    /// Unresolved starts make the result inconclusive whatever the claim.
    pub fn verify_range(&self, start: u64, end: u64, claimed: bool) -> VerificationResult {
        let summary = match self.summarize_range(start, end) {
            Ok(summary) => summary,
            Err(err) => return VerificationResult::reject(err.to_string()),
        };
        let computed = summary_value(&summary);
        if !summary.all_reach_one() {
            return VerificationResult::reject(format!(
                "Could not verify {} value(s) in [{start}, {end}] within {} steps (first: n={}); inconclusive",
                summary.unresolved.len(),
                self.step_limit,
                summary.unresolved[0]
            ))
            .with_computed(computed);
        }
        if claimed {
            VerificationResult::accept(format!(
                "All {} values in [{start}, {end}] reach 1",
                summary.count
            ))
            .with_computed(computed)
        } else {
            VerificationResult::reject(format!(
                "Every value in [{start}, {end}] reaches 1; the claim that some do not is incorrect"
            ))
            .with_computed(computed)
        }
    }
}

fn summary_value(summary: &RangeSummary) -> Value {
    let (longest_start, longest_time) = match summary.longest {
        Some((n, t)) => (Value::from(n), Value::from(t)),
        None => (Value::Null, Value::Null),
    };
    json!({
        "count": summary.count,
        "allReach1": summary.all_reach_one(),
        "longestStart": longest_start,
        "longestStoppingTime": longest_time,
        "unresolved": summary.unresolved,
    })
}

/// Stopping time of `n` under the default ceiling.
pub fn compute_stopping_time(n: u64) -> Result<u64, EngineError> {
    CollatzEngine::new(DEFAULT_COLLATZ_STEP_LIMIT).stopping_time(n)
}

/// Peak value of `n` under the default ceiling.
pub fn compute_max_value(n: u64) -> Result<u128, EngineError> {
    CollatzEngine::new(DEFAULT_COLLATZ_STEP_LIMIT).max_value(n)
}

/// Trajectory of `n` under the default ceiling.
pub fn compute_sequence(n: u64) -> Result<Vec<u128>, EngineError> {
    CollatzEngine::new(DEFAULT_COLLATZ_STEP_LIMIT).sequence(n)
}
