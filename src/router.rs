//! Dispatch of submissions to the engines.
//!
//! A [`VerificationInput`] is parsed into a typed [`Claim`] first; every
//! parse failure becomes an unverified result naming the problem.  The
//! claim is then checked by the matching engine.  No branch touches
//! external state, so equal inputs always give equal results.

use crate::collatz::CollatzEngine;
use crate::config::EngineConfig;
use crate::egyptian::{self, decomposition_value};
use crate::primes::primes_in_range_with_threshold;
use crate::schema::{Claim, Problem, Quadruple, TaskType};
use crate::sidon::{self, SearchLimits};
use crate::verdict::VerificationResult;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, trace};

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// A submission to verify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationInput {
    /// Problem slug, e.g. `"collatz"`.
    #[serde(alias = "problem_slug", alias = "problem")]
    pub problem_slug: String,
    /// Kind of task, e.g. `"VERIFY"`; matched case-insensitively.
    #[serde(alias = "task_type", alias = "type")]
    pub task_type: String,
    /// Task parameters as stored with the task.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Answer payload submitted by the agent.
    #[serde(default)]
    pub answer: Map<String, Value>,
}

/// Routes submissions to the engines under one [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct Verifier {
    config: EngineConfig,
    collatz: CollatzEngine,
    limits: SearchLimits,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Verifier {
    /// Creates a verifier bound to `config`.
    pub fn new(config: EngineConfig) -> Self {
        let collatz = CollatzEngine::from_config(&config);
        let limits = SearchLimits::from_config(&config);
        Self {
            config,
            collatz,
            limits,
        }
    }

    /// The config this verifier was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Verifies one submission.
    pub fn verify(&self, input: &VerificationInput) -> VerificationResult {
        let problem = match input.problem_slug.parse::<Problem>() {
            Ok(problem) => problem,
            Err(err) => {
                debug!(slug = %input.problem_slug, "rejecting unknown problem");
                return VerificationResult::reject(err.to_string());
            }
        };
        let task_type = match input.task_type.parse::<TaskType>() {
            Ok(task_type) => task_type,
            Err(err) => {
                debug!(%problem, task_type = %input.task_type, "rejecting unknown task type");
                return VerificationResult::reject(err.to_string());
            }
        };
        let claim = match Claim::parse(problem, task_type, &input.parameters, &input.answer) {
            Ok(claim) => claim,
            Err(err) => {
                debug!(%problem, %task_type, error = %err, "malformed submission");
                return VerificationResult::reject(err.to_string());
            }
        };
        let result = self.check(&claim);
        trace!(%problem, %task_type, verified = result.verified, "verified submission");
        result
    }

    /// Verifies many independent submissions, preserving order.
    pub fn verify_batch(&self, inputs: &[VerificationInput]) -> Vec<VerificationResult> {
        debug!(count = inputs.len(), "verifying batch");
        #[cfg(not(target_arch = "wasm32"))]
        {
            inputs.par_iter().map(|input| self.verify(input)).collect()
        }
        #[cfg(target_arch = "wasm32")]
        {
            inputs.iter().map(|input| self.verify(input)).collect()
        }
    }

    /// Checks an already-parsed claim.
    pub fn check(&self, claim: &Claim) -> VerificationResult {
        match claim {
            Claim::Decomposition(q) => egyptian::verify(&q.n, &q.x, &q.y, &q.z),
            Claim::DecompositionRange {
                start,
                end,
                solutions,
            } => self.check_decomposition_range(*start, *end, solutions),
            Claim::CounterexampleSearch {
                start,
                end,
                found,
                candidate,
            } => self.check_counterexample_search(*start, *end, *found, candidate.as_ref()),
            Claim::StoppingTime { n, claimed } => self.collatz.verify_stopping_time(*n, claimed),
            Claim::MaxValue { n, claimed } => self.collatz.verify_max_value(*n, claimed),
            Claim::Sequence { n, claimed } => self.collatz.verify_sequence(*n, claimed),
            Claim::ReachesOne {
                start,
                end,
                claimed,
            } => self.collatz.verify_range(*start, *end, *claimed),
            Claim::SidonMembership { set, claimed } => check_membership(set, *claimed),
            Claim::SidonAllSets {
                max_element,
                set_size,
                sets,
            } => sidon::verify_all_sets(*max_element, *set_size, sets, &self.limits),
            Claim::SidonCount {
                max_element,
                set_size,
                claimed,
            } => match claimed.to_u64() {
                Some(claimed) => {
                    sidon::verify_count(*max_element, *set_size, claimed, &self.limits)
                }
                None => VerificationResult::reject(format!(
                    "Count must be a non-negative integer within range, got {claimed}"
                )),
            },
            Claim::SidonMaximum { max_element, set } => {
                sidon::verify_maximum(*max_element, set, &self.limits)
            }
        }
    }

    fn check_range(&self, start: u64, end: u64, limit: u64) -> Result<(), VerificationResult> {
        if start > end {
            return Err(VerificationResult::reject(format!(
                "range_start ({start}) must not exceed range_end ({end})"
            )));
        }
        if end - start + 1 > limit {
            return Err(VerificationResult::reject(format!(
                "Range [{start}, {end}] exceeds the limit of {limit} values"
            )));
        }
        Ok(())
    }

    fn check_decomposition_range(
        &self,
        start: u64,
        end: u64,
        solutions: &[Quadruple],
    ) -> VerificationResult {
        if let Err(rejection) = self.check_range(start, end, self.config.max_range_span) {
            return rejection;
        }
        let mut covered = BTreeSet::new();
        for solution in solutions {
            let n = match solution.n.to_u64().filter(|n| (start..=end).contains(n)) {
                Some(n) => n,
                None => {
                    return VerificationResult::reject(format!(
                        "Solution for n={} lies outside [{start}, {end}]",
                        solution.n
                    ))
                }
            };
            let check = egyptian::verify(&solution.n, &solution.x, &solution.y, &solution.z);
            if !check.verified {
                return VerificationResult::reject(format!(
                    "Invalid solution for n={n}: {}",
                    check.message
                ));
            }
            covered.insert(n);
        }
        let expected =
            primes_in_range_with_threshold(start, end, self.config.trial_division_limit);
        if let Some(missing) = expected.iter().find(|p| !covered.contains(p)) {
            return VerificationResult::reject(format!("Missing solution for n={missing}"))
                .with_computed(json!({ "primes": expected.len(), "covered": covered.len() }));
        }
        VerificationResult::accept(format!(
            "All {} primes in [{start}, {end}] have valid decompositions",
            expected.len()
        ))
        .with_computed(json!({ "primes": expected.len(), "covered": covered.len() }))
    }

    fn check_counterexample_search(
        &self,
        start: u64,
        end: u64,
        found: bool,
        candidate: Option<&BigInt>,
    ) -> VerificationResult {
        if let Err(rejection) = self.check_range(start, end, self.config.max_search_span) {
            return rejection;
        }
        if found {
            let label = candidate.map_or_else(|| "unspecified n".to_string(), |n| format!("n={n}"));
            let mut result = VerificationResult::reject(format!(
                "Counterexample claim for {label} requires manual verification"
            ));
            if let Some(known) = candidate
                .and_then(|n| n.to_u64())
                .and_then(|n| egyptian::find_solution_with_budget(n, self.config.egyptian_search_budget))
            {
                result = result.with_computed(json!({ "decomposition": decomposition_value(&known) }));
            }
            return result;
        }
        let sweep = egyptian::sweep_range(start, end, self.config.egyptian_search_budget);
        if let Some(&stuck) = sweep.unresolved.first() {
            return VerificationResult::reject(format!(
                "No decomposition found within search bounds for n={stuck}; requires manual verification"
            ))
            .with_computed(json!({ "unresolved": sweep.unresolved }));
        }
        VerificationResult::accept(format!(
            "No counterexample in [{start}, {end}]: decompositions found for all {} values",
            sweep.solved.len()
        ))
        .with_computed(json!({ "solved": sweep.solved.len() }))
    }
}

fn check_membership(set: &[u64], claimed: bool) -> VerificationResult {
    let outcome = match sidon::classify(set) {
        Ok(outcome) => outcome,
        Err(err) => return VerificationResult::reject(err.to_string()),
    };
    let (actual, detail) = match &outcome {
        Ok(sums) => (true, format!("all {} pairwise sums are distinct", sums.len())),
        Err(sum) => (false, format!("sum {sum} appears more than once")),
    };
    let computed = json!({ "isSidon": actual });
    match (actual == claimed, actual) {
        (true, true) => VerificationResult::accept(format!("Correct: set is a Sidon set ({detail})")),
        (true, false) => {
            VerificationResult::accept(format!("Correct: set is not a Sidon set ({detail})"))
        }
        (false, true) => VerificationResult::reject(format!(
            "Incorrect: set is a Sidon set ({detail})"
        )),
        (false, false) => VerificationResult::reject(format!(
            "Incorrect: set is not a Sidon set ({detail})"
        )),
    }
    .with_computed(computed)
}

/// Verifies one submission under the default config.
pub fn verify(input: &VerificationInput) -> VerificationResult {
    Verifier::default().verify(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(problem: &str, task_type: TaskType, parameters: Value, answer: Value) -> VerificationInput {
        VerificationInput {
            problem_slug: problem.to_string(),
            task_type: task_type.to_string(),
            parameters: parameters.as_object().cloned().unwrap_or_default(),
            answer: answer.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_erdos_compute() {
        let result = verify(&input(
            "erdos-straus",
            TaskType::Compute,
            json!({ "n": 5 }),
            json!({ "x": 2, "y": 4, "z": 20 }),
        ));
        assert!(result.verified, "{}", result.message);
    }

    #[test]
    fn test_erdos_verify_requires_every_prime() {
        let solutions: Vec<Value> = [2u64, 3, 5, 7]
            .iter()
            .map(|&n| {
                let d = egyptian::find_solution(n).unwrap();
                decomposition_value(&d)
            })
            .collect();
        let params = json!({ "range_start": 2, "range_end": 10 });
        let ok = verify(&input(
            "erdos-straus",
            TaskType::Verify,
            params.clone(),
            json!({ "solutions": solutions }),
        ));
        assert!(ok.verified, "{}", ok.message);

        let partial = verify(&input(
            "erdos-straus",
            TaskType::Verify,
            params,
            json!({ "solutions": solutions[..3] }),
        ));
        assert!(!partial.verified);
        assert_eq!(partial.message, "Missing solution for n=7");
    }

    #[test]
    fn test_erdos_range_may_start_at_one() {
        let solutions: Vec<Value> = [2u64, 3]
            .iter()
            .map(|&n| decomposition_value(&egyptian::find_solution(n).unwrap()))
            .collect();
        let result = verify(&input(
            "erdos-straus",
            TaskType::Verify,
            json!({ "range_start": 1, "range_end": 3 }),
            json!({ "solutions": solutions }),
        ));
        assert!(result.verified, "{}", result.message);
        assert_eq!(result.computed, Some(json!({ "primes": 2, "covered": 2 })));
        let search = verify(&input(
            "erdos-straus",
            TaskType::Search,
            json!({ "range_start": 1, "range_end": 30 }),
            json!({ "foundCounterexample": false }),
        ));
        assert!(search.verified, "{}", search.message);
    }

    #[test]
    fn test_trial_division_limit_reaches_range_checks() {
        let solutions: Vec<Value> = primes_in_range_with_threshold(2, 60, 0)
            .into_iter()
            .map(|n| decomposition_value(&egyptian::find_solution(n).unwrap()))
            .collect();
        let submission = input(
            "erdos-straus",
            TaskType::Verify,
            json!({ "range_start": 2, "range_end": 60 }),
            json!({ "solutions": solutions }),
        );
        for limit in [0, 2, 1_000_000] {
            let verifier = Verifier::new(EngineConfig {
                trial_division_limit: limit,
                ..EngineConfig::default()
            });
            let result = verifier.verify(&submission);
            assert!(result.verified, "limit {limit}: {}", result.message);
            assert_eq!(result.computed, Some(json!({ "primes": 17, "covered": 17 })));
        }
    }

    #[test]
    fn test_erdos_search_positive_claim_needs_review() {
        let result = verify(&input(
            "erdos-straus",
            TaskType::Search,
            json!({ "range_start": 100, "range_end": 120 }),
            json!({ "foundCounterexample": true, "counterexampleN": 101 }),
        ));
        assert!(!result.verified);
        assert!(result.message.contains("manual verification"));
        assert!(result.computed.is_some());
    }

    #[test]
    fn test_erdos_search_negative_claim_is_confirmed() {
        let result = verify(&input(
            "erdos-straus",
            TaskType::Search,
            json!({ "range_start": 100, "range_end": 120 }),
            json!({ "found_counterexample": false }),
        ));
        assert!(result.verified, "{}", result.message);
    }

    #[test]
    fn test_collatz_metrics() {
        let stopping = verify(&input(
            "collatz",
            TaskType::Compute,
            json!({ "n": 27, "metric": "stopping_time" }),
            json!({ "stoppingTime": 111 }),
        ));
        assert!(stopping.verified);
        let peak = verify(&input(
            "collatz",
            TaskType::Compute,
            json!({ "n": 27, "computeType": "max_value" }),
            json!({ "max_value": "9232" }),
        ));
        assert!(peak.verified, "{}", peak.message);
    }

    #[test]
    fn test_collatz_range_validation() {
        let result = verify(&input(
            "collatz",
            TaskType::Verify,
            json!({ "range_start": 100, "range_end": 1 }),
            json!({ "allReach1": true }),
        ));
        assert!(!result.verified);
        assert!(result.message.contains("must not exceed"));
    }

    #[test]
    fn test_sidon_alias_equivalence() {
        let params = json!({ "compute_type": "verify_set", "set": [1, 2, 4, 8, 13] });
        let snake = verify(&input("sidon", TaskType::Compute, params.clone(), json!({ "is_sidon": true })));
        let camel = verify(&input("sidon", TaskType::Compute, params, json!({ "isSidon": true })));
        assert!(snake.verified);
        assert_eq!(snake, camel);
    }

    #[test]
    fn test_sidon_wrong_claim() {
        let result = verify(&input(
            "sidon",
            TaskType::Verify,
            json!({ "set": [1, 2, 3, 4] }),
            json!({ "isSidon": true }),
        ));
        assert!(!result.verified);
        assert!(result.message.contains("sum 4"));
    }

    #[test]
    fn test_unknown_values_are_named() {
        let unknown = verify(&input("goldbach", TaskType::Compute, json!({}), json!({})));
        assert_eq!(unknown.message, "Unknown problem: goldbach");
        let compute = verify(&input(
            "sidon",
            TaskType::Compute,
            json!({ "compute_type": "guess", "max_element": 5 }),
            json!({}),
        ));
        assert_eq!(compute.message, "Unknown compute type for sidon: guess");
        let pattern = verify(&input("collatz", TaskType::Pattern, json!({}), json!({})));
        assert!(!pattern.verified);
    }

    #[test]
    fn test_batch_preserves_order() {
        let verifier = Verifier::default();
        let inputs = vec![
            input("collatz", TaskType::Compute, json!({ "n": 1, "metric": "stopping_time" }), json!({ "stoppingTime": 0 })),
            input("collatz", TaskType::Compute, json!({ "n": 1, "metric": "stopping_time" }), json!({ "stoppingTime": 1 })),
            input("sidon", TaskType::Verify, json!({ "set": [1, 2, 4] }), json!({ "isSidon": true })),
        ];
        let verdicts: Vec<bool> = verifier.verify_batch(&inputs).iter().map(|r| r.verified).collect();
        assert_eq!(verdicts, vec![true, false, true]);
    }

    #[test]
    fn test_verification_is_repeatable() {
        let submission = input(
            "sidon",
            TaskType::Compute,
            json!({ "compute_type": "count", "max_element": 8, "set_size": 3 }),
            json!({ "count": 44 }),
        );
        assert_eq!(verify(&submission), verify(&submission));
    }
}
