//! Randomized, duplicate-free task generation.
//!
//! Each [`TaskKind`] carries a static table of [`DifficultyTier`]s.  A tier
//! fixes the sampling range and the point value; parameters are drawn inside
//! the chosen tier's range, often through the primality oracle.  Batch
//! generation skips any task whose canonical key is already known and gives
//! up after a bounded number of attempts, returning a short batch rather
//! than looping.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::primes::random_prime_in_range_with_threshold;
use crate::schema::{Problem, TaskType};
use crate::sidon::pairwise_sums;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Difficulty label of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Entry level.
    Easy,
    /// Intermediate.
    Medium,
    /// Advanced.
    Hard,
    /// Largest parameters.
    Expert,
}

impl Difficulty {
    /// All tiers from easiest to hardest.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// Lower-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| EngineError::InvalidInput(format!("Unknown difficulty: {raw}")))
    }
}

/// A static `(range, difficulty, points)` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyTier {
    /// Inclusive sampling range for the tier's primary parameter.
    pub range: (u64, u64),
    /// Difficulty label.
    pub difficulty: Difficulty,
    /// Points awarded for a verified answer.
    pub points: u32,
}

const fn tier(low: u64, high: u64, difficulty: Difficulty, points: u32) -> DifficultyTier {
    DifficultyTier {
        range: (low, high),
        difficulty,
        points,
    }
}

use Difficulty::{Easy, Expert, Hard, Medium};

const ERDOS_COMPUTE_TIERS: &[DifficultyTier] = &[
    tier(2, 100, Easy, 10),
    tier(100, 1_000, Medium, 25),
    tier(1_000, 10_000, Hard, 50),
    tier(10_000, 100_000, Expert, 100),
];

const ERDOS_VERIFY_TIERS: &[DifficultyTier] = &[
    tier(2, 1_000, Easy, 15),
    tier(1_000, 10_000, Medium, 30),
    tier(10_000, 100_000, Hard, 60),
    tier(100_000, 1_000_000, Expert, 120),
];

const ERDOS_SEARCH_TIERS: &[DifficultyTier] = &[
    tier(100, 1_000, Easy, 20),
    tier(1_000, 10_000, Medium, 40),
    tier(10_000, 100_000, Hard, 80),
    tier(100_000, 1_000_000, Expert, 150),
];

const COLLATZ_COMPUTE_TIERS: &[DifficultyTier] = &[
    tier(1, 100, Easy, 10),
    tier(100, 10_000, Medium, 20),
    tier(10_000, 1_000_000, Hard, 40),
    tier(1_000_000, 100_000_000, Expert, 80),
];

const COLLATZ_VERIFY_TIERS: &[DifficultyTier] = &[
    tier(1, 1_000, Easy, 15),
    tier(1_000, 100_000, Medium, 30),
    tier(100_000, 10_000_000, Hard, 60),
    tier(10_000_000, 1_000_000_000, Expert, 120),
];

const SIDON_SET_TIERS: &[DifficultyTier] = &[
    tier(10, 20, Easy, 10),
    tier(20, 50, Medium, 20),
    tier(50, 100, Hard, 40),
    tier(100, 200, Expert, 80),
];

const SIDON_ENUMERATION_TIERS: &[DifficultyTier] = &[
    tier(5, 8, Easy, 15),
    tier(8, 12, Medium, 30),
    tier(12, 18, Hard, 60),
    tier(18, 25, Expert, 120),
];

const SIDON_MAXIMUM_TIERS: &[DifficultyTier] = &[
    tier(5, 10, Easy, 20),
    tier(10, 15, Medium, 40),
    tier(15, 22, Hard, 80),
    tier(22, 28, Expert, 150),
];

/// Every task shape the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Decompose `4/n` for a prime `n`.
    ErdosCompute,
    /// Decompose every prime in a range.
    ErdosVerify,
    /// Hunt for a counterexample in a range.
    ErdosSearch,
    /// Stopping time, peak or trajectory of one start.
    CollatzCompute,
    /// Confirm every start in a range reaches 1.
    CollatzVerify,
    /// Decide whether a given set is Sidon (COMPUTE).
    SidonVerifySet,
    /// List all Sidon sets of a size.
    SidonFindAll,
    /// Count all Sidon sets of a size.
    SidonCount,
    /// Find a maximum Sidon set.
    SidonFindMaximum,
    /// Decide whether a given set is Sidon (VERIFY).
    SidonVerify,
}

impl TaskKind {
    /// Every kind.
    pub const ALL: [TaskKind; 10] = [
        TaskKind::ErdosCompute,
        TaskKind::ErdosVerify,
        TaskKind::ErdosSearch,
        TaskKind::CollatzCompute,
        TaskKind::CollatzVerify,
        TaskKind::SidonVerifySet,
        TaskKind::SidonFindAll,
        TaskKind::SidonCount,
        TaskKind::SidonFindMaximum,
        TaskKind::SidonVerify,
    ];

    /// Problem this kind belongs to.
    pub fn problem(&self) -> Problem {
        match self {
            TaskKind::ErdosCompute | TaskKind::ErdosVerify | TaskKind::ErdosSearch => {
                Problem::ErdosStraus
            }
            TaskKind::CollatzCompute | TaskKind::CollatzVerify => Problem::Collatz,
            _ => Problem::Sidon,
        }
    }

    /// Task type this kind is filed under.
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskKind::ErdosVerify | TaskKind::CollatzVerify | TaskKind::SidonVerify => {
                TaskType::Verify
            }
            TaskKind::ErdosSearch => TaskType::Search,
            _ => TaskType::Compute,
        }
    }

    /// Static tier table.
    pub fn tiers(&self) -> &'static [DifficultyTier] {
        match self {
            TaskKind::ErdosCompute => ERDOS_COMPUTE_TIERS,
            TaskKind::ErdosVerify => ERDOS_VERIFY_TIERS,
            TaskKind::ErdosSearch => ERDOS_SEARCH_TIERS,
            TaskKind::CollatzCompute => COLLATZ_COMPUTE_TIERS,
            TaskKind::CollatzVerify => COLLATZ_VERIFY_TIERS,
            TaskKind::SidonVerifySet | TaskKind::SidonVerify => SIDON_SET_TIERS,
            TaskKind::SidonFindAll | TaskKind::SidonCount => SIDON_ENUMERATION_TIERS,
            TaskKind::SidonFindMaximum => SIDON_MAXIMUM_TIERS,
        }
    }

    /// Kinds filed under `problem`.
    pub fn for_problem(problem: Problem) -> Vec<TaskKind> {
        TaskKind::ALL
            .into_iter()
            .filter(|kind| kind.problem() == problem)
            .collect()
    }
}

/// How a generated task's answers are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    /// Fully checked by the engine.
    Automatic,
    /// Positive claims are escalated to a reviewer.
    ManualReview,
}

/// A task ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTask {
    /// Problem the task belongs to.
    pub problem: Problem,
    /// Task type.
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Short title.
    pub title: String,
    /// Full instructions.
    pub description: String,
    /// Parameters the answer is checked against.
    pub parameters: Map<String, Value>,
    /// Tier label.
    pub difficulty: Difficulty,
    /// Tier points.
    pub points: u32,
    /// How answers are checked.
    pub verification_type: VerificationType,
}

impl GeneratedTask {
    /// Canonical duplicate-detection key.
    pub fn key(&self) -> String {
        task_key(self.problem, self.task_type, &self.parameters)
    }

    /// Hex SHA-256 of [`key`](Self::key), suitable as a store index.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.key().as_bytes()))
    }
}

/// Serializes `(problem, type, parameters)` with sorted keys.
pub fn task_key(problem: Problem, task_type: TaskType, parameters: &Map<String, Value>) -> String {
    json!([problem.slug(), task_type.as_str(), parameters]).to_string()
}

fn span_for(difficulty: Difficulty, spans: [u64; 4]) -> u64 {
    spans[difficulty as usize]
}

fn set_size_for(difficulty: Difficulty) -> usize {
    match difficulty {
        Difficulty::Easy => 4,
        Difficulty::Medium => 5,
        Difficulty::Hard => 6,
        Difficulty::Expert => 8,
    }
}

fn enumeration_size_for(difficulty: Difficulty) -> usize {
    match difficulty {
        Difficulty::Easy => 2,
        Difficulty::Medium => 3,
        Difficulty::Hard => 4,
        Difficulty::Expert => 5,
    }
}

fn to_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Produces tasks from a random source under an [`EngineConfig`].
#[derive(Debug)]
pub struct TaskGenerator<R> {
    rng: R,
    config: EngineConfig,
}

impl<R: Rng> TaskGenerator<R> {
    /// Creates a generator.
    pub fn new(rng: R, config: EngineConfig) -> Self {
        Self { rng, config }
    }

    /// Returns the random source.
    pub fn into_rng(self) -> R {
        self.rng
    }

    fn pick_tier(&mut self, kind: TaskKind, preferred: Option<Difficulty>) -> DifficultyTier {
        let tiers = kind.tiers();
        preferred
            .and_then(|d| tiers.iter().find(|t| t.difficulty == d).copied())
            .unwrap_or_else(|| tiers[self.rng.gen_range(0..tiers.len())])
    }

    fn random_prime(&mut self, low: u64, high: u64) -> Result<u64, EngineError> {
        random_prime_in_range_with_threshold(
            &mut self.rng,
            low,
            high,
            self.config.random_prime_attempts,
            self.config.trial_division_limit,
        )
    }

    /// Greedy random Sidon set of up to `size` elements from `[1, max]`.
    fn random_sidon_set(&mut self, size: usize, max: u64) -> Vec<u64> {
        let mut candidates: Vec<u64> = (1..=max).collect();
        candidates.shuffle(&mut self.rng);
        let mut set: Vec<u64> = Vec::with_capacity(size);
        for candidate in candidates {
            if set.len() == size {
                break;
            }
            set.push(candidate);
            if pairwise_sums(&set).is_err() {
                set.pop();
            }
        }
        set.sort_unstable();
        set
    }

    fn random_plain_set(&mut self, size: usize, max: u64) -> Vec<u64> {
        let mut set: Vec<u64> =
            rand::seq::index::sample(&mut self.rng, max as usize, size.min(max as usize))
                .into_iter()
                .map(|i| i as u64 + 1)
                .collect();
        set.sort_unstable();
        set
    }

    fn test_set(&mut self, difficulty: Difficulty, max: u64) -> Vec<u64> {
        let size = set_size_for(difficulty);
        if self.rng.gen_bool(0.5) {
            self.random_sidon_set(size, max)
        } else {
            self.random_plain_set(size, max)
        }
    }

    /// Generates one task of `kind`, at `difficulty` or a uniformly random tier.
    pub fn generate(
        &mut self,
        kind: TaskKind,
        difficulty: Option<Difficulty>,
    ) -> Result<GeneratedTask, EngineError> {
        let tier = self.pick_tier(kind, difficulty);
        let (low, high) = tier.range;
        let d = tier.difficulty;
        let (title, description, parameters) = match kind {
            TaskKind::ErdosCompute => {
                let n = self.random_prime(low, high)?;
                (
                    format!("Erdős–Straus decomposition for n = {n}"),
                    format!(
                        "Find positive integers x, y, z such that 4/{n} = 1/x + 1/y + 1/z."
                    ),
                    json!({ "n": n }),
                )
            }
            TaskKind::ErdosVerify => {
                let start = self.rng.gen_range(low..=high);
                let end = start + span_for(d, [10, 25, 50, 100]) - 1;
                (
                    format!("Erdős–Straus for primes in [{start}, {end}]"),
                    format!(
                        "Give a decomposition 4/n = 1/x + 1/y + 1/z for every prime n in [{start}, {end}]."
                    ),
                    json!({ "range_start": start, "range_end": end }),
                )
            }
            TaskKind::ErdosSearch => {
                let start = self.rng.gen_range(low..=high);
                let span = span_for(d, [20, 50, 100, 200]).min(self.config.max_search_span);
                let end = start + span - 1;
                (
                    format!("Erdős–Straus counterexample search in [{start}, {end}]"),
                    format!(
                        "Search [{start}, {end}] for an n > 1 such that 4/n has no decomposition into three unit fractions. Report whether one was found."
                    ),
                    json!({ "range_start": start, "range_end": end }),
                )
            }
            TaskKind::CollatzCompute => {
                let n = self.rng.gen_range(low..=high);
                let (metric, what) = match self.rng.gen_range(0..3) {
                    0 => ("stopping_time", "the number of steps needed to reach 1"),
                    1 => ("max_value", "the largest value reached"),
                    _ => ("sequence", "the full sequence down to 1"),
                };
                (
                    format!("Collatz {metric} for n = {n}"),
                    format!("Starting from {n} under the 3n + 1 map, compute {what}."),
                    json!({ "n": n, "metric": metric }),
                )
            }
            TaskKind::CollatzVerify => {
                let start = self.rng.gen_range(low..=high);
                let span =
                    span_for(d, [100, 1_000, 10_000, 50_000]).min(self.config.max_range_span);
                let end = start + span - 1;
                (
                    format!("Collatz convergence on [{start}, {end}]"),
                    format!("Determine whether every integer in [{start}, {end}] reaches 1."),
                    json!({ "range_start": start, "range_end": end }),
                )
            }
            TaskKind::SidonVerifySet | TaskKind::SidonVerify => {
                let max = self.rng.gen_range(low..=high);
                let set = self.test_set(d, max);
                let mut parameters = json!({ "set": set });
                if kind == TaskKind::SidonVerifySet {
                    parameters["compute_type"] = json!("verify_set");
                }
                (
                    format!("Is {set:?} a Sidon set?"),
                    "Decide whether all pairwise sums a + b (a <= b) of the set are distinct."
                        .to_string(),
                    parameters,
                )
            }
            TaskKind::SidonFindAll | TaskKind::SidonCount => {
                let max_element = self.rng.gen_range(low..=high).min(self.config.sidon_max_element);
                let set_size = enumeration_size_for(d).min(self.config.sidon_max_set_size);
                let (compute_type, verb) = if kind == TaskKind::SidonFindAll {
                    ("find_all", "List")
                } else {
                    ("count", "Count")
                };
                (
                    format!("{verb} Sidon sets of size {set_size} in [1, {max_element}]"),
                    format!(
                        "{verb} every Sidon set with exactly {set_size} elements drawn from 1..={max_element}."
                    ),
                    json!({
                        "compute_type": compute_type,
                        "max_element": max_element,
                        "set_size": set_size,
                    }),
                )
            }
            TaskKind::SidonFindMaximum => {
                let max_element = self.rng.gen_range(low..=high).min(self.config.sidon_max_element);
                (
                    format!("Largest Sidon set in [1, {max_element}]"),
                    format!("Find a Sidon set of maximum size using elements from 1..={max_element}."),
                    json!({ "compute_type": "find_maximum", "max_element": max_element }),
                )
            }
        };
        let task_type = kind.task_type();
        Ok(GeneratedTask {
            problem: kind.problem(),
            task_type,
            title,
            description,
            parameters: to_map(parameters),
            difficulty: d,
            points: tier.points,
            verification_type: if task_type == TaskType::Search {
                VerificationType::ManualReview
            } else {
                VerificationType::Automatic
            },
        })
    }

    /// Generates one task for `problem`, choosing among its kinds uniformly.
    pub fn generate_for_problem(
        &mut self,
        problem: Problem,
        difficulty: Option<Difficulty>,
    ) -> Result<GeneratedTask, EngineError> {
        let kinds = TaskKind::for_problem(problem);
        let kind = kinds[self.rng.gen_range(0..kinds.len())];
        self.generate(kind, difficulty)
    }

    fn fill(
        &mut self,
        count: usize,
        existing: &HashSet<String>,
        accepted: &mut HashSet<String>,
        mut make: impl FnMut(&mut Self, usize) -> Result<GeneratedTask, EngineError>,
    ) -> Vec<GeneratedTask> {
        let max_attempts = count.saturating_mul(self.config.generation_attempt_factor as usize);
        let mut tasks = Vec::with_capacity(count);
        let mut attempts = 0;
        while tasks.len() < count && attempts < max_attempts {
            attempts += 1;
            let task = match make(self, tasks.len()) {
                Ok(task) => task,
                Err(err) => {
                    debug!(error = %err, "candidate generation failed");
                    continue;
                }
            };
            let key = task.key();
            if existing.contains(&key) || accepted.contains(&key) {
                debug!(%key, "skipping duplicate task");
                continue;
            }
            accepted.insert(key);
            tasks.push(task);
        }
        if tasks.len() < count {
            warn!(
                requested = count,
                produced = tasks.len(),
                attempts,
                "generation attempts exhausted"
            );
        }
        tasks
    }

    /// Generates up to `count` tasks not present in `existing`.
    ///
    /// `problem` and `difficulty` restrict the draw when given.  At most
    /// `generation_attempt_factor × count` candidates are tried.
    pub fn generate_tasks(
        &mut self,
        count: usize,
        existing: &HashSet<String>,
        problem: Option<Problem>,
        difficulty: Option<Difficulty>,
    ) -> Vec<GeneratedTask> {
        let mut accepted = HashSet::new();
        self.fill(count, existing, &mut accepted, |generator, _| {
            let problem = problem
                .unwrap_or_else(|| Problem::ALL[generator.rng.gen_range(0..Problem::ALL.len())]);
            generator.generate_for_problem(problem, difficulty)
        })
    }

    /// Spreads `count` tasks evenly across problems and, within the batch,
    /// across difficulty tiers, then shuffles the result.
    pub fn generate_balanced(
        &mut self,
        count: usize,
        existing: &HashSet<String>,
    ) -> Vec<GeneratedTask> {
        let problems = Problem::ALL;
        let base = count / problems.len();
        let extra = count % problems.len();
        let mut accepted = HashSet::new();
        let mut batch = Vec::with_capacity(count);
        let mut offset = 0;
        for (index, problem) in problems.into_iter().enumerate() {
            let share = base + usize::from(index < extra);
            let start = offset;
            let mut tasks = self.fill(share, existing, &mut accepted, |generator, produced| {
                let difficulty = Difficulty::ALL[(start + produced) % Difficulty::ALL.len()];
                generator.generate_for_problem(problem, Some(difficulty))
            });
            offset += share;
            batch.append(&mut tasks);
        }
        batch.shuffle(&mut self.rng);
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::SeededRng;
    use crate::primes::is_prime;

    fn generator(seed: u64) -> TaskGenerator<SeededRng> {
        TaskGenerator::new(SeededRng::new("tests", seed), EngineConfig::default())
    }

    #[test]
    fn test_tier_fixes_points() {
        let mut gen = generator(1);
        for difficulty in Difficulty::ALL {
            let task = gen.generate(TaskKind::ErdosCompute, Some(difficulty)).unwrap();
            let tier = ERDOS_COMPUTE_TIERS
                .iter()
                .find(|t| t.difficulty == difficulty)
                .unwrap();
            assert_eq!(task.points, tier.points);
            let n = task.parameters["n"].as_u64().unwrap();
            assert!(is_prime(n));
            assert!((tier.range.0..=tier.range.1).contains(&n));
        }
    }

    #[test]
    fn test_search_tasks_need_review() {
        let mut gen = generator(2);
        let task = gen.generate(TaskKind::ErdosSearch, None).unwrap();
        assert_eq!(task.task_type, TaskType::Search);
        assert_eq!(task.verification_type, VerificationType::ManualReview);
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = to_map(json!({ "range_start": 1, "range_end": 5 }));
        let b = to_map(json!({ "range_end": 5, "range_start": 1 }));
        assert_eq!(
            task_key(Problem::Collatz, TaskType::Verify, &a),
            task_key(Problem::Collatz, TaskType::Verify, &b)
        );
    }

    #[test]
    fn test_batch_skips_existing_keys() {
        let mut first = generator(3);
        let tasks = first.generate_tasks(20, &HashSet::new(), None, None);
        assert_eq!(tasks.len(), 20);
        let keys: HashSet<String> = tasks.iter().map(GeneratedTask::key).collect();
        assert_eq!(keys.len(), 20);

        let mut replay = generator(3);
        let again = replay.generate_tasks(20, &keys, None, None);
        assert!(again.iter().all(|t| !keys.contains(&t.key())));
    }

    #[test]
    fn test_batch_returns_short_when_space_is_exhausted() {
        // Easy Sidon enumeration tasks only have a handful of distinct parameter sets.
        let mut gen = generator(4);
        let mut accepted = HashSet::new();
        let tasks = gen.fill(50, &HashSet::new(), &mut accepted, |g, _| {
            g.generate(TaskKind::SidonCount, Some(Difficulty::Easy))
        });
        assert!(tasks.len() < 50);
        assert_eq!(tasks.len(), 4);
    }

    #[test]
    fn test_balanced_spreads_problems_and_tiers() {
        let mut gen = generator(5);
        let tasks = gen.generate_balanced(24, &HashSet::new());
        assert_eq!(tasks.len(), 24);
        for problem in Problem::ALL {
            assert_eq!(tasks.iter().filter(|t| t.problem == problem).count(), 8);
        }
        for difficulty in Difficulty::ALL {
            assert_eq!(tasks.iter().filter(|t| t.difficulty == difficulty).count(), 6);
        }
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let mut gen = generator(6);
        let task = gen.generate(TaskKind::CollatzCompute, None).unwrap();
        let fingerprint = task.fingerprint();
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, task.clone().fingerprint());
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("legendary".parse::<Difficulty>().is_err());
    }
}
