//! Typed view of task parameters and answer payloads.
//!
//! Submissions arrive as loose JSON maps whose keys have changed spelling
//! over time.  [`FIELD_ALIASES`] lists every accepted spelling for every
//! field and is the only normalization step: a payload is parsed into a
//! [`Claim`] up front, and the verifiers only ever see the typed claim.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Problems the engine knows how to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Problem {
    /// `4/n = 1/x + 1/y + 1/z`.
    #[serde(rename = "erdos-straus")]
    ErdosStraus,
    /// The `3n + 1` iteration.
    #[serde(rename = "collatz")]
    Collatz,
    /// Sets with distinct pairwise sums.
    #[serde(rename = "sidon")]
    Sidon,
}

impl Problem {
    /// Every supported problem.
    pub const ALL: [Problem; 3] = [Problem::ErdosStraus, Problem::Collatz, Problem::Sidon];

    /// Canonical slug.
    pub fn slug(&self) -> &'static str {
        match self {
            Problem::ErdosStraus => "erdos-straus",
            Problem::Collatz => "collatz",
            Problem::Sidon => "sidon",
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Problem {
    type Err = FieldError;

    fn from_str(slug: &str) -> Result<Self, Self::Err> {
        Problem::ALL
            .into_iter()
            .find(|p| p.slug() == slug)
            .ok_or_else(|| FieldError::UnknownProblem(slug.to_string()))
    }
}

/// Kind of task an agent was asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Compute a specific value.
    Compute,
    /// Verify a property over a range or set.
    Verify,
    /// Search for a counterexample.
    Search,
    /// Describe a pattern.
    Pattern,
    /// Extend a known result.
    Extend,
}

impl TaskType {
    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Compute => "COMPUTE",
            TaskType::Verify => "VERIFY",
            TaskType::Search => "SEARCH",
            TaskType::Pattern => "PATTERN",
            TaskType::Extend => "EXTEND",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = FieldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_uppercase().as_str() {
            "COMPUTE" => Ok(TaskType::Compute),
            "VERIFY" => Ok(TaskType::Verify),
            "SEARCH" => Ok(TaskType::Search),
            "PATTERN" => Ok(TaskType::Pattern),
            "EXTEND" => Ok(TaskType::Extend),
            _ => Err(FieldError::UnknownTaskType(raw.to_string())),
        }
    }
}

/// Quantity a Collatz COMPUTE task asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollatzMetric {
    /// Steps to reach 1.
    StoppingTime,
    /// Largest value on the trajectory.
    MaxValue,
    /// Full trajectory.
    Sequence,
}

/// Variant of a Sidon COMPUTE task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SidonCompute {
    /// Decide whether a given set is Sidon.
    VerifySet,
    /// List every Sidon set of a given size.
    FindAll,
    /// Count the Sidon sets of a given size.
    Count,
    /// Produce a Sidon set of maximum size.
    FindMaximum,
}

/// Canonical field name followed by every accepted spelling, in lookup order.
pub const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("n", &["n"]),
    ("x", &["x"]),
    ("y", &["y"]),
    ("z", &["z"]),
    ("set", &["set"]),
    ("sets", &["sets"]),
    ("count", &["count"]),
    ("sequence", &["sequence"]),
    ("solutions", &["solutions"]),
    ("range_start", &["range_start", "rangeStart"]),
    ("range_end", &["range_end", "rangeEnd"]),
    ("max_element", &["max_element", "maxElement"]),
    ("set_size", &["set_size", "setSize"]),
    ("metric", &["metric", "compute_type", "computeType"]),
    ("compute_type", &["compute_type", "computeType", "subtype", "task"]),
    ("is_sidon", &["is_sidon", "isSidon"]),
    ("all_reach_1", &["allReach1", "all_reach_1", "allReachOne"]),
    ("stopping_time", &["stoppingTime", "stopping_time"]),
    ("max_value", &["maxValue", "max_value"]),
    ("found_counterexample", &["foundCounterexample", "found_counterexample"]),
    ("counterexample_n", &["counterexampleN", "counterexample_n"]),
];

/// Accepted spellings of each Collatz metric value.
pub const COLLATZ_METRICS: &[(CollatzMetric, &[&str])] = &[
    (
        CollatzMetric::StoppingTime,
        &["stopping_time", "stoppingTime", "steps"],
    ),
    (CollatzMetric::MaxValue, &["max_value", "maxValue", "peak"]),
    (CollatzMetric::Sequence, &["sequence", "trajectory"]),
];

/// Accepted spellings of each Sidon compute type.
pub const SIDON_COMPUTE_TYPES: &[(SidonCompute, &[&str])] = &[
    (SidonCompute::VerifySet, &["verify_set", "verifySet"]),
    (SidonCompute::FindAll, &["find_all", "findAll", "enumerate"]),
    (SidonCompute::Count, &["count"]),
    (
        SidonCompute::FindMaximum,
        &["find_maximum", "findMaximum", "find_max"],
    ),
];

/// Reasons a payload cannot be parsed into a [`Claim`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Unknown problem: {0}")]
    /// The problem slug is not recognized.
    UnknownProblem(String),
    #[error("Unknown task type: {0}")]
    /// The task type is not recognized.
    UnknownTaskType(String),
    #[error("Unknown compute type for {problem}: {value}")]
    /// The compute type or metric is not recognized.
    UnknownComputeType {
        /// Problem slug.
        problem: Problem,
        /// Value supplied.
        value: String,
    },
    #[error("Task type {task_type} is not supported for {problem}")]
    /// The combination has no verifier.
    Unsupported {
        /// Problem slug.
        problem: Problem,
        /// Task type supplied.
        task_type: TaskType,
    },
    #[error("Missing required field: {0}")]
    /// A required field is absent under every accepted spelling.
    Missing(&'static str),
    #[error("Field {field} must be an integer, got {value}")]
    /// A value could not be read as an integer.
    NotInteger {
        /// Canonical field name.
        field: &'static str,
        /// Raw value supplied.
        value: String,
    },
    #[error("Field {0} must be a positive integer")]
    /// An integer was zero or negative.
    NotPositive(&'static str),
    #[error("Field {0} exceeds the supported range")]
    /// An integer is too large for the engine handling it.
    OutOfRange(&'static str),
    #[error("Field {0} must be a boolean")]
    /// A value could not be read as a boolean.
    NotBoolean(&'static str),
    #[error("Field {0} must be an array")]
    /// A value could not be read as an array.
    NotArray(&'static str),
    #[error("Field {0} must contain objects")]
    /// An array entry could not be read as an object.
    NotObject(&'static str),
    #[error("Field {0} must be a string")]
    /// A value could not be read as a string.
    NotString(&'static str),
    #[error("Field {0} is given under several names with different values")]
    /// Two spellings of one field disagree.
    Conflict(&'static str),
}

/// Fetches `canonical` from `map` under any accepted spelling.
pub fn lookup<'a>(
    map: &'a Map<String, Value>,
    canonical: &'static str,
) -> Result<Option<&'a Value>, FieldError> {
    let spellings = FIELD_ALIASES
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, spellings)| *spellings)
        .unwrap_or(&[]);
    let mut found: Option<&Value> = None;
    for key in spellings {
        match (found, map.get(*key)) {
            (_, None) | (_, Some(Value::Null)) => {}
            (None, Some(value)) => found = Some(value),
            (Some(prev), Some(value)) if prev != value => {
                return Err(FieldError::Conflict(canonical))
            }
            (Some(_), Some(_)) => {}
        }
    }
    Ok(found)
}

fn require<'a>(map: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, FieldError> {
    lookup(map, field)?.ok_or(FieldError::Missing(field))
}

fn to_bigint(field: &'static str, value: &Value) -> Result<BigInt, FieldError> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(raw) => raw.trim().to_string(),
        other => {
            return Err(FieldError::NotInteger {
                field,
                value: other.to_string(),
            })
        }
    };
    BigInt::from_str(&text).map_err(|_| FieldError::NotInteger { field, value: text })
}

fn to_positive_u64(field: &'static str, value: &Value) -> Result<u64, FieldError> {
    let parsed = to_bigint(field, value)?;
    if !parsed.is_positive() {
        return Err(FieldError::NotPositive(field));
    }
    parsed.to_u64().ok_or(FieldError::OutOfRange(field))
}

fn to_bool(field: &'static str, value: &Value) -> Result<bool, FieldError> {
    value.as_bool().ok_or(FieldError::NotBoolean(field))
}

fn to_array<'a>(field: &'static str, value: &'a Value) -> Result<&'a Vec<Value>, FieldError> {
    value.as_array().ok_or(FieldError::NotArray(field))
}

fn to_positive_list(field: &'static str, value: &Value) -> Result<Vec<u64>, FieldError> {
    to_array(field, value)?
        .iter()
        .map(|item| to_positive_u64(field, item))
        .collect()
}

fn big(map: &Map<String, Value>, field: &'static str) -> Result<BigInt, FieldError> {
    to_bigint(field, require(map, field)?)
}

fn positive(map: &Map<String, Value>, field: &'static str) -> Result<u64, FieldError> {
    to_positive_u64(field, require(map, field)?)
}

fn boolean(map: &Map<String, Value>, field: &'static str) -> Result<bool, FieldError> {
    to_bool(field, require(map, field)?)
}

fn positive_list(map: &Map<String, Value>, field: &'static str) -> Result<Vec<u64>, FieldError> {
    to_positive_list(field, require(map, field)?)
}

fn size(map: &Map<String, Value>, field: &'static str) -> Result<usize, FieldError> {
    usize::try_from(positive(map, field)?).map_err(|_| FieldError::OutOfRange(field))
}

fn resolve_value<T: Copy>(
    table: &[(T, &[&str])],
    problem: Problem,
    raw: &Value,
    field: &'static str,
) -> Result<T, FieldError> {
    let text = raw.as_str().ok_or(FieldError::NotString(field))?;
    table
        .iter()
        .find(|(_, spellings)| spellings.contains(&text))
        .map(|(value, _)| *value)
        .ok_or_else(|| FieldError::UnknownComputeType {
            problem,
            value: text.to_string(),
        })
}

/// Resolves the Collatz metric named in task parameters.
pub fn collatz_metric(parameters: &Map<String, Value>) -> Result<CollatzMetric, FieldError> {
    let raw = require(parameters, "metric")?;
    resolve_value(COLLATZ_METRICS, Problem::Collatz, raw, "metric")
}

/// Resolves the Sidon compute type named in task parameters.
pub fn sidon_compute_type(parameters: &Map<String, Value>) -> Result<SidonCompute, FieldError> {
    let raw = require(parameters, "compute_type")?;
    resolve_value(SIDON_COMPUTE_TYPES, Problem::Sidon, raw, "compute_type")
}

/// One submitted `(n, x, y, z)` quadruple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quadruple {
    /// Left-hand denominator.
    pub n: BigInt,
    /// First unit-fraction denominator.
    pub x: BigInt,
    /// Second unit-fraction denominator.
    pub y: BigInt,
    /// Third unit-fraction denominator.
    pub z: BigInt,
}

/// A fully parsed `(parameters, answer)` pair for one problem and task type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// Erdős–Straus COMPUTE: a decomposition of `4/n`.
    Decomposition(Quadruple),
    /// Erdős–Straus VERIFY: decompositions covering every prime in a range.
    DecompositionRange {
        /// Inclusive start.
        start: u64,
        /// Inclusive end.
        end: u64,
        /// Submitted decompositions.
        solutions: Vec<Quadruple>,
    },
    /// Erdős–Straus SEARCH: a counterexample claim over a range.
    CounterexampleSearch {
        /// Inclusive start.
        start: u64,
        /// Inclusive end.
        end: u64,
        /// Whether the agent claims a counterexample.
        found: bool,
        /// Claimed counterexample, if any.
        candidate: Option<BigInt>,
    },
    /// Collatz COMPUTE, stopping time.
    StoppingTime {
        /// Starting value.
        n: u64,
        /// Claimed step count.
        claimed: BigInt,
    },
    /// Collatz COMPUTE, peak value.
    MaxValue {
        /// Starting value.
        n: u64,
        /// Claimed peak.
        claimed: BigInt,
    },
    /// Collatz COMPUTE, full trajectory.
    Sequence {
        /// Starting value.
        n: u64,
        /// Claimed trajectory.
        claimed: Vec<BigInt>,
    },
    /// Collatz VERIFY: every start in the range reaches 1.
    ReachesOne {
        /// Inclusive start.
        start: u64,
        /// Inclusive end.
        end: u64,
        /// Claimed outcome.
        claimed: bool,
    },
    /// Sidon COMPUTE `verify_set` or Sidon VERIFY.
    SidonMembership {
        /// Set under test.
        set: Vec<u64>,
        /// Claimed outcome.
        claimed: bool,
    },
    /// Sidon COMPUTE `find_all`.
    SidonAllSets {
        /// Largest allowed element.
        max_element: u64,
        /// Required set size.
        set_size: usize,
        /// Claimed list of sets.
        sets: Vec<Vec<u64>>,
    },
    /// Sidon COMPUTE `count`.
    SidonCount {
        /// Largest allowed element.
        max_element: u64,
        /// Required set size.
        set_size: usize,
        /// Claimed count.
        claimed: BigInt,
    },
    /// Sidon COMPUTE `find_maximum`.
    SidonMaximum {
        /// Largest allowed element.
        max_element: u64,
        /// Claimed maximum set.
        set: Vec<u64>,
    },
}

impl Claim {
    /// Parses `parameters` and `answer` for the given problem and task type.
    pub fn parse(
        problem: Problem,
        task_type: TaskType,
        parameters: &Map<String, Value>,
        answer: &Map<String, Value>,
    ) -> Result<Self, FieldError> {
        match (problem, task_type) {
            (Problem::ErdosStraus, TaskType::Compute) => Ok(Claim::Decomposition(Quadruple {
                n: big(parameters, "n")?,
                x: big(answer, "x")?,
                y: big(answer, "y")?,
                z: big(answer, "z")?,
            })),
            (Problem::ErdosStraus, TaskType::Verify) => {
                let solutions = to_array("solutions", require(answer, "solutions")?)?
                    .iter()
                    .map(|item| {
                        let entry = item.as_object().ok_or(FieldError::NotObject("solutions"))?;
                        Ok(Quadruple {
                            n: big(entry, "n")?,
                            x: big(entry, "x")?,
                            y: big(entry, "y")?,
                            z: big(entry, "z")?,
                        })
                    })
                    .collect::<Result<Vec<_>, FieldError>>()?;
                Ok(Claim::DecompositionRange {
                    start: positive(parameters, "range_start")?,
                    end: positive(parameters, "range_end")?,
                    solutions,
                })
            }
            (Problem::ErdosStraus, TaskType::Search) => Ok(Claim::CounterexampleSearch {
                start: positive(parameters, "range_start")?,
                end: positive(parameters, "range_end")?,
                found: boolean(answer, "found_counterexample")?,
                candidate: lookup(answer, "counterexample_n")?
                    .map(|v| to_bigint("counterexample_n", v))
                    .transpose()?,
            }),
            (Problem::Collatz, TaskType::Compute) => {
                let n = positive(parameters, "n")?;
                match collatz_metric(parameters)? {
                    CollatzMetric::StoppingTime => Ok(Claim::StoppingTime {
                        n,
                        claimed: big(answer, "stopping_time")?,
                    }),
                    CollatzMetric::MaxValue => Ok(Claim::MaxValue {
                        n,
                        claimed: big(answer, "max_value")?,
                    }),
                    CollatzMetric::Sequence => Ok(Claim::Sequence {
                        n,
                        claimed: to_array("sequence", require(answer, "sequence")?)?
                            .iter()
                            .map(|v| to_bigint("sequence", v))
                            .collect::<Result<_, _>>()?,
                    }),
                }
            }
            (Problem::Collatz, TaskType::Verify) => Ok(Claim::ReachesOne {
                start: positive(parameters, "range_start")?,
                end: positive(parameters, "range_end")?,
                claimed: boolean(answer, "all_reach_1")?,
            }),
            (Problem::Sidon, TaskType::Compute) => match sidon_compute_type(parameters)? {
                SidonCompute::VerifySet => Ok(Claim::SidonMembership {
                    set: positive_list(parameters, "set")?,
                    claimed: boolean(answer, "is_sidon")?,
                }),
                SidonCompute::FindAll => Ok(Claim::SidonAllSets {
                    max_element: positive(parameters, "max_element")?,
                    set_size: size(parameters, "set_size")?,
                    sets: to_array("sets", require(answer, "sets")?)?
                        .iter()
                        .map(|set| to_positive_list("sets", set))
                        .collect::<Result<_, _>>()?,
                }),
                SidonCompute::Count => Ok(Claim::SidonCount {
                    max_element: positive(parameters, "max_element")?,
                    set_size: size(parameters, "set_size")?,
                    claimed: big(answer, "count")?,
                }),
                SidonCompute::FindMaximum => Ok(Claim::SidonMaximum {
                    max_element: positive(parameters, "max_element")?,
                    set: positive_list(answer, "set")?,
                }),
            },
            (Problem::Sidon, TaskType::Verify) => Ok(Claim::SidonMembership {
                set: positive_list(parameters, "set")?,
                claimed: boolean(answer, "is_sidon")?,
            }),
            (problem, task_type) => Err(FieldError::Unsupported { problem, task_type }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_slugs_round_trip() {
        for problem in Problem::ALL {
            assert_eq!(problem.slug().parse::<Problem>().unwrap(), problem);
        }
        assert_eq!(
            "riemann".parse::<Problem>(),
            Err(FieldError::UnknownProblem("riemann".into()))
        );
        assert_eq!("verify".parse::<TaskType>().unwrap(), TaskType::Verify);
    }

    #[test]
    fn test_aliases_resolve_to_same_claim() {
        let params = obj(json!({ "compute_type": "verify_set", "set": [1, 2, 4] }));
        let snake = Claim::parse(
            Problem::Sidon,
            TaskType::Compute,
            &params,
            &obj(json!({ "is_sidon": true })),
        );
        let camel = Claim::parse(
            Problem::Sidon,
            TaskType::Compute,
            &params,
            &obj(json!({ "isSidon": true })),
        );
        assert_eq!(snake, camel);
    }

    #[test]
    fn test_conflicting_aliases_rejected() {
        let answer = obj(json!({ "is_sidon": true, "isSidon": false }));
        assert_eq!(lookup(&answer, "is_sidon"), Err(FieldError::Conflict("is_sidon")));
        let agreeing = obj(json!({ "is_sidon": true, "isSidon": true }));
        assert_eq!(lookup(&agreeing, "is_sidon").unwrap(), Some(&json!(true)));
    }

    #[test]
    fn test_compute_type_historical_keys() {
        for key in ["compute_type", "computeType", "subtype", "task"] {
            let mut params = Map::new();
            params.insert(key.to_string(), json!("count"));
            assert_eq!(sidon_compute_type(&params), Ok(SidonCompute::Count));
        }
        let unknown = obj(json!({ "compute_type": "guess" }));
        assert!(matches!(
            sidon_compute_type(&unknown),
            Err(FieldError::UnknownComputeType { .. })
        ));
    }

    #[test]
    fn test_integers_never_truncated() {
        let params = obj(json!({ "n": "123456789012345678901234567890" }));
        let answer = obj(json!({ "x": 1, "y": 2, "z": "3" }));
        let claim = Claim::parse(Problem::ErdosStraus, TaskType::Compute, &params, &answer).unwrap();
        match claim {
            Claim::Decomposition(q) => {
                assert_eq!(q.n.to_string(), "123456789012345678901234567890");
            }
            other => panic!("unexpected claim {other:?}"),
        }
    }

    #[test]
    fn test_malformed_numbers() {
        let params = obj(json!({ "n": "12abc", "metric": "stopping_time" }));
        let answer = obj(json!({ "stoppingTime": 3 }));
        let err = Claim::parse(Problem::Collatz, TaskType::Compute, &params, &answer).unwrap_err();
        assert!(matches!(err, FieldError::NotInteger { field: "n", .. }));

        let params = obj(json!({ "n": -4, "metric": "stopping_time" }));
        let err = Claim::parse(Problem::Collatz, TaskType::Compute, &params, &answer).unwrap_err();
        assert_eq!(err, FieldError::NotPositive("n"));

        let params = obj(json!({ "n": 1.5, "metric": "stopping_time" }));
        assert!(Claim::parse(Problem::Collatz, TaskType::Compute, &params, &answer).is_err());
    }

    #[test]
    fn test_missing_and_unsupported() {
        let empty = Map::new();
        assert_eq!(
            Claim::parse(Problem::Collatz, TaskType::Verify, &empty, &empty),
            Err(FieldError::Missing("range_start"))
        );
        assert_eq!(
            Claim::parse(Problem::Sidon, TaskType::Search, &empty, &empty),
            Err(FieldError::Unsupported {
                problem: Problem::Sidon,
                task_type: TaskType::Search
            })
        );
    }
}
