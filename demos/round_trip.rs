use conjecture_engine::collatz::CollatzEngine;
use conjecture_engine::primes::primes_in_range;
use conjecture_engine::sidon::{self, SearchLimits};
use conjecture_engine::{
    find_solution, EngineConfig, GeneratedTask, Problem, SeededRng, TaskGenerator, TaskType,
    VerificationInput, Verifier,
};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

fn param_u64(task: &GeneratedTask, key: &str) -> u64 {
    task.parameters
        .get(key)
        .and_then(Value::as_u64)
        .unwrap_or_else(|| panic!("task is missing {key}"))
}

fn solve(task: &GeneratedTask, config: &EngineConfig) -> Value {
    let collatz = CollatzEngine::from_config(config);
    let limits = SearchLimits::from_config(config);
    match (task.problem, task.task_type) {
        (Problem::ErdosStraus, TaskType::Compute) => {
            let d = find_solution(param_u64(task, "n")).expect("decomposition");
            json!({ "x": d.x.to_string(), "y": d.y.to_string(), "z": d.z.to_string() })
        }
        (Problem::ErdosStraus, TaskType::Verify) => {
            let start = param_u64(task, "range_start");
            let end = param_u64(task, "range_end");
            let solutions: Vec<Value> = primes_in_range(start, end)
                .into_iter()
                .map(|p| {
                    let d = find_solution(p).expect("decomposition");
                    json!({ "n": p, "x": d.x.to_string(), "y": d.y.to_string(), "z": d.z.to_string() })
                })
                .collect();
            json!({ "solutions": solutions })
        }
        (Problem::ErdosStraus, _) => json!({ "foundCounterexample": false }),
        (Problem::Collatz, TaskType::Compute) => {
            let n = param_u64(task, "n");
            match task.parameters["metric"].as_str() {
                Some("stopping_time") => {
                    json!({ "stoppingTime": collatz.stopping_time(n).expect("converges") })
                }
                Some("max_value") => {
                    json!({ "maxValue": collatz.max_value(n).expect("converges").to_string() })
                }
                _ => {
                    let sequence: Vec<String> = collatz
                        .sequence(n)
                        .expect("converges")
                        .iter()
                        .map(u128::to_string)
                        .collect();
                    json!({ "sequence": sequence })
                }
            }
        }
        (Problem::Collatz, _) => json!({ "allReach1": true }),
        (Problem::Sidon, _) => {
            let compute_type = task
                .parameters
                .get("compute_type")
                .and_then(Value::as_str)
                .unwrap_or("verify_set");
            match compute_type {
                "find_all" => json!({
                    "sets": sidon::enumerate(
                        param_u64(task, "max_element"),
                        param_u64(task, "set_size") as usize,
                        &limits,
                    )
                    .expect("within limits")
                }),
                "count" => json!({
                    "count": sidon::count(
                        param_u64(task, "max_element"),
                        param_u64(task, "set_size") as usize,
                        &limits,
                    )
                    .expect("within limits")
                }),
                "find_maximum" => json!({
                    "set": sidon::find_maximum(param_u64(task, "max_element"), &limits)
                        .expect("within limits")
                }),
                _ => {
                    let set: Vec<u64> = task.parameters["set"]
                        .as_array()
                        .map(|items| items.iter().filter_map(Value::as_u64).collect())
                        .unwrap_or_default();
                    json!({ "isSidon": sidon::pairwise_sums(&set).is_ok() })
                }
            }
        }
    }
}

fn main() {
    let config = EngineConfig::default();
    let mut generator = TaskGenerator::new(SeededRng::new("round-trip", 2024), config.clone());
    let tasks = generator.generate_balanced(12, &HashSet::new());
    let verifier = Verifier::new(config.clone());
    let mut failures = 0;
    for task in &tasks {
        let answer = match solve(task, &config) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let input = VerificationInput {
            problem_slug: task.problem.slug().to_string(),
            task_type: task.task_type.to_string(),
            parameters: task.parameters.clone(),
            answer,
        };
        let result = verifier.verify(&input);
        let mark = if result.verified { "ok" } else { "FAIL" };
        println!(
            "[{mark}] {:<8} {:<12} {} -> {}",
            task.difficulty, task.problem, task.title, result.message
        );
        if !result.verified {
            failures += 1;
        }
    }
    if failures > 0 {
        eprintln!("{failures} generated task(s) failed to verify.");
        std::process::exit(1);
    }
    println!("All {} generated tasks verified.", tasks.len());
}
