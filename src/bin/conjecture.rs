//! Command-line front end for the conjecture engine.
//!
//! Verification commands read JSON submissions from a file or stdin and
//! print JSON results on stdout.  Diagnostics go to stderr through
//! `tracing`; set `RUST_LOG` to adjust verbosity.

use conjecture_engine::primes::is_prime_big;
use conjecture_engine::sidon::{self, SearchLimits};
use conjecture_engine::{
    collatz::CollatzEngine, egyptian, next_prime, prev_prime, Difficulty, EngineConfig,
    GeneratedTask, Problem, SeededRng, TaskGenerator, VerificationInput, Verifier,
};
use num_bigint::BigUint;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::{
    env, fs,
    io::{self, Read},
};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "conjecture_engine=info";

fn fatal(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn print_usage() {
    println!("Usage: conjecture [--config <file.json>] <command> ...");
    println!("  verify [<file>|-]              verify one submission");
    println!("  verify-batch [<file>|-]        verify a JSON array of submissions");
    println!("  generate [--count N] [--problem <slug>] [--difficulty <tier>]");
    println!("           [--seed N] [--label <name>] [--balanced] [--existing <tasks.json>]");
    println!("  prime <n>                      primality of n (any size up to 3.3e24)");
    println!("  next-prime <n> | prev-prime <n>");
    println!("  solve <n>                      search 4/n = 1/x + 1/y + 1/z");
    println!("  collatz <n> [--sequence]       stopping time and peak of n");
    println!("  sidon-max <max_element>        a largest Sidon set in [1, max_element]");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let mut args: Vec<String> = env::args().skip(1).collect();
    let config = take_config(&mut args);
    let mut args = args.into_iter();
    let command = args.next();
    let tail: Vec<String> = args.collect();
    match command.as_deref() {
        Some("verify") => cmd_verify(&config, tail),
        Some("verify-batch") => cmd_verify_batch(&config, tail),
        Some("generate") => cmd_generate(&config, tail),
        Some("prime") => cmd_prime(tail),
        Some("next-prime") => cmd_neighbour_prime(tail, true),
        Some("prev-prime") => cmd_neighbour_prime(tail, false),
        Some("solve") => cmd_solve(&config, tail),
        Some("collatz") => cmd_collatz(&config, tail),
        Some("sidon-max") => cmd_sidon_max(&config, tail),
        Some("-h") | Some("--help") => print_usage(),
        _ => {
            print_usage();
            std::process::exit(1);
        }
    }
}

/// Removes `--config <path>` from `args` and loads the config it names,
/// falling back to defaults plus `CONJECTURE_*` overrides.
fn take_config(args: &mut Vec<String>) -> EngineConfig {
    let base = match args.iter().position(|a| a == "--config") {
        Some(index) => {
            if index + 1 >= args.len() {
                fatal("--config expects a path");
            }
            let path = args.remove(index + 1);
            args.remove(index);
            EngineConfig::from_json_path(&path)
                .unwrap_or_else(|err| fatal(&format!("failed to load {path}: {err}")))
        }
        None => EngineConfig::default(),
    };
    base.with_env_overrides()
        .unwrap_or_else(|err| fatal(&format!("invalid configuration: {err}")))
}

fn read_source(tail: &[String]) -> String {
    match tail.first().map(String::as_str) {
        None | Some("-") => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .unwrap_or_else(|err| fatal(&format!("failed to read stdin: {err}")));
            buffer
        }
        Some(path) => fs::read_to_string(path)
            .unwrap_or_else(|err| fatal(&format!("failed to read {path}: {err}"))),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => fatal(&format!("failed to encode output: {err}")),
    }
}

fn parse_arg<T: std::str::FromStr>(flag: &str, value: Option<String>) -> T {
    let value = value.unwrap_or_else(|| fatal(&format!("{flag} expects a value")));
    value
        .replace('_', "")
        .parse()
        .unwrap_or_else(|_| fatal(&format!("invalid {flag} value: {value}")))
}

fn cmd_verify(config: &EngineConfig, tail: Vec<String>) {
    let raw = read_source(&tail);
    let input: VerificationInput = serde_json::from_str(&raw)
        .unwrap_or_else(|err| fatal(&format!("invalid submission: {err}")));
    let result = Verifier::new(config.clone()).verify(&input);
    print_json(&result);
    if !result.verified {
        std::process::exit(2);
    }
}

fn cmd_verify_batch(config: &EngineConfig, tail: Vec<String>) {
    let raw = read_source(&tail);
    let inputs: Vec<VerificationInput> = serde_json::from_str(&raw)
        .unwrap_or_else(|err| fatal(&format!("invalid submission batch: {err}")));
    let results = Verifier::new(config.clone()).verify_batch(&inputs);
    let accepted = results.iter().filter(|r| r.verified).count();
    info!(total = results.len(), accepted, "batch verified");
    print_json(&results);
}

struct GenerateOptions {
    count: usize,
    problem: Option<Problem>,
    difficulty: Option<Difficulty>,
    balanced: bool,
    existing: HashSet<String>,
}

fn load_existing_keys(path: &str) -> HashSet<String> {
    let raw = fs::read_to_string(path)
        .unwrap_or_else(|err| fatal(&format!("failed to read {path}: {err}")));
    let tasks: Vec<GeneratedTask> = serde_json::from_str(&raw)
        .unwrap_or_else(|err| fatal(&format!("invalid task list in {path}: {err}")));
    tasks.iter().map(GeneratedTask::key).collect()
}

fn cmd_generate(config: &EngineConfig, tail: Vec<String>) {
    let mut options = GenerateOptions {
        count: 10,
        problem: None,
        difficulty: None,
        balanced: false,
        existing: HashSet::new(),
    };
    let mut seed: Option<u64> = None;
    let mut label = String::from("cli");
    let mut iter = tail.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--count" => options.count = parse_arg("--count", iter.next()),
            "--problem" => options.problem = Some(parse_arg("--problem", iter.next())),
            "--difficulty" => options.difficulty = Some(parse_arg("--difficulty", iter.next())),
            "--seed" => seed = Some(parse_arg("--seed", iter.next())),
            "--label" => {
                label = iter
                    .next()
                    .unwrap_or_else(|| fatal("--label expects a value"));
            }
            "--balanced" => options.balanced = true,
            "--existing" => {
                let path = iter
                    .next()
                    .unwrap_or_else(|| fatal("--existing expects a path"));
                options.existing = load_existing_keys(&path);
            }
            other => fatal(&format!("unknown argument: {other}")),
        }
    }
    if options.balanced && (options.problem.is_some() || options.difficulty.is_some()) {
        fatal("--balanced cannot be combined with --problem or --difficulty");
    }
    let tasks = match seed {
        Some(seed) => run_generate(
            TaskGenerator::new(SeededRng::new(&label, seed), config.clone()),
            &options,
        ),
        None => run_generate(
            TaskGenerator::new(rand::thread_rng(), config.clone()),
            &options,
        ),
    };
    if tasks.len() < options.count {
        eprintln!(
            "generated {} of {} requested tasks; the parameter space is nearly exhausted",
            tasks.len(),
            options.count
        );
    }
    print_json(&tasks);
}

fn run_generate<R: Rng>(
    mut generator: TaskGenerator<R>,
    options: &GenerateOptions,
) -> Vec<GeneratedTask> {
    if options.balanced {
        generator.generate_balanced(options.count, &options.existing)
    } else {
        generator.generate_tasks(
            options.count,
            &options.existing,
            options.problem,
            options.difficulty,
        )
    }
}

fn cmd_prime(tail: Vec<String>) {
    let raw = tail
        .first()
        .unwrap_or_else(|| fatal("Usage: conjecture prime <n>"));
    let n: BigUint = raw
        .replace('_', "")
        .parse()
        .unwrap_or_else(|_| fatal(&format!("not a non-negative integer: {raw}")));
    match is_prime_big(&n) {
        Ok(true) => println!("{n} is prime"),
        Ok(false) => println!("{n} is composite"),
        Err(err) => fatal(&err.to_string()),
    }
}

fn cmd_neighbour_prime(tail: Vec<String>, upward: bool) {
    let n: u64 = parse_arg("<n>", tail.into_iter().next());
    let found = if upward { next_prime(n) } else { prev_prime(n) };
    match found {
        Some(p) => println!("{p}"),
        None if upward => fatal(&format!("no prime at or above {n} fits in 64 bits")),
        None => fatal(&format!("no prime at or below {n}")),
    }
}

fn cmd_solve(config: &EngineConfig, tail: Vec<String>) {
    let n: u64 = parse_arg("<n>", tail.into_iter().next());
    match egyptian::find_solution_with_budget(n, config.egyptian_search_budget) {
        Some(found) => println!("{}", found.witness()),
        None => fatal(&format!(
            "no decomposition of 4/{n} found within a budget of {} candidates",
            config.egyptian_search_budget
        )),
    }
}

fn cmd_collatz(config: &EngineConfig, tail: Vec<String>) {
    let mut n: Option<u64> = None;
    let mut show_sequence = false;
    let mut iter = tail.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--sequence" => show_sequence = true,
            _ if n.is_none() => n = Some(parse_arg("<n>", Some(arg.clone()))),
            other => fatal(&format!("unknown argument: {other}")),
        }
    }
    let n = n.unwrap_or_else(|| fatal("Usage: conjecture collatz <n> [--sequence]"));
    let engine = CollatzEngine::from_config(config);
    let steps = engine
        .stopping_time(n)
        .unwrap_or_else(|err| fatal(&err.to_string()));
    let peak = engine
        .max_value(n)
        .unwrap_or_else(|err| fatal(&err.to_string()));
    println!("n = {n}: {steps} steps, peak {peak}");
    if show_sequence {
        let sequence = engine
            .sequence(n)
            .unwrap_or_else(|err| fatal(&err.to_string()));
        let rendered: Vec<String> = sequence.iter().map(u128::to_string).collect();
        println!("{}", rendered.join(" -> "));
    }
}

fn cmd_sidon_max(config: &EngineConfig, tail: Vec<String>) {
    let max_element: u64 = parse_arg("<max_element>", tail.into_iter().next());
    let limits = SearchLimits::from_config(config);
    let best = sidon::find_maximum(max_element, &limits)
        .unwrap_or_else(|err| fatal(&err.to_string()));
    println!("size {}: {:?}", best.len(), best);
}
