use conjecture_engine::{EngineConfig, GeneratedTask, SeededRng, TaskGenerator};
use std::collections::HashSet;

fn batch(label: &str, seed: u64, existing: &HashSet<String>) -> Vec<GeneratedTask> {
    let mut generator = TaskGenerator::new(SeededRng::new(label, seed), EngineConfig::default());
    generator.generate_tasks(8, existing, None, None)
}

fn main() {
    let first = batch("nightly", 7, &HashSet::new());
    let replay = batch("nightly", 7, &HashSet::new());
    let same = first
        .iter()
        .zip(&replay)
        .all(|(a, b)| a.fingerprint() == b.fingerprint());
    for task in &first {
        println!("{}  {}", &task.fingerprint()[..16], task.title);
    }
    if !same || first.len() != replay.len() {
        eprintln!("Replaying the same label and seed produced a different batch.");
        std::process::exit(1);
    }

    let known: HashSet<String> = first.iter().map(GeneratedTask::key).collect();
    let follow_up = batch("nightly", 7, &known);
    if follow_up.iter().any(|task| known.contains(&task.key())) {
        eprintln!("Follow-up batch repeated a known task.");
        std::process::exit(1);
    }
    println!(
        "Replay matched; follow-up batch added {} new tasks.",
        follow_up.len()
    );
}
