use conjecture_engine::{verify, EngineConfig, VerificationInput, VerificationResult, Verifier};
use proptest::prelude::*;
use serde_json::{json, Value};

fn submit(value: Value) -> VerificationResult {
    let input: VerificationInput = serde_json::from_value(value).expect("valid submission");
    verify(&input)
}

#[test]
fn test_erdos_straus_compute_accepts_exact_identity() {
    let result = submit(json!({
        "problem": "erdos-straus",
        "taskType": "COMPUTE",
        "parameters": { "n": 5 },
        "answer": { "x": 2, "y": 4, "z": 20 }
    }));
    assert!(result.verified, "{}", result.message);
    assert!(result.message.contains("4/5 = 1/2 + 1/4 + 1/20"));
}

#[test]
fn test_erdos_straus_accepts_values_beyond_u64() {
    // n = 2^70: 4/n = 2/n + 1/n + 1/n with x = 2^69 and y = z = n.
    let n = "1180591620717411303424";
    let x = "590295810358705651712";
    let yz = n;
    let result = submit(json!({
        "problemSlug": "erdos-straus",
        "taskType": "COMPUTE",
        "parameters": { "n": n },
        "answer": { "x": x, "y": yz, "z": yz }
    }));
    assert!(result.verified, "{}", result.message);
}

#[test]
fn test_snake_case_envelope_is_accepted() {
    let result = submit(json!({
        "problem_slug": "collatz",
        "task_type": "COMPUTE",
        "parameters": { "n": 27, "metric": "max_value" },
        "answer": { "max_value": 9232 }
    }));
    assert!(result.verified, "{}", result.message);
}

#[test]
fn test_collatz_stopping_time_of_one_is_zero() {
    let result = submit(json!({
        "problem": "collatz",
        "taskType": "COMPUTE",
        "parameters": { "n": 1, "metric": "stopping_time" },
        "answer": { "stoppingTime": 0 }
    }));
    assert!(result.verified, "{}", result.message);
}

#[test]
fn test_collatz_reversed_range_fails_validation() {
    let result = submit(json!({
        "problem": "collatz",
        "taskType": "VERIFY",
        "parameters": { "range_start": 100, "range_end": 1 },
        "answer": { "allReach1": true }
    }));
    assert!(!result.verified);
    assert!(result.computed.is_none());
    assert!(result.message.contains("must not exceed"), "{}", result.message);
}

#[test]
fn test_collatz_step_ceiling_is_inconclusive() {
    let config = EngineConfig {
        collatz_step_limit: 50,
        ..EngineConfig::default()
    };
    let input: VerificationInput = serde_json::from_value(json!({
        "problem": "collatz",
        "taskType": "COMPUTE",
        "parameters": { "n": 27, "metric": "stopping_time" },
        "answer": { "stoppingTime": 111 }
    }))
    .unwrap();
    let result = Verifier::new(config).verify(&input);
    assert!(!result.verified);
    assert!(result.message.contains("within 50 steps"), "{}", result.message);
}

#[test]
fn test_sidon_membership_alias_equivalence() {
    let base = |answer: Value| {
        submit(json!({
            "problem": "sidon",
            "taskType": "VERIFY",
            "parameters": { "set": [1, 2, 4, 8, 13] },
            "answer": answer
        }))
    };
    let snake = base(json!({ "is_sidon": true }));
    let camel = base(json!({ "isSidon": true }));
    assert!(snake.verified);
    assert_eq!(snake, camel);
}

#[test]
fn test_sidon_collision_is_reported() {
    let result = submit(json!({
        "problem": "sidon",
        "taskType": "COMPUTE",
        "parameters": { "compute_type": "verify_set", "set": [1, 2, 3, 4] },
        "answer": { "isSidon": true }
    }));
    assert!(!result.verified);
    assert!(result.message.contains("sum 4"), "{}", result.message);
}

#[test]
fn test_unknown_problem_and_compute_type() {
    let unknown = submit(json!({
        "problem": "goldbach",
        "taskType": "COMPUTE",
        "parameters": {},
        "answer": {}
    }));
    assert!(!unknown.verified);
    assert!(unknown.message.contains("Unknown problem: goldbach"));

    let bad_type = submit(json!({
        "problem": "sidon",
        "taskType": "COMPUTE",
        "parameters": { "compute_type": "colour", "max_element": 5 },
        "answer": {}
    }));
    assert!(!bad_type.verified);
    assert!(bad_type.message.contains("Unknown compute type for sidon: colour"));
}

#[test]
fn test_task_type_is_checked_by_the_verifier() {
    let guess = submit(json!({
        "problem": "collatz",
        "taskType": "GUESS",
        "parameters": { "n": 27, "metric": "stopping_time" },
        "answer": { "stoppingTime": 111 }
    }));
    assert!(!guess.verified);
    assert_eq!(guess.message, "Unknown task type: GUESS");

    let lowercase = submit(json!({
        "problem": "sidon",
        "type": "verify",
        "parameters": { "set": [1, 2, 5, 11] },
        "answer": { "isSidon": true }
    }));
    assert!(lowercase.verified, "{}", lowercase.message);
}

#[test]
fn test_erdos_straus_range_starting_at_one() {
    let result = submit(json!({
        "problem": "erdos-straus",
        "taskType": "VERIFY",
        "parameters": { "range_start": 1, "range_end": 3 },
        "answer": { "solutions": [
            { "n": 2, "x": 1, "y": 2, "z": 2 },
            { "n": 3, "x": 1, "y": 4, "z": 12 }
        ] }
    }));
    assert!(result.verified, "{}", result.message);
}

#[test]
fn test_search_counterexample_goes_to_review() {
    let result = submit(json!({
        "problem": "erdos-straus",
        "taskType": "SEARCH",
        "parameters": { "range_start": 100, "range_end": 120 },
        "answer": { "foundCounterexample": true, "counterexampleN": 113 }
    }));
    assert!(!result.verified);
    assert!(result.message.contains("requires manual verification"));
}

#[test]
fn test_batch_matches_single_calls() {
    let inputs: Vec<VerificationInput> = serde_json::from_value(json!([
        {
            "problem": "collatz",
            "taskType": "VERIFY",
            "parameters": { "range_start": 1, "range_end": 500 },
            "answer": { "allReach1": true }
        },
        {
            "problem": "sidon",
            "taskType": "COMPUTE",
            "parameters": { "compute_type": "count", "max_element": 5, "set_size": 2 },
            "answer": { "count": 10 }
        },
        {
            "problem": "erdos-straus",
            "taskType": "VERIFY",
            "parameters": { "range_start": 2, "range_end": 5 },
            "answer": { "solutions": [
                { "n": 2, "x": 1, "y": 2, "z": 2 },
                { "n": 3, "x": 1, "y": 4, "z": 12 },
                { "n": 5, "x": 2, "y": 4, "z": 20 }
            ] }
        }
    ]))
    .unwrap();
    let verifier = Verifier::default();
    let batch = verifier.verify_batch(&inputs);
    let single: Vec<VerificationResult> = inputs.iter().map(|i| verifier.verify(i)).collect();
    assert_eq!(batch, single);
    assert!(batch.iter().all(|r| r.verified), "{batch:?}");
}

proptest! {
    #[test]
    fn prop_halving_family_verifies(half in 1u64..1_000_000) {
        // 4/2m = 1/m + 1/2m + 1/2m.
        let n = half * 2;
        let result = submit(json!({
            "problem": "erdos-straus",
            "taskType": "COMPUTE",
            "parameters": { "n": n },
            "answer": { "x": half, "y": n, "z": n }
        }));
        prop_assert!(result.verified, "{}", result.message);
    }

    #[test]
    fn prop_equal_denominators_never_verify(n in 2u64..1_000_000) {
        // 3/n can never equal 4/n.
        let result = submit(json!({
            "problem": "erdos-straus",
            "taskType": "COMPUTE",
            "parameters": { "n": n },
            "answer": { "x": n, "y": n, "z": n }
        }));
        prop_assert!(!result.verified);
    }

    #[test]
    fn prop_verification_is_idempotent(n in 1u64..2_000, claimed in 0u64..200) {
        let value = json!({
            "problem": "collatz",
            "taskType": "COMPUTE",
            "parameters": { "n": n, "metric": "stopping_time" },
            "answer": { "stoppingTime": claimed }
        });
        let first = submit(value.clone());
        let second = submit(value);
        prop_assert_eq!(first, second);
    }
}
