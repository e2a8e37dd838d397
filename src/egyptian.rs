//! Erdős–Straus decompositions `4/n = 1/x + 1/y + 1/z`.
//!
//! Verification never evaluates a fraction.  The identity is cleared of
//! denominators first,
//!
//! ```text
//! 4·x·y·z == n·(x·y + y·z + x·z)
//! ```
//!
//! and checked with unbounded integers, so answers of any size are judged
//! exactly.  The constructive search works over `u128` with checked
//! arithmetic and treats overflow as the end of the search window.

use crate::verdict::{int_value, VerificationResult};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Signed;
use serde_json::json;
use std::fmt::Display;

/// Default budget of trial divisions and divisor tests for [`find_solution`].
pub const DEFAULT_SEARCH_BUDGET: u64 = 20_000_000;

/// A unit-fraction decomposition of `4/n` in canonical order `x <= y <= z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decomposition {
    /// Denominator of the left-hand side.
    pub n: u64,
    /// Smallest unit-fraction denominator.
    pub x: u128,
    /// Middle unit-fraction denominator.
    pub y: u128,
    /// Largest unit-fraction denominator.
    pub z: u128,
}

impl Decomposition {
    /// Renders `4/n = 1/x + 1/y + 1/z`.
    pub fn witness(&self) -> String {
        witness(self.n as u128, self.x, self.y, self.z)
    }

    /// Re-checks this decomposition with exact arithmetic.
    pub fn verify(&self) -> VerificationResult {
        verify(
            &BigInt::from(self.n),
            &BigInt::from(self.x),
            &BigInt::from(self.y),
            &BigInt::from(self.z),
        )
    }
}

fn witness<T: Display>(n: T, x: T, y: T, z: T) -> String {
    format!("4/{n} = 1/{x} + 1/{y} + 1/{z}")
}

/// Checks `4/n = 1/x + 1/y + 1/z` exactly.
///
/// Rejects non-positive values and `n < 2`.  On success the message and
/// the `computed.witness` field carry the rendered identity.
pub fn verify(n: &BigInt, x: &BigInt, y: &BigInt, z: &BigInt) -> VerificationResult {
    if [n, x, y, z].iter().any(|v| !v.is_positive()) {
        return VerificationResult::reject("n, x, y and z must all be positive integers");
    }
    if *n < BigInt::from(2) {
        return VerificationResult::reject("n must be at least 2");
    }
    let lhs = BigInt::from(4) * x * y * z;
    let rhs = n * (x * y + y * z + x * z);
    if lhs == rhs {
        let rendered = witness(n, x, y, z);
        VerificationResult::accept(format!("Valid decomposition: {rendered}"))
            .with_computed(json!({ "witness": rendered }))
    } else {
        VerificationResult::reject(format!(
            "4/{n} != 1/{x} + 1/{y} + 1/{z} (4xyz = {lhs}, n(xy+yz+xz) = {rhs})"
        ))
    }
}

/// Searches for a decomposition of `4/n` with [`DEFAULT_SEARCH_BUDGET`].
pub fn find_solution(n: u64) -> Option<Decomposition> {
    find_solution_with_budget(n, DEFAULT_SEARCH_BUDGET)
}

/// Searches `x` upward from `⌈n/4⌉` and, for each `x`, solves the residual
/// `1/y + 1/z = a/b` (in lowest terms) through the divisors of `b²`.
///
/// Writing `d = a·y − b` turns the residual into `d · (a·z − b) = b²`, so
/// every solution comes from a divisor `d <= b` of `b²` with `b + d` and
/// `b + b²/d` both divisible by `a`.  `b²` is never factored directly: its
/// primes are those of `n` and `x`, found by trial division.
///
/// Each trial divisor and each tested divisor of `b²` costs one unit of
/// `budget`.  `None` means the budget or the `u128` window was exhausted;
/// it is not evidence that no decomposition exists.
pub fn find_solution_with_budget(n: u64, budget: u64) -> Option<Decomposition> {
    if n < 2 {
        return None;
    }
    let n_wide = n as u128;
    let mut spent = 0u64;
    let n_factors = factorize(n_wide, &mut spent, budget)?;
    for x in n_wide.div_ceil(4)..=n_wide {
        if spent >= budget {
            return None;
        }
        let four_x = x.checked_mul(4)?;
        if four_x <= n_wide {
            continue;
        }
        let num = four_x - n_wide;
        let den = n_wide.checked_mul(x)?;
        let g = num.gcd(&den);
        let (a, b) = (num / g, den / g);

        let mut factors = n_factors.clone();
        merge_factors(&mut factors, &factorize(x, &mut spent, budget)?);
        remove_factors(&mut factors, g);
        let square = b.checked_mul(b)?;
        for d in square_divisors_up_to(&factors, b) {
            if spent >= budget {
                return None;
            }
            spent += 1;
            if (b + d) % a != 0 {
                continue;
            }
            let z_num = b.checked_add(square / d)?;
            if z_num % a == 0 {
                let mut sorted = [x, (b + d) / a, z_num / a];
                sorted.sort_unstable();
                let [x, y, z] = sorted;
                return Some(Decomposition { n, x, y, z });
            }
        }
    }
    None
}

/// Prime factorization by trial division; one unit of `budget` per trial.
fn factorize(mut m: u128, spent: &mut u64, budget: u64) -> Option<Vec<(u128, u32)>> {
    let mut factors = Vec::new();
    let mut p = 2u128;
    while p <= m / p {
        if *spent >= budget {
            return None;
        }
        *spent += 1;
        if m % p == 0 {
            let mut exponent = 0;
            while m % p == 0 {
                m /= p;
                exponent += 1;
            }
            factors.push((p, exponent));
        }
        p += if p == 2 { 1 } else { 2 };
    }
    if m > 1 {
        factors.push((m, 1));
    }
    Some(factors)
}

fn merge_factors(into: &mut Vec<(u128, u32)>, from: &[(u128, u32)]) {
    for &(p, e) in from {
        match into.iter_mut().find(|(q, _)| *q == p) {
            Some((_, exponent)) => *exponent += e,
            None => into.push((p, e)),
        }
    }
}

/// Divides `g` out of a factorization that it divides.
fn remove_factors(factors: &mut Vec<(u128, u32)>, mut g: u128) {
    for (p, exponent) in factors.iter_mut() {
        while *exponent > 0 && g % *p == 0 {
            g /= *p;
            *exponent -= 1;
        }
    }
    factors.retain(|&(_, e)| e > 0);
}

/// Divisors of `b²` not exceeding `cap`, largest first, where `factors`
/// is the factorization of `b`.
fn square_divisors_up_to(factors: &[(u128, u32)], cap: u128) -> Vec<u128> {
    let mut divisors = vec![1u128];
    for &(p, e) in factors {
        let mut next = Vec::with_capacity(divisors.len() * (2 * e as usize + 1));
        for &d in &divisors {
            let mut value = d;
            next.push(value);
            for _ in 0..2 * e {
                match value.checked_mul(p) {
                    Some(v) if v <= cap => {
                        value = v;
                        next.push(value);
                    }
                    _ => break,
                }
            }
        }
        divisors = next;
    }
    divisors.sort_unstable_by(|a, b| b.cmp(a));
    divisors
}

/// Outcome of sweeping [`find_solution`] over a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSweep {
    /// Decompositions found, in ascending `n`.
    pub solved: Vec<Decomposition>,
    /// Values of `n` whose search window was exhausted.
    pub unresolved: Vec<u64>,
}

/// Runs [`find_solution_with_budget`] for every `n` in `[start, end]`.
pub fn sweep_range(start: u64, end: u64, budget: u64) -> RangeSweep {
    let mut sweep = RangeSweep {
        solved: Vec::new(),
        unresolved: Vec::new(),
    };
    for n in start.max(2)..=end {
        match find_solution_with_budget(n, budget) {
            Some(found) => sweep.solved.push(found),
            None => sweep.unresolved.push(n),
        }
    }
    sweep
}

/// JSON witness block for a decomposition.
pub(crate) fn decomposition_value(d: &Decomposition) -> serde_json::Value {
    json!({
        "n": d.n,
        "x": int_value(d.x),
        "y": int_value(d.y),
        "z": int_value(d.z),
    })
}
