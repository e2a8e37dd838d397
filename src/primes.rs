//! Deterministic primality testing and prime sampling.
//!
//! Small candidates are settled by trial division.  Larger ones go through
//! Miller–Rabin with a witness set chosen from the published deterministic
//! bounds for the candidate's magnitude, so every answer is exact.  Above
//! the largest published bound the big-integer entry point refuses to answer
//! instead of falling back to a probabilistic test.

use crate::config::DEFAULT_TRIAL_DIVISION_LIMIT;
use crate::error::EngineError;
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use rand::Rng;

const W9: &[u64] = &[2, 3, 5, 7, 11, 13, 17, 19, 23];
const W12: &[u64] = &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
const W13: &[u64] = &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41];

/// `(exclusive upper bound, witnesses)` pairs, ordered by bound.
///
/// Every candidate below a bound is classified exactly by its witnesses
/// (Jaeschke 1993; Sorenson and Webster 2015).
const WITNESS_BRACKETS: &[(u128, &[u64])] = &[
    (1_373_653, &[2, 3]),
    (25_326_001, &[2, 3, 5]),
    (3_215_031_751, &[2, 3, 5, 7]),
    (2_152_302_898_747, &[2, 3, 5, 7, 11]),
    (3_474_749_660_383, &[2, 3, 5, 7, 11, 13]),
    (341_550_071_728_321, &[2, 3, 5, 7, 11, 13, 17]),
    (3_825_123_056_546_413_051, W9),
    (318_665_857_834_031_151_167_461, W12),
    (3_317_044_064_679_887_385_961_981, W13),
];

/// Largest value (exclusive) for which a deterministic witness set is known.
pub const DETERMINISTIC_BOUND: u128 = 3_317_044_064_679_887_385_961_981;

fn witnesses_for(n: u128) -> Option<&'static [u64]> {
    WITNESS_BRACKETS
        .iter()
        .find(|(bound, _)| n < *bound)
        .map(|(_, witnesses)| *witnesses)
}

/// Returns `true` when `n` is prime.
///
/// Uses trial division below one million and deterministic Miller–Rabin
/// above it.
///
/// ```
/// use conjecture_engine::primes::is_prime;
///
/// assert!(is_prime(1_000_003));
/// assert!(!is_prime(1_000_001));
/// ```
pub fn is_prime(n: u64) -> bool {
    is_prime_with_threshold(n, DEFAULT_TRIAL_DIVISION_LIMIT)
}

/// Same as [`is_prime`] with an explicit trial-division threshold.
pub fn is_prime_with_threshold(n: u64, trial_division_limit: u64) -> bool {
    if n < trial_division_limit {
        trial_division(n)
    } else {
        miller_rabin(n)
    }
}

/// Trial division by 2, 3 and every `6k ± 1` up to `√n`.
pub fn trial_division(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut d = 5u64;
    while d.saturating_mul(d) <= n {
        if n % d == 0 || n % (d + 2) == 0 {
            return false;
        }
        d += 6;
    }
    true
}

#[inline]
fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1u64 % m;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    result
}

/// Deterministic Miller–Rabin for any `u64`.
///
/// Every `u64` lies below the 12-witness bracket, so the answer is exact.
pub fn miller_rabin(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let witnesses = witnesses_for(n as u128).unwrap_or(W12);
    let d_full = n - 1;
    let s = d_full.trailing_zeros();
    let d = d_full >> s;
    'witness: for &a in witnesses {
        if a % n == 0 {
            continue;
        }
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Primality for arbitrary-size candidates.
///
/// Candidates that fit in a `u64` use [`is_prime`].  Candidates at or above
/// [`DETERMINISTIC_BOUND`] are refused with
/// [`EngineError::BeyondDeterministicBound`].
pub fn is_prime_big(n: &BigUint) -> Result<bool, EngineError> {
    if let Some(small) = n.to_u64() {
        return Ok(is_prime(small));
    }
    let witnesses = n
        .to_u128()
        .and_then(witnesses_for)
        .ok_or_else(|| EngineError::BeyondDeterministicBound(n.to_string()))?;
    let two = BigUint::from(2u32);
    if (n % &two).is_zero() {
        return Ok(false);
    }
    let one = BigUint::one();
    let n_minus_one = n - &one;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;
    'witness: for &a in witnesses {
        let a = BigUint::from(a);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return Ok(false);
    }
    Ok(true)
}

/// Smallest prime `>= n`, or `None` if it would exceed `u64::MAX`.
pub fn next_prime(n: u64) -> Option<u64> {
    if n <= 2 {
        return Some(2);
    }
    let mut candidate = if n % 2 == 0 { n.checked_add(1)? } else { n };
    loop {
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_add(2)?;
    }
}

/// Largest prime `<= n`, or `None` when `n < 2`.
pub fn prev_prime(n: u64) -> Option<u64> {
    if n < 2 {
        return None;
    }
    if n == 2 {
        return Some(2);
    }
    let mut candidate = if n % 2 == 0 { n - 1 } else { n };
    while candidate >= 3 {
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate -= 2;
    }
    Some(2)
}

/// All primes in the inclusive range `[start, end]`.
pub fn primes_in_range(start: u64, end: u64) -> Vec<u64> {
    primes_in_range_with_threshold(start, end, DEFAULT_TRIAL_DIVISION_LIMIT)
}

/// [`primes_in_range`] with an explicit trial-division threshold.
pub fn primes_in_range_with_threshold(start: u64, end: u64, trial_division_limit: u64) -> Vec<u64> {
    if start > end {
        return Vec::new();
    }
    (start..=end)
        .filter(|&n| is_prime_with_threshold(n, trial_division_limit))
        .collect()
}

/// Samples a prime from `[min, max]`.
///
/// Phase one tries `attempts` uniform draws.  Phase two picks a random
/// anchor and scans `anchor, anchor+1, anchor-1, anchor+2, …` until both
/// directions have passed an endpoint.  The scan visits every value of the
/// interval at most once, so it terminates after at most `max - min + 1`
/// tests and a failure is a proof that the interval has no prime.
pub fn random_prime_in_range<R: Rng + ?Sized>(
    rng: &mut R,
    min: u64,
    max: u64,
    attempts: u32,
) -> Result<u64, EngineError> {
    random_prime_in_range_with_threshold(rng, min, max, attempts, DEFAULT_TRIAL_DIVISION_LIMIT)
}

/// [`random_prime_in_range`] with an explicit trial-division threshold.
pub fn random_prime_in_range_with_threshold<R: Rng + ?Sized>(
    rng: &mut R,
    min: u64,
    max: u64,
    attempts: u32,
    trial_division_limit: u64,
) -> Result<u64, EngineError> {
    let prime = |n: u64| is_prime_with_threshold(n, trial_division_limit);
    if min > max {
        return Err(EngineError::InvalidInput(format!(
            "empty prime range [{min}, {max}]"
        )));
    }
    for _ in 0..attempts {
        let candidate = rng.gen_range(min..=max);
        if prime(candidate) {
            return Ok(candidate);
        }
    }
    let anchor = rng.gen_range(min..=max);
    scan_outward(anchor, min, max, prime).ok_or(EngineError::NoPrimeInRange { min, max })
}

fn scan_outward(anchor: u64, min: u64, max: u64, prime: impl Fn(u64) -> bool) -> Option<u64> {
    let mut offset = 0u64;
    loop {
        let up = anchor.checked_add(offset).filter(|&v| v <= max);
        let down = anchor.checked_sub(offset).filter(|&v| v >= min);
        if up.is_none() && down.is_none() {
            return None;
        }
        if let Some(v) = up.filter(|&v| prime(v)) {
            return Some(v);
        }
        if offset > 0 {
            if let Some(v) = down.filter(|&v| prime(v)) {
                return Some(v);
            }
        }
        offset += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_small_values() {
        let primes: Vec<u64> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn test_trial_division_agrees_with_miller_rabin_below_one_million() {
        for n in 0..1_000_000u64 {
            assert_eq!(trial_division(n), miller_rabin(n), "disagreement at {n}");
        }
    }

    #[test]
    fn test_strong_pseudoprimes_rejected() {
        // Strong pseudoprimes to bases 2 and 3, and to the first seven primes.
        assert!(!miller_rabin(1_373_653));
        assert!(!miller_rabin(25_326_001));
        assert!(!miller_rabin(3_215_031_751));
        assert!(!miller_rabin(341_550_071_728_321));
        assert!(!miller_rabin(3_825_123_056_546_413_051));
    }

    #[test]
    fn test_large_primes() {
        assert!(is_prime(1_000_000_007));
        assert!(is_prime(18_446_744_073_709_551_557));
        assert!(!is_prime(18_446_744_073_709_551_615));
    }

    #[test]
    fn test_big_primality() {
        // 2^64 + 13 is the smallest prime above 2^64.
        let above = (BigUint::one() << 64u32) + 13u32;
        assert_eq!(is_prime_big(&above), Ok(true));
        let even = (BigUint::one() << 64u32) + 14u32;
        assert_eq!(is_prime_big(&even), Ok(false));
        let composite = BigUint::from(18_446_744_073_709_551_557u64) * 3u32;
        assert_eq!(is_prime_big(&composite), Ok(false));
        let huge = BigUint::one() << 100u32;
        assert!(matches!(
            is_prime_big(&huge),
            Err(EngineError::BeyondDeterministicBound(_))
        ));
    }

    #[test]
    fn test_next_and_prev() {
        assert_eq!(next_prime(0), Some(2));
        assert_eq!(next_prime(14), Some(17));
        assert_eq!(next_prime(17), Some(17));
        assert_eq!(prev_prime(1), None);
        assert_eq!(prev_prime(2), Some(2));
        assert_eq!(prev_prime(16), Some(13));
        assert_eq!(next_prime(u64::MAX), None);
    }

    #[test]
    fn test_primes_in_range() {
        assert_eq!(primes_in_range(10, 30), vec![11, 13, 17, 19, 23, 29]);
        assert!(primes_in_range(30, 10).is_empty());
    }

    #[test]
    fn test_threshold_does_not_change_results() {
        let reference = primes_in_range(1, 5_000);
        for limit in [0, 2, 100, 1_000_000] {
            assert_eq!(primes_in_range_with_threshold(1, 5_000, limit), reference);
        }
        let mut trial = StdRng::seed_from_u64(11);
        let mut rabin = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            assert_eq!(
                random_prime_in_range_with_threshold(&mut trial, 1_000, 9_000, 4, u64::MAX),
                random_prime_in_range_with_threshold(&mut rabin, 1_000, 9_000, 4, 0)
            );
        }
    }

    #[test]
    fn test_random_prime_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let p = random_prime_in_range(&mut rng, 100, 200, 10).unwrap();
            assert!((100..=200).contains(&p));
            assert!(is_prime(p));
        }
    }

    #[test]
    fn test_random_prime_falls_back_to_scan() {
        let mut rng = StdRng::seed_from_u64(1);
        // 24..=28 contains no prime but 23 and 29 bracket it.
        let p = random_prime_in_range(&mut rng, 20, 28, 0).unwrap();
        assert_eq!(p, 23);
    }

    #[test]
    fn test_random_prime_empty_interval() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            random_prime_in_range(&mut rng, 24, 28, 5),
            Err(EngineError::NoPrimeInRange { min: 24, max: 28 })
        );
        assert!(random_prime_in_range(&mut rng, 10, 5, 5).is_err());
    }
}
