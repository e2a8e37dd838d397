//! Sidon sets: sets whose pairwise sums `a + b` (with `a <= b`, including
//! `a = b`) are all distinct.
//!
//! Enumeration is an exhaustive backtracking search.  The partial set and
//! the sums it has produced live in a [`SearchState`]; extending the state
//! hands back an [`Extension`] guard that removes exactly the candidate and
//! the sums it added when dropped, so sibling branches never observe each
//! other's sums.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::verdict::{int_value, VerificationResult};
use serde_json::json;
use std::collections::{BTreeSet, HashSet};
use std::ops::{Deref, DerefMut};

/// All pairwise sums of `set` in ascending order, or the first repeated sum.
///
/// Sums are generated in `(i, j)` order with `i <= j` over the input order.
pub fn pairwise_sums(set: &[u64]) -> Result<Vec<u128>, u128> {
    let mut seen = BTreeSet::new();
    for (i, &a) in set.iter().enumerate() {
        for &b in &set[i..] {
            let sum = a as u128 + b as u128;
            if !seen.insert(sum) {
                return Err(sum);
            }
        }
    }
    Ok(seen.into_iter().collect())
}

/// Validates `set` and reports whether it is a Sidon set.
///
/// `Err` means the input is malformed (fewer than two elements, a zero
/// element or a duplicate).  `Ok(Ok(sums))` carries every pairwise sum in
/// ascending order; `Ok(Err(sum))` carries the first repeated sum.
pub fn classify(set: &[u64]) -> Result<Result<Vec<u128>, u128>, EngineError> {
    if set.len() < 2 {
        return Err(EngineError::InvalidInput(
            "Set must contain at least 2 elements".to_string(),
        ));
    }
    if set.iter().any(|&v| v == 0) {
        return Err(EngineError::InvalidInput(
            "All elements must be positive integers".to_string(),
        ));
    }
    let distinct: HashSet<u64> = set.iter().copied().collect();
    if distinct.len() != set.len() {
        return Err(EngineError::InvalidInput(
            "Set contains duplicate elements".to_string(),
        ));
    }
    Ok(pairwise_sums(set))
}

/// Checks whether `set` is a Sidon set.
///
/// On success `computed.sums` lists every pairwise sum in ascending order;
/// on a collision the message names the repeated sum.
pub fn verify_set(set: &[u64]) -> VerificationResult {
    match classify(set) {
        Ok(Ok(sums)) => {
            let sums: Vec<_> = sums.into_iter().map(int_value).collect();
            VerificationResult::accept(format!(
                "Valid Sidon set: all {} pairwise sums are distinct",
                sums.len()
            ))
            .with_computed(json!({ "sums": sums }))
        }
        Ok(Err(sum)) => VerificationResult::reject(format!(
            "Not a Sidon set: sum {sum} appears more than once"
        ))
        .with_computed(json!({ "collision": int_value(sum) })),
        Err(err) => VerificationResult::reject(err.to_string()),
    }
}

/// Partial Sidon set plus the sums it has already produced.
#[derive(Debug, Default)]
pub struct SearchState {
    set: Vec<u64>,
    sums: HashSet<u64>,
}

impl SearchState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements chosen so far, in insertion order.
    pub fn elements(&self) -> &[u64] {
        &self.set
    }

    /// Number of sums currently recorded.
    pub fn sum_count(&self) -> usize {
        self.sums.len()
    }

    /// Adds `candidate` if none of its new sums collide.
    ///
    /// The returned guard derefs to the extended state and undoes the
    /// extension when dropped.
    pub fn try_extend(&mut self, candidate: u64) -> Option<Extension<'_>> {
        let mut added = Vec::with_capacity(self.set.len() + 1);
        for &existing in &self.set {
            added.push(existing + candidate);
        }
        added.push(candidate * 2);
        if added.iter().any(|s| self.sums.contains(s)) {
            return None;
        }
        self.sums.extend(added.iter().copied());
        self.set.push(candidate);
        Some(Extension { state: self, added })
    }
}

/// Scoped extension of a [`SearchState`].
#[derive(Debug)]
pub struct Extension<'a> {
    state: &'a mut SearchState,
    added: Vec<u64>,
}

impl Deref for Extension<'_> {
    type Target = SearchState;

    fn deref(&self) -> &SearchState {
        &*self.state
    }
}

impl DerefMut for Extension<'_> {
    fn deref_mut(&mut self) -> &mut SearchState {
        &mut *self.state
    }
}

impl Drop for Extension<'_> {
    fn drop(&mut self) {
        self.state.set.pop();
        for sum in &self.added {
            self.state.sums.remove(sum);
        }
    }
}

/// Bounds enumeration requests so exhaustive search stays tractable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Largest accepted `max_element`.
    pub max_element: u64,
    /// Largest accepted `set_size`.
    pub max_set_size: usize,
}

impl SearchLimits {
    /// Limits taken from the Sidon fields of `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_element: config.sidon_max_element,
            max_set_size: config.sidon_max_set_size,
        }
    }

    fn check(&self, max_element: u64, set_size: Option<usize>) -> Result<(), EngineError> {
        if max_element == 0 {
            return Err(EngineError::NonPositive { field: "max_element" });
        }
        if max_element > self.max_element {
            return Err(EngineError::SearchTooLarge(format!(
                "max_element {max_element} exceeds the limit of {}",
                self.max_element
            )));
        }
        if let Some(size) = set_size {
            if size == 0 {
                return Err(EngineError::NonPositive { field: "set_size" });
            }
            if size > self.max_set_size {
                return Err(EngineError::SearchTooLarge(format!(
                    "set_size {size} exceeds the limit of {}",
                    self.max_set_size
                )));
            }
        }
        Ok(())
    }
}

fn collect_sets(
    state: &mut SearchState,
    floor: u64,
    max_element: u64,
    set_size: usize,
    out: &mut Vec<Vec<u64>>,
) {
    if state.elements().len() == set_size {
        out.push(state.elements().to_vec());
        return;
    }
    for candidate in floor..=max_element {
        if let Some(mut extended) = state.try_extend(candidate) {
            collect_sets(&mut extended, candidate + 1, max_element, set_size, out);
        }
    }
}

/// Fills `[floor, last)` with interior elements until `state` holds `target`.
///
/// `widest[len]` is the largest Sidon set size inside any interval of `len`
/// consecutive integers, known for every `len < last`.  A branch stops as
/// soon as the interval still open cannot hold the elements it is missing.
fn fill_interior(
    state: &mut SearchState,
    floor: u64,
    last: u64,
    target: usize,
    widest: &[usize],
) -> Option<Vec<u64>> {
    let missing = target.saturating_sub(state.elements().len());
    if missing == 0 {
        let mut set = state.elements().to_vec();
        set.sort_unstable();
        return Some(set);
    }
    for candidate in floor..last {
        // [candidate, last] must hold the missing elements and `last` itself.
        if widest[(last - candidate + 1) as usize] < missing + 1 {
            break;
        }
        if let Some(mut extended) = state.try_extend(candidate) {
            if let Some(found) = fill_interior(&mut extended, candidate + 1, last, target, widest) {
                return Some(found);
            }
        }
    }
    None
}

/// A Sidon set of `target` elements spanning exactly `[1, last]`.
fn spanning_set(last: u64, target: usize, widest: &[usize]) -> Option<Vec<u64>> {
    let mut state = SearchState::new();
    let mut low = state.try_extend(1)?;
    let mut both = low.try_extend(last)?;
    fill_interior(&mut both, 2, last, target, widest)
}

/// Every Sidon set of exactly `set_size` elements drawn from `[1, max_element]`,
/// in lexicographic order.
pub fn enumerate(
    max_element: u64,
    set_size: usize,
    limits: &SearchLimits,
) -> Result<Vec<Vec<u64>>, EngineError> {
    limits.check(max_element, Some(set_size))?;
    let mut out = Vec::new();
    collect_sets(&mut SearchState::new(), 1, max_element, set_size, &mut out);
    Ok(out)
}

/// Number of Sidon sets [`enumerate`] produces.
pub fn count(max_element: u64, set_size: usize, limits: &SearchLimits) -> Result<usize, EngineError> {
    enumerate(max_element, set_size, limits).map(|sets| sets.len())
}

/// A largest Sidon set in `[1, max_element]`.
///
/// Grows the interval one value at a time.  The optimum for `[1, m]` is
/// either the optimum for `[1, m - 1]` or one element larger, and a larger
/// set can be translated to contain both `1` and `m`, so each step is a
/// single existence search bounded by the optima already found.
pub fn find_maximum(max_element: u64, limits: &SearchLimits) -> Result<Vec<u64>, EngineError> {
    limits.check(max_element, None)?;
    let mut widest: Vec<usize> = vec![0, 1];
    let mut best = vec![1];
    for last in 2..=max_element {
        let previous = widest[(last - 1) as usize];
        match spanning_set(last, previous + 1, &widest) {
            Some(set) => {
                widest.push(previous + 1);
                best = set;
            }
            None => widest.push(previous),
        }
    }
    Ok(best)
}

/// Checks a claimed list of all Sidon sets against [`enumerate`].
///
/// Order of sets and of elements within a set is irrelevant.
pub fn verify_all_sets(
    max_element: u64,
    set_size: usize,
    claimed: &[Vec<u64>],
    limits: &SearchLimits,
) -> VerificationResult {
    let expected = match enumerate(max_element, set_size, limits) {
        Ok(sets) => sets,
        Err(err) => return VerificationResult::reject(err.to_string()),
    };
    let normalized: BTreeSet<Vec<u64>> = claimed
        .iter()
        .map(|set| {
            let mut set = set.clone();
            set.sort_unstable();
            set
        })
        .collect();
    if normalized.len() != claimed.len() {
        return VerificationResult::reject("Submitted sets contain duplicates");
    }
    let expected_set: BTreeSet<Vec<u64>> = expected.iter().cloned().collect();
    if let Some(missing) = expected_set.difference(&normalized).next() {
        return VerificationResult::reject(format!(
            "Missing Sidon set {missing:?} (expected {} sets, got {})",
            expected.len(),
            claimed.len()
        ))
        .with_computed(json!({ "count": expected.len() }));
    }
    if let Some(extra) = normalized.difference(&expected_set).next() {
        return VerificationResult::reject(format!(
            "{extra:?} is not a Sidon set of size {set_size} within [1, {max_element}]"
        ))
        .with_computed(json!({ "count": expected.len() }));
    }
    VerificationResult::accept(format!(
        "All {} Sidon sets of size {set_size} within [1, {max_element}] found",
        expected.len()
    ))
    .with_computed(json!({ "count": expected.len() }))
}

/// Checks a claimed count against [`count`].
pub fn verify_count(
    max_element: u64,
    set_size: usize,
    claimed: u64,
    limits: &SearchLimits,
) -> VerificationResult {
    match count(max_element, set_size, limits) {
        Ok(actual) if actual as u64 == claimed => VerificationResult::accept(format!(
            "There are {actual} Sidon sets of size {set_size} within [1, {max_element}]"
        ))
        .with_computed(json!({ "count": actual })),
        Ok(actual) => VerificationResult::reject(format!(
            "Incorrect count: claimed {claimed}, actual {actual}"
        ))
        .with_computed(json!({ "count": actual })),
        Err(err) => VerificationResult::reject(err.to_string()),
    }
}

/// Checks that `claimed` is a Sidon set within `[1, max_element]` of
/// maximum size.  Any maximum-size set is accepted, not only the one
/// [`find_maximum`] returns.
pub fn verify_maximum(max_element: u64, claimed: &[u64], limits: &SearchLimits) -> VerificationResult {
    let best = match find_maximum(max_element, limits) {
        Ok(best) => best,
        Err(err) => return VerificationResult::reject(err.to_string()),
    };
    let computed = json!({ "maximumSize": best.len(), "example": best });
    if let Some(&outside) = claimed.iter().find(|&&v| v > max_element) {
        return VerificationResult::reject(format!(
            "Element {outside} exceeds max_element {max_element}"
        ))
        .with_computed(computed);
    }
    let check = verify_set(claimed);
    if !check.verified {
        return VerificationResult::reject(check.message).with_computed(computed);
    }
    if claimed.len() != best.len() {
        return VerificationResult::reject(format!(
            "Set has {} elements but the maximum within [1, {max_element}] is {}",
            claimed.len(),
            best.len()
        ))
        .with_computed(computed);
    }
    VerificationResult::accept(format!(
        "Maximum Sidon set within [1, {max_element}] has {} elements",
        best.len()
    ))
    .with_computed(computed)
}
