use crate::time::Duration;

use thiserror::Error;

/// Error type returned when a fixed point search fails.
#[derive(Debug, Error, Copy, Clone, PartialEq, PartialOrd)]
pub enum SearchFailure {
    /// No fixed point found below the given divergence threshold.
    #[error("no fixed point less than {limit} found")]
    DivergenceLimitExceeded { limit: Duration },
}

pub type SearchResult = Result<Duration, SearchFailure>;

/// Conduct an iterative fixed point search `w ← rhs(w)`, starting from
/// `initial`, up to a given divergence threshold.
///
/// The right-hand side must be monotonically non-decreasing and satisfy
/// `rhs(initial) >= initial`; the iteration then approaches the least
/// fixed point from below, and the search stops as soon as an iterate
/// exceeds `divergence_limit`.
pub fn search<RHS>(initial: Duration, divergence_limit: Duration, mut rhs: RHS) -> SearchResult
where
    RHS: FnMut(Duration) -> Duration,
{
    let mut assumed = initial;
    loop {
        let bound = rhs(assumed);
        if bound > divergence_limit {
            // if we get here, we failed to converge => no solution
            return Err(SearchFailure::DivergenceLimitExceeded {
                limit: divergence_limit,
            });
        }
        if bound <= assumed {
            // we have converged
            return Ok(bound);
        }
        // continue iterating
        assumed = bound;
    }
}
