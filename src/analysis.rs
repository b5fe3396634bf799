/*! Closed-form schedulability screens and task-set metrics

These are the cheap, sufficient tests that are usually tried before
the exact [response-time analysis][crate::fixed_priority].
*/

use crate::task::Task;
use crate::time::Duration;

/// Total processor utilization `Σ C/T`.
pub fn utilization(tasks: &[Task]) -> f64 {
    tasks.iter().map(Task::utilization).sum()
}

/// The Liu & Layland utilization bound `n·(2^(1/n) − 1)` for `n` tasks
/// under rate-monotonic priorities.
pub fn liu_layland_bound(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    n * (2f64.powf(1.0 / n) - 1.0)
}

/// Sufficient test based on the Liu & Layland bound.
pub fn passes_liu_layland(tasks: &[Task]) -> bool {
    utilization(tasks) <= liu_layland_bound(tasks.len())
}

/// The hyperbolic bound of Bini et al.: `Π (U_i + 1)`.
pub fn hyperbolic_bound(tasks: &[Task]) -> f64 {
    tasks.iter().map(|t| t.utilization() + 1.0).product()
}

/// Sufficient test based on the hyperbolic bound, which dominates the
/// Liu & Layland test.
pub fn passes_hyperbolic(tasks: &[Task]) -> bool {
    hyperbolic_bound(tasks) <= 2.0
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// The hyperperiod (least common multiple of all periods).
///
/// Only defined for integral periods; returns `None` if some period is
/// not a positive integer or if the result does not fit into a `u64`.
pub fn hyperperiod(tasks: &[Task]) -> Option<Duration> {
    let mut lcm: u64 = 1;
    for task in tasks {
        if task.period <= 0.0 || task.period.fract() != 0.0 || task.period > u64::MAX as f64 {
            return None;
        }
        let period = task.period as u64;
        lcm = (lcm / gcd(lcm, period)).checked_mul(period)?;
    }
    Some(lcm as Duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::periodic;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn utilization_bounds() {
        let tasks = periodic(&[(1.0, 3.0), (1.0, 6.0), (1.0, 12.0)]);
        assert_approx_eq!(utilization(&tasks), 7.0 / 12.0);
        assert_approx_eq!(liu_layland_bound(1), 1.0);
        assert_approx_eq!(liu_layland_bound(2), 0.828, 0.001);
        assert_approx_eq!(liu_layland_bound(3), 0.780, 0.001);
        assert_eq!(liu_layland_bound(0), 0.0);
        assert!(passes_liu_layland(&tasks));
        assert!(passes_hyperbolic(&tasks));
    }

    #[test]
    fn hyperbolic_dominates_liu_layland() {
        // U = 0.8 + 0.05 > 0.828, yet (1.8)(1.05) = 1.89
        let tasks = periodic(&[(4.0, 5.0), (1.0, 20.0)]);
        assert!(!passes_liu_layland(&tasks));
        assert!(passes_hyperbolic(&tasks));
    }

    #[test]
    fn hyperperiod_of_integral_periods() {
        let tasks = periodic(&[(1.0, 4.0), (2.0, 6.0), (1.0, 10.0)]);
        assert_eq!(hyperperiod(&tasks), Some(60.0));
        assert_eq!(hyperperiod(&[]), Some(1.0));
    }

    #[test]
    fn hyperperiod_of_fractional_periods() {
        let tasks = periodic(&[(1.0, 4.0), (0.5, 2.5)]);
        assert_eq!(hyperperiod(&tasks), None);
    }
}
