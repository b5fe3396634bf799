/*! Slack stealing for fixed-priority periodic task sets

The crate computes, for a rate-monotonic task set and a point in time,
how much processor time a task can give away without any job missing
its deadline (its *slack*), together with the instant at which that
slack is attained (the *ttma*). Several independently derived search
strategies are provided; running more than one of them cross-validates
the result.

The building blocks, leaves first:

- [fixed_priority]: response-time analysis and initial slack,
- [workload]: cumulative demand with per-strategy anchor caches,
- [slack]: the slack strategies,
- [validate]: the multi-method cross-validator,
- [ledger]: running slack per task and the system minimum,
- [simulation]: a discrete-event driver tying it all together.
*/

pub mod analysis;
pub mod config;
pub mod error;
pub mod fixed_point;
pub mod fixed_priority;
pub mod ledger;
pub mod simulation;
pub mod slack;
pub mod task;
pub mod time;
pub mod validate;
pub mod workload;

pub use config::Config;
pub use error::SlackError;
pub use slack::{Method, SlackResult};
pub use task::{Job, Task};

#[cfg(test)]
pub(crate) mod tests {
    use crate::fixed_priority;
    use crate::task::{by_priority, Task};
    use crate::time::{Duration, Service};

    /// Implicit-deadline tasks from `(C, T)` pairs, in priority order but
    /// not yet analyzed.
    pub(crate) fn periodic(params: &[(Service, Duration)]) -> Vec<Task> {
        by_priority(
            params
                .iter()
                .enumerate()
                .map(|(i, &(wcet, period))| Task::implicit(i + 1, wcet, period))
                .collect(),
        )
    }

    /// Like [periodic], with response times and initial slack in place.
    pub(crate) fn analyzed(params: &[(Service, Duration)]) -> Vec<Task> {
        let mut tasks = periodic(params);
        assert!(fixed_priority::analyze(&mut tasks, 1.0));
        tasks
    }

    /// Analyzed tasks from `(C, T, D)` triples.
    pub(crate) fn constrained(params: &[(Service, Duration, Duration)]) -> Vec<Task> {
        let mut tasks = by_priority(
            params
                .iter()
                .enumerate()
                .map(|(i, &(wcet, period, deadline))| Task::new(i + 1, wcet, period, deadline))
                .collect(),
        );
        assert!(fixed_priority::analyze(&mut tasks, 1.0));
        tasks
    }

    #[test]
    fn helpers_number_tasks_by_priority() {
        let tasks = analyzed(&[(2.0, 6.0), (1.0, 4.0)]);
        assert_eq!(tasks[0].period, 4.0);
        assert_eq!(tasks[1].id, 2);
        assert_eq!(tasks[1].response_time, Some(3.0));
        assert_eq!(tasks[1].initial_slack, Some(2.0));
    }
}
