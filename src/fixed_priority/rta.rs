use std::iter;

use itertools::Itertools;

use crate::fixed_point::{self, SearchResult};
use crate::task::Task;
use crate::time::{release_ceil, Instant, Service};

/// Try to find the worst-case response time of `tasks[i]`, assuming
/// all tasks in `tasks[..i]` have higher priority.
///
/// The search is abandoned as soon as the response time exceeds the
/// task's relative deadline, in which case a
/// [SearchFailure][fixed_point::SearchFailure] is returned.
pub fn response_time(tasks: &[Task], i: usize, speed: f64) -> SearchResult {
    let task = &tasks[i];
    let cost = task.wcet * speed;
    let interfering = &tasks[..i];

    fixed_point::search(cost, task.deadline, |w| {
        let interference: Service = interfering
            .iter()
            .map(|hp| release_ceil(w, hp.period) * hp.wcet * speed)
            .sum();
        cost + interference
    })
}

/// Compute the response time of every task and report whether the
/// task set is schedulable.
///
/// The analysis fails fast: on the first task whose response time
/// exceeds its deadline it stops and clears the response times of that
/// task and of all lower-priority tasks.
pub fn response_times(tasks: &mut [Task], speed: f64) -> bool {
    for i in 0..tasks.len() {
        match response_time(tasks, i, speed) {
            Ok(r) => tasks[i].response_time = Some(r),
            Err(_) => {
                for task in tasks[i..].iter_mut() {
                    task.response_time = None;
                }
                return false;
            }
        }
    }
    true
}

/// The slack of `tasks[i]` at the critical instant (time zero, all
/// tasks released simultaneously).
///
/// The slack is maximized over the release times of higher-priority
/// jobs before the first deadline and the deadline itself, as the
/// level-i slack function `t − W(t)` only attains local maxima there.
#[allow(non_snake_case)]
pub fn initial_slack(tasks: &[Task], i: usize, speed: f64) -> Service {
    let task = &tasks[i];
    let level = &tasks[..=i];

    // Cumulative level-i demand released before `t`.
    let W = |t: Instant| -> Service {
        level
            .iter()
            .map(|j| release_ceil(t, j.period) * j.wcet * speed)
            .sum()
    };

    let releases = tasks[..i]
        .iter()
        .map(|hp| {
            (1u64..)
                .map(move |n| n as f64 * hp.period)
                .take_while(move |t| *t < task.deadline)
        })
        .kmerge()
        .dedup();

    releases
        .chain(iter::once(task.deadline))
        .map(|t| t - W(t))
        .fold(Service::NEG_INFINITY, Service::max)
}

/// Establish the response time and the initial slack of every task.
///
/// Returns `false` (and leaves no initial slack behind) if the task set
/// is not schedulable.
pub fn analyze(tasks: &mut [Task], speed: f64) -> bool {
    let schedulable = response_times(tasks, speed);
    for i in 0..tasks.len() {
        tasks[i].initial_slack = if schedulable {
            Some(initial_slack(tasks, i, speed))
        } else {
            None
        };
    }
    schedulable
}
