/*! Periodic tasks and their jobs

Tasks are always handled in rate-monotonic priority order: a shorter
period means a higher priority, and the 1-based identifier of a task
doubles as its priority rank. Use [by_priority] to bring a task set
into that shape before handing it to any analysis in this crate.
*/

use crate::time::{release_floor, Duration, Instant, Service};

/// A periodic task with worst-case execution time `wcet` (C), `period`
/// (T), and relative `deadline` (D).
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// 1-based identifier, equal to the task's priority rank.
    pub id: usize,
    pub wcet: Service,
    pub period: Duration,
    pub deadline: Duration,
    /// Worst-case response time (R), established by
    /// [response_times][crate::fixed_priority::response_times].
    pub response_time: Option<Duration>,
    /// Slack at the critical instant (k), established by
    /// [analyze][crate::fixed_priority::analyze].
    pub initial_slack: Option<Service>,
    /// The job of the current period, if any has been released.
    pub job: Option<Job>,
}

impl Task {
    pub fn new(id: usize, wcet: Service, period: Duration, deadline: Duration) -> Self {
        Task {
            id,
            wcet,
            period,
            deadline,
            response_time: None,
            initial_slack: None,
            job: None,
        }
    }

    /// A task with an implicit deadline (D = T).
    pub fn implicit(id: usize, wcet: Service, period: Duration) -> Self {
        Task::new(id, wcet, period, period)
    }

    pub fn utilization(&self) -> f64 {
        self.wcet / self.period
    }

    pub fn name(&self) -> String {
        format!("T_{}", self.id)
    }

    /// The release time of the job of the period containing `t`.
    pub fn period_start(&self, t: Instant) -> Instant {
        release_floor(t, self.period) * self.period
    }
}

/// One activation of a task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Job {
    pub release: Instant,
    /// Absolute deadline: `release + D`.
    pub deadline: Instant,
    /// Processor service received so far.
    pub executed: Service,
}

impl Job {
    /// Release a fresh job of `task` at time `at`.
    pub fn release(task: &Task, at: Instant) -> Self {
        Job {
            release: at,
            deadline: at + task.deadline,
            executed: 0.0,
        }
    }

    pub fn remaining(&self, task: &Task) -> Service {
        task.wcet - self.executed
    }
}

/// Sort `tasks` by ascending period (ties keep their input order) and
/// renumber them so that `tasks[i].id == i + 1`.
pub fn by_priority(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by(|a, b| a.period.total_cmp(&b.period));
    for (i, task) in tasks.iter_mut().enumerate() {
        task.id = i + 1;
    }
    tasks
}
