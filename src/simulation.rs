/*! Discrete-event simulation of preemptive rate-monotonic scheduling

The driver releases the jobs of every task periodically, always runs
the highest-priority pending job, and keeps a [SlackLedger] current:
elapsed time is charged against the tasks that had to wait, and the
slack of a task is recomputed whenever one of its jobs completes. Every
job executes for exactly its task's cost.
*/

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::SlackError;
use crate::fixed_priority;
use crate::ledger::{SlackLedger, SystemMinimum};
use crate::slack::Method;
use crate::task::{by_priority, Job, Task};
use crate::time::{Duration, Instant, OpCount, Service};

/// Reasons for a simulation to stop early.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("{task} missed its deadline {deadline} (t={time})")]
    DeadlineMiss {
        task: String,
        deadline: Instant,
        time: Instant,
    },

    #[error("task set is not schedulable")]
    NotSchedulable,

    #[error(transparent)]
    Slack(#[from] SlackError),
}

/// The slack recomputed when a job completed.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Index of the task in priority order.
    pub task: usize,
    pub time: Instant,
    pub slack: Service,
    pub ttma: Instant,
    /// Operation counts of every method.
    pub ops: Vec<(Method, OpCount)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub completions: Vec<Completion>,
    /// Total time the processor idled.
    pub idle: Duration,
    /// The lowest system minimum observed after a completion.
    pub lowest: Option<SystemMinimum>,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    tasks: Vec<Task>,
    ledger: SlackLedger,
    /// Number of jobs released per task; the next release is at
    /// `released[i] · T`.
    released: Vec<u64>,
    now: Instant,
}

impl Simulation {
    /// Sort `tasks` by priority, analyze them, and initialize the ledger.
    pub fn new(tasks: Vec<Task>, config: Config) -> Result<Self, SimulationError> {
        let mut tasks = by_priority(tasks);
        if !fixed_priority::analyze(&mut tasks, 1.0) {
            return Err(SimulationError::NotSchedulable);
        }
        let mut ledger = SlackLedger::new(&tasks, config);
        ledger.initialize(&tasks)?;
        Ok(Simulation {
            released: vec![0; tasks.len()],
            tasks,
            ledger,
            now: 0.0,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn ledger(&self) -> &SlackLedger {
        &self.ledger
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    fn tolerance(&self) -> f64 {
        self.ledger.config().tolerance
    }

    fn pending(&self, i: usize) -> Option<Job> {
        let task = &self.tasks[i];
        task.job
            .filter(|job| job.remaining(task) > self.tolerance())
    }

    fn next_release(&self, i: usize) -> Instant {
        self.released[i] as f64 * self.tasks[i].period
    }

    fn release_jobs(&mut self) -> Result<(), SimulationError> {
        for i in 0..self.tasks.len() {
            let release = self.next_release(i);
            if release > self.now {
                continue;
            }
            if let Some(job) = self.pending(i) {
                return Err(SimulationError::DeadlineMiss {
                    task: self.tasks[i].name(),
                    deadline: job.deadline,
                    time: self.now,
                });
            }
            let task = &mut self.tasks[i];
            task.job = Some(Job::release(task, release));
            self.released[i] += 1;
        }
        Ok(())
    }

    /// Simulate until `horizon`.
    pub fn run(&mut self, horizon: Instant) -> Result<Report, SimulationError> {
        let mut report = Report::default();
        let tolerance = self.tolerance();

        while self.now < horizon {
            self.release_jobs()?;

            let next_release = (0..self.tasks.len())
                .map(|i| self.next_release(i))
                .fold(horizon, Instant::min);
            let running = (0..self.tasks.len()).find(|&i| self.pending(i).is_some());

            let r = match running {
                Some(r) => r,
                None => {
                    let dt = next_release - self.now;
                    self.now = next_release;
                    self.ledger.reduce(0..self.tasks.len(), dt, self.now)?;
                    report.idle += dt;
                    continue;
                }
            };

            let task = &self.tasks[r];
            let mut job = match task.job {
                Some(job) => job,
                None => continue,
            };
            // run until the job finishes or the next release preempts it;
            // a job finishing within tolerance after a release completes there
            let finish = self.now + job.remaining(task);
            let done = finish <= next_release + tolerance;
            let until = finish.min(next_release);
            let dt = until - self.now;
            job.executed = if done { task.wcet } else { job.executed + dt };
            self.tasks[r].job = Some(job);
            self.now = until;
            self.ledger.reduce(0..r, dt, self.now)?;

            if !done {
                continue;
            }
            if self.now > job.deadline + tolerance {
                return Err(SimulationError::DeadlineMiss {
                    task: self.tasks[r].name(),
                    deadline: job.deadline,
                    time: self.now,
                });
            }

            let validation = self.ledger.recompute(r, &self.tasks, self.now)?;
            debug!(
                task = %self.tasks[r].name(), t = self.now,
                slack = validation.slack, ttma = validation.ttma,
                "job completed"
            );
            report.completions.push(Completion {
                task: r,
                time: self.now,
                slack: validation.slack,
                ttma: validation.ttma,
                ops: validation
                    .results
                    .iter()
                    .map(|(method, result)| (*method, result.ops))
                    .collect(),
            });

            if let Some(minimum) = self.ledger.minimum() {
                let lower = report
                    .lowest
                    .map_or(true, |lowest| minimum.slack < lowest.slack);
                if lower {
                    debug!(
                        task = minimum.task, slack = minimum.slack, ttma = minimum.ttma,
                        "new system minimum"
                    );
                    report.lowest = Some(minimum);
                }
            }
        }

        info!(
            t = self.now, jobs = report.completions.len(), idle = report.idle,
            "simulation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::analysis::hyperperiod;
    use crate::tests::{constrained, periodic};

    fn run_until(tasks: Vec<Task>, horizon: Instant, config: Config) -> Report {
        let mut sim = Simulation::new(tasks, config).unwrap();
        let report = sim.run(horizon).unwrap();
        assert_eq!(sim.now(), horizon);
        report
    }

    fn run(params: &[(Service, Duration)], config: Config) -> Report {
        let tasks = periodic(params);
        let horizon = hyperperiod(&tasks).unwrap();
        run_until(tasks, horizon, config)
    }

    /// Run with and without shortcuts, cross-validating every method.
    fn cross_validate(tasks: Vec<Task>, horizon: Instant) {
        let config = Config::with_methods(Method::ALL);
        let with = run_until(tasks.clone(), horizon, config.clone());
        let without = run_until(tasks, horizon, config.without_shortcuts());
        assert!(!with.completions.is_empty());
        assert_eq!(with.completions.len(), without.completions.len());
        for (a, b) in with.completions.iter().zip(&without.completions) {
            assert_eq!((a.task, a.time), (b.task, b.time));
            assert_approx_eq!(a.slack, b.slack);
            assert_approx_eq!(a.ttma, b.ttma);
        }
    }

    const SETS: [&[(Service, Duration)]; 4] = [
        &[(1.0, 4.0), (2.0, 6.0)],
        &[(1.0, 3.0), (1.0, 6.0), (1.0, 12.0)],
        &[(1.0, 4.0), (2.0, 6.0), (3.0, 20.0)],
        &[(1.0, 5.0), (2.0, 8.0), (1.0, 10.0), (3.0, 40.0)],
    ];

    #[test]
    fn cross_validation_with_shortcuts() {
        let config = Config::with_methods(Method::ALL);
        for params in SETS {
            run(params, config.clone());
        }
    }

    #[test]
    fn cross_validation_of_all_methods() {
        let config = Config::with_methods(Method::ALL).without_shortcuts();
        for params in SETS {
            run(params, config.clone());
        }
    }

    #[test]
    fn shortcuts_preserve_results() {
        for params in SETS {
            let with = run(params, Config::default());
            let without = run(params, Config::default().without_shortcuts());
            assert_eq!(with.completions.len(), without.completions.len());
            for (a, b) in with.completions.iter().zip(&without.completions) {
                assert_eq!((a.task, a.time), (b.task, b.time));
                assert_eq!(a.slack, b.slack);
                assert_eq!(a.ttma, b.ttma);
            }
        }
    }

    #[test]
    fn cross_validation_of_fractional_periods() {
        let sets: [&[(Service, Duration)]; 6] = [
            &[(0.3, 2.8), (0.4, 7.1), (1.6, 9.9)],
            &[(1.6, 3.7), (1.8, 4.4)],
            &[(0.7, 3.7), (0.1, 4.4)],
            &[(0.9, 2.8), (1.4, 3.7)],
            &[(1.4, 5.5), (3.1, 7.1)],
            &[(0.2, 3.7), (1.3, 7.1), (1.7, 8.6), (0.3, 9.9), (4.0, 33.3)],
        ];
        for params in sets {
            // no common hyperperiod
            cross_validate(periodic(params), 60.0);
        }
    }

    #[test]
    fn cross_validation_of_constrained_deadlines() {
        let sets: [&[(Service, Duration, Duration)]; 4] = [
            &[(2.0, 6.0, 4.0), (2.0, 15.0, 6.0)],
            &[(1.0, 6.0, 5.0), (5.0, 24.0, 6.0)],
            &[(1.0, 4.0, 3.0), (1.0, 5.0, 4.0), (2.0, 10.0, 9.0)],
            &[(0.5, 2.8, 2.0), (1.0, 7.1, 5.0), (2.0, 9.9, 8.0)],
        ];
        for params in sets {
            cross_validate(constrained(params), 60.0);
        }
    }

    #[test]
    fn constrained_deadline_completions() {
        let report = run_until(
            constrained(&[(2.0, 6.0, 4.0), (2.0, 15.0, 6.0)]),
            60.0,
            Config::default(),
        );
        // T_1 finishes at 2; its next job, released at 6, is due at 10
        let first = &report.completions[0];
        assert_eq!((first.task, first.time), (0, 2.0));
        assert_eq!((first.slack, first.ttma), (6.0, 10.0));
        let second = &report.completions[1];
        assert_eq!((second.task, second.time), (1, 4.0));
        assert_eq!((second.slack, second.ttma), (9.0, 21.0));
    }

    #[test]
    fn two_tasks_over_hyperperiod() {
        let report = run(&[(1.0, 4.0), (2.0, 6.0)], Config::default());
        // 3 jobs of T_1 and 2 of T_2 in [0, 12)
        assert_eq!(report.completions.len(), 5);
        assert_eq!(report.idle, 12.0 - 3.0 - 4.0);

        // T_1 completes at 1, T_2 at 3
        let first = &report.completions[0];
        assert_eq!((first.task, first.time), (0, 1.0));
        assert_eq!((first.slack, first.ttma), (6.0, 8.0));
        let second = &report.completions[1];
        assert_eq!((second.task, second.time), (1, 3.0));
        assert_eq!((second.slack, second.ttma), (5.0, 12.0));
    }

    #[test]
    fn unschedulable_sets_are_rejected() {
        let tasks = periodic(&[(2.0, 4.0), (3.0, 6.0)]);
        assert_eq!(
            Simulation::new(tasks, Config::default()).unwrap_err(),
            SimulationError::NotSchedulable
        );
    }
}
