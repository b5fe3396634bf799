/*! Running slack of every task

The ledger holds, for each task, the slack found by the last
[recomputation][SlackLedger::recompute] together with the instant at
which it is attained. Between recomputations the slack only shrinks:
whenever work of lower priority runs, or the processor idles, the
elapsed time is [charged][SlackLedger::reduce] against every task that
had to wait for it.
*/

use std::ops::Range;

use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::SlackError;
use crate::task::Task;
use crate::time::{Duration, Instant, Service};
use crate::validate::{compute_and_validate, Validation};
use crate::workload::AnchorTable;

/// The running slack of one task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlackEntry {
    pub slack: Service,
    /// When the slack is attained.
    pub ttma: Instant,
    /// The deadline that bounded the computation.
    pub deadline: Instant,
}

/// The least running slack in the system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemMinimum {
    pub slack: Service,
    pub ttma: Instant,
    /// Index of the task holding the minimum.
    pub task: usize,
}

impl SystemMinimum {
    /// The lowest processor speed, relative to full speed, at which all
    /// work due before `ttma` still completes if execution starts at `tc`.
    pub fn speed(&self, tc: Instant) -> f64 {
        let window = self.ttma - tc;
        if window <= 0.0 {
            return 1.0;
        }
        ((window - self.slack) / window).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct SlackLedger {
    names: Vec<String>,
    entries: Vec<Option<SlackEntry>>,
    anchors: AnchorTable,
    config: Config,
}

impl SlackLedger {
    pub fn new(tasks: &[Task], config: Config) -> Self {
        SlackLedger {
            names: tasks.iter().map(Task::name).collect(),
            entries: vec![None; tasks.len()],
            anchors: AnchorTable::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn entry(&self, i: usize) -> Option<&SlackEntry> {
        self.entries.get(i).and_then(Option::as_ref)
    }

    /// Compute the slack of every task at time zero, in priority order.
    pub fn initialize(&mut self, tasks: &[Task]) -> Result<(), SlackError> {
        for i in 0..tasks.len() {
            self.recompute(i, tasks, 0.0)?;
        }
        Ok(())
    }

    /// Replace the entry of `tasks[i]` by its slack at `tc`.
    pub fn recompute(
        &mut self,
        i: usize,
        tasks: &[Task],
        tc: Instant,
    ) -> Result<Validation, SlackError> {
        let higher = if i > 0 { self.entries[i - 1] } else { None };
        let validation = compute_and_validate(
            tc,
            i,
            tasks,
            higher.as_ref(),
            &mut self.anchors,
            &self.config,
        )?;
        debug!(
            task = %self.names[i], tc,
            slack = validation.slack, ttma = validation.ttma,
            "slack recomputed"
        );
        self.entries[i] = Some(validation.entry());
        Ok(validation)
    }

    /// Charge `amount` of elapsed time against the tasks in `indices`.
    ///
    /// Slack within tolerance of zero is clamped to zero; anything below
    /// that is an error.
    pub fn reduce(
        &mut self,
        indices: Range<usize>,
        amount: Duration,
        t: Instant,
    ) -> Result<(), SlackError> {
        let tolerance = self.config.tolerance;
        for i in indices {
            let entry = match self.entries[i].as_mut() {
                Some(entry) => entry,
                None => continue,
            };
            entry.slack -= amount;
            if entry.slack < -tolerance {
                error!(task = %self.names[i], t, slack = entry.slack, "slack exhausted");
                return Err(SlackError::Exhausted {
                    task: self.names[i].clone(),
                    time: t,
                    slack: entry.slack,
                });
            }
            if entry.slack.abs() <= tolerance && entry.slack != 0.0 {
                if entry.slack < 0.0 {
                    warn!(task = %self.names[i], t, slack = entry.slack, "clamping slack to zero");
                }
                entry.slack = 0.0;
            }
        }
        Ok(())
    }

    /// The least slack in the system.
    ///
    /// Among tasks with equal slack, the one whose slack is attained last
    /// is reported.
    pub fn minimum(&self) -> Option<SystemMinimum> {
        let tolerance = self.config.tolerance;
        let mut minimum: Option<SystemMinimum> = None;
        for (task, entry) in self.entries.iter().enumerate() {
            let entry = match entry {
                Some(entry) => entry,
                None => continue,
            };
            let replace = match minimum {
                None => true,
                Some(m) => {
                    entry.slack < m.slack - tolerance
                        || ((entry.slack - m.slack).abs() <= tolerance && entry.ttma > m.ttma)
                }
            };
            if replace {
                minimum = Some(SystemMinimum {
                    slack: entry.slack,
                    ttma: entry.ttma,
                    task,
                });
            }
        }
        minimum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::{Method, Shortcut};
    use crate::tests::analyzed;
    use assert_approx_eq::assert_approx_eq;

    fn ledger(tasks: &[Task]) -> SlackLedger {
        let mut ledger = SlackLedger::new(tasks, Config::with_methods(Method::ALL));
        ledger.initialize(tasks).unwrap();
        ledger
    }

    #[test]
    fn initial_entries_match_initial_slack() {
        let tasks = analyzed(&[(1.0, 3.0), (1.0, 6.0), (1.0, 12.0)]);
        let ledger = ledger(&tasks);
        for (i, task) in tasks.iter().enumerate() {
            let entry = ledger.entry(i).unwrap();
            assert_eq!(Some(entry.slack), task.initial_slack);
            assert_eq!(entry.deadline, task.deadline);
        }
        assert_eq!(ledger.entry(2).unwrap().ttma, 12.0);
        assert!(ledger.entry(3).is_none());
    }

    #[test]
    fn reduce_is_monotonic_and_clamped() {
        let tasks = analyzed(&[(1.0, 4.0), (2.0, 6.0)]);
        let mut ledger = ledger(&tasks);
        assert_eq!(ledger.entry(0).unwrap().slack, 3.0);
        assert_eq!(ledger.entry(1).unwrap().slack, 2.0);

        let mut last = 3.0;
        for step in [0.5, 1.0, 0.25, 1.25 - 4e-6] {
            ledger.reduce(0..1, step, 1.0).unwrap();
            let slack = ledger.entry(0).unwrap().slack;
            assert!(slack <= last);
            assert!(slack >= 0.0);
            last = slack;
        }
        assert_eq!(ledger.entry(0).unwrap().slack, 0.0);
        // untouched
        assert_eq!(ledger.entry(1).unwrap().slack, 2.0);

        ledger.reduce(0..2, 8e-6, 2.0).unwrap();
        assert_eq!(ledger.entry(0).unwrap().slack, 0.0);
        assert_approx_eq!(ledger.entry(1).unwrap().slack, 2.0 - 8e-6, 1e-9);
    }

    #[test]
    fn overdrawn_slack_is_fatal() {
        let tasks = analyzed(&[(1.0, 4.0), (2.0, 6.0)]);
        let mut ledger = ledger(&tasks);
        assert_eq!(
            ledger.reduce(0..2, 2.5, 2.5),
            Err(SlackError::Exhausted {
                task: "T_2".to_string(),
                time: 2.5,
                slack: -0.5,
            })
        );
    }

    #[test]
    fn minimum_prefers_later_ttma() {
        // slack 3 at 4 for T_1, slack 3 at 8 for T_2
        let tasks = analyzed(&[(1.0, 4.0), (3.0, 8.0)]);
        let ledger = ledger(&tasks);
        assert_eq!(ledger.entry(0).unwrap().ttma, 4.0);
        assert_eq!(
            ledger.minimum(),
            Some(SystemMinimum {
                slack: 3.0,
                ttma: 8.0,
                task: 1,
            })
        );
        assert_approx_eq!(ledger.minimum().unwrap().speed(0.0), 5.0 / 8.0);
    }

    #[test]
    fn minimum_of_empty_ledger() {
        let tasks = analyzed(&[(1.0, 4.0)]);
        let ledger = SlackLedger::new(&tasks, Config::default());
        assert_eq!(ledger.minimum(), None);
    }

    #[test]
    fn speed_bounds() {
        let m = SystemMinimum {
            slack: 3.0,
            ttma: 10.0,
            task: 0,
        };
        assert_approx_eq!(m.speed(4.0), 0.5);
        assert_eq!(m.speed(10.0), 1.0);
        assert_eq!(m.speed(8.0), 0.0);
    }

    #[test]
    fn recompute_uses_higher_entry() {
        let tasks = analyzed(&[(1.0, 4.0), (1.0, 4.0)]);
        let mut ledger = SlackLedger::new(&tasks, Config::default());
        ledger.recompute(0, &tasks, 0.0).unwrap();
        let v = ledger.recompute(1, &tasks, 0.0).unwrap();
        assert_eq!(v.slack, 2.0);
        assert_eq!(v.ttma, 4.0);
        assert_eq!(v.results[0].1.shortcuts, vec![Shortcut::PriorityChain]);
    }
}
