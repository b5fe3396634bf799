/*! Slack of a fixed-priority task at a given instant

The *slack* of task `i` at time `tc` is the largest amount of processor
time that can be given to work of lower priority than `i` (or left
idle) without the next job of `i`, or of any task of higher priority,
missing its deadline. With `W(t) = Σ_{j≤i} ⌈t/Tj⌉·Cj` the level-i demand
and `wc` the level-i workload already consumed at `tc`, it is the
maximum of

```text
S(t) = t − tc − W(t) + wc
```

over the search interval `[start, di]`, where `di` is the next absolute
deadline of `i` at or after `tc`. The instant at which the maximum is
attained (the smallest one, in case of ties) is the *ttma*.

`S` is piecewise linear and only drops right after a release, hence the
maximum is attained at a higher-priority release in `[start, di)` or at
`di` itself. All [Method]s search exactly this candidate set; they only
differ in how many points they need to look at. Because of that, they
must agree on every input, which [compute_and_validate] checks.

Before searching, the interval is narrowed with results already known
for the next higher-priority task (see [Shortcut]).

[compute_and_validate]: crate::validate::compute_and_validate
*/

use std::fmt;
use std::str::FromStr;

use auto_impl::auto_impl;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, trace};

use crate::config::Config;
use crate::error::SlackError;
use crate::ledger::SlackEntry;
use crate::task::Task;
use crate::time::{Instant, OpCount, Service};
use crate::workload::{self, Anchor};

mod davis;
mod fast;
mod fixed;
mod het;

pub use davis::Davis;
pub use fast::{Fast, Fast2};
pub use fixed::{Fixed, Fixed15, Fixed2, Fixed3};
pub use het::Het;

/// The slack strategies known to this crate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Method {
    /// Exhaustive enumeration, no caching.
    Fixed,
    /// Exhaustive enumeration over cached workload.
    Fixed2,
    /// [Method::Fixed2] with an additional lower bound on the interval
    /// for tasks with much shorter higher-priority periods.
    Fixed3,
    /// [Method::Fixed2] with the interval starting no earlier than one
    /// higher-priority period before the deadline.
    Fixed15,
    /// Fixed-point iteration on the idle budget, no candidate
    /// enumeration and no shortcuts.
    Davis,
    /// Fixed-point climbing between releases.
    Fast,
    /// [Method::Fast] remembering the points already evaluated.
    Fast2,
    /// Recursive decomposition over priority levels.
    #[serde(alias = "SlackHet")]
    Het,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::Fixed,
        Method::Fixed2,
        Method::Fixed3,
        Method::Fixed15,
        Method::Davis,
        Method::Fast,
        Method::Fast2,
        Method::Het,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Method::Fixed => "Fixed",
            Method::Fixed2 => "Fixed2",
            Method::Fixed3 => "Fixed3",
            Method::Fixed15 => "Fixed15",
            Method::Davis => "Davis",
            Method::Fast => "Fast",
            Method::Fast2 => "Fast2",
            Method::Het => "Het",
        }
    }

    /// The implementation behind this method.
    pub fn strategy(self) -> &'static dyn SlackStrategy {
        match self {
            Method::Fixed => &Fixed,
            Method::Fixed2 => &Fixed2,
            Method::Fixed3 => &Fixed3,
            Method::Fixed15 => &Fixed15,
            Method::Davis => &Davis,
            Method::Fast => &Fast,
            Method::Fast2 => &Fast2,
            Method::Het => &Het,
        }
    }

    /// Compute the slack of `tasks[i]` at time `tc`.
    ///
    /// `higher` is the current ledger entry of `tasks[i - 1]`; without it
    /// the interval is not narrowed. `anchors` must hold one anchor per
    /// task of `tasks[..=i]` (see
    /// [AnchorTable::session][crate::workload::AnchorTable::session]).
    pub fn get_slack(
        self,
        i: usize,
        tasks: &[Task],
        higher: Option<&SlackEntry>,
        tc: Instant,
        anchors: &mut [Anchor],
        config: &Config,
    ) -> Result<SlackResult, SlackError> {
        compute(self.strategy(), i, tasks, higher, tc, anchors, config)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error type returned for an unknown method name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown slack method `{0}`")]
pub struct ParseMethodError(pub String);

impl FromStr for Method {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SlackHet" => Ok(Method::Het),
            _ => Method::ALL
                .into_iter()
                .find(|m| m.name() == s)
                .ok_or_else(|| ParseMethodError(s.to_string())),
        }
    }
}

/// The interval-narrowing results that fired during a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shortcut {
    /// The next higher-priority task's result carries over directly.
    PriorityChain,
    /// The interval starts after the next higher-priority task's
    /// deadline plus its cost, seeded with that task's result.
    IntervalTightening,
    /// The exhaustive scan starts at the last higher-priority period
    /// before the deadline, shifted by that task's response time
    /// ([Fixed3]).
    RatioBound,
    /// The exhaustive scan starts one higher-priority period before the
    /// deadline ([Fixed15]).
    PeriodBound,
}

/// Outcome of one slack computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SlackResult {
    pub slack: Service,
    /// The (smallest) instant at which `slack` is attained.
    pub ttma: Instant,
    /// The deadline `di` that bounded the search.
    pub deadline: Instant,
    pub ops: OpCount,
    pub shortcuts: Vec<Shortcut>,
}

/// The best candidate seen so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Best {
    pub slack: Service,
    pub ttma: Instant,
}

impl Best {
    fn new() -> Self {
        Best {
            slack: Service::NEG_INFINITY,
            ttma: Instant::INFINITY,
        }
    }

    /// Keep `(t, s)` if `s` is larger, or equally large and earlier.
    /// Slacks within `tolerance` of each other count as equal.
    fn offer(&mut self, t: Instant, s: Service, tolerance: f64) {
        if s > self.slack + tolerance {
            self.slack = s;
            self.ttma = t;
        } else if (s - self.slack).abs() <= tolerance && t < self.ttma {
            self.slack = self.slack.max(s);
            self.ttma = t;
        }
    }
}

/// The state of one slack computation, shared by all strategies.
#[derive(Debug)]
pub struct Frame<'a> {
    level: &'a [Task],
    tc: Instant,
    deadline: Instant,
    lower: Instant,
    start: Instant,
    consumed: Service,
    best: Best,
    ops: OpCount,
    tolerance: f64,
    nudge: f64,
}

impl<'a> Frame<'a> {
    /// The tasks of higher priority than the one under analysis.
    pub fn higher(&self) -> &'a [Task] {
        let level = self.level;
        &level[..level.len() - 1]
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Start of the search interval.
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Start of the search interval before the strategy's own
    /// [bound][SlackStrategy::bound]. Points in `[lower, start)` cannot
    /// beat the best slack in `[start, di]`, but may tie with it earlier.
    pub fn lower(&self) -> Instant {
        self.lower
    }

    pub fn best(&self) -> Best {
        self.best
    }

    pub fn ops(&mut self) -> &mut OpCount {
        &mut self.ops
    }

    /// `S(t)`, with the demand taken from the anchors.
    pub fn slack_at(&mut self, t: Instant, anchors: &mut [Anchor]) -> Service {
        self.ops.evaluations += 1;
        let w = workload::busy_point(self.level, anchors, t, &mut self.ops);
        t - self.tc - w + self.consumed
    }

    /// `S(t)`, computed from scratch.
    pub fn slack_uncached(&mut self, t: Instant) -> Service {
        self.ops.evaluations += 1;
        let w = workload::demand(self.level, t, &mut self.ops);
        t - self.tc - w + self.consumed
    }

    pub fn offer(&mut self, t: Instant, s: Service) {
        self.best.offer(t, s, self.tolerance);
    }

    /// Evaluate and offer the deadline.
    pub fn offer_deadline(&mut self, anchors: &mut [Anchor]) {
        let di = self.deadline;
        let s = self.slack_at(di, anchors);
        self.offer(di, s);
    }

    /// The earliest instant at which `S` could come within tolerance of
    /// the best slack, given the level-i demand `w` of all points ahead.
    fn reach(&self, w: Service) -> Instant {
        self.tc + self.best.slack - self.tolerance + w - self.consumed
    }
}

/// A strategy to maximize `S` over the candidate points of a [Frame].
#[auto_impl(&, Box, Rc)]
pub trait SlackStrategy {
    fn method(&self) -> Method;

    /// Whether the results of the next higher-priority task may narrow
    /// the interval.
    fn uses_corollaries(&self) -> bool {
        true
    }

    /// A later start of the interval, applied after the corollaries.
    ///
    /// Candidates skipped by the bound must still be accounted for by
    /// [SlackStrategy::search] (see [Frame::lower]).
    fn bound(
        &self,
        _task: &Task,
        _hp: &Task,
        _deadline: Instant,
        _ops: &mut OpCount,
    ) -> Option<(Instant, Shortcut)> {
        None
    }

    /// Offer every candidate point that could beat the best slack so far.
    fn search(&self, frame: &mut Frame, anchors: &mut [Anchor]);
}

fn finish(
    method: Method,
    task: &Task,
    tc: Instant,
    mut result: SlackResult,
    tolerance: f64,
) -> Result<SlackResult, SlackError> {
    if result.slack < -tolerance {
        error!(
            %method, task = %task.name(), tc, slack = result.slack,
            "negative slack"
        );
        return Err(SlackError::NegativeSlack {
            method,
            task: task.name(),
            time: tc,
            slack: result.slack,
        });
    }
    if result.slack < 0.0 {
        result.slack = 0.0;
    }
    trace!(
        %method, task = %task.name(), tc,
        slack = result.slack, ttma = result.ttma, cc = result.ops.cc(),
        "slack computed"
    );
    Ok(result)
}

/// Run `strategy` for `tasks[i]` at `tc`.
pub fn compute<S: SlackStrategy>(
    strategy: S,
    i: usize,
    tasks: &[Task],
    higher: Option<&SlackEntry>,
    tc: Instant,
    anchors: &mut [Anchor],
    config: &Config,
) -> Result<SlackResult, SlackError> {
    let method = strategy.method();
    let task = &tasks[i];
    let response_time = task
        .response_time
        .ok_or_else(|| SlackError::NotAnalyzed { task: task.name() })?;
    let tolerance = config.tolerance;

    let mut ops = OpCount::default();
    let n = ops.ceil(tc, task.period);
    // an implicit deadline is the next release and must agree with it exactly
    let deadline = if task.deadline == task.period {
        (n + 1.0) * task.period
    } else {
        n * task.period + task.deadline
    };

    // nothing interferes with the highest-priority task
    if i == 0 {
        let result = SlackResult {
            slack: deadline - tc - response_time,
            ttma: deadline,
            deadline,
            ops,
            shortcuts: Vec::new(),
        };
        return finish(method, task, tc, result, tolerance);
    }

    let hp = &tasks[i - 1];
    // the corollaries only hold for implicit deadlines
    let implicit = task.deadline == task.period && hp.deadline == hp.period;
    let chain = higher.filter(|_| config.shortcuts && strategy.uses_corollaries() && implicit);
    let mut shortcuts = Vec::new();
    let mut best = Best::new();

    if let Some(h) = chain {
        if h.deadline + hp.wcet >= deadline && deadline >= h.ttma {
            trace!(%method, task = %task.name(), tc, "priority chain applies");
            shortcuts.push(Shortcut::PriorityChain);
            let result = SlackResult {
                slack: h.slack - task.wcet,
                ttma: h.ttma,
                deadline,
                ops,
                shortcuts,
            };
            return finish(method, task, tc, result, tolerance);
        }
    }

    // no job of the task can finish earlier than this
    let mut start = deadline - response_time + task.wcet;

    if let Some(h) = chain {
        let bound = h.deadline + hp.wcet;
        if start <= bound && bound <= deadline {
            start = bound;
            best.offer(h.ttma, h.slack - task.wcet, tolerance);
            shortcuts.push(Shortcut::IntervalTightening);
        }
    }

    // rounding in the start must not drop a release lying on it
    let lower = start - tolerance;
    if config.shortcuts {
        if let Some((bound, shortcut)) = strategy.bound(task, hp, deadline, &mut ops) {
            if bound > start {
                start = bound;
                shortcuts.push(shortcut);
            }
        }
    }
    let start = start - tolerance;

    if !shortcuts.is_empty() {
        trace!(%method, task = %task.name(), tc, start, ?shortcuts, "interval narrowed");
    }

    let level = &tasks[..=i];
    let consumed = workload::consumed(level, tc, &mut ops);
    let mut frame = Frame {
        level,
        tc,
        deadline,
        lower,
        start,
        consumed,
        best,
        ops,
        tolerance,
        nudge: config.nudge,
    };
    strategy.search(&mut frame, &mut anchors[..=i]);

    let result = SlackResult {
        slack: frame.best.slack,
        ttma: frame.best.ttma,
        deadline,
        ops: frame.ops,
        shortcuts,
    };
    finish(method, task, tc, result, tolerance)
}
