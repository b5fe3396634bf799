/*! Level-i workload

All quantities here are sums over a *level*, i.e., a prefix
`tasks[..=i]` of a task set in priority order. The cumulative demand
`W(t) = Σ ⌈t/T⌉·C` is evaluated many times per slack request, mostly at
points that move forward in small steps, so [busy_point] memoizes the
per-task term in an [Anchor] and only refreshes it when `t` leaves the
period the anchor describes.
*/

use std::collections::BTreeMap;

use crate::slack::Method;
use crate::task::Task;
use crate::time::{Instant, OpCount, Service};

/// Memoized demand of one task.
///
/// `b` and `from` are consecutive releases `n·T` and `(n − 1)·T`, both
/// computed as products so that they agree with
/// [release_ceil][crate::time::release_ceil].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Demand `⌈t/T⌉·C` for any `t` in `(from, b]`.
    pub a: Service,
    /// End of the period for which `a` is valid.
    pub b: Instant,
    /// Start (exclusive) of the period for which `a` is valid.
    pub from: Instant,
    /// Strategy scratch: the last point evaluated on behalf of this task
    /// (`Fast2`) or its next release (`Het`).
    pub c: Instant,
}

impl Anchor {
    /// The anchor of the first period, `(0, T]`.
    pub fn fresh(task: &Task) -> Self {
        Anchor {
            a: task.wcet,
            b: task.period,
            from: 0.0,
            c: Instant::NEG_INFINITY,
        }
    }

    fn is_valid_at(&self, t: Instant) -> bool {
        t <= self.b && t > self.from
    }
}

/// Anchor caches of every strategy, one per task.
///
/// Each slack computation opens a [session][AnchorTable::session], which
/// resets the anchors of its strategy, so no state leaks from one
/// computation into the next.
#[derive(Debug, Clone, Default)]
pub struct AnchorTable {
    anchors: BTreeMap<Method, Vec<Anchor>>,
}

impl AnchorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the anchors of `method` for `tasks` and hand them out.
    pub fn session(&mut self, method: Method, tasks: &[Task]) -> &mut [Anchor] {
        let anchors = self.anchors.entry(method).or_default();
        anchors.clear();
        anchors.extend(tasks.iter().map(Anchor::fresh));
        anchors
    }

    /// The anchors `method` was left with, if it ever ran.
    pub fn get(&self, method: Method) -> Option<&[Anchor]> {
        self.anchors.get(&method).map(Vec::as_slice)
    }
}

/// Workload of `level` already consumed at `tc`: every job of an
/// earlier period in full, plus the service received by the job of the
/// current period.
pub fn consumed(level: &[Task], tc: Instant, ops: &mut OpCount) -> Service {
    level
        .iter()
        .map(|task| {
            let n = ops.floor(tc, task.period);
            let current = match task.job {
                Some(job) if job.release <= tc && job.release > (n - 1.0) * task.period => {
                    job.executed
                }
                _ => 0.0,
            };
            n * task.wcet + current
        })
        .sum()
}

/// Cumulative demand `W(t)` of jobs released before `t`, without any
/// caching.
pub fn demand(level: &[Task], t: Instant, ops: &mut OpCount) -> Service {
    level
        .iter()
        .map(|task| ops.ceil(t, task.period) * task.wcet)
        .sum()
}

/// Cumulative demand `W(t)` like [demand], reusing the anchors of
/// `level` wherever they are still valid.
pub fn busy_point(
    level: &[Task],
    anchors: &mut [Anchor],
    t: Instant,
    ops: &mut OpCount,
) -> Service {
    let mut w = 0.0;
    for (task, anchor) in level.iter().zip(anchors.iter_mut()) {
        if !anchor.is_valid_at(t) {
            let n = ops.ceil(t, task.period);
            anchor.a = n * task.wcet;
            anchor.b = n * task.period;
            anchor.from = (n - 1.0) * task.period;
        }
        w += anchor.a;
    }
    w
}

/// Cumulative demand of jobs released at or before `t`, i.e., the
/// right-continuous counterpart `Σ (⌊t/T⌋ + 1)·C` of [demand].
pub fn released_by(level: &[Task], t: Instant, ops: &mut OpCount) -> Service {
    level
        .iter()
        .map(|task| (ops.floor(t, task.period) + 1.0) * task.wcet)
        .sum()
}
