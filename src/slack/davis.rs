use super::{Frame, Method, SlackStrategy};
use crate::time::Instant;
use crate::workload::{self, Anchor};

/// Slack by fixed-point iteration on the idle budget.
///
/// Given the best slack `k` found so far, the level-i busy period that
/// absorbs `k` extra units of idle time ends at the least fixed point of
/// `t = tc + k + W(t) − wc`. No release before that point can do better
/// than `k`, so the next candidate is the first release at or after it.
/// Every workload term is computed from scratch, and the results of
/// higher-priority tasks are never consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Davis;

impl SlackStrategy for Davis {
    fn method(&self) -> Method {
        Method::Davis
    }

    fn uses_corollaries(&self) -> bool {
        false
    }

    fn search(&self, frame: &mut Frame, _anchors: &mut [Anchor]) {
        let di = frame.deadline();
        let level = frame.level;
        let higher = frame.higher();

        let mut x = frame.start();
        loop {
            // first candidate at or after x
            let ops = frame.ops();
            let p = higher
                .iter()
                .map(|hp| ops.ceil(x, hp.period) * hp.period)
                .fold(di, Instant::min);
            let s = frame.slack_uncached(p);
            frame.offer(p, s);
            if p >= di {
                break;
            }

            // past p, everything released up to p is part of the demand
            let mut t = p;
            let mut w = workload::released_by(level, p, frame.ops());
            loop {
                let y = frame.reach(w);
                if y <= t {
                    break;
                }
                t = y;
                if t >= di {
                    break;
                }
                w = workload::demand(level, t, frame.ops());
            }

            x = if t > p {
                t
            } else {
                let ops = frame.ops();
                higher
                    .iter()
                    .map(|hp| (ops.floor(p, hp.period) + 1.0) * hp.period)
                    .fold(di, Instant::min)
            };
        }
    }
}
