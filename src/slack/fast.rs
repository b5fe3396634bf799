use super::{Frame, Method, SlackStrategy};
use crate::time::Instant;
use crate::workload::{self, Anchor};

/// Climb from `from` towards `to`, offering every higher-priority
/// release in `[from, to)` that could come within tolerance of the best
/// slack.
///
/// From `t`, no point before `frame.reach(W(t))` can come close to the
/// best slack, so the search jumps there. Once `t` is a fixed point, the
/// next release of every higher-priority task is evaluated and the climb
/// resumes just past the earliest of them.
pub(super) fn climb(
    frame: &mut Frame,
    anchors: &mut [Anchor],
    from: Instant,
    to: Instant,
    prune: bool,
    memo: bool,
) {
    let mut pending: Vec<usize> = (0..frame.higher().len()).collect();
    let mut t = from;

    while t < to {
        let w = workload::busy_point(frame.level, anchors, t, &mut frame.ops);
        let reach = frame.reach(w);
        if reach > t {
            t = reach;
            continue;
        }

        // the anchors now point at the next release at or after t
        if prune {
            pending.retain(|&j| anchors[j].b < to);
        }
        let releases: Vec<(usize, Instant)> = pending
            .iter()
            .map(|&j| (j, anchors[j].b))
            .filter(|&(_, b)| b < to)
            .collect();
        let earliest = match releases.iter().map(|&(_, b)| b).reduce(Instant::min) {
            Some(b) => b,
            None => break,
        };

        for (j, b) in releases {
            if memo && anchors[j].c >= b {
                continue;
            }
            let s = frame.slack_at(b, anchors);
            frame.offer(b, s);
            if memo {
                anchors[j].c = b;
            }
        }

        t = earliest + frame.nudge;
    }
}

/// Fixed-point climbing; tasks without releases left before the deadline
/// drop out of the search.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fast;

impl SlackStrategy for Fast {
    fn method(&self) -> Method {
        Method::Fast
    }

    fn search(&self, frame: &mut Frame, anchors: &mut [Anchor]) {
        frame.offer_deadline(anchors);
        let (start, di) = (frame.start(), frame.deadline());
        climb(frame, anchors, start, di, true, false)
    }
}

/// Fixed-point climbing that never evaluates a release twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fast2;

impl SlackStrategy for Fast2 {
    fn method(&self) -> Method {
        Method::Fast2
    }

    fn search(&self, frame: &mut Frame, anchors: &mut [Anchor]) {
        frame.offer_deadline(anchors);
        let (start, di) = (frame.start(), frame.deadline());
        climb(frame, anchors, start, di, false, true)
    }
}
