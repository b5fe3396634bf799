use super::{Frame, Method, SlackStrategy};
use crate::time::{Instant, Service};
use crate::workload::Anchor;

/// Recursive decomposition over priority levels.
///
/// The releases of the lowest-priority task among `tasks[..k]` split an
/// interval into segments, and each segment is searched recursively for
/// the releases of `tasks[..k - 1]`. A segment is skipped when even
/// uninterrupted idling from its left end cannot reach the best slack.
#[derive(Debug, Clone, Copy, Default)]
pub struct Het;

impl SlackStrategy for Het {
    fn method(&self) -> Method {
        Method::Het
    }

    fn search(&self, frame: &mut Frame, anchors: &mut [Anchor]) {
        frame.offer_deadline(anchors);

        let start = frame.start();
        let s = frame.slack_at(start, anchors);
        let higher = frame.higher();
        let ops = frame.ops();
        if higher
            .iter()
            .any(|hp| ops.ceil(start, hp.period) * hp.period == start)
        {
            frame.offer(start, s);
        }

        let di = frame.deadline();
        segment(frame, anchors, higher.len(), start, s, di);
    }
}

/// Search the releases of `tasks[..k]` in the open interval `(lo, hi)`,
/// where `s_lo` is the slack at `lo`.
fn segment(
    frame: &mut Frame,
    anchors: &mut [Anchor],
    k: usize,
    lo: Instant,
    s_lo: Service,
    hi: Instant,
) {
    // S grows at most linearly
    if k == 0 || s_lo + (hi - lo) < frame.best.slack - frame.tolerance {
        return;
    }

    // index of the first release after lo, remembered from the last visit
    let period = frame.higher()[k - 1].period;
    let memo = anchors[k - 1].c;
    let mut n = (memo / period).round();
    if !(n * period == memo && memo > lo && (n - 1.0) * period <= lo) {
        n = frame.ops.floor(lo, period) + 1.0;
    }

    let (mut seg_lo, mut seg_s) = (lo, s_lo);
    let mut next = n * period;
    while next < hi {
        segment(frame, anchors, k - 1, seg_lo, seg_s, next);
        let s = frame.slack_at(next, anchors);
        frame.offer(next, s);
        seg_lo = next;
        seg_s = s;
        n += 1.0;
        next = n * period;
    }
    anchors[k - 1].c = next;

    segment(frame, anchors, k - 1, seg_lo, seg_s, hi);
}
