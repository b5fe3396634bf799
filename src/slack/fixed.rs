use itertools::Itertools;

use super::fast::climb;
use super::{Frame, Method, Shortcut, SlackStrategy};
use crate::task::Task;
use crate::time::{Instant, OpCount};
use crate::workload::Anchor;

/// Evaluate the slack at every higher-priority release in the interval,
/// each one from scratch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed;

impl SlackStrategy for Fixed {
    fn method(&self) -> Method {
        Method::Fixed
    }

    fn search(&self, frame: &mut Frame, _anchors: &mut [Anchor]) {
        let di = frame.deadline();
        let start = frame.start();

        let s = frame.slack_uncached(di);
        frame.offer(di, s);

        let higher = frame.higher();
        let ops = frame.ops();
        let firsts: Vec<f64> = higher
            .iter()
            .map(|hp| ops.ceil(start, hp.period))
            .collect();

        let releases: Vec<Instant> = higher
            .iter()
            .zip(firsts)
            .map(|(hp, first)| {
                (0u64..)
                    .map(move |n| (first + n as f64) * hp.period)
                    .take_while(move |t| *t < di)
            })
            .kmerge()
            .dedup()
            .collect();

        for t in releases {
            let s = frame.slack_uncached(t);
            frame.offer(t, s);
        }
    }
}

/// Walk the releases of each higher-priority task in the interval,
/// evaluating against the anchors. Releases the strategy's bound skipped
/// are only climbed through, to find the earliest tie.
fn scan_releases(frame: &mut Frame, anchors: &mut [Anchor]) {
    frame.offer_deadline(anchors);

    let di = frame.deadline();
    let start = frame.start();
    for hp in frame.higher() {
        let mut n = frame.ops().ceil(start, hp.period);
        let mut t = n * hp.period;
        while t < di {
            let s = frame.slack_at(t, anchors);
            frame.offer(t, s);
            n += 1.0;
            t = n * hp.period;
        }
    }

    let lower = frame.lower();
    if lower < start {
        climb(frame, anchors, lower, start, false, false);
    }
}

/// Like [Fixed], but with cached workload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed2;

impl SlackStrategy for Fixed2 {
    fn method(&self) -> Method {
        Method::Fixed2
    }

    fn search(&self, frame: &mut Frame, anchors: &mut [Anchor]) {
        scan_releases(frame, anchors)
    }
}

/// Like [Fixed2]. If the next higher-priority task has positive initial
/// slack and a period more than three times shorter, the exhaustive scan
/// starts at that task's last release before the deadline, shifted by its
/// response time minus its cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed3;

impl SlackStrategy for Fixed3 {
    fn method(&self) -> Method {
        Method::Fixed3
    }

    fn bound(
        &self,
        task: &Task,
        hp: &Task,
        deadline: Instant,
        ops: &mut OpCount,
    ) -> Option<(Instant, Shortcut)> {
        let slack = hp.initial_slack?;
        let response_time = hp.response_time?;
        if slack > 0.0 && task.period / hp.period > 3.0 {
            let bound = ops.floor(deadline, hp.period) * hp.period - response_time + hp.wcet;
            Some((bound, Shortcut::RatioBound))
        } else {
            None
        }
    }

    fn search(&self, frame: &mut Frame, anchors: &mut [Anchor]) {
        scan_releases(frame, anchors)
    }
}

/// Like [Fixed2], with the exhaustive scan starting one period of the
/// next higher-priority task before the deadline (plus that task's
/// cost).
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed15;

impl SlackStrategy for Fixed15 {
    fn method(&self) -> Method {
        Method::Fixed15
    }

    fn bound(
        &self,
        _task: &Task,
        hp: &Task,
        deadline: Instant,
        _ops: &mut OpCount,
    ) -> Option<(Instant, Shortcut)> {
        Some((deadline - hp.period + hp.wcet, Shortcut::PeriodBound))
    }

    fn search(&self, frame: &mut Frame, anchors: &mut [Anchor]) {
        scan_releases(frame, anchors)
    }
}
