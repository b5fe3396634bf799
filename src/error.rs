use std::fmt;

use thiserror::Error;

use crate::slack::Method;
use crate::time::{Instant, Service};

/// The outcome of one slack method, kept for diagnosing disagreements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodOutcome {
    pub method: Method,
    pub slack: Service,
    pub ttma: Instant,
    /// Ceilings plus floors spent by the method.
    pub cc: u64,
}

impl fmt::Display for MethodOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: slack={} ttma={} cc={}",
            self.method, self.slack, self.ttma, self.cc
        )
    }
}

struct Outcomes<'a>(&'a [MethodOutcome]);

impl fmt::Display for Outcomes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, outcome) in self.0.iter().enumerate() {
            if n > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", outcome)?;
        }
        Ok(())
    }
}

/// Fatal conditions of the slack machinery.
///
/// None of these is expected for a schedulable task set; each one points
/// at a numerical problem or at a defect in one of the strategies and
/// aborts the current run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SlackError {
    /// A strategy arrived at a negative slack.
    #[error("{method} computed negative slack {slack} for {task} at t={time}")]
    NegativeSlack {
        method: Method,
        task: String,
        time: Instant,
        slack: Service,
    },

    /// Two strategies disagree on slack or ttma.
    #[error("slack methods disagree for {task} at t={time}: {}", Outcomes(outcomes))]
    Mismatch {
        task: String,
        time: Instant,
        outcomes: Vec<MethodOutcome>,
    },

    /// The running slack of a task was overdrawn.
    #[error("running slack of {task} exhausted at t={time} ({slack})")]
    Exhausted {
        task: String,
        time: Instant,
        slack: Service,
    },

    /// The response time of a task was never established.
    #[error("{task} has no response time; run the analysis first")]
    NotAnalyzed { task: String },

    /// No slack method was configured.
    #[error("no slack method configured")]
    NoMethods,
}
