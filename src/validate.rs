/*! Cross-validation of the slack methods

Every configured [Method] computes the slack of the same task at the
same instant, each in a fresh anchor session. The methods derive the
same quantity in different ways, so any disagreement beyond the
configured tolerance is a defect in one of them and is reported as
[SlackError::Mismatch], together with every method's result.
*/

use tracing::{error, trace};

use crate::config::Config;
use crate::error::{MethodOutcome, SlackError};
use crate::ledger::SlackEntry;
use crate::slack::{Method, SlackResult};
use crate::task::Task;
use crate::time::{Instant, Service};
use crate::workload::AnchorTable;

/// The agreed-upon slack of a task, with every method's raw result.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub slack: Service,
    pub ttma: Instant,
    pub deadline: Instant,
    pub results: Vec<(Method, SlackResult)>,
}

impl Validation {
    pub fn entry(&self) -> SlackEntry {
        SlackEntry {
            slack: self.slack,
            ttma: self.ttma,
            deadline: self.deadline,
        }
    }
}

fn outcomes(results: &[(Method, SlackResult)]) -> Vec<MethodOutcome> {
    results
        .iter()
        .map(|(method, result)| MethodOutcome {
            method: *method,
            slack: result.slack,
            ttma: result.ttma,
            cc: result.ops.cc(),
        })
        .collect()
}

/// Compute the slack of `tasks[i]` at `tc` with every method of
/// `config` and make sure they all agree.
///
/// `higher` is the ledger entry of `tasks[i - 1]`, if any.
pub fn compute_and_validate(
    tc: Instant,
    i: usize,
    tasks: &[Task],
    higher: Option<&SlackEntry>,
    anchors: &mut AnchorTable,
    config: &Config,
) -> Result<Validation, SlackError> {
    if config.methods.is_empty() {
        return Err(SlackError::NoMethods);
    }

    let mut results = Vec::with_capacity(config.methods.len());
    for &method in &config.methods {
        let session = anchors.session(method, &tasks[..=i]);
        let result = method.get_slack(i, tasks, higher, tc, session, config)?;
        trace!(
            %method, task = %tasks[i].name(), tc,
            slack = result.slack, ttma = result.ttma, ops = ?result.ops,
            "method result"
        );
        results.push((method, result));
    }

    check(&tasks[i], tc, results, config.tolerance)
}

/// Make sure all `results` agree within `tolerance`.
fn check(
    task: &Task,
    tc: Instant,
    results: Vec<(Method, SlackResult)>,
    tolerance: f64,
) -> Result<Validation, SlackError> {
    let reference = &results[0].1;
    let (slack, ttma, deadline) = (reference.slack, reference.ttma, reference.deadline);
    let agree = results.iter().all(|(_, result)| {
        (result.slack - slack).abs() <= tolerance && (result.ttma - ttma).abs() <= tolerance
    });

    if !agree {
        let err = SlackError::Mismatch {
            task: task.name(),
            time: tc,
            outcomes: outcomes(&results),
        };
        error!("{}", err);
        return Err(err);
    }

    Ok(Validation {
        slack,
        ttma,
        deadline,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::analyzed;

    #[test]
    fn agreeing_methods() {
        let tasks = analyzed(&[(1.0, 4.0), (2.0, 6.0), (3.0, 20.0)]);
        let config = Config::with_methods(Method::ALL).without_shortcuts();
        let mut anchors = AnchorTable::new();

        let v = compute_and_validate(0.0, 2, &tasks, None, &mut anchors, &config).unwrap();
        assert_eq!(v.slack, 4.0);
        assert_eq!(v.ttma, 18.0);
        assert_eq!(v.deadline, 20.0);
        assert_eq!(v.results.len(), 8);
        assert_eq!(
            v.entry(),
            SlackEntry {
                slack: 4.0,
                ttma: 18.0,
                deadline: 20.0
            }
        );
        for method in Method::ALL {
            assert!(anchors.get(method).is_some());
        }
    }

    #[test]
    fn no_methods() {
        let tasks = analyzed(&[(1.0, 4.0)]);
        let config = Config::with_methods([]);
        assert_eq!(
            compute_and_validate(0.0, 0, &tasks, None, &mut AnchorTable::new(), &config),
            Err(SlackError::NoMethods)
        );
    }

    #[test]
    fn disagreement_is_fatal() {
        let tasks = analyzed(&[(1.0, 4.0), (2.0, 6.0), (3.0, 20.0)]);
        let config = Config::default().without_shortcuts();
        let mut anchors = AnchorTable::new();

        let good = Method::Fixed2
            .get_slack(2, &tasks, None, 0.0, anchors.session(Method::Fixed2, &tasks), &config)
            .unwrap();
        let mut off = good.clone();
        off.ttma = 20.0;

        let close = SlackResult {
            slack: good.slack + 1e-6,
            ..good.clone()
        };
        let results = vec![(Method::Fixed2, good.clone()), (Method::Het, close)];
        assert!(check(&tasks[2], 0.0, results, 1e-5).is_ok());

        let err = check(
            &tasks[2],
            0.0,
            vec![(Method::Fixed2, good), (Method::Fast, off)],
            1e-5,
        )
        .unwrap_err();
        match err {
            SlackError::Mismatch { task, time, outcomes } => {
                assert_eq!(task, "T_3");
                assert_eq!(time, 0.0);
                assert_eq!(outcomes.len(), 2);
                assert_eq!(outcomes[0].ttma, 18.0);
                assert_eq!(outcomes[1].method, Method::Fast);
                assert_eq!(outcomes[1].ttma, 20.0);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn negative_slack_is_fatal() {
        let mut tasks = analyzed(&[(1.0, 4.0), (2.0, 6.0)]);
        // below the response time of 3
        tasks[1].deadline = 2.0;
        let config = Config::with_methods(Method::ALL);
        let err = compute_and_validate(0.0, 1, &tasks, None, &mut AnchorTable::new(), &config)
            .unwrap_err();
        assert!(matches!(
            err,
            SlackError::NegativeSlack { method: Method::Fixed, slack, .. } if slack == -1.0
        ));
    }
}
