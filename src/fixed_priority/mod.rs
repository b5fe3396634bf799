/*! Response-time analysis for *fixed-priority* (**FP**) scheduling

This module provides the exact uniprocessor response-time test for
fully-preemptive fixed-priority scheduling of periodic tasks (the
classic recurrence of Joseph & Pandya and Audsley et al.), together
with the *initial slack* of each task, i.e., the largest amount of idle
time that can be inserted at the critical instant without any job of
the task missing its deadline.

All functions expect the task set in priority order (see
[by_priority][crate::task::by_priority]). A `speed` factor scales
every execution cost multiplicatively; values below one model a faster
clock.
 */

mod rta;

pub use rta::{analyze, initial_slack, response_time, response_times};
