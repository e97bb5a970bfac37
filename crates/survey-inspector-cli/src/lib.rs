//! Headless front-end for `survey-inspector`: lists the expressions of a survey definition and
//! replays recorded engine snapshots through the change tracker.

pub mod cli;
pub mod trace;
