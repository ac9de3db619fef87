//! Commit-status classification.
//!
//! Past build outcomes are observed as commit statuses whose context encodes
//! the (artifact, kind) pair. Classification collapses them into green and
//! red artifact name sets for the skip-set resolver.

use crate::build::parse_context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// State of one commit status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusState {
    Success,
    Pending,
    Error,
    Failure,
}

/// One observed commit status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitStatus {
    /// Context string, `"{artifact} ({kind})"`.
    pub context: String,
    pub state: StatusState,
}

impl CommitStatus {
    pub fn new(context: impl Into<String>, state: StatusState) -> Self {
        Self {
            context: context.into(),
            state,
        }
    }
}

/// Green/red artifact name sets derived from a status history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSummary {
    /// Artifacts whose observed (artifact, kind) pairs are all green.
    pub green: BTreeSet<String>,

    /// Artifacts with at least one (artifact, kind) pair that never
    /// reported success.
    pub red: BTreeSet<String>,
}

/// Files touched per commit message, in commit order.
///
/// Built once from SCM history and never mutated afterwards; only consumed
/// to derive dependency-exclusion decisions.
pub type CommitMessageFileMap = BTreeMap<String, Vec<String>>;

/// Classify observed statuses into green and red artifact sets.
///
/// Classification happens per (artifact, kind) pair; an artifact built under
/// several kinds can appear on both sides before collapsing. A pair that
/// reported success anywhere counts green only, whatever the order of the
/// observations (non-success statuses include pending ones, which a later
/// success resolves).
pub fn classify_statuses(statuses: &[CommitStatus]) -> StatusSummary {
    let mut green_pairs: BTreeSet<(String, String)> = BTreeSet::new();
    let mut red_pairs: BTreeSet<(String, String)> = BTreeSet::new();

    for status in statuses {
        let (artifact, kind) = match parse_context(&status.context) {
            Ok(pair) => pair,
            Err(err) => {
                warn!(context = %status.context, error = %err, "skipping unparsable status context");
                continue;
            }
        };
        if status.state == StatusState::Success {
            green_pairs.insert((artifact, kind));
        } else {
            red_pairs.insert((artifact, kind));
        }
    }

    for pair in &green_pairs {
        red_pairs.remove(pair);
    }

    StatusSummary {
        green: green_pairs.into_iter().map(|(artifact, _)| artifact).collect(),
        red: red_pairs.into_iter().map(|(artifact, _)| artifact).collect(),
    }
}
