use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ids::{CollectionId, PrincipalId, WorkItemId};

/// The five work-item lifecycle states.
///
/// `Pending` is the only creation state. `Done` is terminal: its outgoing
/// edge set is empty, not an error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    InProgress,
    InReview,
    Blocked,
    Done,
}

/// Every state, in declaration order. Useful for exhaustive table checks.
pub const ALL_STATUSES: [Status; 5] = [
    Status::Pending,
    Status::InProgress,
    Status::InReview,
    Status::Blocked,
    Status::Done,
];

impl Status {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "inprogress",
            Self::InReview => "inreview",
            Self::Blocked => "blocked",
            Self::Done => "done",
        }
    }

    /// The complete outgoing edge set for this state.
    ///
    /// Total over the state domain: every state maps to an explicit slice,
    /// and the terminal `Done` state maps to the empty slice.
    #[must_use]
    pub const fn allowed_targets(self) -> &'static [Status] {
        match self {
            Self::Pending => &[Self::InProgress],
            Self::InProgress => &[Self::InReview, Self::Blocked, Self::Done],
            Self::InReview => &[Self::InProgress, Self::Done],
            Self::Blocked => &[Self::InProgress],
            Self::Done => &[],
        }
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// Valid transitions:
    /// - `pending -> inprogress`
    /// - `inprogress -> inreview | blocked | done`
    /// - `inreview -> inprogress | done`
    /// - `blocked -> inprogress`
    /// - `done` has no outgoing edges
    pub fn can_transition_to(self, target: Status) -> Result<(), InvalidTransition> {
        if self.allowed_targets().contains(&target) {
            Ok(())
        } else {
            Err(InvalidTransition { from: self, to: target })
        }
    }

    /// Whether this state has no outgoing edges.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "inprogress" => Ok(Self::InProgress),
            "inreview" => Ok(Self::InReview),
            "blocked" => Ok(Self::Blocked),
            "done" => Ok(Self::Done),
            _ => Err(super::ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

/// Error returned when a lifecycle edge is not in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: Status,
    pub to: Status,
}

/// Work-item priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl Priority {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(super::ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

/// A task owned by a collection and assigned to one of its participants.
///
/// Invariant: `completed_at` is `Some` if and only if `status` is `Done`.
/// The lifecycle operations maintain it; the struct only stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub collection_id: CollectionId,
    pub assignee_id: PrincipalId,
    pub creator_id: PrincipalId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`lifecycle::create_work_item`](crate::lifecycle::create_work_item).
///
/// The id is allocated by the entity store; status always starts `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkItem {
    pub title: String,
    pub description: Option<String>,
    pub collection_id: CollectionId,
    pub assignee_id: PrincipalId,
    pub creator_id: PrincipalId,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}
