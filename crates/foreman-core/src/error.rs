//! Typed error taxonomy for the core operations.
//!
//! Callers route on two axes: the variant itself (what went wrong) and
//! [`CoreError::is_repairable`] (whether re-running a repair operation can
//! fix it). Validation failures are detected before any write; the only
//! variant that can surface after a write is [`CoreError::PartialConsistency`].

use std::fmt;

use crate::model::ids::{CollectionId, EntityKind, PrincipalId};
use crate::model::principal::Role;
use crate::model::work_item::InvalidTransition;
use crate::store::StoreError;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    Forbidden,
    InvalidTransition,
    InvalidRole,
    PartialConsistency,
    StoreFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "E1001",
            Self::Forbidden => "E1002",
            Self::InvalidTransition => "E2001",
            Self::InvalidRole => "E2002",
            Self::PartialConsistency => "E3001",
            Self::StoreFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotFound => "Referenced entity not found",
            Self::Forbidden => "Operation not permitted for this principal",
            Self::InvalidTransition => "Invalid lifecycle transition",
            Self::InvalidRole => "Principal role does not fit the requested relationship",
            Self::PartialConsistency => "Two-sided update partially applied",
            Self::StoreFailure => "Entity store operation failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotFound | Self::Forbidden => None,
            Self::InvalidTransition => {
                Some("Follow valid transitions: pending -> inprogress -> inreview/blocked -> done.")
            }
            Self::InvalidRole => Some("Check the principal's role and active flag."),
            Self::PartialConsistency => {
                Some("Retry the failed side or run reconcile_from_assignments on the collection.")
            }
            Self::StoreFailure => Some("Check entity store availability and retry."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Which leg of a two-sided membership write completed before the failure.
///
/// The collection side is authoritative and always written first, so a
/// reported `Collection` means the collection document lists a link the
/// principal document does not reciprocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Only the collection document was rewritten.
    Collection,
    /// The collection and at least one principal document were rewritten.
    Principal,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Collection => "collection",
            Self::Principal => "principal",
        })
    }
}

/// Error returned by every public core operation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced entity is absent. Terminal; never retry as-is.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    /// The requesting principal may not perform the action. Terminal.
    #[error("principal '{principal}' may not {action}")]
    Forbidden {
        action: &'static str,
        principal: PrincipalId,
    },

    /// The requested lifecycle edge is not in the transition table. Terminal.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// The principal's role (or active flag) does not fit the relationship.
    #[error("principal '{principal}' ({role}) cannot be {requirement}")]
    InvalidRole {
        principal: PrincipalId,
        role: Role,
        requirement: &'static str,
    },

    /// A two-sided write applied its first leg(s) and then failed.
    ///
    /// Repairable: re-invoke the operation or run reconciliation. The
    /// `completed` side tells an operator exactly which document is ahead.
    #[error(
        "membership update for principal '{principal}' on collection '{collection}' \
         applied only the {completed} side: {source}"
    )]
    PartialConsistency {
        collection: CollectionId,
        principal: PrincipalId,
        completed: Side,
        source: StoreError,
    },

    /// The entity store failed before any write of the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Map this error onto its stable machine code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::InvalidTransition(_) => ErrorCode::InvalidTransition,
            Self::InvalidRole { .. } => ErrorCode::InvalidRole,
            Self::PartialConsistency { .. } => ErrorCode::PartialConsistency,
            Self::Store(_) => ErrorCode::StoreFailure,
        }
    }

    /// Whether re-running a membership write or reconciliation can fix this.
    ///
    /// Validation errors must never be retried as-is; only a partially
    /// applied two-sided update is repairable.
    #[must_use]
    pub const fn is_repairable(&self) -> bool {
        matches!(self, Self::PartialConsistency { .. })
    }

    pub(crate) fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
