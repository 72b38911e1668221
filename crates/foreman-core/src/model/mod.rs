//! Entity model: principals, collections, and work items.
//!
//! Each type is an independently stored document. Cross-document invariants
//! (membership reciprocity, derived progress, assignee participation) are
//! owned by the operation modules, not by the structs here.

pub mod collection;
pub mod ids;
pub mod principal;
pub mod work_item;

use std::fmt;

pub use collection::{Collection, CollectionStatus};
pub use ids::{CollectionId, EntityKind, PrincipalId, WorkItemId};
pub use principal::{Principal, Role};
pub use work_item::{ALL_STATUSES, NewWorkItem, Priority, Status, WorkItem};

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}
