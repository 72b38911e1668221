//! Opaque identifier newtypes for the three entity kinds.
//!
//! Identifiers are opaque strings assigned by the backing document store.
//! The newtypes exist so a collection id can never be passed where a
//! principal id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

id_type!(
    /// Identifier of a [`Principal`](crate::model::principal::Principal).
    PrincipalId
);
id_type!(
    /// Identifier of a [`Collection`](crate::model::collection::Collection).
    CollectionId
);
id_type!(
    /// Identifier of a [`WorkItem`](crate::model::work_item::WorkItem).
    WorkItemId
);

/// The three document kinds held by the entity store.
///
/// Used by `NotFound` errors to name what was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Principal,
    Collection,
    WorkItem,
}

impl EntityKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Collection => "collection",
            Self::WorkItem => "work item",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
