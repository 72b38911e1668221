use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

use super::ids::{CollectionId, PrincipalId};

/// Collection lifecycle status.
///
/// A `done` collection no longer accepts new work items; its existing items
/// keep their own lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Planning,
    Active,
    Done,
}

impl CollectionStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionStatus {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planning" => Ok(Self::Planning),
            "active" => Ok(Self::Active),
            "done" => Ok(Self::Done),
            _ => Err(super::ParseEnumError {
                expected: "collection status",
                got: s.to_string(),
            }),
        }
    }
}

/// A project: one lead, a set of members, and the work items that reference it.
///
/// `progress` is derived state. It must always equal the percentage computed
/// by [`progress::recompute`](crate::progress::recompute) over the
/// collection's work items; nothing else may write it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub lead_id: PrincipalId,
    #[serde(default)]
    pub member_ids: BTreeSet<PrincipalId>,
    pub status: CollectionStatus,
    /// Derived completion percentage, 0..=100.
    #[serde(default)]
    pub progress: u8,
}

impl Collection {
    /// Create a collection in `planning` with no members and zero progress.
    #[must_use]
    pub fn new(id: CollectionId, name: impl Into<String>, lead_id: PrincipalId) -> Self {
        Self {
            id,
            name: name.into(),
            lead_id,
            member_ids: BTreeSet::new(),
            status: CollectionStatus::Planning,
            progress: 0,
        }
    }

    /// Whether `principal_id` participates in this collection as lead or member.
    #[must_use]
    pub fn includes(&self, principal_id: &PrincipalId) -> bool {
        self.lead_id == *principal_id || self.member_ids.contains(principal_id)
    }

    /// Whether new work items may still be filed under this collection.
    #[must_use]
    pub fn accepts_new_items(&self) -> bool {
        self.status != CollectionStatus::Done
    }
}

#[cfg(test)]
mod tests {
    use super::{Collection, CollectionStatus};
    use crate::model::ids::{CollectionId, PrincipalId};
    use std::str::FromStr;

    fn collection() -> Collection {
        Collection::new(CollectionId::new("c-1"), "Launch", PrincipalId::new("p-lead"))
    }

    #[test]
    fn status_display_parse_roundtrips() {
        for status in [
            CollectionStatus::Planning,
            CollectionStatus::Active,
            CollectionStatus::Done,
        ] {
            assert_eq!(
                CollectionStatus::from_str(&status.to_string()).unwrap(),
                status
            );
        }
        assert!(CollectionStatus::from_str("cancelled").is_err());
    }

    #[test]
    fn includes_covers_lead_and_members() {
        let mut c = collection();
        assert!(c.includes(&PrincipalId::new("p-lead")));
        assert!(!c.includes(&PrincipalId::new("p-2")));

        c.member_ids.insert(PrincipalId::new("p-2"));
        assert!(c.includes(&PrincipalId::new("p-2")));
    }

    #[test]
    fn done_collections_refuse_new_items() {
        let mut c = collection();
        assert!(c.accepts_new_items());
        c.status = CollectionStatus::Done;
        assert!(!c.accepts_new_items());
    }

    #[test]
    fn collection_json_tolerates_missing_derived_fields() {
        let raw = r#"{"id":"c-1","name":"Launch","lead_id":"p-lead","status":"active"}"#;
        let c: Collection = serde_json::from_str(raw).unwrap();
        assert_eq!(c.progress, 0);
        assert!(c.member_ids.is_empty());
    }
}
