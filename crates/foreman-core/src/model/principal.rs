use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

use super::ids::{CollectionId, PrincipalId};

/// The three account roles, ordered by capability.
///
/// `Lead` and `Owner` are lead-capable: they may head a collection and may
/// drive any work item's lifecycle. `Owner` is reserved for administrative
/// accounts and is deliberately not a valid plain collection member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Lead,
    Owner,
}

impl Role {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Lead => "lead",
            Self::Owner => "owner",
        }
    }

    /// Whether this role may head a collection.
    #[must_use]
    pub const fn can_lead(self) -> bool {
        matches!(self, Self::Lead | Self::Owner)
    }

    /// Whether this role may be enrolled as a plain collection member.
    #[must_use]
    pub const fn can_be_member(self) -> bool {
        matches!(self, Self::Member | Self::Lead)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "lead" => Ok(Self::Lead),
            "owner" => Ok(Self::Owner),
            _ => Err(super::ParseEnumError {
                expected: "role",
                got: s.to_string(),
            }),
        }
    }
}

/// A person or service account participating in the system.
///
/// Carries the principal's side of the bidirectional membership references:
/// `led_collection_ids` and `member_collection_ids` mirror the
/// `Collection::lead_id` / `Collection::member_ids` fields. The two sets
/// must stay disjoint per collection; the membership operations enforce
/// that, the struct itself only stores the references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
    #[serde(default)]
    pub led_collection_ids: BTreeSet<CollectionId>,
    #[serde(default)]
    pub member_collection_ids: BTreeSet<CollectionId>,
}

impl Principal {
    /// Create an active principal with no membership references.
    #[must_use]
    pub fn new(id: PrincipalId, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            active: true,
            led_collection_ids: BTreeSet::new(),
            member_collection_ids: BTreeSet::new(),
        }
    }

    /// Whether this principal records a member link to `collection_id`.
    #[must_use]
    pub fn is_member_of(&self, collection_id: &CollectionId) -> bool {
        self.member_collection_ids.contains(collection_id)
    }

    /// Whether this principal records a lead link to `collection_id`.
    #[must_use]
    pub fn leads(&self, collection_id: &CollectionId) -> bool {
        self.led_collection_ids.contains(collection_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{Principal, Role};
    use crate::model::ids::{CollectionId, PrincipalId};
    use std::str::FromStr;

    #[test]
    fn role_capability_predicates() {
        assert!(!Role::Member.can_lead());
        assert!(Role::Lead.can_lead());
        assert!(Role::Owner.can_lead());

        assert!(Role::Member.can_be_member());
        assert!(Role::Lead.can_be_member());
        assert!(!Role::Owner.can_be_member());
    }

    #[test]
    fn role_display_parse_roundtrips() {
        for role in [Role::Member, Role::Lead, Role::Owner] {
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), role);
        }
        assert!(Role::from_str("admin").is_err());
    }

    #[test]
    fn role_json_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Lead).unwrap(), "\"lead\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"owner\"").unwrap(),
            Role::Owner
        );
    }

    #[test]
    fn new_principal_is_active_with_no_links() {
        let p = Principal::new(PrincipalId::new("p-1"), "Sam", Role::Member);
        assert!(p.active);
        assert!(p.led_collection_ids.is_empty());
        assert!(p.member_collection_ids.is_empty());
        assert!(!p.is_member_of(&CollectionId::new("c-1")));
        assert!(!p.leads(&CollectionId::new("c-1")));
    }

    #[test]
    fn principal_json_tolerates_missing_reference_sets() {
        let raw = r#"{"id":"p-1","display_name":"Sam","role":"member","active":true}"#;
        let p: Principal = serde_json::from_str(raw).unwrap();
        assert!(p.member_collection_ids.is_empty());
        assert!(p.led_collection_ids.is_empty());
    }
}
