//! Bidirectional membership maintenance between collections and principals.
//!
//! A membership link lives in two documents: the collection's `member_ids`
//! (authoritative) and the principal's `member_collection_ids` (mirror).
//! The store has no multi-document transactions, so every link change is a
//! two-sided update: collection first, principal second. A failure on the
//! second leg is surfaced as [`CoreError::PartialConsistency`] naming the
//! completed side; the core never retries on its own — callers repair by
//! re-invoking the operation or running [`reconcile_from_assignments`].

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::error::{CoreError, Side};
use crate::model::collection::Collection;
use crate::model::ids::{CollectionId, EntityKind, PrincipalId};
use crate::model::principal::Principal;
use crate::store::EntityStore;

/// Enroll a principal as a member of a collection.
///
/// The principal must exist, be active, and hold a member-capable role.
/// Adding the collection's own lead is a silent no-op (the lead/member sets
/// stay disjoint), as is adding an existing member whose documents already
/// agree. If the two sides have drifted, the missing side is repaired.
///
/// # Errors
///
/// - [`CoreError::NotFound`] — collection or principal absent
/// - [`CoreError::InvalidRole`] — wrong role, or principal inactive
/// - [`CoreError::PartialConsistency`] — collection side written, principal
///   side failed
pub fn add_member<S: EntityStore>(
    store: &S,
    collection_id: &CollectionId,
    principal_id: &PrincipalId,
) -> Result<(), CoreError> {
    let mut collection = store
        .collection(collection_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Collection, collection_id))?;

    // The own-lead no-op comes before role validation: an owner-led
    // collection must not turn the no-op into InvalidRole.
    if collection.lead_id == *principal_id {
        debug!(
            collection = %collection_id,
            principal = %principal_id,
            "lead not enrolled as member; lead and member sets stay disjoint"
        );
        return Ok(());
    }

    let principal = store
        .principal(principal_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Principal, principal_id))?;

    check_member_candidate(&principal)?;

    let outcome = two_sided_add(store, &mut collection, principal)?;
    if outcome.changed() {
        info!(collection = %collection_id, principal = %principal_id, "member added");
    }
    Ok(())
}

/// Remove a principal from a collection's member set.
///
/// Removing a principal that is not a member is a no-op. A since-deleted
/// principal is removed from the collection side only; there is no mirror
/// document left to update, so the link is trivially consistent.
///
/// # Errors
///
/// - [`CoreError::NotFound`] — collection absent
/// - [`CoreError::PartialConsistency`] — collection side written, principal
///   side failed
pub fn remove_member<S: EntityStore>(
    store: &S,
    collection_id: &CollectionId,
    principal_id: &PrincipalId,
) -> Result<(), CoreError> {
    let mut collection = store
        .collection(collection_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Collection, collection_id))?;
    let principal = store.principal(principal_id)?;

    if collection.member_ids.remove(principal_id) {
        store.put_collection(&collection)?;
    }

    let Some(mut principal) = principal else {
        warn!(
            collection = %collection_id,
            principal = %principal_id,
            "removed member references a deleted principal; no mirror document to update"
        );
        return Ok(());
    };

    if principal.member_collection_ids.remove(collection_id) {
        store
            .put_principal(&principal)
            .map_err(|source| CoreError::PartialConsistency {
                collection: collection_id.clone(),
                principal: principal_id.clone(),
                completed: Side::Collection,
                source,
            })?;
        info!(collection = %collection_id, principal = %principal_id, "member removed");
    }
    Ok(())
}

/// Rebuild membership from observed work-item assignments.
///
/// Scans the collection's work items, deduplicates assignee ids, and runs
/// the two-sided add for every assignee that is not the lead. That covers
/// both fresh enrollments and drift repair: an assignee the collection
/// already lists but whose principal document lost the mirror reference
/// (the residue of a failed second leg) gets the mirror restored.
/// Assignees referencing deleted, inactive, or wrong-role principals are
/// skipped with a warning — failure isolation is per item, not per batch.
/// Running the pass twice with no intervening changes adds nothing the
/// second time.
///
/// Returns the number of members newly added to the collection side;
/// mirror-only repairs do not count.
///
/// # Errors
///
/// - [`CoreError::NotFound`] — collection absent
/// - [`CoreError::PartialConsistency`] — a two-sided add failed on its
///   second leg; safe to re-run the pass
pub fn reconcile_from_assignments<S: EntityStore>(
    store: &S,
    collection_id: &CollectionId,
) -> Result<usize, CoreError> {
    let mut collection = store
        .collection(collection_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Collection, collection_id))?;

    let assignees: BTreeSet<PrincipalId> = store
        .work_items_in(collection_id)?
        .into_iter()
        .map(|item| item.assignee_id)
        .collect();

    let mut added = 0;
    for assignee_id in assignees {
        if collection.lead_id == assignee_id {
            continue;
        }

        // Assignees already in member_ids are still visited: the two-sided
        // add no-ops when both documents agree and restores the principal
        // mirror when a previous second leg failed partway.
        let Some(principal) = store.principal(&assignee_id)? else {
            warn!(
                collection = %collection_id,
                assignee = %assignee_id,
                "skipping assignee: principal no longer exists"
            );
            continue;
        };
        if let Err(err) = check_member_candidate(&principal) {
            warn!(
                collection = %collection_id,
                assignee = %assignee_id,
                error = %err,
                "skipping assignee: not enrollable"
            );
            continue;
        }

        let outcome = two_sided_add(store, &mut collection, principal)?;
        if outcome.collection_changed {
            added += 1;
        }
    }

    info!(collection = %collection_id, added, "membership reconciled from assignments");
    Ok(added)
}

/// Hand a collection to a new lead.
///
/// The new lead must exist, be active, and hold a lead-capable role. The
/// collection document is written first (new `lead_id`, and the new lead is
/// dropped from `member_ids` so the sets stay disjoint), then the new
/// lead's document (member reference swapped for a led reference), then the
/// old lead's document (led reference dropped). A deleted old lead leaves
/// nothing to update.
///
/// # Errors
///
/// - [`CoreError::NotFound`] — collection or new lead absent
/// - [`CoreError::InvalidRole`] — new lead inactive or not lead-capable
/// - [`CoreError::PartialConsistency`] — a later leg failed; the error
///   names the furthest side written
pub fn reassign_lead<S: EntityStore>(
    store: &S,
    collection_id: &CollectionId,
    new_lead_id: &PrincipalId,
) -> Result<(), CoreError> {
    let mut collection = store
        .collection(collection_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Collection, collection_id))?;
    let mut new_lead = store
        .principal(new_lead_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Principal, new_lead_id))?;

    if !new_lead.active || !new_lead.role.can_lead() {
        return Err(CoreError::InvalidRole {
            principal: new_lead_id.clone(),
            role: new_lead.role,
            requirement: "made lead of a collection",
        });
    }

    if collection.lead_id == *new_lead_id {
        return Ok(());
    }

    let old_lead_id = std::mem::replace(&mut collection.lead_id, new_lead_id.clone());
    collection.member_ids.remove(new_lead_id);
    store.put_collection(&collection)?;

    new_lead.member_collection_ids.remove(collection_id);
    new_lead.led_collection_ids.insert(collection_id.clone());
    store
        .put_principal(&new_lead)
        .map_err(|source| CoreError::PartialConsistency {
            collection: collection_id.clone(),
            principal: new_lead_id.clone(),
            completed: Side::Collection,
            source,
        })?;

    match store.principal(&old_lead_id)? {
        Some(mut old_lead) => {
            if old_lead.led_collection_ids.remove(collection_id) {
                store
                    .put_principal(&old_lead)
                    .map_err(|source| CoreError::PartialConsistency {
                        collection: collection_id.clone(),
                        principal: old_lead_id.clone(),
                        completed: Side::Principal,
                        source,
                    })?;
            }
        }
        None => {
            warn!(
                collection = %collection_id,
                principal = %old_lead_id,
                "previous lead no longer exists; nothing to update"
            );
        }
    }

    info!(
        collection = %collection_id,
        from = %old_lead_id,
        to = %new_lead_id,
        "collection lead reassigned"
    );
    Ok(())
}

/// Shared enrollment validation: member-capable role and active flag.
fn check_member_candidate(principal: &Principal) -> Result<(), CoreError> {
    if !principal.role.can_be_member() {
        return Err(CoreError::InvalidRole {
            principal: principal.id.clone(),
            role: principal.role,
            requirement: "enrolled as a collection member",
        });
    }
    if !principal.active {
        return Err(CoreError::InvalidRole {
            principal: principal.id.clone(),
            role: principal.role,
            requirement: "enrolled while inactive",
        });
    }
    Ok(())
}

/// Result of a two-sided add, per side.
///
/// `collection_changed` means a new enrollment; a lone `principal_changed`
/// means a drifted mirror was restored.
struct TwoSidedAdd {
    collection_changed: bool,
    principal_changed: bool,
}

impl TwoSidedAdd {
    const fn changed(&self) -> bool {
        self.collection_changed || self.principal_changed
    }
}

/// The two-sided write: collection side first, then the principal mirror.
///
/// Either side is written only when it actually changes, so the call
/// no-ops when both documents already agree and repairs whichever side is
/// behind. The caller has already validated the candidate and ruled out
/// the lead.
fn two_sided_add<S: EntityStore>(
    store: &S,
    collection: &mut Collection,
    mut principal: Principal,
) -> Result<TwoSidedAdd, CoreError> {
    let collection_changed = collection.member_ids.insert(principal.id.clone());
    if collection_changed {
        store.put_collection(collection)?;
    }

    let principal_changed = principal.member_collection_ids.insert(collection.id.clone());
    if principal_changed {
        store
            .put_principal(&principal)
            .map_err(|source| CoreError::PartialConsistency {
                collection: collection.id.clone(),
                principal: principal.id.clone(),
                completed: Side::Collection,
                source,
            })?;
    }

    Ok(TwoSidedAdd {
        collection_changed,
        principal_changed,
    })
}
