//! Work-item lifecycle operations: creation and status transitions.
//!
//! All validation happens before any write. A failed permission or table
//! check leaves the store untouched; a successful transition rewrites
//! exactly one work-item document and then synchronously recomputes the
//! owning collection's progress (the recompute reads the just-written
//! state, so the derived value is never behind within a single call).

use chrono::Utc;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::collection::Collection;
use crate::model::ids::{EntityKind, PrincipalId, WorkItemId};
use crate::model::principal::Principal;
use crate::model::work_item::{NewWorkItem, Status, WorkItem};
use crate::progress;
use crate::store::EntityStore;

/// Request a lifecycle transition on behalf of a principal.
///
/// The requester must be the item's assignee or hold a lead-capable role,
/// and must be active. The `(current, target)` edge must appear in the
/// transition table; the table is total, so the terminal state simply has
/// an empty edge set. On success the item is persisted with `completed_at`
/// stamped when entering `done` (and cleared on any other target), and the
/// owning collection's progress is recomputed.
///
/// # Errors
///
/// - [`CoreError::NotFound`] — item or requester absent
/// - [`CoreError::Forbidden`] — requester is neither assignee nor lead-capable,
///   or is inactive; nothing is written
/// - [`CoreError::InvalidTransition`] — edge not in the table; nothing is written
pub fn request_transition<S: EntityStore>(
    store: &S,
    work_item_id: &WorkItemId,
    target: Status,
    requester_id: &PrincipalId,
) -> Result<WorkItem, CoreError> {
    let mut item = store
        .work_item(work_item_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::WorkItem, work_item_id))?;
    let requester = store
        .principal(requester_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Principal, requester_id))?;

    if !may_transition(&item, &requester) {
        debug!(
            item = %work_item_id,
            requester = %requester_id,
            "transition denied: requester is neither assignee nor lead-capable"
        );
        return Err(CoreError::Forbidden {
            action: "transition this work item",
            principal: requester.id,
        });
    }

    item.status.can_transition_to(target)?;

    let now = Utc::now();
    item.status = target;
    // completed_at mirrors the terminal state exactly: stamped on entry,
    // cleared on any non-terminal target.
    item.completed_at = if target == Status::Done {
        Some(now)
    } else {
        None
    };
    item.updated_at = now;
    store.put_work_item(&item)?;

    let progress = progress::recompute(store, &item.collection_id)?;
    info!(
        item = %item.id,
        collection = %item.collection_id,
        status = %item.status,
        progress,
        "work item transitioned"
    );

    Ok(item)
}

/// Create a work item in the `pending` state.
///
/// The owning collection must exist and still accept new items; assignee
/// and creator must exist; the assignee must already participate in the
/// collection as lead or member. The id is allocated by the store, and the
/// collection's progress is recomputed afterwards (a new pending item
/// lowers the percentage).
///
/// # Errors
///
/// - [`CoreError::NotFound`] — collection, assignee, or creator absent
/// - [`CoreError::Forbidden`] — collection is `done`
/// - [`CoreError::InvalidRole`] — assignee does not participate in the collection
pub fn create_work_item<S: EntityStore>(store: &S, new: NewWorkItem) -> Result<WorkItem, CoreError> {
    let collection = store
        .collection(&new.collection_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Collection, &new.collection_id))?;
    if !collection.accepts_new_items() {
        return Err(CoreError::Forbidden {
            action: "add work items to a closed collection",
            principal: new.creator_id,
        });
    }

    let assignee = store
        .principal(&new.assignee_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Principal, &new.assignee_id))?;
    let _creator = store
        .principal(&new.creator_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Principal, &new.creator_id))?;

    check_assignee(&collection, &assignee)?;

    let now = Utc::now();
    let item = WorkItem {
        id: store.next_work_item_id()?,
        collection_id: new.collection_id,
        assignee_id: new.assignee_id,
        creator_id: new.creator_id,
        title: new.title,
        description: new.description,
        status: Status::Pending,
        priority: new.priority,
        due_date: new.due_date,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    store.put_work_item(&item)?;

    progress::recompute(store, &item.collection_id)?;
    info!(item = %item.id, collection = %item.collection_id, "work item created");

    Ok(item)
}

/// Permission predicate for lifecycle transitions: the assignee may drive
/// their own item; lead-capable roles may drive any item.
fn may_transition(item: &WorkItem, requester: &Principal) -> bool {
    requester.active && (item.assignee_id == requester.id || requester.role.can_lead())
}

fn check_assignee(collection: &Collection, assignee: &Principal) -> Result<(), CoreError> {
    if collection.includes(&assignee.id) {
        Ok(())
    } else {
        Err(CoreError::InvalidRole {
            principal: assignee.id.clone(),
            role: assignee.role,
            requirement: "assigned work in a collection they do not participate in",
        })
    }
}
