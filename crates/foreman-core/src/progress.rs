//! Aggregate progress derivation for collections.
//!
//! Progress is never incremented in place. Every recompute derives the
//! percentage fully from the current work-item states, so two racing
//! transitions on sibling items resolve last-writer-wins and the next
//! recompute self-heals whatever value lost the race.

use tracing::debug;

use crate::error::CoreError;
use crate::model::ids::{CollectionId, EntityKind};
use crate::store::EntityStore;

/// Recompute a collection's completion percentage and write it back.
///
/// `progress = round(done * 100 / total)`, rounding half up, with `0` for a
/// collection that has no work items. Idempotent: with no intervening
/// work-item change, repeated calls yield the same value and rewrite only
/// the `progress` field (the collection document is re-read first, so no
/// other field is disturbed).
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the collection does not exist, or a
/// store error if a read or the write-back fails.
pub fn recompute<S: EntityStore>(
    store: &S,
    collection_id: &CollectionId,
) -> Result<u8, CoreError> {
    let mut collection = store
        .collection(collection_id)?
        .ok_or_else(|| CoreError::not_found(EntityKind::Collection, collection_id))?;

    let items = store.work_items_in(collection_id)?;
    let total = items.len();
    let done = items.iter().filter(|item| item.status.is_terminal()).count();

    let progress = percentage(done, total);
    debug!(
        collection = %collection_id,
        done,
        total,
        progress,
        "recomputed collection progress"
    );

    collection.progress = progress;
    store.put_collection(&collection)?;
    Ok(progress)
}

/// Integer percentage with round-half-up, `0` when the denominator is zero.
fn percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = (done * 200 + total) / (2 * total);
    u8::try_from(scaled).unwrap_or(100)
}
