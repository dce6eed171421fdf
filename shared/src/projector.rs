//! Local view of an entity: the last snapshot with pending mutations laid on top.

use crate::models::{Entity, PendingMutation};

/// Overlays `pending` on `snapshot`.
///
/// Only in-flight or acknowledged mutations contribute. The overlay is skipped
/// when the participant is already counted on any sub-item of the snapshot,
/// or when the target sub-item does not exist, so the result never breaks the
/// counter invariants.
pub fn project(snapshot: &Entity, pending: Option<&PendingMutation>) -> Entity {
    let mut view = snapshot.clone();
    if let Some(pending) = pending {
        overlay(&mut view, pending);
    }
    view
}

/// Overlays every pending mutation that targets `snapshot`, in iteration order.
pub fn project_all<'a>(
    snapshot: &Entity,
    pending: impl IntoIterator<Item = &'a PendingMutation>,
) -> Entity {
    let mut view = snapshot.clone();
    for mutation in pending {
        overlay(&mut view, mutation);
    }
    view
}

fn overlay(view: &mut Entity, pending: &PendingMutation) {
    let mutation = &pending.mutation;
    if !pending.is_overlaid() || mutation.entity_id != view.id {
        return;
    }
    if view.has_participant(&mutation.participant_id) {
        return;
    }
    let Some(item) = view.sub_items.iter_mut().find(|item| item.id == mutation.sub_item_id) else {
        return;
    };

    item.count += 1;
    item.participants.insert(mutation.participant_id.clone());
    view.total_count += 1;
}
