//! Drag-to-reorder on ordered lists (time blocks, notes, todos).

use std::collections::HashMap;

use anyhow::anyhow;
use tracing::{debug, warn};

use crate::model::{Note, ReorderDto, TimeBlock, Todo};

/// A list entry with an id and a persisted position.
pub trait Ordered {
    fn id(&self) -> &str;
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

macro_rules! impl_ordered {
    ($($ty:ty),*) => {
        $(impl Ordered for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn order(&self) -> i64 {
                self.order
            }

            fn set_order(&mut self, order: i64) {
                self.order = order;
            }
        })*
    };
}

impl_ordered!(TimeBlock, Note, Todo);

/// Removes the item at `from` and reinserts it at `to`.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) -> anyhow::Result<()> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(anyhow!(
            "move {from} -> {to} out of bounds for list of {len}"
        ));
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

/// Stable sort by the persisted `order` field.
pub fn sort_by_order<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|item| item.order());
}

/// Moves the dragged item onto the slot of the one it was dropped on and
/// returns the id sequence to send to the API.
pub fn move_by_id<T: Ordered>(
    items: &mut Vec<T>,
    active_id: &str,
    over_id: &str,
) -> anyhow::Result<ReorderDto> {
    let find = |id: &str| items.iter().position(|item| item.id() == id);
    let (Some(from), Some(to)) = (find(active_id), find(over_id)) else {
        warn!(active_id, over_id, "drag reorder target not found in list");
        return Err(anyhow!(
            "cannot reorder: {active_id} or {over_id} not in list"
        ));
    };

    if from != to {
        array_move(items, from, to)?;
    }
    debug!(active_id, from, to, "moved list item");

    Ok(ReorderDto {
        ordered_ids: items.iter().map(|item| item.id().to_string()).collect(),
    })
}

/// Rearranges `items` to follow `dto` and renumbers `order` from zero.
///
/// The id list must name every item exactly once.
pub fn apply_reorder<T: Ordered>(items: &mut Vec<T>, dto: &ReorderDto) -> anyhow::Result<()> {
    if dto.ordered_ids.len() != items.len() {
        return Err(anyhow!(
            "reorder lists {} ids for {} items",
            dto.ordered_ids.len(),
            items.len()
        ));
    }

    let mut rank: HashMap<&str, usize> = HashMap::with_capacity(dto.ordered_ids.len());
    for (idx, id) in dto.ordered_ids.iter().enumerate() {
        if rank.insert(id.as_str(), idx).is_some() {
            return Err(anyhow!("duplicate id in reorder: {id}"));
        }
    }
    if let Some(missing) = items.iter().find(|item| !rank.contains_key(item.id())) {
        return Err(anyhow!("reorder is missing id: {}", missing.id()));
    }

    items.sort_by_key(|item| rank.get(item.id()).copied().unwrap_or(usize::MAX));
    for (idx, item) in items.iter_mut().enumerate() {
        item.set_order(idx as i64);
    }
    Ok(())
}
