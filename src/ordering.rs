//! Ordered Collection
//!
//! Pure operations over the siblings of one parent. Every structural change
//! ends with a full renumbering pass, so positions are always `1..=n` in
//! sequence order.

use crate::error::{BoardError, BoardResult};
use crate::models::{Position, PositionUpdate, Sequenced};

/// Rewrite positions to be sequential (1, 2, 3, ...) in slice order
pub fn renumber<T: Sequenced>(seq: &mut [T]) {
    for (index, entity) in seq.iter_mut().enumerate() {
        entity.set_position(Position::from_index(index));
    }
}

/// Positions form exactly `{1..=n}`
pub fn is_contiguous<T: Sequenced>(seq: &[T]) -> bool {
    let mut ranks: Vec<u32> = seq.iter().map(|e| e.position().get()).collect();
    ranks.sort_unstable();
    ranks
        .iter()
        .enumerate()
        .all(|(index, rank)| *rank as usize == index + 1)
}

/// Sort by position, ties broken by id
pub fn sorted<T: Sequenced>(mut seq: Vec<T>) -> Vec<T> {
    seq.sort_by_key(|e| (e.position(), e.id()));
    seq
}

pub fn index_of<T: Sequenced>(seq: &[T], entity_id: u32) -> Option<usize> {
    seq.iter().position(|e| e.id() == entity_id)
}

/// Payload for a bulk position update
pub fn positions<T: Sequenced>(seq: &[T]) -> Vec<PositionUpdate> {
    seq.iter()
        .map(|e| PositionUpdate {
            id: e.id(),
            position: e.position(),
        })
        .collect()
}

/// Move the entity at `from` to index `to` of the result.
///
/// `to` is clamped to the last slot, so any `to >= len` appends at the end.
/// `from == to` returns the sequence unchanged.
pub fn reorder<T: Sequenced>(seq: &[T], from: usize, to: usize) -> BoardResult<Vec<T>> {
    if from >= seq.len() {
        return Err(BoardError::InvalidIndex {
            index: from,
            len: seq.len(),
        });
    }
    if from == to {
        return Ok(seq.to_vec());
    }

    let mut out = seq.to_vec();
    let entity = out.remove(from);
    if to > out.len() {
        tracing::debug!(to, len = seq.len(), "reorder target clamped to end");
    }
    let to = to.min(out.len());
    out.insert(to, entity);
    renumber(&mut out);
    Ok(out)
}

/// Move `entity_id` out of `source` into `dest` at `dest_index`.
///
/// The moved entity gets `dest_parent_id`; `dest_index` is clamped to
/// `dest.len()`. Both returned sequences are renumbered.
pub fn move_across<T: Sequenced>(
    source: &[T],
    dest: &[T],
    entity_id: u32,
    dest_parent_id: u32,
    dest_index: usize,
) -> BoardResult<(Vec<T>, Vec<T>)> {
    let from = index_of(source, entity_id).ok_or(BoardError::EntityNotFound { id: entity_id })?;

    let mut new_source = source.to_vec();
    let mut entity = new_source.remove(from);
    renumber(&mut new_source);

    entity.set_parent_id(dest_parent_id);
    let mut new_dest = dest.to_vec();
    let index = dest_index.min(new_dest.len());
    new_dest.insert(index, entity);
    renumber(&mut new_dest);

    Ok((new_source, new_dest))
}

/// Drop `entity_id` and close the gap it leaves
pub fn remove<T: Sequenced>(seq: &[T], entity_id: u32) -> BoardResult<Vec<T>> {
    let index = index_of(seq, entity_id).ok_or(BoardError::EntityNotFound { id: entity_id })?;
    let mut out = seq.to_vec();
    out.remove(index);
    renumber(&mut out);
    Ok(out)
}

/// Add `entity` at the end (position n + 1)
pub fn append<T: Sequenced>(seq: &[T], mut entity: T) -> Vec<T> {
    let mut out = seq.to_vec();
    entity.set_position(Position::from_index(out.len()));
    out.push(entity);
    out
}
