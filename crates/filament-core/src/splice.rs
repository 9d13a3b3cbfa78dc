//! Describing collection changes as splices.
//!
//! A [`Splice`] says "at `index` of the new sequence, `removed` went away and
//! `added_count` items took their place". A list of splices is ordered by
//! index, and every index is already expressed in the coordinates of the
//! final sequence, so they can be replayed front to back.

use crate::Identity;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Splice<T> {
    pub index: usize,
    pub removed: Vec<T>,
    pub added_count: usize,
}

impl<T> Splice<T> {
    pub fn new(index: usize, removed: Vec<T>, added_count: usize) -> Self {
        Self {
            index,
            removed,
            added_count,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edit {
    Leave,
    Update,
    Add,
    Delete,
}

/// Levenshtein distances between `old[old_start..old_end]` (rows) and
/// `current[current_start..current_end]` (columns). A substitution is never
/// cheaper than a delete plus an add.
fn edit_distances<T: Identity>(
    current: &[T],
    current_start: usize,
    current_end: usize,
    old: &[T],
    old_start: usize,
    old_end: usize,
) -> Vec<Vec<usize>> {
    let rows = old_end - old_start + 1;
    let columns = current_end - current_start + 1;
    let mut distances = vec![vec![0usize; columns]; rows];

    for (i, row) in distances.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in distances[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..rows {
        for j in 1..columns {
            distances[i][j] = if current[current_start + j - 1].identical(&old[old_start + i - 1]) {
                distances[i - 1][j - 1]
            } else {
                let north = distances[i - 1][j] + 1;
                let west = distances[i][j - 1] + 1;
                north.min(west)
            };
        }
    }
    distances
}

/// Walks the matrix back from the bottom-right corner. Ties prefer the
/// diagonal, then a delete, then an add.
fn edits_from_distances(distances: &[Vec<usize>]) -> Vec<Edit> {
    let mut i = distances.len() - 1;
    let mut j = distances[0].len() - 1;
    let mut current = distances[i][j];
    let mut edits = Vec::with_capacity(i + j);

    while i > 0 || j > 0 {
        if i == 0 {
            edits.push(Edit::Add);
            j -= 1;
            continue;
        }
        if j == 0 {
            edits.push(Edit::Delete);
            i -= 1;
            continue;
        }

        let diagonal = distances[i - 1][j - 1];
        let delete = distances[i - 1][j];
        let add = distances[i][j - 1];
        let min = if delete < add {
            delete.min(diagonal)
        } else {
            add.min(diagonal)
        };

        if min == diagonal {
            if diagonal == current {
                edits.push(Edit::Leave);
            } else {
                edits.push(Edit::Update);
                current = diagonal;
            }
            i -= 1;
            j -= 1;
        } else if min == delete {
            edits.push(Edit::Delete);
            i -= 1;
            current = delete;
        } else {
            edits.push(Edit::Add);
            j -= 1;
            current = add;
        }
    }

    edits.reverse();
    edits
}

fn shared_prefix<T: Identity>(current: &[T], old: &[T], search_length: usize) -> usize {
    current
        .iter()
        .zip(old)
        .take(search_length)
        .take_while(|(a, b)| a.identical(b))
        .count()
}

fn shared_suffix<T: Identity>(current: &[T], old: &[T], search_length: usize) -> usize {
    current
        .iter()
        .rev()
        .zip(old.iter().rev())
        .take(search_length)
        .take_while(|(a, b)| a.identical(b))
        .count()
}

/// Minimal splices turning `old[old_start..old_end]` into
/// `current[current_start..current_end]`.
///
/// The shared prefix is trimmed only when both ranges start at zero, the
/// shared suffix only when both end at their slice's length.
pub fn calc_splices<T: Clone + Identity>(
    current: &[T],
    current_start: usize,
    current_end: usize,
    old: &[T],
    old_start: usize,
    old_end: usize,
) -> Vec<Splice<T>> {
    let mut current_start = current_start;
    let mut current_end = current_end;
    let mut old_start = old_start;
    let mut old_end = old_end;

    let min_length = (current_end - current_start).min(old_end - old_start);
    let prefix = if current_start == 0 && old_start == 0 {
        shared_prefix(current, old, min_length)
    } else {
        0
    };
    let suffix = if current_end == current.len() && old_end == old.len() {
        shared_suffix(current, old, min_length - prefix)
    } else {
        0
    };

    current_start += prefix;
    old_start += prefix;
    current_end -= suffix;
    old_end -= suffix;

    if current_start == current_end && old_start == old_end {
        return Vec::new();
    }
    if current_start == current_end {
        return vec![Splice::new(
            current_start,
            old[old_start..old_end].to_vec(),
            0,
        )];
    }
    if old_start == old_end {
        return vec![Splice::new(
            current_start,
            Vec::new(),
            current_end - current_start,
        )];
    }

    let edits = edits_from_distances(&edit_distances(
        current,
        current_start,
        current_end,
        old,
        old_start,
        old_end,
    ));

    let mut splices = Vec::new();
    let mut pending: Option<Splice<T>> = None;
    let mut index = current_start;
    let mut old_index = old_start;

    for edit in edits {
        match edit {
            Edit::Leave => {
                splices.extend(pending.take());
                index += 1;
                old_index += 1;
            }
            Edit::Update => {
                let splice = pending.get_or_insert_with(|| Splice::new(index, Vec::new(), 0));
                splice.added_count += 1;
                index += 1;
                splice.removed.push(old[old_index].clone());
                old_index += 1;
            }
            Edit::Add => {
                let splice = pending.get_or_insert_with(|| Splice::new(index, Vec::new(), 0));
                splice.added_count += 1;
                index += 1;
            }
            Edit::Delete => {
                let splice = pending.get_or_insert_with(|| Splice::new(index, Vec::new(), 0));
                splice.removed.push(old[old_index].clone());
                old_index += 1;
            }
        }
    }
    splices.extend(pending);
    splices
}

/// Splices turning all of `old` into all of `current`.
pub fn diff<T: Clone + Identity>(old: &[T], current: &[T]) -> Vec<Splice<T>> {
    calc_splices(current, 0, current.len(), old, 0, old.len())
}

/// Overlap of `[start1, end1)` and `[start2, end2)`: -1 when disjoint, 0 when
/// they only touch.
fn intersect(start1: usize, end1: usize, start2: usize, end2: usize) -> isize {
    if end1 < start2 || end2 < start1 {
        return -1;
    }
    if end1 == start2 || end2 == start1 {
        return 0;
    }
    let overlap = if start1 < start2 {
        end1.min(end2) - start2
    } else {
        end1.min(end2) - start1
    };
    overlap as isize
}

/// Fold one raw splice record into an ordered list of non-overlapping splices.
pub fn merge_splice<T: Clone>(
    splices: &mut Vec<Splice<T>>,
    index: usize,
    removed: Vec<T>,
    added_count: usize,
) {
    let mut splice = Splice::new(index, removed, added_count);
    let mut inserted = false;
    let mut insertion_offset: isize = 0;
    let mut i = 0;

    while i < splices.len() {
        splices[i].index = splices[i].index.saturating_add_signed(insertion_offset);
        if inserted {
            i += 1;
            continue;
        }

        let current_index = splices[i].index;
        let current_added = splices[i].added_count;
        let intersect_count = intersect(
            splice.index,
            splice.index + splice.removed.len(),
            current_index,
            current_index + current_added,
        );

        if intersect_count >= 0 {
            let current = splices.remove(i);
            let overlap = intersect_count as usize;
            insertion_offset -= current.added_count as isize - current.removed.len() as isize;
            splice.added_count += current.added_count - overlap;
            let delete_count = splice.removed.len() + current.removed.len() - overlap;

            if splice.added_count == 0 && delete_count == 0 {
                // The two records cancel out.
                inserted = true;
            } else {
                let mut removed = current.removed;
                if splice.index < current.index {
                    let mut prepend = splice.removed[..current.index - splice.index].to_vec();
                    prepend.append(&mut removed);
                    removed = prepend;
                }
                if splice.index + splice.removed.len() > current.index + current.added_count {
                    let from = current.index + current.added_count - splice.index;
                    removed.extend_from_slice(&splice.removed[from..]);
                }
                splice.removed = removed;
                if current.index < splice.index {
                    splice.index = current.index;
                }
            }
            // `i` now points at the next element.
        } else if splice.index < current_index {
            inserted = true;
            let offset = splice.added_count as isize - splice.removed.len() as isize;
            splices.insert(i, std::mem::replace(&mut splice, Splice::new(0, Vec::new(), 0)));
            i += 1;
            splices[i].index = splices[i].index.saturating_add_signed(offset);
            insertion_offset += offset;
            i += 1;
        } else {
            i += 1;
        }
    }

    if !inserted {
        splices.push(splice);
    }
}

/// Turn raw mutation records into minimal splices against `current`, the
/// collection after all of them were applied.
pub fn project_splices<T: Clone + Identity>(
    current: &[T],
    records: Vec<Splice<T>>,
) -> Vec<Splice<T>> {
    let mut merged = Vec::new();
    for record in records {
        merge_splice(&mut merged, record.index, record.removed, record.added_count);
    }

    let mut splices = Vec::new();
    for splice in merged {
        if splice.added_count == 1 && splice.removed.len() == 1 {
            let same_item = current
                .get(splice.index)
                .is_some_and(|item| item.identical(&splice.removed[0]));
            if !same_item {
                splices.push(splice);
            }
            continue;
        }
        let end = splice.index + splice.added_count;
        splices.extend(calc_splices(
            current,
            splice.index,
            end,
            &splice.removed,
            0,
            splice.removed.len(),
        ));
    }
    splices
}

/// Replay `splices` over `old`, taking added items from `current`.
pub fn apply_splices<T: Clone>(old: &[T], splices: &[Splice<T>], current: &[T]) -> Vec<T> {
    let mut result = old.to_vec();
    for splice in splices {
        let start = splice.index.min(result.len());
        let end = (splice.index + splice.removed.len()).min(result.len());
        let added = current
            .get(splice.index..splice.index + splice.added_count)
            .unwrap_or(&[]);
        result.splice(start..end, added.iter().cloned());
    }
    result
}
