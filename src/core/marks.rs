//! Marks attached to absolute line ranges
//!
//! Shell-integration boundaries, bookmarks, working-directory changes and
//! similar annotations. Storage is an arena of slots addressed by
//! generation-checked ids; an ordered index keyed by start line answers
//! overlap queries.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::history::AbsLine;

/// What a mark annotates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkKind {
    /// Prompt start (OSC 133 A)
    Prompt,
    /// End of prompt, start of the typed command (OSC 133 B)
    CommandStart,
    /// Command output begins (OSC 133 C)
    OutputStart,
    /// Command finished (OSC 133 D)
    CommandEnd { exit_code: Option<i32> },
    /// OSC 7 / OSC 1337 CurrentDir
    WorkingDirectory(String),
    /// OSC 1337 RemoteHost
    Host(String),
    /// OSC 1337 SetMark
    Bookmark,
    /// Inline image placement
    Image,
    /// OSC 8 hyperlink span
    Hyperlink(String),
}

/// Handle to a mark. Stale handles (of removed marks) never resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkId {
    index: u32,
    generation: u32,
}

/// A mark: a kind plus the absolute lines it covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub kind: MarkKind,
    /// Half-open absolute line range; never empty
    pub lines: Range<AbsLine>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    mark: Mark,
    /// External references that keep the mark alive past eviction
    refs: u32,
}

/// Arena of marks with an ordered start-line index
#[derive(Debug, Clone, Default)]
pub struct MarkStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_start: BTreeMap<(AbsLine, MarkId), ()>,
    /// Longest range ever inserted; bounds the overlap scan
    max_span: u64,
}

impl MarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live marks
    pub fn len(&self) -> usize {
        self.by_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    /// Insert a mark covering `lines` (an empty range is widened to one line)
    pub fn insert(&mut self, kind: MarkKind, lines: Range<AbsLine>) -> MarkId {
        let lines = if lines.end <= lines.start {
            lines.start..lines.start + 1
        } else {
            lines
        };
        self.max_span = self.max_span.max(lines.end - lines.start);
        let start = lines.start;
        let entry = Entry {
            mark: Mark { kind, lines },
            refs: 0,
        };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                MarkId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                MarkId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.by_start.insert((start, id), ());
        id
    }

    fn entry(&self, id: MarkId) -> Option<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_ref())
    }

    fn entry_mut(&mut self, id: MarkId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_mut())
    }

    pub fn get(&self, id: MarkId) -> Option<&Mark> {
        self.entry(id).map(|e| &e.mark)
    }

    /// Mutable access to the kind. The line range is fixed once inserted.
    pub fn get_mut(&mut self, id: MarkId) -> Option<&mut MarkKind> {
        self.entry_mut(id).map(|e| &mut e.mark.kind)
    }

    /// Extend a mark to end at `end` (exclusive), e.g. when output finishes
    pub fn extend_to(&mut self, id: MarkId, end: AbsLine) -> bool {
        let Some(entry) = self.entry_mut(id) else {
            return false;
        };
        if end > entry.mark.lines.end {
            entry.mark.lines.end = end;
            let span = end - entry.mark.lines.start;
            self.max_span = self.max_span.max(span);
        }
        true
    }

    /// Remove a mark regardless of references
    pub fn remove(&mut self, id: MarkId) -> Option<Mark> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.by_start.remove(&(entry.mark.lines.start, id));
        Some(entry.mark)
    }

    /// Marks whose range overlaps `range`, ordered by start line
    pub fn overlapping(&self, range: Range<AbsLine>) -> Vec<(MarkId, &Mark)> {
        if range.end <= range.start {
            return Vec::new();
        }
        let low = range.start.saturating_sub(self.max_span);
        self.by_start
            .range((low, MarkId::MIN)..(range.end, MarkId::MIN))
            .filter_map(|(&(_, id), _)| self.get(id).map(|m| (id, m)))
            .filter(|(_, m)| m.lines.end > range.start)
            .collect()
    }

    /// Most recent mark of a kind starting at or before `line`
    pub fn last_before<F>(&self, line: AbsLine, mut pred: F) -> Option<(MarkId, &Mark)>
    where
        F: FnMut(&MarkKind) -> bool,
    {
        self.by_start
            .range(..(line.saturating_add(1), MarkId::MIN))
            .rev()
            .filter_map(|(&(_, id), _)| self.get(id).map(|m| (id, m)))
            .find(|(_, m)| pred(&m.kind))
    }

    /// Take an external reference, keeping the mark past eviction
    pub fn retain_ref(&mut self, id: MarkId) -> bool {
        match self.entry_mut(id) {
            Some(entry) => {
                entry.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Release an external reference
    pub fn release_ref(&mut self, id: MarkId) -> bool {
        match self.entry_mut(id) {
            Some(entry) if entry.refs > 0 => {
                entry.refs -= 1;
                true
            }
            _ => false,
        }
    }

    /// Remove unreferenced marks that lie entirely before the first retained
    /// line. Returns how many were removed.
    pub fn collect_garbage(&mut self, first_retained: AbsLine) -> usize {
        let dead: Vec<MarkId> = self
            .by_start
            .range(..(first_retained, MarkId::MIN))
            .map(|(&(_, id), _)| id)
            .filter(|&id| {
                self.entry(id)
                    .is_some_and(|e| e.refs == 0 && e.mark.lines.end <= first_retained)
            })
            .collect();
        for &id in &dead {
            self.remove(id);
        }
        dead.len()
    }

    /// Drop every mark
    pub fn clear(&mut self) {
        let ids: Vec<MarkId> = self.by_start.keys().map(|&(_, id)| id).collect();
        for id in ids {
            self.remove(id);
        }
    }

    /// All marks ordered by start line
    pub fn iter(&self) -> impl Iterator<Item = (MarkId, &Mark)> {
        self.by_start
            .keys()
            .filter_map(|&(_, id)| self.get(id).map(|m| (id, m)))
    }
}

impl MarkId {
    const MIN: MarkId = MarkId {
        index: 0,
        generation: 0,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut marks = MarkStore::new();
        let id = marks.insert(MarkKind::Prompt, 5..6);
        assert_eq!(marks.get(id).unwrap().kind, MarkKind::Prompt);
        assert_eq!(marks.len(), 1);
    }

    #[test]
    fn test_empty_range_widened() {
        let mut marks = MarkStore::new();
        let id = marks.insert(MarkKind::Bookmark, 3..3);
        assert_eq!(marks.get(id).unwrap().lines, 3..4);
    }

    #[test]
    fn test_stale_id_does_not_resolve() {
        let mut marks = MarkStore::new();
        let old = marks.insert(MarkKind::Prompt, 0..1);
        marks.remove(old);
        let new = marks.insert(MarkKind::Bookmark, 0..1);
        assert!(marks.get(old).is_none());
        assert_eq!(marks.get(new).unwrap().kind, MarkKind::Bookmark);
        assert!(marks.remove(old).is_none());
    }

    #[test]
    fn test_overlapping() {
        let mut marks = MarkStore::new();
        let long = marks.insert(MarkKind::OutputStart, 0..100);
        let a = marks.insert(MarkKind::Prompt, 10..11);
        let _far = marks.insert(MarkKind::Prompt, 200..201);

        let hits: Vec<MarkId> = marks.overlapping(50..60).into_iter().map(|(id, _)| id).collect();
        assert_eq!(hits, vec![long]);

        let hits: Vec<MarkId> = marks.overlapping(10..12).into_iter().map(|(id, _)| id).collect();
        assert_eq!(hits, vec![long, a]);

        assert!(marks.overlapping(100..200).is_empty());
    }

    #[test]
    fn test_garbage_collection_respects_refs() {
        let mut marks = MarkStore::new();
        let kept = marks.insert(MarkKind::Bookmark, 1..2);
        let dropped = marks.insert(MarkKind::Prompt, 2..3);
        let live = marks.insert(MarkKind::Prompt, 8..9);
        assert!(marks.retain_ref(kept));

        assert_eq!(marks.collect_garbage(5), 1);
        assert!(marks.get(kept).is_some());
        assert!(marks.get(dropped).is_none());
        assert!(marks.get(live).is_some());

        marks.release_ref(kept);
        assert_eq!(marks.collect_garbage(5), 1);
        assert!(marks.get(kept).is_none());
    }

    #[test]
    fn test_last_before() {
        let mut marks = MarkStore::new();
        marks.insert(MarkKind::Prompt, 1..2);
        let second = marks.insert(MarkKind::Prompt, 4..5);
        marks.insert(MarkKind::Bookmark, 6..7);

        let (id, _) = marks
            .last_before(6, |k| matches!(k, MarkKind::Prompt))
            .unwrap();
        assert_eq!(id, second);
    }

    #[test]
    fn test_extend_to() {
        let mut marks = MarkStore::new();
        let id = marks.insert(MarkKind::OutputStart, 3..4);
        assert!(marks.extend_to(id, 10));
        assert_eq!(marks.get(id).unwrap().lines, 3..10);
        assert_eq!(marks.overlapping(9..10).len(), 1);
    }
}
