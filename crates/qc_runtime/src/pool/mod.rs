//! Interned pools of compile-time literals.
//!
//! Compiled code refers to literals by small integer index. An index stays
//! valid while its slot holds links; released slots become tombstones that
//! the next intern may reuse, and tombstones at the top are trimmed off.
//! Live indices are never renumbered.

mod consts;
mod literals;

pub use consts::ConstTable;
pub use literals::LiteralTable;

use qc_core::fatal;

/// A payload that can live in an [`InternPool`].
pub trait Internable {
    /// Cheap test that proves two payloads differ. May return `false` for
    /// unequal payloads; must never return `true` for equal ones.
    fn quick_reject(&self, other: &Self) -> bool;

    fn same(&self, other: &Self) -> bool;
}

struct Slot<T> {
    payload: Option<T>,
    links: usize,
    pinned: bool,
}

pub struct InternPool<T> {
    slots: Vec<Slot<T>>,
    chunk: usize,
    label: &'static str,
}

impl<T: Internable> InternPool<T> {
    pub fn new(label: &'static str, chunk: usize) -> Self {
        let chunk = chunk.max(1);
        Self { slots: Vec::with_capacity(chunk), chunk, label }
    }

    /// Returns the index of a live payload equal to `payload`, linking it,
    /// or stores `payload` in the first tombstone or at the top.
    pub fn intern(&mut self, payload: T) -> usize {
        let mut first_free = None;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match &slot.payload {
                None => {
                    first_free.get_or_insert(index);
                }
                Some(live) => {
                    if !live.quick_reject(&payload) && live.same(&payload) {
                        slot.links += 1;
                        return index;
                    }
                }
            }
        }
        let slot = Slot { payload: Some(payload), links: 1, pinned: false };
        if let Some(index) = first_free {
            self.slots[index] = slot;
            return index;
        }
        self.push(slot)
    }

    /// Appends a permanent entry that releases never tombstone.
    pub(crate) fn intern_pinned(&mut self, payload: T) -> usize {
        self.push(Slot { payload: Some(payload), links: 1, pinned: true })
    }

    fn push(&mut self, slot: Slot<T>) -> usize {
        if self.slots.len() == self.slots.capacity() {
            self.slots.reserve_exact(self.chunk);
            tracing::debug!(pool = self.label, capacity = self.slots.capacity(), "pool grows");
        }
        self.slots.push(slot);
        self.slots.len() - 1
    }

    fn live_payload(&self, index: usize) -> &T {
        match self.slots.get(index) {
            Some(Slot { payload: Some(payload), .. }) => payload,
            Some(_) => fatal::invariant(format_args!("{} {index} was already freed", self.label)),
            None => fatal::invariant(format_args!("bad {} index {index}", self.label)),
        }
    }

    fn live_slot_mut(&mut self, index: usize) -> &mut Slot<T> {
        let label = self.label;
        match self.slots.get_mut(index) {
            Some(slot) if slot.payload.is_some() => slot,
            Some(_) => fatal::invariant(format_args!("{label} {index} was already freed")),
            None => fatal::invariant(format_args!("bad {label} index {index}")),
        }
    }

    pub fn get(&self, index: usize) -> &T {
        self.live_payload(index)
    }

    pub fn link(&mut self, index: usize) {
        self.live_slot_mut(index).links += 1;
    }

    /// Drops one link. The slot becomes a tombstone at zero, and the top of
    /// the pool is trimmed while it is tombstoned.
    pub fn release(&mut self, index: usize) {
        let slot = self.live_slot_mut(index);
        if slot.pinned {
            slot.links = slot.links.saturating_sub(1).max(1);
            return;
        }
        slot.links -= 1;
        if slot.links > 0 {
            return;
        }
        slot.payload = None;
        if index + 1 == self.slots.len() {
            self.trim();
        }
    }

    fn trim(&mut self) {
        let before = self.slots.len();
        while self.slots.last().is_some_and(|slot| slot.payload.is_none()) {
            self.slots.pop();
        }
        tracing::debug!(pool = self.label, from = before, to = self.slots.len(), "pool trimmed");
    }

    /// Links held by `index`; zero for a tombstone.
    pub fn links(&self, index: usize) -> usize {
        match self.slots.get(index) {
            Some(slot) => slot.links,
            None => fatal::invariant(format_args!("bad {} index {index}", self.label)),
        }
    }

    pub fn is_live(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|slot| slot.payload.is_some())
    }

    /// Upper bound of the index range in use, tombstones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.payload.is_some()).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (usize, &T, usize)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.payload.as_ref().map(|p| (index, p, slot.links)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Word(&'static str);

    impl Internable for Word {
        fn quick_reject(&self, other: &Self) -> bool {
            self.0.len() != other.0.len()
        }

        fn same(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    #[test]
    fn intern_reuses_live_entry() {
        let mut pool = InternPool::new("word", 4);
        let a = pool.intern(Word("alpha"));
        let b = pool.intern(Word("alpha"));
        assert_eq!(a, b);
        assert_eq!(pool.links(a), 2);
        assert_eq!(pool.live(), 1);
    }

    #[test]
    fn release_reuses_first_tombstone() {
        let mut pool = InternPool::new("word", 4);
        let a = pool.intern(Word("a"));
        let b = pool.intern(Word("b"));
        let _c = pool.intern(Word("c"));
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.intern(Word("d")), a);
    }

    #[test]
    fn trim_is_maximal() {
        let mut pool = InternPool::new("word", 4);
        let a = pool.intern(Word("a"));
        let b = pool.intern(Word("b"));
        let c = pool.intern(Word("c"));
        pool.release(b);
        assert_eq!(pool.len(), 3);
        pool.release(c);
        assert_eq!(pool.len(), 1);
        pool.release(a);
        assert!(pool.is_empty());
    }

    #[test]
    fn grows_by_chunk() {
        let mut pool = InternPool::new("word", 2);
        pool.intern(Word("a"));
        pool.intern(Word("bb"));
        pool.intern(Word("ccc"));
        assert!(pool.capacity() >= 4);
    }

    #[test]
    fn pinned_entries_survive_release() {
        let mut pool = InternPool::new("word", 2);
        let zero = pool.intern_pinned(Word("zero"));
        pool.release(zero);
        pool.release(zero);
        assert!(pool.is_live(zero));
    }

    #[test]
    #[should_panic(expected = "already freed")]
    fn tombstone_access_is_fatal() {
        let mut pool = InternPool::new("word", 2);
        let a = pool.intern(Word("a"));
        pool.intern(Word("b"));
        pool.release(a);
        pool.get(a);
    }

    #[test]
    #[should_panic(expected = "bad word index")]
    fn out_of_range_is_fatal() {
        let pool: InternPool<Word> = InternPool::new("word", 2);
        pool.get(7);
    }
}
