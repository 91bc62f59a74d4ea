//! Ordered list with optional unique keys and cursor-based editing
//!
//! Entries live in an arena of slots linked by `prev`/`next` indices, and a
//! hash index maps each key to its slot. A [`Cursor`] is a plain value that
//! sits between two entries; inserting or removing through it keeps its
//! position valid. Any other mutation leaves outstanding cursors pointing at
//! an unspecified position, so callers re-seek afterwards.

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::Hash;
use hashbrown::HashMap;

use crate::error::{FitsError, Result};

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: Option<K>,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Position between two entries of a [`KeyedList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Slot of the entry after the cursor, `None` at the end
    before: Option<usize>,
    /// Slot last returned by `next`/`prev`
    last: Option<usize>,
}

impl Cursor {
    /// True when the cursor sits after the last entry
    pub fn at_end(&self) -> bool {
        self.before.is_none()
    }
}

/// Insertion-ordered collection with at most one entry per key
#[derive(Debug, Clone)]
pub struct KeyedList<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: HashMap<K, usize>,
    len: usize,
}

impl<K, V> Default for KeyedList<K, V>
where
    K: Hash + Eq + Clone + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyedList<K, V>
where
    K: Hash + Eq + Clone + fmt::Display,
{
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            index: HashMap::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn node(&self, slot: usize) -> Option<&Node<K, V>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node<K, V>> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.node(slot).map(|n| &n.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.node_mut(slot).map(|n| &mut n.value)
    }

    /// Position of `key` counting from the head
    pub fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let target = *self.index.get(key)?;
        let mut slot = self.head;
        let mut pos = 0;
        while let Some(s) = slot {
            if s == target {
                return Some(pos);
            }
            pos += 1;
            slot = self.node(s).and_then(|n| n.next);
        }
        None
    }

    /// Cursor before the first entry
    pub fn cursor(&self) -> Cursor {
        Cursor {
            before: self.head,
            last: None,
        }
    }

    /// Cursor after the last entry
    pub fn cursor_end(&self) -> Cursor {
        Cursor::default()
    }

    /// Cursor before the entry at position `n`, or at the end
    pub fn cursor_at(&self, n: usize) -> Cursor {
        let mut slot = self.head;
        for _ in 0..n {
            match slot {
                Some(s) => slot = self.node(s).and_then(|node| node.next),
                None => break,
            }
        }
        Cursor {
            before: slot,
            last: None,
        }
    }

    /// Cursor immediately before `key`, or at the end when it is absent
    pub fn seek<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Cursor {
            before: self.index.get(key).copied(),
            last: None,
        }
    }

    pub fn has_next(&self, cursor: &Cursor) -> bool {
        cursor.before.is_some_and(|s| self.node(s).is_some())
    }

    pub fn has_prev(&self, cursor: &Cursor) -> bool {
        self.prev_slot(cursor).is_some()
    }

    fn prev_slot(&self, cursor: &Cursor) -> Option<usize> {
        match cursor.before {
            Some(s) => self.node(s)?.prev,
            None => self.tail,
        }
    }

    /// Step forward over one entry and return it
    pub fn next<'a>(&'a self, cursor: &mut Cursor) -> Option<&'a V> {
        let slot = cursor.before?;
        let node = self.node(slot)?;
        cursor.before = node.next;
        cursor.last = Some(slot);
        Some(&node.value)
    }

    /// Step backward over one entry and return it
    pub fn prev<'a>(&'a self, cursor: &mut Cursor) -> Option<&'a V> {
        let slot = self.prev_slot(cursor)?;
        let node = self.node(slot)?;
        cursor.before = Some(slot);
        cursor.last = Some(slot);
        Some(&node.value)
    }

    /// Key and value of the entry last crossed by the cursor
    pub fn last_entry(&self, cursor: &Cursor) -> Option<(Option<&K>, &V)> {
        let node = self.node(cursor.last?)?;
        Some((node.key.as_ref(), &node.value))
    }

    /// Mutable access to the entry last crossed by the cursor
    pub fn last_value_mut(&mut self, cursor: &Cursor) -> Option<&mut V> {
        let slot = cursor.last?;
        self.node_mut(slot).map(|n| &mut n.value)
    }

    fn check_unique(&self, key: &Option<K>) -> Result<()> {
        match key {
            Some(k) if self.index.contains_key(k) => Err(FitsError::DuplicateKey { key: k.to_string() }),
            _ => Ok(()),
        }
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Link a new entry before `before` (or at the tail) and return its slot
    fn link_before(&mut self, before: Option<usize>, key: Option<K>, value: V) -> usize {
        let before = before.filter(|&s| self.node(s).is_some());
        let prev = match before {
            Some(s) => self.node(s).and_then(|n| n.prev),
            None => self.tail,
        };
        let slot = self.alloc(Node {
            key: key.clone(),
            value,
            prev,
            next: before,
        });

        match prev {
            Some(p) => {
                if let Some(n) = self.node_mut(p) {
                    n.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        match before {
            Some(b) => {
                if let Some(n) = self.node_mut(b) {
                    n.prev = Some(slot);
                }
            }
            None => self.tail = Some(slot),
        }

        if let Some(k) = key {
            self.index.insert(k, slot);
        }
        self.len += 1;
        slot
    }

    fn unlink(&mut self, slot: usize) -> Option<Node<K, V>> {
        let node = self.slots.get_mut(slot)?.take()?;
        match node.prev {
            Some(p) => {
                if let Some(n) = self.node_mut(p) {
                    n.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(nx) => {
                if let Some(n) = self.node_mut(nx) {
                    n.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
        if let Some(k) = &node.key {
            self.index.remove(k);
        }
        self.free.push(slot);
        self.len -= 1;
        Some(node)
    }

    /// Insert an unkeyed entry at the cursor; the cursor ends up after it
    pub fn insert(&mut self, cursor: &mut Cursor, value: V) {
        self.link_before(cursor.before, None, value);
        cursor.last = None;
    }

    /// Insert a keyed entry at the cursor, failing if the key is present
    pub fn insert_keyed(&mut self, cursor: &mut Cursor, key: K, value: V) -> Result<()> {
        let key = Some(key);
        self.check_unique(&key)?;
        self.link_before(cursor.before, key, value);
        cursor.last = None;
        Ok(())
    }

    /// Append an unkeyed entry at the tail
    pub fn push(&mut self, value: V) {
        self.link_before(None, None, value);
    }

    /// Append a keyed entry at the tail, failing if the key is present
    pub fn push_keyed(&mut self, key: K, value: V) -> Result<()> {
        let key = Some(key);
        self.check_unique(&key)?;
        self.link_before(None, key, value);
        Ok(())
    }

    /// Remove the entry last returned through `cursor`
    ///
    /// Does nothing unless `next` or `prev` was called since the last
    /// insert or remove through this cursor.
    pub fn remove(&mut self, cursor: &mut Cursor) -> Option<V> {
        let slot = cursor.last.take()?;
        let node = self.unlink(slot)?;
        if cursor.before == Some(slot) {
            cursor.before = node.next;
        }
        Some(node.value)
    }

    pub fn remove_key<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.unlink(slot).map(|n| n.value)
    }

    /// Rename `old` to `new` in place
    ///
    /// Returns `Ok(false)` when `old` is absent.
    pub fn replace_key<Q>(&mut self, old: &Q, new: K) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let new_ref: &Q = new.borrow();
        if old == new_ref {
            return Ok(self.contains_key(old));
        }
        if self.index.contains_key(&new) {
            return Err(FitsError::DuplicateKey { key: new.to_string() });
        }
        let Some(slot) = self.index.remove(old) else {
            return Ok(false);
        };
        if let Some(n) = self.node_mut(slot) {
            n.key = Some(new.clone());
        }
        self.index.insert(new, slot);
        Ok(true)
    }

    /// Stable reorder of all entries
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let mut order = self.slot_order();
        order.sort_by(|&a, &b| match (self.node(a), self.node(b)) {
            (Some(x), Some(y)) => compare(&x.value, &y.value),
            _ => Ordering::Equal,
        });
        self.relink(&order);
    }

    fn slot_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.len);
        let mut slot = self.head;
        while let Some(s) = slot {
            order.push(s);
            slot = self.node(s).and_then(|n| n.next);
        }
        order
    }

    fn relink(&mut self, order: &[usize]) {
        self.head = order.first().copied();
        self.tail = order.last().copied();
        for (i, &slot) in order.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| order[p]);
            let next = order.get(i + 1).copied();
            if let Some(n) = self.node_mut(slot) {
                n.prev = prev;
                n.next = next;
            }
        }
    }

    /// Entries from head to tail
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            slot: self.head,
            remaining: self.len,
        }
    }

    /// Values from head to tail
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}

/// Iterator over `(key, value)` pairs in list order
pub struct Iter<'a, K, V> {
    list: &'a KeyedList<K, V>,
    slot: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Option<&'a K>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slot?;
        let node = self.list.slots.get(slot).and_then(Option::as_ref)?;
        self.slot = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((node.key.as_ref(), &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KeyedList<String, i32> {
        let mut list = KeyedList::new();
        list.push_keyed("key1".to_string(), 1).unwrap();
        list.push_keyed("key2".to_string(), 2).unwrap();
        list.push(3);
        list.push_keyed("key4".to_string(), 4).unwrap();
        list
    }

    fn values(list: &KeyedList<String, i32>) -> Vec<i32> {
        list.values().copied().collect()
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut list = sample();
        let err = list.push_keyed("key2".to_string(), 9).unwrap_err();
        assert_eq!(err, FitsError::DuplicateKey { key: "key2".to_string() });
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_seek_and_iterate() {
        let list = sample();
        let mut cur = list.seek(&"key2".to_string());
        assert_eq!(list.next(&mut cur), Some(&2));
        assert_eq!(list.next(&mut cur), Some(&3));
        assert_eq!(list.next(&mut cur), Some(&4));
        assert_eq!(list.next(&mut cur), None);
        assert!(cur.at_end());

        let mut missing = list.seek(&"nope".to_string());
        assert!(missing.at_end());
        assert_eq!(list.next(&mut missing), None);
        assert_eq!(list.prev(&mut missing), Some(&4));
    }

    #[test]
    fn test_prev_and_next() {
        let list = sample();
        let mut cur = list.cursor_at(2);
        assert!(list.has_prev(&cur));
        assert_eq!(list.prev(&mut cur), Some(&2));
        assert_eq!(list.prev(&mut cur), Some(&1));
        assert_eq!(list.prev(&mut cur), None);
        assert!(!list.has_prev(&cur));
        assert_eq!(list.next(&mut cur), Some(&1));
    }

    #[test]
    fn test_insert_at_cursor() {
        let mut list = sample();
        let mut cur = list.seek(&"key2".to_string());
        list.insert(&mut cur, 10);
        list.insert_keyed(&mut cur, "key11".to_string(), 11).unwrap();
        assert_eq!(values(&list), vec![1, 10, 11, 2, 3, 4]);
        // cursor still sits before key2
        assert_eq!(list.next(&mut cur), Some(&2));

        let mut end = list.cursor_end();
        list.insert(&mut end, 99);
        assert_eq!(values(&list).last(), Some(&99));
    }

    #[test]
    fn test_remove_through_cursor() {
        let mut list = sample();
        let mut cur = list.cursor();
        assert_eq!(list.remove(&mut cur), None);

        list.next(&mut cur);
        list.next(&mut cur);
        assert_eq!(list.remove(&mut cur), Some(2));
        assert_eq!(list.remove(&mut cur), None);
        assert!(!list.contains_key(&"key2".to_string()));
        assert_eq!(list.next(&mut cur), Some(&3));

        list.prev(&mut cur);
        assert_eq!(list.remove(&mut cur), Some(3));
        assert_eq!(list.next(&mut cur), Some(&4));
        assert_eq!(values(&list), vec![1, 4]);
    }

    #[test]
    fn test_remove_key_and_reuse_slot() {
        let mut list = sample();
        assert_eq!(list.remove_key(&"key1".to_string()), Some(1));
        assert_eq!(list.remove_key(&"key1".to_string()), None);
        list.push_keyed("key5".to_string(), 5).unwrap();
        assert_eq!(values(&list), vec![2, 3, 4, 5]);
        assert_eq!(list.position(&"key5".to_string()), Some(3));
        assert_eq!(list.get(&"key5".to_string()), Some(&5));
    }

    #[test]
    fn test_replace_key() {
        let mut list = sample();
        assert!(list.replace_key(&"key1".to_string(), "first".to_string()).unwrap());
        assert!(!list.contains_key(&"key1".to_string()));
        assert_eq!(list.get(&"first".to_string()), Some(&1));
        assert!(list.replace_key(&"first".to_string(), "key2".to_string()).is_err());
        assert!(!list.replace_key(&"gone".to_string(), "x".to_string()).unwrap());
    }

    #[test]
    fn test_sort_is_stable() {
        let mut list: KeyedList<String, (i32, char)> = KeyedList::new();
        for (i, v) in [(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')].into_iter().enumerate() {
            list.push_keyed(format!("k{i}"), v).unwrap();
        }
        list.sort_by(|a, b| a.0.cmp(&b.0));
        let order: Vec<char> = list.values().map(|v| v.1).collect();
        assert_eq!(order, vec!['b', 'd', 'a', 'c']);

        let mut cur = list.seek(&"k2".to_string());
        assert_eq!(list.next(&mut cur), Some(&(2, 'c')));
        assert_eq!(list.next(&mut cur), None);
    }

    #[test]
    fn test_last_entry() {
        let mut list = sample();
        let mut cur = list.cursor();
        list.next(&mut cur);
        let (key, value) = list.last_entry(&cur).unwrap();
        assert_eq!(key.map(String::as_str), Some("key1"));
        assert_eq!(*value, 1);
        *list.last_value_mut(&cur).unwrap() = 100;
        assert_eq!(list.get(&"key1".to_string()), Some(&100));
    }
}
