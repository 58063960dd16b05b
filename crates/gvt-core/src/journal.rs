//! Undo journals for engine state
//!
//! Engines mutate their live state in place and keep just enough to undo the
//! current call: the prior value of every map entry touched, and a backup of
//! any wholesale field written. `commit` forgets the undo records,
//! `rollback` replays them in reverse.
//!
//! | Wrapper | Records on write | Cost per call |
//! |---------|------------------|---------------|
//! | [`JournaledMap`] | prior value of the entry | entries touched |
//! | [`Staged`] | clone of the whole value, once | only when written |

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::ops::Deref;

/// State that can undo everything written since its last commit
pub trait Journaled {
    fn commit(&mut self);
    fn rollback(&mut self);
}

/// Ordered map that records the prior value of every entry it changes
#[derive(Debug, Clone)]
pub struct JournaledMap<K, V> {
    entries: BTreeMap<K, V>,
    undo: Vec<(K, Option<V>)>,
}

impl<K, V> Default for JournaledMap<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            undo: Vec::new(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> JournaledMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let old = self.entries.insert(key.clone(), value);
        self.undo.push((key, old.clone()));
        old
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let old = self.entries.remove(key);
        if old.is_some() {
            self.undo.push((key.clone(), old.clone()));
        }
        old
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let old = self.entries.get(key)?.clone();
        self.undo.push((key.clone(), Some(old)));
        self.entries.get_mut(key)
    }

    /// Mutable entry, inserting `V::default()` when absent
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let old = self.entries.get(&key).cloned();
        self.undo.push((key.clone(), old));
        self.entries.entry(key).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Undo records held for the current call
    pub fn pending_changes(&self) -> usize {
        self.undo.len()
    }
}

impl<K: Ord + Clone, V: Clone> Journaled for JournaledMap<K, V> {
    fn commit(&mut self) {
        self.undo.clear();
    }

    fn rollback(&mut self) {
        while let Some((key, old)) = self.undo.pop() {
            match old {
                Some(value) => {
                    self.entries.insert(key, value);
                }
                None => {
                    self.entries.remove(&key);
                }
            }
        }
    }
}

/// Value backed up on first write and restored on rollback
#[derive(Debug, Clone, Default)]
pub struct Staged<T> {
    value: T,
    backup: Option<T>,
}

impl<T: Clone> Staged<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            backup: None,
        }
    }

    pub fn make_mut(&mut self) -> &mut T {
        if self.backup.is_none() {
            self.backup = Some(self.value.clone());
        }
        &mut self.value
    }
}

impl<T> Deref for Staged<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Clone> Journaled for Staged<T> {
    fn commit(&mut self) {
        self.backup = None;
    }

    fn rollback(&mut self) {
        if let Some(backup) = self.backup.take() {
            self.value = backup;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_restores_touched_entries() {
        let mut map = JournaledMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.commit();

        map.insert("a", 10);
        *map.get_mut(&"b").unwrap() += 5;
        *map.get_or_default("c") += 3;
        map.remove(&"a");
        assert_eq!(map.len(), 2);

        map.rollback();
        assert_eq!(map.get(&"a"), Some(&1));
        assert_eq!(map.get(&"b"), Some(&2));
        assert!(!map.contains_key(&"c"));
        assert_eq!(map.pending_changes(), 0);
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut map = JournaledMap::new();
        map.insert(1u8, "x");
        map.commit();
        map.rollback();
        assert_eq!(map.get(&1), Some(&"x"));
    }

    #[test]
    fn test_staged_backs_up_once() {
        let mut staged = Staged::new(vec![1]);
        staged.make_mut().push(2);
        staged.make_mut().push(3);
        assert_eq!(*staged, vec![1, 2, 3]);
        staged.rollback();
        assert_eq!(*staged, vec![1]);

        staged.make_mut().push(4);
        staged.commit();
        staged.rollback();
        assert_eq!(*staged, vec![1, 4]);
    }
}
