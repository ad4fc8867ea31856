//! Skip list index, the sorted heart of SkipKV.
//!
//! ```text
//! <head> ----------> [b] --------------------------------> [f] ------->
//! <head> ----------> [b] ----------> [d] ----------------> [f] ------->
//! <head> --> [a] --> [b] --> [c] --> [d] --> [e] --> [e] --> [f] ----->
//! ```
//!
//! Nodes live in an arena and link to each other by slot index. The head
//! holds only forward links, so keys and values need no default. Freed slots
//! go to a free list and are reused by later inserts.
//!
//! **Locking**: one `RwLock` per index. Lookups, `size`, iteration and dumps
//! share the read lock; insert, update, delete and loads take the write lock
//! for their whole duration.
//!
//! **Duplicate keys** are kept. A duplicate is linked after every existing
//! node with an equal key, so equal keys stay in insertion order and lookups,
//! updates and deletes always reach the oldest one first.

use std::borrow::Borrow;
use std::fmt;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::Config;
use crate::error::{KvError, KvResult};
use crate::level::{GeometricLevelGenerator, LevelGenerator, MAX_LEVELS};

/// Arena slot index
type NodeId = usize;

/// Position during a descent: `None` is the head.
type Cursor = Option<NodeId>;

struct Node<K, V> {
    key: K,
    value: V,
    /// One link per level; `forward.len()` is the node's height
    forward: Vec<Option<NodeId>>,
}

/// Lock-protected state of a `SkipList`.
pub(crate) struct Inner<K, V> {
    /// Head links, one per possible level
    head: Vec<Option<NodeId>>,
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
    /// Highest level any live node occupies (1 when empty)
    height: usize,
    len: usize,
    levels: GeometricLevelGenerator,
}

impl<K: Ord, V> Inner<K, V> {
    fn new(config: &Config) -> Self {
        Self {
            head: vec![None; config.max_height],
            nodes: Vec::new(),
            free: Vec::new(),
            height: 1,
            len: 0,
            levels: GeometricLevelGenerator::new(config.max_height, config.probability, config.seed),
        }
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        match self.nodes[id].as_ref() {
            Some(node) => node,
            None => unreachable!("link to freed slot {}", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match self.nodes[id].as_mut() {
            Some(node) => node,
            None => unreachable!("link to freed slot {}", id),
        }
    }

    fn next(&self, at: Cursor, level: usize) -> Option<NodeId> {
        match at {
            None => self.head[level],
            Some(id) => self.node(id).forward[level],
        }
    }

    fn set_next(&mut self, at: Cursor, level: usize, to: Option<NodeId>) {
        match at {
            None => self.head[level] = to,
            Some(id) => self.node_mut(id).forward[level] = to,
        }
    }

    /// Top-down descent. On every level, advance while `advance` accepts the
    /// next key, and record where the walk stopped.
    fn descend<F>(&self, mut advance: F) -> [Cursor; MAX_LEVELS]
    where
        F: FnMut(&K) -> bool,
    {
        let mut preds = [None; MAX_LEVELS];
        let mut at = None;
        for level in (0..self.height).rev() {
            while let Some(next) = self.next(at, level) {
                if !advance(&self.node(next).key) {
                    break;
                }
                at = Some(next);
            }
            preds[level] = at;
        }
        preds
    }

    /// First node (in list order) whose key equals `key`.
    fn find_first<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let preds = self.descend(|k| Borrow::<Q>::borrow(k) < key);
        let candidate = self.next(preds[0], 0)?;
        (Borrow::<Q>::borrow(&self.node(candidate).key) == key).then_some(candidate)
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    pub(crate) fn insert(&mut self, key: K, value: V) {
        // `<=` places the node after any equal keys
        let preds = self.descend(|k| *k <= key);

        let height = self.levels.random();
        if height > self.height {
            log::trace!("skip list height {} -> {}", self.height, height);
            // preds above the old height are already the head
            self.height = height;
        }

        let id = self.alloc(Node { key, value, forward: vec![None; height] });
        for (level, &pred) in preds.iter().enumerate().take(height) {
            let after = self.next(pred, level);
            self.node_mut(id).forward[level] = after;
            self.set_next(pred, level, Some(id));
        }
        self.len += 1;
    }

    fn update<Q>(&mut self, key: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.find_first(key) {
            Some(id) => {
                self.node_mut(id).value = value;
                true
            }
            None => false,
        }
    }

    fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let preds = self.descend(|k| Borrow::<Q>::borrow(k) < key);
        let target = match self.next(preds[0], 0) {
            Some(id) if Borrow::<Q>::borrow(&self.node(id).key) == key => id,
            _ => return false,
        };

        for (level, &pred) in preds.iter().enumerate().take(self.height) {
            // Levels are a contiguous prefix: once the target is missing here,
            // nothing above references it either.
            if self.next(pred, level) != Some(target) {
                break;
            }
            let after = self.node(target).forward[level];
            self.set_next(pred, level, after);
        }

        while self.height > 1 && self.head[self.height - 1].is_none() {
            self.height -= 1;
            log::trace!("skip list height shrank to {}", self.height);
        }

        self.nodes[target] = None;
        self.free.push(target);
        self.len -= 1;
        true
    }

    /// Level-0 walk in ascending key order.
    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter { inner: self, at: self.head[0] }
    }

    /// Walk of a single level, for rendering.
    fn iter_level(&self, level: usize) -> impl Iterator<Item = (&K, &V)> + '_ {
        let mut at = self.head[level];
        std::iter::from_fn(move || {
            let node = self.node(at?);
            at = node.forward[level];
            Some((&node.key, &node.value))
        })
    }
}

/// Ascending iterator over the bottom level.
pub(crate) struct Iter<'a, K, V> {
    inner: &'a Inner<K, V>,
    at: Option<NodeId>,
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.inner.node(self.at?);
        self.at = node.forward[0];
        Some((&node.key, &node.value))
    }
}

/// Concurrent, sorted, probabilistically balanced key-value index.
///
/// All methods take `&self`; share it across threads with `Arc`.
pub struct SkipList<K, V> {
    inner: RwLock<Inner<K, V>>,
    max_height: usize,
}

impl<K: Ord, V> SkipList<K, V> {
    /// Empty index with `Config::standard()` shape (32 levels, p = 0.25).
    pub fn new() -> Self {
        let config = Config::standard();
        Self {
            inner: RwLock::new(Inner::new(&config)),
            max_height: config.max_height,
        }
    }

    /// Empty index shaped by `config`.
    pub fn with_config(config: &Config) -> KvResult<Self> {
        config.validate().map_err(|reason| KvError::InvalidConfig { reason })?;
        Ok(Self {
            inner: RwLock::new(Inner::new(config)),
            max_height: config.max_height,
        })
    }

    /// Add a node. Never replaces: an existing key gains a second node.
    /// Always returns `true`.
    pub fn insert(&self, key: K, value: V) -> bool {
        self.inner.write().insert(key, value);
        true
    }

    /// Replace the value of the first node with `key`.
    /// Returns `false` if the key is absent.
    pub fn update<Q>(&self, key: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.write().update(key, value)
    }

    /// Unlink the first node with `key`. Returns `false` if the key is absent.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.write().delete(key)
    }

    /// Copy of the value stored under the first node with `key`.
    pub fn find<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        V: Clone,
    {
        let inner = self.inner.read();
        inner.find_first(key).map(|id| inner.node(id).value.clone())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.read().find_first(key).is_some()
    }

    /// Number of nodes, duplicates included.
    pub fn size(&self) -> usize {
        self.inner.read().len
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of levels currently in use.
    pub fn height(&self) -> usize {
        self.inner.read().height
    }

    pub fn max_height(&self) -> usize {
        self.max_height
    }

    /// All entries in ascending key order (equal keys in insertion order).
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let inner = self.inner.read();
        inner.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Inner<K, V>> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Inner<K, V>> {
        self.inner.write()
    }
}

impl<K: Ord, V> Default for SkipList<K, V> {
    fn default() -> Self { Self::new() }
}

/// One line per level, top first: `Level 2: b:1; d:3; `
impl<K, V> fmt::Display for SkipList<K, V>
where
    K: Ord + fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        for level in (0..inner.height).rev() {
            write!(f, "Level {}: ", level + 1)?;
            for (key, value) in inner.iter_level(level) {
                write!(f, "{}:{}; ", key, value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
impl<K: Ord, V> SkipList<K, V> {
    /// Panics if any structural invariant is broken.
    fn assert_invariants(&self) {
        let inner = self.inner.read();

        for level in 0..inner.head.len() {
            let chain: Vec<NodeId> = {
                let mut ids = Vec::new();
                let mut at = inner.head[level];
                while let Some(id) = at {
                    ids.push(id);
                    at = inner.node(id).forward[level];
                }
                ids
            };
            if level >= inner.height {
                assert!(chain.is_empty(), "level {} above height {} is linked", level, inner.height);
                continue;
            }
            for pair in chain.windows(2) {
                assert!(inner.node(pair[0]).key <= inner.node(pair[1]).key, "level {} out of order", level);
            }
            let expected = inner.nodes.iter().flatten().filter(|n| n.forward.len() > level).count();
            assert_eq!(chain.len(), expected, "level {} misses nodes", level);
            if level == 0 {
                assert_eq!(chain.len(), inner.len, "len disagrees with level 0");
            }
        }

        let tallest = inner.nodes.iter().flatten().map(|n| n.forward.len()).max().unwrap_or(1);
        assert_eq!(inner.height, tallest.max(1));
        assert!(inner.height <= self.max_height);
        assert_eq!(inner.len + inner.free.len(), inner.nodes.len());
    }
}
