use core::cmp::Ordering;
use core::fmt;

use super::{CompareMode, OrderKey};

/// Handle to an entry in a [`ZOrdered`].
///
/// Stays valid until the entry is removed; a handle to a removed entry is
/// rejected even after its slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    idx: u32,
    generation: u32,
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

struct Node<K, V> {
    generation: u32,
    entry: Option<(K, V)>,
}

/// Values kept sorted by key, stored in an arena.
///
/// Nodes live in one `Vec` and are recycled through a free list. The sort
/// order is a separate sequence of arena indices, so reordering never moves
/// keys or values. Entries with equal keys keep insertion order.
pub struct ZOrdered<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<u32>,
    order: Vec<u32>,
}

impl<K, V> Default for ZOrdered<K, V> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
        }
    }
}

impl<K: OrderKey, V> ZOrdered<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Inserts after every entry whose key compares less than or equal.
    pub fn insert(&mut self, key: K, value: V) -> NodeId {
        let at = self.upper_bound(&key);
        let id = self.alloc(key, value);
        self.order.insert(at, id.idx);
        id
    }

    /// Removes an entry, returning its key and value.
    pub fn remove(&mut self, id: NodeId) -> Option<(K, V)> {
        let at = self.position(id)?;
        self.order.remove(at);
        let node = &mut self.nodes[id.idx as usize];
        let entry = node.entry.take();
        node.generation = node.generation.wrapping_add(1);
        self.free.push(id.idx);
        entry
    }

    /// Replaces an entry's key and moves it to its new place.
    ///
    /// The entry lands after any entries with an equal key. Returns `false`
    /// for a stale handle.
    pub fn rekey(&mut self, id: NodeId, key: K) -> bool {
        let Some(at) = self.position(id) else {
            return false;
        };
        self.order.remove(at);
        let at = self.upper_bound(&key);
        if let Some((k, _)) = self.nodes[id.idx as usize].entry.as_mut() {
            *k = key;
        }
        self.order.insert(at, id.idx);
        true
    }

    pub fn get(&self, id: NodeId) -> Option<(&K, &V)> {
        self.live(id)
    }

    /// First entry (in order) whose key compares equal to `needle` under `mode`.
    ///
    /// With [`CompareMode::Containing`] a point key finds the band holding it.
    /// Keys must not overlap under `mode` for the search to be meaningful.
    pub fn find(&self, needle: &K, mode: CompareMode) -> Option<NodeId> {
        let at = self
            .order
            .partition_point(|&i| self.key_at(i).compare(needle, mode) == Ordering::Less);
        let &idx = self.order.get(at)?;
        if self.key_at(idx).compare(needle, mode) == Ordering::Equal {
            Some(NodeId {
                idx,
                generation: self.nodes[idx as usize].generation,
            })
        } else {
            None
        }
    }

    /// Position of an entry in sort order.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let (key, _) = self.live(id)?;
        let lo = self
            .order
            .partition_point(|&i| self.key_at(i).compare(key, CompareMode::Exact) == Ordering::Less);
        self.order[lo..]
            .iter()
            .position(|&i| i == id.idx)
            .map(|p| lo + p)
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &K, &V)> + '_ {
        self.order.iter().filter_map(move |&idx| {
            let node = &self.nodes[idx as usize];
            node.entry.as_ref().map(|(k, v)| {
                (
                    NodeId {
                        idx,
                        generation: node.generation,
                    },
                    k,
                    v,
                )
            })
        })
    }

    /// Values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, _, v)| v)
    }

    pub fn clear(&mut self) {
        for &idx in &self.order {
            let node = &mut self.nodes[idx as usize];
            node.entry = None;
            node.generation = node.generation.wrapping_add(1);
            self.free.push(idx);
        }
        self.order.clear();
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn alloc(&mut self, key: K, value: V) -> NodeId {
        if let Some(idx) = self.free.pop() {
            let node = &mut self.nodes[idx as usize];
            node.entry = Some((key, value));
            NodeId {
                idx,
                generation: node.generation,
            }
        } else {
            let idx = self.nodes.len() as u32;
            self.nodes.push(Node {
                generation: 0,
                entry: Some((key, value)),
            });
            NodeId { idx, generation: 0 }
        }
    }

    fn live(&self, id: NodeId) -> Option<(&K, &V)> {
        let node = self.nodes.get(id.idx as usize)?;
        if node.generation != id.generation {
            return None;
        }
        node.entry.as_ref().map(|(k, v)| (k, v))
    }

    fn upper_bound(&self, key: &K) -> usize {
        self.order
            .partition_point(|&i| self.key_at(i).compare(key, CompareMode::Exact) != Ordering::Greater)
    }

    /// Key of a node referenced by `order`. Every such node is occupied.
    fn key_at(&self, idx: u32) -> &K {
        match &self.nodes[idx as usize].entry {
            Some((k, _)) => k,
            None => unreachable!("ordered index {idx} points at a free node"),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ZOrdered<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for &idx in &self.order {
            if let Some(entry) = &self.nodes[idx as usize].entry {
                list.entry(entry);
            }
        }
        list.finish()
    }
}
