//! LRU List Module
//!
//! Implements Least Recently Used ordering for cache eviction.

// == Node Handle ==
/// Stable handle to a position in an [`LruList`].
///
/// Handles stay valid until the node is removed or popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU List ==
/// Doubly linked recency list stored in an arena.
///
/// - Front (head) = most recently used
/// - Back (tail) = least recently used
///
/// Nodes live in a `Vec` and link to each other by index; freed slots are
/// recycled through a free list, so every operation is O(1).
#[derive(Debug)]
pub struct LruList<K> {
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K> Default for LruList<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> LruList<K> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts a key as the most recently used entry.
    pub fn push_front(&mut self, key: K) -> NodeId {
        let node = Node {
            key,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.link_front(idx);
        self.len += 1;
        NodeId(idx)
    }

    // == Touch ==
    /// Marks an entry as recently used (moves it to the front).
    pub fn touch(&mut self, id: NodeId) {
        if self.head == Some(id.0) || self.node(id.0).is_none() {
            return;
        }
        self.unlink(id.0);
        self.link_front(id.0);
    }

    // == Remove ==
    /// Removes an entry, returning its key.
    pub fn remove(&mut self, id: NodeId) -> Option<K> {
        self.node(id.0)?;
        self.unlink(id.0);
        let node = self.nodes[id.0].take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node.key)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used key.
    ///
    /// Returns None if the list is empty.
    pub fn pop_back(&mut self) -> Option<K> {
        let tail = self.tail?;
        self.remove(NodeId(tail))
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Iterate ==
    /// Iterates keys from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        std::iter::successors(self.head.and_then(|idx| self.node(idx)), move |node| {
            node.next.and_then(|idx| self.node(idx))
        })
        .map(|node| &node.key)
    }

    fn node(&self, idx: usize) -> Option<&Node<K>> {
        self.nodes.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<K>> {
        self.nodes.get_mut(idx).and_then(Option::as_mut)
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head.and_then(|head| self.node_mut(head)) {
            Some(head) => head.prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.node(idx) {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        match prev.and_then(|p| self.node_mut(p)) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.node_mut(n)) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = None;
        }
    }
}
