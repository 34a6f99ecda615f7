//! Arena-backed doubly linked list of queued items.
//!
//! Nodes live in a `Vec` and link to each other by index; vacated slots are
//! chained into a free list and reused, so indices handed out stay valid until
//! the node they name is removed. Head removal is O(1), positional insertion
//! is O(1) once the caller has walked to the neighbour.

use super::QueueItem;

#[derive(Debug)]
struct Node<T> {
    item: QueueItem<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
enum Slot<T> {
    Occupied(Node<T>),
    Vacant { next_free: Option<usize> },
}

#[derive(Debug)]
pub(crate) struct OrderedList<T> {
    slots: Vec<Slot<T>>,
    free: Option<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> OrderedList<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: None,
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn front(&self) -> Option<&QueueItem<T>> {
        self.head.and_then(|index| self.node(index)).map(|node| &node.item)
    }

    pub(crate) fn back(&self) -> Option<&QueueItem<T>> {
        self.tail.and_then(|index| self.node(index)).map(|node| &node.item)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut QueueItem<T>> {
        match self.slots.get_mut(index) {
            Some(Slot::Occupied(node)) => Some(&mut node.item),
            _ => None,
        }
    }

    pub(crate) fn push_back(&mut self, item: QueueItem<T>) -> usize {
        let prev = self.tail;
        let index = self.allocate(Node {
            item,
            prev,
            next: None,
        });
        match prev.and_then(|tail| self.node_mut(tail)) {
            Some(node) => node.next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        index
    }

    /// Links `item` immediately before the node at `at`. Falls back to
    /// `push_back` when `at` does not name a live node.
    pub(crate) fn insert_before(&mut self, at: usize, item: QueueItem<T>) -> usize {
        let Some(prev) = self.node(at).map(|node| node.prev) else {
            return self.push_back(item);
        };
        let index = self.allocate(Node {
            item,
            prev,
            next: Some(at),
        });
        if let Some(node) = self.node_mut(at) {
            node.prev = Some(index);
        }
        match prev.and_then(|prev| self.node_mut(prev)) {
            Some(node) => node.next = Some(index),
            None => self.head = Some(index),
        }
        index
    }

    pub(crate) fn pop_front(&mut self) -> Option<QueueItem<T>> {
        let index = self.head?;
        let node = self.release(index)?;
        self.head = node.next;
        match node.next.and_then(|next| self.node_mut(next)) {
            Some(next) => next.prev = None,
            None => self.tail = None,
        }
        Some(node.item)
    }

    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Like [`iter`](Self::iter) but also yields each node's arena index.
    pub(crate) fn iter_indexed(&self) -> impl Iterator<Item = (usize, &QueueItem<T>)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let index = cursor?;
            let node = self.node(index)?;
            cursor = node.next;
            Some((index, &node.item))
        })
    }

    pub(crate) fn into_vec(mut self) -> Vec<QueueItem<T>> {
        let mut items = Vec::with_capacity(self.len);
        while let Some(item) = self.pop_front() {
            items.push(item);
        }
        items
    }

    fn node(&self, index: usize) -> Option<&Node<T>> {
        match self.slots.get(index) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    fn node_mut(&mut self, index: usize) -> Option<&mut Node<T>> {
        match self.slots.get_mut(index) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    fn allocate(&mut self, node: Node<T>) -> usize {
        self.len += 1;
        match self.free {
            Some(index) => {
                let slot = std::mem::replace(&mut self.slots[index], Slot::Occupied(node));
                self.free = match slot {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => None,
                };
                index
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) -> Option<Node<T>> {
        let slot = self.slots.get_mut(index)?;
        if !matches!(slot, Slot::Occupied(_)) {
            return None;
        }
        let vacant = Slot::Vacant {
            next_free: self.free,
        };
        match std::mem::replace(slot, vacant) {
            Slot::Occupied(node) => {
                self.free = Some(index);
                self.len -= 1;
                Some(node)
            }
            Slot::Vacant { .. } => None,
        }
    }
}

pub(crate) struct Iter<'a, T> {
    list: &'a OrderedList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a QueueItem<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.item)
    }
}
