//! Ordered card collection
//!
//! A doubly-linked sequence of cards stored in an arena of slots. Links are
//! slot indices rather than references, so nodes can point both ways without
//! ownership cycles, and a `NodeId` stays valid until its card is removed.
//! Vacated slots are recycled through a free list.
//!
//! Head/tail operations are O(1). Positional access walks from whichever end
//! is closer; sorted insertion scans from the head.

use std::fmt;

use chrono::NaiveDate;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Card, InsertMode};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("Index out of range: {index}, size: {len}")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("Invalid insertion range [{start}, {end}] for size {len}")]
    RangeError { start: usize, end: usize, len: usize },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Card not found: {0}")]
    CardNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, CollectionError>;

/// Stable handle to a node in a `CardCollection`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node {
    card: Card,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct CardCollection {
    slots: Vec<Option<Node>>,
    free: Vec<u32>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl CardCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection by inserting each card with `mode`
    pub fn from_cards<I>(cards: I, mode: InsertMode, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = Card>,
    {
        let mut collection = Self::new();
        for card in cards {
            collection.insert(card, mode, today);
        }
        collection
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn get(&self, id: NodeId) -> Option<&Card> {
        self.node(id).map(|n| &n.card)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Card> {
        self.node_mut(id).map(|n| &mut n.card)
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.next)
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.prev)
    }

    /// Node holding the card with `card_id`, scanning from the head
    pub fn find(&self, card_id: Uuid) -> Option<NodeId> {
        self.iter()
            .find(|(_, card)| card.id == card_id)
            .map(|(id, _)| id)
    }

    /// Zero-based position of a node, scanning from the head
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.iter().position(|(node, _)| node == id)
    }

    /// Node at `index`, walking from the nearer end
    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        if index >= self.len {
            return None;
        }
        if index < self.len / 2 {
            let mut current = self.head;
            for _ in 0..index {
                current = current.and_then(|id| self.next(id));
            }
            current
        } else {
            let mut current = self.tail;
            for _ in 0..(self.len - index - 1) {
                current = current.and_then(|id| self.prev(id));
            }
            current
        }
    }

    /// Insert `card` as the new head
    pub fn push_front(&mut self, card: Card) -> NodeId {
        let id = self.alloc(card);
        match self.head {
            Some(old_head) => {
                if let Some(node) = self.node_mut(old_head) {
                    node.prev = Some(id);
                }
                if let Some(node) = self.node_mut(id) {
                    node.next = Some(old_head);
                }
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
        id
    }

    /// Insert `card` as the new tail
    pub fn push_back(&mut self, card: Card) -> NodeId {
        let id = self.alloc(card);
        match self.tail {
            Some(old_tail) => {
                if let Some(node) = self.node_mut(old_tail) {
                    node.next = Some(id);
                }
                if let Some(node) = self.node_mut(id) {
                    node.prev = Some(old_tail);
                }
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    /// Insert `card` according to `mode`. `today` is only consulted by
    /// `InsertMode::DueAware`.
    pub fn insert(&mut self, card: Card, mode: InsertMode, today: NaiveDate) -> NodeId {
        match mode {
            InsertMode::Front => self.push_front(card),
            InsertMode::Append => self.push_back(card),
            InsertMode::Alphabetical => self.insert_alphabetical(card),
            InsertMode::DueAware => self.insert_due_aware(card, today),
        }
    }

    /// Walk from the head past every card whose term is greater than the new
    /// term and insert before the first card whose term is less or equal.
    /// The collection therefore reads in descending term order, with a new
    /// card placed ahead of any equal terms.
    pub fn insert_alphabetical(&mut self, card: Card) -> NodeId {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let Some(node) = self.node(id) else { break };
            if node.card.term <= card.term {
                break;
            }
            cursor = node.next;
        }
        self.insert_before_or_append(cursor, card)
    }

    /// Due cards (`memorization_date <= today`) form a prefix and the rest a
    /// suffix; each partition is kept in descending term order. The boundary
    /// is found by scanning.
    pub fn insert_due_aware(&mut self, card: Card, today: NaiveDate) -> NodeId {
        let card_due = card.memorization_date <= today;
        let mut cursor = self.head;

        if !card_due {
            while let Some(id) = cursor {
                let Some(node) = self.node(id) else { break };
                if node.card.memorization_date > today {
                    break;
                }
                cursor = node.next;
            }
        }

        while let Some(id) = cursor {
            let Some(node) = self.node(id) else { break };
            let existing_due = node.card.memorization_date <= today;
            if card_due && !existing_due {
                break;
            }
            if node.card.term <= card.term {
                break;
            }
            cursor = node.next;
        }

        self.insert_before_or_append(cursor, card)
    }

    /// Insert at a zero-based position. `0` inserts at the head, and both
    /// `len` and `-1` append.
    pub fn insert_at(&mut self, card: Card, index: isize) -> Result<NodeId> {
        let len = self.len;
        if index == 0 {
            return Ok(self.push_front(card));
        }
        if index == -1 || (index > 0 && index as usize == len) {
            return Ok(self.push_back(card));
        }
        if index < 0 || index as usize > len {
            return Err(CollectionError::IndexOutOfRange { index, len });
        }
        let anchor = self
            .node_at(index as usize)
            .ok_or(CollectionError::IndexOutOfRange { index, len })?;
        Ok(self.link_before(anchor, card))
    }

    /// Remove and return the card at a zero-based position; `-1` is the tail
    pub fn delete_at(&mut self, index: isize) -> Result<Card> {
        let len = self.len;
        let resolved = if index == -1 && len > 0 {
            len - 1
        } else if index < 0 || index as usize >= len {
            return Err(CollectionError::IndexOutOfRange { index, len });
        } else {
            index as usize
        };
        let id = self
            .node_at(resolved)
            .ok_or(CollectionError::IndexOutOfRange { index, len })?;
        self.remove(id)
    }

    /// Unlink a node and return its card
    pub fn remove(&mut self, id: NodeId) -> Result<Card> {
        let node = self
            .slots
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(CollectionError::NodeNotFound(id))?;

        match (node.prev, node.next) {
            (Some(p), Some(n)) => {
                if let Some(prev) = self.node_mut(p) {
                    prev.next = Some(n);
                }
                if let Some(next) = self.node_mut(n) {
                    next.prev = Some(p);
                }
            }
            (None, Some(n)) => {
                if let Some(next) = self.node_mut(n) {
                    next.prev = None;
                }
                self.head = Some(n);
            }
            (Some(p), None) => {
                if let Some(prev) = self.node_mut(p) {
                    prev.next = None;
                }
                self.tail = Some(p);
            }
            (None, None) => {
                self.head = None;
                self.tail = None;
            }
        }

        self.free.push(id.0);
        self.len -= 1;
        Ok(node.card)
    }

    /// Remove the card with `card_id`
    pub fn remove_card(&mut self, card_id: Uuid) -> Result<Card> {
        let id = self
            .find(card_id)
            .ok_or(CollectionError::CardNotFound(card_id))?;
        self.remove(id)
    }

    /// Insert `card` at a uniformly drawn position in `[start, end]`.
    ///
    /// Both bounds must lie within `[0, len]` and `start <= end`; otherwise
    /// nothing is inserted.
    pub fn random_insert<R>(
        &mut self,
        card: Card,
        start: usize,
        end: usize,
        rng: &mut R,
    ) -> Result<NodeId>
    where
        R: Rng + ?Sized,
    {
        let len = self.len;
        if start > end || end > len {
            return Err(CollectionError::RangeError { start, end, len });
        }
        let position = rng.gen_range(start..=end);
        log::trace!("random insert of {} at {} in [{}, {}]", card.id, position, start, end);
        self.insert_at(card, position as isize)
    }

    /// Iterate head to tail
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            collection: self,
            current: self.head,
            forward: true,
        }
    }

    /// Iterate tail to head
    pub fn iter_rev(&self) -> Iter<'_> {
        Iter {
            collection: self,
            current: self.tail,
            forward: false,
        }
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.iter().map(|(_, card)| card)
    }

    // -- Internal helpers --

    fn insert_before_or_append(&mut self, anchor: Option<NodeId>, card: Card) -> NodeId {
        match anchor {
            Some(anchor) => self.link_before(anchor, card),
            None => self.push_back(card),
        }
    }

    /// Link a new node directly before `anchor`. A vacant anchor appends.
    fn link_before(&mut self, anchor: NodeId, card: Card) -> NodeId {
        let prev = match self.node(anchor) {
            Some(node) => node.prev,
            None => return self.push_back(card),
        };
        let Some(prev) = prev else {
            return self.push_front(card);
        };

        let id = self.alloc(card);
        if let Some(node) = self.node_mut(id) {
            node.prev = Some(prev);
            node.next = Some(anchor);
        }
        if let Some(node) = self.node_mut(prev) {
            node.next = Some(id);
        }
        if let Some(node) = self.node_mut(anchor) {
            node.prev = Some(id);
        }
        self.len += 1;
        id
    }

    fn alloc(&mut self, card: Card) -> NodeId {
        let node = Node {
            card,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    #[inline]
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }
}

pub struct Iter<'a> {
    collection: &'a CardCollection,
    current: Option<NodeId>,
    forward: bool,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (NodeId, &'a Card);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.collection.node(id)?;
        self.current = if self.forward { node.next } else { node.prev };
        Some((id, &node.card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn card(term: &str) -> Card {
        Card::new(term.to_string(), format!("{} definition", term), today())
    }

    fn future_card(term: &str) -> Card {
        let mut c = card(term);
        c.memorization_date = today() + chrono::Duration::days(3);
        c
    }

    fn terms(collection: &CardCollection) -> Vec<String> {
        collection.cards().map(|c| c.term.clone()).collect()
    }

    fn assert_links(collection: &CardCollection) {
        let forward: Vec<NodeId> = collection.iter().map(|(id, _)| id).collect();
        let mut backward: Vec<NodeId> = collection.iter_rev().map(|(id, _)| id).collect();
        backward.reverse();
        assert_eq!(forward.len(), collection.len());
        assert_eq!(forward, backward);
        if collection.is_empty() {
            assert!(collection.head().is_none());
            assert!(collection.tail().is_none());
        }
    }

    #[test]
    fn test_push_front_and_back() {
        let mut collection = CardCollection::new();
        collection.push_back(card("b"));
        collection.push_front(card("a"));
        collection.push_back(card("c"));

        assert_eq!(terms(&collection), vec!["a", "b", "c"]);
        assert_links(&collection);
    }

    #[test]
    fn test_due_aware_scenario() {
        let mut collection = CardCollection::new();
        for term in ["Banana", "Apple", "Cat"] {
            collection.insert(card(term), InsertMode::DueAware, today());
        }
        assert_eq!(terms(&collection), vec!["Cat", "Banana", "Apple"]);
        assert_links(&collection);
    }

    #[test]
    fn test_alphabetical_descending_with_ties() {
        let mut collection = CardCollection::new();
        let first = collection.insert(card("m"), InsertMode::Alphabetical, today());
        collection.insert(card("z"), InsertMode::Alphabetical, today());
        collection.insert(card("a"), InsertMode::Alphabetical, today());
        let tie = collection.insert(card("m"), InsertMode::Alphabetical, today());

        assert_eq!(terms(&collection), vec!["z", "m", "m", "a"]);
        assert_eq!(collection.position_of(tie), Some(1));
        assert_eq!(collection.position_of(first), Some(2));
        assert_links(&collection);
    }

    #[test]
    fn test_due_aware_partitions() {
        let mut collection = CardCollection::new();
        collection.insert(future_card("x"), InsertMode::DueAware, today());
        collection.insert(card("b"), InsertMode::DueAware, today());
        collection.insert(future_card("z"), InsertMode::DueAware, today());
        collection.insert(card("a"), InsertMode::DueAware, today());
        collection.insert(future_card("a"), InsertMode::DueAware, today());
        collection.insert(card("c"), InsertMode::DueAware, today());

        assert_eq!(terms(&collection), vec!["c", "b", "a", "z", "x", "a"]);
        let due: Vec<bool> = collection
            .cards()
            .map(|c| c.memorization_date <= today())
            .collect();
        assert_eq!(due, vec![true, true, true, false, false, false]);
        assert_links(&collection);
    }

    #[test]
    fn test_insert_at_positions() {
        let mut collection = CardCollection::new();
        collection.insert_at(card("b"), 0).unwrap();
        collection.insert_at(card("d"), -1).unwrap();
        collection.insert_at(card("c"), 1).unwrap();
        collection.insert_at(card("e"), 3).unwrap();
        collection.insert_at(card("a"), 0).unwrap();

        assert_eq!(terms(&collection), vec!["a", "b", "c", "d", "e"]);
        assert_links(&collection);
    }

    #[test]
    fn test_insert_at_out_of_range_is_noop() {
        let mut collection = CardCollection::new();
        collection.push_back(card("a"));

        assert_eq!(
            collection.insert_at(card("x"), 3),
            Err(CollectionError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert!(collection.insert_at(card("x"), -2).is_err());
        assert_eq!(terms(&collection), vec!["a"]);
        assert_links(&collection);
    }

    #[test]
    fn test_insert_then_delete_round_trip() {
        let mut collection = CardCollection::new();
        for term in ["a", "b", "c", "d", "e", "f"] {
            collection.push_back(card(term));
        }
        let before = terms(&collection);

        for index in 0..=collection.len() {
            collection.insert_at(card("new"), index as isize).unwrap();
            let removed = collection.delete_at(index as isize).unwrap();
            assert_eq!(removed.term, "new");
            assert_eq!(terms(&collection), before);
            assert_links(&collection);
        }
    }

    #[test]
    fn test_delete_at() {
        let mut collection = CardCollection::new();
        for term in ["a", "b", "c", "d", "e"] {
            collection.push_back(card(term));
        }

        assert_eq!(collection.delete_at(3).unwrap().term, "d");
        assert_eq!(collection.delete_at(-1).unwrap().term, "e");
        assert_eq!(collection.delete_at(0).unwrap().term, "a");
        assert_eq!(terms(&collection), vec!["b", "c"]);
        assert_links(&collection);

        assert!(matches!(
            collection.delete_at(2),
            Err(CollectionError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_delete_sole_element_resets() {
        let mut collection = CardCollection::new();
        collection.push_back(card("only"));
        collection.delete_at(0).unwrap();

        assert_eq!(collection.len(), 0);
        assert!(collection.head().is_none());
        assert!(collection.tail().is_none());
        assert!(collection.delete_at(0).is_err());
        assert!(collection.delete_at(-1).is_err());
    }

    #[test]
    fn test_remove_by_handle_and_id() {
        let mut collection = CardCollection::new();
        let a = collection.push_back(card("a"));
        let b = card("b");
        let b_id = b.id;
        collection.push_back(b);
        collection.push_back(card("c"));

        collection.remove(a).unwrap();
        assert_eq!(collection.remove(a), Err(CollectionError::NodeNotFound(a)));
        collection.remove_card(b_id).unwrap();
        assert_eq!(
            collection.remove_card(b_id),
            Err(CollectionError::CardNotFound(b_id))
        );
        assert_eq!(terms(&collection), vec!["c"]);
        assert_links(&collection);
    }

    #[test]
    fn test_handles_survive_slot_reuse() {
        let mut collection = CardCollection::new();
        let a = collection.push_back(card("a"));
        let b = collection.push_back(card("b"));
        collection.remove(a).unwrap();
        let c = collection.push_front(card("c"));

        assert_eq!(collection.get(b).unwrap().term, "b");
        assert_eq!(collection.get(c).unwrap().term, "c");
        assert_eq!(collection.next(c), Some(b));
        assert_eq!(collection.prev(b), Some(c));
    }

    #[test]
    fn test_node_at_walks_from_both_ends() {
        let mut collection = CardCollection::new();
        for term in ["a", "b", "c", "d", "e", "f", "g"] {
            collection.push_back(card(term));
        }
        for (index, expected) in ["a", "b", "c", "d", "e", "f", "g"].iter().enumerate() {
            let id = collection.node_at(index).unwrap();
            assert_eq!(&collection.get(id).unwrap().term, expected);
        }
        assert!(collection.node_at(7).is_none());
    }

    #[test]
    fn test_random_insert_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let mut collection = CardCollection::new();
            for term in ["a", "b", "c", "d", "e"] {
                collection.push_back(card(term));
            }
            let id = collection.random_insert(card("new"), 2, 4, &mut rng).unwrap();
            let position = collection.position_of(id).unwrap();
            assert!((2..=4).contains(&position));
            assert_links(&collection);
        }
    }

    #[test]
    fn test_random_insert_reaches_both_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = [false; 3];
        for _ in 0..300 {
            let mut collection = CardCollection::new();
            collection.push_back(card("a"));
            collection.push_back(card("b"));
            let id = collection.random_insert(card("new"), 0, 2, &mut rng).unwrap();
            seen[collection.position_of(id).unwrap()] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }

    #[test]
    fn test_random_insert_rejects_bad_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut collection = CardCollection::new();
        collection.push_back(card("a"));

        assert_eq!(
            collection.random_insert(card("x"), 1, 0, &mut rng),
            Err(CollectionError::RangeError { start: 1, end: 0, len: 1 })
        );
        assert!(collection.random_insert(card("x"), 0, 2, &mut rng).is_err());
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_from_cards() {
        let collection = CardCollection::from_cards(
            vec![card("Banana"), card("Apple"), card("Cat")],
            InsertMode::Front,
            today(),
        );
        assert_eq!(terms(&collection), vec!["Cat", "Apple", "Banana"]);
    }
}
