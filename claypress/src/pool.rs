//! Identity pool: the bidirectional map between graph nodes and the object
//! keys they are written under.

use fnv::FnvHashMap;

use crate::{
    error::{CbError, Result},
    pdf::{Document, ObjectKey},
};

/// Names one node of the object graph independently of the key it will be
/// written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    /// The object stored under this key in the document's object table.
    Source(ObjectKey),
    /// A direct object that was given an identity while writing.
    Anonymous(u32),
}

impl NodeKey {
    /// The node a reference points to. Reference chains are followed so the
    /// wrapper and its final target name the same node. Dangling references
    /// have no node.
    pub fn of_reference(document: &Document, reference: ObjectKey) -> Option<NodeKey> {
        document
            .dereference(reference)
            .map(|(target, _)| NodeKey::Source(target))
    }
}

#[derive(Debug, Default)]
pub struct ObjectPool {
    keys: FnvHashMap<NodeKey, ObjectKey>,
    nodes: FnvHashMap<ObjectKey, NodeKey>,
    highest_object_number: u32,
    next_anonymous: u32,
}

impl ObjectPool {
    /// `highest_object_number` is the highest number already used by the
    /// document. Fresh identities start above it.
    pub fn new(highest_object_number: u32) -> Self {
        Self {
            highest_object_number,
            ..Default::default()
        }
    }

    /// A node name that was never handed out before.
    pub fn anonymous(&mut self) -> NodeKey {
        self.next_anonymous += 1;
        NodeKey::Anonymous(self.next_anonymous)
    }

    /// Return the identity of `node`, recording one if necessary.
    ///
    /// A node that already has an identity keeps it. Otherwise `requested` is
    /// used when it is free, and a fresh `highest + 1` identity with
    /// generation 0 is minted when it is absent or taken. Callers must use the
    /// returned key, which may differ from `requested`.
    pub fn allocate(&mut self, requested: Option<ObjectKey>, node: NodeKey) -> Result<ObjectKey> {
        if let Some(key) = self.keys.get(&node) {
            return Ok(*key);
        }

        let key = match requested {
            Some(key) if key.number != 0 && !self.nodes.contains_key(&key) => {
                self.highest_object_number = self.highest_object_number.max(key.number);
                key
            }
            Some(key) => {
                log::debug!("Identity {} is already taken, minting a new one for {:?}", key, node);
                self.mint()?
            }
            None => self.mint()?,
        };

        self.keys.insert(node, key);
        self.nodes.insert(key, node);
        Ok(key)
    }

    fn mint(&mut self) -> Result<ObjectKey> {
        let number = self
            .highest_object_number
            .checked_add(1)
            .ok_or(CbError::IdentityExhausted)?;
        self.highest_object_number = number;
        Ok(ObjectKey::new(number, 0))
    }

    pub fn lookup_key(&self, node: NodeKey) -> Option<ObjectKey> {
        self.keys.get(&node).copied()
    }

    pub fn lookup_node(&self, key: ObjectKey) -> Option<NodeKey> {
        self.nodes.get(&key).copied()
    }

    pub fn contains_key(&self, key: ObjectKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn contains_node(&self, node: NodeKey) -> bool {
        self.keys.contains_key(&node)
    }

    pub fn highest_object_number(&self) -> u32 {
        self.highest_object_number
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::pdf::Object;

    use super::*;

    #[test]
    fn allocation_is_idempotent() {
        let mut pool = ObjectPool::new(0);
        let node = pool.anonymous();
        let first = pool.allocate(None, node).unwrap();
        let second = pool.allocate(Some(ObjectKey::new(42, 0)), node).unwrap();
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn fresh_identity_starts_above_highest_number() {
        let mut pool = ObjectPool::new(10);
        let node = pool.anonymous();
        assert_eq!(pool.allocate(None, node).unwrap(), ObjectKey::new(11, 0));
        assert_eq!(pool.highest_object_number(), 11);
    }

    #[test]
    fn requested_identity_is_kept_when_free() {
        let mut pool = ObjectPool::new(3);
        let key = ObjectKey::new(7, 2);
        let node = NodeKey::Source(key);
        assert_eq!(pool.allocate(Some(key), node).unwrap(), key);
        assert_eq!(pool.highest_object_number(), 7);
        assert_eq!(pool.lookup_node(key), Some(node));
        assert_eq!(pool.lookup_key(node), Some(key));
        assert!(pool.contains_key(key));
        assert!(pool.contains_node(node));
    }

    #[test]
    fn collision_returns_other_identity() {
        // highest number is stale: 1 is minted for an anonymous node, then the
        // document's own object 1 asks for it
        let mut pool = ObjectPool::new(0);
        let anonymous = pool.anonymous();
        let taken = pool.allocate(None, anonymous).unwrap();
        assert_eq!(taken, ObjectKey::new(1, 0));

        let source = NodeKey::Source(ObjectKey::new(1, 0));
        let key = pool.allocate(Some(ObjectKey::new(1, 0)), source).unwrap();
        assert_eq!(key, ObjectKey::new(2, 0));
        assert_eq!(pool.lookup_node(taken), Some(anonymous));
        assert_eq!(pool.lookup_node(key), Some(source));
    }

    #[test]
    fn distinct_nodes_get_distinct_identities() {
        let mut pool = ObjectPool::new(0);
        let mut seen = std::collections::HashSet::new();
        for i in 1..50 {
            let node = if i % 2 == 0 {
                NodeKey::Source(ObjectKey::new(i / 2, 0))
            } else {
                pool.anonymous()
            };
            let key = pool.allocate(Some(ObjectKey::new(i / 2, 0)), node).unwrap();
            assert!(seen.insert(key), "{} handed out twice", key);
        }
    }

    #[test]
    fn highest_number_never_decreases() {
        let mut pool = ObjectPool::new(20);
        let key = pool
            .allocate(Some(ObjectKey::new(5, 0)), NodeKey::Source(ObjectKey::new(5, 0)))
            .unwrap();
        assert_eq!(key, ObjectKey::new(5, 0));
        assert_eq!(pool.highest_object_number(), 20);
    }

    #[test]
    fn exhausted_numbers() {
        let mut pool = ObjectPool::new(u32::MAX);
        let node = pool.anonymous();
        assert!(matches!(pool.allocate(None, node), Err(CbError::IdentityExhausted)));
    }

    #[test]
    fn wrapper_and_target_resolve_to_same_node() {
        let mut doc = Document::new();
        let target = doc.add_object(Object::Integer(3));
        let wrapper = doc.add_object(target);

        let mut pool = ObjectPool::new(doc.highest_object_number);
        let via_wrapper = NodeKey::of_reference(&doc, wrapper).unwrap();
        let via_target = NodeKey::of_reference(&doc, target).unwrap();
        assert_eq!(via_wrapper, via_target);

        let a = pool.allocate(Some(wrapper), via_wrapper).unwrap();
        let b = pool.allocate(Some(target), via_target).unwrap();
        assert_eq!(a, b);
        assert!(NodeKey::of_reference(&doc, ObjectKey::new(99, 0)).is_none());
    }
}
