use crate::pdf::ObjectKey;

/// Where the traversal met an indirect object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversedNode {
    /// Output identity of the object.
    pub key: ObjectKey,
    /// Position of the object that first referenced this one.
    pub parent: Option<usize>,
}

/// Arena of traversal positions. Parents are addressed by index, so the
/// positions of a cyclic graph don't own each other.
#[derive(Debug, Default)]
pub struct Positions(Vec<TraversedNode>);

impl Positions {
    pub fn push(&mut self, node: TraversedNode) -> usize {
        self.0.push(node);
        self.0.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&TraversedNode> {
        self.0.get(index)
    }

    /// Parent, grand parent... of the position at `index`, not including it.
    pub fn ancestors(&self, index: usize) -> Ancestors<'_> {
        Ancestors {
            positions: self,
            next: self.get(index).and_then(|n| n.parent),
        }
    }

    /// `key` sits on the path from the first root to `index`.
    pub fn is_ancestor(&self, key: ObjectKey, index: usize) -> bool {
        self.get(index).map_or(false, |n| n.key == key) || self.ancestors(index).any(|n| n.key == key)
    }
}

pub struct Ancestors<'p> {
    positions: &'p Positions,
    next: Option<usize>,
}

impl<'p> Iterator for Ancestors<'p> {
    type Item = &'p TraversedNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.positions.get(self.next?)?;
        self.next = node.parent;
        Some(node)
    }
}
