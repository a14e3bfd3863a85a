// SPDX-License-Identifier: GPL-3.0-only

//! The binary tiling tree.
//!
//! Every leaf carries exactly one client, every inner node a split with a
//! ratio in `[1..99]`. The tree owns its nodes in a slotmap arena; a
//! secondary map resolves a client to its leaf. Sibling walks operate on
//! in-order leaf order, which is also the left-to-right visual order.

use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use smithay::utils::{Logical, Rectangle};

use super::ClientId;
use crate::control::Error;

new_key_type! {
    pub struct NodeId;
}

/// Orientation of an inner node's dividing line: a vertical split puts its
/// children side by side, a horizontal one on top of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Vertical,
    Horizontal,
}

impl Split {
    fn toggle(self) -> Self {
        match self {
            Split::Vertical => Split::Horizontal,
            Split::Horizontal => Split::Vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Select {
    Prev,
    Next,
    Nearest,
}

impl Select {
    fn opposite(self) -> Self {
        match self {
            Select::Prev => Select::Next,
            Select::Next => Select::Prev,
            Select::Nearest => Select::Nearest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Leaf(ClientId),
    Split {
        split: Split,
        ratio: i32,
        left: NodeId,
        right: NodeId,
    },
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    kind: Kind,
}

#[derive(Debug, Default)]
pub struct Tree {
    nodes: SlotMap<NodeId, Node>,
    leaves: SecondaryMap<ClientId, NodeId>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn leaf(&self, client: ClientId) -> Option<NodeId> {
        self.leaves.get(client).copied()
    }

    pub fn client(&self, node: NodeId) -> Option<ClientId> {
        match self.nodes.get(node)?.kind {
            Kind::Leaf(client) => Some(client),
            Kind::Split { .. } => None,
        }
    }

    /// Insert `client` by splitting the leaf of `at` (the focused client)
    /// in half. The first client becomes the root.
    pub fn insert(&mut self, client: ClientId, at: Option<ClientId>, split: Split) {
        let at = at.and_then(|c| self.leaf(c)).or_else(|| {
            // no focus: fall back to the visually first leaf
            let mut node = self.root?;
            while let Some(child) = self.child_on(node, Select::Next) {
                node = child;
            }
            Some(node)
        });

        let Some(at) = at else {
            let node = self.nodes.insert(Node {
                parent: None,
                kind: Kind::Leaf(client),
            });
            self.root = Some(node);
            self.leaves.insert(client, node);
            return;
        };

        let Kind::Leaf(old) = self.nodes[at].kind else {
            unreachable!("insertion point must be a leaf");
        };
        let left = self.nodes.insert(Node {
            parent: Some(at),
            kind: Kind::Leaf(old),
        });
        let right = self.nodes.insert(Node {
            parent: Some(at),
            kind: Kind::Leaf(client),
        });
        self.nodes[at].kind = Kind::Split {
            split,
            ratio: 50,
            left,
            right,
        };
        self.leaves.insert(old, left);
        self.leaves.insert(client, right);
    }

    /// Remove the leaf of `client`. Its sibling subtree takes the parent's
    /// place.
    pub fn remove(&mut self, client: ClientId) {
        let Some(node) = self.leaves.remove(client) else {
            return;
        };
        let Some(parent) = self.nodes[node].parent else {
            self.nodes.remove(node);
            self.root = None;
            return;
        };

        let Kind::Split { left, right, .. } = self.nodes[parent].kind else {
            unreachable!("parent of a leaf must be a split");
        };
        let uplift = if left == node { right } else { left };
        let kind = self.nodes.remove(uplift).expect("sibling node").kind;
        match kind {
            Kind::Leaf(c) => {
                self.leaves.insert(c, parent);
            }
            Kind::Split { left, right, .. } => {
                self.nodes[left].parent = Some(parent);
                self.nodes[right].parent = Some(parent);
            }
        }
        self.nodes[parent].kind = kind;
        self.nodes.remove(node);
    }

    /// The `prev`-side child of a split is its right child, the `next`-side
    /// its left one. Walking `next` therefore ascends until the node sits on
    /// the left, crosses over, and descends leftmost: the in-order
    /// successor. `prev` is the mirror image.
    fn child_on(&self, node: NodeId, which: Select) -> Option<NodeId> {
        match self.nodes[node].kind {
            Kind::Split { left, right, .. } => Some(match which {
                Select::Prev => right,
                _ => left,
            }),
            Kind::Leaf(_) => None,
        }
    }

    /// Find the neighbouring leaf of `start` in in-order leaf order.
    /// `Nearest` resolves to `Next` for a left child and `Prev` otherwise.
    /// Returns `None` when the walk escapes the root.
    pub fn find_sibling(&self, start: NodeId, which: Select) -> Option<NodeId> {
        let which = match which {
            Select::Nearest => {
                let parent = self.nodes[start].parent?;
                if self.child_on(parent, Select::Next) == Some(start) {
                    Select::Next
                } else {
                    Select::Prev
                }
            }
            which => which,
        };

        let mut node = start;
        let parent = loop {
            let parent = self.nodes[node].parent?;
            if self.child_on(parent, which) == Some(node) {
                break parent;
            }
            node = parent;
        };

        let mut sibling = self.child_on(parent, which.opposite())?;
        while let Some(child) = self.child_on(sibling, which) {
            sibling = child;
        }
        (sibling != start).then_some(sibling)
    }

    pub fn sibling_client(&self, client: ClientId, which: Select) -> Option<ClientId> {
        let leaf = self.leaf(client)?;
        self.client(self.find_sibling(leaf, which)?)
    }

    /// Exchange the payloads of two nodes, fixing the back-references of
    /// their clients and children. Parent links stay untouched.
    pub fn swap(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let kind_a = self.nodes[a].kind;
        self.nodes[a].kind = self.nodes[b].kind;
        self.nodes[b].kind = kind_a;
        for node in [a, b] {
            match self.nodes[node].kind {
                Kind::Leaf(client) => {
                    self.leaves.insert(client, node);
                }
                Kind::Split { left, right, .. } => {
                    self.nodes[left].parent = Some(node);
                    self.nodes[right].parent = Some(node);
                }
            }
        }
    }

    /// Rotate the split above the leaf of `client`: children swap positions
    /// iff the split is horizontal, then the axis toggles. Four rotations
    /// restore the layout.
    pub fn rotate(&mut self, client: ClientId) -> Result<(), Error> {
        let leaf = self.leaf(client).ok_or(Error::NotFound)?;
        let parent = self.nodes[leaf].parent.ok_or(Error::NotFound)?;
        let Kind::Split {
            split,
            ratio,
            left,
            right,
        } = self.nodes[parent].kind
        else {
            unreachable!("parent of a leaf must be a split");
        };
        let (left, right) = match split {
            Split::Horizontal => (right, left),
            Split::Vertical => (left, right),
        };
        self.nodes[parent].kind = Kind::Split {
            split: split.toggle(),
            ratio,
            left,
            right,
        };
        Ok(())
    }

    /// Move the divider of the nearest ancestor split with the matching
    /// axis in the compass direction: east and south grow the left/top
    /// side, west and north shrink it. Opposite directions on an unchanged
    /// focus adjust the same split and cancel exactly.
    pub fn resize(&mut self, client: ClientId, dir: Direction, amount: u8) -> Result<(), Error> {
        let (split, delta) = match dir {
            Direction::North => (Split::Horizontal, -(amount as i32)),
            Direction::South => (Split::Horizontal, amount as i32),
            Direction::East => (Split::Vertical, amount as i32),
            Direction::West => (Split::Vertical, -(amount as i32)),
        };

        let mut node = self.leaf(client).ok_or(Error::NotFound)?;
        let parent = loop {
            let parent = self.nodes[node].parent.ok_or(Error::NotFound)?;
            if matches!(self.nodes[parent].kind, Kind::Split { split: s, .. } if s == split) {
                break parent;
            }
            node = parent;
        };

        let Kind::Split { ratio, .. } = &mut self.nodes[parent].kind else {
            unreachable!();
        };
        let adjusted = *ratio + delta;
        if !(1..=99).contains(&adjusted) {
            return Err(Error::InvalidParam);
        }
        *ratio = adjusted;
        Ok(())
    }

    /// Clients in in-order (left-to-right) leaf order.
    pub fn clients(&self) -> impl Iterator<Item = ClientId> + '_ {
        let first = self.root.map(|mut node| {
            while let Some(child) = self.child_on(node, Select::Next) {
                node = child;
            }
            node
        });
        std::iter::successors(first, |&node| self.find_sibling(node, Select::Next))
            .filter_map(|node| self.client(node))
    }

    /// Compute the rectangle of every leaf within `area`. A vertical split
    /// divides the width by its ratio, a horizontal one the height.
    pub fn layout(&self, area: Rectangle<i32, Logical>) -> Vec<(ClientId, Rectangle<i32, Logical>)> {
        let mut rects = Vec::with_capacity(self.leaves.len());
        if let Some(root) = self.root {
            self.layout_node(root, area, &mut rects);
        }
        rects
    }

    fn layout_node(
        &self,
        node: NodeId,
        area: Rectangle<i32, Logical>,
        out: &mut Vec<(ClientId, Rectangle<i32, Logical>)>,
    ) {
        match self.nodes[node].kind {
            Kind::Leaf(client) => out.push((client, area)),
            Kind::Split {
                split: Split::Vertical,
                ratio,
                left,
                right,
            } => {
                let lw = area.size.w * ratio / 100;
                self.layout_node(
                    left,
                    Rectangle::new(area.loc, (lw, area.size.h).into()),
                    out,
                );
                self.layout_node(
                    right,
                    Rectangle::new(
                        (area.loc.x + lw, area.loc.y).into(),
                        (area.size.w - lw, area.size.h).into(),
                    ),
                    out,
                );
            }
            Kind::Split {
                split: Split::Horizontal,
                ratio,
                left,
                right,
            } => {
                let lh = area.size.h * ratio / 100;
                self.layout_node(
                    left,
                    Rectangle::new(area.loc, (area.size.w, lh).into()),
                    out,
                );
                self.layout_node(
                    right,
                    Rectangle::new(
                        (area.loc.x, area.loc.y + lh).into(),
                        (area.size.w, area.size.h - lh).into(),
                    ),
                    out,
                );
            }
        }
    }

    /// Structural self-check used by the test suite.
    #[cfg(test)]
    pub(crate) fn verify(&self) {
        if let Some(root) = self.root {
            assert!(self.nodes[root].parent.is_none(), "root must not have a parent");
        }
        let mut leaf_count = 0;
        for (id, node) in &self.nodes {
            match node.kind {
                Kind::Leaf(client) => {
                    leaf_count += 1;
                    assert_eq!(
                        self.leaves.get(client),
                        Some(&id),
                        "client leaf back-reference must match"
                    );
                }
                Kind::Split {
                    ratio, left, right, ..
                } => {
                    assert!((1..=99).contains(&ratio), "ratio must stay in [1..99]");
                    for child in [left, right] {
                        assert_eq!(
                            self.nodes[child].parent,
                            Some(id),
                            "child must point back to its split"
                        );
                    }
                }
            }
        }
        assert_eq!(leaf_count, self.leaves.len(), "one leaf per client");
    }
}
