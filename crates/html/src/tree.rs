//! Tag tree arena.
//!
//! Nodes are addressed by stable index; node 0 is the root sentinel and
//! carries no tag. Parent links are plain indices and child lists are
//! ordered index vectors, so balance repair and bad-nesting recovery are
//! O(1) index rewrites with no pointer invalidation.
//!
//! Invariant: every non-root node's parent chain terminates at the root.

use crate::tags::{FL_CLOSED, FL_CLOSING};
use crate::types::{HtmlTag, NodeId};

#[derive(Debug)]
pub struct TreeNode {
    pub parent: NodeId,
    pub children: Vec<NodeId>,
    pub tag: Option<HtmlTag>,
}

#[derive(Debug)]
pub struct TagTree {
    nodes: Vec<TreeNode>,
}

impl TagTree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        TagTree {
            nodes: vec![TreeNode {
                parent: Self::ROOT,
                children: Vec::new(),
                tag: None,
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root sentinel always exists.
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id as usize]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        (id != Self::ROOT).then(|| self.nodes[id as usize].parent)
    }

    pub fn tag(&self, id: NodeId) -> Option<&HtmlTag> {
        self.nodes[id as usize].tag.as_ref()
    }

    pub fn tag_mut(&mut self, id: NodeId) -> Option<&mut HtmlTag> {
        self.nodes[id as usize].tag.as_mut()
    }

    /// Materialize `tag` as a node under `parent` without linking it into
    /// the child list (inline-content-model tags keep a parent chain but
    /// no tree membership).
    pub fn alloc_detached(&mut self, parent: NodeId, tag: HtmlTag) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(TreeNode {
            parent,
            children: Vec::new(),
            tag: Some(tag),
        });
        id
    }

    /// Materialize `tag` as a linked child of `parent`.
    pub fn alloc_child(&mut self, parent: NodeId, tag: HtmlTag) -> NodeId {
        let id = self.alloc_detached(parent, tag);
        self.nodes[parent as usize].children.push(id);
        id
    }

    /// Children of `id`, in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id as usize].children
    }

    /// The sibling immediately before `id` under its parent, if any.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        if id == Self::ROOT {
            return None;
        }
        let siblings = &self.nodes[self.nodes[id as usize].parent as usize].children;
        let at = siblings.iter().position(|&c| c == id)?;
        (at > 0).then(|| siblings[at - 1])
    }

    /// Balance repair for a just-appended closing marker.
    ///
    /// Walks the marker's ancestors for the nearest open tag with the
    /// same id. On a match the ancestor is marked closed, the marker node
    /// is discarded and the open cursor rewinds to the ancestor's parent.
    /// Returns the new cursor, or `None` when no pairable open tag exists
    /// (the document is unbalanced).
    pub fn check_balance(&mut self, node: NodeId) -> Option<NodeId> {
        let Some(tag) = self.tag(node) else {
            return Some(Self::ROOT);
        };
        if tag.flags & FL_CLOSING == 0 {
            return Some(self.nodes[node as usize].parent);
        }
        let id = tag.id;

        let mut cur = self.nodes[node as usize].parent;
        loop {
            let Some(cur_tag) = self.nodes[cur as usize].tag.as_ref() else {
                break; // reached the root sentinel
            };
            if cur_tag.id == id && cur_tag.flags & FL_CLOSED == 0 {
                if let Some(cur_tag) = self.nodes[cur as usize].tag.as_mut() {
                    cur_tag.flags |= FL_CLOSED;
                }
                let new_level = self.nodes[cur as usize].parent;
                self.discard_last(node);
                return Some(new_level);
            }
            if cur == Self::ROOT {
                break;
            }
            cur = self.nodes[cur as usize].parent;
        }
        None
    }

    /// Drop a just-created node again (the pure-closing-marker path).
    ///
    /// Only valid for the most recently allocated node; the arena never
    /// frees anything else individually.
    fn discard_last(&mut self, node: NodeId) {
        debug_assert_eq!(node as usize, self.nodes.len() - 1);
        if node as usize != self.nodes.len() - 1 {
            return;
        }
        let parent = self.nodes[node as usize].parent;
        let siblings = &mut self.nodes[parent as usize].children;
        if siblings.last() == Some(&node) {
            siblings.pop();
        }
        self.nodes.pop();
    }

    /// Reparent `node` under `new_parent` (bad-nesting recovery).
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) {
        let old_parent = self.nodes[node as usize].parent;
        if old_parent == new_parent {
            return;
        }
        let old_children = &mut self.nodes[old_parent as usize].children;
        if let Some(at) = old_children.iter().position(|&c| c == node) {
            old_children.remove(at);
        }
        self.nodes[node as usize].parent = new_parent;
        self.nodes[new_parent as usize].children.push(node);
    }

    /// Iterate ancestor node ids of `id`, nearest first, root excluded.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = id;
        std::iter::from_fn(move || {
            if cur == Self::ROOT {
                return None;
            }
            cur = self.nodes[cur as usize].parent;
            (cur != Self::ROOT).then_some(cur)
        })
    }
}

impl Default for TagTree {
    fn default() -> Self {
        Self::new()
    }
}
