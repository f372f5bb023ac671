use super::{DocumentTree, NodeKind, Visibility};

/// Index of a node inside a [`DocTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        classes: Vec<String>,
        visibility: Visibility,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Position inside `parent.children`, kept in sync on insert/detach
    slot: usize,
    attached: bool,
    data: NodeData,
}

/// Arena-allocated document tree.
///
/// Nodes are never freed: detaching a node unlinks it from its parent and
/// marks the whole subtree as no longer contained, so stale [`NodeId`]s held
/// by callers keep pointing at valid memory but resolve as absent.
#[derive(Debug, Clone)]
pub struct DocTree {
    nodes: Vec<Node>,
}

impl DocTree {
    /// Create a tree with a single root container tagged `tag`.
    pub fn new(tag: &str) -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                slot: 0,
                attached: true,
                data: NodeData::Element {
                    tag: tag.to_string(),
                    classes: Vec::new(),
                    visibility: Visibility::Visible,
                },
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let index = self.child_count(parent);
        self.insert_node(
            parent,
            index,
            NodeData::Element {
                tag: tag.to_string(),
                classes: Vec::new(),
                visibility: Visibility::Visible,
            },
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let index = self.child_count(parent);
        self.insert_node(parent, index, NodeData::Text(text.to_string()))
    }

    /// Insert a text leaf at `index` among `parent`'s children (clamped to the end).
    pub fn insert_text(&mut self, parent: NodeId, index: usize, text: &str) -> NodeId {
        self.insert_node(parent, index, NodeData::Text(text.to_string()))
    }

    /// Insert an element at `index` among `parent`'s children (clamped to the end).
    pub fn insert_element(&mut self, parent: NodeId, index: usize, tag: &str) -> NodeId {
        self.insert_node(
            parent,
            index,
            NodeData::Element {
                tag: tag.to_string(),
                classes: Vec::new(),
                visibility: Visibility::Visible,
            },
        )
    }

    /// Replace a leaf's text. No-op for containers.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(Node {
            data: NodeData::Text(content),
            ..
        }) = self.nodes.get_mut(node.index())
        {
            *content = text.to_string();
        }
    }

    pub fn set_visibility(&mut self, node: NodeId, value: Visibility) {
        if let Some(Node {
            data: NodeData::Element { visibility, .. },
            ..
        }) = self.nodes.get_mut(node.index())
        {
            *visibility = value;
        }
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(Node {
            data: NodeData::Element { classes, .. },
            ..
        }) = self.nodes.get_mut(node.index())
            && !classes.iter().any(|c| c == class)
        {
            classes.push(class.to_string());
        }
    }

    /// Unlink `node` from its parent. The subtree stops being `contains`-ed.
    pub fn detach(&mut self, node: NodeId) {
        if node == self.root() || !self.contains(node) {
            return;
        }
        let Some(parent) = self.nodes[node.index()].parent else {
            return;
        };
        let slot = self.nodes[node.index()].slot;
        self.nodes[parent.index()].children.remove(slot);
        self.renumber_from(parent, slot);
        self.nodes[node.index()].parent = None;

        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let entry = &mut self.nodes[current.index()];
            entry.attached = false;
            stack.extend(entry.children.iter().copied());
        }
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.nodes
            .get(parent.index())
            .map_or(0, |node| node.children.len())
    }

    fn insert_node(&mut self, parent: NodeId, index: usize, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let attached = self.contains(parent) && !self.is_text(parent);
        self.nodes.push(Node {
            parent: attached.then_some(parent),
            children: Vec::new(),
            slot: 0,
            attached,
            data,
        });
        if attached {
            let children = &mut self.nodes[parent.index()].children;
            let index = index.min(children.len());
            children.insert(index, id);
            self.renumber_from(parent, index);
        }
        id
    }

    fn renumber_from(&mut self, parent: NodeId, from: usize) {
        let children = self.nodes[parent.index()].children.clone();
        for (slot, child) in children.iter().enumerate().skip(from) {
            self.nodes[child.index()].slot = slot;
        }
    }

    fn attached(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.index()).filter(|n| n.attached)
    }

    fn sibling(&self, node: NodeId, forward: bool) -> Option<NodeId> {
        let entry = self.attached(node)?;
        let siblings = &self.nodes[entry.parent?.index()].children;
        let slot = if forward {
            entry.slot.checked_add(1)?
        } else {
            entry.slot.checked_sub(1)?
        };
        siblings.get(slot).copied()
    }
}

impl Default for DocTree {
    fn default() -> Self {
        Self::new("body")
    }
}

impl DocumentTree for DocTree {
    type NodeId = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn contains(&self, node: NodeId) -> bool {
        self.attached(node).is_some()
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind<'_>> {
        Some(match &self.attached(node)?.data {
            NodeData::Element { tag, .. } => NodeKind::Container { tag },
            NodeData::Text(text) => NodeKind::Text(text),
        })
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.attached(node)?.parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.attached(node)?.children.first().copied()
    }

    fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.attached(node)?.children.last().copied()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, true)
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, false)
    }

    fn visibility(&self, node: NodeId) -> Visibility {
        match self.attached(node).map(|n| &n.data) {
            Some(NodeData::Element { visibility, .. }) => *visibility,
            _ => Visibility::Visible,
        }
    }

    fn has_marker(&self, node: NodeId, marker: &str) -> bool {
        match self.attached(node).map(|n| &n.data) {
            Some(NodeData::Element { classes, .. }) => classes.iter().any(|c| c == marker),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (DocTree, NodeId, NodeId, NodeId) {
        let mut tree = DocTree::default();
        let p = tree.append_element(tree.root(), "p");
        let a = tree.append_text(p, "alpha");
        let b = tree.append_text(p, "beta");
        (tree, p, a, b)
    }

    #[test]
    fn test_sibling_links_follow_insertion_order() {
        let (tree, p, a, b) = sample();

        assert_eq!(tree.first_child(p), Some(a));
        assert_eq!(tree.last_child(p), Some(b));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.previous_sibling(b), Some(a));
        assert_eq!(tree.next_sibling(b), None);
        assert_eq!(tree.parent(a), Some(p));
        assert_eq!(tree.children(p).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_insert_renumbers_later_siblings() {
        let (mut tree, p, a, b) = sample();
        let inserted = tree.insert_text(p, 1, "gamma");

        assert_eq!(tree.children(p).collect::<Vec<_>>(), vec![a, inserted, b]);
        assert_eq!(tree.previous_sibling(b), Some(inserted));
    }

    #[test]
    fn test_detach_makes_subtree_stale() {
        let mut tree = DocTree::default();
        let div = tree.append_element(tree.root(), "div");
        let text = tree.append_text(div, "gone");
        let keep = tree.append_text(tree.root(), "kept");

        tree.detach(div);

        assert!(!tree.contains(div));
        assert!(!tree.contains(text));
        assert_eq!(tree.kind(text), None);
        assert_eq!(tree.first_child(tree.root()), Some(keep));
        assert_eq!(tree.previous_sibling(keep), None);
    }

    #[test]
    fn test_text_leaves_cannot_have_children() {
        let (mut tree, _, a, _) = sample();
        let orphan = tree.append_text(a, "nope");

        assert!(!tree.contains(orphan));
        assert_eq!(tree.first_child(a), None);
    }

    #[test]
    fn test_markers_and_visibility() {
        let mut tree = DocTree::default();
        let div = tree.append_element(tree.root(), "div");
        tree.add_class(div, "note");
        tree.set_visibility(div, Visibility::Hidden);

        assert!(tree.has_marker(div, "note"));
        assert!(!tree.has_marker(div, "other"));
        assert_eq!(tree.visibility(div), Visibility::Hidden);
    }
}
