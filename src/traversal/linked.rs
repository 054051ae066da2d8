//! Arena of linked cursor nodes used by the column iterator.
//!
//! Each node holds a cursor plus links to the nodes reached from it across
//! one edge. A node is created the first time its edge is followed and is
//! repositioned (not recreated) for every later column, so the structure of
//! the graph mirrors the part of the tree visited so far.
//!
//! Every node records the epoch in which it was last positioned. The column
//! iterator starts a new epoch for each column; positioning a node twice in
//! one epoch means the traversal reached it along two paths, which valid
//! topology never allows.

use crate::traversal::cursor::{BottomCursor, TopCursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopNodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BottomNodeId(usize);

#[derive(Debug, Clone)]
pub struct TopNode<'a> {
    pub cursor: Option<TopCursor<'a>>,
    pub parent: Option<BottomNodeId>,
    pub bottom_parse: Option<BottomNodeId>,
    pub next_dup: Option<TopNodeId>,
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct BottomNode<'a> {
    pub cursor: Option<BottomCursor<'a>>,
    pub top_parse: Option<TopNodeId>,
    pub children: Vec<Option<TopNodeId>>,
    epoch: u64,
}

impl TopNode<'_> {
    fn empty() -> Self {
        Self {
            cursor: None,
            parent: None,
            bottom_parse: None,
            next_dup: None,
            epoch: 0,
        }
    }
}

impl BottomNode<'_> {
    fn empty(num_children: usize) -> Self {
        Self {
            cursor: None,
            top_parse: None,
            children: vec![None; num_children],
            epoch: 0,
        }
    }
}

#[derive(Debug)]
pub struct LinkedGraph<'a> {
    tops: Vec<TopNode<'a>>,
    bottoms: Vec<BottomNode<'a>>,
    epoch: u64,
}

impl Default for LinkedGraph<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> LinkedGraph<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tops: Vec::new(),
            bottoms: Vec::new(),
            epoch: 1,
        }
    }

    pub fn add_top(&mut self) -> TopNodeId {
        self.tops.push(TopNode::empty());
        TopNodeId(self.tops.len() - 1)
    }

    pub fn add_bottom(&mut self, num_children: usize) -> BottomNodeId {
        self.bottoms.push(BottomNode::empty(num_children));
        BottomNodeId(self.bottoms.len() - 1)
    }

    #[must_use]
    pub fn top(&self, id: TopNodeId) -> &TopNode<'a> {
        &self.tops[id.0]
    }

    #[must_use]
    pub fn bottom(&self, id: BottomNodeId) -> &BottomNode<'a> {
        &self.bottoms[id.0]
    }

    /// Total number of nodes in the arena
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.tops.len() + self.bottoms.len()
    }

    /// Start a new epoch; every node becomes stale until repositioned
    pub fn begin_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    #[must_use]
    pub fn is_current_top(&self, id: TopNodeId) -> bool {
        self.tops[id.0].epoch == self.epoch
    }

    #[must_use]
    pub fn is_current_bottom(&self, id: BottomNodeId) -> bool {
        self.bottoms[id.0].epoch == self.epoch
    }

    /// Cursor of a node positioned in the current epoch
    #[must_use]
    pub fn current_top(&self, id: TopNodeId) -> Option<TopCursor<'a>> {
        let node = &self.tops[id.0];
        node.cursor.filter(|_| node.epoch == self.epoch)
    }

    #[must_use]
    pub fn current_bottom(&self, id: BottomNodeId) -> Option<BottomCursor<'a>> {
        let node = &self.bottoms[id.0];
        node.cursor.filter(|_| node.epoch == self.epoch)
    }

    /// Position a top node for the current epoch.
    ///
    /// # Panics
    ///
    /// Panics if the node was already positioned in this epoch.
    pub fn place_top(&mut self, id: TopNodeId, cursor: TopCursor<'a>) {
        let node = &mut self.tops[id.0];
        assert!(
            node.epoch != self.epoch,
            "top node {} ({:?}) reached twice while building one column",
            id.0,
            cursor
        );
        node.cursor = Some(cursor);
        node.epoch = self.epoch;
    }

    /// Position a bottom node for the current epoch.
    ///
    /// # Panics
    ///
    /// Panics if the node was already positioned in this epoch.
    pub fn place_bottom(&mut self, id: BottomNodeId, cursor: BottomCursor<'a>) {
        let node = &mut self.bottoms[id.0];
        assert!(
            node.epoch != self.epoch,
            "bottom node {} ({:?}) reached twice while building one column",
            id.0,
            cursor
        );
        node.cursor = Some(cursor);
        node.epoch = self.epoch;
    }

    /// Parent node of `top`, created on first use with `top` in `slot`
    pub fn parent_of(&mut self, top: TopNodeId, slot: usize, num_children: usize) -> BottomNodeId {
        if let Some(parent) = self.tops[top.0].parent {
            return parent;
        }
        let parent = self.add_bottom(num_children);
        self.bottoms[parent.0].children[slot] = Some(top);
        self.tops[top.0].parent = Some(parent);
        parent
    }

    /// Child node of `bottom` at `slot`, created on first use
    pub fn child_of(&mut self, bottom: BottomNodeId, slot: usize) -> TopNodeId {
        if let Some(child) = self.bottoms[bottom.0].children[slot] {
            return child;
        }
        let child = self.add_top();
        self.tops[child.0].parent = Some(bottom);
        self.bottoms[bottom.0].children[slot] = Some(child);
        child
    }

    /// Parse-down node of `top`, created on first use
    pub fn bottom_parse_of(&mut self, top: TopNodeId, num_children: usize) -> BottomNodeId {
        if let Some(bottom) = self.tops[top.0].bottom_parse {
            return bottom;
        }
        let bottom = self.add_bottom(num_children);
        self.bottoms[bottom.0].top_parse = Some(top);
        self.tops[top.0].bottom_parse = Some(bottom);
        bottom
    }

    /// Parse-up node of `bottom`, created on first use
    pub fn top_parse_of(&mut self, bottom: BottomNodeId) -> TopNodeId {
        if let Some(top) = self.bottoms[bottom.0].top_parse {
            return top;
        }
        let top = self.add_top();
        self.tops[top.0].bottom_parse = Some(bottom);
        self.bottoms[bottom.0].top_parse = Some(top);
        top
    }

    /// Next paralog node of `top`, created on first use
    pub fn next_dup_of(&mut self, top: TopNodeId) -> TopNodeId {
        if let Some(next) = self.tops[top.0].next_dup {
            return next;
        }
        let next = self.add_top();
        self.tops[top.0].next_dup = Some(next);
        next
    }

    /// Rebuild the arena keeping only `anchors`, with all links dropped and
    /// cursors preserved. Returns the anchors' new ids in the same order.
    pub fn compact(
        &mut self,
        anchors: &[(TopNodeId, BottomNodeId)],
    ) -> Vec<(TopNodeId, BottomNodeId)> {
        let mut tops = Vec::with_capacity(anchors.len());
        let mut bottoms = Vec::with_capacity(anchors.len());
        let mut remapped = Vec::with_capacity(anchors.len());
        for &(top, bottom) in anchors {
            let mut new_top = TopNode::empty();
            new_top.cursor = self.tops[top.0].cursor;
            let old_bottom = &self.bottoms[bottom.0];
            let mut new_bottom = BottomNode::empty(old_bottom.children.len());
            new_bottom.cursor = old_bottom.cursor;
            tops.push(new_top);
            bottoms.push(new_bottom);
            remapped.push((TopNodeId(tops.len() - 1), BottomNodeId(bottoms.len() - 1)));
        }
        self.tops = tops;
        self.bottoms = bottoms;
        remapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::AlignmentBuilder;

    #[test]
    fn test_links_are_created_once() {
        let mut graph = LinkedGraph::new();
        let top = graph.add_top();
        let parent = graph.parent_of(top, 1, 2);
        assert_eq!(graph.parent_of(top, 1, 2), parent);
        assert_eq!(graph.bottom(parent).children, vec![None, Some(top)]);
        assert_eq!(graph.child_of(parent, 1), top);

        let sibling = graph.child_of(parent, 0);
        assert_eq!(graph.top(sibling).parent, Some(parent));

        let parse = graph.top_parse_of(parent);
        assert_eq!(graph.top_parse_of(parent), parse);
        assert_eq!(graph.top(parse).bottom_parse, Some(parent));

        let dup = graph.next_dup_of(top);
        assert_eq!(graph.next_dup_of(top), dup);
        assert_eq!(graph.node_count(), 5);
    }

    #[test]
    fn test_epochs_track_current_nodes() {
        let alignment = AlignmentBuilder::identical_parent_child(1, 10, 5)
            .build()
            .unwrap();
        let child = alignment.genome_id("child").unwrap();
        let cursor = TopCursor::new(&alignment, child, 0).unwrap();

        let mut graph = LinkedGraph::new();
        let node = graph.add_top();
        graph.begin_epoch();
        assert!(graph.current_top(node).is_none());
        graph.place_top(node, cursor);
        assert!(graph.is_current_top(node));
        assert_eq!(graph.current_top(node), Some(cursor));

        graph.begin_epoch();
        assert!(!graph.is_current_top(node));
        graph.place_top(node, cursor);
    }

    #[test]
    #[should_panic(expected = "reached twice")]
    fn test_second_placement_in_epoch_panics() {
        let alignment = AlignmentBuilder::identical_parent_child(1, 10, 5)
            .build()
            .unwrap();
        let child = alignment.genome_id("child").unwrap();
        let cursor = TopCursor::new(&alignment, child, 0).unwrap();

        let mut graph = LinkedGraph::new();
        let node = graph.add_top();
        graph.begin_epoch();
        graph.place_top(node, cursor);
        graph.place_top(node, cursor);
    }

    #[test]
    fn test_compact_keeps_only_anchors() {
        let mut graph = LinkedGraph::new();
        let top = graph.add_top();
        let bottom = graph.add_bottom(3);
        graph.parent_of(top, 0, 1);
        graph.child_of(bottom, 2);
        graph.next_dup_of(top);
        assert_eq!(graph.node_count(), 5);

        let remapped = graph.compact(&[(top, bottom)]);
        assert_eq!(graph.node_count(), 2);
        let (new_top, new_bottom) = remapped[0];
        assert!(graph.top(new_top).parent.is_none());
        assert!(graph.top(new_top).next_dup.is_none());
        assert_eq!(graph.bottom(new_bottom).children, vec![None; 3]);
    }
}
