use std::collections::HashMap;

use uuid::Uuid;

use crate::models::Comment;

/// Index over one subject's flat comment list.
///
/// The store only ever hands out the full list, so the index is rebuilt
/// from scratch on every delivery rather than patched in place. Sibling
/// order is `created_at` ascending, id as tiebreaker.
#[derive(Debug, Clone, Default)]
pub struct ThreadSnapshot {
    comments: Vec<Comment>,
    by_id: HashMap<Uuid, usize>,
    children: HashMap<Option<Uuid>, Vec<Uuid>>,
}

impl ThreadSnapshot {
    pub fn new(mut comments: Vec<Comment>) -> Self {
        comments.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        let mut by_id = HashMap::with_capacity(comments.len());
        let mut children: HashMap<Option<Uuid>, Vec<Uuid>> = HashMap::new();
        for (index, comment) in comments.iter().enumerate() {
            by_id.insert(comment.id, index);
            children.entry(comment.parent_id).or_default().push(comment.id);
        }
        Self {
            comments,
            by_id,
            children,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Comment> {
        self.by_id.get(&id).map(|&index| &self.comments[index])
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn parent_of(&self, id: Uuid) -> Option<Uuid> {
        self.get(id).and_then(|comment| comment.parent_id)
    }

    /// All comments in thread order. Top-level and nested replies mixed;
    /// use [`children_of`](Self::children_of) to walk the tree.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Ids of the direct replies under `parent` (`None` for top-level
    /// comments), in thread order.
    pub fn child_ids(&self, parent: Option<Uuid>) -> &[Uuid] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn children_of(&self, parent: Option<Uuid>) -> Vec<&Comment> {
        self.child_ids(parent)
            .iter()
            .filter_map(|&id| self.get(id))
            .collect()
    }

    /// Direct reply count, not the whole subtree.
    pub fn reply_count(&self, id: Uuid) -> usize {
        self.child_ids(Some(id)).len()
    }

    /// Size of the subtree under `id`, excluding `id` itself.
    pub fn descendant_count(&self, id: Uuid) -> usize {
        self.deletion_order(id).len() - 1
    }

    /// The subtree rooted at `id`, ordered so every comment appears
    /// after all of its descendants; `id` itself comes last. This is
    /// the order a cascading delete must issue single deletes in, so
    /// that no surviving comment ever points at a deleted parent.
    pub fn deletion_order(&self, id: Uuid) -> Vec<Uuid> {
        let mut order = Vec::new();
        let mut stack = vec![(id, 0usize)];
        while let Some((current, next_child)) = stack.pop() {
            let kids = self.child_ids(Some(current));
            if next_child < kids.len() {
                stack.push((current, next_child + 1));
                stack.push((kids[next_child], 0));
            } else {
                order.push(current);
            }
        }
        order
    }
}
