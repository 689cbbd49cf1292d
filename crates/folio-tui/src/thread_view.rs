use std::collections::HashSet;

use folio_shared::thread::ThreadSnapshot;
use uuid::Uuid;

/// Nesting level at which inline rendering stops and navigation takes
/// over. Depths 0 through `MAX_DEPTH` render as rows; replies below
/// that are reached by re-rooting the view on their parent.
pub const MAX_DEPTH: usize = 3;

/// A collapse control only appears once an expanded comment shows more
/// than this many direct replies. Shorter runs stay open once opened.
pub const COLLAPSE_THRESHOLD: usize = 2;

/// One visible line of the thread, in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Comment {
        id: Uuid,
        depth: usize,
        replies: usize,
        expanded: bool,
        collapsible: bool,
    },
    /// Drill-in affordance under a comment at `MAX_DEPTH` whose replies
    /// cannot render inline.
    MoreReplies { id: Uuid, depth: usize, replies: usize },
}

/// Pure view state over a [`ThreadSnapshot`]: which comment the view is
/// rooted at, which replies are open, and where the cursor sits. Holds
/// no comment data itself, so a snapshot can be swapped out underneath
/// it at any time.
#[derive(Debug, Default)]
pub struct ThreadView {
    stack: Vec<Uuid>,
    expanded: HashSet<Uuid>,
    pub cursor: usize,
}

impl ThreadView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comment the view is re-rooted at, if drilled in.
    pub fn root(&self) -> Option<Uuid> {
        self.stack.last().copied()
    }

    /// How many levels deep the drill-in stack goes.
    pub fn drill_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_expanded(&self, id: Uuid) -> bool {
        self.expanded.contains(&id)
    }

    /// Flattens the snapshot into rows under the current root. Children
    /// render beneath their parent, indented one level, oldest first;
    /// replies past `MAX_DEPTH` become a [`Row::MoreReplies`] line.
    pub fn visible_rows(&self, snapshot: &ThreadSnapshot) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut work: Vec<(Uuid, usize)> = snapshot
            .child_ids(self.root())
            .iter()
            .rev()
            .map(|&id| (id, 0))
            .collect();

        while let Some((id, depth)) = work.pop() {
            let replies = snapshot.reply_count(id);
            let expanded = replies > 0 && depth < MAX_DEPTH && self.expanded.contains(&id);
            rows.push(Row::Comment {
                id,
                depth,
                replies,
                expanded,
                collapsible: expanded && replies > COLLAPSE_THRESHOLD,
            });
            if replies == 0 {
                continue;
            }
            if depth >= MAX_DEPTH {
                // No child rows ever follow, so pushing straight to the
                // output keeps the affordance under its comment
                rows.push(Row::MoreReplies {
                    id,
                    depth: depth + 1,
                    replies,
                });
            } else if expanded {
                for &child in snapshot.child_ids(Some(id)).iter().rev() {
                    work.push((child, depth + 1));
                }
            }
        }
        rows
    }

    /// Opens a comment's replies, or folds them back up. Collapsing is
    /// refused at or below [`COLLAPSE_THRESHOLD`] direct replies.
    pub fn toggle_replies(&mut self, snapshot: &ThreadSnapshot, id: Uuid) {
        if snapshot.reply_count(id) == 0 {
            return;
        }
        if self.is_expanded(id) {
            if snapshot.reply_count(id) > COLLAPSE_THRESHOLD {
                self.expanded.remove(&id);
            }
        } else {
            self.expanded.insert(id);
        }
    }

    /// Re-roots the view at `id`; its replies then render from depth 0.
    /// Expansion state is shared across roots, so open threads stay
    /// open when the view comes back out.
    pub fn drill_into(&mut self, snapshot: &ThreadSnapshot, id: Uuid) {
        if !snapshot.contains(id) {
            return;
        }
        self.stack.push(id);
        self.cursor = 0;
    }

    /// Steps back out one drill-in level. Returns false at the top.
    pub fn back(&mut self) -> bool {
        if self.stack.pop().is_some() {
            self.cursor = 0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.expanded.clear();
        self.cursor = 0;
    }

    /// Reconciles navigation with a freshly delivered snapshot: a view
    /// rooted at a comment that no longer exists walks back out until
    /// the root is valid again.
    pub fn on_snapshot(&mut self, snapshot: &ThreadSnapshot) {
        while let Some(&root) = self.stack.last() {
            if snapshot.contains(root) {
                break;
            }
            self.stack.pop();
            self.cursor = 0;
        }
    }

    /// Reconciliation after a local delete: standing on the parent of
    /// the deleted comment with nothing left under it steps back one
    /// level instead of showing an empty drill-in.
    pub fn after_delete(&mut self, snapshot: &ThreadSnapshot, deleted_parent: Option<Uuid>) {
        self.on_snapshot(snapshot);
        if let (Some(root), Some(parent)) = (self.root(), deleted_parent) {
            if root == parent && snapshot.child_ids(Some(root)).is_empty() {
                self.back();
            }
        }
    }

    pub fn cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn cursor_down(&mut self, row_count: usize) {
        if self.cursor + 1 < row_count {
            self.cursor += 1;
        }
    }

    pub fn clamp_cursor(&mut self, row_count: usize) {
        if row_count == 0 {
            self.cursor = 0;
        } else if self.cursor >= row_count {
            self.cursor = row_count - 1;
        }
    }
}
