use folio_shared::thread::ThreadSnapshot;
use folio_shared::{Comment, Subject};
use uuid::Uuid;

/// A reply or top-level comment being typed. `parent` is `None` for a
/// new top-level comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    pub parent: Option<Uuid>,
    pub draft: String,
}

/// An existing comment being rewritten in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: Uuid,
    pub draft: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Reply,
    Edit,
    Delete,
}

impl MenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Reply => "Reply",
            MenuItem::Edit => "Edit",
            MenuItem::Delete => "Delete",
        }
    }
}

/// Menu entries `actor_id` gets on a comment: replying is open to
/// everyone, editing to the author alone, deletion to the author and
/// the subject owner.
pub fn menu_items(comment: &Comment, subject: &Subject, actor_id: Uuid) -> Vec<MenuItem> {
    let mut items = vec![MenuItem::Reply];
    if comment.author_id == actor_id {
        items.push(MenuItem::Edit);
    }
    if comment.author_id == actor_id || subject.can_moderate(actor_id) {
        items.push(MenuItem::Delete);
    }
    items
}

/// Transient interaction state for the open thread. Each slot is
/// singular (at most one open menu, one composer, one edit, one pending
/// delete), but the slots are independent: an edit on one comment can
/// sit alongside a delete confirmation on another.
#[derive(Debug, Default)]
pub struct InteractionState {
    menu: Option<Uuid>,
    pub menu_cursor: usize,
    composer: Option<Composer>,
    editing: Option<EditDraft>,
    delete_confirm: Option<Uuid>,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menu(&self) -> Option<Uuid> {
        self.menu
    }

    pub fn composer(&self) -> Option<&Composer> {
        self.composer.as_ref()
    }

    pub fn composer_mut(&mut self) -> Option<&mut Composer> {
        self.composer.as_mut()
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    pub fn editing_mut(&mut self) -> Option<&mut EditDraft> {
        self.editing.as_mut()
    }

    pub fn delete_confirm(&self) -> Option<Uuid> {
        self.delete_confirm
    }

    /// Opens the overflow menu on a comment; any other open menu closes.
    pub fn open_menu(&mut self, id: Uuid) {
        self.menu = Some(id);
        self.menu_cursor = 0;
    }

    pub fn close_menu(&mut self) {
        self.menu = None;
        self.menu_cursor = 0;
    }

    /// Starts a draft, replacing whatever was being composed before.
    pub fn start_composer(&mut self, parent: Option<Uuid>) {
        self.close_menu();
        self.composer = Some(Composer {
            parent,
            draft: String::new(),
        });
    }

    pub fn cancel_composer(&mut self) {
        self.composer = None;
    }

    /// Starts an edit seeded with the comment's current text.
    pub fn start_edit(&mut self, id: Uuid, current_text: &str) {
        self.close_menu();
        self.editing = Some(EditDraft {
            id,
            draft: current_text.to_string(),
        });
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn request_delete(&mut self, id: Uuid) {
        self.close_menu();
        self.delete_confirm = Some(id);
    }

    pub fn cancel_delete(&mut self) {
        self.delete_confirm = None;
    }

    /// Drops any state pointing at comments no longer in the thread.
    pub fn on_snapshot(&mut self, snapshot: &ThreadSnapshot) {
        if self.menu.is_some_and(|id| !snapshot.contains(id)) {
            self.close_menu();
        }
        if let Some(composer) = &self.composer {
            if composer.parent.is_some_and(|id| !snapshot.contains(id)) {
                self.composer = None;
            }
        }
        if self
            .editing
            .as_ref()
            .is_some_and(|edit| !snapshot.contains(edit.id))
        {
            self.editing = None;
        }
        if self.delete_confirm.is_some_and(|id| !snapshot.contains(id)) {
            self.delete_confirm = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use uuid::Uuid;

    use super::*;

    fn cid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn comment_by(author: u128) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            subject_id: cid(500),
            parent_id: None,
            author_id: cid(author),
            author_display_name: "Someone".to_string(),
            author_avatar_url: None,
            text: "hello".to_string(),
            created_at: DateTime::from_timestamp(0, 0).unwrap(),
            edited_at: None,
        }
    }

    fn subject_owned_by(owner: u128) -> Subject {
        Subject {
            id: cid(500),
            owner_id: cid(owner),
            title: "A subject".to_string(),
            collaborators: Vec::new(),
            created_at: DateTime::from_timestamp(0, 0).unwrap(),
        }
    }

    #[test]
    fn only_one_menu_is_open_at_a_time() {
        let mut state = InteractionState::new();
        state.open_menu(cid(1));
        state.menu_cursor = 2;

        state.open_menu(cid(2));
        assert_eq!(state.menu(), Some(cid(2)));
        assert_eq!(state.menu_cursor, 0);
    }

    #[test]
    fn slots_coexist_across_different_comments() {
        let mut state = InteractionState::new();
        state.start_edit(cid(1), "original");
        state.request_delete(cid(2));
        state.start_composer(Some(cid(3)));

        assert_eq!(state.editing().map(|e| e.id), Some(cid(1)));
        assert_eq!(state.delete_confirm(), Some(cid(2)));
        assert_eq!(state.composer().and_then(|c| c.parent), Some(cid(3)));
    }

    #[test]
    fn starting_a_new_draft_replaces_the_old_one() {
        let mut state = InteractionState::new();
        state.start_composer(Some(cid(1)));
        state
            .composer_mut()
            .unwrap()
            .draft
            .push_str("half-typed reply");

        state.start_composer(None);
        let composer = state.composer().unwrap();
        assert_eq!(composer.parent, None);
        assert!(composer.draft.is_empty());
    }

    #[test]
    fn choosing_a_menu_action_closes_the_menu() {
        let mut state = InteractionState::new();

        state.open_menu(cid(1));
        state.start_edit(cid(1), "text");
        assert_eq!(state.menu(), None);

        state.open_menu(cid(1));
        state.request_delete(cid(1));
        assert_eq!(state.menu(), None);
        assert_eq!(state.delete_confirm(), Some(cid(1)));
    }

    #[test]
    fn state_for_vanished_comments_is_dropped() {
        let survivor = comment_by(1);
        let mut state = InteractionState::new();
        state.start_edit(survivor.id, "keep me");
        state.request_delete(cid(77));
        state.start_composer(Some(cid(78)));

        let snapshot = ThreadSnapshot::new(vec![survivor.clone()]);
        state.on_snapshot(&snapshot);

        assert_eq!(state.editing().map(|e| e.id), Some(survivor.id));
        assert_eq!(state.delete_confirm(), None);
        assert!(state.composer().is_none());
    }

    #[test]
    fn a_top_level_composer_survives_every_snapshot() {
        let mut state = InteractionState::new();
        state.start_composer(None);

        state.on_snapshot(&ThreadSnapshot::new(Vec::new()));
        assert!(state.composer().is_some());
    }

    #[test]
    fn authors_owners_and_visitors_see_different_menus() {
        let subject = subject_owned_by(10);
        let comment = comment_by(20);

        // The author: everything
        assert_eq!(
            menu_items(&comment, &subject, cid(20)),
            vec![MenuItem::Reply, MenuItem::Edit, MenuItem::Delete]
        );
        // The subject owner: no edit, but moderation delete
        assert_eq!(
            menu_items(&comment, &subject, cid(10)),
            vec![MenuItem::Reply, MenuItem::Delete]
        );
        // Anyone else: reply only
        assert_eq!(
            menu_items(&comment, &subject, cid(30)),
            vec![MenuItem::Reply]
        );
    }
}
