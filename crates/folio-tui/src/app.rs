use std::time::Duration;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use folio_shared::thread::ThreadSnapshot;
use folio_shared::{Comment, Subject};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::cascade::delete_comment_tree;
use crate::interaction::{menu_items, InteractionState, MenuItem};
use crate::store::{CommentStore, StoreError};
use crate::thread_view::{Row, ThreadView};

/// How often an open thread re-fetches the authoritative comment list.
const THREAD_REFRESH_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    SubjectSelect,
    Thread,
}

/// Where typed characters go while a draft is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFocus {
    Composer,
    Editor,
}

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    ThreadUpdated {
        subject_id: Uuid,
        comments: Vec<Comment>,
    },
}

pub struct App {
    pub api: ApiClient,
    pub view: View,

    // Loading state
    pub loading: bool,
    pub loading_message: String,
    pub error_message: Option<String>,

    // Subject selection
    pub subjects: Vec<Subject>,
    pub selected_subject_idx: usize,

    // Open thread
    pub subject: Option<Subject>,
    pub snapshot: ThreadSnapshot,
    pub thread: ThreadView,
    pub interaction: InteractionState,
    pub input_focus: Option<InputFocus>,
    refresh_task: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            view: View::SubjectSelect,
            loading: false,
            loading_message: String::new(),
            error_message: None,
            subjects: Vec::new(),
            selected_subject_idx: 0,
            subject: None,
            snapshot: ThreadSnapshot::default(),
            thread: ThreadView::new(),
            interaction: InteractionState::new(),
            input_focus: None,
            refresh_task: None,
        }
    }

    fn set_loading(&mut self, loading: bool, message: &str) {
        self.loading = loading;
        self.loading_message = message.to_string();
    }

    fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Handles a key event. Returns true when the app should quit.
    pub async fn handle_key(&mut self, key: KeyEvent, tx: mpsc::Sender<AppEvent>) -> Result<bool> {
        // Any keypress dismisses a lingering error message
        if self.error_message.is_some() {
            self.clear_error();
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        match self.view {
            View::SubjectSelect => self.handle_subject_select_key(key, tx).await,
            View::Thread => self.handle_thread_key(key).await,
        }
    }

    async fn handle_subject_select_key(
        &mut self,
        key: KeyEvent,
        tx: mpsc::Sender<AppEvent>,
    ) -> Result<bool> {
        if self.loading {
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected_subject_idx + 1 < self.subjects.len() {
                    self.selected_subject_idx += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_subject_idx = self.selected_subject_idx.saturating_sub(1);
            }
            KeyCode::Char('r') => self.load_subjects().await,
            KeyCode::Enter => {
                if let Some(subject) = self.subjects.get(self.selected_subject_idx).cloned() {
                    self.open_thread(subject, tx).await;
                }
            }
            _ => {}
        }
        Ok(false)
    }

    async fn handle_thread_key(&mut self, key: KeyEvent) -> Result<bool> {
        if self.loading {
            return Ok(false);
        }

        if self.input_focus.is_some() {
            self.handle_draft_key(key).await;
            return Ok(false);
        }

        // A pending delete swallows everything except its answer
        if let Some(target) = self.interaction.delete_confirm() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.interaction.cancel_delete();
                    self.confirm_delete(target).await;
                }
                KeyCode::Char('n') | KeyCode::Esc => self.interaction.cancel_delete(),
                _ => {}
            }
            return Ok(false);
        }

        if self.interaction.menu().is_some() {
            self.handle_menu_key(key);
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Esc => {
                if self.interaction.editing().is_some() {
                    self.interaction.cancel_edit();
                } else if self.interaction.composer().is_some() {
                    self.interaction.cancel_composer();
                } else if !self.thread.back() {
                    self.close_thread();
                }
            }
            KeyCode::Char('b') | KeyCode::Backspace => {
                if !self.thread.back() {
                    self.close_thread();
                }
            }
            KeyCode::Char('j') | KeyCode::Down => {
                let rows = self.thread.visible_rows(&self.snapshot).len();
                self.thread.cursor_down(rows);
            }
            KeyCode::Char('k') | KeyCode::Up => self.thread.cursor_up(),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate_selected_row(),
            KeyCode::Char('m') => self.open_menu_on_selected(),
            KeyCode::Char('c') => {
                self.interaction.start_composer(None);
                self.input_focus = Some(InputFocus::Composer);
            }
            KeyCode::Char('i') => {
                // Pick a parked draft back up
                if self.interaction.editing().is_some() {
                    self.input_focus = Some(InputFocus::Editor);
                } else if self.interaction.composer().is_some() {
                    self.input_focus = Some(InputFocus::Composer);
                }
            }
            KeyCode::Char('r') => self.refresh_thread().await,
            _ => {}
        }
        Ok(false)
    }

    async fn handle_draft_key(&mut self, key: KeyEvent) {
        let Some(focus) = self.input_focus else { return };

        match key.code {
            // The draft stays open; Esc only drops back to normal mode
            KeyCode::Esc => self.input_focus = None,
            KeyCode::Enter => match focus {
                InputFocus::Composer => self.submit_composer().await,
                InputFocus::Editor => self.submit_edit().await,
            },
            KeyCode::Char(c) => match focus {
                InputFocus::Composer => {
                    if let Some(composer) = self.interaction.composer_mut() {
                        composer.draft.push(c);
                    }
                }
                InputFocus::Editor => {
                    if let Some(edit) = self.interaction.editing_mut() {
                        edit.draft.push(c);
                    }
                }
            },
            KeyCode::Backspace => match focus {
                InputFocus::Composer => {
                    if let Some(composer) = self.interaction.composer_mut() {
                        composer.draft.pop();
                    }
                }
                InputFocus::Editor => {
                    if let Some(edit) = self.interaction.editing_mut() {
                        edit.draft.pop();
                    }
                }
            },
            _ => {}
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        let Some(comment_id) = self.interaction.menu() else {
            return;
        };
        let items = self.menu_items_for(comment_id);

        match key.code {
            KeyCode::Esc | KeyCode::Char('m') => self.interaction.close_menu(),
            KeyCode::Char('j') | KeyCode::Down => {
                if self.interaction.menu_cursor + 1 < items.len() {
                    self.interaction.menu_cursor += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.interaction.menu_cursor = self.interaction.menu_cursor.saturating_sub(1);
            }
            KeyCode::Enter => {
                if let Some(item) = items.get(self.interaction.menu_cursor).copied() {
                    self.run_menu_item(comment_id, item);
                }
            }
            _ => {}
        }
    }

    /// Menu entries for a comment, filtered by what the signed-in user
    /// may do to it.
    pub fn menu_items_for(&self, comment_id: Uuid) -> Vec<MenuItem> {
        let (Some(comment), Some(subject)) = (self.snapshot.get(comment_id), self.subject.as_ref())
        else {
            return Vec::new();
        };
        menu_items(comment, subject, self.api.actor_id())
    }

    fn run_menu_item(&mut self, comment_id: Uuid, item: MenuItem) {
        match item {
            MenuItem::Reply => {
                self.interaction.start_composer(Some(comment_id));
                self.input_focus = Some(InputFocus::Composer);
            }
            MenuItem::Edit => {
                if let Some(comment) = self.snapshot.get(comment_id) {
                    let text = comment.text.clone();
                    self.interaction.start_edit(comment_id, &text);
                    self.input_focus = Some(InputFocus::Editor);
                }
            }
            MenuItem::Delete => self.interaction.request_delete(comment_id),
        }
    }

    fn activate_selected_row(&mut self) {
        let rows = self.thread.visible_rows(&self.snapshot);
        match rows.get(self.thread.cursor).copied() {
            Some(Row::Comment { id, .. }) => self.thread.toggle_replies(&self.snapshot, id),
            Some(Row::MoreReplies { id, .. }) => self.thread.drill_into(&self.snapshot, id),
            None => {}
        }
    }

    fn open_menu_on_selected(&mut self) {
        let rows = self.thread.visible_rows(&self.snapshot);
        if let Some(Row::Comment { id, .. }) = rows.get(self.thread.cursor).copied() {
            self.interaction.open_menu(id);
        }
    }

    pub async fn load_subjects(&mut self) {
        self.set_loading(true, "Loading subjects...");
        match self.api.list_subjects().await {
            Ok(subjects) => {
                self.subjects = subjects;
                if self.selected_subject_idx >= self.subjects.len() {
                    self.selected_subject_idx = 0;
                }
            }
            Err(e) => self.set_error(format!("Failed to load subjects: {}", e)),
        }
        self.set_loading(false, "");
    }

    async fn open_thread(&mut self, subject: Subject, tx: mpsc::Sender<AppEvent>) {
        self.set_loading(true, "Loading comments...");
        // Collaborator lists move; take the freshest copy of the
        // subject when the server has one
        let subject = self.api.get_subject(subject.id).await.unwrap_or(subject);
        match self.api.list_comments(subject.id).await {
            Ok(comments) => {
                let subject_id = subject.id;
                self.subject = Some(subject);
                self.snapshot = ThreadSnapshot::new(comments);
                self.thread = ThreadView::new();
                self.interaction = InteractionState::new();
                self.input_focus = None;
                self.view = View::Thread;
                self.spawn_refresh_task(subject_id, tx);
            }
            Err(e) => self.set_error(format!("Failed to load comments: {}", e)),
        }
        self.set_loading(false, "");
    }

    fn close_thread(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
        self.subject = None;
        self.snapshot = ThreadSnapshot::default();
        self.thread.reset();
        self.interaction = InteractionState::new();
        self.input_focus = None;
        self.view = View::SubjectSelect;
    }

    /// Background task that keeps the open thread fresh by replacing
    /// the whole comment list on an interval. Delivery failures are
    /// quiet; the next interval retries anyway.
    fn spawn_refresh_task(&mut self, subject_id: Uuid, tx: mpsc::Sender<AppEvent>) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
        let api = self.api.clone();
        self.refresh_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(THREAD_REFRESH_INTERVAL);
            // The opening fetch already happened; skip the immediate tick
            interval.tick().await;
            loop {
                interval.tick().await;
                match api.list_comments(subject_id).await {
                    Ok(comments) => {
                        let update = AppEvent::ThreadUpdated {
                            subject_id,
                            comments,
                        };
                        if tx.send(update).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => tracing::debug!("thread refresh failed: {}", e),
                }
            }
        }));
    }

    /// Replaces the thread with a freshly delivered comment list and
    /// reconciles navigation and interaction state against it.
    pub fn apply_thread(&mut self, subject_id: Uuid, comments: Vec<Comment>) {
        if self.subject.as_ref().map(|s| s.id) != Some(subject_id) {
            return;
        }
        self.snapshot = ThreadSnapshot::new(comments);
        self.thread.on_snapshot(&self.snapshot);
        self.interaction.on_snapshot(&self.snapshot);
        let rows = self.thread.visible_rows(&self.snapshot).len();
        self.thread.clamp_cursor(rows);
    }

    async fn refresh_thread(&mut self) {
        let Some(subject_id) = self.subject.as_ref().map(|s| s.id) else {
            return;
        };
        match self.api.list_comments(subject_id).await {
            Ok(comments) => self.apply_thread(subject_id, comments),
            Err(e) => self.set_error(format!("Failed to load comments: {}", e)),
        }
    }

    async fn submit_composer(&mut self) {
        let Some(subject_id) = self.subject.as_ref().map(|s| s.id) else {
            return;
        };
        let Some(composer) = self.interaction.composer().cloned() else {
            return;
        };

        self.set_loading(true, "Posting comment...");
        let result = match composer.parent {
            Some(parent_id) => {
                self.api
                    .post_reply(subject_id, parent_id, &composer.draft)
                    .await
            }
            None => self.api.post_comment(subject_id, &composer.draft).await,
        };
        self.set_loading(false, "");

        match result {
            Ok(_) => {
                self.interaction.cancel_composer();
                self.input_focus = None;
                self.refresh_thread().await;
            }
            // The draft stays open so it can be fixed in place
            Err(StoreError::Validation(message)) => self.set_error(message),
            Err(e) => {
                self.interaction.cancel_composer();
                self.input_focus = None;
                self.set_error(format!("Failed to post comment: {}", e));
            }
        }
    }

    async fn submit_edit(&mut self) {
        let Some(subject_id) = self.subject.as_ref().map(|s| s.id) else {
            return;
        };
        let Some(edit) = self.interaction.editing().cloned() else {
            return;
        };

        self.set_loading(true, "Saving edit...");
        let result = self
            .api
            .edit_comment(subject_id, edit.id, &edit.draft)
            .await;
        self.set_loading(false, "");

        match result {
            Ok(_) => {
                self.interaction.cancel_edit();
                self.input_focus = None;
                self.refresh_thread().await;
            }
            Err(StoreError::Validation(message)) => self.set_error(message),
            Err(e) => {
                self.interaction.cancel_edit();
                self.input_focus = None;
                self.set_error(format!("Failed to save edit: {}", e));
            }
        }
    }

    async fn confirm_delete(&mut self, comment_id: Uuid) {
        let Some(subject_id) = self.subject.as_ref().map(|s| s.id) else {
            return;
        };
        // Remember the parent before the subtree disappears, so the
        // view can step out of an emptied drill-in afterwards
        let deleted_parent = self.snapshot.parent_of(comment_id);

        self.set_loading(true, "Deleting comment thread...");
        let result = delete_comment_tree(&self.api, subject_id, comment_id).await;
        self.set_loading(false, "");

        if let Err(e) = result {
            tracing::warn!("cascade stopped early: {}", e);
            self.set_error(
                "Failed to fully delete the comment thread. Some replies may remain.".to_string(),
            );
        }

        // Authoritative re-fetch either way; the store decides what the
        // thread looks like now
        match self.api.list_comments(subject_id).await {
            Ok(comments) => {
                self.snapshot = ThreadSnapshot::new(comments);
                self.thread.after_delete(&self.snapshot, deleted_parent);
                self.interaction.on_snapshot(&self.snapshot);
                let rows = self.thread.visible_rows(&self.snapshot).len();
                self.thread.clamp_cursor(rows);
            }
            Err(e) => self.set_error(format!("Failed to load comments: {}", e)),
        }
    }
}
