use async_trait::async_trait;
use folio_shared::Comment;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not authenticated")]
    Unauthorized,
    #[error("Access forbidden")]
    Forbidden,
    #[error("Resource not found")]
    NotFound,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Comment store unreachable: {0}")]
    Unavailable(String),
}

/// Rejects whitespace-only text before anything touches the store.
pub fn validate_comment_text(text: &str) -> Result<(), StoreError> {
    if text.trim().is_empty() {
        return Err(StoreError::Validation("Comment text is required".to_string()));
    }
    Ok(())
}

/// Remote comment-store contract: one flat, parent-linked list per
/// subject. A delete removes exactly one comment; taking out a whole
/// subtree is the caller's job (see [`crate::cascade`]).
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn list_comments(&self, subject_id: Uuid) -> Result<Vec<Comment>, StoreError>;

    async fn post_comment(&self, subject_id: Uuid, text: &str) -> Result<Comment, StoreError>;

    async fn post_reply(
        &self,
        subject_id: Uuid,
        parent_id: Uuid,
        text: &str,
    ) -> Result<Comment, StoreError>;

    async fn edit_comment(
        &self,
        subject_id: Uuid,
        comment_id: Uuid,
        text: &str,
    ) -> Result<Comment, StoreError>;

    async fn delete_comment(&self, subject_id: Uuid, comment_id: Uuid) -> Result<(), StoreError>;
}

#[cfg(test)]
pub mod mem {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use folio_shared::Comment;
    use uuid::Uuid;

    use super::{validate_comment_text, CommentStore, StoreError};

    /// In-memory double of the comment server, for engine tests.
    /// Timestamps come from a counter, so posting order is total.
    pub struct MemStore {
        subject_id: Uuid,
        actor_id: Uuid,
        comments: Mutex<Vec<Comment>>,
        clock: AtomicI64,
        failing_deletes: Mutex<HashSet<Uuid>>,
    }

    impl MemStore {
        pub fn new(subject_id: Uuid) -> Self {
            Self {
                subject_id,
                actor_id: Uuid::from_u128(1),
                comments: Mutex::new(Vec::new()),
                clock: AtomicI64::new(1_000),
                failing_deletes: Mutex::new(HashSet::new()),
            }
        }

        /// Make every delete of `id` fail with `StoreError::Unavailable`.
        pub fn fail_deletes_of(&self, id: Uuid) {
            self.failing_deletes.lock().unwrap().insert(id);
        }

        fn tick(&self) -> DateTime<Utc> {
            DateTime::from_timestamp(self.clock.fetch_add(1, Ordering::SeqCst), 0).unwrap()
        }

        fn insert(&self, parent_id: Option<Uuid>, text: &str) -> Comment {
            let comment = Comment {
                id: Uuid::new_v4(),
                subject_id: self.subject_id,
                parent_id,
                author_id: self.actor_id,
                author_display_name: "Test User".to_string(),
                author_avatar_url: None,
                text: text.to_string(),
                created_at: self.tick(),
                edited_at: None,
            };
            self.comments.lock().unwrap().push(comment.clone());
            comment
        }

        fn check_subject(&self, subject_id: Uuid) -> Result<(), StoreError> {
            if subject_id == self.subject_id {
                Ok(())
            } else {
                Err(StoreError::NotFound)
            }
        }
    }

    #[async_trait]
    impl CommentStore for MemStore {
        async fn list_comments(&self, subject_id: Uuid) -> Result<Vec<Comment>, StoreError> {
            self.check_subject(subject_id)?;
            Ok(self.comments.lock().unwrap().clone())
        }

        async fn post_comment(&self, subject_id: Uuid, text: &str) -> Result<Comment, StoreError> {
            self.check_subject(subject_id)?;
            validate_comment_text(text)?;
            Ok(self.insert(None, text))
        }

        async fn post_reply(
            &self,
            subject_id: Uuid,
            parent_id: Uuid,
            text: &str,
        ) -> Result<Comment, StoreError> {
            self.check_subject(subject_id)?;
            validate_comment_text(text)?;
            if !self
                .comments
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.id == parent_id)
            {
                return Err(StoreError::NotFound);
            }
            Ok(self.insert(Some(parent_id), text))
        }

        async fn edit_comment(
            &self,
            subject_id: Uuid,
            comment_id: Uuid,
            text: &str,
        ) -> Result<Comment, StoreError> {
            self.check_subject(subject_id)?;
            validate_comment_text(text)?;
            let edited_at = self.tick();
            let mut comments = self.comments.lock().unwrap();
            let comment = comments
                .iter_mut()
                .find(|c| c.id == comment_id)
                .ok_or(StoreError::NotFound)?;
            comment.text = text.to_string();
            comment.edited_at = Some(edited_at);
            Ok(comment.clone())
        }

        async fn delete_comment(
            &self,
            subject_id: Uuid,
            comment_id: Uuid,
        ) -> Result<(), StoreError> {
            self.check_subject(subject_id)?;
            if self.failing_deletes.lock().unwrap().contains(&comment_id) {
                return Err(StoreError::Unavailable("injected failure".to_string()));
            }
            let mut comments = self.comments.lock().unwrap();
            let before = comments.len();
            comments.retain(|c| c.id != comment_id);
            if comments.len() == before {
                return Err(StoreError::NotFound);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::mem::MemStore;
    use super::*;

    const SUBJECT: Uuid = Uuid::from_u128(900);

    #[tokio::test]
    async fn posted_comments_come_back_in_the_listing() {
        let store = MemStore::new(SUBJECT);

        let top = store.post_comment(SUBJECT, "first").await.unwrap();
        let reply = store.post_reply(SUBJECT, top.id, "second").await.unwrap();

        let comments = store.list_comments(SUBJECT).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, top.id);
        assert_eq!(comments[0].parent_id, None);
        assert_eq!(comments[1].parent_id, Some(top.id));
        assert!(reply.created_at > top.created_at);
    }

    #[tokio::test]
    async fn whitespace_only_text_never_reaches_the_store() {
        let store = MemStore::new(SUBJECT);

        let result = store.post_comment(SUBJECT, "  \n\t ").await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert!(store.list_comments(SUBJECT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replying_to_a_missing_parent_is_rejected() {
        let store = MemStore::new(SUBJECT);

        let result = store.post_reply(SUBJECT, Uuid::new_v4(), "into the void").await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn editing_rewrites_text_and_stamps_edited_at_only() {
        let store = MemStore::new(SUBJECT);

        let top = store.post_comment(SUBJECT, "first take").await.unwrap();
        let reply = store.post_reply(SUBJECT, top.id, "a reply").await.unwrap();

        store
            .edit_comment(SUBJECT, top.id, "second take")
            .await
            .unwrap();

        let comments = store.list_comments(SUBJECT).await.unwrap();
        let edited = comments.iter().find(|c| c.id == top.id).unwrap();
        assert_eq!(edited.text, "second take");
        assert_eq!(edited.created_at, top.created_at);
        assert!(edited.edited_at.is_some());

        let untouched = comments.iter().find(|c| c.id == reply.id).unwrap();
        assert_eq!(untouched.text, "a reply");
        assert_eq!(untouched.edited_at, None);
    }

    #[tokio::test]
    async fn a_delete_removes_exactly_one_comment() {
        let store = MemStore::new(SUBJECT);

        let top = store.post_comment(SUBJECT, "parent").await.unwrap();
        let reply = store.post_reply(SUBJECT, top.id, "child").await.unwrap();

        store.delete_comment(SUBJECT, top.id).await.unwrap();

        // The reply is left behind; subtree removal is the cascade's job
        let comments = store.list_comments(SUBJECT).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, reply.id);
        assert_eq!(comments[0].parent_id, Some(top.id));
    }
}
