use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use folio_shared::Comment;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::error::AppError;
use crate::handlers::comments::fetch_thread;
use crate::routes::AppState;

/// One watch channel per subject, holding the latest full comment list.
/// Mutation handlers publish the whole list after every write; sockets
/// relay each replacement to their client. There is no delta protocol.
#[derive(Clone, Default)]
pub struct ThreadFeeds {
    channels: Arc<RwLock<HashMap<Uuid, watch::Sender<Vec<Comment>>>>>,
}

impl ThreadFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, subject_id: Uuid, comments: Vec<Comment>) {
        let mut channels = self.channels.write().await;
        if let Some(tx) = channels.get(&subject_id) {
            tx.send_replace(comments);
        } else {
            channels.insert(subject_id, watch::channel(comments).0);
        }
    }

    /// `initial` seeds the channel when nothing has been published for
    /// this subject yet; an existing channel already holds the latest
    /// list and wins over the seed.
    pub async fn subscribe(
        &self,
        subject_id: Uuid,
        initial: Vec<Comment>,
    ) -> watch::Receiver<Vec<Comment>> {
        let mut channels = self.channels.write().await;
        if let Some(tx) = channels.get(&subject_id) {
            tx.subscribe()
        } else {
            let (tx, rx) = watch::channel(initial);
            channels.insert(subject_id, tx);
            rx
        }
    }
}

/// GET /api/v1/subjects/:id/comments/feed
pub async fn comments_feed(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM subjects WHERE id = $1")
        .bind(subject_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    let comments = fetch_thread(&state, subject_id).await?;
    let rx = state.feeds.subscribe(subject_id, comments).await;

    Ok(ws.on_upgrade(move |socket| relay_thread(socket, rx)))
}

/// Sends the current list immediately, then one frame per replacement
/// until either side goes away. Client frames other than Close are
/// ignored; the feed is one-way.
async fn relay_thread(mut socket: WebSocket, mut rx: watch::Receiver<Vec<Comment>>) {
    loop {
        let payload = match serde_json::to_string(&*rx.borrow_and_update()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to serialize thread feed frame: {}", e);
                return;
            }
        };

        if socket.send(Message::Text(payload)).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                changed = rx.changed() => match changed {
                    Ok(()) => break,
                    Err(_) => return,
                },
                message = socket.recv() => match message {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                    Some(Ok(_)) => {}
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn comment(id: u128) -> Comment {
        Comment {
            id: Uuid::from_u128(id),
            subject_id: Uuid::from_u128(900),
            parent_id: None,
            author_id: Uuid::from_u128(1),
            author_display_name: "Ada".to_string(),
            author_avatar_url: None,
            text: format!("comment {id}"),
            created_at: DateTime::from_timestamp(id as i64, 0).unwrap(),
            edited_at: None,
        }
    }

    #[tokio::test]
    async fn subscriber_sees_the_seed_then_every_replacement() {
        let feeds = ThreadFeeds::new();
        let subject = Uuid::new_v4();

        let mut rx = feeds.subscribe(subject, vec![comment(1)]).await;
        assert_eq!(rx.borrow_and_update().len(), 1);

        feeds.publish(subject, vec![comment(1), comment(2)]).await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 2);
    }

    #[tokio::test]
    async fn publish_before_any_subscriber_seeds_the_channel() {
        let feeds = ThreadFeeds::new();
        let subject = Uuid::new_v4();

        feeds.publish(subject, vec![comment(1), comment(2)]).await;

        let rx = feeds.subscribe(subject, Vec::new()).await;
        assert_eq!(rx.borrow().len(), 2);
    }

    #[tokio::test]
    async fn feeds_are_scoped_per_subject() {
        let feeds = ThreadFeeds::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        feeds.publish(a, vec![comment(1)]).await;

        let rx = feeds.subscribe(b, Vec::new()).await;
        assert!(rx.borrow().is_empty());
    }
}
