use folio_shared::thread::ThreadSnapshot;
use uuid::Uuid;

use crate::store::{CommentStore, StoreError};

/// A cascading delete that stopped early. The `deleted` comments are
/// gone for good; the failing comment and its ancestors are still in
/// the store. There is no rollback, only an authoritative re-fetch.
#[derive(Debug, thiserror::Error)]
#[error("delete of {failed_id} stopped the cascade after {deleted} removals: {source}")]
pub struct CascadeError {
    pub failed_id: Uuid,
    pub deleted: usize,
    #[source]
    pub source: StoreError,
}

/// Deletes `comment_id` and every reply under it, leaves first, so the
/// store never holds a reply whose ancestors are gone. Stops at the
/// first failure and reports how far it got.
///
/// Returns the number of comments removed. A target that is already
/// gone counts as a finished cascade of zero.
pub async fn delete_comment_tree<S: CommentStore + ?Sized>(
    store: &S,
    subject_id: Uuid,
    comment_id: Uuid,
) -> Result<usize, CascadeError> {
    let comments = store
        .list_comments(subject_id)
        .await
        .map_err(|source| CascadeError {
            failed_id: comment_id,
            deleted: 0,
            source,
        })?;
    let snapshot = ThreadSnapshot::new(comments);

    if !snapshot.contains(comment_id) {
        return Ok(0);
    }

    let mut deleted = 0;
    for id in snapshot.deletion_order(comment_id) {
        match store.delete_comment(subject_id, id).await {
            Ok(()) => deleted += 1,
            // Someone else removed it first; the cascade's goal is met
            Err(StoreError::NotFound) => {}
            Err(source) => {
                return Err(CascadeError {
                    failed_id: id,
                    deleted,
                    source,
                })
            }
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::store::mem::MemStore;

    const SUBJECT: Uuid = Uuid::from_u128(900);

    #[tokio::test]
    async fn removes_the_comment_and_every_descendant() {
        let store = MemStore::new(SUBJECT);
        let root = store.post_comment(SUBJECT, "root").await.unwrap();
        let child = store.post_reply(SUBJECT, root.id, "child").await.unwrap();
        store
            .post_reply(SUBJECT, child.id, "grandchild")
            .await
            .unwrap();
        let bystander = store.post_comment(SUBJECT, "bystander").await.unwrap();

        let deleted = delete_comment_tree(&store, SUBJECT, root.id).await.unwrap();
        assert_eq!(deleted, 3);

        let remaining = store.list_comments(SUBJECT).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, bystander.id);
    }

    #[tokio::test]
    async fn a_leaf_cascade_is_a_single_delete() {
        let store = MemStore::new(SUBJECT);
        let root = store.post_comment(SUBJECT, "root").await.unwrap();
        let leaf = store.post_reply(SUBJECT, root.id, "leaf").await.unwrap();

        let deleted = delete_comment_tree(&store, SUBJECT, leaf.id).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = store.list_comments(SUBJECT).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, root.id);
    }

    #[tokio::test]
    async fn stops_at_the_first_failure_and_keeps_ancestors() {
        let store = MemStore::new(SUBJECT);
        let root = store.post_comment(SUBJECT, "root").await.unwrap();
        let stuck = store
            .post_reply(SUBJECT, root.id, "will not delete")
            .await
            .unwrap();
        let leaf = store.post_reply(SUBJECT, stuck.id, "leaf").await.unwrap();
        let sibling = store.post_reply(SUBJECT, root.id, "sibling").await.unwrap();
        store.fail_deletes_of(stuck.id);

        let err = delete_comment_tree(&store, SUBJECT, root.id)
            .await
            .unwrap_err();
        assert_eq!(err.failed_id, stuck.id);
        // Only the leaf under the stuck comment went away before the stop
        assert_eq!(err.deleted, 1);

        let remaining: Vec<Uuid> = store
            .list_comments(SUBJECT)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert!(remaining.contains(&root.id));
        assert!(remaining.contains(&stuck.id));
        assert!(remaining.contains(&sibling.id));
        assert!(!remaining.contains(&leaf.id));
    }

    #[tokio::test]
    async fn a_target_that_is_already_gone_is_a_no_op() {
        let store = MemStore::new(SUBJECT);
        store.post_comment(SUBJECT, "unrelated").await.unwrap();

        let deleted = delete_comment_tree(&store, SUBJECT, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(store.list_comments(SUBJECT).await.unwrap().len(), 1);
    }
}
