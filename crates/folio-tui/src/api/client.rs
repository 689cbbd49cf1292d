use async_trait::async_trait;
use folio_shared::api::{CreateCommentRequest, UpdateCommentRequest};
use folio_shared::{Comment, Subject};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::api::auth::AuthToken;
use crate::store::{validate_comment_text, CommentStore, StoreError};

/// HTTP client for the comment server. Implements [`CommentStore`], so
/// the rest of the client never knows it is talking to the network.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: AuthToken,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: AuthToken) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn actor_id(&self) -> Uuid {
        self.auth.claims.sub
    }

    pub fn actor_name(&self) -> &str {
        &self.auth.claims.name
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.auth.token)
    }

    async fn authed_get(&self, path: &str) -> Result<Response, StoreError> {
        self.client
            .get(self.url(path))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn authed_post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response, StoreError> {
        self.client
            .post(self.url(path))
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn authed_patch<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, StoreError> {
        self.client
            .patch(self.url(path))
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn authed_delete(&self, path: &str) -> Result<Response, StoreError> {
        self.client
            .delete(self.url(path))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// Pulls the message out of an `{"error": "..."}` body, falling
    /// back to the raw text.
    async fn error_message(response: Response) -> String {
        let text = response.text().await.unwrap_or_default();
        serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|value| {
                value
                    .get("error")
                    .and_then(|message| message.as_str())
                    .map(String::from)
            })
            .unwrap_or(text)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, StoreError> {
        let status = response.status();
        match status {
            StatusCode::OK | StatusCode::CREATED => response
                .json()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(StoreError::Unauthorized),
            StatusCode::FORBIDDEN => Err(StoreError::Forbidden),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(StoreError::Validation(Self::error_message(response).await))
            }
            _ => Err(StoreError::Server(format!(
                "{}: {}",
                status,
                Self::error_message(response).await
            ))),
        }
    }

    async fn handle_empty_response(&self, response: Response) -> Result<(), StoreError> {
        let status = response.status();
        match status {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::UNAUTHORIZED => Err(StoreError::Unauthorized),
            StatusCode::FORBIDDEN => Err(StoreError::Forbidden),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(StoreError::Validation(Self::error_message(response).await))
            }
            _ => Err(StoreError::Server(format!(
                "{}: {}",
                status,
                Self::error_message(response).await
            ))),
        }
    }

    pub async fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        let response = self.authed_get("/subjects").await?;
        self.handle_response(response).await
    }

    pub async fn get_subject(&self, subject_id: Uuid) -> Result<Subject, StoreError> {
        let response = self.authed_get(&format!("/subjects/{subject_id}")).await?;
        self.handle_response(response).await
    }
}

#[async_trait]
impl CommentStore for ApiClient {
    async fn list_comments(&self, subject_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let response = self
            .authed_get(&format!("/subjects/{subject_id}/comments"))
            .await?;
        self.handle_response(response).await
    }

    async fn post_comment(&self, subject_id: Uuid, text: &str) -> Result<Comment, StoreError> {
        validate_comment_text(text)?;
        let request = CreateCommentRequest {
            text: text.to_string(),
            parent_id: None,
        };
        let response = self
            .authed_post(&format!("/subjects/{subject_id}/comments"), &request)
            .await?;
        self.handle_response(response).await
    }

    async fn post_reply(
        &self,
        subject_id: Uuid,
        parent_id: Uuid,
        text: &str,
    ) -> Result<Comment, StoreError> {
        validate_comment_text(text)?;
        let request = CreateCommentRequest {
            text: text.to_string(),
            parent_id: Some(parent_id),
        };
        let response = self
            .authed_post(&format!("/subjects/{subject_id}/comments"), &request)
            .await?;
        self.handle_response(response).await
    }

    async fn edit_comment(
        &self,
        subject_id: Uuid,
        comment_id: Uuid,
        text: &str,
    ) -> Result<Comment, StoreError> {
        validate_comment_text(text)?;
        let request = UpdateCommentRequest {
            text: text.to_string(),
        };
        let response = self
            .authed_patch(
                &format!("/subjects/{subject_id}/comments/{comment_id}"),
                &request,
            )
            .await?;
        self.handle_response(response).await
    }

    async fn delete_comment(&self, subject_id: Uuid, comment_id: Uuid) -> Result<(), StoreError> {
        let response = self
            .authed_delete(&format!("/subjects/{subject_id}/comments/{comment_id}"))
            .await?;
        self.handle_empty_response(response).await
    }
}
