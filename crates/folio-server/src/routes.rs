use axum::{
    middleware,
    routing::{get, patch},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::auth_middleware;
use crate::config::Config;
use crate::db::DbPool;
use crate::feed::{self, ThreadFeeds};
use crate::handlers::{comments, subjects};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub feeds: ThreadFeeds,
}

pub fn create_router(db: DbPool, config: Config) -> Router {
    let state = AppState {
        db,
        config,
        feeds: ThreadFeeds::new(),
    };

    // Subject threads (all protected; identity comes from the bearer token)
    let subject_routes = Router::new()
        .route("/", get(subjects::list_subjects))
        .route("/:id", get(subjects::get_subject))
        .route(
            "/:id/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/:id/comments/feed", get(feed::comments_feed))
        .route(
            "/:id/comments/:comment_id",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/subjects", subject_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
