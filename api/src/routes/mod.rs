pub mod ai;
pub mod dashboard;
pub mod images;
pub mod posts;
pub mod webhook;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(webhook::routes())
        .merge(posts::routes())
        .merge(ai::routes())
        .merge(images::routes())
        .merge(dashboard::routes())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::blog::BlogPublisher;
    use crate::services::conversations::InMemoryConversations;
    use crate::services::instagram::tests::test_client;
    use crate::services::publisher::{MediaPublisher, PollConfig};
    use crate::services::replies::tests::test_generator;
    use crate::services::webhook::WebhookDispatcher;
    use crate::services::wordpress::WordPressClient;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    pub(crate) const VERIFY_TOKEN: &str = "s3cret";

    /// State whose chat and graph calls all go to `base_url`; the pool never connects
    pub(crate) fn test_state(
        base_url: &str,
        app_secret: Option<&str>,
    ) -> (Arc<AppState>, Arc<InMemoryConversations>) {
        let (generator, store) = test_generator(base_url);
        let replies = Arc::new(generator);
        let instagram = test_client(base_url);
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/igbot_test")
            .unwrap();

        let state = Arc::new(AppState {
            db: db.clone(),
            verify_token: VERIFY_TOKEN.into(),
            replies: replies.clone(),
            publisher: MediaPublisher::new(
                instagram.clone(),
                PollConfig {
                    interval: Duration::from_millis(1),
                    max_attempts: 3,
                },
            ),
            webhook: Arc::new(WebhookDispatcher::new(
                replies.clone(),
                instagram,
                app_secret.map(str::to_string),
            )),
            blog: Arc::new(BlogPublisher::new(db, replies, WordPressClient::new(None))),
            uploads_dir: std::env::temp_dir(),
            public_base_url: None,
        });

        (state, store)
    }
}
