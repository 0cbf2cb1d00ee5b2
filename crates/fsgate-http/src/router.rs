use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::deliver::{self, AppState};

/// Every path is handled by the single delivery entry point; GET also
/// covers HEAD, and POST is accepted as an alias for GET.
pub fn gateway_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(deliver::serve).post(deliver::serve))
        .route("/{*path}", get(deliver::serve).post(deliver::serve))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use fsgate_backend::MemoryFs;
    use fsgate_common::types::Identity;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::deliver::SiteConfig;

    #[tokio::test]
    async fn routes_root_and_nested_paths() {
        let state = AppState {
            fs: Arc::new(MemoryFs::new()),
            identity: Identity::new("guest", ["guest".to_string()]),
            config: SiteConfig::default(),
        };
        let router = gateway_router(state);

        let root = router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        // Empty backend: the root directory itself does not exist.
        assert_eq!(root.status(), StatusCode::NOT_FOUND);

        let nested = router
            .oneshot(Request::get("/a/b/c.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(nested.status(), StatusCode::NOT_FOUND);
    }
}
