//! Static file serving for CSS and JavaScript.

use std::path::Path;

use tower_http::services::ServeDir;

/// Serve files under `dir`; unknown paths answer 404.
pub fn create_static_service(dir: impl AsRef<Path>) -> ServeDir {
    ServeDir::new(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_serves_file_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log('ok');").unwrap();

        let response = create_static_service(dir.path())
            .oneshot(Request::get("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let missing = create_static_service(dir.path())
            .oneshot(Request::get("/nope.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
