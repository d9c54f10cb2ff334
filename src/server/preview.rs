// src/server/preview.rs

//! Static preview server with live-reload snippet injection.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::fs::path_utils::confined_join;

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Directory served at `/`.
    pub base: PathBuf,
    /// When set, HTML pages get the live-reload client script injected.
    pub livereload_port: Option<u16>,
}

/// Script tag pointing at the live-reload server on `host`.
pub fn snippet(host: &str, port: u16) -> String {
    format!("<script src=\"//{host}:{port}/livereload.js?snipver=1\"></script>")
}

/// Insert `snippet` before the last `</body>`, or append it when the page
/// has none.
pub fn inject_snippet(html: &str, snippet: &str) -> String {
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + snippet.len());
            out.push_str(&html[..idx]);
            out.push_str(snippet);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{snippet}"),
    }
}

pub fn router(config: PreviewConfig) -> Router {
    Router::new()
        .fallback(serve_request)
        .with_state(Arc::new(config))
}

/// Bind `addr` and serve in the background; returns the bound address.
pub async fn start(addr: &str, config: PreviewConfig) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let base = config.base.clone();
    let app = router(config);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "preview server stopped");
        }
    });

    info!(addr = %local, base = %base.display(), "preview server listening");
    Ok(local)
}

async fn serve_request(State(config): State<Arc<PreviewConfig>>, req: Request) -> Response {
    let Ok(url_path) = percent_decode_str(req.uri().path()).decode_utf8() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let url_path = url_path.into_owned();
    let Some(local) = confined_join(&config.base, &url_path) else {
        debug!(path = %url_path, "rejected path outside the served directory");
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(port) = config.livereload_port {
        if let Some(page) = html_page(&local, &url_path).await {
            if let Ok(body) = tokio::fs::read_to_string(&page).await {
                let host = request_host(&req);
                return Html(inject_snippet(&body, &snippet(&host, port))).into_response();
            }
        }
    }

    match ServeDir::new(&config.base).oneshot(req).await {
        Ok(resp) => resp.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// The HTML file a request resolves to: an explicit `.html`/`.htm` file or
/// the `index.html` of a directory requested with a trailing slash.
async fn html_page(local: &Path, url_path: &str) -> Option<PathBuf> {
    let candidate = if url_path.ends_with('/') {
        local.join("index.html")
    } else {
        let ext = local.extension()?.to_str()?.to_ascii_lowercase();
        if ext != "html" && ext != "htm" {
            return None;
        }
        local.to_path_buf()
    };

    let meta = tokio::fs::metadata(&candidate).await.ok()?;
    meta.is_file().then_some(candidate)
}

/// Host name the browser used, without the port.
fn request_host(req: &Request) -> String {
    let raw = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");

    if raw.starts_with('[') {
        return match raw.find(']') {
            Some(end) => raw[..=end].to_string(),
            None => raw.to_string(),
        };
    }
    raw.split(':').next().unwrap_or(raw).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;

    #[test]
    fn snippet_goes_before_closing_body() {
        let tag = snippet("localhost", 35729);
        assert_eq!(
            tag,
            "<script src=\"//localhost:35729/livereload.js?snipver=1\"></script>"
        );
        assert_eq!(
            inject_snippet("<html><BODY>hi</BODY></html>", "<s></s>"),
            "<html><BODY>hi<s></s></BODY></html>"
        );
        assert_eq!(inject_snippet("<p>fragment</p>", "<s></s>"), "<p>fragment</p><s></s>");
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let req = HttpRequest::builder()
            .uri(uri)
            .header(header::HOST, "devbox:9000")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><body>home</body></html>").unwrap();
        std::fs::write(dir.path().join("style.css"), "a{color:red}").unwrap();
        dir
    }

    #[tokio::test]
    async fn html_pages_get_the_live_reload_script() {
        let dir = site();
        let app = router(PreviewConfig {
            base: dir.path().to_path_buf(),
            livereload_port: Some(35729),
        });

        let (status, body) = get(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("//devbox:35729/livereload.js?snipver=1"));
        assert!(body.ends_with("</script></body></html>"));

        let (status, body) = get(app, "/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "a{color:red}");
    }

    #[tokio::test]
    async fn pages_are_untouched_without_live_reload() {
        let dir = site();
        let app = router(PreviewConfig {
            base: dir.path().to_path_buf(),
            livereload_port: None,
        });
        let (status, body) = get(app, "/index.html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html><body>home</body></html>");
    }

    #[tokio::test]
    async fn encoded_page_names_still_get_the_script() {
        let dir = site();
        std::fs::write(dir.path().join("my page.html"), "<body>spaced</body>").unwrap();
        let app = router(PreviewConfig {
            base: dir.path().to_path_buf(),
            livereload_port: Some(35729),
        });

        let (status, body) = get(app.clone(), "/my%20page.html").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("livereload.js"), "{body}");

        let (status, _) = get(app, "/%2e%2e/index.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_outside_base_is_not_found() {
        let dir = site();
        let app = router(PreviewConfig {
            base: dir.path().join("missing"),
            livereload_port: Some(35729),
        });
        let (status, _) = get(app, "/../index.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
