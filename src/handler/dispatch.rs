//! Request dispatch
//!
//! Entry point for HTTP request processing: body limits, route selection,
//! the safe-directory and auth gates, then output resolution.

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, REFERER, SERVER, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Request, Response, Version};
use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::HandlerRequest;
use crate::config::AppState;
use crate::http;
use crate::location::{self, LocationKind, ParsedUrl};
use crate::logger::{self, AccessLogEntry};
use crate::output;
use crate::routing::RouteTarget;
use crate::session::Session;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let start = Instant::now();
    let (parts, body) = req.into_parts();
    let url = location::parse(&parts.uri);
    let is_head = parts.method == Method::HEAD;
    let entry = state
        .config
        .logging
        .access_log
        .then(|| access_entry(&parts, &url, peer));

    let response = respond(&state, parts, url, body).await;
    Ok(finish(&state, response, is_head, entry, start))
}

async fn respond<B>(
    state: &AppState,
    parts: Parts,
    url: ParsedUrl,
    body: B,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(&parts.headers, max_body_size) {
        return resp;
    }

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return http::build_500_response();
        }
    };
    if u64::try_from(body.len()).unwrap_or(u64::MAX) > max_body_size {
        logger::log_error(&format!(
            "Request body too large: {} bytes (max: {max_body_size})",
            body.len()
        ));
        return http::build_413_response();
    }

    let request = HandlerRequest::new(parts.method, url, parts.headers, body);
    let target = select_target(state, &request);
    let target = authorize(state, &request, target).await;
    output::complete(state, &request, &target).await
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get(hyper::header::CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Route table match, or the fallback for an unmatched path
fn select_target<'a>(state: &'a AppState, request: &HandlerRequest) -> Cow<'a, RouteTarget> {
    let router = &state.router;
    let pathname = request.url.pathname.as_str();

    if let Some(target) = router.lookup(&request.method, pathname) {
        return Cow::Borrowed(target);
    }

    if request.method == Method::POST {
        return Cow::Borrowed(router.resolve_post(pathname));
    }

    match request.url.kind() {
        LocationKind::File
            if state
                .config
                .is_safe_directory(location::parent_directory(pathname)) =>
        {
            Cow::Owned(RouteTarget::from_path(pathname))
        }
        LocationKind::File => {
            logger::log_warning(&format!("Forbidden: '{pathname}' is outside the safe directories"));
            Cow::Borrowed(router.resolve_status(403))
        }
        LocationKind::Directory => Cow::Borrowed(router.resolve_status(404)),
    }
}

/// Unwrap a guarded target, or fall back to the index route without a valid session
async fn authorize<'a>(
    state: &'a AppState,
    request: &HandlerRequest,
    target: Cow<'a, RouteTarget>,
) -> Cow<'a, RouteTarget> {
    if let RouteTarget::Guarded(guard) = target.as_ref() {
        if !guard.requires_auth() || session_authenticated(state, request).await {
            return Cow::Owned(guard.inner().clone());
        }
        logger::debug(&format!(
            "[Auth] No session for '{}', serving index",
            request.url.pathname
        ));
        return Cow::Borrowed(state.router.index());
    }
    target
}

async fn session_authenticated(state: &AppState, request: &HandlerRequest) -> bool {
    match tokio::time::timeout(state.io_timeout(), state.sessions.read(request)).await {
        Ok(Ok(session)) => session.as_ref().is_some_and(Session::is_authenticated),
        Ok(Err(e)) => {
            logger::log_warning(&format!("Session read failed: {e}"));
            false
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Session read timed out after {}s",
                state.io_timeout().as_secs()
            ));
            false
        }
    }
}

fn access_entry(parts: &Parts, url: &ParsedUrl, peer: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer.ip().to_string(),
        parts.method.to_string(),
        url.pathname.clone(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = match parts.version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

/// Server header, HEAD body stripping and the access log line
fn finish(
    state: &AppState,
    mut response: Response<Full<Bytes>>,
    is_head: bool,
    entry: Option<AccessLogEntry>,
    start: Instant,
) -> Response<Full<Bytes>> {
    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    let body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);

    if is_head {
        let (parts, _) = response.into_parts();
        response = Response::from_parts(parts, Full::new(Bytes::new()));
    }

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = if is_head { 0 } else { body_bytes };
        entry.request_time_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routing::Router;
    use crate::session::{MemorySessionStore, UnavailableSessionStore};
    use crate::template::MiniJinjaEngine;

    fn state_from(toml: &str) -> AppState {
        let config = Config::from_toml_str(toml).unwrap();
        let router = Router::from_config(&config.routes).unwrap();
        AppState::new(
            config,
            router,
            Arc::new(MiniJinjaEngine),
            Arc::new(UnavailableSessionStore),
        )
    }

    fn get(path: &str) -> HandlerRequest {
        HandlerRequest {
            method: Method::GET,
            url: location::parse(&path.parse().unwrap()),
            ..HandlerRequest::default()
        }
    }

    fn body_of(target: &RouteTarget) -> String {
        match target {
            RouteTarget::Handler(handler) => match handler(&HandlerRequest::default()) {
                crate::handler::HandlerOutput::Body(body) => body,
                other => panic!("unexpected output {other:?}"),
            },
            other => panic!("unexpected target {other:?}"),
        }
    }

    #[test]
    fn test_check_body_size() {
        let mut headers = HeaderMap::new();
        assert!(check_body_size(&headers, 10).is_none());

        headers.insert(hyper::header::CONTENT_LENGTH, HeaderValue::from_static("10"));
        assert!(check_body_size(&headers, 10).is_none());

        headers.insert(hyper::header::CONTENT_LENGTH, HeaderValue::from_static("11"));
        let resp = check_body_size(&headers, 10).unwrap();
        assert_eq!(resp.status(), hyper::StatusCode::PAYLOAD_TOO_LARGE);

        headers.insert(hyper::header::CONTENT_LENGTH, HeaderValue::from_static("abc"));
        assert!(check_body_size(&headers, 10).is_none());
    }

    #[test]
    fn test_select_configured_and_missing_routes() {
        let state = state_from("");
        assert_eq!(body_of(&select_target(&state, &get("/"))), "Welcome to Zy!");
        assert_eq!(body_of(&select_target(&state, &get("/nope"))), "404");
    }

    #[test]
    fn test_select_file_under_safe_directory() {
        let state = state_from(r#"safe_directories = ["/css/"]"#);

        let target = select_target(&state, &get("/css/site.css"));
        assert!(matches!(target.as_ref(), RouteTarget::File(p) if p == "/css/site.css"));

        let target = select_target(&state, &get("/secret/keys.txt"));
        assert_eq!(body_of(&target), "403");
    }

    #[test]
    fn test_select_template_file_without_safe_directories() {
        let state = state_from("");
        let target = select_target(&state, &get("/templates/home.tpl"));
        assert!(matches!(target.as_ref(), RouteTarget::Template(p) if p == "/templates/home.tpl"));
    }

    #[test]
    fn test_select_post_uses_common_target() {
        let state = state_from("");
        let request = HandlerRequest {
            method: Method::POST,
            ..get("/anything")
        };
        assert_eq!(
            body_of(&select_target(&state, &request)),
            "Welcome to Zy! (POST)"
        );
    }

    fn guarded_state(session: Option<Session>) -> AppState {
        let mut state = state_from(
            r#"
            [routes.get."/admin/"]
            type = "guarded"
            target = { type = "direct", body = "secret" }
            "#,
        );
        state.sessions = Arc::new(MemorySessionStore::new(session));
        state
    }

    #[tokio::test]
    async fn test_authorize_with_full_session() {
        let state = guarded_state(Some(Session::new("ada", "pw")));
        let request = get("/admin/");
        let target = authorize(&state, &request, select_target(&state, &request)).await;
        assert_eq!(body_of(&target), "secret");
    }

    #[tokio::test]
    async fn test_authorize_without_valid_session() {
        let partial = Session {
            username: Some("ada".to_string()),
            password: None,
        };
        for session in [None, Some(partial)] {
            let state = guarded_state(session);
            let request = get("/admin/");
            let target = authorize(&state, &request, select_target(&state, &request)).await;
            assert_eq!(body_of(&target), "Welcome to Zy!");
        }
    }

    #[tokio::test]
    async fn test_authorize_with_failing_store() {
        let mut state = guarded_state(None);
        state.sessions = Arc::new(UnavailableSessionStore);
        let request = get("/admin/");
        let target = authorize(&state, &request, select_target(&state, &request)).await;
        assert_eq!(body_of(&target), "Welcome to Zy!");
    }
}
