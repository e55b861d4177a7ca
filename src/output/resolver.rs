//! Output resolution
//!
//! `complete` picks the output path for a target. Templates are compiled
//! once per cache key and rendered per request; structure pages render their
//! content first and splice it into the shared structure template.

use futures_util::future::join_all;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use super::{file, OutputError};
use crate::config::AppState;
use crate::handler::{HandlerOutput, HandlerRequest};
use crate::http::{self, mime};
use crate::logger;
use crate::routing::RouteTarget;
use crate::scripting::{self, CACHEBREAK_TOKEN};
use crate::template::{CompiledTemplate, Tokens};

/// Cache key of the shared structure template
pub const STRUCTURE_KEY: &str = "@structure";

/// Cache key of the composed structure template for one page
fn composed_key(pathname: &str) -> String {
    format!("{STRUCTURE_KEY}{pathname}")
}

/// Produce the response for a resolved, already authorized target
pub async fn complete(
    state: &AppState,
    request: &HandlerRequest,
    target: &RouteTarget,
) -> Response<Full<Bytes>> {
    logger::debug(&format!(
        "[Output] {} {} -> {:?}",
        request.method,
        request.url.pathname,
        target.output_kind()
    ));

    match target {
        RouteTarget::Handler(handler) => {
            let output = handler(request);
            render_handler_output(state, request, output).await
        }
        RouteTarget::File(filename) => serve_file(state, request, filename).await,
        RouteTarget::Template(path) => html_or_error(
            render_template(state, path, &with_cachebreak(Tokens::new())).await,
        ),
        RouteTarget::TemplateList(paths) => html_or_error(
            render_structure_list(state, &request.url.pathname, paths, Tokens::new()).await,
        ),
        RouteTarget::Guarded(_) => {
            logger::log_error(&format!(
                "Guarded target for '{}' reached output without an auth check",
                request.url.pathname
            ));
            http::build_500_response()
        }
    }
}

/// Send what a handler function returned
pub async fn render_handler_output(
    state: &AppState,
    request: &HandlerRequest,
    output: HandlerOutput,
) -> Response<Full<Bytes>> {
    logger::debug(&format!("[Output] handler returned {:?}", output.output_kind()));
    match output {
        HandlerOutput::Body(body) => http::build_html_response(body),
        HandlerOutput::Redirect(location) => http::build_redirect_response(&location),
        HandlerOutput::Response(response) => response,
        HandlerOutput::Template { path, tokens } => {
            html_or_error(render_template(state, &path, &with_cachebreak(tokens)).await)
        }
        HandlerOutput::Structure { path, tokens } => {
            html_or_error(render_structure(state, &path, tokens).await)
        }
        HandlerOutput::StructureList { paths, tokens } => html_or_error(
            render_structure_list(state, &request.url.pathname, &paths, tokens).await,
        ),
    }
}

async fn serve_file(
    state: &AppState,
    request: &HandlerRequest,
    filename: &str,
) -> Response<Full<Bytes>> {
    match file::load(state, filename).await {
        Ok(data) => {
            let content_type = mime::content_type_for(filename, &state.config.content_type);
            http::build_file_response(data, content_type, request.header("if-none-match"))
        }
        Err(e) => error_response(&e),
    }
}

fn html_or_error(result: Result<String, OutputError>) -> Response<Full<Bytes>> {
    match result {
        Ok(html) => http::build_html_response(html),
        Err(e) => error_response(&e),
    }
}

fn error_response(error: &OutputError) -> Response<Full<Bytes>> {
    if error.status() == StatusCode::NOT_FOUND {
        logger::debug(&error.to_string());
        http::build_404_response()
    } else {
        logger::log_error(&error.to_string());
        http::build_500_response()
    }
}

/// Compiled template under `key`, loading `logical` on a miss
async fn compiled(
    state: &AppState,
    key: &str,
    logical: &str,
) -> Result<Arc<dyn CompiledTemplate>, OutputError> {
    state
        .templates
        .get_or_try_compile(key, move || async move {
            let source = file::load_source(state, logical).await?;
            let compiled = state.engine.compile(logical, source)?;
            logger::log_template_compiled(key);
            Ok::<_, OutputError>(compiled)
        })
        .await
}

/// Render a single template
pub async fn render_template(
    state: &AppState,
    path: &str,
    tokens: &Tokens,
) -> Result<String, OutputError> {
    Ok(compiled(state, path, path).await?.render(tokens)?)
}

fn with_cachebreak(mut tokens: Tokens) -> Tokens {
    tokens
        .entry(CACHEBREAK_TOKEN)
        .or_insert_with(|| Value::from(scripting::cachebreak()));
    tokens
}

fn with_default_mode(mut tokens: Tokens) -> Tokens {
    tokens
        .entry("mode")
        .or_insert_with(|| Value::from("index"));
    with_cachebreak(tokens)
}

/// `content` always carries the rendered page body
fn splice(content: String, mut tokens: Tokens) -> Tokens {
    tokens.insert("content".to_string(), Value::String(content));
    tokens
}

/// Render `path` and splice it into the shared structure template
pub async fn render_structure(
    state: &AppState,
    path: &str,
    tokens: Tokens,
) -> Result<String, OutputError> {
    let tokens = with_default_mode(tokens);
    let content = render_template(state, path, &tokens).await?;

    let structure = compiled(
        state,
        STRUCTURE_KEY,
        &state.config.structure_template_path(),
    )
    .await?;
    Ok(structure.render(&splice(content, tokens))?)
}

/// Render `paths` in order, concatenate, and splice into the structure template.
///
/// Uncached templates load concurrently. The structure template used for the
/// page is cached under the request path, so repeat requests for the page
/// are served entirely from the cache.
pub async fn render_structure_list(
    state: &AppState,
    pathname: &str,
    paths: &[String],
    tokens: Tokens,
) -> Result<String, OutputError> {
    let tokens = with_default_mode(tokens);

    let templates = join_all(paths.iter().map(|path| compiled(state, path, path)))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    let content = templates
        .iter()
        .map(|template| template.render(&tokens))
        .collect::<Result<String, _>>()?;

    let structure = compiled(
        state,
        &composed_key(pathname),
        &state.config.structure_template_path(),
    )
    .await?;
    Ok(structure.render(&splice(content, tokens))?)
}
