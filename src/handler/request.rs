//! Handler-facing request and output types

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{HeaderMap, Method, Response};
use std::collections::HashMap;

use crate::location::ParsedUrl;
use crate::routing::OutputKind;
use crate::template::Tokens;

/// Request as seen by handler functions and session stores
#[derive(Debug, Clone, Default)]
pub struct HandlerRequest {
    pub method: Method,
    pub url: ParsedUrl,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// URL-encoded form fields from the body
    pub form: HashMap<String, String>,
}

impl HandlerRequest {
    pub fn new(method: Method, url: ParsedUrl, headers: HeaderMap, body: Bytes) -> Self {
        let is_form = headers
            .get(hyper::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        let form = if is_form {
            url::form_urlencoded::parse(&body).into_owned().collect()
        } else {
            HashMap::new()
        };

        Self {
            method,
            url,
            headers,
            body,
            form,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// What a handler function produces
#[derive(Debug)]
pub enum HandlerOutput {
    /// Full response body, sent with status 200
    Body(String),
    /// 302 to the given location
    Redirect(String),
    /// Render one template
    Template { path: String, tokens: Tokens },
    /// Render one template inside the structure template
    Structure { path: String, tokens: Tokens },
    /// Render several templates, in order, inside the structure template
    StructureList { paths: Vec<String>, tokens: Tokens },
    /// A response the handler built itself
    Response(Response<Full<Bytes>>),
}

impl HandlerOutput {
    pub const fn output_kind(&self) -> OutputKind {
        match self {
            Self::Body(_) | Self::Redirect(_) | Self::Response(_) => OutputKind::Function,
            Self::Template { .. } => OutputKind::Template,
            Self::Structure { .. } => OutputKind::Structure,
            Self::StructureList { .. } => OutputKind::StructureList,
        }
    }
}

impl From<String> for HandlerOutput {
    fn from(body: String) -> Self {
        Self::Body(body)
    }
}

impl From<&str> for HandlerOutput {
    fn from(body: &str) -> Self {
        Self::Body(body.to_string())
    }
}

impl From<Response<Full<Bytes>>> for HandlerOutput {
    fn from(response: Response<Full<Bytes>>) -> Self {
        Self::Response(response)
    }
}
