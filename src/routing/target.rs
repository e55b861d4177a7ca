//! Route targets
//!
//! What a routed request resolves to before output is produced.

use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigError, RouteSpec};
use crate::handler::{HandlerOutput, HandlerRequest};

/// Marker that makes a path a template rather than a plain file
pub const TEMPLATE_MARKER: &str = ".tpl";

/// Request handler function
pub type Handler = Arc<dyn Fn(&HandlerRequest) -> HandlerOutput + Send + Sync>;

/// Resolved destination of a request
#[derive(Clone)]
pub enum RouteTarget {
    Handler(Handler),
    File(String),
    Template(String),
    TemplateList(Vec<String>),
    Guarded(Guard),
}

/// Auth wrapper around exactly one non-guarded target
#[derive(Clone, Debug)]
pub struct Guard {
    requires_auth: bool,
    inner: Box<RouteTarget>,
}

impl Guard {
    pub const fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn inner(&self) -> &RouteTarget {
        &self.inner
    }
}

/// How a target produces its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    File,
    Template,
    Function,
    /// Only reachable through [`HandlerOutput::Structure`]
    Structure,
    StructureList,
}

impl RouteTarget {
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerOutput + Send + Sync + 'static,
    {
        Self::Handler(Arc::new(f))
    }

    /// Wrap `inner` in an auth guard. Returns `None` if `inner` is already guarded.
    pub fn guarded(requires_auth: bool, inner: Self) -> Option<Self> {
        if matches!(inner, Self::Guarded(_)) {
            return None;
        }
        Some(Self::Guarded(Guard {
            requires_auth,
            inner: Box::new(inner),
        }))
    }

    /// Target for a raw path: template if it carries the template marker, file otherwise
    pub fn from_path(path: &str) -> Self {
        if path.contains(TEMPLATE_MARKER) {
            Self::Template(path.to_string())
        } else {
            Self::File(path.to_string())
        }
    }

    /// Build a target from its config-file form. `key` is used in error messages.
    pub fn from_spec(key: &str, spec: &RouteSpec) -> Result<Self, ConfigError> {
        Ok(match spec {
            RouteSpec::Direct { body } => {
                let body = body.clone();
                Self::handler(move |_| HandlerOutput::Body(body.clone()))
            }
            RouteSpec::Redirect { target } => {
                let target = target.clone();
                Self::handler(move |_| HandlerOutput::Redirect(target.clone()))
            }
            RouteSpec::File { path } => Self::File(path.clone()),
            RouteSpec::Template { path } => Self::Template(path.clone()),
            RouteSpec::Templates { paths } => Self::TemplateList(paths.clone()),
            RouteSpec::Guarded { auth, target } => {
                let inner = Self::from_spec(key, target)?;
                Self::guarded(*auth, inner)
                    .ok_or_else(|| ConfigError::NestedGuard(key.to_string()))?
            }
        })
    }

    /// Output kind, looking through a guard
    pub fn output_kind(&self) -> OutputKind {
        match self {
            Self::Handler(_) => OutputKind::Function,
            Self::File(_) => OutputKind::File,
            Self::Template(_) => OutputKind::Template,
            Self::TemplateList(_) => OutputKind::StructureList,
            Self::Guarded(guard) => guard.inner.output_kind(),
        }
    }
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler(..)"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Template(path) => f.debug_tuple("Template").field(path).finish(),
            Self::TemplateList(paths) => f.debug_tuple("TemplateList").field(paths).finish(),
            Self::Guarded(guard) => f.debug_tuple("Guarded").field(guard).finish(),
        }
    }
}
