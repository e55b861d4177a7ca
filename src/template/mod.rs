//! Template module
//!
//! Compilation is delegated to a [`TemplateEngine`]; compiled templates are
//! kept in a [`TemplateCache`] for the lifetime of the process.

mod cache;

use minijinja::{AutoEscape, Environment};
use std::sync::Arc;
use thiserror::Error;

pub use cache::TemplateCache;

/// Template variables
pub type Tokens = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to compile template '{name}': {message}")]
    Compile { name: String, message: String },
    #[error("failed to render template '{name}': {message}")]
    Render { name: String, message: String },
}

/// A compiled, renderable template
pub trait CompiledTemplate: Send + Sync {
    fn render(&self, tokens: &Tokens) -> Result<String, TemplateError>;
}

/// Turns template source into a [`CompiledTemplate`]
pub trait TemplateEngine: Send + Sync {
    fn compile(
        &self,
        name: &str,
        source: String,
    ) -> Result<Arc<dyn CompiledTemplate>, TemplateError>;
}

/// Jinja-style engine backed by `minijinja`.
///
/// Output is not auto-escaped: rendered fragments are spliced into the
/// structure template as raw HTML.
#[derive(Debug, Default, Clone, Copy)]
pub struct MiniJinjaEngine;

struct MiniJinjaTemplate {
    name: String,
    env: Environment<'static>,
}

impl TemplateEngine for MiniJinjaEngine {
    fn compile(
        &self,
        name: &str,
        source: String,
    ) -> Result<Arc<dyn CompiledTemplate>, TemplateError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template_owned(name.to_string(), source)
            .map_err(|e| TemplateError::Compile {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Arc::new(MiniJinjaTemplate {
            name: name.to_string(),
            env,
        }))
    }
}

impl CompiledTemplate for MiniJinjaTemplate {
    fn render(&self, tokens: &Tokens) -> Result<String, TemplateError> {
        self.env
            .get_template(&self.name)
            .and_then(|template| template.render(tokens))
            .map_err(|e| TemplateError::Render {
                name: self.name.clone(),
                message: e.to_string(),
            })
    }
}
