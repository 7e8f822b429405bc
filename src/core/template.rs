use std::fmt;
use std::sync::Arc;

use crate::core::error::{Error, Result};
use crate::core::state::StateBag;
use crate::core::Value;

type TemplateFn = dyn Fn(&TemplateArgs) -> Result<Value> + Send + Sync;

/// Either a fixed value or a callable over a declared set of state entries.
///
/// A callable template lists the parameter names it accepts when it is built.
/// At render time it only sees the entries of the state bag matching those
/// names, so unrelated keys never reach it.
#[derive(Clone)]
pub enum Template {
    Static(Value),
    Callable {
        params: Vec<String>,
        func: Arc<TemplateFn>,
    },
}

impl Template {
    pub fn fixed(value: impl Into<Value>) -> Self {
        Template::Static(value.into())
    }

    /// Builds a callable template accepting exactly `params`.
    pub fn func<P, S, F>(params: P, func: F) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&TemplateArgs) -> Result<Value> + Send + Sync + 'static,
    {
        Template::Callable {
            params: params.into_iter().map(Into::into).collect(),
            func: Arc::new(func),
        }
    }

    /// The parameter names this template accepts. Empty for static templates.
    pub fn params(&self) -> &[String] {
        match self {
            Template::Static(_) => &[],
            Template::Callable { params, .. } => params,
        }
    }

    pub fn render(&self, state: &StateBag) -> Result<Value> {
        match self {
            Template::Static(value) => Ok(value.clone()),
            Template::Callable { params, func } => {
                let args = TemplateArgs {
                    values: state.select(params.as_slice()),
                };
                func(&args)
            }
        }
    }

    /// Renders the template and turns the result into prompt text.
    pub fn render_prompt(&self, state: &StateBag) -> Result<String> {
        Ok(value_to_text(self.render(state)?))
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Template::Callable { params, .. } => {
                f.debug_struct("Callable").field("params", params).finish()
            }
        }
    }
}

impl From<&str> for Template {
    fn from(value: &str) -> Self {
        Template::fixed(value)
    }
}

impl From<String> for Template {
    fn from(value: String) -> Self {
        Template::fixed(value)
    }
}

impl From<Value> for Template {
    fn from(value: Value) -> Self {
        Template::Static(value)
    }
}

/// The filtered view of the state handed to a callable template.
#[derive(Debug, Clone)]
pub struct TemplateArgs {
    values: StateBag,
}

impl TemplateArgs {
    /// The value for `name`, if the state held one.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The value for `name`, failing with [`Error::MissingParameter`] if absent.
    pub fn require(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    /// The value for `name` as display text: strings verbatim, anything
    /// else in its JSON form.
    pub fn text(&self, name: &str) -> Result<String> {
        self.require(name).map(|v| value_to_text(v.clone()))
    }

    pub fn index(&self, name: &str) -> Result<u64> {
        self.require(name)?
            .as_u64()
            .ok_or_else(|| Error::failed(format!("Parameter '{}' is not an index", name)))
    }

    pub fn state(&self) -> &StateBag {
        &self.values
    }
}

/// Strings are used verbatim, every other value in its JSON form.
pub fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
