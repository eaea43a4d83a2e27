//! Template renderer backed by minijinja.
//!
//! Every file in the template directory is loaded once at startup and
//! registered under its file stem (`widget.html` → `widget`). Output is
//! HTML-escaped unless a value passes through `unescaped`. Only `& < > " '`
//! are escaped; `/` is left alone.

use std::fs;
use std::path::Path;

use minijinja::value::Value as TemplateValue;
use minijinja::{escape_formatter, AutoEscape, Environment, Error, ErrorKind, Output, State};
use serde_json::Value;

use crate::render::filters;
use crate::render::{RenderError, Renderer};

pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.set_formatter(html_formatter);
        env.add_filter("tokey", filters::to_key);
        env.add_filter("fromkey", filters::from_key);
        env.add_filter("usd", filters::usd);
        env.add_filter("unescaped", filters::unescaped);
        env
    }

    /// Build from in-memory `(name, source)` pairs.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut env = Self::environment();
        for (name, source) in sources {
            let name = name.into();
            env.add_template_owned(name.clone(), source.into())
                .map_err(|source| RenderError::Template {
                    name,
                    source,
                    partial: String::new(),
                })?;
        }
        Ok(Self { env })
    }

    /// Load every regular file of `dir`. A missing directory yields an empty
    /// renderer so the server can still start without views.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, RenderError> {
        let dir = dir.as_ref();
        let io_err = |source| RenderError::Io {
            path: dir.display().to_string(),
            source,
        };

        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "Template directory missing, no views loaded");
            return Self::from_sources(Vec::<(String, String)>::new());
        }

        let mut sources = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = fs::read_to_string(&path).map_err(io_err)?;
            sources.push((stem.to_string(), source));
        }

        tracing::info!(dir = %dir.display(), count = sources.len(), "Templates loaded");
        Self::from_sources(sources)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        let tmpl = self.env.get_template(template).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => RenderError::NotFound(template.to_string()),
            _ => RenderError::Template {
                name: template.to_string(),
                source: e,
                partial: String::new(),
            },
        })?;

        let mut out = Vec::new();
        let result = tmpl.render_to_write(context(data), &mut out);
        let markup = String::from_utf8_lossy(&out).into_owned();
        match result {
            Ok(_) => Ok(markup),
            Err(source) => Err(RenderError::Template {
                name: template.to_string(),
                source,
                partial: markup,
            }),
        }
    }
}

/// HTML escaping limited to the five markup-significant characters.
fn html_formatter(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &TemplateValue,
) -> Result<(), Error> {
    let plain = !matches!(state.auto_escape(), AutoEscape::Html);
    if plain || value.is_safe() || value.is_undefined() || value.is_none() {
        return escape_formatter(out, state, value);
    }
    let text = value.to_string();
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    out.write_str(&escaped)
        .map_err(|_| Error::new(ErrorKind::WriteFailure, "failed to write template output"))
}

/// Template context: object fields at the top level, the whole value as `data`.
fn context(data: &Value) -> Value {
    match data {
        Value::Object(fields) => {
            let mut fields = fields.clone();
            fields.entry("data").or_insert_with(|| data.clone());
            Value::Object(fields)
        }
        other => serde_json::json!({ "data": other }),
    }
}
