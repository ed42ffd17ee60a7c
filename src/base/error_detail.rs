//! Single-line diagnostics for arbitrary failures.
//!
//! An [`ErrorDetail`] is the primary message of a failure followed by any of the
//! optional facets the failure carries, always in the order `code`, `errno`,
//! `type`, `cause`, joined by `" | "`. Formatting never fails.

use std::{any::Any, error::Error as StdError, fmt};

use serde_json::Value;
use slack_morphism::errors::SlackClientError;

/// Delimiter between the segments of a detail line.
pub const SEGMENT_DELIMITER: &str = " | ";

/// Formatted, immutable diagnostic for one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail(String);

impl ErrorDetail {
    /// Formats an `anyhow` error, walking its whole source chain for facets.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self::from_std(&**err)
    }

    /// Formats any standard error, walking its whole source chain for facets.
    pub fn from_std(err: &(dyn StdError + 'static)) -> Self {
        let mut facets = Facets::default();
        let mut chain = Vec::new();

        let mut current = Some(err);
        while let Some(e) = current {
            facets.absorb(e);
            chain.push(e);
            current = e.source();
        }

        // Without an explicit cause, whatever sits below the outermost error is the cause.
        if facets.cause.is_none() && chain.len() > 1 {
            let rest = chain[1..].iter().map(|e| e.to_string()).filter(|m| !m.is_empty()).collect::<Vec<_>>();

            if !rest.is_empty() {
                facets.cause = Some(rest.join(": "));
            }
        }

        let mut message = err.to_string();
        if message.is_empty() {
            message = format!("{err:?}");
        }

        Self::compose(message, facets)
    }

    /// Formats a panic payload, as caught by a panic hook or a `JoinError`.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with a non-string payload".to_string()
        };

        Self(message)
    }

    fn compose(message: String, facets: Facets) -> Self {
        let mut segments = vec![message];

        if let Some(code) = facets.code {
            segments.push(format!("code: {code}"));
        }
        if let Some(errno) = facets.errno {
            segments.push(format!("errno: {errno}"));
        }
        if let Some(kind) = facets.kind {
            segments.push(format!("type: {kind}"));
        }
        if let Some(cause) = facets.cause {
            segments.push(format!("cause: {cause}"));
        }

        Self(segments.join(SEGMENT_DELIMITER))
    }

    /// The formatted line.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&anyhow::Error> for ErrorDetail {
    fn from(err: &anyhow::Error) -> Self {
        Self::from_error(err)
    }
}

/// Facets discovered along a source chain; the outermost error that has one wins.
#[derive(Default)]
struct Facets {
    code: Option<String>,
    errno: Option<i32>,
    kind: Option<String>,
    cause: Option<String>,
}

impl Facets {
    fn absorb(&mut self, err: &(dyn StdError + 'static)) {
        if let Some(faceted) = err.downcast_ref::<FacetedError>() {
            fill(&mut self.code, faceted.code.clone());
            fill(&mut self.errno, faceted.errno);
            fill(&mut self.kind, faceted.kind.clone());
            fill(&mut self.cause, faceted.cause.as_ref().map(render_cause));
        } else if let Some(io) = err.downcast_ref::<std::io::Error>() {
            fill(&mut self.errno, io.raw_os_error());
            fill(&mut self.kind, Some(format!("{:?}", io.kind())));
        } else if let Some(slack) = err.downcast_ref::<SlackClientError>() {
            match slack {
                SlackClientError::ApiError(api) => {
                    fill(&mut self.code, Some(api.code.clone()));
                    fill(&mut self.kind, Some("api".to_string()));
                }
                _ => fill(&mut self.kind, Some("slack".to_string())),
            }
        }
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Structured causes are rendered as JSON; plain strings as-is.
fn render_cause(cause: &Value) -> String {
    match cause {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A failure that carries explicit diagnostic facets.
///
/// Transports use this to surface the machine code or errno they received
/// alongside the human-readable message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetedError {
    /// Human-readable message; the first segment of the detail line.
    pub message: String,
    /// Machine-readable code, e.g. `ETIMEDOUT` or a platform error string.
    pub code: Option<String>,
    /// OS error number.
    pub errno: Option<i32>,
    /// Error category, rendered as the `type` segment.
    pub kind: Option<String>,
    /// Underlying cause; strings render as-is, anything else as JSON.
    pub cause: Option<Value>,
}

impl FacetedError {
    /// A failure with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Sets the `code` facet.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the `errno` facet.
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    /// Sets the `type` facet.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the `cause` facet, taking precedence over any error source.
    pub fn with_cause(mut self, cause: impl Into<Value>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for FacetedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for FacetedError {}

// Tests.
