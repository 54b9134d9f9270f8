//! Error types for declaration expansion.
//!
//! Every failure is fatal: the expander never returns a partially rewritten
//! tree. Each variant carries the span of the syntax that caused it so macro
//! entry points can point `compile_error!` at the offending attribute.

use proc_macro2::Span;
use thiserror::Error;

pub type Result<T, E = ExpandError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("undefined matrix `{name}`: no enclosing scope declaration binds it")]
    UndefinedMatrix { name: String, span: Span },

    #[error("`{name}` is bound more than once in the same scope declaration")]
    DuplicateBinding { name: String, span: Span },

    #[error("loop variable `{name}` appears more than once on the same declaration")]
    DuplicateThread { name: String, span: Span },

    #[error("malformed #[{marker}] attribute: {reason}")]
    MalformedMarker {
        marker: String,
        reason: String,
        span: Span,
    },

    #[error("malformed #[{marker}] declaration: {reason}")]
    MalformedScope {
        marker: String,
        reason: String,
        span: Span,
    },

    #[error("loop variable `{name}` ranges over an empty matrix; the declaration would expand to nothing")]
    EmptyMatrix { name: String, span: Span },

    #[error("loop marker enumerates more combinations than fit in memory")]
    TooManyCombinations { span: Span },

    #[error("unsupported {what}: {reason}")]
    UnsupportedShape {
        what: &'static str,
        reason: String,
        span: Span,
    },

    #[error("#[{marker}] is not allowed here: only members of modules, impls, traits and blocks are expanded")]
    StrayMarker { marker: String, span: Span },

    #[error(transparent)]
    Syntax(#[from] syn::Error),
}

impl ExpandError {
    /// Location of the syntax that caused the failure.
    pub fn span(&self) -> Span {
        match self {
            ExpandError::UndefinedMatrix { span, .. }
            | ExpandError::DuplicateBinding { span, .. }
            | ExpandError::DuplicateThread { span, .. }
            | ExpandError::MalformedMarker { span, .. }
            | ExpandError::MalformedScope { span, .. }
            | ExpandError::EmptyMatrix { span, .. }
            | ExpandError::TooManyCombinations { span }
            | ExpandError::UnsupportedShape { span, .. }
            | ExpandError::StrayMarker { span, .. } => *span,
            ExpandError::Syntax(err) => err.span(),
        }
    }

    pub(crate) fn malformed_marker(
        marker: impl Into<String>,
        reason: impl Into<String>,
        span: Span,
    ) -> Self {
        ExpandError::MalformedMarker {
            marker: marker.into(),
            reason: reason.into(),
            span,
        }
    }

    pub(crate) fn malformed_scope(
        marker: impl Into<String>,
        reason: impl Into<String>,
        span: Span,
    ) -> Self {
        ExpandError::MalformedScope {
            marker: marker.into(),
            reason: reason.into(),
            span,
        }
    }
}

impl From<ExpandError> for syn::Error {
    fn from(err: ExpandError) -> Self {
        match err {
            ExpandError::Syntax(err) => err,
            other => syn::Error::new(other.span(), other.to_string()),
        }
    }
}
