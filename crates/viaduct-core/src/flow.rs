//! Stage control flow.
//!
//! Every pipeline stage resolves to a [`Flow`]: either continue with a
//! context fragment, or halt with a terminal response. The two outcomes
//! are a real sum type, so a stage cannot produce a result that is
//! neither.

use http::StatusCode;
use serde_json::Value;

use crate::context::Context;

/// The result of running one pipeline stage.
///
/// `Continue` carries a fragment to shallow-merge into the running
/// context; `Halt` carries the terminal response and stops the pipeline
/// immediately. Once a stage halts, no later stage runs and no further
/// merging occurs.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Proceed to the next stage, contributing a context fragment.
    Continue(Context),
    /// Stop the pipeline and respond with the given status and body.
    Halt(Halt),
}

impl Flow {
    /// Continue without contributing any fields.
    #[must_use]
    pub fn next() -> Self {
        Self::Continue(Context::new())
    }

    /// Continue, contributing the given fragment.
    #[must_use]
    pub fn fragment(fragment: Context) -> Self {
        Self::Continue(fragment)
    }

    /// Halt with the given status and response body.
    #[must_use]
    pub fn halt(status: StatusCode, body: Value) -> Self {
        Self::Halt(Halt::new(status, body))
    }

    /// Returns true for the `Halt` variant.
    #[must_use]
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt(_))
    }
}

/// Early termination of a pipeline with an explicit response.
#[derive(Debug, Clone, PartialEq)]
pub struct Halt {
    /// HTTP status code to respond with.
    pub status: StatusCode,
    /// JSON response body, sent verbatim.
    pub body: Value,
}

impl Halt {
    /// Creates a halt response.
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

/// The response produced by a terminal stage.
///
/// A terminal stage consumes the fully merged context and always
/// produces an outcome; there is no "continue" once the terminal runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// HTTP status code to respond with.
    pub status: StatusCode,
    /// JSON response payload, sent verbatim.
    pub data: Value,
}

impl Outcome {
    /// Creates an outcome with an explicit status.
    #[must_use]
    pub fn new(status: StatusCode, data: Value) -> Self {
        Self { status, data }
    }

    /// Creates a `200 OK` outcome.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self::new(StatusCode::OK, data)
    }
}
