//! Schema-backed validation stages.
//!
//! A [`Schema`] validates one named request attribute and returns the
//! parsed (possibly transformed) value, or a structured list of issues.
//! [`SchemaStage`] adapts a schema into an ordinary pipeline stage:
//! success continues with a single-key fragment, an invalid input halts
//! with a 400 and the issues list, and an adapter failure halts with a
//! generic 500 whose detail is logged server-side only.
//!
//! Two serde-backed schemas are provided: [`JsonSchema`] for JSON
//! bodies and [`QuerySchema`] for URL query strings.

use std::marker::PhantomData;
use std::sync::Arc;

use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use viaduct_core::{Context, Flow, RequestParts, Stage, StageFuture};

/// One validation failure, with the path of the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Dotted path to the field that failed (e.g. `page`, `user.email`).
    pub path: String,
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl Issue {
    /// Creates an issue.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// An ordered list of validation issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IssueList(Vec<Issue>);

impl IssueList {
    /// Creates a list from issues.
    #[must_use]
    pub fn new(issues: Vec<Issue>) -> Self {
        Self(issues)
    }

    /// Creates a list holding a single issue.
    #[must_use]
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![Issue::new(path, message)])
    }

    /// Returns the number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no issues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the issues in order.
    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.0.iter()
    }
}

impl std::fmt::Display for IssueList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl From<Vec<Issue>> for IssueList {
    fn from(issues: Vec<Issue>) -> Self {
        Self(issues)
    }
}

/// Why a schema rejected (or failed to process) an input.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The input did not satisfy the schema. Expected, per-request,
    /// recoverable: becomes a 400 with the issues list.
    #[error("validation failed: {0}")]
    Invalid(IssueList),

    /// The adapter itself failed. Becomes a generic 500; the detail is
    /// logged server-side and never sent to the client.
    #[error("schema adapter failure: {0}")]
    Failure(#[from] anyhow::Error),
}

/// Validates one request attribute and returns the parsed value.
///
/// The input is the raw attribute: the parsed JSON body for
/// [`Target::Body`], or the raw query string (as a JSON string value)
/// for [`Target::Query`]. The output is the schema's transform of the
/// input, which becomes the fragment value stored under the target key.
pub trait Schema: Send + Sync + 'static {
    /// Parses and validates the input.
    fn parse(&self, input: &Value) -> Result<Value, SchemaError>;
}

/// A serde-backed schema for JSON request bodies.
///
/// Deserializes the body into `T` and re-serializes it, so defaults and
/// renames declared on `T` are applied to the stored value. Issue paths
/// point at the failing field.
///
/// # Example
///
/// ```
/// use viaduct::schema::{JsonSchema, Schema};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Deserialize, Serialize)]
/// struct CreateItem {
///     name: String,
///     #[serde(default)]
///     tags: Vec<String>,
/// }
///
/// let schema = JsonSchema::<CreateItem>::new();
/// let parsed = schema.parse(&json!({"name": "widget"})).unwrap();
/// assert_eq!(parsed, json!({"name": "widget", "tags": []}));
///
/// assert!(schema.parse(&json!({"name": 42})).is_err());
/// ```
pub struct JsonSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSchema<T> {
    /// Creates the schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for JsonSchema<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    fn parse(&self, input: &Value) -> Result<Value, SchemaError> {
        let typed: T = serde_path_to_error::deserialize(input).map_err(|e| {
            let path = e.path().to_string();
            SchemaError::Invalid(IssueList::single(path, e.into_inner().to_string()))
        })?;
        serde_json::to_value(&typed).map_err(|e| SchemaError::Failure(e.into()))
    }
}

/// A serde-backed schema for URL query strings.
///
/// Parses the raw query string into `T` via `serde_urlencoded`, which
/// coerces numeric and boolean parameters (`page=2` becomes the number
/// `2`), then re-serializes the typed value.
///
/// # Example
///
/// ```
/// use viaduct::schema::{QuerySchema, Schema};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Deserialize, Serialize)]
/// struct PageQuery { page: u32 }
///
/// let schema = QuerySchema::<PageQuery>::new();
/// let parsed = schema.parse(&json!("page=2")).unwrap();
/// assert_eq!(parsed, json!({"page": 2}));
/// ```
pub struct QuerySchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> QuerySchema<T> {
    /// Creates the schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for QuerySchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for QuerySchema<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    fn parse(&self, input: &Value) -> Result<Value, SchemaError> {
        let raw = input
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("query schema expects the raw query string"))?;

        let deserializer =
            serde_urlencoded::Deserializer::new(form_urlencoded::parse(raw.as_bytes()));
        let typed: T = serde_path_to_error::deserialize(deserializer).map_err(|e| {
            let path = e.path().to_string();
            SchemaError::Invalid(IssueList::single(path, e.into_inner().to_string()))
        })?;
        serde_json::to_value(&typed).map_err(|e| SchemaError::Failure(e.into()))
    }
}

/// The request attribute a [`SchemaStage`] validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The JSON request body.
    Body,
    /// The URL query string.
    Query,
}

impl Target {
    /// The context key the parsed value is stored under.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Query => "query",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A pipeline stage generated from a [`Schema`].
///
/// Reads the target attribute off the request, runs the schema, and:
///
/// - on success, continues with the single-key fragment
///   `{ "<target>": parsed }`;
/// - on invalid input, halts with the configured status (400 by
///   default) and the issues list;
/// - on adapter failure, halts with a generic 500; the detail is
///   logged, never sent to the client.
pub struct SchemaStage {
    target: Target,
    schema: Arc<dyn Schema>,
    invalid_status: StatusCode,
}

impl SchemaStage {
    /// Creates a stage validating the given attribute.
    #[must_use]
    pub fn new(target: Target, schema: impl Schema) -> Self {
        Self {
            target,
            schema: Arc::new(schema),
            invalid_status: StatusCode::BAD_REQUEST,
        }
    }

    /// Creates a stage validating the JSON request body.
    #[must_use]
    pub fn body(schema: impl Schema) -> Self {
        Self::new(Target::Body, schema)
    }

    /// Creates a stage validating the URL query string.
    #[must_use]
    pub fn query(schema: impl Schema) -> Self {
        Self::new(Target::Query, schema)
    }

    /// Overrides the status used for invalid input (default 400).
    #[must_use]
    pub fn with_invalid_status(mut self, status: StatusCode) -> Self {
        self.invalid_status = status;
        self
    }

    fn invalid_halt(&self, issues: &IssueList) -> Flow {
        Flow::halt(
            self.invalid_status,
            json!({
                "error": {
                    "code": "VALIDATION_FAILED",
                    "message": format!("request validation failed for {}", self.target),
                    "issues": issues
                }
            }),
        )
    }
}

impl Stage for SchemaStage {
    fn name(&self) -> &'static str {
        match self.target {
            Target::Body => "body-schema",
            Target::Query => "query-schema",
        }
    }

    fn call<'a>(&'a self, _ctx: &'a Context, req: &'a RequestParts) -> StageFuture<'a> {
        Box::pin(async move {
            let input = match self.target {
                Target::Body => match req.body_json() {
                    Ok(value) => value,
                    Err(e) => {
                        let issues = IssueList::single("body", format!("invalid JSON: {e}"));
                        return Ok(self.invalid_halt(&issues));
                    }
                },
                Target::Query => Value::String(req.query_string().unwrap_or("").to_string()),
            };

            match self.schema.parse(&input) {
                Ok(parsed) => Ok(Flow::fragment(Context::new().with(self.target.key(), parsed))),
                Err(SchemaError::Invalid(issues)) => Ok(self.invalid_halt(&issues)),
                Err(SchemaError::Failure(error)) => {
                    tracing::error!(target = %self.target, error = ?error, "schema adapter failed");
                    Ok(Flow::halt(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({
                            "error": {
                                "code": "INTERNAL_ERROR",
                                "message": "internal server error"
                            }
                        }),
                    ))
                }
            }
        })
    }
}
