//! Sequential short-circuiting stage execution.
//!
//! The executor runs an ordered stage list against a base context:
//! fragments from continuing stages are merged in order, and the first
//! halt stops everything and passes through untouched. The same
//! executor backs full pipelines and reusable [`Link`]s, so a link
//! embedded in an outer pipeline is indistinguishable from its stages
//! inlined.

use std::sync::Arc;

use viaduct_core::{Context, Flow, RequestParts, Stage, StageFuture};

use anyhow::Context as _;

/// Runs `stages` in order against `base`.
///
/// Returns `Flow::Continue` carrying only the *accumulated fragments*
/// (not `base`), so the result can feed back into an enclosing pipeline
/// as an ordinary stage result. Each stage observes `base` plus every
/// fragment merged so far; merges are shallow and last-write-wins.
///
/// A stage `Err` propagates unchanged (annotated with the stage name)
/// for the dispatcher to contain.
pub(crate) async fn run_stages(
    stages: &[Arc<dyn Stage>],
    base: &Context,
    req: &RequestParts,
) -> anyhow::Result<Flow> {
    let mut working = base.clone();
    let mut delta = Context::new();

    for stage in stages {
        let flow = stage
            .call(&working, req)
            .await
            .with_context(|| format!("stage '{}' failed", stage.name()))?;

        match flow {
            Flow::Continue(fragment) => {
                working.merge(fragment.clone());
                delta.merge(fragment);
            }
            Flow::Halt(halt) => return Ok(Flow::Halt(halt)),
        }
    }

    Ok(Flow::Continue(delta))
}

/// A compiled stage list with no terminal stage, reusable as a single
/// stage inside another pipeline.
///
/// Produced by [`Pipeline::build_link`](crate::Pipeline::build_link)
/// and consumed by [`Pipeline::chain`](crate::Pipeline::chain).
/// Chaining a link is associative: the outer pipeline behaves exactly
/// as if the link's stages had been appended directly.
#[derive(Clone)]
pub struct Link {
    stages: Arc<[Arc<dyn Stage>]>,
}

impl Link {
    pub(crate) fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages: stages.into(),
        }
    }

    /// Returns the number of stages in this link.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the link contains no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").field("stages", &self.len()).finish()
    }
}

impl Stage for Link {
    fn name(&self) -> &'static str {
        "link"
    }

    fn call<'a>(&'a self, ctx: &'a Context, req: &'a RequestParts) -> StageFuture<'a> {
        Box::pin(async move { run_stages(&self.stages, ctx, req).await })
    }
}
