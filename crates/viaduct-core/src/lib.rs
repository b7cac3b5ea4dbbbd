//! # Viaduct Core
//!
//! Core types and traits for the Viaduct route-pipeline framework.
//!
//! This crate provides the foundational types used throughout Viaduct:
//!
//! - [`Context`] - Per-request data accumulated across pipeline stages
//! - [`Flow`] - The result of a stage: continue with a fragment, or halt
//! - [`Stage`] / [`Terminal`] - The pipeline step traits
//! - [`RequestParts`] - Immutable view of an incoming HTTP request
//! - [`HostServer`] - The registration interface a host server must expose
//! - [`RequestId`] - UUID v7 request identifier
//! - [`ConfigError`] - Registration-time configuration errors

#![doc(html_root_url = "https://docs.rs/viaduct-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod flow;
mod host;
mod ident;
mod request;
mod stage;

pub use context::Context;
pub use error::ConfigError;
pub use flow::{Flow, Halt, Outcome};
pub use host::{error_response, json_response, HostServer, Response, RouteHandler};
pub use ident::RequestId;
pub use request::RequestParts;
pub use stage::{
    stage_fn, terminal_fn, BoxFuture, FnStage, FnTerminal, Stage, StageFuture, Terminal,
    TerminalFuture,
};
