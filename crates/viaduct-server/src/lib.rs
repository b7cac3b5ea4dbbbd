//! # Viaduct Server
//!
//! A hyper/tokio host server for Viaduct route pipelines.
//!
//! [`HttpServer`] implements the
//! [`HostServer`](viaduct_core::HostServer) registration interface, so
//! a pipeline built with `viaduct::Pipeline` registers straight into
//! its route table. The serve loop handles one connection per task,
//! collects request bodies up front, and supports graceful shutdown.
//!
//! # Example
//!
//! ```rust,ignore
//! use viaduct_server::{HttpServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = HttpServer::new(ServerConfig::builder().http_addr("0.0.0.0:8080").build());
//!
//!     // ... register pipelines against `server` ...
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/viaduct-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod routes;
mod server;
mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use server::HttpServer;
pub use shutdown::{ConnectionTracker, ShutdownSignal};
