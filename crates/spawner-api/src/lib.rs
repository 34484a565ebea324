//! Wire surface of the spawner: protobuf schema, tonic service, proto⇄model
//! conversion and the axum side port for health and metrics.
//!
//! ## Features
//! - `grpc` (default): [`SpawnerApiService`], generated [`proto`] types and client helpers.
//! - `http` (default): [`HttpApi`] with `/healthz` and `/metrics`.
//!
//! ## Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use spawner_api::{SpawnerApiService, SpawnerServiceServer};
//!
//! let facade = Arc::new(spawner_core::facade(dispatcher, service));
//! tonic::transport::Server::builder()
//!     .add_service(SpawnerServiceServer::new(SpawnerApiService::new(facade)))
//!     .serve(addr)
//!     .await?;
//! ```
mod error;
pub use error::ApiError;
#[cfg(feature = "grpc")]
pub use error::{code_for, from_status};

#[cfg(feature = "grpc")]
pub mod proto {
    tonic::include_proto!("spawner.v1");
}

#[cfg(feature = "grpc")]
mod convert;

#[cfg(feature = "grpc")]
mod grpc;
#[cfg(feature = "grpc")]
pub use grpc::{SpawnerApiService, TRACE_ID_HEADER, parse_grpc_timeout, request_context};

#[cfg(feature = "grpc")]
pub mod client;

#[cfg(feature = "grpc")]
pub use proto::{
    spawner_service_client::SpawnerServiceClient, spawner_service_server::SpawnerServiceServer,
};

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use http::HttpApi;
