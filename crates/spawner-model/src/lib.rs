mod domain;
pub use domain::constants;
pub use domain::{Labels, ProviderIdentity, Secret};

mod error;
pub use error::{ModelError, ModelResult};

mod access;
pub use access::*;

mod cluster;
pub use cluster::*;

mod cost;
pub use cost::*;

mod credential;
pub use credential::*;

mod dns;
pub use dns::*;

mod storage;
pub use storage::*;

mod ops;
pub use ops::{
    EchoRequest, EchoResponse, HealthCheckRequest, HealthCheckResponse, Operation, Request,
    RequestMeta, Response,
};
