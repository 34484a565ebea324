//! Dispatch facade: the single entry point for neutral requests.
use std::sync::Arc;

use async_trait::async_trait;
use spawner_model::{
    EchoResponse, HealthCheckResponse, ReadCredentialRequest, ReadCredentialResponse, Request,
    Response, WriteCredentialRequest, WriteCredentialResponse,
};
use tracing::{debug, instrument};

use crate::{
    context::RequestContext,
    error::{CoreError, CoreResult},
    provider::call_provider,
    registry::ProviderRegistry,
    secrets::{SecretStore, read_credentials, write_credentials},
};

/// Anything that turns a neutral request into a neutral response.
///
/// Implemented by the [`Dispatcher`] and by every middleware layer wrapping it.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, ctx: &RequestContext, request: Request) -> CoreResult<Response>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, ctx: &RequestContext, request: Request) -> CoreResult<Response> {
        (**self).handle(ctx, request).await
    }
}

/// Innermost handler: answers provider-independent operations itself and routes
/// the rest to the registered adapter.
pub struct Dispatcher {
    registry: ProviderRegistry,
    secrets: Arc<dyn SecretStore>,
    secret_host_region: String,
}

impl Dispatcher {
    pub fn new(
        registry: ProviderRegistry,
        secrets: Arc<dyn SecretStore>,
        secret_host_region: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            secrets,
            secret_host_region: secret_host_region.into(),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    async fn read_credential(
        &self,
        ctx: &RequestContext,
        req: ReadCredentialRequest,
    ) -> CoreResult<ReadCredentialResponse> {
        if req.account.trim().is_empty() {
            return Err(CoreError::invalid("account cannot be empty"));
        }
        let credentials = read_credentials(
            self.secrets.as_ref(),
            ctx,
            &self.secret_host_region,
            &req.account,
            req.credential_type,
        )
        .await?;

        Ok(ReadCredentialResponse {
            account: req.account,
            credentials,
        })
    }

    async fn write_credential(
        &self,
        ctx: &RequestContext,
        req: WriteCredentialRequest,
    ) -> CoreResult<WriteCredentialResponse> {
        write_credentials(
            self.secrets.as_ref(),
            ctx,
            &self.secret_host_region,
            &req.account,
            &req.credentials,
        )
        .await?;
        Ok(WriteCredentialResponse {})
    }
}

#[async_trait]
impl Handler for Dispatcher {
    #[instrument(level = "debug", skip_all, fields(operation = %request.operation()))]
    async fn handle(&self, ctx: &RequestContext, request: Request) -> CoreResult<Response> {
        let operation = request.operation();
        match request {
            Request::HealthCheck(_) => Ok(HealthCheckResponse {}.into()),
            Request::Echo(req) => Ok(EchoResponse { msg: req.msg }.into()),
            Request::ReadCredential(req) => self
                .read_credential(ctx, req)
                .await
                .map(Response::from)
                .map_err(|e| e.context(operation)),
            Request::WriteCredential(req) => self
                .write_credential(ctx, req)
                .await
                .map(Response::from)
                .map_err(|e| e.context(operation)),
            request => {
                let identity = request
                    .identity()
                    .ok_or_else(|| CoreError::invalid(format!("{operation} needs a provider")))?;
                let provider = self.registry.pick(identity)?;
                debug!(provider = provider.name(), "dispatching");

                call_provider(provider.as_ref(), ctx, request)
                    .await
                    .map_err(|e| e.context(operation))
            }
        }
    }
}
