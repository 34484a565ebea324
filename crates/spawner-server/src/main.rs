mod config;

use std::sync::Arc;

use clap::Parser;
use tonic::transport::Server;
use tracing::{info, warn};

use spawner_api::{HttpApi, SpawnerApiService, SpawnerServiceServer};
use spawner_core::{
    Dispatcher, PollConfig, RequestContext, ServiceContext, facade,
    secrets::{MemorySecretStore, SecretStore, write_credentials},
    session::{CredentialSessionFactory, SecretStoreResolver},
};
use spawner_observe::init_logger;
use spawner_prometheus::PrometheusMetrics;
use spawner_providers::{
    AdapterDeps,
    aws::AwsSettings,
    sandbox::{SandboxCloud, SandboxRancher},
};

use crate::config::{Cli, ServerConfig};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) config
    let cfg = ServerConfig::load(&Cli::parse())?;

    // 2) logger
    init_logger(&cfg.logger)?;
    info!(env = %cfg.env, "logger initialized");

    // 3) metrics + service context
    let metrics = PrometheusMetrics::new()?;
    let service = ServiceContext::new(cfg.env.clone(), Arc::new(metrics.clone()));

    // 4) secret store, seeded from config
    let secrets: Arc<dyn SecretStore> = Arc::new(MemorySecretStore::new());
    let boot = RequestContext::new().with_trace_id("startup");
    for seed in &cfg.seed_credentials {
        write_credentials(
            secrets.as_ref(),
            &boot,
            &cfg.secret_host_region,
            &seed.account,
            &seed.credentials,
        )
        .await?;
        info!(account = %seed.account, kind = %seed.credentials.credential_type(), "seeded credentials");
    }

    // 5) session factory
    let resolver = Arc::new(SecretStoreResolver::new(secrets.clone()));
    let mut sessions = CredentialSessionFactory::new(resolver, cfg.secret_host_region.clone());
    if service.is_local() {
        sessions = sessions.with_local(cfg.local_credentials());
        info!("local credential chain enabled");
    }

    // 6) provider adapters over the sandbox clouds
    let cloud = SandboxCloud::new(cfg.sandbox);
    let deps = AdapterDeps {
        service: service.clone(),
        sessions: Arc::new(sessions),
        secrets: secrets.clone(),
        rancher: Arc::new(SandboxRancher::new(cfg.rancher_url.clone())),
        poll: PollConfig::new(cfg.poll_interval()),
        secret_host_region: cfg.secret_host_region.clone(),
    };
    if cfg.hosted_zone_id.is_empty() {
        warn!("no hosted zone configured; DNS operations are unsupported");
    }
    let registry = spawner_providers::registry(
        deps,
        cloud.aws.clone(),
        cloud.azure.clone(),
        cloud.gcp.clone(),
        AwsSettings {
            hosted_zone_id: cfg.hosted_zone_id.clone(),
        },
    );
    let keys: Vec<_> = registry.keys().collect();
    info!(providers = ?keys, "providers registered");

    // 7) dispatcher + middleware
    let dispatcher = Dispatcher::new(registry, secrets, cfg.secret_host_region.clone());
    let api = SpawnerApiService::new(Arc::new(facade(dispatcher, service.clone())));

    // 8) side port: health + metrics
    let router = HttpApi::new(service).with_metrics(metrics).router();
    let listener = tokio::net::TcpListener::bind(cfg.http_addr).await?;
    info!("http listening on {}", cfg.http_addr);
    let http = async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(anyhow::Error::from)
    };

    // 9) gRPC server
    info!("starting gRPC server on {}", cfg.grpc_addr);
    let grpc = async move {
        Server::builder()
            .add_service(SpawnerServiceServer::new(api))
            .serve_with_shutdown(cfg.grpc_addr, shutdown_signal())
            .await
            .map_err(anyhow::Error::from)
    };

    tokio::try_join!(grpc, http)?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
