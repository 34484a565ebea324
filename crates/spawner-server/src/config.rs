use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use serde::Deserialize;
use spawner_core::session::LocalCredentials;
use spawner_model::{AwsCredentials, Credentials, Secret};
use spawner_observe::{LoggerConfig, LoggerError, LoggerLevel};
use spawner_providers::sandbox::SandboxConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid logger settings: {0}")]
    Logger(#[from] LoggerError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Command line; every flag also reads its environment variable and wins over the file.
#[derive(Debug, Default, Parser)]
#[command(name = "spawner", version, about = "Multi-cloud cluster control-plane gRPC service")]
pub struct Cli {
    /// TOML config file.
    #[arg(long, env = "SPAWNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Environment name; `local` enables the local credential chain.
    #[arg(long, env = "SPAWNER_ENV")]
    pub env: Option<String>,

    #[arg(long, env = "SPAWNER_GRPC_ADDR")]
    pub grpc_addr: Option<SocketAddr>,

    #[arg(long, env = "SPAWNER_HTTP_ADDR")]
    pub http_addr: Option<SocketAddr>,

    /// Region holding credentials and cluster tokens.
    #[arg(long, env = "SPAWNER_SECRET_HOST_REGION")]
    pub secret_host_region: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub aws_session_token: Option<String>,

    /// Local profiles file (TOML).
    #[arg(long, env = "SPAWNER_PROFILES_PATH")]
    pub profiles_path: Option<PathBuf>,

    #[arg(long, env = "SPAWNER_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    #[arg(long, env = "SPAWNER_RANCHER_URL")]
    pub rancher_url: Option<String>,

    /// Route53 hosted zone; empty disables DNS operations.
    #[arg(long, env = "SPAWNER_HOSTED_ZONE_ID")]
    pub hosted_zone_id: Option<String>,

    /// Log filter expression (e.g. "info", "spawner_core=debug,info").
    #[arg(long, env = "SPAWNER_LOG")]
    pub log_level: Option<String>,
}

/// Credentials written to the secret store at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedCredential {
    pub account: String,
    #[serde(flatten)]
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub env: String,
    pub grpc_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub secret_host_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub profiles_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub rancher_url: String,
    pub hosted_zone_id: String,
    pub sandbox: SandboxConfig,
    pub logger: LoggerConfig,
    pub seed_credentials: Vec<SeedCredential>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            grpc_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8083)),
            http_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8084)),
            secret_host_region: "us-east-1".to_string(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_session_token: None,
            profiles_path: None,
            poll_interval_ms: 2_000,
            rancher_url: "https://rancher.local".to_string(),
            hosted_zone_id: String::new(),
            sandbox: SandboxConfig::default(),
            logger: LoggerConfig::default(),
            seed_credentials: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// File (if any), then flags and environment on top.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut cfg = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply(cli)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply(&mut self, cli: &Cli) -> Result<(), ConfigError> {
        if let Some(v) = &cli.env {
            self.env = v.clone();
        }
        if let Some(v) = cli.grpc_addr {
            self.grpc_addr = v;
        }
        if let Some(v) = cli.http_addr {
            self.http_addr = v;
        }
        if let Some(v) = &cli.secret_host_region {
            self.secret_host_region = v.clone();
        }
        if cli.aws_access_key_id.is_some() {
            self.aws_access_key_id = cli.aws_access_key_id.clone();
        }
        if cli.aws_secret_access_key.is_some() {
            self.aws_secret_access_key = cli.aws_secret_access_key.clone();
        }
        if cli.aws_session_token.is_some() {
            self.aws_session_token = cli.aws_session_token.clone();
        }
        if cli.profiles_path.is_some() {
            self.profiles_path = cli.profiles_path.clone();
        }
        if let Some(v) = cli.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = &cli.rancher_url {
            self.rancher_url = v.clone();
        }
        if let Some(v) = &cli.hosted_zone_id {
            self.hosted_zone_id = v.clone();
        }
        if let Some(v) = &cli.log_level {
            self.logger.level = LoggerLevel::new(v.as_str())?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.env.trim().is_empty() {
            return Err(ConfigError::Invalid("env cannot be empty".into()));
        }
        if self.secret_host_region.trim().is_empty() {
            return Err(ConfigError::Invalid("secret_host_region cannot be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if self.grpc_addr == self.http_addr {
            return Err(ConfigError::Invalid(format!(
                "grpc_addr and http_addr both use {}",
                self.grpc_addr
            )));
        }
        if let Some(seed) = self.seed_credentials.iter().find(|s| !s.credentials.is_usable()) {
            return Err(ConfigError::Invalid(format!(
                "seeded {} credentials for '{}' are incomplete",
                seed.credentials.credential_type(),
                seed.account
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Credential sources used when running with `env = "local"`.
    pub fn local_credentials(&self) -> LocalCredentials {
        let static_aws = self.aws_access_key_id.as_ref().map(|id| AwsCredentials {
            access_key_id: id.clone(),
            secret_access_key: Secret::new(self.aws_secret_access_key.clone().unwrap_or_default()),
            session_token: Secret::new(self.aws_session_token.clone().unwrap_or_default()),
        });
        LocalCredentials {
            static_aws,
            profiles_path: self.profiles_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawner_model::CredentialType;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::load(&Cli::default()).unwrap();
        assert_eq!(cfg.env, "dev");
        assert_eq!(cfg.grpc_addr.port(), 8083);
        assert_eq!(cfg.http_addr.port(), 8084);
        assert_eq!(cfg.secret_host_region, "us-east-1");
        assert_eq!(cfg.poll_interval(), Duration::from_secs(2));
        assert!(cfg.hosted_zone_id.is_empty());
        assert_eq!(cfg.sandbox, SandboxConfig::default());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: ServerConfig = toml::from_str(
            r#"
            env = "staging"
            grpc_addr = "127.0.0.1:9000"

            [logger]
            format = "json"

            [sandbox]
            settle_polls = 5

            [[seed_credentials]]
            account = "team"
            type = "aws"
            access_key_id = "AKIASANDBOX"
            secret_access_key = "sandbox"

            [[seed_credentials]]
            account = "nsp-dev"
            type = "git-pat"
            token = "very-secret"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.env, "staging");
        assert_eq!(cfg.grpc_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(cfg.http_addr.port(), 8084);
        assert_eq!(cfg.sandbox.settle_polls, 5);
        assert_eq!(cfg.sandbox.instance_lag, 1);

        let kinds: Vec<_> = cfg
            .seed_credentials
            .iter()
            .map(|s| (s.account.as_str(), s.credentials.credential_type()))
            .collect();
        assert_eq!(
            kinds,
            [("team", CredentialType::Aws), ("nsp-dev", CredentialType::GitPat)]
        );
    }

    #[test]
    fn flags_override_file_values() {
        let mut cfg = ServerConfig::default();
        let cli = Cli {
            env: Some("local".into()),
            poll_interval_ms: Some(50),
            log_level: Some("spawner_core=debug,info".into()),
            aws_access_key_id: Some("AKIALOCAL".into()),
            aws_secret_access_key: Some("s3cr3t".into()),
            ..Default::default()
        };
        cfg.apply(&cli).unwrap();

        assert_eq!(cfg.env, "local");
        assert_eq!(cfg.poll_interval(), Duration::from_millis(50));
        assert_eq!(cfg.logger.level.as_str(), "spawner_core=debug,info");

        let local = cfg.local_credentials();
        let keys = local.static_aws.unwrap();
        assert_eq!(keys.access_key_id, "AKIALOCAL");
        assert_eq!(keys.secret_access_key.expose(), "s3cr3t");
        assert!(keys.session_token.is_empty());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cfg = ServerConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let cfg = ServerConfig {
            http_addr: ServerConfig::default().grpc_addr,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let cli = Cli {
            log_level: Some("x=nope".into()),
            ..Default::default()
        };
        let mut cfg = ServerConfig::default();
        assert!(matches!(cfg.apply(&cli), Err(ConfigError::Logger(_))));
    }

    #[test]
    fn incomplete_seed_is_rejected() {
        let cfg: ServerConfig = toml::from_str(
            r#"
            [[seed_credentials]]
            account = "team"
            type = "aws"
            access_key_id = ""
            secret_access_key = ""
            "#,
        )
        .unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/spawner.toml")),
            ..Default::default()
        };
        assert!(matches!(ServerConfig::load(&cli), Err(ConfigError::Read { .. })));
    }
}
