use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use url::Url;

use crate::api::ApiClient;
use crate::channel::{DynChannel, LogChannel, TcpChannel};
use crate::error::ChannelError;
use crate::i18n::Locale;

#[derive(clap::ValueEnum, Debug, Clone)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ApiEnv {
    /// Base URL of the storefront backend
    #[clap(long, env, default_value = "http://localhost:5000")]
    pub api_base_url: Url,
    /// Bearer token for the authenticated order and courier endpoints
    #[clap(long, env)]
    pub auth_token: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct Env {
    #[clap(flatten)]
    pub api: ApiEnv,
    /// Address of the realtime delivery gateway
    #[clap(long, env, default_value = "127.0.0.1:4010")]
    pub gateway_addr: String,
    /// Display language for the tracking panel
    #[clap(long, env, default_value = "en")]
    pub locale: Locale,
    #[clap(long, env, default_value = "info")]
    pub log_level: LogLevel,
    #[clap(long, env, default_value = "false")]
    pub dry_run: bool,
    /// Interval in seconds between replayed courier pings
    #[clap(long, env, default_value = "5")]
    pub replay_interval: u64,
}

impl Env {
    pub fn api_client(&self) -> ApiClient {
        ApiClient::new(self.api.api_base_url.clone(), self.api.auth_token.clone())
    }

    /// The gateway client to use: the real TCP connection, or a logging
    /// stand-in when running dry.
    pub async fn connect_channel(&self) -> Result<DynChannel, ChannelError> {
        if self.dry_run {
            Ok(Arc::new(LogChannel::new()))
        } else {
            let channel = TcpChannel::connect(self.gateway_addr.clone()).await?;
            Ok(Arc::new(channel))
        }
    }

    pub const fn get_replay_interval(&self) -> Duration {
        Duration::from_secs(self.replay_interval)
    }
}

pub fn setup_tracing(env: &Env) {
    let level: Level = (&env.log_level).into();
    let default_filter = format!("maison_track={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .compact()
        .init();
}
