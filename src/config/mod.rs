//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vetrina";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Command-line arguments for the Vetrina binary.
#[derive(Debug, Parser)]
#[command(name = "vetrina", version, about = "Vetrina catalog gateway")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VETRINA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Override the listener port.
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Override the log output format (json|compact).
    #[arg(long = "log-format", value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Override the upstream catalog REST root.
    #[arg(long = "upstream-url", value_name = "URL")]
    pub upstream_url: Option<String>,

    /// Disable the object cache.
    #[arg(long = "no-cache", action = clap::ArgAction::SetTrue)]
    pub no_cache: bool,

    /// Disable the rendered-page cache.
    #[arg(long = "no-page-cache", action = clap::ArgAction::SetTrue)]
    pub no_page_cache: bool,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub upstream: UpstreamSettings,
    pub cache: CacheSettings,
    pub revalidate: RevalidateSettings,
    pub webhook: WebhookSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub page_cache_enabled: bool,
    pub list_ttl_seconds: u64,
    pub product_ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct RevalidateSettings {
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub endpoint: Option<Url>,
    pub secret: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("VETRINA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Parse the process arguments and resolve configuration from them.
pub fn load_with_cli() -> Result<Settings, LoadError> {
    let args = CliArgs::parse();
    load(&args)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    upstream: RawUpstreamSettings,
    cache: RawCacheSettings,
    revalidate: RawRevalidateSettings,
    webhook: RawWebhookSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(format) = overrides.log_format.as_ref() {
            self.logging.format = Some(format.clone());
        }
        if let Some(url) = overrides.upstream_url.as_ref() {
            self.upstream.base_url = Some(url.clone());
        }
        if overrides.no_cache {
            self.cache.enabled = Some(false);
        }
        if overrides.no_page_cache {
            self.cache.page_cache_enabled = Some(false);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            upstream,
            cache,
            revalidate,
            webhook,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let upstream = build_upstream_settings(upstream)?;
        let cache = build_cache_settings(cache);
        let revalidate = build_revalidate_settings(revalidate)?;
        let webhook = build_webhook_settings(webhook, &revalidate)?;

        Ok(Self {
            server,
            logging,
            upstream,
            cache,
            revalidate,
            webhook,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = match logging.format.as_deref() {
        Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
        Some(value) if value.eq_ignore_ascii_case("compact") => LogFormat::Compact,
        Some(other) => {
            return Err(LoadError::invalid(
                "logging.format",
                format!("unknown format `{other}`, expected json or compact"),
            ));
        }
        None => LogFormat::Compact,
    };

    Ok(LoggingSettings { level, format })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let base_url = match upstream.base_url.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Url::parse(raw)
            .map_err(|err| LoadError::invalid("upstream.base_url", format!("invalid url: {err}")))?,
        _ => {
            return Err(LoadError::invalid(
                "upstream.base_url",
                "must be set to the catalog backend's REST root",
            ));
        }
    };
    if base_url.cannot_be_a_base() {
        return Err(LoadError::invalid(
            "upstream.base_url",
            "url cannot serve as a base",
        ));
    }

    let timeout_secs = upstream
        .timeout_seconds
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "upstream.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(UpstreamSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    // A zero TTL is legal: every read becomes a logical miss while the
    // invalidation paths keep working.
    CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        page_cache_enabled: cache.page_cache_enabled.unwrap_or(true),
        list_ttl_seconds: cache.list_ttl_seconds.unwrap_or(300),
        product_ttl_seconds: cache.product_ttl_seconds.unwrap_or(1800),
    }
}

fn build_revalidate_settings(
    revalidate: RawRevalidateSettings,
) -> Result<RevalidateSettings, LoadError> {
    let secret = revalidate
        .secret
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            LoadError::invalid(
                "revalidate.secret",
                "must be set to the shared revalidation secret",
            )
        })?;

    Ok(RevalidateSettings {
        secret: secret.to_string(),
    })
}

fn build_webhook_settings(
    webhook: RawWebhookSettings,
    revalidate: &RevalidateSettings,
) -> Result<WebhookSettings, LoadError> {
    // An empty endpoint value means "not configured", matching how the
    // backend treats a blank option.
    let endpoint = match webhook.endpoint.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(Url::parse(raw).map_err(|err| {
            LoadError::invalid("webhook.endpoint", format!("invalid url: {err}"))
        })?),
        _ => None,
    };

    let secret = webhook
        .secret
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| revalidate.secret.clone());

    Ok(WebhookSettings { endpoint, secret })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    page_cache_enabled: Option<bool>,
    list_ttl_seconds: Option<u64>,
    product_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidateSettings {
    secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWebhookSettings {
    endpoint: Option<String>,
    secret: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_raw() -> RawSettings {
        let mut raw = RawSettings::default();
        raw.upstream.base_url = Some("http://backend.local/wp-json/wp/v2".to_string());
        raw.revalidate.secret = Some("hunter2".to_string());
        raw
    }

    #[test]
    fn minimal_settings_resolve_with_defaults() {
        let settings = Settings::from_raw(minimal_raw()).expect("valid settings");

        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.upstream.timeout, Duration::from_secs(10));
        assert!(settings.cache.enabled);
        assert!(settings.cache.page_cache_enabled);
        assert_eq!(settings.cache.list_ttl_seconds, 300);
        assert_eq!(settings.cache.product_ttl_seconds, 1800);
        assert_eq!(settings.webhook.endpoint, None);
        // Webhook secret falls back to the revalidation secret.
        assert_eq!(settings.webhook.secret, "hunter2");
    }

    #[test]
    fn missing_upstream_url_is_rejected() {
        let mut raw = minimal_raw();
        raw.upstream.base_url = None;

        let error = Settings::from_raw(raw).expect_err("should fail");
        assert!(matches!(
            error,
            LoadError::Invalid {
                key: "upstream.base_url",
                ..
            }
        ));
    }

    #[test]
    fn missing_revalidate_secret_is_rejected() {
        let mut raw = minimal_raw();
        raw.revalidate.secret = Some("   ".to_string());

        let error = Settings::from_raw(raw).expect_err("should fail");
        assert!(matches!(
            error,
            LoadError::Invalid {
                key: "revalidate.secret",
                ..
            }
        ));
    }

    #[test]
    fn blank_webhook_endpoint_reads_as_unconfigured() {
        let mut raw = minimal_raw();
        raw.webhook.endpoint = Some("  ".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.webhook.endpoint, None);
    }

    #[test]
    fn explicit_webhook_secret_wins_over_fallback() {
        let mut raw = minimal_raw();
        raw.webhook.endpoint = Some("https://frontend.example".to_string());
        raw.webhook.secret = Some("other".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(
            settings.webhook.endpoint.as_ref().map(Url::as_str),
            Some("https://frontend.example/")
        );
        assert_eq!(settings.webhook.secret, "other");
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = minimal_raw();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            port: Some(4321),
            log_level: Some("debug".to_string()),
            no_cache: true,
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert!(!settings.cache.enabled);
        assert!(settings.cache.page_cache_enabled);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let mut raw = minimal_raw();
        raw.logging.format = Some("pretty".to_string());

        let error = Settings::from_raw(raw).expect_err("should fail");
        assert!(matches!(
            error,
            LoadError::Invalid {
                key: "logging.format",
                ..
            }
        ));
    }

    #[test]
    fn zero_upstream_timeout_is_rejected() {
        let mut raw = minimal_raw();
        raw.upstream.timeout_seconds = Some(0);

        let error = Settings::from_raw(raw).expect_err("should fail");
        assert!(matches!(
            error,
            LoadError::Invalid {
                key: "upstream.timeout_seconds",
                ..
            }
        ));
    }

    #[test]
    fn parse_cli_flags() {
        let args = CliArgs::parse_from([
            "vetrina",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--upstream-url",
            "http://backend.local/wp-json/wp/v2",
            "--no-page-cache",
        ]);

        assert_eq!(args.overrides.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.overrides.port, Some(8080));
        assert!(args.overrides.no_page_cache);
        assert!(!args.overrides.no_cache);
    }
}
