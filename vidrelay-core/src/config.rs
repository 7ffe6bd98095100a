//! Centralized configuration for Vidrelay.
//!
//! All tunable parameters and upstream endpoints are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Mobile Chrome user agent the streaming provider expects on manifest requests.
pub const DEFAULT_PROVIDER_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Mobile Safari/537.36";

/// Central configuration for all Vidrelay components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub token: TokenConfig,
    pub metadata: MetadataConfig,
}

/// Listener configuration for the JSON API.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: IpAddr,
    /// TCP port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Streaming provider endpoints and request shaping.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Scheme and host of the provider, without trailing slash
    pub origin: String,
    /// User agent sent on manifest and playlist requests
    pub user_agent: String,
    /// Outbound request timeout (None = wait indefinitely)
    pub request_timeout: Option<Duration>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            origin: "https://vidlink.pro".to_string(),
            user_agent: DEFAULT_PROVIDER_USER_AGENT.to_string(),
            request_timeout: None,
        }
    }
}

/// Token module hosting and readiness polling.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Path to the vendor token module artifact
    pub module_path: PathBuf,
    /// Executable that hosts the module
    pub host_command: PathBuf,
    /// Arguments passed to the host before the module path
    pub host_args: Vec<String>,
    /// Upper bound on waiting for the derivation entry point
    pub readiness_timeout: Duration,
    /// Delay between readiness probes
    pub poll_interval: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from("./fu.wasm"),
            host_command: PathBuf::from("node"),
            host_args: vec!["token-host.mjs".to_string()],
            readiness_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Search engine and TMDB endpoints.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// TMDB v3 API key
    pub tmdb_api_key: Option<String>,
    /// TMDB REST base, e.g. `https://api.themoviedb.org/3`
    pub tmdb_base_url: String,
    /// TMDB image CDN base, e.g. `https://image.tmdb.org/t/p`
    pub image_base_url: String,
    /// Lite HTML search endpoint used to locate TMDB pages
    pub search_url: String,
    /// User agent sent to the search engine
    pub search_user_agent: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            tmdb_base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p".to_string(),
            search_url: "https://lite.duckduckgo.com/lite/".to_string(),
            search_user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

impl RelayConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Values that fail to parse are ignored and the default is kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Server overrides
        if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
            config.server.port = port;
        }
        if let Some(host) = lookup("HOST").and_then(|h| h.parse::<IpAddr>().ok()) {
            config.server.host = host;
        }

        // Provider overrides
        if let Some(origin) = lookup("VIDRELAY_PROVIDER_ORIGIN") {
            config.provider.origin = origin.trim_end_matches('/').to_string();
        }
        if let Some(user_agent) = lookup("VIDRELAY_PROVIDER_USER_AGENT") {
            config.provider.user_agent = user_agent;
        }
        if let Some(seconds) =
            lookup("VIDRELAY_REQUEST_TIMEOUT").and_then(|t| t.parse::<u64>().ok())
        {
            config.provider.request_timeout = Some(Duration::from_secs(seconds));
        }

        // Token module overrides
        if let Some(path) = lookup("VIDRELAY_TOKEN_MODULE") {
            config.token.module_path = PathBuf::from(path);
        }
        if let Some(command) = lookup("VIDRELAY_TOKEN_HOST") {
            config.token.host_command = PathBuf::from(command);
        }
        if let Some(args) = lookup("VIDRELAY_TOKEN_HOST_ARGS") {
            config.token.host_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(seconds) =
            lookup("VIDRELAY_TOKEN_READY_TIMEOUT").and_then(|t| t.parse::<u64>().ok())
        {
            config.token.readiness_timeout = Duration::from_secs(seconds);
        }
        if let Some(millis) =
            lookup("VIDRELAY_TOKEN_POLL_INTERVAL_MS").and_then(|t| t.parse::<u64>().ok())
        {
            config.token.poll_interval = Duration::from_millis(millis.max(1));
        }

        // Metadata overrides
        if let Some(key) = lookup("TMDB_API_KEY").filter(|k| !k.trim().is_empty()) {
            config.metadata.tmdb_api_key = Some(key);
        }
        if let Some(base) = lookup("VIDRELAY_TMDB_BASE_URL") {
            config.metadata.tmdb_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(base) = lookup("VIDRELAY_TMDB_IMAGE_BASE_URL") {
            config.metadata.image_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("VIDRELAY_SEARCH_URL") {
            config.metadata.search_url = url;
        }

        config
    }
}
