//! Configuration loading and config-driven HTTP layers.

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use txwatch_core::config::ServerConfig;
use txwatch_core::Config;

use crate::cli::Cli;

/// Resolve defaults, the TOML file and environment overrides into one validated config.
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    Config::load(cli.config.as_deref()).context("failed to load configuration")
}

/// CORS for the public API: the configured origin, GET and POST only.
pub fn cors_layer(config: &ServerConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.cors_origin == "*" {
        return Ok(layer.allow_origin(Any));
    }
    let origin = HeaderValue::from_str(&config.cors_origin)
        .with_context(|| format!("invalid CORS origin '{}'", config.cors_origin))?;
    Ok(layer.allow_origin(origin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_wildcard_and_explicit_origin() {
        assert!(cors_layer(&ServerConfig::default()).is_ok());

        let explicit = ServerConfig {
            cors_origin: "https://bank.example".into(),
            ..ServerConfig::default()
        };
        assert!(cors_layer(&explicit).is_ok());

        let broken = ServerConfig {
            cors_origin: "bad\norigin".into(),
            ..ServerConfig::default()
        };
        assert!(cors_layer(&broken).is_err());
    }
}
