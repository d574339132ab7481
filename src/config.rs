//! Gateway configuration and builder.
//!
//! Provides a fluent API for configuring [`Gateway`](crate::Gateway) and
//! [`ShardCoordinator`](crate::ShardCoordinator) instances.
//!
//! # Example
//!
//! ```
//! use shardline::{GatewayConfig, Intents};
//!
//! # fn example() -> shardline::Result<()> {
//! let config = GatewayConfig::builder()
//!     .token("bot-token")
//!     .intents(Intents::GUILDS | Intents::GUILD_MESSAGES)
//!     .shard_count(2)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::intents::Intents;

// ============================================================================
// Constants
// ============================================================================

/// Default gateway API version.
pub const DEFAULT_API_VERSION: u8 = 10;

/// Default spacing between sequential shard identifies.
pub const DEFAULT_IDENTIFY_SPACING: Duration = Duration::from_secs(5);

/// Default gateway endpoint.
const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

// ============================================================================
// GatewayConfig
// ============================================================================

/// Validated configuration for gateway connections.
///
/// Construct through [`GatewayConfig::builder()`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Authentication token.
    pub(crate) token: String,
    /// Intent bitmask sent in identify.
    pub(crate) intents: Intents,
    /// Total number of shards.
    pub(crate) shard_count: u32,
    /// Gateway API version.
    pub(crate) api_version: u8,
    /// Base gateway endpoint (without query parameters).
    pub(crate) gateway_url: String,
    /// Delay between sequential shard identifies.
    pub(crate) identify_spacing: Duration,
}

impl GatewayConfig {
    /// Creates a new configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// Returns the total shard count.
    #[inline]
    #[must_use]
    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Returns the configured intent bitmask.
    #[inline]
    #[must_use]
    pub fn intents(&self) -> Intents {
        self.intents
    }

    /// Builds the full connection URL for an endpoint.
    ///
    /// Appends the `v` and `encoding` query parameters the wire protocol
    /// requires. The endpoint defaults to the configured gateway URL but a
    /// session resume endpoint may be substituted.
    pub(crate) fn connect_url(&self, endpoint: Option<&str>) -> Result<String> {
        let base = endpoint.unwrap_or(&self.gateway_url);
        let mut url = Url::parse(base)?;
        url.query_pairs_mut()
            .clear()
            .append_pair("v", &self.api_version.to_string())
            .append_pair("encoding", "json");
        Ok(url.into())
    }
}

// ============================================================================
// GatewayConfigBuilder
// ============================================================================

/// Builder for [`GatewayConfig`].
///
/// Use [`GatewayConfig::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct GatewayConfigBuilder {
    /// Authentication token.
    token: Option<String>,
    /// Intent bitmask.
    intents: Option<Intents>,
    /// Total shard count.
    shard_count: Option<u32>,
    /// Gateway API version.
    api_version: Option<u8>,
    /// Gateway endpoint override.
    gateway_url: Option<String>,
    /// Identify spacing override.
    identify_spacing: Option<Duration>,
}

impl GatewayConfigBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the authentication token (required).
    #[inline]
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the intent bitmask.
    ///
    /// Defaults to [`Intents::ALL_NON_PRIVILEGED`].
    #[inline]
    #[must_use]
    pub fn intents(mut self, intents: Intents) -> Self {
        self.intents = Some(intents);
        self
    }

    /// Sets the total number of shards.
    ///
    /// Defaults to 1 (unsharded).
    #[inline]
    #[must_use]
    pub fn shard_count(mut self, count: u32) -> Self {
        self.shard_count = Some(count);
        self
    }

    /// Sets the gateway API version.
    ///
    /// Defaults to [`DEFAULT_API_VERSION`].
    #[inline]
    #[must_use]
    pub fn api_version(mut self, version: u8) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Overrides the gateway endpoint.
    ///
    /// Query parameters are managed by the client; pass only the scheme
    /// and host (e.g. `wss://gateway.example.com`).
    #[inline]
    #[must_use]
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Overrides the delay between sequential shard identifies.
    ///
    /// Defaults to [`DEFAULT_IDENTIFY_SPACING`]. Lowering this below the
    /// platform's identify rate limit will get shards disconnected.
    #[inline]
    #[must_use]
    pub fn identify_spacing(mut self, spacing: Duration) -> Self {
        self.identify_spacing = Some(spacing);
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the token is missing or empty
    /// - [`Error::Config`] if the shard count is zero
    /// - [`Error::Url`] if the gateway endpoint does not parse
    pub fn build(self) -> Result<GatewayConfig> {
        let token = self.validate_token()?;
        let shard_count = self.validate_shard_count()?;

        let config = GatewayConfig {
            token,
            intents: self.intents.unwrap_or_default(),
            shard_count,
            api_version: self.api_version.unwrap_or(DEFAULT_API_VERSION),
            gateway_url: self
                .gateway_url
                .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
            identify_spacing: self.identify_spacing.unwrap_or(DEFAULT_IDENTIFY_SPACING),
        };

        // Surface a bad endpoint at build time, not first connect
        config.connect_url(None)?;

        Ok(config)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl GatewayConfigBuilder {
    /// Validates the token configuration.
    fn validate_token(&self) -> Result<String> {
        let token = self.token.clone().ok_or_else(|| {
            Error::config(
                "Token is required. Use .token() to set it.\n\
                 Example: GatewayConfig::builder().token(\"bot-token\")",
            )
        })?;

        if token.trim().is_empty() {
            return Err(Error::config("Token must not be empty"));
        }

        Ok(token)
    }

    /// Validates the shard count configuration.
    fn validate_shard_count(&self) -> Result<u32> {
        let count = self.shard_count.unwrap_or(1);
        if count == 0 {
            return Err(Error::config("Shard count must be at least 1"));
        }
        Ok(count)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = GatewayConfigBuilder::new();
        assert!(builder.token.is_none());
        assert!(builder.intents.is_none());
    }

    #[test]
    fn test_build_with_defaults() {
        let config = GatewayConfig::builder().token("abc").build().unwrap();
        assert_eq!(config.shard_count, 1);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.intents, Intents::ALL_NON_PRIVILEGED);
        assert_eq!(config.identify_spacing, DEFAULT_IDENTIFY_SPACING);
    }

    #[test]
    fn test_build_fails_without_token() {
        let result = GatewayConfig::builder().build();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Token"));
    }

    #[test]
    fn test_build_fails_with_empty_token() {
        let result = GatewayConfig::builder().token("   ").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_fails_with_zero_shards() {
        let result = GatewayConfig::builder().token("abc").shard_count(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_connect_url_appends_query() {
        let config = GatewayConfig::builder().token("abc").build().unwrap();
        let url = config.connect_url(None).unwrap();
        assert_eq!(url, "wss://gateway.discord.gg/?v=10&encoding=json");
    }

    #[test]
    fn test_connect_url_prefers_resume_endpoint() {
        let config = GatewayConfig::builder().token("abc").build().unwrap();
        let url = config
            .connect_url(Some("wss://resume.example.com"))
            .unwrap();
        assert_eq!(url, "wss://resume.example.com/?v=10&encoding=json");
    }

    #[test]
    fn test_connect_url_replaces_stale_query() {
        let config = GatewayConfig::builder()
            .token("abc")
            .api_version(9)
            .build()
            .unwrap();
        let url = config
            .connect_url(Some("wss://resume.example.com/?v=10&encoding=json"))
            .unwrap();
        assert_eq!(url, "wss://resume.example.com/?v=9&encoding=json");
    }

    #[test]
    fn test_build_fails_with_bad_url() {
        let result = GatewayConfig::builder()
            .token("abc")
            .gateway_url("not a url")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = GatewayConfig::builder().token("abc").shard_count(2);
        let cloned = builder.clone();
        assert_eq!(builder.shard_count, cloned.shard_count);
    }
}
