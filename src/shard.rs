//! Shard coordination.
//!
//! Large deployments split their workload across several gateway
//! connections. The coordinator owns one [`Gateway`] per shard index,
//! staggers their startup to respect the platform's identify rate limit,
//! and routes guild keys to the shard that owns them.
//!
//! # Example
//!
//! ```no_run
//! use shardline::{GatewayConfig, ShardCoordinator};
//!
//! # async fn example() -> shardline::Result<()> {
//! let config = GatewayConfig::builder()
//!     .token("bot-token")
//!     .shard_count(4)
//!     .build()?;
//!
//! let mut shards = ShardCoordinator::new(config);
//! shards.connect_all().await?;
//! // ...
//! shards.disconnect_all().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::transport::{Transport, WebSocketTransport};

// ============================================================================
// Routing
// ============================================================================

/// Computes which shard owns a top-level grouping key (e.g. a guild id).
///
/// Pure function so callers can route without touching any shard
/// instance. The high bits of the key are a timestamp; shifting them in
/// spreads ownership evenly.
#[inline]
#[must_use]
pub fn shard_for_key(key: u64, shard_count: u32) -> u32 {
    ((key >> 22) % u64::from(shard_count.max(1))) as u32
}

// ============================================================================
// ShardCoordinator
// ============================================================================

/// Applies one handler registration to a gateway.
type Registration = Box<dyn Fn(&Gateway) + Send + Sync>;

/// Supervises one [`Gateway`] per shard index.
pub struct ShardCoordinator {
    /// Shared connection configuration.
    config: GatewayConfig,

    /// Connected shards, indexed by shard id.
    shards: Vec<Gateway>,

    /// Handler registrations, replayed onto every shard connected later
    /// so registration order and connection order are independent.
    registrations: Mutex<Vec<Registration>>,
}

impl ShardCoordinator {
    /// Creates a coordinator with no shards connected.
    #[inline]
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            shards: Vec::new(),
            registrations: Mutex::new(Vec::new()),
        }
    }

    /// Returns the configured shard count.
    #[inline]
    #[must_use]
    pub fn shard_count(&self) -> u32 {
        self.config.shard_count()
    }

    /// Returns a connected shard by index.
    #[inline]
    #[must_use]
    pub fn shard(&self, shard_id: u32) -> Option<&Gateway> {
        self.shards.get(shard_id as usize)
    }

    /// Returns all connected shards, in shard-id order.
    #[inline]
    #[must_use]
    pub fn shards(&self) -> &[Gateway] {
        &self.shards
    }

    /// Returns the shard owning a grouping key.
    #[inline]
    #[must_use]
    pub fn shard_for_key(&self, key: u64) -> u32 {
        shard_for_key(key, self.config.shard_count())
    }

    /// Connects every shard, sequentially.
    ///
    /// Startup is deliberately not concurrent: the platform rate-limits
    /// identifies, so each shard waits the configured spacing before the
    /// next one dials.
    ///
    /// # Errors
    ///
    /// Propagates the first shard whose initial connect fails; shards
    /// connected before the failure stay up and can be torn down with
    /// [`disconnect_all`](Self::disconnect_all).
    pub async fn connect_all(&mut self) -> Result<()> {
        self.connect_all_with(|_| Box::new(WebSocketTransport::new()))
            .await
    }

    /// Connects every shard over caller-supplied transports.
    pub(crate) async fn connect_all_with<F>(&mut self, mut transport_for: F) -> Result<()>
    where
        F: FnMut(u32) -> Box<dyn Transport>,
    {
        let count = self.config.shard_count();
        info!(shards = count, "Connecting all shards");

        for shard_id in 0..count {
            let gateway =
                Gateway::connect_with(transport_for(shard_id), self.config.clone(), shard_id)
                    .await?;
            for register in self.registrations.lock().iter() {
                register(&gateway);
            }
            self.shards.push(gateway);

            if shard_id + 1 < count {
                debug!(shard_id, "Waiting identify spacing before next shard");
                tokio::time::sleep(self.config.identify_spacing).await;
            }
        }

        info!(shards = count, "All shards connected");
        Ok(())
    }

    /// Disconnects every shard concurrently and waits for completion.
    pub async fn disconnect_all(&mut self) {
        info!(shards = self.shards.len(), "Disconnecting all shards");

        join_all(self.shards.iter().map(Gateway::disconnect)).await;
        self.shards.clear();
    }

    /// Registers a typed handler on every shard.
    ///
    /// Applies to shards already connected and is replayed onto shards
    /// connected afterwards, so handlers may be registered before
    /// [`connect_all`](Self::connect_all).
    pub fn on<T, F>(&self, event_name: impl Into<String>, handler: F)
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let event_name = event_name.into();
        let handler = Arc::new(handler);

        self.register(Box::new(move |gateway: &Gateway| {
            let handler = Arc::clone(&handler);
            gateway.on(event_name.clone(), move |payload: T| handler(payload));
        }));
    }

    /// Registers a raw handler on every shard.
    ///
    /// Same ordering contract as [`on`](Self::on).
    pub fn on_raw<F>(&self, event_name: impl Into<String>, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let event_name = event_name.into();
        let handler = Arc::new(handler);

        self.register(Box::new(move |gateway: &Gateway| {
            let handler = Arc::clone(&handler);
            gateway.on_raw(event_name.clone(), move |raw| handler(raw));
        }));
    }

    /// Applies a registration to connected shards and queues it for
    /// shards connected later.
    fn register(&self, registration: Registration) {
        for shard in &self.shards {
            registration(shard);
        }
        self.registrations.lock().push(registration);
    }
}

impl std::fmt::Debug for ShardCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardCoordinator")
            .field("shard_count", &self.config.shard_count())
            .field("connected", &self.shards.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
