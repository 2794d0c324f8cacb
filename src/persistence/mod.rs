use crate::models::TradingConfig;
use crate::Result;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::time::{timeout, Duration};

/// Two-tier persistence for the trading configuration
///
/// A local JSON cache file holds one document per config key; Redis holds
/// the same document as a JSON string under `config:{key}`. Reads go local
/// first and fall back to the remote store (backfilling the cache); writes
/// always go to both tiers.
pub struct ConfigStore {
    key: String,
    local_path: PathBuf,
    remote: Option<ConnectionManager>,
}

impl ConfigStore {
    /// Connect the store. An unreachable Redis degrades to local-only
    /// operation with a warning; the local tier always exists.
    pub async fn new(redis_url: &str, local_path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        let remote = match Self::connect_remote(redis_url).await {
            Ok(conn) => {
                tracing::info!("Connected to Redis at {}", redis_url);
                Some(conn)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to connect to Redis ({}), continuing with local cache only",
                    e
                );
                None
            }
        };

        Self {
            key: key.into(),
            local_path: local_path.into(),
            remote,
        }
    }

    async fn connect_remote(redis_url: &str) -> Result<ConnectionManager> {
        let client = Client::open(redis_url)?;

        // Bound the connection attempt so a dead Redis cannot stall startup
        let conn = timeout(Duration::from_secs(5), ConnectionManager::new(client))
            .await
            .map_err(|_| "Redis connection timeout after 5 seconds")??;

        Ok(conn)
    }

    fn redis_key(&self) -> String {
        format!("config:{}", self.key)
    }

    /// Load the config: local cache first, remote store as fallback (with
    /// cache backfill). Errors when no tier has the document - running
    /// with undefined trading state is a startup failure, not a default.
    pub async fn load(&mut self) -> Result<TradingConfig> {
        if let Some(mut config) = self.load_local().await {
            if config.normalize() {
                tracing::warn!("Stored config had a heading with no midpoint, reset to neutral");
            }
            tracing::info!("📂 Loaded config '{}' from local cache", self.key);
            return Ok(config);
        }

        let redis_key = self.redis_key();
        let Some(conn) = self.remote.as_mut() else {
            return Err(format!(
                "config '{}' not in local cache and remote store is unavailable",
                self.key
            )
            .into());
        };

        let raw: Option<String> = conn.get(&redis_key).await?;
        let Some(raw) = raw else {
            return Err(format!("config '{}' not found in any store", self.key).into());
        };

        let mut config: TradingConfig = serde_json::from_str(&raw)?;
        if config.normalize() {
            tracing::warn!("Stored config had a heading with no midpoint, reset to neutral");
        }

        if let Err(e) = self.store_local(&config).await {
            tracing::warn!("Failed to backfill local cache: {}", e);
        }

        tracing::info!("📂 Loaded config '{}' from remote store", self.key);
        Ok(config)
    }

    /// Persist the config to both tiers. Each tier's failure is logged as
    /// an error; the call itself fails only when nothing was written.
    pub async fn save(&mut self, config: &TradingConfig) -> Result<()> {
        let payload = serde_json::to_string(config)?;
        let mut wrote_any = false;

        match self.store_local(config).await {
            Ok(()) => wrote_any = true,
            Err(e) => tracing::error!("Local config cache write failed: {}", e),
        }

        let redis_key = self.redis_key();
        if let Some(conn) = self.remote.as_mut() {
            match conn.set::<_, _, ()>(&redis_key, &payload).await {
                Ok(()) => wrote_any = true,
                Err(e) => tracing::error!("Remote config write failed: {}", e),
            }
        }

        if !wrote_any {
            return Err(format!("config '{}' not persisted to any store", self.key).into());
        }

        tracing::debug!("Saved config '{}'", self.key);
        Ok(())
    }

    /// Read this key's document out of the local cache file. Any miss
    /// (no file, unreadable JSON, key absent) is logged and reads as None.
    async fn load_local(&self) -> Option<TradingConfig> {
        let contents = match tokio::fs::read_to_string(&self.local_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No local cache at {}", self.local_path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read local cache {}: {}",
                    self.local_path.display(),
                    e
                );
                return None;
            }
        };

        let documents: Map<String, Value> = match serde_json::from_str(&contents) {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!(
                    "Local cache {} is not valid JSON: {}",
                    self.local_path.display(),
                    e
                );
                return None;
            }
        };

        let value = documents.get(&self.key)?.clone();
        match serde_json::from_value(value) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Local cache entry '{}' is unusable: {}", self.key, e);
                None
            }
        }
    }

    /// Upsert this key's document in the cache file, leaving any other
    /// keys in the file untouched.
    async fn store_local(&self, config: &TradingConfig) -> Result<()> {
        let mut documents = match tokio::fs::read_to_string(&self.local_path).await {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Map::new(),
        };

        documents.insert(self.key.clone(), serde_json::to_value(config)?);
        tokio::fs::write(&self.local_path, serde_json::to_string(&documents)?).await?;

        Ok(())
    }
}
