//! # Service Card Registry
//!
//! Discovers worker services and caches their cards per address.
//!
//! Reads of a fresh entry only take the per-address slot lock briefly.
//! Fetches for the same address are serialized through that slot, so
//! concurrent runs never hammer a service with duplicate discovery calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use super::card::{ServiceCard, WELL_KNOWN_PATH};
use crate::error::DiscoveryError;

#[derive(Debug, Clone)]
struct CachedCard {
    card: ServiceCard,
    fetched_at: Instant,
}

type Slot = Arc<Mutex<Option<CachedCard>>>;

pub struct ServiceRegistry {
    http: reqwest::Client,
    ttl: Duration,
    timeout: Duration,
    slots: RwLock<HashMap<String, Slot>>,
}

impl ServiceRegistry {
    pub fn new(ttl: Duration, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), ttl, timeout)
    }

    pub fn with_client(http: reqwest::Client, ttl: Duration, timeout: Duration) -> Self {
        Self {
            http,
            ttl,
            timeout,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Card for `address`, served from cache while fresh.
    #[tracing::instrument(skip(self))]
    pub async fn discover(&self, address: &str) -> Result<ServiceCard, DiscoveryError> {
        let address = normalize(address);
        let slot = self.slot(&address).await;
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                tracing::debug!("card cache hit for {}", address);
                return Ok(cached.card.clone());
            }
        }

        tracing::debug!("card cache miss for {}", address);
        let card = self.fetch(&address).await?;
        *entry = Some(CachedCard {
            card: card.clone(),
            fetched_at: Instant::now(),
        });
        Ok(card)
    }

    /// Drop the cached card for `address`.
    pub async fn invalidate(&self, address: &str) {
        let address = normalize(address);
        let slot = self.slots.read().await.get(&address).cloned();
        if let Some(slot) = slot {
            *slot.lock().await = None;
        }
    }

    /// Fetch a fresh card regardless of TTL.
    pub async fn refresh(&self, address: &str) -> Result<ServiceCard, DiscoveryError> {
        self.invalidate(address).await;
        self.discover(address).await
    }

    /// Number of addresses with a cached card.
    pub async fn cached_len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.read().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    async fn slot(&self, address: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(address) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(address.to_string())
            .or_default()
            .clone()
    }

    async fn fetch(&self, address: &str) -> Result<ServiceCard, DiscoveryError> {
        let url = format!("{}{}", address, WELL_KNOWN_PATH);
        let unreachable = |reason: String| DiscoveryError::ServiceUnreachable {
            address: address.to_string(),
            reason,
        };
        let invalid = |reason: String| DiscoveryError::InvalidCard {
            address: address.to_string(),
            reason,
        };

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(invalid(format!("discovery returned {}", response.status())));
        }

        let body = response.bytes().await.map_err(|e| unreachable(e.to_string()))?;
        let card: ServiceCard =
            serde_json::from_slice(&body).map_err(|e| invalid(format!("not a card: {}", e)))?;
        card.validate().map_err(invalid)?;

        tracing::info!("discovered '{}' at {}", card.name, address);
        Ok(card)
    }
}

fn normalize(address: &str) -> String {
    address.trim().trim_end_matches('/').to_string()
}
