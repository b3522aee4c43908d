//! Proxy pool and per-attempt proxy selection.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ordered pool of proxy addresses (`http://host:port`, `socks5://...`).
///
/// An empty pool means every attempt uses the client's default route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyPool {
    proxies: Vec<String>,
}

impl ProxyPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool from a list of addresses.
    pub fn from_list<I, S>(proxies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            proxies: proxies.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a pool from a comma-separated list. Entries are trimmed and
    /// empty entries dropped.
    pub fn from_csv(csv: &str) -> Self {
        Self::from_list(
            csv.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty()),
        )
    }

    /// Appends one proxy.
    pub fn push(&mut self, proxy: impl Into<String>) {
        self.proxies.push(proxy.into());
    }

    /// Removes every proxy.
    pub fn clear(&mut self) {
        self.proxies.clear();
    }

    /// Number of proxies in the pool.
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// The configured addresses, in order.
    pub fn as_slice(&self) -> &[String] {
        &self.proxies
    }

    /// Picks the proxy for one attempt.
    ///
    /// With N proxies each of the N + 1 outcomes (every proxy, or `None`
    /// for the direct route) is equally likely. Calls are independent.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..=self.proxies.len());
        self.proxies.get(index).map(String::as_str)
    }

    /// [`select`](Self::select) using the thread-local generator.
    pub fn choose(&self) -> Option<&str> {
        self.select(&mut rand::thread_rng())
    }
}
