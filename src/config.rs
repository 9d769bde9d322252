use crate::projector::EmptyContentPolicy;
use anyhow::{bail, Context, Result};

/// How missing item groups are created across items during a save.
///
/// Fields of one item are always created together; this only controls how
/// many items are in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    Serial,
    Bounded(usize),
}

impl ConcurrencyPolicy {
    pub fn limit(&self) -> usize {
        match self {
            ConcurrencyPolicy::Serial => 1,
            ConcurrencyPolicy::Bounded(n) => (*n).max(1),
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "serial" | "1" => Ok(ConcurrencyPolicy::Serial),
            other => {
                let n: usize = other
                    .parse()
                    .with_context(|| format!("Invalid SYNC_CONCURRENCY: '{}'", value))?;
                if n == 0 {
                    bail!("SYNC_CONCURRENCY must be at least 1");
                }
                Ok(ConcurrencyPolicy::Bounded(n))
            }
        }
    }
}

/// What adding an item to one language does to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddItemPolicy {
    /// Only the target language grows; the count check blocks save until
    /// the other languages catch up
    #[default]
    Local,
    /// Every language receives the same template
    Propagate,
}

impl AddItemPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(AddItemPolicy::Local),
            "propagate" | "all" => Ok(AddItemPolicy::Propagate),
            other => bail!("Invalid SYNC_ADD_POLICY: '{}' (expected local or propagate)", other),
        }
    }
}

/// Knobs consumed by the reconciler and form sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub concurrency: ConcurrencyPolicy,
    pub empty_content: EmptyContentPolicy,
    pub add_item: AddItemPolicy,
    /// Delete backend groups beyond the item count on save
    pub prune_stale: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyPolicy::Bounded(4),
            empty_content: EmptyContentPolicy::SkipEmpty,
            add_item: AddItemPolicy::Local,
            prune_stale: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Content API
    pub content_api_url: String,
    pub content_api_token: Option<String>,
    pub api_max_retries: u32,

    // Sync behavior
    pub concurrency: ConcurrencyPolicy,
    pub skip_empty: bool,
    pub add_item_policy: AddItemPolicy,
    pub prune_stale: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            content_api_url: std::env::var("CONTENT_API_URL")
                .context("CONTENT_API_URL not set")?,
            content_api_token: std::env::var("CONTENT_API_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            api_max_retries: std::env::var("API_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(3),

            concurrency: match std::env::var("SYNC_CONCURRENCY") {
                Ok(v) => ConcurrencyPolicy::parse(&v)?,
                Err(_) => ConcurrencyPolicy::Bounded(4),
            },
            skip_empty: std::env::var("SYNC_SKIP_EMPTY")
                .ok()
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
            add_item_policy: match std::env::var("SYNC_ADD_POLICY") {
                Ok(v) => AddItemPolicy::parse(&v)?,
                Err(_) => AddItemPolicy::Local,
            },
            prune_stale: std::env::var("SYNC_PRUNE_STALE")
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false),
        })
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            concurrency: self.concurrency,
            empty_content: if self.skip_empty {
                EmptyContentPolicy::SkipEmpty
            } else {
                EmptyContentPolicy::AlwaysUpsert
            },
            add_item: self.add_item_policy,
            prune_stale: self.prune_stale,
        }
    }
}
