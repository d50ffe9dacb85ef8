//! # Redbin Cache
//!
//! Bin-scoped cache backend over Redis.
//!
//! Each bin is a namespace with its own keys, its own invalidation counter
//! and its own permanent TTL. Entries carry a logical expiry and are kept
//! physically a few seconds longer, so callers that accept stale data can
//! still read them. Tag invalidation bumps counters instead of touching
//! entries.
//!
//! ```ignore
//! let factory = CacheBackendFactory::from_config(&config).await?;
//! let render = factory.get("render")?;
//! render.set("page:1", json!({"html": "..."}), Expiry::Permanent, &["node:1"]).await?;
//! let hit = render.get("page:1", false).await?;
//! ```

pub mod backend;
pub mod checksum;
pub mod di;
pub mod ext;
pub mod factory;
pub mod item;
pub mod keys;
pub mod metrics;
pub mod store;
pub mod ttl;

pub use backend::*;
pub use checksum::*;
pub use di::*;
pub use ext::*;
pub use factory::*;
pub use item::*;
pub use keys::*;
pub use store::*;
pub use ttl::*;
