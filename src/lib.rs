//! An IPFIX (RFC 7011) wire codec and collector runtime.
//!
//! The core is a synchronous, cache-aware decoder ([`message::Message::decode`])
//! over the field ([`field_cache`]) and template ([`template`]) caches that
//! give meaning to the wire bytes. Around it, async transports
//! ([`transport`]) turn TCP/UDP/file sources into framed message buffers,
//! and an RFC 5610 learner ([`learner`]) keeps the field cache current from
//! the flows themselves.
//!
//! ```rust
//! use ipfix_collector::field_cache::EphemeralFieldCache;
//! use ipfix_collector::template::EphemeralTemplateCache;
//! use ipfix_collector::message::{DecodeOptions, Message};
//! use ipfix_collector::metrics::NoopMetricsSink;
//!
//! let field_cache = EphemeralFieldCache::new("main");
//! let template_cache = EphemeralTemplateCache::new("main");
//! let (message, error) = Message::decode(
//!     &[],
//!     &field_cache,
//!     &template_cache,
//!     DecodeOptions::default(),
//!     &NoopMetricsSink,
//! );
//! assert!(error.is_some()); // empty input is a truncated header
//! assert!(message.sets.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod field;
pub mod field_cache;
pub mod ie;
pub mod kv;
pub mod learner;
pub mod message;
pub mod metrics;
pub mod protocol;
pub mod record;
pub mod template;
mod time;
pub mod transport;
pub mod types;

pub use error::{CacheError, DecodeError, TransportError};
pub use field::{DecodeCtx, Field, FieldBuilder};
pub use message::{DecodeOptions, Message, Set};
pub use record::DataRecord;
