//! Key-set retrieval and caching for RS256 verification
//!
//! ```text
//!  KeySetCache ──(AsyncAgedCache keyed by issuer)──▶ KeySetFetcher
//!                                                       │
//!                          DocumentRetriever ◀──────────┘
//!                  (openid-configuration, then jwks_uri)
//! ```
//!
//! - [`DocumentRetriever`] - injected "fetch body by URL" capability
//! - [`HttpDocumentRetriever`] - default `reqwest` implementation
//! - [`KeySetFetcher`] - discovery document + JWK Set retrieval
//! - [`KeySetCache`] - per-issuer, per-call-aged cache

mod cache;
mod fetcher;
mod retriever;

pub use cache::KeySetCache;
pub use fetcher::{KeySet, KeySetFetcher, OpenIdConfiguration};
pub use retriever::{DocumentRetriever, HttpDocumentRetriever, RetrievalError};
