//! Application core between `mbsi-api` and UI consumers (the CLI today).
//!
//! This crate owns the caching, session, and mutation logic for the
//! MBSI workspace:
//!
//! - **[`Portal`]** — Central facade tying the [`PortalClient`]
//!   (`mbsi_api`), the [`QueryCache`], and the [`SessionGuard`] together.
//!   Every typed read routes through the cache; every write routes
//!   through the mutation layer.
//!
//! - **[`QueryCache`]** — Keyed, time-bounded store of fetched portal
//!   data (`DashMap` + per-entry `tokio::sync::watch` channels).
//!   Hierarchical [`QueryKey`]s drive prefix invalidation; entries carry
//!   staleness, garbage-collection, and retry settings.
//!
//! - **[`Mutation`] / [`OptimisticMutation`]** — Writes that settle by
//!   invalidating key prefixes; the optimistic variant patches the cache
//!   before the round-trip and rolls back verbatim on failure.
//!
//! - **[`SessionGuard`]** — Token persistence (via the [`TokenStore`]
//!   seam), startup verification, login/logout, and the global teardown
//!   reaction to a rejected credential.
//!
//! The core never reads configuration files or OS keychains itself;
//! concrete token stores live in `mbsi-config`.

pub mod error;
pub mod portal;
pub mod query;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use portal::{Portal, PortalConfig, fetcher, keys};
pub use query::{
    CacheDefaults, Fetcher, Mutation, OptimisticMutation, QueryCache, QueryKey, QueryKeys,
    QueryObserver, QueryOptions, QuerySnapshot, QuerySegment, QueryStatus,
};
pub use session::{
    MemoryTokenStore, Route, RouteDecision, SessionGuard, SessionState, TokenStore, route_access,
};

// Re-export the API client types consumers commonly need.
pub use mbsi_api::{
    Account, AuthSession, ClassRank, CoinBalance, CoinTransaction, Pagination, PortalClient,
    SimpleStats, TransactionPage, TransportConfig, UpdateProfile, WeeklyRankings, WeeklyStatistics,
};
