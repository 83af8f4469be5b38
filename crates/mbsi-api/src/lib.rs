//! Async HTTP client for the MBSI school-statistics portal.
//!
//! The portal exposes a small JSON REST API: authentication, student
//! profiles, weekly grade/ranking statistics, and the coin ledger. This
//! crate owns the transport mechanics only:
//!
//! - **[`PortalClient`]** — `reqwest`-backed client. Attaches the bearer
//!   credential from a shared token cell to every request, unwraps the
//!   `{ "data": ... }` response envelope, and maps HTTP failures into
//!   [`Error`] variants.
//!
//! - **Authorization-rejection policy** — any 401 response clears the
//!   token cell and broadcasts [`AuthEvent::SessionRejected`] on the
//!   client's event channel, independent of which call triggered it.
//!   A single top-level consumer (the session guard in `mbsi-core`)
//!   subscribes via [`PortalClient::auth_events`]; per-call code never
//!   special-cases session expiry.
//!
//! - **Endpoint modules** — `auth`, `users`, `statistics`, `coins` add
//!   inherent methods on [`PortalClient`] for each portal route.
//!
//! Caching, session state, and retry policy live one layer up in
//! `mbsi-core`; this crate performs exactly one HTTP round trip per call.

pub mod auth;
pub mod client;
pub mod coins;
pub mod error;
pub mod model;
pub mod statistics;
pub mod transport;
pub mod users;

pub use client::{AuthEvent, PortalClient};
pub use error::Error;
pub use model::{
    Account, AuthSession, ClassRank, ClassRef, CoinBalance, CoinTransaction, Pagination,
    RegisterRequest, SimpleStats, TransactionPage, UpdateProfile, WeeklyRankings,
    WeeklyStatistics,
};
pub use transport::TransportConfig;
