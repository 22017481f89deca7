//! Ball-by-ball IPL analytics: stability-gated leaderboards plus the
//! season, toss and venue tables behind the dashboard pages.

pub mod dataset;
pub mod error;
pub mod export;
pub mod gates;
pub mod leaderboard;
pub mod metrics;
pub mod phase;
pub mod scope;
pub mod season;
pub mod toss;
pub mod venue;
