//! Runtime for a squares pool: the document store, the live score feed client,
//! the payout sync pipeline and host-side game management.

pub mod config;
pub mod feed;
pub mod game;
pub mod paths;
pub mod payout_log;
pub mod store;
pub mod sync;
