//! # yt-privacy
//!
//! This crate keeps a JSON record of the videos on a set of YouTube channels
//! and notices when they go private, get region blocked, age restricted or
//! removed. Each run is one pass: every video already in the store plus the
//! newest videos of every channel is checked once, and the store is rewritten.
//!
//! ## Usage
//!
//! The `reconcile` module drives a pass against anything that implements
//! [`provider::VideoProvider`]; [`provider::YouTube`] talks to youtube.com
//! directly.
//!
//! ```rust,no_run
//! use yt_privacy::{config::RunConfig, preflight, provider::YouTube, reconcile};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // Wait until youtube.com is reachable
//!     preflight::wait_for_provider().await;
//!
//!     // Create the provider, which wraps a retrying HTTP client
//!     let youtube = YouTube::new().unwrap();
//!
//!     // Check the ten newest videos of a channel plus everything tracked so far
//!     let config = RunConfig {
//!         channels: vec!["https://www.youtube.com/@examplenews".to_string()],
//!         ..RunConfig::default()
//!     };
//!     let report = reconcile::run(&youtube, &config).await.unwrap();
//!
//!     println!("{}", report.stats);
//! }
//! ```
//!
//! Records that keep failing to fetch end up in `failed.json` next to the
//! store. Runs must not overlap on the same files; nothing locks them.

#![forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod backoff;
pub mod channel;
pub mod config;
pub mod player_response;
pub mod preflight;
pub mod provider;
pub mod reconcile;
pub mod stats;
pub mod status;
pub mod store;
pub mod util;
