use std::path::PathBuf;

use clap::Parser;

use crate::backoff::{RetryPolicy, DEFAULT_MAX_RETRIES};

pub const DEFAULT_COUNT: usize = 10;
pub const DEFAULT_STORE_PATH: &str = "video_data.json";
pub const DEFAULT_FAILED_PATH: &str = "failed.json";

/// Record privacy and availability changes of YouTube channel videos.
///
/// Do not run two instances against the same output files at once; nothing
/// locks them.
#[derive(Debug, Clone, Parser)]
#[command(name = "yt-privacy", version, about)]
pub struct Args {
    /// Channel URLs, @handles or UC… channel ids to discover videos from
    #[arg(required_unless_present = "ignore_new")]
    pub channels: Vec<String>,

    /// Most recent videos to consider per channel
    #[arg(long, env = "YT_PRIVACY_COUNT", default_value_t = DEFAULT_COUNT)]
    pub count: usize,

    /// Metadata fetch attempts per video before giving up
    #[arg(long, env = "YT_PRIVACY_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Store to load
    #[arg(long, env = "YT_PRIVACY_INPUT", default_value = DEFAULT_STORE_PATH)]
    pub input: PathBuf,

    /// Store to write
    #[arg(long, env = "YT_PRIVACY_OUTPUT", default_value = DEFAULT_STORE_PATH)]
    pub output: PathBuf,

    /// Ledger of videos whose metadata could not be fetched
    #[arg(long, env = "YT_PRIVACY_FAILED", default_value = DEFAULT_FAILED_PATH)]
    pub failed: PathBuf,

    /// Only re-check videos already in the store
    #[arg(long)]
    pub ignore_new: bool,

    /// Start without waiting for YouTube to be reachable
    #[arg(long)]
    pub skip_preflight: bool,

    /// Seed for the retry jitter
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub channels: Vec<String>,
    pub count: usize,
    pub max_retries: u32,
    pub input: PathBuf,
    pub output: PathBuf,
    pub failed: PathBuf,
    pub ignore_new: bool,
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            count: DEFAULT_COUNT,
            max_retries: DEFAULT_MAX_RETRIES,
            input: PathBuf::from(DEFAULT_STORE_PATH),
            output: PathBuf::from(DEFAULT_STORE_PATH),
            failed: PathBuf::from(DEFAULT_FAILED_PATH),
            ignore_new: false,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            seed: self.seed,
        }
    }
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        Self {
            channels: args.channels,
            count: args.count,
            max_retries: args.max_retries,
            input: args.input,
            output: args.output,
            failed: args.failed,
            ignore_new: args.ignore_new,
            seed: args.seed,
        }
    }
}
