//! One reconciliation pass: discover, classify, fetch, merge, persist.
//!
//! Everything runs in sequence on the caller's task. Videos are handled one at
//! a time and the store is written exactly once, after the last video.

use std::collections::BTreeSet;

use crate::{
    backoff::{self, FetchOutcome, RetryPolicy},
    config::RunConfig,
    provider::{ProviderError, VideoProvider},
    stats::PassStatistics,
    status,
    store::{ChannelStore, FailureLedger, FailureRecord, StoreError, VideoUpdate},
    util,
};

/// A `(channel, video)` pair. The same video under two channels is two pairs.
pub type VideoKey = (String, String);

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("state store error: {0}")]
    Store(#[from] StoreError),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub stats: PassStatistics,
    /// Videos whose metadata fetch ran out of attempts during this pass.
    pub failures: FailureLedger,
}

pub struct Reconciler<'a, P: ?Sized> {
    provider: &'a P,
    policy: RetryPolicy,
    clock: Box<dyn Fn() -> String + 'a>,
}

impl<'a, P> Reconciler<'a, P>
where
    P: VideoProvider + ?Sized,
{
    pub fn new(provider: &'a P, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            clock: Box::new(util::timestamp_now),
        }
    }

    /// Replaces the source of `timestamp` / `last_updated` values.
    pub fn with_clock(mut self, clock: impl Fn() -> String + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Lists the newest `count` videos of every channel.
    pub async fn discover(
        &self,
        channels: &[String],
        count: usize,
    ) -> Result<BTreeSet<VideoKey>, ProviderError> {
        let mut discovered = BTreeSet::new();

        for channel in channels {
            let videos = self.provider.list_channel_videos(channel, count).await?;
            info!("Found {} video(s) on {}", videos.len(), channel);
            discovered.extend(videos.into_iter().map(|video| (channel.clone(), video)));
        }

        Ok(discovered)
    }

    /// Checks every tracked and every discovered video once, updating `store`
    /// in place.
    ///
    /// Unavailable videos get their `privacystatus`; `last_updated` is set the
    /// first time a video is seen unavailable and never again. Available videos
    /// get fresh metadata. Videos whose fetch runs out of attempts are left
    /// untouched and reported in [`PassReport::failures`].
    pub async fn reconcile(
        &self,
        store: &mut ChannelStore,
        discovered: BTreeSet<VideoKey>,
    ) -> Result<PassReport, ProviderError> {
        let mut stats = PassStatistics::new();
        let mut failures = FailureLedger::default();

        stats.videos_discovered = discovered
            .iter()
            .filter(|(channel, video)| store.get(channel, video).is_none())
            .count() as u64;
        let working_set = working_set(store, discovered);
        let total = working_set.len();

        for (index, (channel, video)) in working_set.iter().enumerate() {
            let timestamp = (self.clock)();
            stats.videos_checked += 1;
            debug!("[{}/{}] Checking {} ({})", index + 1, total, video, channel);

            let unavailable = status::classify(self.provider, video).await?;
            match unavailable {
                Some(status) => {
                    stats.videos_unavailable += 1;
                    info!("{} is {}", video, status);
                    store.update(
                        channel,
                        video,
                        VideoUpdate {
                            privacystatus: Some(status),
                            timestamp: Some(timestamp.clone()),
                            ..VideoUpdate::default()
                        },
                    );
                }
                None => {
                    let outcome =
                        backoff::fetch_with_retry(self.provider, video, &self.policy).await?;
                    match outcome {
                        FetchOutcome::Fetched(metadata) => {
                            stats.videos_available += 1;
                            let record = store.record_mut(channel, video);
                            if let Some(previous) = record.privacystatus.take() {
                                stats.videos_recovered += 1;
                                info!("{} is available again (was {})", video, previous);
                            }
                            record.apply(metadata.into());
                        }
                        FetchOutcome::Exhausted {
                            attempts,
                            last_error,
                        } => {
                            stats.videos_failed += 1;
                            failures.insert(
                                channel,
                                video,
                                FailureRecord {
                                    timestamp,
                                    attempts,
                                    last_error,
                                },
                            );
                            continue;
                        }
                    }
                }
            }

            let record = store.record_mut(channel, video);
            if unavailable.is_some() && record.last_updated.is_none() {
                record.apply(VideoUpdate::last_updated(&timestamp));
            } else {
                record.apply(VideoUpdate::timestamp(&timestamp));
            }
        }

        Ok(PassReport { stats, failures })
    }
}

/// Every tracked pair plus every discovered one, each exactly once.
pub fn working_set(store: &ChannelStore, discovered: BTreeSet<VideoKey>) -> BTreeSet<VideoKey> {
    let mut set: BTreeSet<VideoKey> = store
        .pairs()
        .map(|(channel, video)| (channel.to_string(), video.to_string()))
        .collect();
    set.extend(discovered);
    set
}

/// Runs one full pass as configured and persists the result.
///
/// The store is written only if the whole pass succeeds. Failed fetches are
/// merged into the ledger at `config.failed`.
pub async fn run<P>(provider: &P, config: &RunConfig) -> Result<PassReport, RunError>
where
    P: VideoProvider + ?Sized,
{
    let mut store = ChannelStore::load(&config.input)?;
    info!(
        "Loaded {} tracked video(s) from {}",
        store.len(),
        config.input.display()
    );

    let reconciler = Reconciler::new(provider, config.retry_policy());
    let discovered = if config.ignore_new {
        BTreeSet::new()
    } else {
        reconciler.discover(&config.channels, config.count).await?
    };

    let report = reconciler.reconcile(&mut store, discovered).await?;
    store.save(&config.output)?;

    if !report.failures.is_empty() {
        let mut ledger = FailureLedger::load(&config.failed)?;
        ledger.merge(report.failures.clone());
        ledger.save(&config.failed)?;
        warn!(
            "{} video(s) could not be fetched, see {}",
            report.failures.len(),
            config.failed.display()
        );
    }

    report.stats.print();

    Ok(report)
}
