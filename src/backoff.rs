use std::{cell::Cell, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use tokio_retry::RetryIf;

use crate::provider::{ProviderError, VideoMetadata, VideoProvider};

pub const DEFAULT_MAX_RETRIES: u32 = 10;

const BASE_DELAY_SECS: f64 = 4.0;
const JITTER_MEAN: f64 = 2.0;
const JITTER_STD_DEV: f64 = 0.5;

/// Delay before retrying after the `attempt`-th (1-based) failure, given a
/// jitter factor drawn around [`JITTER_MEAN`]. Never negative.
pub fn backoff_delay(attempt: u32, jitter: f64) -> Duration {
    let secs = BASE_DELAY_SECS + jitter * f64::from(attempt.saturating_mul(2));
    Duration::from_secs_f64(secs.max(0.0))
}

/// Yields one jittered delay per retry. The expected delay grows linearly:
/// about 8s, 12s, 16s and so on.
pub struct GaussianBackoff<R> {
    rng: R,
    attempt: u32,
    delays: u32,
}

impl<R: Rng> GaussianBackoff<R> {
    pub fn new(rng: R, delays: u32) -> Self {
        Self {
            rng,
            attempt: 0,
            delays,
        }
    }
}

impl<R: Rng> Iterator for GaussianBackoff<R> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.delays {
            return None;
        }
        self.attempt += 1;

        let z: f64 = self.rng.sample(StandardNormal);
        Some(backoff_delay(self.attempt, JITTER_MEAN + JITTER_STD_DEV * z))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of fetch attempts per video.
    pub max_retries: u32,
    /// Fixed jitter seed; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            seed: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delays between attempts: one fewer than there are attempts.
    pub fn delays(&self) -> GaussianBackoff<StdRng> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        GaussianBackoff::new(rng, self.max_retries.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(VideoMetadata),
    /// Every attempt failed with a transient error.
    Exhausted {
        attempts: u32,
        last_error: Option<String>,
    },
}

/// Fetches metadata for `video`, retrying transient failures per `policy`.
///
/// Each attempt is a fresh provider call. Running out of attempts is not an
/// error; it comes back as [`FetchOutcome::Exhausted`]. Non-transient errors
/// end the retry loop and are returned.
pub async fn fetch_with_retry<P>(
    provider: &P,
    video: &str,
    policy: &RetryPolicy,
) -> Result<FetchOutcome, ProviderError>
where
    P: VideoProvider + ?Sized,
{
    let max_retries = policy.max_retries;
    if max_retries == 0 {
        return Ok(FetchOutcome::Exhausted {
            attempts: 0,
            last_error: None,
        });
    }

    let attempts = Cell::new(0u32);
    let attempts_ref = &attempts;
    let action = move || {
        attempts_ref.set(attempts_ref.get() + 1);
        let attempt = attempts_ref.get();
        async move {
            provider.fetch_metadata(video).await.map_err(|e| {
                warn!(
                    "Failed to retrieve video data for {} (attempt {}/{}): {}",
                    video, attempt, max_retries, e
                );
                e
            })
        }
    };

    let result = RetryIf::spawn(policy.delays(), action, |e: &ProviderError| {
        e.is_transient()
    })
    .await;

    match result {
        Ok(metadata) => Ok(FetchOutcome::Fetched(metadata)),
        Err(e) if e.is_transient() => {
            warn!(
                "Failed to retrieve video data for {} after {} retries.",
                video,
                attempts.get()
            );
            Ok(FetchOutcome::Exhausted {
                attempts: attempts.get(),
                last_error: Some(e.to_string()),
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{player_response::PlayerResponseError, status::PrivacyStatus};

    struct FlakyProvider {
        failures: u32,
        fatal: bool,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                fatal: false,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            title: "A".into(),
            publish_date: Some("2024-01-01 00:00:00".into()),
            keywords: vec!["k".into()],
            description: "d".into(),
            length: 120,
        }
    }

    #[async_trait]
    impl VideoProvider for FlakyProvider {
        async fn list_channel_videos(
            &self,
            _channel: &str,
            _limit: usize,
        ) -> Result<Vec<String>, ProviderError> {
            Ok(vec![])
        }

        async fn check_availability(&self, _video: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn fetch_metadata(&self, _video: &str) -> Result<VideoMetadata, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fatal {
                return Err(ProviderError::InvalidReference("v".into()));
            }
            if call <= self.failures {
                return Err(ProviderError::PlayerResponse(
                    PlayerResponseError::NoVideoDetails,
                ));
            }
            Ok(metadata())
        }
    }

    fn seeded(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            seed: Some(7),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let provider = FlakyProvider::new(3);
        let outcome = fetch_with_retry(&provider, "v", &seeded(10)).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Fetched(metadata()));
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_retries() {
        let provider = FlakyProvider::new(u32::MAX);
        let policy = seeded(3);

        let start = tokio::time::Instant::now();
        let outcome = fetch_with_retry(&provider, "v", &policy).await.unwrap();
        let expected_wait: Duration = policy.delays().sum();

        match outcome {
            FetchOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.unwrap().contains("no video details"));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(provider.calls(), 3);
        assert!(start.elapsed() >= expected_wait);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_are_not_retried() {
        let provider = FlakyProvider {
            fatal: true,
            ..FlakyProvider::new(0)
        };
        let result = fetch_with_retry(&provider, "v", &seeded(10)).await;

        assert!(matches!(result, Err(ProviderError::InvalidReference(_))));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn zero_retries_never_calls_provider() {
        let provider = FlakyProvider::new(0);
        let outcome = fetch_with_retry(&provider, "v", &seeded(0)).await.unwrap();

        assert_eq!(
            outcome,
            FetchOutcome::Exhausted {
                attempts: 0,
                last_error: None
            }
        );
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn unavailable_during_fetch_is_transient() {
        assert!(ProviderError::Unavailable(PrivacyStatus::Unavailable).is_transient());
    }

    #[test]
    fn delay_formula() {
        assert_eq!(backoff_delay(1, 2.0), Duration::from_secs(8));
        assert_eq!(backoff_delay(2, 2.0), Duration::from_secs(12));
        assert_eq!(backoff_delay(3, 2.5), Duration::from_secs(19));
        assert_eq!(backoff_delay(10, -5.0), Duration::ZERO);
    }

    #[test]
    fn delays_follow_expected_mean() {
        let samples = 20_000;
        for attempt in 1..=5u32 {
            let mut rng = StdRng::seed_from_u64(u64::from(attempt));
            let total: f64 = (0..samples)
                .map(|_| {
                    let z: f64 = rng.sample(StandardNormal);
                    backoff_delay(attempt, JITTER_MEAN + JITTER_STD_DEV * z).as_secs_f64()
                })
                .sum();
            let mean = total / f64::from(samples);
            let expected = 4.0 + 2.0 * f64::from(2 * attempt);
            assert!(
                (mean - expected).abs() < 0.1,
                "attempt {}: mean {} expected {}",
                attempt,
                mean,
                expected
            );
        }
    }

    #[test]
    fn one_delay_between_each_attempt() {
        assert_eq!(seeded(10).delays().count(), 9);
        assert_eq!(seeded(1).delays().count(), 0);
        assert_eq!(seeded(0).delays().count(), 0);

        let first: Vec<Duration> = seeded(4).delays().collect();
        let again: Vec<Duration> = seeded(4).delays().collect();
        assert_eq!(first, again);
    }
}
