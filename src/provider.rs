use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    channel::{self, ChannelError},
    player_response::{InitialPlayerResponse, PlayerResponseError},
    status::PrivacyStatus,
    util,
};

const YOUTUBE_ORIGIN: &str = "https://www.youtube.com";

/// Everything recorded about an available video. Fetched in one go; there is
/// no such thing as a partial result.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub publish_date: Option<String>,
    pub keywords: Vec<String>,
    pub description: String,
    pub length: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("video is {0}")]
    Unavailable(PrivacyStatus),
    #[error("http error: {0}")]
    Http(#[from] util::DownloadError),
    #[error("player response error: {0}")]
    PlayerResponse(#[from] PlayerResponseError),
    #[error("channel page error: {0}")]
    Channel(#[from] ChannelError),
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl ProviderError {
    /// Whether a metadata fetch that failed this way is worth another try.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable(_)
                | ProviderError::Http(_)
                | ProviderError::PlayerResponse(_)
        )
    }
}

/// The video platform, as seen by the reconciler.
///
/// Calls are independent: nothing is cached between them, so every call
/// works from a fresh page.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Most recent videos of `channel`, newest first, at most `limit`.
    async fn list_channel_videos(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<String>, ProviderError>;

    /// `Ok(())` if the video can be watched, [`ProviderError::Unavailable`]
    /// if it can't.
    async fn check_availability(&self, video: &str) -> Result<(), ProviderError>;

    async fn fetch_metadata(&self, video: &str) -> Result<VideoMetadata, ProviderError>;
}

pub struct YouTube {
    client: util::HttpClient,
}

impl YouTube {
    pub fn new() -> Result<Self, util::DownloadError> {
        Ok(Self {
            client: util::HttpClient::new()?,
        })
    }

    async fn player_response(&self, video: &str) -> Result<InitialPlayerResponse, ProviderError> {
        let url = watch_url(video)?;
        let html = self.client.fetch_text(&url).await?;
        Ok(InitialPlayerResponse::from_html(&html)?)
    }
}

#[async_trait]
impl VideoProvider for YouTube {
    async fn list_channel_videos(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<String>, ProviderError> {
        let url = channel_videos_url(channel)?;
        let html = self.client.fetch_text(&url).await?;
        let ids = channel::video_ids_from_html(&html, limit)?;

        debug!("{} lists {} video(s)", url, ids.len());

        Ok(ids.iter().map(|id| watch_url_for_id(id)).collect())
    }

    async fn check_availability(&self, video: &str) -> Result<(), ProviderError> {
        match self.player_response(video).await?.unavailability()? {
            Some(status) => Err(ProviderError::Unavailable(status)),
            None => Ok(()),
        }
    }

    async fn fetch_metadata(&self, video: &str) -> Result<VideoMetadata, ProviderError> {
        let ipr = self.player_response(video).await?;
        if let Some(status) = ipr.unavailability()? {
            return Err(ProviderError::Unavailable(status));
        }

        let publish_date = ipr.publish_date().map(util::normalize_publish_date);
        let details = ipr
            .video_details
            .ok_or(PlayerResponseError::NoVideoDetails)?;

        Ok(VideoMetadata {
            title: details.title,
            publish_date,
            keywords: details.keywords,
            description: details.short_description,
            length: details.length_seconds,
        })
    }
}

lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|shorts/|embed/|live/)|youtu\.be/)?([0-9A-Za-z_-]{11})(?:[?&#/].*)?$"
    )
    .unwrap();
    static ref CHANNEL_ID_RE: Regex = Regex::new(r"^UC[0-9A-Za-z_-]{22}$").unwrap();
}

// Tabs a channel URL may already point at; the listing always reads `/videos`.
const CHANNEL_TABS: &[&str] = &[
    "featured",
    "videos",
    "shorts",
    "streams",
    "playlists",
    "community",
    "channels",
    "about",
    "live",
];

/// Extracts the 11-character id from a watch URL, short link or bare id.
pub fn video_id(reference: &str) -> Option<&str> {
    VIDEO_ID_RE
        .captures(reference.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn watch_url_for_id(id: &str) -> String {
    format!("{}/watch?v={}", YOUTUBE_ORIGIN, id)
}

pub fn watch_url(video: &str) -> Result<String, ProviderError> {
    video_id(video)
        .map(watch_url_for_id)
        .ok_or_else(|| ProviderError::InvalidReference(video.to_string()))
}

/// Resolves a channel URL, `@handle` or `UC…` id to the channel's videos tab.
pub fn channel_videos_url(channel: &str) -> Result<String, ProviderError> {
    let channel = channel.trim();
    let channel = channel
        .split(['?', '#'])
        .next()
        .unwrap_or(channel)
        .trim_end_matches('/');

    let base = if channel.starts_with("http://") || channel.starts_with("https://") {
        if !channel.contains("youtube.com/") {
            return Err(ProviderError::InvalidReference(channel.to_string()));
        }
        strip_channel_tab(channel)
    } else if channel.starts_with('@') && channel.len() > 1 && !channel.contains('/') {
        format!("{}/{}", YOUTUBE_ORIGIN, channel)
    } else if CHANNEL_ID_RE.is_match(channel) {
        format!("{}/channel/{}", YOUTUBE_ORIGIN, channel)
    } else {
        return Err(ProviderError::InvalidReference(channel.to_string()));
    };

    Ok(format!("{}/videos", base))
}

/// Drops a trailing tab segment such as `/featured` from a channel URL.
fn strip_channel_tab(url: &str) -> String {
    match url.rsplit_once('/') {
        Some((base, tab)) if CHANNEL_TABS.contains(&tab) => base.to_string(),
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_ids() {
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=deULZrx1FxE"),
            Some("deULZrx1FxE")
        );
        assert_eq!(
            video_id("https://www.youtube.com/watch?feature=share&v=deULZrx1FxE&t=10"),
            Some("deULZrx1FxE")
        );
        assert_eq!(video_id("https://youtu.be/GddMUiqbx7s"), Some("GddMUiqbx7s"));
        assert_eq!(
            video_id("youtube.com/shorts/GddMUiqbx7s"),
            Some("GddMUiqbx7s")
        );
        assert_eq!(video_id("GddMUiqbx7s"), Some("GddMUiqbx7s"));
        assert_eq!(video_id("https://example.com/watch?v=GddMUiqbx7s"), None);
        assert_eq!(video_id("short"), None);
    }

    #[test]
    fn watch_urls() {
        assert_eq!(
            watch_url("GddMUiqbx7s").unwrap(),
            "https://www.youtube.com/watch?v=GddMUiqbx7s"
        );
        assert!(matches!(
            watch_url("not a video"),
            Err(ProviderError::InvalidReference(_))
        ));
    }

    #[test]
    fn channel_urls() {
        assert_eq!(
            channel_videos_url("https://www.youtube.com/user/ANNnewsCH/videos").unwrap(),
            "https://www.youtube.com/user/ANNnewsCH/videos"
        );
        assert_eq!(
            channel_videos_url("https://www.youtube.com/@examplenews/").unwrap(),
            "https://www.youtube.com/@examplenews/videos"
        );
        assert_eq!(
            channel_videos_url("@examplenews").unwrap(),
            "https://www.youtube.com/@examplenews/videos"
        );
        assert_eq!(
            channel_videos_url("UCaaaaaaaaaaaaaaaaaaaaaa").unwrap(),
            "https://www.youtube.com/channel/UCaaaaaaaaaaaaaaaaaaaaaa/videos"
        );
        assert_eq!(
            channel_videos_url("https://www.youtube.com/@examplenews?si=abc").unwrap(),
            "https://www.youtube.com/@examplenews/videos"
        );
        assert_eq!(
            channel_videos_url("https://www.youtube.com/@examplenews/featured").unwrap(),
            "https://www.youtube.com/@examplenews/videos"
        );
        let streams_tab = "https://www.youtube.com/channel/UCaaaaaaaaaaaaaaaaaaaaaa/streams/#top";
        assert_eq!(
            channel_videos_url(streams_tab).unwrap(),
            "https://www.youtube.com/channel/UCaaaaaaaaaaaaaaaaaaaaaa/videos"
        );
        assert_eq!(
            channel_videos_url("@examplenews?si=abc").unwrap(),
            "https://www.youtube.com/@examplenews/videos"
        );
        assert!(channel_videos_url("https://example.com/@x").is_err());
        assert!(channel_videos_url("examplenews").is_err());
        assert!(channel_videos_url("@").is_err());
    }

    #[test]
    fn transient_errors() {
        assert!(ProviderError::Unavailable(PrivacyStatus::Private).is_transient());
        assert!(ProviderError::PlayerResponse(PlayerResponseError::NoVideoDetails).is_transient());
        assert!(!ProviderError::InvalidReference("x".into()).is_transient());
        assert!(!ProviderError::Channel(ChannelError::NoInitialData).is_transient());
        assert!(ProviderError::PlayerResponse(PlayerResponseError::SignInRequired(
            "Sign in to confirm you\u{2019}re not a bot".into()
        ))
        .is_transient());
    }
}
