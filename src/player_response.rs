use serde::Deserialize;
use serde_aux::prelude::*;

use crate::{status::PrivacyStatus, util};

// Only the fields needed for availability and metadata; YouTube adds and drops
// the rest freely.

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPlayerResponse {
    pub playability_status: PlayabilityStatus,
    pub video_details: Option<VideoDetails>,
    pub microformat: Option<Microformat>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    pub status: Status,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    LiveStreamOffline,
    LiveStream,
    Unplayable,
    LoginRequired,
    AgeCheckRequired,
    AgeVerificationRequired,
    ContentCheckRequired,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub length_seconds: u64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub short_description: String,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Microformat {
    pub player_microformat_renderer: PlayerMicroformatRenderer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMicroformatRenderer {
    pub publish_date: Option<String>,
    pub upload_date: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum PlayerResponseError {
    #[error("Could not find initial player response")]
    NoInitialPlayerResponse,
    #[error("Could not parse initial player response")]
    ParseInitialPlayerResponse(#[from] serde_json::Error),
    #[error("Player response has no video details")]
    NoVideoDetails,
    #[error("YouTube asks to sign in: {0}")]
    SignInRequired(String),
}

const IPR_STR: &str = "var ytInitialPlayerResponse =";

impl PlayabilityStatus {
    fn reason_contains(&self, needle: &str) -> bool {
        self.reason
            .as_deref()
            .map(|r| r.to_lowercase().contains(needle))
            .unwrap_or(false)
    }

    /// Maps the playability status onto a [`PrivacyStatus`], or `None` if the
    /// video can be watched.
    ///
    /// A sign-in wall that is not about the video itself (the bot check, for
    /// one) says nothing about the video and is an error instead.
    pub fn unavailability(&self) -> Result<Option<PrivacyStatus>, PlayerResponseError> {
        let status = match self.status {
            Status::Ok | Status::LiveStreamOffline => return Ok(None),
            Status::LoginRequired if self.reason_contains("private") => PrivacyStatus::Private,
            Status::LoginRequired if self.reason_contains("confirm your age") => {
                PrivacyStatus::AgeRestricted
            }
            Status::LoginRequired => {
                return Err(PlayerResponseError::SignInRequired(
                    self.reason.clone().unwrap_or_default(),
                ))
            }
            Status::AgeCheckRequired
            | Status::AgeVerificationRequired
            | Status::ContentCheckRequired => PrivacyStatus::AgeRestricted,
            Status::Unplayable if self.reason_contains("country") => PrivacyStatus::RegionBlocked,
            Status::Error if self.reason_contains("private") => PrivacyStatus::Private,
            _ => PrivacyStatus::Unavailable,
        };

        Ok(Some(status))
    }
}

impl InitialPlayerResponse {
    pub fn from_html(html: &str) -> Result<Self, PlayerResponseError> {
        let ipr_str = util::extract_json_object(html, IPR_STR)
            .ok_or(PlayerResponseError::NoInitialPlayerResponse)?;

        serde_json::from_str(ipr_str).map_err(PlayerResponseError::ParseInitialPlayerResponse)
    }

    pub fn unavailability(&self) -> Result<Option<PrivacyStatus>, PlayerResponseError> {
        self.playability_status.unavailability()
    }

    pub fn publish_date(&self) -> Option<&str> {
        let renderer = &self.microformat.as_ref()?.player_microformat_renderer;
        renderer
            .publish_date
            .as_deref()
            .or(renderer.upload_date.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::get_test_html;

    fn status(status: Status, reason: Option<&str>) -> PlayabilityStatus {
        PlayabilityStatus {
            status,
            reason: reason.map(String::from),
        }
    }

    fn mapped(kind: Status, reason: Option<&str>) -> Option<PrivacyStatus> {
        status(kind, reason)
            .unavailability()
            .expect("Status should map without error")
    }

    #[test]
    fn ipr_available() {
        let html = get_test_html("watchpage_available.html");
        let ipr = InitialPlayerResponse::from_html(&html).expect("Could not parse IPR");
        let details = ipr.video_details.clone().unwrap();

        assert_eq!(ipr.unavailability().unwrap(), None);
        assert_eq!(details.video_id, "dQw4w9WgXcQ");
        assert_eq!(details.title, "Evening news digest");
        assert_eq!(details.length_seconds, 212, "Video length is not correct");
        assert_eq!(details.keywords, vec!["news", "evening"]);
        assert_eq!(ipr.publish_date(), Some("2024-02-15T08:15:00-08:00"));
    }

    #[test]
    fn ipr_private() {
        let html = get_test_html("watchpage_private.html");
        let ipr = InitialPlayerResponse::from_html(&html).expect("Could not parse IPR");

        assert_eq!(ipr.playability_status.status, Status::LoginRequired);
        assert_eq!(ipr.unavailability().unwrap(), Some(PrivacyStatus::Private));
        assert!(ipr.video_details.is_none());
    }

    #[test]
    fn ipr_missing() {
        let err = InitialPlayerResponse::from_html("<html></html>").unwrap_err();
        assert!(matches!(err, PlayerResponseError::NoInitialPlayerResponse));
    }

    #[test]
    fn unknown_status_is_unavailable() {
        let ipr: InitialPlayerResponse =
            serde_json::from_str(r#"{"playabilityStatus": {"status": "SOMETHING_NEW"}}"#)
                .unwrap();
        assert_eq!(ipr.playability_status.status, Status::Unknown);
        assert_eq!(ipr.unavailability().unwrap(), Some(PrivacyStatus::Unavailable));
    }

    #[test]
    fn playability_mapping() {
        assert_eq!(mapped(Status::Ok, None), None);
        assert_eq!(mapped(Status::LiveStreamOffline, None), None);
        assert_eq!(
            mapped(
                Status::LoginRequired,
                Some("This is a private video. Please sign in to verify that you may see it.")
            ),
            Some(PrivacyStatus::Private)
        );
        assert_eq!(
            mapped(Status::LoginRequired, Some("Sign in to confirm your age")),
            Some(PrivacyStatus::AgeRestricted)
        );
        assert_eq!(
            mapped(Status::AgeCheckRequired, None),
            Some(PrivacyStatus::AgeRestricted)
        );
        assert_eq!(
            mapped(
                Status::Unplayable,
                Some("The uploader has not made this video available in your country")
            ),
            Some(PrivacyStatus::RegionBlocked)
        );
        assert_eq!(
            mapped(Status::Unplayable, Some("Join this channel to get access")),
            Some(PrivacyStatus::Unavailable)
        );
        assert_eq!(
            mapped(Status::Error, Some("This video is private")),
            Some(PrivacyStatus::Private)
        );
        assert_eq!(
            mapped(Status::Error, Some("Video unavailable")),
            Some(PrivacyStatus::Unavailable)
        );
        assert_eq!(
            mapped(Status::LiveStream, Some("This live event has ended.")),
            Some(PrivacyStatus::Unavailable)
        );

        // Bot check: a sign-in wall that is not about the video
        match status(
            Status::LoginRequired,
            Some("Sign in to confirm you\u{2019}re not a bot"),
        )
        .unavailability()
        {
            Err(PlayerResponseError::SignInRequired(reason)) => {
                assert!(reason.contains("not a bot"))
            }
            other => panic!("Expected SignInRequired, got {:?}", other),
        }
        assert!(matches!(
            status(Status::LoginRequired, None).unavailability(),
            Err(PlayerResponseError::SignInRequired(_))
        ));
    }
}
