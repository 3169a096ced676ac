use std::fmt;

use serde::{Deserialize, Serialize};

use crate::provider::{ProviderError, VideoProvider};

/// Why a video can't be watched. Stored verbatim as a record's
/// `privacystatus`; a record without one is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrivacyStatus {
    #[serde(alias = "VideoPrivate")]
    Private,
    #[serde(alias = "VideoUnavailable")]
    Unavailable,
    #[serde(alias = "VideoRegionBlocked")]
    RegionBlocked,
    #[serde(alias = "AgeRestrictedError")]
    AgeRestricted,
}

impl PrivacyStatus {
    pub const ALL: [PrivacyStatus; 4] = [
        PrivacyStatus::Private,
        PrivacyStatus::Unavailable,
        PrivacyStatus::RegionBlocked,
        PrivacyStatus::AgeRestricted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Private => "Private",
            PrivacyStatus::Unavailable => "Unavailable",
            PrivacyStatus::RegionBlocked => "RegionBlocked",
            PrivacyStatus::AgeRestricted => "AgeRestricted",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asks the provider whether `video` can be watched.
///
/// Returns `Ok(None)` when the video is available, `Ok(Some(status))` when the
/// provider reports one of the known unavailability conditions. Any other
/// provider error is returned unchanged.
pub async fn classify<P>(provider: &P, video: &str) -> Result<Option<PrivacyStatus>, ProviderError>
where
    P: VideoProvider + ?Sized,
{
    match provider.check_availability(video).await {
        Ok(()) => Ok(None),
        Err(ProviderError::Unavailable(status)) => Ok(Some(status)),
        Err(e) => Err(e),
    }
}
