//! JSON-backed state: the per-channel video records and the ledger of videos
//! whose metadata could not be fetched.
//!
//! Both files are read whole at start and written whole at the end of a pass.
//! Nothing here locks the files, so two runs must never share an output path.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{provider::VideoMetadata, status::PrivacyStatus};

/// Written as `upload_time` when the provider has no publish date.
pub const UNKNOWN_UPLOAD_TIME: &str = "None";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("could not access {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacystatus: Option<PrivacyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Keys this version doesn't know about, kept so a rewrite loses nothing.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A partial update: every `Some` field overwrites, every `None` field leaves
/// the record alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub upload_time: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub description: Option<String>,
    pub length: Option<u64>,
    pub privacystatus: Option<PrivacyStatus>,
    pub timestamp: Option<String>,
    pub last_updated: Option<String>,
}

impl VideoUpdate {
    pub fn timestamp(timestamp: &str) -> Self {
        Self {
            timestamp: Some(timestamp.to_string()),
            ..Self::default()
        }
    }

    pub fn last_updated(timestamp: &str) -> Self {
        Self {
            last_updated: Some(timestamp.to_string()),
            ..Self::default()
        }
    }
}

impl From<VideoMetadata> for VideoUpdate {
    fn from(metadata: VideoMetadata) -> Self {
        Self {
            title: Some(metadata.title),
            upload_time: Some(
                metadata
                    .publish_date
                    .unwrap_or_else(|| UNKNOWN_UPLOAD_TIME.to_string()),
            ),
            keywords: Some(metadata.keywords),
            description: Some(metadata.description),
            length: Some(metadata.length),
            ..Self::default()
        }
    }
}

impl VideoRecord {
    pub fn apply(&mut self, update: VideoUpdate) {
        fn set<T>(field: &mut Option<T>, value: Option<T>) {
            if let Some(value) = value {
                *field = Some(value);
            }
        }

        set(&mut self.title, update.title);
        set(&mut self.upload_time, update.upload_time);
        set(&mut self.keywords, update.keywords);
        set(&mut self.description, update.description);
        set(&mut self.length, update.length);
        set(&mut self.privacystatus, update.privacystatus);
        set(&mut self.timestamp, update.timestamp);
        set(&mut self.last_updated, update.last_updated);
    }
}

/// channel -> video -> record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelStore {
    channels: BTreeMap<String, BTreeMap<String, VideoRecord>>,
}

impl ChannelStore {
    /// Reads the store at `path`; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        load_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self)
    }

    pub fn get(&self, channel: &str, video: &str) -> Option<&VideoRecord> {
        self.channels.get(channel)?.get(video)
    }

    /// The record for `(channel, video)`, created empty if needed.
    pub fn record_mut(&mut self, channel: &str, video: &str) -> &mut VideoRecord {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .entry(video.to_string())
            .or_default()
    }

    pub fn update(&mut self, channel: &str, video: &str, update: VideoUpdate) -> &VideoRecord {
        let record = self.record_mut(channel, video);
        record.apply(update);
        record
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.channels.iter().flat_map(|(channel, videos)| {
            videos
                .keys()
                .map(move |video| (channel.as_str(), video.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.channels.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: String,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// channel -> video -> most recent failure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureLedger {
    channels: BTreeMap<String, BTreeMap<String, FailureRecord>>,
}

impl FailureLedger {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        load_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self)
    }

    pub fn insert(&mut self, channel: &str, video: &str, record: FailureRecord) {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(video.to_string(), record);
    }

    pub fn get(&self, channel: &str, video: &str) -> Option<&FailureRecord> {
        self.channels.get(channel)?.get(video)
    }

    /// Adds every entry of `other`, replacing older entries for the same video.
    pub fn merge(&mut self, other: FailureLedger) {
        for (channel, videos) in other.channels {
            self.channels.entry(channel).or_default().extend(videos);
        }
    }

    pub fn len(&self) -> usize {
        self.channels.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)
}
