use std::collections::HashSet;

use serde_json::Value;

use crate::util;

const INITIAL_DATA_STR: &str = "var ytInitialData =";

#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("Could not find initial data")]
    NoInitialData,
    #[error("Could not parse initial data")]
    ParseInitialData(#[from] serde_json::Error),
}

/// Video ids listed on a channel's videos tab, newest first, without
/// duplicates and at most `limit` long.
pub fn video_ids_from_html(html: &str, limit: usize) -> Result<Vec<String>, ChannelError> {
    let data_str =
        util::extract_json_object(html, INITIAL_DATA_STR).ok_or(ChannelError::NoInitialData)?;
    let data: Value = serde_json::from_str(data_str)?;

    let mut ids = Vec::new();
    collect_video_ids(&data, &mut ids);

    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
    ids.truncate(limit);

    Ok(ids)
}

// Arrays are walked in order, which is the order the tab shows them in.
fn collect_video_ids(value: &Value, ids: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(id) = map
                .get("videoRenderer")
                .and_then(|renderer| renderer.get("videoId"))
                .and_then(Value::as_str)
            {
                ids.push(id.to_string());
                return;
            }
            for child in map.values() {
                collect_video_ids(child, ids);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_video_ids(item, ids);
            }
        }
        _ => (),
    }
}
