use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::catch_object::CatchObject;
use crate::game::replay::Replay;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed timeline JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Object timeline handed over by the beatmap side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Beatmap circle size; overrides the configured catch width when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle_size: Option<f32>,
    pub objects: Vec<CatchObject>,
}

pub fn parse_timeline(text: &str) -> Result<Timeline, TimelineError> {
    Ok(serde_json::from_str(text)?)
}

pub fn load_timeline(path: &Path) -> Result<Timeline, TimelineError> {
    let text = std::fs::read_to_string(path).map_err(|source| TimelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let timeline = parse_timeline(&text)?;
    info!(
        "Loaded {} objects from '{}'.",
        timeline.objects.len(),
        path.display()
    );
    Ok(timeline)
}

pub fn replay_to_json(replay: &Replay) -> Result<String, TimelineError> {
    Ok(serde_json::to_string_pretty(replay)?)
}
