use std::path::PathBuf;

use crate::mission::types::MissionPhase;

/// Fatal conditions that escape a pipeline cycle. Recoverable outcomes (a
/// failed grasp, an unknown track id, a navigation leg that could not be
/// completed) are reported through return values instead.
#[derive(Debug, thiserror::Error)]
pub enum FishError {
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("no dump points are configured for unloading")]
    NoDumpPoints,

    #[error("mission is no longer active (phase {0})")]
    MissionInactive(MissionPhase),

    #[error("outcome sink failed: {0}")]
    OutcomeSink(#[from] std::io::Error),

    #[error("failed to encode outcome record: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FishError>;
