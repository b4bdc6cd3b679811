use serde::{Deserialize, Serialize};

/// One stored version of a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVersion {
    #[serde(default)]
    pub version_id: Option<i64>,
    pub version_number: i64,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_hash: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Envelope of the versions endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct VersionsResponse {
    #[serde(default)]
    pub versions: Vec<FileVersion>,
}
