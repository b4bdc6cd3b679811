use serde::{Deserialize, Serialize};

use super::FileRecord;

/// A folder owned by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    #[serde(alias = "id")]
    pub folder_id: i64,
    #[serde(alias = "name")]
    pub folder_name: String,
    #[serde(alias = "parent_folder_id")]
    pub parent_id: Option<i64>,
    pub created_at: Option<String>,
}

/// Body of the create-folder call.
#[derive(Debug, Serialize)]
pub(crate) struct NewFolder<'a> {
    pub folder_name: &'a str,
    pub parent_id: Option<i64>,
}

/// A folder together with the files directly inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderListing {
    pub folder_id: i64,
    pub folder_name: String,
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

/// Everything the user owns, grouped by folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesAndFolders {
    #[serde(default)]
    pub folders: Vec<FolderListing>,
    /// Files not associated with any folder.
    #[serde(default)]
    pub independent_files: Vec<FileRecord>,
}

impl FilesAndFolders {
    pub fn file_count(&self) -> usize {
        self.independent_files.len() + self.folders.iter().map(|f| f.files.len()).sum::<usize>()
    }
}
