use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A file visible to the user (owned or shared with them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(alias = "id")]
    pub file_id: i64,
    #[serde(alias = "file_name")]
    pub filename: String,
    pub original_filename: Option<String>,
    pub file_size: Option<u64>,
    pub file_type: Option<String>,
    pub created_at: Option<String>,
}

impl FileRecord {
    /// Name to show the user: the submitted name when known.
    pub fn display_name(&self) -> &str {
        self.original_filename.as_deref().unwrap_or(&self.filename)
    }
}

/// A local file to be uploaded.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub folder_name: Option<String>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
            folder_name: None,
        }
    }

    /// Place the file in the named folder (the backend creates it if missing).
    pub fn in_folder(mut self, folder_name: impl Into<String>) -> Self {
        self.folder_name = Some(folder_name.into());
        self
    }

    /// Content as sent on the wire: base64, or an empty string for empty files.
    pub fn encoded_content(&self) -> String {
        if self.content.is_empty() {
            String::new()
        } else {
            STANDARD.encode(&self.content)
        }
    }

    pub(crate) fn payload(&self) -> UploadPayload<'_> {
        UploadPayload {
            file: self.encoded_content(),
            file_name: &self.file_name,
            folder_name: self.folder_name.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadPayload<'a> {
    pub file: String,
    pub file_name: &'a str,
    pub folder_name: Option<&'a str>,
}

/// Metadata the backend returns for a stored upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_id: Option<i64>,
    pub filename: Option<String>,
    pub original_filename: Option<String>,
}

impl UploadedFile {
    /// The name the backend reports, falling back to `submitted`.
    pub fn display_name<'a>(&'a self, submitted: &'a str) -> &'a str {
        self.original_filename
            .as_deref()
            .or(self.filename.as_deref())
            .unwrap_or(submitted)
    }
}

/// Raw file content fetched from the backend.
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// Name from the `Content-Disposition` header, if any.
    pub file_name: Option<String>,
}

/// Filters for the search endpoint. Unset filters are not sent.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub file_type: Option<String>,
    pub created_after: Option<NaiveDate>,
    pub created_before: Option<NaiveDate>,
}

impl SearchQuery {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }

    pub(crate) fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(ref keyword) = self.keyword {
            pairs.push(("keyword".to_string(), keyword.clone()));
        }
        if let Some(ref file_type) = self.file_type {
            pairs.push(("file_type".to_string(), file_type.clone()));
        }
        if let Some(date) = self.created_after {
            pairs.push(("created_after".to_string(), date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.created_before {
            pairs.push(("created_before".to_string(), date.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_upload_payload_keeps_fields() {
        let upload = FileUpload::new("empty.txt", Vec::new());
        let json = serde_json::to_value(upload.payload()).unwrap();
        assert_eq!(json["file"], "");
        assert_eq!(json["file_name"], "empty.txt");
        assert!(json.get("folder_name").unwrap().is_null());
    }

    #[test]
    fn test_upload_payload_is_base64() {
        let upload = FileUpload::new("hello.txt", b"hello".to_vec()).in_folder("docs");
        let json = serde_json::to_value(upload.payload()).unwrap();
        assert_eq!(json["file"], "aGVsbG8=");
        assert_eq!(json["folder_name"], "docs");
    }

    #[test]
    fn test_uploaded_file_display_name_fallbacks() {
        let uploaded = UploadedFile {
            original_filename: Some("report_v2.pdf".to_string()),
            filename: Some("u_20240501.dat".to_string()),
            file_id: Some(1),
        };
        assert_eq!(uploaded.display_name("report.pdf"), "report_v2.pdf");

        let uploaded: UploadedFile =
            serde_json::from_str(r#"{"filename": "u_20240501.dat", "file_id": 4}"#).unwrap();
        assert_eq!(uploaded.display_name("report.pdf"), "u_20240501.dat");

        assert_eq!(UploadedFile::default().display_name("report.pdf"), "report.pdf");
    }

    #[test]
    fn test_file_record_accepts_backend_shape() {
        let record: FileRecord = serde_json::from_str(r#"{"file_id": 7, "filename": "a.dat"}"#).unwrap();
        assert_eq!(record.file_id, 7);
        assert_eq!(record.display_name(), "a.dat");
    }

    #[test]
    fn test_search_query_only_sends_set_filters() {
        assert!(SearchQuery::default().to_pairs().is_empty());

        let query = SearchQuery {
            file_type: Some("pdf".to_string()),
            created_after: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..SearchQuery::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("file_type".to_string(), "pdf".to_string()),
                ("created_after".to_string(), "2024-01-31".to_string()),
            ]
        );
    }
}
