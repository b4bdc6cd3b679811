//! Wire records exchanged with the storage backend.
//!
//! - `AuthToken`, `Profile`, `Registration`: account and credential types
//! - `FileRecord`, `FileUpload`, `UploadedFile`, `Download`, `SearchQuery`: files
//! - `Folder`, `FolderListing`, `FilesAndFolders`: folder organization
//! - `FileVersion`: version history and rollback
//! - `AccessType`: sharing permissions
//! - `UsageAnalytics`, `Ack`: analytics and acknowledgement bodies
//!
//! Responses are parsed leniently: optional fields default when missing so
//! that backend revisions adding or dropping fields do not break the client.

pub mod account;
pub mod analytics;
pub mod file;
pub mod folder;
pub mod share;
pub mod version;

pub use account::{AuthToken, Profile, Registration};
pub use analytics::{Ack, UsageAnalytics};
pub use file::{Download, FileRecord, FileUpload, SearchQuery, UploadedFile};
pub use folder::{FilesAndFolders, Folder, FolderListing};
pub use share::AccessType;
pub use version::FileVersion;
