use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::files::FileFilter;
use crate::server::response::ApiError;
use crate::types::{FileType, Role};

#[derive(Debug, Deserialize)]
pub struct CreateIdentityRequest {
    pub subject: String,
    pub name: String,
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateIdentityResponse {
    pub id: String,
    pub token: String,
    pub subject: String,
    pub token_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SetMembershipRequest {
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFileRequest {
    pub name: String,
    pub file_type: FileType,
    pub storage_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGlobalFileRequest {
    pub name: String,
    pub file_type: FileType,
    pub storage_id: String,
}

/// Query string for listing an org's files.
#[derive(Debug, Default, Deserialize)]
pub struct ListFilesParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    #[serde(default)]
    pub trash: bool,
    #[serde(default)]
    pub favorites: bool,
}

impl ListFilesParams {
    /// An empty `type` means no type filter.
    pub fn into_filter(self) -> Result<FileFilter, ApiError> {
        let file_type = match self.file_type.as_deref() {
            None | Some("") | Some("all") => None,
            Some(s) => Some(
                FileType::parse(s)
                    .ok_or_else(|| ApiError::bad_request(format!("Unknown file type: {s}")))?,
            ),
        };

        Ok(FileFilter {
            query: self.query,
            file_type,
            trash: self.trash,
            favorites_only: self.favorites,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct KeyParams {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub expires: i64,
    pub sig: String,
}

#[derive(Debug, Serialize)]
pub struct UploadUrlResponse {
    pub upload_url: String,
}

#[derive(Debug, Serialize)]
pub struct StorageIdResponse {
    pub storage_id: String,
    /// Kind inferred from the upload's Content-Type, if recognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
}

#[derive(Debug, Serialize)]
pub struct FileUrlResponse {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FavoriteToggleResponse {
    pub favorited: bool,
}

#[derive(Debug, Serialize)]
pub struct MembershipRemovedResponse {
    pub removed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_into_filter() {
        let params = ListFilesParams {
            query: Some("report".into()),
            file_type: Some("pdf".into()),
            trash: true,
            favorites: false,
        };
        let filter = params.into_filter().unwrap();
        assert_eq!(filter.file_type, Some(FileType::Pdf));
        assert!(filter.trash);
        assert_eq!(filter.query.as_deref(), Some("report"));
    }

    #[test]
    fn test_list_params_all_type_means_unfiltered() {
        let params = ListFilesParams {
            file_type: Some("all".into()),
            ..ListFilesParams::default()
        };
        assert!(params.into_filter().unwrap().file_type.is_none());
    }

    #[test]
    fn test_list_params_rejects_unknown_type() {
        let params = ListFilesParams {
            file_type: Some("exe".into()),
            ..ListFilesParams::default()
        };
        assert!(params.into_filter().is_err());
    }
}
