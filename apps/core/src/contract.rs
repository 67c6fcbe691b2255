use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{EntryKind, RecentFolder, SearchResult};
use crate::notify::Notification;
use crate::transfer::{TransferMode, TransferSummary};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub text: String,
    pub budget: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollRequest {
    pub budget: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowseRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferRequest {
    pub mode: TransferMode,
    pub destination: String,
    /// Answer for colliding names missing from `overwrite`.
    #[serde(default)]
    pub overwrite_existing: bool,
    /// Per file name overwrite answers, e.g. `{"report.pdf": true}`.
    #[serde(default)]
    pub overwrite: BTreeMap<String, bool>,
    /// Replaces the session selection when present.
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForgetRecentRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload")]
pub enum CoreRequest {
    Search(SearchRequest),
    Poll(PollRequest),
    Browse(BrowseRequest),
    Up,
    Recents,
    ForgetRecent(ForgetRecentRequest),
    Transfer(TransferRequest),
    ToggleDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResultDto {
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub kind: EntryKind,
    pub last_accessed_epoch_secs: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentFolderDto {
    pub path: String,
    pub title: String,
    pub last_used_epoch_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultsResponse {
    pub state: String,
    pub search_text: String,
    pub browse_path: Option<String>,
    pub querying: bool,
    pub results: Vec<SearchResultDto>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentsResponse {
    pub folders: Vec<RecentFolderDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferResponse {
    pub summary: TransferSummary,
    pub close_window: bool,
    pub notifications: Vec<Notification>,
    pub huds: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetailsResponse {
    pub show_details: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload")]
pub enum CoreResponse {
    Results(ResultsResponse),
    Recents(RecentsResponse),
    Transfer(TransferResponse),
    Details(DetailsResponse),
}

impl From<&SearchResult> for SearchResultDto {
    fn from(value: &SearchResult) -> Self {
        Self {
            path: value.path.to_string_lossy().into_owned(),
            title: value.display_name.clone(),
            subtitle: value.parent_display(),
            kind: value.kind,
            last_accessed_epoch_secs: value.last_accessed_epoch_secs,
        }
    }
}

impl From<&RecentFolder> for RecentFolderDto {
    fn from(value: &RecentFolder) -> Self {
        Self {
            path: value.folder.path.to_string_lossy().into_owned(),
            title: value.folder.display_name.clone(),
            last_used_epoch_secs: value.last_used_epoch_secs,
        }
    }
}
