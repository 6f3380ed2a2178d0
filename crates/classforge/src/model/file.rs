use serde::Serialize;

use super::id::ResourceId;

/// A file inside a repository at a given branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub repository: ResourceId,
    pub path: String,
    pub branch: String,
}

/// Result of a commit that created or changed a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRef {
    /// Commit SHA, when the provider reports it.
    pub sha: Option<String>,
    pub file: FileRef,
}
