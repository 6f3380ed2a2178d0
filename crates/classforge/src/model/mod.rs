//! Normalized data model shared by every backend.
//!
//! All entities are read-model snapshots: a provider builds them while
//! translating an API response and never mutates them afterwards. Changing a
//! resource means issuing another backend call and receiving a new snapshot.

pub mod file;
pub mod group;
pub mod id;
pub mod merge_request;
pub mod repository;
pub mod user;
pub mod visibility;

pub use file::{CommitRef, FileRef};
pub use group::{AccessLevel, Group};
pub use id::{IdScope, ResourceId};
pub use merge_request::{MergeRequest, MergeRequestState};
pub use repository::{OwnerKind, OwnerRef, Repository};
pub use user::User;
pub use visibility::Visibility;
