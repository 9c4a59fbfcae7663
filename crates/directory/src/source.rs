use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    Result,
    types::{Group, Identity},
};

/// Live vendor view of contacts and groups.
///
/// Each channel adapter implements this on top of its SDK client. Calls are
/// expected to block on network/RPC I/O; the cache only invokes them from a
/// background refresh task or as a last-resort name lookup.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Full contact snapshot, keyed by vendor id.
    async fn fetch_contacts(&self) -> Result<HashMap<String, Identity>>;

    /// Full group snapshot (with member rosters), keyed by vendor id.
    async fn fetch_groups(&self) -> Result<HashMap<String, Group>>;

    /// Point query for a display name not in the contact snapshot.
    /// `Ok(None)` means the vendor does not know the id either.
    async fn query_display_name(&self, id: &str) -> Result<Option<String>>;
}

/// Source for channels without a queryable directory (webhook channels).
pub struct EmptySource;

#[async_trait]
impl DirectorySource for EmptySource {
    async fn fetch_contacts(&self) -> Result<HashMap<String, Identity>> {
        Ok(HashMap::new())
    }

    async fn fetch_groups(&self) -> Result<HashMap<String, Group>> {
        Ok(HashMap::new())
    }

    async fn query_display_name(&self, _id: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
