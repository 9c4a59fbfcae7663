use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    source::DirectorySource,
    store::DirectoryStore,
    types::{Group, GroupMember, Identity},
};

/// Interval between periodic deep refreshes after the initial one.
const REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// In-memory directory with write-through persistence.
///
/// Contacts and groups sit behind one mutex per collection; membership
/// events and the background refresh both mutate them, and the merge policy
/// keeps the two interleaving safely. Locks are never held across await
/// points.
pub struct Directory {
    source: Arc<dyn DirectorySource>,
    store: DirectoryStore,
    contacts: Mutex<HashMap<String, Identity>>,
    groups: Mutex<HashMap<String, Group>>,
}

impl Directory {
    /// Build a directory seeded from the on-disk snapshots.
    ///
    /// Missing snapshots mean empty collections, never an error; the first
    /// refresh fills them in.
    pub fn load(source: Arc<dyn DirectorySource>, store: DirectoryStore) -> crate::Result<Self> {
        let contacts = store.load_contacts()?;
        let groups = store.load_groups()?;
        info!(
            contacts = contacts.len(),
            groups = groups.len(),
            "directory loaded from snapshot"
        );
        Ok(Self {
            source,
            store,
            contacts: Mutex::new(contacts),
            groups: Mutex::new(groups),
        })
    }

    /// O(1) cache lookup. Unknown ids return `None`, never an error.
    #[must_use]
    pub fn lookup_identity(&self, id: &str) -> Option<Identity> {
        self.contacts().get(id).cloned()
    }

    #[must_use]
    pub fn lookup_group(&self, id: &str) -> Option<Group> {
        self.groups().get(id).cloned()
    }

    /// Display name for an id: cache first, then a live vendor query, then
    /// the empty string.
    ///
    /// A successful live query is merged into the cache; a failed one is
    /// not, so the next call retries instead of pinning an empty name.
    pub async fn lookup_display_name(&self, id: &str) -> String {
        if let Some(identity) = self.lookup_identity(id) {
            if !identity.name.is_empty() {
                return identity.name;
            }
        }

        match self.source.query_display_name(id).await {
            Ok(Some(name)) if !name.is_empty() => {
                let mut contacts = self.contacts();
                contacts
                    .entry(id.to_string())
                    .or_insert_with(|| Identity::new(id, ""))
                    .name = name.clone();
                name
            }
            Ok(_) => String::new(),
            Err(e) => {
                debug!(id, error = %e, "live display-name query failed");
                String::new()
            }
        }
    }

    /// Display name of a group member: per-room nickname, then profile
    /// name, then whatever `lookup_display_name` can find.
    pub async fn lookup_member_name(&self, group_id: &str, member_id: &str) -> String {
        let cached = {
            let groups = self.groups();
            groups.get(group_id).and_then(|g| {
                g.members
                    .get(member_id)
                    .map(|m| m.effective_name().to_string())
            })
        };
        match cached {
            Some(name) if !name.is_empty() => name,
            _ => self.lookup_display_name(member_id).await,
        }
    }

    /// Resolve a display name back to a vendor id.
    ///
    /// With a group id, the roster is searched first (room nickname, then
    /// member id, then profile name), so a room-specific nickname shadows a
    /// global contact with the same name. Falls back to the global
    /// name-to-id index.
    #[must_use]
    pub fn resolve_id_by_name(&self, group_id: Option<&str>, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }

        if let Some(gid) = group_id {
            let groups = self.groups();
            if let Some(group) = groups.get(gid) {
                if let Some(member) = group
                    .members
                    .values()
                    .find(|m| m.room_name.as_deref() == Some(name))
                {
                    return Some(member.id.clone());
                }
                if group.members.contains_key(name) {
                    return Some(name.to_string());
                }
                if let Some(member) = group.members.values().find(|m| m.name == name) {
                    return Some(member.id.clone());
                }
            }
        }

        let contacts = self.contacts();
        contacts
            .values()
            .find(|c| c.name == name)
            .map(|c| c.id.clone())
    }

    /// Insert or update a group member, then persist the group map.
    ///
    /// Creates the group record on the fly when a membership event arrives
    /// before the first roster refresh.
    pub fn upsert_group_member(&self, group_id: &str, member_id: &str, name: &str) {
        {
            let mut groups = self.groups();
            let group = groups
                .entry(group_id.to_string())
                .or_insert_with(|| Group::new(group_id, ""));
            match group.members.get_mut(member_id) {
                Some(member) => {
                    if !name.is_empty() {
                        member.name = name.to_string();
                    }
                }
                None => {
                    group
                        .members
                        .insert(member_id.to_string(), GroupMember::new(member_id, name));
                }
            }
        }
        self.persist_groups();
        info!(group_id, member_id, name, "group member upserted");
    }

    /// Remove a group member. No-op (and no disk write) when absent.
    pub fn remove_group_member(&self, group_id: &str, member_id: &str) {
        let removed = {
            let mut groups = self.groups();
            groups
                .get_mut(group_id)
                .and_then(|g| g.members.remove(member_id))
                .is_some()
        };
        if removed {
            self.persist_groups();
            info!(group_id, member_id, "group member removed");
        }
    }

    /// Resynchronize contacts against the vendor. Merges per field; a
    /// vendor failure leaves the cache untouched.
    pub async fn refresh_contacts(&self) {
        let snapshot = match self.source.fetch_contacts().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "contact refresh failed, keeping cached data");
                return;
            }
        };

        let merged = {
            let mut contacts = self.contacts();
            for (id, identity) in snapshot {
                match contacts.get_mut(&id) {
                    Some(existing) => existing.merge_from(&identity),
                    None => {
                        contacts.insert(id, identity);
                    }
                }
            }
            contacts.clone()
        };
        if let Err(e) = self.store.save_contacts(&merged) {
            warn!(error = %e, "failed to persist contacts snapshot");
        }
        info!(contacts = merged.len(), "contacts refreshed");
    }

    /// Resynchronize groups against the vendor. Members missing from the
    /// new snapshot are preserved (vendor responses can be partial).
    pub async fn refresh_groups(&self) {
        let snapshot = match self.source.fetch_groups().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "group refresh failed, keeping cached data");
                return;
            }
        };

        {
            let mut groups = self.groups();
            for (id, group) in snapshot {
                match groups.get_mut(&id) {
                    Some(existing) => existing.merge_from(&group),
                    None => {
                        groups.insert(id, group);
                    }
                }
            }
        }
        self.persist_groups();
        let count = self.groups().len();
        info!(groups = count, "groups refreshed");
    }

    /// Flush both collections to disk (shutdown path).
    pub fn persist(&self) {
        let contacts = self.contacts().clone();
        if let Err(e) = self.store.save_contacts(&contacts) {
            warn!(error = %e, "failed to persist contacts snapshot");
        }
        self.persist_groups();
    }

    /// Spawn the per-channel background refresh task.
    ///
    /// Waits `initial_delay` (the vendor client needs a moment after login
    /// to finish its own sync), runs one deep refresh, then repeats on a
    /// fixed interval until the token is cancelled.
    pub fn spawn_refresh(self: &Arc<Self>, initial_delay: Duration, cancel: CancellationToken) {
        let directory = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(initial_delay) => {}
            }
            loop {
                directory.refresh_contacts().await;
                directory.refresh_groups().await;
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(REFRESH_INTERVAL) => {}
                }
            }
            debug!("directory refresh task stopped");
        });
    }

    fn contacts(&self) -> std::sync::MutexGuard<'_, HashMap<String, Identity>> {
        self.contacts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn groups(&self) -> std::sync::MutexGuard<'_, HashMap<String, Group>> {
        self.groups.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist_groups(&self) {
        let groups = self.groups().clone();
        if let Err(e) = self.store.save_groups(&groups) {
            warn!(error = %e, "failed to persist group snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::source::EmptySource;

    struct ScriptedSource {
        contacts: HashMap<String, Identity>,
        groups: HashMap<String, Group>,
        name_queries: AtomicUsize,
        name_answer: Option<String>,
    }

    impl ScriptedSource {
        fn empty() -> Self {
            Self {
                contacts: HashMap::new(),
                groups: HashMap::new(),
                name_queries: AtomicUsize::new(0),
                name_answer: None,
            }
        }
    }

    #[async_trait]
    impl DirectorySource for ScriptedSource {
        async fn fetch_contacts(&self) -> crate::Result<HashMap<String, Identity>> {
            Ok(self.contacts.clone())
        }

        async fn fetch_groups(&self) -> crate::Result<HashMap<String, Group>> {
            Ok(self.groups.clone())
        }

        async fn query_display_name(&self, _id: &str) -> crate::Result<Option<String>> {
            self.name_queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.name_answer.clone())
        }
    }

    fn directory_with(source: Arc<dyn DirectorySource>) -> (tempfile::TempDir, Arc<Directory>) {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let directory = Arc::new(Directory::load(source, store).unwrap());
        (dir, directory)
    }

    #[test]
    fn lookup_identity_unknown_is_none() {
        let (_tmp, directory) = directory_with(Arc::new(EmptySource));
        assert!(directory.lookup_identity("nobody").is_none());
    }

    #[tokio::test]
    async fn display_name_failure_is_not_cached_so_lookup_retries() {
        let source = Arc::new(ScriptedSource::empty());
        let (_tmp, directory) = directory_with(Arc::clone(&source) as Arc<dyn DirectorySource>);

        assert_eq!(directory.lookup_display_name("u1").await, "");
        assert_eq!(directory.lookup_display_name("u1").await, "");
        assert_eq!(
            source.name_queries.load(Ordering::SeqCst),
            2,
            "second lookup must hit the vendor again"
        );
    }

    #[tokio::test]
    async fn display_name_success_is_cached() {
        let mut source = ScriptedSource::empty();
        source.name_answer = Some("Alice".into());
        let source = Arc::new(source);
        let (_tmp, directory) = directory_with(Arc::clone(&source) as Arc<dyn DirectorySource>);

        assert_eq!(directory.lookup_display_name("u1").await, "Alice");
        assert_eq!(directory.lookup_display_name("u1").await, "Alice");
        assert_eq!(source.name_queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn room_nickname_shadows_global_contact() {
        let (_tmp, directory) = directory_with(Arc::new(EmptySource));

        // A global contact named "Ally" ...
        directory
            .contacts()
            .insert("global".into(), Identity::new("global", "Ally"));
        // ... and a room member whose room nickname is also "Ally".
        directory.upsert_group_member("r1", "member", "Alice");
        directory
            .groups()
            .get_mut("r1")
            .unwrap()
            .members
            .get_mut("member")
            .unwrap()
            .room_name = Some("Ally".into());

        assert_eq!(
            directory.resolve_id_by_name(Some("r1"), "Ally").as_deref(),
            Some("member")
        );
        // Without group context the global index wins.
        assert_eq!(
            directory.resolve_id_by_name(None, "Ally").as_deref(),
            Some("global")
        );
    }

    #[test]
    fn resolve_falls_back_to_global_index() {
        let (_tmp, directory) = directory_with(Arc::new(EmptySource));
        directory
            .contacts()
            .insert("u9".into(), Identity::new("u9", "Zo"));
        assert_eq!(
            directory.resolve_id_by_name(Some("r-missing"), "Zo").as_deref(),
            Some("u9")
        );
    }

    #[test]
    fn upsert_is_idempotent_and_persists() {
        let (tmp, directory) = directory_with(Arc::new(EmptySource));
        directory.upsert_group_member("r1", "a", "Alice");
        directory.upsert_group_member("r1", "a", "Alice");

        let group = directory.lookup_group("r1").unwrap();
        assert_eq!(group.members.len(), 1);

        // Write-through: a fresh load from the same directory sees it.
        let reloaded =
            Directory::load(Arc::new(EmptySource), DirectoryStore::new(tmp.path())).unwrap();
        assert_eq!(reloaded.lookup_group("r1").unwrap().members.len(), 1);
    }

    #[test]
    fn remove_absent_member_is_a_noop() {
        let (_tmp, directory) = directory_with(Arc::new(EmptySource));
        directory.remove_group_member("r1", "ghost");
        assert!(directory.lookup_group("r1").is_none());

        directory.upsert_group_member("r1", "a", "Alice");
        directory.remove_group_member("r1", "a");
        directory.remove_group_member("r1", "a");
        assert!(
            directory
                .lookup_group("r1")
                .unwrap()
                .members
                .is_empty()
        );
    }

    #[tokio::test]
    async fn refresh_merges_rather_than_replaces() {
        let mut source = ScriptedSource::empty();
        let mut fresh = Group::new("r1", "room");
        fresh
            .members
            .insert("b".into(), GroupMember::new("b", "Bob"));
        source.groups.insert("r1".into(), fresh);
        let (_tmp, directory) = directory_with(Arc::new(source));

        // Member seen before the refresh, absent from the vendor snapshot.
        directory.upsert_group_member("r1", "a", "Alice");

        directory.refresh_groups().await;
        let group = directory.lookup_group("r1").unwrap();
        assert_eq!(group.name, "room");
        assert!(group.members.contains_key("a"), "stale member preserved");
        assert!(group.members.contains_key("b"), "new member merged in");
    }
}
