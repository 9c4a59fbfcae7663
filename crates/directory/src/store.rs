use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use {
    serde::{Serialize, de::DeserializeOwned},
    tracing::debug,
};

use crate::{
    Result,
    types::{Group, GroupMember, Identity},
};

const CONTACTS_FILE: &str = "contacts.json";
const ROOMS_FILE: &str = "rooms.json";
const ROOM_MEMBERS_FILE: &str = "room_members.json";

/// On-disk snapshots of the directory, one pretty-printed UTF-8 JSON file
/// per logical collection. A missing file loads as an empty collection.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_contacts(&self) -> Result<HashMap<String, Identity>> {
        self.load_json(CONTACTS_FILE)
    }

    pub fn save_contacts(&self, contacts: &HashMap<String, Identity>) -> Result<()> {
        self.save_json(CONTACTS_FILE, contacts)
    }

    /// Load groups, falling back to the members-only file when `rooms.json`
    /// is absent (older snapshots only carried the roster view).
    pub fn load_groups(&self) -> Result<HashMap<String, Group>> {
        let groups: HashMap<String, Group> = self.load_json(ROOMS_FILE)?;
        if !groups.is_empty() {
            return Ok(groups);
        }

        let rosters: HashMap<String, HashMap<String, GroupMember>> =
            self.load_json(ROOM_MEMBERS_FILE)?;
        Ok(rosters
            .into_iter()
            .map(|(id, members)| {
                let mut group = Group::new(id.clone(), "");
                group.members = members;
                (id, group)
            })
            .collect())
    }

    /// Persist groups, both the full view and the denormalized roster view.
    pub fn save_groups(&self, groups: &HashMap<String, Group>) -> Result<()> {
        self.save_json(ROOMS_FILE, groups)?;
        let rosters: HashMap<&String, &HashMap<String, GroupMember>> =
            groups.iter().map(|(id, g)| (id, &g.members)).collect();
        self.save_json(ROOM_MEMBERS_FILE, &rosters)
    }

    fn load_json<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "snapshot missing, starting empty");
                return Ok(T::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let raw = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, raw)?;
        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }
}
