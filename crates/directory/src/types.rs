use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A contact, official account or group as known to the vendor client.
///
/// Ids are vendor-scoped and unique within one channel. `extra` carries
/// whatever secondary profile fields the vendor exposes (country, province,
/// gender, corp id, …) without widening the struct per vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

impl Identity {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Merge a newer snapshot of the same identity into this one.
    ///
    /// New data wins per field; empty/absent fields in the snapshot never
    /// erase what is already known (vendor responses are often partial).
    pub fn merge_from(&mut self, newer: &Identity) {
        if !newer.name.is_empty() {
            self.name = newer.name.clone();
        }
        if newer.remark.is_some() {
            self.remark = newer.remark.clone();
        }
        if newer.alias.is_some() {
            self.alias = newer.alias.clone();
        }
        if newer.avatar.is_some() {
            self.avatar = newer.avatar.clone();
        }
        for (k, v) in &newer.extra {
            self.extra.insert(k.clone(), v.clone());
        }
    }
}

/// One member of a group chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: String,
    /// Global profile name.
    #[serde(default)]
    pub name: String,
    /// Per-room nickname. Shadows the profile name inside the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
}

impl GroupMember {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            room_name: None,
        }
    }

    /// The name this member goes by inside the room.
    #[must_use]
    pub fn effective_name(&self) -> &str {
        match self.room_name.as_deref() {
            Some(room) if !room.is_empty() => room,
            _ => &self.name,
        }
    }
}

/// A group chat and its member roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: HashMap<String, GroupMember>,
}

impl Group {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: HashMap::new(),
        }
    }

    /// Merge a newer snapshot of the same group.
    ///
    /// Members present in both are overwritten by the snapshot; members the
    /// snapshot does not mention are preserved. Vendor room queries paginate
    /// and occasionally return partial rosters, so a refresh must never be
    /// allowed to shrink the member map.
    pub fn merge_from(&mut self, newer: &Group) {
        if !newer.name.is_empty() {
            self.name = newer.name.clone();
        }
        for (id, member) in &newer.members {
            self.members.insert(id.clone(), member.clone());
        }
    }
}
