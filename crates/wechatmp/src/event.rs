use serde::Deserialize;

/// Message kinds the webhook delivers, as the platform names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MpEventKind {
    Text,
    Voice,
    Image,
    /// Anything else the platform may add.
    #[serde(other)]
    Other,
}

/// A webhook event, already parsed out of the platform's XML envelope by
/// the serving layer.
#[derive(Debug, Clone, Deserialize)]
pub struct MpEvent {
    pub id: String,
    pub kind: MpEventKind,
    /// Unix seconds.
    pub time: Option<i64>,
    /// The user's open id.
    pub source: String,
    /// The official account id.
    pub target: String,
    #[serde(default)]
    pub content: String,
    /// Server-side speech recognition result, when the account has it
    /// enabled.
    #[serde(default)]
    pub recognition: Option<String>,
    #[serde(default)]
    pub media_id: Option<String>,
    /// Media format hint ("amr", "speex", …).
    #[serde(default)]
    pub format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_platform_kind_names() {
        let event: MpEvent = serde_json::from_str(
            r#"{"id":"1","kind":"voice","time":1,"source":"u","target":"gh_1"}"#,
        )
        .unwrap();
        assert_eq!(event.kind, MpEventKind::Voice);
    }

    #[test]
    fn unknown_kind_maps_to_other() {
        let event: MpEvent = serde_json::from_str(
            r#"{"id":"1","kind":"shortvideo","time":1,"source":"u","target":"gh_1"}"#,
        )
        .unwrap();
        assert_eq!(event.kind, MpEventKind::Other);
    }
}
