//! User-facing message templates
//!
//! Every message has a `MessageKey`. A catalog must define all of them; a
//! file missing a key is rejected when it loads, not when the message is
//! first needed. Templates use `{name}` placeholders.

use crate::core_region::{ActionResponse, FailureReason};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Failed to read message file: {0}")]
    Read(String),

    #[error("Failed to parse message file: {0}")]
    Parse(String),

    #[error("Message '{0}' is missing")]
    Missing(&'static str),

    #[error("Message '{0}' is empty")]
    Empty(&'static str),

    #[error("Unknown message '{0}'")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    ClaimCreated,
    Invited,
    Accepted,
    Kicked,
    Left,
    Promoted,
    Demoted,
    Renamed,
    Deleted,
    AreaProtected,
    InfoHeader,
    InfoOwner,
    InfoOfficers,
    InfoMembers,
    InfoPending,
    InfoVolume,
    FailedAccess,
    FailedLength,
    FailedExists,
    FailedNotFound,
    FailedSelfTarget,
}

impl MessageKey {
    pub const ALL: [MessageKey; 21] = [
        MessageKey::ClaimCreated,
        MessageKey::Invited,
        MessageKey::Accepted,
        MessageKey::Kicked,
        MessageKey::Left,
        MessageKey::Promoted,
        MessageKey::Demoted,
        MessageKey::Renamed,
        MessageKey::Deleted,
        MessageKey::AreaProtected,
        MessageKey::InfoHeader,
        MessageKey::InfoOwner,
        MessageKey::InfoOfficers,
        MessageKey::InfoMembers,
        MessageKey::InfoPending,
        MessageKey::InfoVolume,
        MessageKey::FailedAccess,
        MessageKey::FailedLength,
        MessageKey::FailedExists,
        MessageKey::FailedNotFound,
        MessageKey::FailedSelfTarget,
    ];

    /// Key used in message files
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::ClaimCreated => "claim_created",
            MessageKey::Invited => "invited",
            MessageKey::Accepted => "accepted",
            MessageKey::Kicked => "kicked",
            MessageKey::Left => "left",
            MessageKey::Promoted => "promoted",
            MessageKey::Demoted => "demoted",
            MessageKey::Renamed => "renamed",
            MessageKey::Deleted => "deleted",
            MessageKey::AreaProtected => "area_protected",
            MessageKey::InfoHeader => "info_header",
            MessageKey::InfoOwner => "info_owner",
            MessageKey::InfoOfficers => "info_officers",
            MessageKey::InfoMembers => "info_members",
            MessageKey::InfoPending => "info_pending",
            MessageKey::InfoVolume => "info_volume",
            MessageKey::FailedAccess => "failed_access",
            MessageKey::FailedLength => "failed_length",
            MessageKey::FailedExists => "failed_exists",
            MessageKey::FailedNotFound => "failed_not_found",
            MessageKey::FailedSelfTarget => "failed_self_target",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }

    /// Message for a refused operation; `None` when it succeeded
    pub fn for_response(response: &ActionResponse) -> Option<Self> {
        response.reason().map(|reason| match reason {
            FailureReason::Access => MessageKey::FailedAccess,
            FailureReason::Length => MessageKey::FailedLength,
            FailureReason::Exists => MessageKey::FailedExists,
            FailureReason::NotFound => MessageKey::FailedNotFound,
            FailureReason::SelfTarget => MessageKey::FailedSelfTarget,
        })
    }

    fn english(&self) -> &'static str {
        match self {
            MessageKey::ClaimCreated => "Claimed region {region}.",
            MessageKey::Invited => "Invited {player} to {region}.",
            MessageKey::Accepted => "You joined {region}.",
            MessageKey::Kicked => "Removed {player} from {region}.",
            MessageKey::Left => "You left {region}.",
            MessageKey::Promoted => "{player} is now an officer of {region}.",
            MessageKey::Demoted => "{player} is now a member of {region}.",
            MessageKey::Renamed => "Region renamed to {name}.",
            MessageKey::Deleted => "Region {region} deleted.",
            MessageKey::AreaProtected => "This area is protected by {region}.",
            MessageKey::InfoHeader => "Region {name} ({id})",
            MessageKey::InfoOwner => "Owner: {owner}",
            MessageKey::InfoOfficers => "Officers: {officers}",
            MessageKey::InfoMembers => "Members: {members}",
            MessageKey::InfoPending => "Invited: {pending}",
            MessageKey::InfoVolume => "Anchor {x} {y} {z} in {world}, radius {radius}",
            MessageKey::FailedAccess => "You do not have permission to do that.",
            MessageKey::FailedLength => "Names must be between 1 and 36 characters.",
            MessageKey::FailedExists => "That already exists.",
            MessageKey::FailedNotFound => "Nothing matched that request.",
            MessageKey::FailedSelfTarget => "You cannot do that to yourself.",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete set of message templates
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    templates: HashMap<MessageKey, String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::english()
    }
}

impl MessageCatalog {
    /// Built-in English templates
    pub fn english() -> Self {
        let templates = MessageKey::ALL
            .iter()
            .map(|key| (*key, key.english().to_string()))
            .collect();
        MessageCatalog { templates }
    }

    /// Parse a flat TOML table of `key = "template"` entries
    pub fn from_toml_str(contents: &str) -> Result<Self, MessageError> {
        let raw: HashMap<String, String> =
            toml::from_str(contents).map_err(|e| MessageError::Parse(e.to_string()))?;

        let mut templates = HashMap::with_capacity(raw.len());
        for (name, template) in raw {
            let key = MessageKey::from_key(&name).ok_or(MessageError::Unknown(name))?;
            if template.trim().is_empty() {
                return Err(MessageError::Empty(key.as_str()));
            }
            templates.insert(key, template);
        }

        if let Some(missing) = MessageKey::ALL.iter().find(|k| !templates.contains_key(k)) {
            return Err(MessageError::Missing(missing.as_str()));
        }

        Ok(MessageCatalog { templates })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MessageError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| MessageError::Read(e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    pub fn template(&self, key: MessageKey) -> &str {
        self.templates
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.english())
    }

    /// Fill `{name}` placeholders; unknown placeholders are left as written
    pub fn render(&self, key: MessageKey, args: &[(&str, &str)]) -> String {
        let template = self.template(key);
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    match args.iter().find(|(k, _)| *k == name) {
                        Some((_, value)) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Render `success` for a successful response, the failure message otherwise
    pub fn respond(&self, response: &ActionResponse, success: MessageKey, args: &[(&str, &str)]) -> String {
        let key = MessageKey::for_response(response).unwrap_or(success);
        self.render(key, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_file() -> String {
        MessageKey::ALL
            .iter()
            .map(|k| format!("{} = \"[{}]\"\n", k.as_str(), k.as_str()))
            .collect()
    }

    #[test]
    fn test_english_has_every_key() {
        let catalog = MessageCatalog::english();
        for key in MessageKey::ALL {
            assert!(!catalog.template(key).is_empty());
        }
    }

    #[test]
    fn test_key_names_round_trip() {
        for key in MessageKey::ALL {
            assert_eq!(MessageKey::from_key(key.as_str()), Some(key));
        }
        assert_eq!(MessageKey::from_key("nope"), None);
    }

    #[test]
    fn test_render_placeholders() {
        let catalog = MessageCatalog::english();
        assert_eq!(
            catalog.render(MessageKey::Invited, &[("player", "bob"), ("region", "home")]),
            "Invited bob to home."
        );
        // Missing values keep the placeholder.
        assert_eq!(catalog.render(MessageKey::Accepted, &[]), "You joined {region}.");
    }

    #[test]
    fn test_respond_maps_failures() {
        let catalog = MessageCatalog::english();
        let failed = ActionResponse::failed(FailureReason::Length);
        assert_eq!(
            catalog.respond(&failed, MessageKey::Renamed, &[("name", "x")]),
            catalog.template(MessageKey::FailedLength)
        );
        assert_eq!(
            catalog.respond(&ActionResponse::Successful, MessageKey::Renamed, &[("name", "home")]),
            "Region renamed to home."
        );
        assert_eq!(MessageKey::for_response(&ActionResponse::Successful), None);
    }

    #[test]
    fn test_load_complete_file() {
        let catalog = MessageCatalog::from_toml_str(&full_file()).unwrap();
        assert_eq!(catalog.render(MessageKey::Left, &[]), "[left]");
    }

    #[test]
    fn test_missing_key_rejected_at_load() {
        let partial: String = full_file()
            .lines()
            .filter(|line| !line.starts_with("kicked "))
            .map(|line| format!("{}\n", line))
            .collect();
        assert!(matches!(
            MessageCatalog::from_toml_str(&partial),
            Err(MessageError::Missing("kicked"))
        ));
    }

    #[test]
    fn test_unknown_and_empty_keys_rejected() {
        let unknown = format!("{}bogus = \"x\"\n", full_file());
        assert!(matches!(MessageCatalog::from_toml_str(&unknown), Err(MessageError::Unknown(_))));

        let empty = full_file().replace("\"[left]\"", "\"  \"");
        assert!(matches!(MessageCatalog::from_toml_str(&empty), Err(MessageError::Empty("left"))));
    }
}
