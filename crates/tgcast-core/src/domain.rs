use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{errors::Error, Result};

/// Broadcast context ("bot") identifier.
///
/// Doubles as a directory name in the file registry, so it is checked for
/// path safety before any store access.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<()> {
        let id = self.0.as_str();
        if id.trim().is_empty() {
            return Err(Error::Validation("channel id is empty".to_string()));
        }
        if id.trim() != id {
            return Err(Error::Validation(format!(
                "channel id has surrounding whitespace: {:?}",
                self.0
            )));
        }
        if id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(Error::Validation(format!(
                "channel id is not a valid name: {:?}",
                self.0
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque recipient identifier (Telegram chat id or `@username`).
///
/// Accepts JSON strings and integers so registries that stored numeric chat
/// ids keep loading.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecipientId(pub String);

impl RecipientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecipientId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(s) => Self(s),
            Raw::Int(n) => Self(n.to_string()),
        })
    }
}

/// Provider token authorising calls on behalf of a channel.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Provider-assigned message id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

/// A stable reference to a sent message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat: RecipientId,
    pub message_id: MessageId,
}

/// Duplicate-free recipient list in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecipientSet(Vec<RecipientId>);

impl<'de> Deserialize<'de> for RecipientSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let ids = Vec::<RecipientId>::deserialize(deserializer)?;
        Ok(ids.into_iter().collect())
    }
}

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &RecipientId) -> bool {
        self.0.contains(id)
    }

    /// Returns `false` when `id` was already a member.
    pub fn insert(&mut self, id: RecipientId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecipientId> {
        self.0.iter()
    }
}

impl FromIterator<RecipientId> for RecipientSet {
    fn from_iter<I: IntoIterator<Item = RecipientId>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RecipientSet {
    type Item = &'a RecipientId;
    type IntoIter = std::slice::Iter<'a, RecipientId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
