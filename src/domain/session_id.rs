//! Session identifier derived from the game page path.
//!
//! [`SessionId`] is a newtype wrapper around the word-character token that
//! follows `/games/` in the page path. It selects which server-side game
//! the live channel attaches to.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::ChannelError;

/// Matches `/games/{id}/` where `{id}` is one or more ASCII word characters.
#[allow(clippy::expect_used)]
static GAME_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/games/([A-Za-z0-9_]+)/").expect("game path pattern is a valid literal")
});

/// Identifier of the game session a page belongs to.
///
/// Derived once from the page path and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Derives the session identifier from a URL path.
    ///
    /// The first `/games/{id}/` segment wins; anything before or after it
    /// is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::MalformedPath`] if the path has no
    /// `/games/{id}/` segment.
    pub fn derive(path: &str) -> Result<Self, ChannelError> {
        GAME_PATH
            .captures(path)
            .and_then(|caps| caps.get(1))
            .map(|id| Self(id.as_str().to_string()))
            .ok_or_else(|| ChannelError::MalformedPath {
                path: path.to_string(),
            })
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
