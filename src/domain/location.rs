//! Page location and the channel endpoint derived from it.
//!
//! A [`PageLocation`] is the parsed form of the game page URL. The
//! [`EndpointUrl`] built from it points at the live channel of the same
//! origin: `ws://` for plain pages, `wss://` for pages served over TLS.

use std::fmt;

use url::Url;

use super::SessionId;
use crate::error::ChannelError;

/// Transport scheme of the page the session was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageScheme {
    /// Plain `http`.
    Http,
    /// TLS `https`.
    Https,
}

impl PageScheme {
    /// Returns `true` for pages loaded over secure transport.
    #[must_use]
    pub const fn is_secure(self) -> bool {
        matches!(self, Self::Https)
    }
}

/// Parsed game page location: scheme, host and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    scheme: PageScheme,
    host: String,
    path: String,
}

impl PageLocation {
    /// Parses an absolute page URL such as `https://host:8080/games/abc/`.
    ///
    /// Query and fragment are discarded. A non-default port is kept as
    /// part of the host.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidPageUrl`] if the URL cannot be parsed
    /// or has no host, and [`ChannelError::UnsupportedScheme`] if the
    /// scheme is neither `http` nor `https`.
    pub fn parse(page_url: &str) -> Result<Self, ChannelError> {
        let url = Url::parse(page_url)
            .map_err(|e| ChannelError::InvalidPageUrl(format!("{page_url}: {e}")))?;

        let scheme = match url.scheme() {
            "http" => PageScheme::Http,
            "https" => PageScheme::Https,
            other => return Err(ChannelError::UnsupportedScheme(other.to_string())),
        };

        let Some(host) = url.host_str() else {
            return Err(ChannelError::InvalidPageUrl(format!("{page_url}: missing host")));
        };
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            scheme,
            host,
            path: url.path().to_string(),
        })
    }

    /// Returns the page scheme.
    #[must_use]
    pub const fn scheme(&self) -> PageScheme {
        self.scheme
    }

    /// Returns the host, including a non-default port.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the URL path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Address of the live channel for one session.
///
/// Renders as `{ws|wss}://{host}/games/{id}/ws`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUrl {
    secure: bool,
    host: String,
    session: SessionId,
}

impl EndpointUrl {
    /// Builds the endpoint for `session` on the origin of `location`.
    #[must_use]
    pub fn build(location: &PageLocation, session: &SessionId) -> Self {
        Self {
            secure: location.scheme().is_secure(),
            host: location.host().to_string(),
            session: session.clone(),
        }
    }

    /// Returns `"wss"` for secure pages and `"ws"` otherwise.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }

    /// Returns the session this endpoint belongs to.
    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}/games/{}/ws",
            self.scheme(),
            self.host,
            self.session
        )
    }
}
