//! Video identity for course lessons.
//!
//! Course videos are stored as the sharing URL an instructor pasted. The
//! player, the thumbnail and the embed all work off the 11-character video id
//! parsed out of that URL, so a URL we cannot parse is rejected when the
//! course is saved rather than failing later in the player.

use serde::{Deserialize, Serialize};
use url::Url;

/// Length of a video id.
pub const VIDEO_ID_LEN: usize = 11;

/// Hosts that serve watch pages and embeds.
const WATCH_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Short-link host.
const SHORT_HOST: &str = "youtu.be";

/// Path prefixes that are followed directly by the id.
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v"];

/// A validated 11-character video id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare id.
    #[must_use]
    pub fn parse(candidate: &str) -> Option<Self> {
        let valid = candidate.len() == VIDEO_ID_LEN
            && candidate
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(candidate.to_owned()))
    }

    /// Extract the id from a sharing URL.
    ///
    /// Accepts the standard watch URL (`/watch?v=`), the short-link form
    /// (`youtu.be/<id>`) and the embed form (`/embed/<id>`), plus the
    /// `/shorts/`, `/live/` and `/v/` variants. A missing scheme is tolerated.
    #[must_use]
    pub fn from_url(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let url = Url::parse(raw)
            .or_else(|_| Url::parse(&format!("https://{raw}")))
            .ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?.to_ascii_lowercase();
        let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

        if host == SHORT_HOST {
            return segments.next().and_then(Self::parse);
        }
        if !WATCH_HOSTS.contains(&host.as_str()) {
            return None;
        }

        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .and_then(|(_, value)| Self::parse(&value)),
            Some(prefix) if ID_PATH_PREFIXES.contains(&prefix) => {
                segments.next().and_then(Self::parse)
            }
            _ => None,
        }
    }

    /// The bare id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Privacy-enhanced embed URL used by the course player.
    #[must_use]
    pub fn embed_url(&self) -> String {
        format!(
            "https://www.youtube-nocookie.com/embed/{}?rel=0&modestbranding=1",
            self.0
        )
    }

    /// High-quality thumbnail URL.
    #[must_use]
    pub fn thumbnail_url(&self) -> String {
        format!("https://img.youtube.com/vi/{}/hqdefault.jpg", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    fn extract(url: &str) -> Option<String> {
        VideoId::from_url(url).map(|id| id.as_str().to_owned())
    }

    #[test]
    fn test_standard_watch_url() {
        assert_eq!(extract("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some(ID));
        assert_eq!(
            extract("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42s").as_deref(),
            Some(ID)
        );
        assert_eq!(extract("https://m.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some(ID));
    }

    #[test]
    fn test_short_link() {
        assert_eq!(extract("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some(ID));
        assert_eq!(extract("https://youtu.be/dQw4w9WgXcQ?si=abcdef").as_deref(), Some(ID));
        assert_eq!(extract("youtu.be/dQw4w9WgXcQ").as_deref(), Some(ID));
    }

    #[test]
    fn test_embed_and_shorts() {
        assert_eq!(extract("https://www.youtube.com/embed/dQw4w9WgXcQ").as_deref(), Some(ID));
        assert_eq!(
            extract("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ?start=3").as_deref(),
            Some(ID)
        );
        assert_eq!(extract("https://youtube.com/shorts/dQw4w9WgXcQ").as_deref(), Some(ID));
    }

    #[test]
    fn test_malformed_urls_yield_nothing() {
        assert_eq!(extract(""), None);
        assert_eq!(extract("not a url"), None);
        assert_eq!(extract("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract("https://www.youtube.com/watch?list=PL123"), None);
        assert_eq!(extract("https://vimeo.com/123456789"), None);
        assert_eq!(extract("https://youtu.be/"), None);
        assert_eq!(extract("ftp://youtu.be/dQw4w9WgXcQ"), None);
        assert_eq!(extract("https://www.youtube.com/embed/dQw4w9WgXc!"), None);
    }

    #[test]
    fn test_derived_urls() {
        let id = VideoId::parse(ID).unwrap_or_else(|| panic!("valid id rejected"));
        assert_eq!(id.thumbnail_url(), "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg");
        assert!(id.embed_url().starts_with("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ"));
    }
}
