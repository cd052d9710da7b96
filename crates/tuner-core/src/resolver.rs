//! Stream-URL resolution
//!
//! Turns a possibly-indirect URL (directory entry, playlist document) into
//! the URL handed to the player.  Best effort by contract: every probe
//! failure degrades to "use the original URL", so callers never see an
//! error and a retry is always safe.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::ProbeError;
use crate::probe::{Probe, BODY_SAMPLE_MAX_LINES};

/// Extensions trusted to be directly playable without inspection.
/// `.m3u`/`.pls` are included deliberately: the player understands those
/// container formats itself, so no further unwrapping is needed.
const STREAM_EXTENSIONS: &[&str] = &[".mp3", ".aac", ".m3u8", ".pls", ".m3u"];

pub fn has_stream_extension(url: &str) -> bool {
    STREAM_EXTENSIONS.iter().any(|ext| url.ends_with(ext))
}

pub fn content_type_is_audio(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("audio")
}

/// A playlist line that answers the scan: non-blank, not a `#` comment,
/// and an absolute http(s) URL.
pub fn playlist_line_hit(line: &str) -> bool {
    !line.is_empty()
        && !line.starts_with('#')
        && (line.starts_with("http://") || line.starts_with("https://"))
}

/// Resolve `url` to a playable stream URL, or return it unchanged.
///
/// Decision procedure, each step short-circuiting on a confident answer:
/// 1. known stream/playlist extension → the URL itself, no network I/O;
/// 2. probed `content-type` containing "audio" → the URL itself;
/// 3. first absolute http(s) line within a 64-line body sample → that line;
/// 4. anything else, including any probe error → the URL itself.
pub async fn resolve(client: &Client, url: &str, timeout: Duration) -> String {
    if has_stream_extension(url) {
        return url.to_string();
    }
    match inspect(client, url, timeout).await {
        Ok(Some(stream_url)) => {
            debug!(%url, %stream_url, "resolved playlist entry");
            stream_url
        }
        Ok(None) => url.to_string(),
        Err(err) => {
            let kind = match err {
                ProbeError::Timeout => "timeout",
                ProbeError::Unreachable(_) => "unreachable",
                ProbeError::Malformed(_) => "malformed",
            };
            debug!(%url, kind, error = %err, "probe failed, keeping original url");
            url.to_string()
        }
    }
}

/// `Ok(None)` means "no better answer than the original URL".
async fn inspect(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<Option<String>, ProbeError> {
    let probe = Probe::fetch(client, url, timeout).await?;
    if probe.content_type().is_some_and(content_type_is_audio) {
        return Ok(None);
    }
    probe
        .first_matching_line(BODY_SAMPLE_MAX_LINES, playlist_line_hit)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- extension heuristic ---

    #[test]
    fn known_extensions_are_streams() {
        for url in [
            "http://radio.example/live.mp3",
            "http://radio.example/live.aac",
            "http://radio.example/master.m3u8",
            "http://radio.example/listen.pls",
            "http://radio.example/listen.m3u",
        ] {
            assert!(has_stream_extension(url), "{url}");
        }
    }

    #[test]
    fn query_string_defeats_extension_heuristic() {
        // only a literal suffix counts; the probe handles the rest
        assert!(!has_stream_extension("http://radio.example/live.mp3?sid=1"));
    }

    #[test]
    fn unrelated_extensions_are_not_streams() {
        assert!(!has_stream_extension("http://radio.example/index.html"));
        assert!(!has_stream_extension("http://radio.example/live"));
    }

    // --- content-type heuristic ---

    #[test]
    fn audio_content_types_match() {
        assert!(content_type_is_audio("audio/mpeg"));
        assert!(content_type_is_audio("Audio/AAC"));
        assert!(content_type_is_audio("application/x-audio; charset=x"));
    }

    #[test]
    fn non_audio_content_types_do_not_match() {
        assert!(!content_type_is_audio("text/html"));
        assert!(!content_type_is_audio("application/ogg"));
    }

    // --- playlist line scan ---

    #[test]
    fn absolute_urls_hit() {
        assert!(playlist_line_hit("http://stream.example/a"));
        assert!(playlist_line_hit("https://stream.example/a"));
    }

    #[test]
    fn comments_blanks_and_relative_lines_miss() {
        assert!(!playlist_line_hit(""));
        assert!(!playlist_line_hit("#EXTM3U"));
        assert!(!playlist_line_hit("#http://not-a-hit.example"));
        assert!(!playlist_line_hit("relative/path.mp3"));
        // PLS key=value lines do not start with http(s) and are skipped
        assert!(!playlist_line_hit("File1=http://stream.example/a"));
    }
}
