//! Redaction of credentials before they reach logs, errors or stored records.

use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

static SHARED: LazyLock<SecretScrubber> = LazyLock::new(SecretScrubber::new);

/// Scrub `message` with the process-wide scrubber.
pub fn scrub_secrets(message: &str) -> String {
    SHARED.scrub_message(message)
}

/// Scrubs API keys, bearer tokens and credential fields from free text.
#[derive(Clone)]
pub struct SecretScrubber {
    google_key_pattern: Regex,
    query_key_pattern: Regex,
    token_pattern: Regex,
    bearer_pattern: Regex,
    password_pattern: Regex,
}

impl SecretScrubber {
    pub fn new() -> Self {
        Self {
            google_key_pattern: Regex::new(r"AIza[0-9A-Za-z_\-]{35}").expect("google key pattern is valid"),
            query_key_pattern: Regex::new(r"([?&](?:key|api_key)=)[^&\s]+").expect("query key pattern is valid"),
            token_pattern: Regex::new(
                r#"["']?(?:api_key|apikey|api-key|x-goog-api-key|token|secret)["']?\s*[:=]\s*["']?([a-zA-Z0-9\-_\.]{16,})["']?"#,
            )
            .expect("token pattern is valid"),
            bearer_pattern: Regex::new(r"Bearer\s+[a-zA-Z0-9\-_\.]+").expect("bearer pattern is valid"),
            password_pattern: Regex::new(r#"["']?password["']?\s*[:=]\s*["']?([^"'\s,}]+)["']?"#)
                .expect("password pattern is valid"),
        }
    }

    pub fn scrub_message(&self, message: &str) -> String {
        let mut scrubbed = self
            .google_key_pattern
            .replace_all(message, "[API_KEY_REDACTED]")
            .into_owned();
        scrubbed = self
            .query_key_pattern
            .replace_all(&scrubbed, "${1}[REDACTED]")
            .into_owned();
        scrubbed = self
            .bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]")
            .into_owned();
        scrubbed = self
            .token_pattern
            .replace_all(&scrubbed, |caps: &Captures| {
                let full_match = &caps[0];
                if let Some(colon_pos) = full_match.find(':') {
                    format!("{}:[REDACTED]", &full_match[..colon_pos])
                } else if let Some(eq_pos) = full_match.find('=') {
                    format!("{}=[REDACTED]", &full_match[..eq_pos])
                } else {
                    "[REDACTED]".to_string()
                }
            })
            .into_owned();
        self.password_pattern
            .replace_all(&scrubbed, "password=[REDACTED]")
            .into_owned()
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
