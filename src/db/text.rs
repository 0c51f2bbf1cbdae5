//! Postgres TEXT and JSONB values cannot hold U+0000.

use std::borrow::Cow;

pub const NUL: char = '\0';

/// Replace NUL characters with U+FFFD, the substitute already used for
/// invalid UTF-8 in fetched bodies.
pub fn scrub_nul(text: &str) -> Cow<'_, str> {
    if text.contains(NUL) {
        Cow::Owned(text.replace(NUL, "\u{FFFD}"))
    } else {
        Cow::Borrowed(text)
    }
}
