use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::borrow::Cow;

/// Feeds that are not UTF-8 are almost always legacy Windows exports.
static FALLBACK: &Encoding = WINDOWS_1252;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub source: &'static Encoding,
    /// Some input was replaced with U+FFFD.
    pub lossy: bool,
}

impl Normalized {
    /// The stored text differs from the raw bytes.
    pub fn repaired(&self) -> bool {
        self.lossy || self.source != UTF_8
    }
}

/// Decodes a raw field into UTF-8. Never fails: undecodable input is
/// replaced rather than rejected.
pub fn normalize(raw: &[u8]) -> Normalized {
    if let Some((encoding, bom_len)) = Encoding::for_bom(raw) {
        let (text, lossy) = encoding.decode_without_bom_handling(&raw[bom_len..]);
        return Normalized {
            text: text.into_owned(),
            source: encoding,
            lossy,
        };
    }
    match std::str::from_utf8(raw) {
        Ok(text) => Normalized {
            text: text.to_string(),
            source: UTF_8,
            lossy: false,
        },
        Err(_) => {
            let (text, lossy) = FALLBACK.decode_without_bom_handling(raw);
            Normalized {
                text: text.into_owned(),
                source: FALLBACK,
                lossy,
            }
        }
    }
}

/// Same as [`normalize`] for callers that only need the text.
pub fn normalize_lossy(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(text) if Encoding::for_bom(raw).is_none() => Cow::Borrowed(text),
        _ => Cow::Owned(normalize(raw).text),
    }
}
