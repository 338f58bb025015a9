use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decodes a cache or translation file. UTF-8 (with or without BOM) is taken as-is;
/// anything else goes through charset detection.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    let encoding = detect(bytes);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::warn!(
            "decoded {} bytes as {} with replacement characters",
            bytes.len(),
            encoding.name()
        );
    }
    text
}

fn detect(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);
    if guess == UTF_8 {
        // invalid UTF-8 already ruled out above; fall back to the usual Cyrillic code page
        return encoding_rs::WINDOWS_1251;
    }
    guess
}
