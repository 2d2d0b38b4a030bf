use lazy_static::lazy_static;
use regex::Regex;

use super::TelegramError;

/// One data line split into its OBIS code and value groups.
///
/// Example formats:
///   1-0:1.8.1(000123.456*kWh)
///   0-1:24.2.1(210101120000W)(00012.345*m3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedLine {
    pub code: String,
    pub group0: String,
    pub group1: Option<String>,
}

lazy_static! {
    static ref LINE_EXPR: Regex = Regex::new(r"^(.+?)\((.*?)\)(?:\((.*?)\))?$").unwrap();
}

/// Splits a raw telegram line. Lines that do not have the
/// `code(value)` shape (blank lines, the checksum line) are not data
/// lines and yield `None` rather than an error.
pub fn tokenize(raw: &[u8]) -> Result<Option<TokenizedLine>, TelegramError> {
    let line = std::str::from_utf8(raw).map_err(|_| TelegramError::Decode(raw.to_vec()))?;
    if !line.is_ascii() {
        return Err(TelegramError::Decode(raw.to_vec()));
    }

    let mut matches = LINE_EXPR.captures_iter(line);
    let Some(caps) = matches.next() else {
        return Ok(None);
    };
    if matches.next().is_some() {
        // The pattern is anchored, so a second structural match means
        // the line cannot be attributed to a single reading.
        return Err(TelegramError::Parse(format!("ambiguous data line: {line}")));
    }

    Ok(Some(TokenizedLine {
        code: caps[1].to_string(),
        group0: caps[2].to_string(),
        group1: caps.get(3).map(|g| g.as_str().to_string()),
    }))
}
