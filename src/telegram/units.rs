use super::TelegramError;

/// Drops the `*<unit>` suffix of a value token. The unit marker is
/// cosmetic; the numeric payload always precedes the `*`.
pub fn strip_unit(token: &str) -> &str {
    token.split('*').next().unwrap_or(token)
}

pub fn to_f64(token: &str) -> Result<f64, TelegramError> {
    strip_unit(token)
        .parse()
        .map_err(|_| TelegramError::Parse(format!("not a numeric value: {token:?}")))
}

pub fn to_i64(token: &str) -> Result<i64, TelegramError> {
    strip_unit(token)
        .parse()
        .map_err(|_| TelegramError::Parse(format!("not an integer value: {token:?}")))
}

pub fn kilowatt(x: f64) -> f64 {
    x
}

pub fn watt(x: f64) -> f64 {
    kilowatt(x) * 1000.0
}

pub fn volt(x: f64) -> f64 {
    x
}

pub fn cubic_meters(x: f64) -> f64 {
    x
}
