//! DSMR P1 telegram parsing: framing, line tokenization, unit
//! normalization and the OBIS field dispatcher.

pub mod dispatch;
pub mod frame;
pub mod tokenize;
pub mod units;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("serial stream read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("telegram line is not valid ASCII text: {0:?}")]
    Decode(Vec<u8>),
    #[error("malformed data line: {0}")]
    Parse(String),
    #[error(transparent)]
    Sink(#[from] crate::sink::SinkError),
}
