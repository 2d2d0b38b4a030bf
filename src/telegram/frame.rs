use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::FramingPolicy;

/// One complete telegram: the ordered raw lines between the framing
/// markers. The last line is always the `!` end marker; the
/// identification line itself is consumed by the reader and not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    pub lines: Vec<Vec<u8>>,
}

/// Assembles telegrams out of the P1 byte stream.
///
/// The meter pushes one telegram every fixed interval, so reads block
/// until the frame is complete. There is no partial-frame recovery; a
/// failed read ends the cycle with an I/O error.
pub struct FrameReader<R> {
    stream: R,
    policy: FramingPolicy,
    meter_id: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(stream: R, policy: FramingPolicy, meter_id: &str) -> Self {
        Self {
            stream,
            policy,
            meter_id: meter_id.as_bytes().to_vec(),
        }
    }

    pub async fn read_telegram(&mut self) -> io::Result<Telegram> {
        if self.policy == FramingPolicy::HeaderGated {
            // Discard everything up to the identification line.
            loop {
                let line = self.read_line().await?;
                if line == self.meter_id {
                    break;
                }
            }
        }

        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if self.policy == FramingPolicy::HeaderAgnostic && line.is_empty() {
                continue;
            }
            let is_end_marker = line.starts_with(b"!");
            lines.push(line);
            if is_end_marker {
                return Ok(Telegram { lines });
            }
        }
    }

    async fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let n = self.stream.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            // The P1 port never legitimately closes.
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "serial stream closed",
            ));
        }
        while buf.last().is_some_and(|b| b.is_ascii_whitespace()) {
            buf.pop();
        }
        let start = buf
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(buf.len());
        buf.drain(..start);
        Ok(buf)
    }
}
