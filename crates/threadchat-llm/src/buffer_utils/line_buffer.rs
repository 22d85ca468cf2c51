use anyhow::{Context, Result};

/// Accumulates SSE body bytes and hands back complete lines.
///
/// Network chunks can end anywhere, including inside a line or inside a
/// multi-byte character, so bytes are held until a `\n` arrives. Lines come
/// back without their terminator (`\n` or `\r\n`).
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
    // bytes of `pending` already known to contain no newline
    scanned: usize,
}

impl SseLineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            scanned: 0,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete line, or `None` until more bytes arrive.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let offset = self.pending[self.scanned..].iter().position(|&b| b == b'\n');
        let Some(offset) = offset else {
            self.scanned = self.pending.len();
            return None;
        };

        let end = self.scanned + offset;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        self.scanned = 0;

        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        Some(String::from_utf8(line).context("SSE line is not valid UTF-8"))
    }

    /// Bytes waiting for a line terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
