//! Splits the raw TCP byte stream into CR-terminated response lines.

/// Line delimiter used by the device in both directions
pub const DELIMITER: u8 = b'\r';

/// Accumulates socket reads and yields complete lines.
///
/// The remainder after the last delimiter is held until the next chunk
/// arrives. No length limit is applied to a pending line.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes, in arrival order.
    ///
    /// Returned lines exclude the delimiter and may be empty.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut offset = 0;
        while let Some(pos) = self.buffer[offset..].iter().position(|&b| b == DELIMITER) {
            let end = offset + pos;
            lines.push(String::from_utf8_lossy(&self.buffer[offset..end]).into_owned());
            offset = end + 1;
        }
        self.buffer.drain(..offset);
        lines
    }

    /// Bytes received after the last delimiter
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop any partial line
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
