const DONE_MARKER: &str = "[DONE]";
const LINE_DELIMITER: char = '\n';

/// A meaningful line of a provider event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SsePayload {
    /// The text after `data:`
    Data(String),
    /// `data: [DONE]`
    Done,
}

/// Reassembles provider lines across network reads.
///
/// Bytes are buffered until they form valid UTF-8, so a multi-byte character
/// split across two reads is never mangled.
#[derive(Default)]
pub(super) struct SseLineBuffer {
    buffer: String,
    utf8_buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub(super) fn push_bytes(&mut self, bytes: &[u8]) {
        self.utf8_buffer.extend_from_slice(bytes);
        loop {
            match std::str::from_utf8(&self.utf8_buffer) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.utf8_buffer.clear();
                    return;
                }
                Err(err) => {
                    self.consume_valid_prefix(err.valid_up_to());
                    // `None` means the sequence is cut off by the read boundary
                    let Some(invalid) = err.error_len() else {
                        return;
                    };
                    log::warn!("replacing {invalid} invalid UTF-8 byte(s) in provider stream");
                    self.buffer.push(char::REPLACEMENT_CHARACTER);
                    self.utf8_buffer.drain(..invalid);
                }
            }
        }
    }

    /// Returns the payloads of every complete line received so far.
    pub(super) fn drain_payloads(&mut self) -> Vec<SsePayload> {
        let mut payloads = Vec::new();
        while let Some(line) = self.next_line() {
            if let Some(payload) = parse_line(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub(super) fn finish(&mut self) -> Vec<SsePayload> {
        let mut payloads = self.drain_payloads();
        if !self.utf8_buffer.is_empty() {
            let rest = String::from_utf8_lossy(&self.utf8_buffer).into_owned();
            self.buffer.push_str(&rest);
            self.utf8_buffer.clear();
        }
        let rest = std::mem::take(&mut self.buffer);
        if let Some(payload) = parse_line(&rest) {
            payloads.push(payload);
        }
        payloads
    }

    fn consume_valid_prefix(&mut self, valid_up_to: usize) {
        if valid_up_to == 0 {
            return;
        }

        let valid = String::from_utf8_lossy(&self.utf8_buffer[..valid_up_to]);
        self.buffer.push_str(&valid);
        self.utf8_buffer.drain(..valid_up_to);
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.find(LINE_DELIMITER)?;
        let line = self.buffer[..pos].to_string();
        self.buffer.drain(..=pos);
        Some(line)
    }
}

fn parse_line(line: &str) -> Option<SsePayload> {
    let line = line.trim_end_matches('\r');
    // blank separators, `:` keep-alive comments and non-data fields carry nothing
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.trim() == DONE_MARKER {
        return Some(SsePayload::Done);
    }
    if data.trim().is_empty() {
        return None;
    }
    Some(SsePayload::Data(data.to_string()))
}
