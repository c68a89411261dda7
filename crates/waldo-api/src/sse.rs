/// Incremental decoder for server-sent-event bodies.
///
/// Buffers bytes until a complete blank-line-terminated frame is available
/// and returns the `data:` payloads in arrival order. Both LF and CRLF frame
/// delimiters are accepted; non-data lines (comments, event names) are
/// dropped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: String,
}

// Position and length of the earliest frame delimiter in the buffer.
fn frame_boundary(buf: &str) -> Option<(usize, usize)> {
    match (buf.find("\n\n"), buf.find("\r\n\r\n")) {
        (Some(lf), Some(crlf)) if lf < crlf => Some((lf, 2)),
        (_, Some(crlf)) => Some((crlf, 4)),
        (Some(lf), None) => Some((lf, 2)),
        (None, None) => None,
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.push_str(&String::from_utf8_lossy(bytes));

        let mut payloads = Vec::new();
        while let Some((end, delim)) = frame_boundary(&self.buf) {
            let frame: String = self.buf.drain(..end + delim).collect();
            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data:") {
                    payloads.push(data.trim_start().to_string());
                }
            }
        }
        payloads
    }

    pub fn has_partial(&self) -> bool {
        !self.buf.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_data_payloads_in_order() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}", "[DONE]"]);
        assert!(!decoder.has_partial());
    }

    #[test]
    fn buffers_frames_split_across_reads() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"a\"").is_empty());
        assert!(decoder.has_partial());
        let payloads = decoder.feed(b":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn accepts_crlf_frame_delimiters() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(payloads, vec!["one", "two"]);
        assert!(!decoder.has_partial());
    }

    #[test]
    fn ignores_comment_and_event_lines() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b": keep-alive\nevent: message\ndata: x\n\n");
        assert_eq!(payloads, vec!["x"]);
    }
}
