use serde::de::DeserializeOwned;

/// Incremental decoder for a body of concatenated JSON objects.
///
/// Transport reads rarely align with object boundaries, so bytes are buffered
/// and complete frames are carved out as they become available. A partial
/// frame stays buffered until the next feed; callers detect truncation by the
/// body closing while [`NdjsonDecoder::has_partial`] is true or before a
/// terminal frame was seen.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buf: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer one transport read and return every complete frame found.
    pub fn feed<T: DeserializeOwned>(&mut self, bytes: &[u8]) -> Result<Vec<T>, serde_json::Error> {
        self.buf.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut consumed = 0;
        {
            let mut objects = serde_json::Deserializer::from_slice(&self.buf).into_iter::<T>();
            loop {
                match objects.next() {
                    Some(Ok(frame)) => {
                        frames.push(frame);
                        consumed = objects.byte_offset();
                    }
                    // Mid-object end of buffer: wait for more bytes.
                    Some(Err(e)) if e.is_eof() => break,
                    Some(Err(e)) => return Err(e),
                    None => {
                        consumed = objects.byte_offset();
                        break;
                    }
                }
            }
        }
        self.buf.drain(..consumed);
        Ok(frames)
    }

    /// True when undecoded bytes remain buffered.
    pub fn has_partial(&self) -> bool {
        self.buf.iter().any(|b| !b.is_ascii_whitespace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waldo_types::GenerateResponse;

    #[test]
    fn decodes_whole_frames_per_read() {
        let mut decoder = NdjsonDecoder::new();
        let frames: Vec<GenerateResponse> = decoder
            .feed(br#"{"response":"Hel","done":false}{"response":"lo","done":true}"#)
            .unwrap();
        assert_eq!(frames.len(), 2);
        let text: String = frames.iter().map(|f| f.response.as_str()).collect();
        assert_eq!(text, "Hello");
        assert!(frames[1].done);
        assert!(!decoder.has_partial());
    }

    #[test]
    fn reassembles_frames_split_across_reads() {
        let body = br#"{"response":"Hel","done":false}
{"response":"lo","done":true}"#;
        // Feed one byte at a time; framing must never depend on read sizes.
        let mut decoder = NdjsonDecoder::new();
        let mut frames: Vec<GenerateResponse> = Vec::new();
        for byte in body.iter() {
            frames.extend(decoder.feed::<GenerateResponse>(&[*byte]).unwrap());
        }
        assert_eq!(frames.len(), 2);
        let text: String = frames.iter().map(|f| f.response.as_str()).collect();
        assert_eq!(text, "Hello");
        assert!(!decoder.has_partial());
    }

    #[test]
    fn partial_frame_stays_buffered() {
        let mut decoder = NdjsonDecoder::new();
        let frames: Vec<GenerateResponse> = decoder.feed(br#"{"response":"Hel"#).unwrap();
        assert!(frames.is_empty());
        assert!(decoder.has_partial());

        let frames: Vec<GenerateResponse> = decoder.feed(br#"l","done":false}"#).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].response, "Hell");
        assert!(!decoder.has_partial());
    }

    #[test]
    fn malformed_frame_is_an_error() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.feed::<GenerateResponse>(b"not json at all").is_err());
    }
}
