use anyhow::{Context, Result};
use waldo_types::ImageData;

/// Sniff the MIME subtype from magic bytes. Unknown formats fall back to
/// jpeg, which every vision backend accepts as a declared subtype.
pub fn mime_subtype(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpeg"
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "png"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else {
        "jpeg"
    }
}

/// Read referenced files into attachments, preserving reference order.
pub fn load_images(paths: &[String]) -> Result<Vec<ImageData>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("cannot read image file {path}"))?;
            let subtype = mime_subtype(&bytes);
            Ok(ImageData::new(bytes, subtype))
        })
        .collect()
}
