//! Content digests that name an image after the inputs it is built from.

use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Number of hex characters of the digest used as an image tag.
pub const CONTENT_TAG_LEN: usize = 16;

const FIELD_SEP: u8 = 0x1f;
const RECORD_SEP: u8 = 0x1e;

/// Incremental SHA-256 over labelled build inputs.
///
/// Each input is framed as `label, 0x1f, bytes, 0x1e`; files also carry
/// their length, so neighbouring inputs cannot run into each other.
#[derive(Clone, Default)]
pub struct ContentDigest {
    hasher: Sha256,
}

impl ContentDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, label: &str, value: &[u8]) {
        self.hasher.update(label.as_bytes());
        self.hasher.update([FIELD_SEP]);
        self.hasher.update(value);
        self.hasher.update([RECORD_SEP]);
    }

    /// Adds the file at `path` under its context-relative name, streaming
    /// the contents.
    pub fn update_file(&mut self, relative: &Path, path: &Path) -> io::Result<()> {
        let mut file = std::fs::File::open(path)?;
        let len = file.metadata()?.len();

        self.update("path", relative.as_os_str().as_encoded_bytes());
        self.update("size", &len.to_le_bytes());
        self.hasher.update(b"contents");
        self.hasher.update([FIELD_SEP]);
        io::copy(&mut file, &mut self.hasher)?;
        self.hasher.update([RECORD_SEP]);
        Ok(())
    }

    /// Full lowercase hex digest.
    pub fn hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Digest truncated to [`CONTENT_TAG_LEN`] characters.
    pub fn tag(self) -> String {
        let mut tag = self.hex();
        tag.truncate(CONTENT_TAG_LEN);
        tag
    }
}
