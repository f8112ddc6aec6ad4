use camino::Utf8Path;
use tracing::debug;

use crate::domain::Digest;
use crate::error::CdmError;
use crate::fs_util::LineReader;

/// Rolling MD5 accumulator.
pub struct DigestBuilder {
    context: md5::Context,
}

impl DigestBuilder {
    pub fn new() -> Self {
        Self {
            context: md5::Context::new(),
        }
    }

    pub fn update(&mut self, bytes: impl AsRef<[u8]>) {
        self.context.consume(bytes);
    }

    pub fn finish(self) -> Digest {
        Digest::from_md5(self.context.compute())
    }
}

impl Default for DigestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ContentSource<'a> {
    File(&'a Utf8Path),
    Text(&'a str),
}

pub struct ContentHasher;

impl ContentHasher {
    pub fn digest(source: ContentSource<'_>) -> Result<Digest, CdmError> {
        match source {
            ContentSource::File(path) => Self::digest_file(path),
            ContentSource::Text(text) => Ok(Self::digest_str(text)),
        }
    }

    /// Digest of the decompressed content of `path`, fed line by line.
    pub fn digest_file(path: &Utf8Path) -> Result<Digest, CdmError> {
        let mut reader = LineReader::open(path)?;
        let mut builder = DigestBuilder::new();
        while let Some(line) = reader.next_raw()? {
            builder.update(line);
        }
        let digest = builder.finish();
        debug!(path = %path, lines = reader.line_number(), %digest, "hashed file");
        Ok(digest)
    }

    pub fn digest_str(text: &str) -> Digest {
        Digest::from_md5(md5::compute(text.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_md5_values() {
        assert_eq!(
            ContentHasher::digest_str("").as_str(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            ContentHasher::digest_str("abc").as_str(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn builder_matches_one_shot_digest() {
        let mut builder = DigestBuilder::new();
        builder.update("AC");
        builder.update("GT");
        assert_eq!(builder.finish(), ContentHasher::digest_str("ACGT"));
    }

    #[test]
    fn text_source_does_not_touch_filesystem() {
        let digest = ContentHasher::digest(ContentSource::Text("MKT")).unwrap();
        assert_eq!(digest, ContentHasher::digest_str("MKT"));
    }
}
