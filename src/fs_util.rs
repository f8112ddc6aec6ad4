use std::fs;
use std::io::{BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::MultiGzDecoder;

use crate::error::CdmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    pub fn detect(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Compression::Gzip,
            _ => Compression::None,
        }
    }
}

pub fn open_input(path: &Utf8Path) -> Result<Box<dyn BufRead + Send>, CdmError> {
    let file = fs::File::open(path.as_std_path()).map_err(|err| CdmError::io(path, err))?;
    match Compression::detect(path) {
        Compression::Gzip => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        Compression::None => Ok(Box::new(BufReader::new(file))),
    }
}

/// Line-at-a-time reader over a possibly compressed input file.
///
/// Only the current line is held in memory. The underlying handle is closed
/// when the reader is dropped, including on early error returns.
pub struct LineReader {
    reader: Box<dyn BufRead + Send>,
    path: Utf8PathBuf,
    compression: Compression,
    buffer: Vec<u8>,
    line_number: usize,
}

impl LineReader {
    pub fn open(path: &Utf8Path) -> Result<Self, CdmError> {
        Ok(Self {
            reader: open_input(path)?,
            path: path.to_owned(),
            compression: Compression::detect(path),
            buffer: Vec::new(),
            line_number: 0,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Next line exactly as decompressed, terminator included.
    pub fn next_raw(&mut self) -> Result<Option<&[u8]>, CdmError> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(Some(&self.buffer))
    }

    /// Next line without its `\n` / `\r\n` terminator.
    pub fn next_text(&mut self) -> Result<Option<&str>, CdmError> {
        if !self.fill()? {
            return Ok(None);
        }
        let mut line = self.buffer.as_slice();
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest;
        }
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
        std::str::from_utf8(line)
            .map(Some)
            .map_err(|_| CdmError::Decode {
                path: self.path.clone(),
                line: self.line_number,
            })
    }

    fn fill(&mut self) -> Result<bool, CdmError> {
        self.buffer.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buffer)
            .map_err(|err| match self.compression {
                Compression::Gzip => CdmError::Decompression {
                    path: self.path.clone(),
                    message: err.to_string(),
                },
                Compression::None => CdmError::io(&self.path, err),
            })?;
        if read == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;
    use flate2::Compression as GzLevel;
    use flate2::write::GzEncoder;

    use super::*;

    fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path).unwrap()
    }

    #[test]
    fn detects_gzip_by_extension() {
        assert_eq!(
            Compression::detect(Utf8Path::new("genome.fna.gz")),
            Compression::Gzip
        );
        assert_eq!(
            Compression::detect(Utf8Path::new("genome.fna.GZ")),
            Compression::Gzip
        );
        assert_eq!(
            Compression::detect(Utf8Path::new("genome.fna")),
            Compression::None
        );
    }

    #[test]
    fn strips_line_terminators_only() {
        let temp = tempfile::tempdir().unwrap();
        let path = utf8(temp.path().join("a.txt"));
        fs::write(&path, b" one \r\ntwo\nthree").unwrap();

        let mut reader = LineReader::open(&path).unwrap();
        assert_eq!(reader.next_text().unwrap(), Some(" one "));
        assert_eq!(reader.next_text().unwrap(), Some("two"));
        assert_eq!(reader.next_text().unwrap(), Some("three"));
        assert_eq!(reader.line_number(), 3);
        assert_eq!(reader.next_text().unwrap(), None);
    }

    #[test]
    fn reads_gzip_transparently() {
        let temp = tempfile::tempdir().unwrap();
        let path = utf8(temp.path().join("a.txt.gz"));
        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
        encoder.write_all(b">ctg1\nACGT\n").unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let mut reader = LineReader::open(&path).unwrap();
        assert_eq!(reader.next_raw().unwrap(), Some(&b">ctg1\n"[..]));
        assert_eq!(reader.next_text().unwrap(), Some("ACGT"));
    }

    #[test]
    fn corrupt_gzip_is_a_decompression_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = utf8(temp.path().join("bad.fna.gz"));
        fs::write(&path, b"definitely not gzip").unwrap();

        let mut reader = LineReader::open(&path).unwrap();
        let err = reader.next_raw().unwrap_err();
        assert_matches!(err, CdmError::Decompression { .. });
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = LineReader::open(Utf8Path::new("/nonexistent/input.gff")).err().unwrap();
        assert_matches!(err, CdmError::Io { .. });
    }

    #[test]
    fn invalid_utf8_reports_line() {
        let temp = tempfile::tempdir().unwrap();
        let path = utf8(temp.path().join("bad.gff"));
        fs::write(&path, b"ok\n\xff\xfe\n").unwrap();

        let mut reader = LineReader::open(&path).unwrap();
        reader.next_text().unwrap();
        let err = reader.next_text().unwrap_err();
        assert_matches!(err, CdmError::Decode { line: 2, .. });
    }
}
