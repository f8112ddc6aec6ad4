//! Streaming FASTA block reader.
//!
//! A header line (`>name ...`) closes the block in progress and opens a new
//! one; every other line is fed verbatim into the open block's digest. Only
//! the digest accumulator and a few counters are kept per block, so memory
//! stays flat regardless of sequence length.

use std::mem;

use camino::Utf8Path;
use tracing::debug;

use crate::digest::DigestBuilder;
use crate::domain::Digest;
use crate::error::CdmError;
use crate::fs_util::LineReader;

pub const RECORD_MARKER: char = '>';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaBlock {
    pub name: String,
    pub digest: Digest,
    pub length: u64,
    pub gc_count: u64,
    pub header_line: usize,
}

impl FastaBlock {
    pub fn gc_fraction(&self) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        self.gc_count as f64 / self.length as f64
    }
}

struct OpenBlock {
    name: String,
    header_line: usize,
    builder: DigestBuilder,
    length: u64,
    gc_count: u64,
    sequence_lines: usize,
}

impl OpenBlock {
    fn new(name: String, header_line: usize) -> Self {
        Self {
            name,
            header_line,
            builder: DigestBuilder::new(),
            length: 0,
            gc_count: 0,
            sequence_lines: 0,
        }
    }

    fn push(&mut self, line: &str) {
        self.builder.update(line);
        self.length += line.len() as u64;
        self.gc_count += line
            .bytes()
            .filter(|base| matches!(base, b'G' | b'C' | b'g' | b'c'))
            .count() as u64;
        self.sequence_lines += 1;
    }

    fn close(self) -> Option<FastaBlock> {
        if self.sequence_lines == 0 {
            debug!(name = %self.name, line = self.header_line, "dropping FASTA record without sequence");
            return None;
        }
        Some(FastaBlock {
            name: self.name,
            digest: self.builder.finish(),
            length: self.length,
            gc_count: self.gc_count,
            header_line: self.header_line,
        })
    }
}

enum BlockState {
    AwaitingHeader,
    Accumulating(OpenBlock),
    Done,
}

pub struct FastaBlocks {
    reader: LineReader,
    state: BlockState,
}

impl FastaBlocks {
    pub fn open(path: &Utf8Path) -> Result<Self, CdmError> {
        Ok(Self {
            reader: LineReader::open(path)?,
            state: BlockState::AwaitingHeader,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        self.reader.path()
    }
}

/// First whitespace-delimited token of a header line, marker removed.
pub fn header_name(header: &str) -> &str {
    header
        .strip_prefix(RECORD_MARKER)
        .unwrap_or(header)
        .split_whitespace()
        .next()
        .unwrap_or("")
}

impl Iterator for FastaBlocks {
    type Item = Result<FastaBlock, CdmError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if matches!(self.state, BlockState::Done) {
                return None;
            }
            let line = match self.reader.next_text() {
                Ok(line) => line,
                Err(err) => {
                    self.state = BlockState::Done;
                    return Some(Err(err));
                }
            };

            let Some(text) = line else {
                if let BlockState::Accumulating(block) =
                    mem::replace(&mut self.state, BlockState::Done)
                {
                    return block.close().map(Ok);
                }
                return None;
            };

            if text.starts_with(RECORD_MARKER) {
                let name = header_name(text).to_string();
                let header_line = self.reader.line_number();
                let next = BlockState::Accumulating(OpenBlock::new(name, header_line));
                if let BlockState::Accumulating(previous) = mem::replace(&mut self.state, next) {
                    if let Some(block) = previous.close() {
                        return Some(Ok(block));
                    }
                }
            } else if let BlockState::Accumulating(block) = &mut self.state {
                block.push(text);
            }
        }
    }
}
