//! GFF3 feature rows.
//!
//! The reader is lenient: comments, blank lines and rows that do not carry
//! the nine mandatory columns are reported as [`GffLine::Skipped`] rather
//! than errors. Only I/O and decoding problems end the stream with `Err`.

use std::collections::BTreeMap;
use std::fmt;

use camino::Utf8Path;
use serde::Serialize;

use crate::domain::{Phase, Strand};
use crate::error::CdmError;
use crate::fs_util::LineReader;

pub const FASTA_DIRECTIVE: &str = "##FASTA";
const MIN_COLUMNS: usize = 9;

/// Parsed `key=value;key=value` column. Keeps file order and repeated keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn parse(raw: &str) -> Self {
        let pairs = raw
            .split(';')
            .filter_map(|segment| segment.split_once('='))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self(pairs)
    }

    /// Value of the last occurrence of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GffRecord {
    pub seq_id: String,
    pub source: String,
    pub feature_type: String,
    pub start: i64,
    pub end: i64,
    pub score: Option<String>,
    pub strand: Option<Strand>,
    pub phase: Option<Phase>,
    pub attributes: Attributes,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Blank,
    Comment,
    TooFewColumns,
    InvalidCoordinate,
    FastaSection,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Blank => write!(f, "blank"),
            SkipReason::Comment => write!(f, "comment"),
            SkipReason::TooFewColumns => write!(f, "too_few_columns"),
            SkipReason::InvalidCoordinate => write!(f, "invalid_coordinate"),
            SkipReason::FastaSection => write!(f, "fasta_section"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GffLine {
    Record(GffRecord),
    Skipped { reason: SkipReason, line: usize },
}

impl GffLine {
    pub fn parse(text: &str, line: usize) -> Self {
        let skipped = |reason| GffLine::Skipped { reason, line };

        if text.trim().is_empty() {
            return skipped(SkipReason::Blank);
        }
        if text.starts_with(FASTA_DIRECTIVE) {
            return skipped(SkipReason::FastaSection);
        }
        if text.starts_with('#') {
            return skipped(SkipReason::Comment);
        }

        let columns = text.split('\t').collect::<Vec<_>>();
        if columns.len() < MIN_COLUMNS {
            return skipped(SkipReason::TooFewColumns);
        }

        let (Ok(start), Ok(end)) = (columns[3].parse::<i64>(), columns[4].parse::<i64>()) else {
            return skipped(SkipReason::InvalidCoordinate);
        };

        GffLine::Record(GffRecord {
            seq_id: columns[0].to_string(),
            source: columns[1].to_string(),
            feature_type: columns[2].to_string(),
            start,
            end,
            score: (columns[5] != ".").then(|| columns[5].to_string()),
            strand: Strand::parse(columns[6]),
            phase: Phase::parse(columns[7]),
            attributes: Attributes::parse(columns[8]),
            line,
        })
    }
}

/// Lazy GFF3 stream. Re-open the path to read it again from the start.
pub struct GffReader {
    reader: LineReader,
    finished: bool,
}

impl GffReader {
    pub fn open(path: &Utf8Path) -> Result<Self, CdmError> {
        Ok(Self {
            reader: LineReader::open(path)?,
            finished: false,
        })
    }
}

impl Iterator for GffReader {
    type Item = Result<GffLine, CdmError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let line = self.reader.line_number() + 1;
        let text = match self.reader.next_text() {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };
        let parsed = GffLine::parse(text, line);
        if matches!(
            parsed,
            GffLine::Skipped {
                reason: SkipReason::FastaSection,
                ..
            }
        ) {
            self.finished = true;
        }
        Some(Ok(parsed))
    }
}

/// Skipped-row counts by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SkipTally(BTreeMap<SkipReason, usize>);

impl SkipTally {
    pub fn record(&mut self, reason: SkipReason) {
        *self.0.entry(reason).or_default() += 1;
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        self.0.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_full_row() {
        let line = "ctg1\tprokka\tCDS\t10\t50\t.\t+\t0\tID=cds1;protein_id=prot1";
        let GffLine::Record(record) = GffLine::parse(line, 3) else {
            panic!("expected a record");
        };
        assert_eq!(record.seq_id, "ctg1");
        assert_eq!(record.source, "prokka");
        assert_eq!(record.feature_type, "CDS");
        assert_eq!((record.start, record.end), (10, 50));
        assert_eq!(record.score, None);
        assert_eq!(record.strand, Some(Strand::Forward));
        assert_eq!(record.phase.map(Phase::value), Some(0));
        assert_eq!(record.attributes.get("protein_id"), Some("prot1"));
        assert_eq!(record.line, 3);
    }

    #[test]
    fn tolerates_odd_score_strand_phase() {
        let line = "ctg1\tsrc\tgene\t5\t1\t0.93\t?\t7\tID=g1";
        let GffLine::Record(record) = GffLine::parse(line, 1) else {
            panic!("expected a record");
        };
        assert_eq!(record.score.as_deref(), Some("0.93"));
        assert_eq!(record.strand, None);
        assert_eq!(record.phase, None);
        // reversed coordinates pass through untouched
        assert_eq!((record.start, record.end), (5, 1));
    }

    #[test]
    fn skips_comments_short_rows_and_bad_coordinates() {
        assert_matches!(
            GffLine::parse("#comment", 1),
            GffLine::Skipped { reason: SkipReason::Comment, line: 1 }
        );
        assert_matches!(
            GffLine::parse("##gff-version 3", 1),
            GffLine::Skipped { reason: SkipReason::Comment, .. }
        );
        assert_matches!(
            GffLine::parse("a\tb\tc\td\te", 2),
            GffLine::Skipped { reason: SkipReason::TooFewColumns, .. }
        );
        assert_matches!(
            GffLine::parse("ctg\ts\tgene\tten\t50\t.\t+\t.\tID=g", 3),
            GffLine::Skipped { reason: SkipReason::InvalidCoordinate, .. }
        );
        assert_matches!(
            GffLine::parse("   ", 4),
            GffLine::Skipped { reason: SkipReason::Blank, .. }
        );
    }

    #[test]
    fn attribute_parsing_splits_on_first_equals() {
        let attrs = Attributes::parse("ID=g1;Note=a=b;flag;Name=foo;;Name=bar");
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs.get("Note"), Some("a=b"));
        assert_eq!(attrs.get("flag"), None);
        assert_eq!(attrs.get("Name"), Some("bar"));
        let keys = attrs.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(keys, vec!["ID", "Note", "Name", "Name"]);
    }

    #[test]
    fn empty_attribute_column_is_empty() {
        assert!(Attributes::parse("").is_empty());
        assert!(Attributes::parse(".").is_empty());
    }

    #[test]
    fn tally_counts_by_reason() {
        let mut tally = SkipTally::default();
        tally.record(SkipReason::Comment);
        tally.record(SkipReason::Comment);
        tally.record(SkipReason::TooFewColumns);
        assert_eq!(tally.count(SkipReason::Comment), 2);
        assert_eq!(tally.count(SkipReason::Blank), 0);
        assert_eq!(tally.total(), 3);
    }
}
