use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CdmError;

/// Lowercase hex MD5 fingerprint of some content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    pub(crate) fn from_md5(digest: md5::Digest) -> Self {
        Self(format!("{digest:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    /// Anything other than `+` or `-` is treated as unstranded.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            _ => None,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// CDS reading frame offset, always 0, 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phase(u8);

impl Phase {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "0" => Some(Phase(0)),
            "1" => Some(Phase(1)),
            "2" => Some(Phase(2)),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ManifestDelimiter {
    Tab,
    Space,
}

impl ManifestDelimiter {
    pub fn as_char(self) -> char {
        match self {
            ManifestDelimiter::Tab => '\t',
            ManifestDelimiter::Space => ' ',
        }
    }
}

impl FromStr for ManifestDelimiter {
    type Err = CdmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "tab" => Ok(ManifestDelimiter::Tab),
            "space" => Ok(ManifestDelimiter::Space),
            _ => Err(CdmError::InvalidInput(format!(
                "unknown manifest delimiter: {value}"
            ))),
        }
    }
}

/// The assembly, annotation and protein files describing one genome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTriple {
    pub name: String,
    pub assembly: Utf8PathBuf,
    pub gff: Utf8PathBuf,
    pub protein: Utf8PathBuf,
}

impl FileTriple {
    pub fn new(
        name: impl Into<String>,
        assembly: impl Into<Utf8PathBuf>,
        gff: impl Into<Utf8PathBuf>,
        protein: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            assembly: assembly.into(),
            gff: gff.into(),
            protein: protein.into(),
        }
    }

    pub fn default_name(position: usize) -> String {
        format!("triple-{position}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub feature_uid: Digest,
    pub seq_id: String,
    pub feature_type: String,
    pub feature_ontology: String,
    pub start: i64,
    pub end: i64,
    pub strand: Option<Strand>,
    pub score: Option<String>,
    pub phase: Option<Phase>,
    pub original_id: Option<String>,
    pub parent: Option<String>,
    pub assembly_md5: Digest,
    pub contig_md5: String,
    pub protein_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureAttribute {
    pub feature_id: Digest,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProteinDigest {
    pub protein_id: String,
    pub protein_md5: Digest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureProteinAssociation {
    pub feature_id: Digest,
    pub protein_id: String,
    pub protein_md5: Digest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContigRecord {
    pub id: Digest,
    pub contig_name: String,
    pub length: u64,
    pub gc_content: String,
    pub assembly_id: Digest,
    pub fasta_file: Utf8PathBuf,
}
