use std::collections::HashMap;

use camino::Utf8Path;
use tracing::{info, warn};

use crate::domain::{ContigRecord, Digest};
use crate::error::CdmError;
use crate::fasta::FastaBlocks;

/// Contig name to content digest, plus per-block statistics in file order.
#[derive(Debug, Clone, Default)]
pub struct SequenceIndex {
    digests: HashMap<String, Digest>,
    blocks: Vec<IndexedBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedBlock {
    pub name: String,
    pub digest: Digest,
    pub length: u64,
    pub gc_fraction: f64,
}

impl SequenceIndex {
    pub fn get(&self, name: &str) -> Option<&Digest> {
        self.digests.get(name)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn blocks(&self) -> &[IndexedBlock] {
        &self.blocks
    }

    /// Entries sorted by contig name.
    pub fn sorted_entries(&self) -> Vec<(&str, &Digest)> {
        let mut entries = self
            .digests
            .iter()
            .map(|(name, digest)| (name.as_str(), digest))
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn contig_records(&self, assembly_digest: &Digest, fasta_file: &Utf8Path) -> Vec<ContigRecord> {
        self.blocks
            .iter()
            .map(|block| ContigRecord {
                id: block.digest.clone(),
                contig_name: block.name.clone(),
                length: block.length,
                gc_content: format!("{:.4}", block.gc_fraction),
                assembly_id: assembly_digest.clone(),
                fasta_file: fasta_file.to_owned(),
            })
            .collect()
    }
}

pub struct SequenceIndexer;

impl SequenceIndexer {
    pub fn index(path: &Utf8Path) -> Result<SequenceIndex, CdmError> {
        let mut index = SequenceIndex::default();
        for block in FastaBlocks::open(path)? {
            let block = block?;
            if index.digests.contains_key(&block.name) {
                warn!(contig = %block.name, path = %path, "duplicate sequence name, keeping the last record");
            }
            index.blocks.push(IndexedBlock {
                name: block.name.clone(),
                digest: block.digest.clone(),
                length: block.length,
                gc_fraction: block.gc_fraction(),
            });
            index.digests.insert(block.name, block.digest);
        }
        info!(path = %path, sequences = index.len(), "indexed assembly");
        Ok(index)
    }
}
