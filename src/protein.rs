use std::collections::HashSet;

use camino::Utf8Path;
use tracing::{debug, info};

use crate::domain::ProteinDigest;
use crate::error::CdmError;
use crate::fasta::FastaBlocks;

/// Protein ids declared by `protein_id=` on CDS rows of the GFF3 file.
#[derive(Debug, Clone, Default)]
pub struct ExpectedProteins {
    ids: HashSet<String>,
}

impl ExpectedProteins {
    pub fn register(&mut self, protein_id: &str) {
        if !protein_id.is_empty() {
            self.ids.insert(protein_id.to_string());
        }
    }

    pub fn contains(&self, protein_id: &str) -> bool {
        self.ids.contains(protein_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for ExpectedProteins {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut expected = ExpectedProteins::default();
        for id in iter {
            expected.register(id);
        }
        expected
    }
}

pub struct ProteinAssociator<'a> {
    expected: &'a ExpectedProteins,
}

impl<'a> ProteinAssociator<'a> {
    pub fn new(expected: &'a ExpectedProteins) -> Self {
        Self { expected }
    }

    /// Digests every protein record, failing on the first id no CDS declared.
    pub fn digest_proteins(&self, path: &Utf8Path) -> Result<Vec<ProteinDigest>, CdmError> {
        let mut digests = Vec::new();
        for block in FastaBlocks::open(path)? {
            let block = block?;
            if !self.expected.contains(&block.name) {
                return Err(CdmError::UnknownProtein {
                    protein_id: block.name,
                    path: path.to_owned(),
                });
            }
            debug!(protein_id = %block.name, protein_md5 = %block.digest, "digested protein");
            digests.push(ProteinDigest {
                protein_id: block.name,
                protein_md5: block.digest,
            });
        }
        info!(path = %path, proteins = digests.len(), "digested protein file");
        Ok(digests)
    }
}
