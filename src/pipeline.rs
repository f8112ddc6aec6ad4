//! Correlation of one (assembly, GFF3, protein) triple.
//!
//! Stages run strictly in order: the assembly is hashed and indexed, the
//! GFF3 stream is turned into features and attributes while collecting the
//! CDS protein ids, the protein FASTA is validated against those ids, and
//! finally features are joined to protein digests. The protein stage depends
//! on the ids gathered from the GFF3 file, so the order is not negotiable.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::digest::ContentHasher;
use crate::domain::{
    ContigRecord, Digest, Feature, FeatureAttribute, FeatureProteinAssociation, FileTriple,
    ProteinDigest,
};
use crate::error::CdmError;
use crate::gff::{GffLine, GffReader, GffRecord, SkipTally};
use crate::identity::FeatureIdentityAssigner;
use crate::ontology::ontology_code;
use crate::protein::{ExpectedProteins, ProteinAssociator};
use crate::sequence_index::{SequenceIndex, SequenceIndexer};

/// Attribute keys stored in dedicated feature columns instead of attribute rows.
pub const FOLDED_ATTRIBUTES: [&str; 3] = ["ID", "Parent", "protein_id"];

const CDS_TYPE: &str = "CDS";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationTables {
    pub features: Vec<Feature>,
    pub attributes: Vec<FeatureAttribute>,
    pub associations: Vec<FeatureProteinAssociation>,
    pub contigs: Vec<ContigRecord>,
}

impl CorrelationTables {
    pub fn extend(&mut self, other: CorrelationTables) {
        self.features.extend(other.features);
        self.attributes.extend(other.attributes);
        self.associations.extend(other.associations);
        self.contigs.extend(other.contigs);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TripleStats {
    pub features: usize,
    pub attributes: usize,
    pub proteins: usize,
    pub associations: usize,
    pub contigs: usize,
    pub skipped: SkipTally,
    pub unmatched_features: usize,
    pub missing_contig_features: usize,
}

#[derive(Debug, Clone)]
pub struct CorrelationOutput {
    pub assembly_digest: Digest,
    pub gff_digest: Digest,
    pub tables: CorrelationTables,
    pub stats: TripleStats,
}

/// Everything accumulated while one triple is processed.
struct PipelineState {
    assembly_digest: Digest,
    contigs: SequenceIndex,
    features: Vec<Feature>,
    attributes: Vec<FeatureAttribute>,
    expected: ExpectedProteins,
    proteins: Vec<ProteinDigest>,
    skipped: SkipTally,
    missing_contig_features: usize,
}

impl PipelineState {
    fn new(assembly_digest: Digest, contigs: SequenceIndex) -> Self {
        Self {
            assembly_digest,
            contigs,
            features: Vec::new(),
            attributes: Vec::new(),
            expected: ExpectedProteins::default(),
            proteins: Vec::new(),
            skipped: SkipTally::default(),
            missing_contig_features: 0,
        }
    }

    fn add_record(&mut self, record: GffRecord, assigner: &FeatureIdentityAssigner) {
        let original_id = record.attributes.get("ID").map(str::to_string);
        let parent = record.attributes.get("Parent").map(str::to_string);
        let protein_id = record.attributes.get("protein_id").map(str::to_string);

        if record.feature_type == CDS_TYPE {
            if let Some(protein_id) = &protein_id {
                self.expected.register(protein_id);
            }
        }

        let feature_uid = assigner.assign(
            &record.seq_id,
            record.start,
            record.end,
            &record.feature_type,
            original_id.as_deref(),
        );

        let contig_md5 = match self.contigs.get(&record.seq_id) {
            Some(digest) => digest.to_string(),
            None => {
                debug!(seq_id = %record.seq_id, line = record.line, "feature on contig missing from assembly");
                self.missing_contig_features += 1;
                String::new()
            }
        };

        for (key, value) in record.attributes.iter() {
            if FOLDED_ATTRIBUTES.contains(&key) {
                continue;
            }
            self.attributes.push(FeatureAttribute {
                feature_id: feature_uid.clone(),
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        self.features.push(Feature {
            feature_uid,
            feature_ontology: ontology_code(&record.feature_type).to_string(),
            seq_id: record.seq_id,
            feature_type: record.feature_type,
            start: record.start,
            end: record.end,
            strand: record.strand,
            score: record.score,
            phase: record.phase,
            original_id,
            parent,
            assembly_md5: self.assembly_digest.clone(),
            contig_md5,
            protein_id,
        });
    }
}

pub struct CorrelationPipeline<'a> {
    sink: &'a dyn ProgressSink,
}

impl<'a> CorrelationPipeline<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self { sink }
    }

    pub fn run(&self, triple: &FileTriple) -> Result<CorrelationOutput, CdmError> {
        info!(
            triple = %triple.name,
            assembly = %triple.assembly,
            gff = %triple.gff,
            protein = %triple.protein,
            "processing triple"
        );

        let mut state = self.index_assembly(triple)?;
        let gff_digest = self.read_annotations(triple, &mut state)?;
        self.digest_proteins(triple, &mut state)?;
        let associations = self.correlate(&state);

        let contigs = state
            .contigs
            .contig_records(&state.assembly_digest, &triple.assembly);

        let stats = TripleStats {
            features: state.features.len(),
            attributes: state.attributes.len(),
            proteins: state.proteins.len(),
            associations: associations.len(),
            contigs: contigs.len(),
            skipped: state.skipped,
            unmatched_features: unmatched_features(&state.features, &state.proteins),
            missing_contig_features: state.missing_contig_features,
        };
        if stats.missing_contig_features > 0 {
            warn!(
                triple = %triple.name,
                features = stats.missing_contig_features,
                "features reference contigs absent from the assembly"
            );
        }
        if stats.unmatched_features > 0 {
            warn!(
                triple = %triple.name,
                features = stats.unmatched_features,
                "features carry a protein_id without a protein record"
            );
        }

        Ok(CorrelationOutput {
            assembly_digest: state.assembly_digest,
            gff_digest,
            tables: CorrelationTables {
                features: state.features,
                attributes: state.attributes,
                associations,
                contigs,
            },
            stats,
        })
    }

    fn index_assembly(&self, triple: &FileTriple) -> Result<PipelineState, CdmError> {
        let start = Instant::now();
        self.progress(format!("phase=Assembly; hashing {}", triple.assembly), None);
        let assembly_digest = ContentHasher::digest_file(&triple.assembly)?;
        let contigs = SequenceIndexer::index(&triple.assembly)?;
        self.progress(
            format!("phase=Assembly; {} contigs indexed", contigs.len()),
            Some(start),
        );
        Ok(PipelineState::new(assembly_digest, contigs))
    }

    fn read_annotations(
        &self,
        triple: &FileTriple,
        state: &mut PipelineState,
    ) -> Result<Digest, CdmError> {
        let start = Instant::now();
        self.progress(format!("phase=Annotation; reading {}", triple.gff), None);
        let gff_digest = ContentHasher::digest_file(&triple.gff)?;
        let assigner = FeatureIdentityAssigner::new(gff_digest.clone());

        for line in GffReader::open(&triple.gff)? {
            match line? {
                GffLine::Record(record) => state.add_record(record, &assigner),
                GffLine::Skipped { reason, line } => {
                    debug!(%reason, line, "skipped GFF3 line");
                    state.skipped.record(reason);
                }
            }
        }

        info!(
            path = %triple.gff,
            features = state.features.len(),
            attributes = state.attributes.len(),
            expected_proteins = state.expected.len(),
            skipped = state.skipped.total(),
            "read annotations"
        );
        self.progress(
            format!("phase=Annotation; {} features", state.features.len()),
            Some(start),
        );
        Ok(gff_digest)
    }

    fn digest_proteins(&self, triple: &FileTriple, state: &mut PipelineState) -> Result<(), CdmError> {
        let start = Instant::now();
        self.progress(format!("phase=Protein; validating {}", triple.protein), None);
        state.proteins = ProteinAssociator::new(&state.expected).digest_proteins(&triple.protein)?;
        self.progress(
            format!("phase=Protein; {} proteins", state.proteins.len()),
            Some(start),
        );
        Ok(())
    }

    fn correlate(&self, state: &PipelineState) -> Vec<FeatureProteinAssociation> {
        let by_id = index_proteins(&state.proteins);
        let mut associations = Vec::new();
        for feature in &state.features {
            let Some(protein_id) = feature.protein_id.as_deref().filter(|id| !id.is_empty()) else {
                continue;
            };
            let Some(matches) = by_id.get(protein_id) else {
                debug!(feature_uid = %feature.feature_uid, protein_id, "no protein record for feature");
                continue;
            };
            for protein in matches {
                associations.push(FeatureProteinAssociation {
                    feature_id: feature.feature_uid.clone(),
                    protein_id: protein.protein_id.clone(),
                    protein_md5: protein.protein_md5.clone(),
                });
            }
        }
        self.progress(
            format!("phase=Correlate; {} associations", associations.len()),
            None,
        );
        associations
    }

    fn progress(&self, message: String, started: Option<Instant>) {
        self.sink.event(ProgressEvent {
            message,
            elapsed: started.map(|start| start.elapsed()),
        });
    }
}

fn index_proteins(proteins: &[ProteinDigest]) -> HashMap<&str, Vec<&ProteinDigest>> {
    let mut by_id: HashMap<&str, Vec<&ProteinDigest>> = HashMap::new();
    for protein in proteins {
        by_id
            .entry(protein.protein_id.as_str())
            .or_default()
            .push(protein);
    }
    by_id
}

fn unmatched_features(features: &[Feature], proteins: &[ProteinDigest]) -> usize {
    let by_id = index_proteins(proteins);
    features
        .iter()
        .filter_map(|feature| feature.protein_id.as_deref())
        .filter(|id| !id.is_empty() && !by_id.contains_key(id))
        .count()
}
