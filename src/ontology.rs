//! Sequence Ontology codes for the feature types emitted by common
//! prokaryotic and eukaryotic annotation pipelines.

const SO_TERMS: &[(&str, &str)] = &[
    ("gene", "SO:0000704"),
    ("pseudogene", "SO:0000336"),
    ("ncRNA_gene", "SO:0001263"),
    ("mRNA", "SO:0000234"),
    ("CDS", "SO:0000316"),
    ("exon", "SO:0000147"),
    ("five_prime_UTR", "SO:0000204"),
    ("three_prime_UTR", "SO:0000205"),
    ("ncRNA", "SO:0000655"),
    ("rRNA", "SO:0000252"),
    ("tRNA", "SO:0000253"),
    ("SRP_RNA", "SO:0000590"),
    ("RNase_P_RNA", "SO:0000386"),
    ("riboswitch", "SO:0000035"),
    ("direct_repeat", "SO:0000319"),
    ("origin_of_replication", "SO:0000296"),
    ("CRISPR", "SO:0001459"),
    ("mobile_genetic_element", "SO:0001037"),
    ("region", "SO:0000001"),
    ("sequence_feature", "SO:0000110"),
];

/// Returns the ontology code for `feature_type`, or `""` when it is unmapped.
pub fn ontology_code(feature_type: &str) -> &'static str {
    SO_TERMS
        .iter()
        .find(|(term, _)| *term == feature_type)
        .map(|(_, code)| *code)
        .unwrap_or("")
}
