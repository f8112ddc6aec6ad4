use std::fs;

use camino::Utf8PathBuf;

use cdm_features::config::OutputPaths;
use cdm_features::digest::ContentHasher;
use cdm_features::domain::{
    ContigRecord, Feature, FeatureAttribute, FeatureProteinAssociation, Phase, Strand,
};
use cdm_features::output::TableWriter;
use cdm_features::pipeline::CorrelationTables;

fn outputs(root: &Utf8PathBuf, contigs: bool) -> OutputPaths {
    OutputPaths {
        features: root.join("features.tsv"),
        attributes: root.join("feature_associations.tsv"),
        protein_associations: root.join("feature_protein_associations.tsv"),
        contigs: contigs.then(|| root.join("contigs.tsv")),
    }
}

fn fixture() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

#[test]
fn empty_tables_still_get_headers() {
    let (_temp, root) = fixture();
    let paths = outputs(&root, false);
    let written = TableWriter::write_all(&CorrelationTables::default(), &paths).unwrap();

    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|table| table.rows == 0));
    assert_eq!(
        fs::read_to_string(&paths.attributes).unwrap(),
        "feature_id\tkey\tvalue\n"
    );
    assert_eq!(
        fs::read_to_string(&paths.protein_associations).unwrap(),
        "feature_id\tprotein_id\tprotein_md5\n"
    );
    assert!(!root.join("contigs.tsv").exists());
}

#[test]
fn rows_are_written_in_column_order() {
    let (_temp, root) = fixture();
    let paths = outputs(&root, true);
    let uid = ContentHasher::digest_str("ctg1_10_50_CDS_x_cds1");
    let assembly = ContentHasher::digest_str(">ctg1\nACGT\n");
    let protein = ContentHasher::digest_str("MKT");
    let tables = CorrelationTables {
        features: vec![Feature {
            feature_uid: uid.clone(),
            seq_id: "ctg1".to_string(),
            feature_type: "CDS".to_string(),
            feature_ontology: "SO:0000316".to_string(),
            start: 10,
            end: 50,
            strand: Some(Strand::Forward),
            score: None,
            phase: Phase::parse("0"),
            original_id: Some("cds1".to_string()),
            parent: None,
            assembly_md5: assembly.clone(),
            contig_md5: String::new(),
            protein_id: Some("prot1".to_string()),
        }],
        attributes: vec![FeatureAttribute {
            feature_id: uid.clone(),
            key: "product".to_string(),
            value: "DNA polymerase".to_string(),
        }],
        associations: vec![FeatureProteinAssociation {
            feature_id: uid.clone(),
            protein_id: "prot1".to_string(),
            protein_md5: protein.clone(),
        }],
        contigs: vec![ContigRecord {
            id: ContentHasher::digest_str("ACGT"),
            contig_name: "ctg1".to_string(),
            length: 4,
            gc_content: "0.5000".to_string(),
            assembly_id: assembly.clone(),
            fasta_file: root.join("a.fna"),
        }],
    };

    let written = TableWriter::write_all(&tables, &paths).unwrap();
    assert_eq!(written.len(), 4);

    let features = fs::read_to_string(&paths.features).unwrap();
    let lines = features.lines().collect::<Vec<_>>();
    assert_eq!(
        lines[0],
        "feature_uid\tseq_id\tfeature_type\tfeature_ontology\tstart\tend\tstrand\tscore\tphase\toriginal_id\tparent\tassembly_md5\tcontig_md5\tprotein_id"
    );
    assert_eq!(
        lines[1],
        format!("{uid}\tctg1\tCDS\tSO:0000316\t10\t50\t+\t\t0\tcds1\t\t{assembly}\t\tprot1")
    );

    let attributes = fs::read_to_string(&paths.attributes).unwrap();
    assert_eq!(
        attributes.lines().nth(1).unwrap(),
        format!("{uid}\tproduct\tDNA polymerase")
    );
    let associations = fs::read_to_string(&paths.protein_associations).unwrap();
    assert_eq!(
        associations.lines().nth(1).unwrap(),
        format!("{uid}\tprot1\t{protein}")
    );

    let contigs = fs::read_to_string(paths.contigs.as_ref().unwrap()).unwrap();
    assert!(contigs.starts_with("id\tcontig_name\tlength\tgc_content\tassembly_id\tfasta_file\n"));
    assert!(contigs.contains("\tctg1\t4\t0.5000\t"));
}

#[test]
fn rewriting_replaces_previous_tables_without_leftovers() {
    let (_temp, root) = fixture();
    let paths = outputs(&root, false);
    fs::write(&paths.features, "stale\n").unwrap();

    TableWriter::write_all(&CorrelationTables::default(), &paths).unwrap();

    let features = fs::read_to_string(&paths.features).unwrap();
    assert!(features.starts_with("feature_uid\t"));
    let leftovers = fs::read_dir(&root)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".cdm-features"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn missing_output_directories_are_created() {
    let (_temp, root) = fixture();
    let paths = outputs(&root.join("nested/out"), false);
    TableWriter::write_all(&CorrelationTables::default(), &paths).unwrap();
    assert!(paths.features.exists());
}
