use std::fs;
use std::sync::Mutex;

use camino::Utf8PathBuf;

use cdm_features::app::{App, BatchOptions, ProgressEvent, ProgressSink, TripleStatus};
use cdm_features::domain::FileTriple;
use cdm_features::output::JsonOutput;

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

fn write_triple(root: &Utf8PathBuf, name: &str, protein_id: &str, proteins: &str) -> FileTriple {
    let assembly = root.join(format!("{name}.fna"));
    let gff = root.join(format!("{name}.gff"));
    let protein = root.join(format!("{name}.faa"));
    fs::write(&assembly, ">ctg1\nACGTACGT\n>ctg2\nGGCC\n").unwrap();
    fs::write(
        &gff,
        format!(
            "##gff-version 3\n\
ctg1\tsrc\tgene\t1\t8\t.\t+\t.\tID={name}-gene;Name={name}\n\
ctg1\tsrc\tCDS\t1\t8\t.\t+\t0\tID={name}-cds;Parent={name}-gene;protein_id={protein_id}\n"
        ),
    )
    .unwrap();
    fs::write(&protein, proteins).unwrap();
    FileTriple::new(name, assembly, gff, protein)
}

fn fixture() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

#[test]
fn failing_triple_does_not_stop_the_batch() {
    let (_temp, root) = fixture();
    let triples = vec![
        write_triple(&root, "broken", "P1", ">P1\nMKT\n>P9\nMMM\n"),
        write_triple(&root, "good", "P2", ">P2\nMAA\n"),
    ];

    let sink = RecordingSink::default();
    let outcome = App::new(BatchOptions::default()).run(&triples, &sink).unwrap();

    assert_eq!(outcome.report.succeeded, 1);
    assert_eq!(outcome.report.failed, 1);
    assert!(outcome.report.has_failures());
    assert_eq!(outcome.report.triples[0].status, TripleStatus::Failed);
    assert!(
        outcome.report.triples[0]
            .error
            .as_deref()
            .unwrap()
            .contains("P9")
    );
    assert_eq!(outcome.report.triples[1].status, TripleStatus::Succeeded);
    assert_eq!(outcome.report.triples[1].stats.as_ref().unwrap().associations, 1);

    assert_eq!(outcome.tables.features.len(), 2);
    assert!(
        outcome
            .tables
            .features
            .iter()
            .all(|feature| feature.original_id.as_deref().unwrap().starts_with("good"))
    );
    assert_eq!(outcome.tables.associations.len(), 1);

    let messages = sink.messages.lock().unwrap();
    assert!(messages.iter().any(|message| message.starts_with("phase=Resolve")));
    assert!(messages.iter().any(|message| message.starts_with("phase=Correlate")));
}

#[test]
fn parallel_batch_matches_sequential_order() {
    let (_temp, root) = fixture();
    let triples = (1..=4)
        .map(|index| {
            let protein_id = format!("P{index}");
            write_triple(
                &root,
                &format!("sample{index}"),
                &protein_id,
                &format!(">{protein_id}\nMK{index}\n"),
            )
        })
        .collect::<Vec<_>>();

    let sequential = App::new(BatchOptions { jobs: 1 })
        .run(&triples, &JsonOutput)
        .unwrap();
    let parallel = App::new(BatchOptions { jobs: 3 })
        .run(&triples, &JsonOutput)
        .unwrap();

    assert_eq!(sequential.tables, parallel.tables);
    assert_eq!(parallel.report.jobs, 3);
    assert_eq!(parallel.report.succeeded, 4);
    let names = parallel
        .report
        .triples
        .iter()
        .map(|triple| triple.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["sample1", "sample2", "sample3", "sample4"]);
}

#[test]
fn empty_batch_reports_nothing() {
    let outcome = App::default().run(&[], &JsonOutput).unwrap();
    assert_eq!(outcome.report.succeeded, 0);
    assert!(!outcome.report.has_failures());
    assert!(outcome.tables.features.is_empty());
}
