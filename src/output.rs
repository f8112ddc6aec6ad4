use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::app::{BatchReport, ProgressEvent, ProgressSink};
use crate::config::OutputPaths;
use crate::error::CdmError;
use crate::pipeline::CorrelationTables;

pub const FEATURE_COLUMNS: [&str; 14] = [
    "feature_uid",
    "seq_id",
    "feature_type",
    "feature_ontology",
    "start",
    "end",
    "strand",
    "score",
    "phase",
    "original_id",
    "parent",
    "assembly_md5",
    "contig_md5",
    "protein_id",
];
pub const ATTRIBUTE_COLUMNS: [&str; 3] = ["feature_id", "key", "value"];
pub const ASSOCIATION_COLUMNS: [&str; 3] = ["feature_id", "protein_id", "protein_md5"];
pub const CONTIG_COLUMNS: [&str; 6] = [
    "id",
    "contig_name",
    "length",
    "gc_content",
    "assembly_id",
    "fasta_file",
];

#[derive(Debug, Clone, Serialize)]
pub struct WrittenTable {
    pub path: Utf8PathBuf,
    pub rows: usize,
}

pub struct TableWriter;

impl TableWriter {
    /// Writes every table to a temporary sibling first and only renames
    /// them into place once all of them were written.
    pub fn write_all(
        tables: &CorrelationTables,
        outputs: &OutputPaths,
    ) -> Result<Vec<WrittenTable>, CdmError> {
        let mut staged = vec![
            (
                outputs.features.clone(),
                tables.features.len(),
                stage(&outputs.features, &FEATURE_COLUMNS, &tables.features)?,
            ),
            (
                outputs.attributes.clone(),
                tables.attributes.len(),
                stage(&outputs.attributes, &ATTRIBUTE_COLUMNS, &tables.attributes)?,
            ),
            (
                outputs.protein_associations.clone(),
                tables.associations.len(),
                stage(
                    &outputs.protein_associations,
                    &ASSOCIATION_COLUMNS,
                    &tables.associations,
                )?,
            ),
        ];
        if let Some(contigs) = &outputs.contigs {
            staged.push((
                contigs.clone(),
                tables.contigs.len(),
                stage(contigs, &CONTIG_COLUMNS, &tables.contigs)?,
            ));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (path, rows, temp) in staged {
            if path.as_std_path().exists() {
                fs::remove_file(path.as_std_path())
                    .map_err(|err| CdmError::Output(format!("{path}: {err}")))?;
            }
            temp.persist(path.as_std_path())
                .map_err(|err| CdmError::Output(format!("{path}: {err}")))?;
            info!(path = %path, rows, "wrote table");
            written.push(WrittenTable { path, rows });
        }
        Ok(written)
    }
}

fn stage<T: Serialize>(
    path: &Utf8Path,
    header: &[&str],
    rows: &[T],
) -> Result<NamedTempFile, CdmError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CdmError::Output(format!("{parent}: {err}")))?;
    let temp = tempfile::Builder::new()
        .prefix(".cdm-features")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CdmError::Output(format!("{path}: {err}")))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(temp.as_file());
    let to_output = |err: csv::Error| CdmError::Output(format!("{path}: {err}"));
    writer.write_record(header).map_err(to_output)?;
    for row in rows {
        writer.serialize(row).map_err(to_output)?;
    }
    writer
        .flush()
        .map_err(|err| CdmError::Output(format!("{path}: {err}")))?;
    drop(writer);
    Ok(temp)
}

#[derive(Debug, Clone, Serialize)]
pub struct FileDigest {
    pub path: Utf8PathBuf,
    pub md5: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceDigest {
    pub name: String,
    pub md5: String,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &BatchReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_digests(digests: &[FileDigest]) -> io::Result<()> {
        Self::print_json(&digests)
    }

    pub fn print_index(entries: &[SequenceDigest]) -> io::Result<()> {
        Self::print_json(&entries)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards progress messages to the tracing subscriber.
pub struct LogOutput;

impl ProgressSink for LogOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}
