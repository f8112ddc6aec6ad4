use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info};

use crate::domain::FileTriple;
use crate::error::CdmError;
use crate::pipeline::{CorrelationOutput, CorrelationPipeline, CorrelationTables, TripleStats};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TripleStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripleReport {
    pub name: String,
    pub assembly: Utf8PathBuf,
    pub gff: Utf8PathBuf,
    pub protein: Utf8PathBuf,
    pub status: TripleStatus,
    pub assembly_md5: Option<String>,
    pub gff_md5: Option<String>,
    pub stats: Option<TripleStats>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: String,
    pub finished_at: String,
    pub jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub triples: Vec<TripleReport>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub tables: CorrelationTables,
    pub report: BatchReport,
}

/// Runs every triple of a batch, isolating failures to the triple that raised them.
#[derive(Debug, Clone, Default)]
pub struct App {
    options: BatchOptions,
}

impl App {
    pub fn new(options: BatchOptions) -> Self {
        Self { options }
    }

    pub fn run(
        &self,
        triples: &[FileTriple],
        sink: &dyn ProgressSink,
    ) -> Result<BatchOutcome, CdmError> {
        let started_at = Utc::now().to_rfc3339();
        let jobs = self.options.jobs.max(1);
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; {} triples, jobs={jobs}", triples.len()),
            elapsed: None,
        });

        let results = if jobs > 1 && triples.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|err| CdmError::InvalidInput(format!("thread pool: {err}")))?;
            pool.install(|| {
                triples
                    .par_iter()
                    .map(|triple| CorrelationPipeline::new(sink).run(triple))
                    .collect::<Vec<_>>()
            })
        } else {
            triples
                .iter()
                .map(|triple| CorrelationPipeline::new(sink).run(triple))
                .collect::<Vec<_>>()
        };

        let mut tables = CorrelationTables::default();
        let mut reports = Vec::with_capacity(triples.len());
        for (triple, result) in triples.iter().zip(results) {
            reports.push(match result {
                Ok(output) => {
                    let report = success_report(triple, &output);
                    tables.extend(output.tables);
                    report
                }
                Err(err) => {
                    error!(triple = %triple.name, "{err}");
                    failure_report(triple, &err)
                }
            });
        }

        let succeeded = reports
            .iter()
            .filter(|report| report.status == TripleStatus::Succeeded)
            .count();
        let failed = reports.len() - succeeded;
        info!(succeeded, failed, "batch finished");

        Ok(BatchOutcome {
            tables,
            report: BatchReport {
                started_at,
                finished_at: Utc::now().to_rfc3339(),
                jobs,
                succeeded,
                failed,
                triples: reports,
            },
        })
    }
}

fn success_report(triple: &FileTriple, output: &CorrelationOutput) -> TripleReport {
    TripleReport {
        name: triple.name.clone(),
        assembly: triple.assembly.clone(),
        gff: triple.gff.clone(),
        protein: triple.protein.clone(),
        status: TripleStatus::Succeeded,
        assembly_md5: Some(output.assembly_digest.to_string()),
        gff_md5: Some(output.gff_digest.to_string()),
        stats: Some(output.stats.clone()),
        error: None,
    }
}

fn failure_report(triple: &FileTriple, err: &CdmError) -> TripleReport {
    TripleReport {
        name: triple.name.clone(),
        assembly: triple.assembly.clone(),
        gff: triple.gff.clone(),
        protein: triple.protein.clone(),
        status: TripleStatus::Failed,
        assembly_md5: None,
        gff_md5: None,
        stats: None,
        error: Some(err.to_string()),
    }
}
