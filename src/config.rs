use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{FileTriple, ManifestDelimiter};
use crate::error::CdmError;

pub const DEFAULT_CONFIG_FILE: &str = "cdm-features.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub triples: Vec<TripleEntry>,
    #[serde(default)]
    pub outputs: Option<OutputsEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TripleEntry {
    Shorthand([Utf8PathBuf; 3]),
    Detailed(TripleEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TripleEntryObject {
    #[serde(default)]
    pub name: Option<String>,
    pub assembly: Utf8PathBuf,
    pub gff: Utf8PathBuf,
    pub protein: Utf8PathBuf,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OutputsEntry {
    #[serde(default)]
    pub features: Option<Utf8PathBuf>,
    #[serde(default)]
    pub attributes: Option<Utf8PathBuf>,
    #[serde(default)]
    pub protein_associations: Option<Utf8PathBuf>,
    #[serde(default)]
    pub contigs: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub features: Utf8PathBuf,
    pub attributes: Utf8PathBuf,
    pub protein_associations: Utf8PathBuf,
    pub contigs: Option<Utf8PathBuf>,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            features: Utf8PathBuf::from("features.tsv"),
            attributes: Utf8PathBuf::from("feature_associations.tsv"),
            protein_associations: Utf8PathBuf::from("feature_protein_associations.tsv"),
            contigs: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub triples: Vec<FileTriple>,
    pub outputs: OutputPaths,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CdmError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(CdmError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CdmError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CdmError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CdmError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if config.triples.is_empty() {
            return Err(CdmError::ConfigParse("no triples configured".to_string()));
        }

        let triples = config
            .triples
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                TripleEntry::Shorthand([assembly, gff, protein]) => {
                    FileTriple::new(FileTriple::default_name(index + 1), assembly, gff, protein)
                }
                TripleEntry::Detailed(obj) => FileTriple::new(
                    obj.name
                        .unwrap_or_else(|| FileTriple::default_name(index + 1)),
                    obj.assembly,
                    obj.gff,
                    obj.protein,
                ),
            })
            .collect();

        let defaults = OutputPaths::default();
        let outputs = match config.outputs {
            Some(entry) => OutputPaths {
                features: entry.features.unwrap_or(defaults.features),
                attributes: entry.attributes.unwrap_or(defaults.attributes),
                protein_associations: entry
                    .protein_associations
                    .unwrap_or(defaults.protein_associations),
                contigs: entry.contigs,
            },
            None => defaults,
        };

        Ok(ResolvedConfig {
            schema_version,
            triples,
            outputs,
        })
    }
}

pub struct ManifestLoader;

impl ManifestLoader {
    /// Reads one `assembly gff protein` triple per line.
    pub fn load(path: &Utf8Path, delimiter: ManifestDelimiter) -> Result<Vec<FileTriple>, CdmError> {
        let content = fs::read_to_string(path).map_err(|err| CdmError::Manifest {
            path: path.to_owned(),
            message: err.to_string(),
        })?;
        let triples = Self::parse(&content, delimiter);
        if triples.is_empty() {
            return Err(CdmError::Manifest {
                path: path.to_owned(),
                message: "no complete assembly/gff/protein rows".to_string(),
            });
        }
        Ok(triples)
    }

    pub fn parse(content: &str, delimiter: ManifestDelimiter) -> Vec<FileTriple> {
        let separator = delimiter.as_char();
        let mut triples = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let columns = line
                .split(separator)
                .map(str::trim)
                .filter(|column| !column.is_empty())
                .collect::<Vec<_>>();
            let [assembly, gff, protein, ..] = columns.as_slice() else {
                warn!(line = index + 1, "skipping manifest row without three file paths");
                continue;
            };
            triples.push(FileTriple::new(
                FileTriple::default_name(triples.len() + 1),
                *assembly,
                *gff,
                *protein,
            ));
        }
        triples
    }
}
