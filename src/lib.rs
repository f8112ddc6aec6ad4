pub mod app;
pub mod config;
pub mod digest;
pub mod domain;
pub mod error;
pub mod fasta;
pub mod fs_util;
pub mod gff;
pub mod identity;
pub mod ontology;
pub mod output;
pub mod pipeline;
pub mod protein;
pub mod sequence_index;
