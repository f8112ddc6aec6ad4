use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cdm_features::app::{App, BatchOptions, ProgressSink};
use cdm_features::config::{ConfigLoader, ManifestLoader, OutputPaths};
use cdm_features::digest::ContentHasher;
use cdm_features::domain::{FileTriple, ManifestDelimiter};
use cdm_features::error::CdmError;
use cdm_features::output::{FileDigest, JsonOutput, LogOutput, SequenceDigest, TableWriter};
use cdm_features::sequence_index::SequenceIndexer;

#[derive(Parser)]
#[command(name = "cdm-features")]
#[command(
    about = "Content-addressed feature, attribute and protein tables from assembly/GFF3/protein triples"
)]
#[command(version, author)]
struct Cli {
    /// Print machine-readable JSON to stdout instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Build feature, attribute and protein association tables")]
    Run(RunArgs),
    #[command(about = "Print the content digest of each file")]
    Digest(DigestArgs),
    #[command(about = "Print the digest of every sequence in a FASTA file")]
    Index(IndexArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Manifest with one `assembly gff protein` row per triple.
    manifest: Option<Utf8PathBuf>,

    #[arg(long, value_enum, default_value_t = ManifestDelimiter::Tab)]
    delimiter: ManifestDelimiter,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    assembly: Option<Utf8PathBuf>,

    #[arg(long)]
    gff: Option<Utf8PathBuf>,

    #[arg(long)]
    protein: Option<Utf8PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    features_output: Option<Utf8PathBuf>,

    #[arg(long)]
    associations_output: Option<Utf8PathBuf>,

    #[arg(long)]
    protein_associations_output: Option<Utf8PathBuf>,

    #[arg(long)]
    contigs_output: Option<Utf8PathBuf>,

    #[arg(long, default_value_t = 1)]
    jobs: usize,
}

#[derive(Args)]
struct DigestArgs {
    #[arg(required = true)]
    paths: Vec<Utf8PathBuf>,
}

#[derive(Args)]
struct IndexArgs {
    fasta: Utf8PathBuf,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<CdmError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &CdmError) -> u8 {
    match error {
        CdmError::MissingConfig
        | CdmError::ConfigRead(_)
        | CdmError::ConfigParse(_)
        | CdmError::Manifest { .. }
        | CdmError::InvalidInput(_) => 2,
        CdmError::UnknownProtein { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_batch(args, cli.json),
        Commands::Digest(args) => run_digest(args, cli.json),
        Commands::Index(args) => run_index(args, cli.json),
    }
}

fn run_batch(args: RunArgs, json: bool) -> miette::Result<ExitCode> {
    let (triples, mut outputs) = resolve_inputs(&args)?;
    if let Some(path) = args.features_output {
        outputs.features = path;
    }
    if let Some(path) = args.associations_output {
        outputs.attributes = path;
    }
    if let Some(path) = args.protein_associations_output {
        outputs.protein_associations = path;
    }
    if args.contigs_output.is_some() {
        outputs.contigs = args.contigs_output;
    }

    let app = App::new(BatchOptions { jobs: args.jobs });
    let sink: &dyn ProgressSink = if json { &JsonOutput } else { &LogOutput };
    let outcome = app.run(&triples, sink)?;

    if outcome.report.succeeded > 0 {
        TableWriter::write_all(&outcome.tables, &outputs)?;
    } else {
        warn!("no triple succeeded, output tables were not written");
    }

    if json {
        JsonOutput::print_report(&outcome.report).into_diagnostic()?;
    } else {
        print_batch_summary(&outcome.report);
    }

    if outcome.report.has_failures() {
        return Ok(ExitCode::from(3));
    }
    Ok(ExitCode::SUCCESS)
}

fn resolve_inputs(args: &RunArgs) -> Result<(Vec<FileTriple>, OutputPaths), CdmError> {
    let single = match (&args.assembly, &args.gff, &args.protein) {
        (Some(assembly), Some(gff), Some(protein)) => Some(FileTriple::new(
            args.name
                .clone()
                .unwrap_or_else(|| FileTriple::default_name(1)),
            assembly.clone(),
            gff.clone(),
            protein.clone(),
        )),
        (None, None, None) => None,
        _ => {
            return Err(CdmError::InvalidInput(
                "--assembly, --gff and --protein must be given together".to_string(),
            ));
        }
    };

    let sources = [
        single.is_some(),
        args.manifest.is_some(),
        args.config.is_some(),
    ]
    .into_iter()
    .filter(|given| *given)
    .count();
    if sources > 1 {
        return Err(CdmError::InvalidInput(
            "use only one of a manifest, --config, or --assembly/--gff/--protein".to_string(),
        ));
    }

    if let Some(triple) = single {
        return Ok((vec![triple], OutputPaths::default()));
    }
    if let Some(manifest) = &args.manifest {
        let triples = ManifestLoader::load(manifest, args.delimiter)?;
        return Ok((triples, OutputPaths::default()));
    }
    let resolved = ConfigLoader::resolve(args.config.as_deref())?;
    Ok((resolved.triples, resolved.outputs))
}

fn run_digest(args: DigestArgs, json: bool) -> miette::Result<ExitCode> {
    let digests = args
        .paths
        .into_iter()
        .map(|path| {
            ContentHasher::digest_file(&path).map(|digest| FileDigest {
                md5: digest.to_string(),
                path,
            })
        })
        .collect::<Result<Vec<_>, CdmError>>()?;

    if json {
        JsonOutput::print_digests(&digests).into_diagnostic()?;
    } else {
        for entry in &digests {
            println!("{}\t{}", entry.md5, entry.path);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_index(args: IndexArgs, json: bool) -> miette::Result<ExitCode> {
    let index = SequenceIndexer::index(&args.fasta)?;
    let entries = index
        .sorted_entries()
        .into_iter()
        .map(|(name, digest)| SequenceDigest {
            name: name.to_string(),
            md5: digest.to_string(),
        })
        .collect::<Vec<_>>();

    if json {
        JsonOutput::print_index(&entries).into_diagnostic()?;
    } else {
        for entry in &entries {
            println!("{}\t{}", entry.name, entry.md5);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_batch_summary(report: &cdm_features::app::BatchReport) {
    let green = "\x1b[32m";
    let red = "\x1b[31m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}cdm-features summary{reset}");
    println!("{green}succeeded: {}{reset}", report.succeeded);
    if report.failed > 0 {
        println!("{red}failed: {}{reset}", report.failed);
    }

    for triple in &report.triples {
        match (&triple.stats, &triple.error) {
            (Some(stats), _) => println!(
                "{green}  {} features={} attributes={} associations={} skipped={}{reset}",
                triple.name,
                stats.features,
                stats.attributes,
                stats.associations,
                stats.skipped.total()
            ),
            (None, Some(error)) => println!("{red}  {} {error}{reset}", triple.name),
            (None, None) => println!("  {}", triple.name),
        }
    }
}
