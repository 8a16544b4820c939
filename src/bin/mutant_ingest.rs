use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mutant_ingest::config::{ConfigLoader, ResolvedConfig};
use mutant_ingest::error::IngestError;
use mutant_ingest::ingest::{IngestOptions, Ingestor};
use mutant_ingest::output::JsonOutput;
use mutant_ingest::proteins::{ProteinIndex, ProteinLookup};
use mutant_ingest::providers::bibliography::BibliographyHttpClient;
use mutant_ingest::pubchem::PubchemHttpClient;
use mutant_ingest::rows::TsvRowSource;
use mutant_ingest::store::{self, Store};
use mutant_ingest::uniprot::UniprotProteinLookup;

#[derive(Parser)]
#[command(name = "mutant-ingest")]
#[command(about = "Ingest receptor mutagenesis sheets into the ligand and experiment catalog")]
#[command(version, author)]
struct Cli {
    /// Sheets to ingest; every non-hidden file in the source directory when empty
    files: Vec<String>,

    /// Delete all mutation experiments before ingesting
    #[arg(long)]
    purge: bool,

    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<IngestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IngestError) -> u8 {
    match error {
        IngestError::SourceNotFound(_)
        | IngestError::ConfigRead(_)
        | IngestError::ConfigParse(_) => 2,
        err if err.is_remote() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match &config.protein_index {
        Some(path) => {
            let index = ProteinIndex::load(path)?;
            info!(path = %path, proteins = index.len(), "using local protein index");
            ingest(&cli, &config, index)
        }
        None => {
            let lookup = UniprotProteinLookup::new(&config.endpoints.uniprot, config.http)?;
            ingest(&cli, &config, lookup)
        }
    }
}

fn ingest<L: ProteinLookup>(cli: &Cli, config: &ResolvedConfig, proteins: L) -> miette::Result<()> {
    let store = Store::new(config.store_dir.clone());
    store.ensure_root()?;
    let catalog = store.load_catalog()?;

    let chemistry = PubchemHttpClient::new(&config.endpoints.pubchem, config.http)?;
    let bibliography =
        BibliographyHttpClient::new(&config.endpoints.crossref, &config.endpoints.eutils, config.http)?;

    let mut ingestor = Ingestor::new(catalog, chemistry, bibliography, proteins)
        .with_store(store)
        .with_options(IngestOptions {
            added_by: config.added_by.clone(),
        });
    let report = ingestor.purge_and_ingest(cli.purge, || source_files(cli, config))?;
    JsonOutput::print_report(&report).into_diagnostic()?;
    Ok(())
}

fn source_files(cli: &Cli, config: &ResolvedConfig) -> Result<Vec<TsvRowSource>, IngestError> {
    let paths = if cli.files.is_empty() {
        store::list_source_files(&config.source_dir)?
    } else {
        cli.files
            .iter()
            .map(|name| store::resolve_source(&config.source_dir, name))
            .collect::<Result<Vec<_>, _>>()?
    };
    Ok(paths.into_iter().map(TsvRowSource::new).collect())
}
