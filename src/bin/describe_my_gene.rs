use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;

use ncbi_gene_batch::cli::{self, CommonArgs};
use ncbi_gene_batch::domain::{KeyFormat, OutputNaming, Species};
use ncbi_gene_batch::eutils::NcbiHttpClient;
use ncbi_gene_batch::input::load_keys;
use ncbi_gene_batch::output::{
    JsonOutput, OutputMode, RunSummary, resolve_output_path, summary_rows, write_tsv,
};
use ncbi_gene_batch::runner::BatchRunner;

#[derive(Parser)]
#[command(name = "describe-my-gene")]
#[command(about = "Look up NCBI Gene summaries for a list of gene names and write them as TSV")]
#[command(version)]
struct Cli {
    /// Input file with one gene name per line
    input: PathBuf,

    /// Output TSV file; must not exist yet
    output: PathBuf,

    /// Species as genus_species, e.g. homo_sapiens
    species: String,

    /// Add the NCBI gene id as a second column
    #[arg(long)]
    include_gene_id: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    let cli = match cli::parse_args::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    cli::init_tracing();
    cli::finish(run(cli))
}

fn run(cli: Cli) -> miette::Result<()> {
    let species: Species = cli.species.parse()?;
    let output = resolve_output_path(&cli.output, OutputNaming::FailIfExists)?;
    let config = cli.common.resolve_config(None)?;
    let keys = load_keys(&cli.input, KeyFormat::Lines)?;

    let client = NcbiHttpClient::new(&config)?;
    let pacer = client.pacer();
    let runner = BatchRunner::from_config(client, pacer, &config, cli.common.policy());

    let mode = cli.common.output_mode();
    let sink = cli::progress_sink(mode);
    let report = runner.describe_genes(&keys, &species, &*sink)?;

    let rows = summary_rows(&report.records, cli.include_gene_id);
    let written = write_tsv(&output, &rows, OutputNaming::FailIfExists)?;

    match mode {
        OutputMode::NonInteractive => {
            let summary = RunSummary::new(
                &written,
                report.records.len(),
                report.unresolved,
                report.failed.iter().map(ToString::to_string).collect(),
            );
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            println!("Output written to {}", written.display());
        }
    }
    Ok(())
}
