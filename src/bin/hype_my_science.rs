use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;

use ncbi_gene_batch::cli::{self, CommonArgs};
use ncbi_gene_batch::dictionary::WordList;
use ncbi_gene_batch::domain::{KeyFormat, OutputNaming};
use ncbi_gene_batch::eutils::NcbiHttpClient;
use ncbi_gene_batch::input::load_keys;
use ncbi_gene_batch::output::{
    JsonOutput, OutputMode, RunSummary, count_rows, resolve_output_path, write_tsv,
};
use ncbi_gene_batch::runner::BatchRunner;

#[derive(Parser)]
#[command(name = "hype-my-science")]
#[command(about = "Rank genes by PubMed hit count and flag names that are also English words")]
#[command(version)]
struct Cli {
    /// Tab-separated input; the gene name is the first column
    input: PathBuf,

    /// Output TSV file
    #[arg(default_value = "output_file1.txt")]
    output: PathBuf,

    /// What to do when the output file already exists
    #[arg(long, value_enum, default_value_t = OutputNaming::AutoIncrement)]
    output_naming: OutputNaming,

    /// Word list used for the dictionary check (plain or .gz, one word per line)
    #[arg(long, conflicts_with = "no_dictionary_check")]
    dictionary: Option<PathBuf>,

    /// Skip the dictionary check and omit the warning column
    #[arg(long)]
    no_dictionary_check: bool,

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
    let output = resolve_output_path(&cli.output, cli.output_naming)?;
    let config = cli.common.resolve_config(cli.dictionary.clone())?;
    let keys = load_keys(&cli.input, KeyFormat::FirstColumn)?;
    let dictionary = if cli.no_dictionary_check {
        None
    } else {
        Some(WordList::locate(config.dictionary_path.as_deref())?)
    };

    let client = NcbiHttpClient::new(&config)?;
    let pacer = client.pacer();
    let runner = BatchRunner::from_config(client, pacer, &config, cli.common.policy());

    let mode = cli.common.output_mode();
    let sink = cli::progress_sink(mode);
    let report = runner.count_publications(&keys, dictionary.as_ref(), &*sink)?;

    let rows = count_rows(&report.records, dictionary.is_some());
    let written = write_tsv(&output, &rows, cli.output_naming)?;

    match mode {
        OutputMode::NonInteractive => {
            let summary = RunSummary::new(
                &written,
                report.records.len(),
                0,
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
