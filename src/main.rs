use savorlocal::config::{AppConfig, ReferenceConfig};
use savorlocal::reference::ReferenceData;
use savorlocal::render::{Presenter, TerminalPresenter};
use savorlocal::{ConfiguredConnector, FormController, FormInput, SessionContext, SubmissionOutcome};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "savorlocal")]
#[command(about = "Discover local companies by address, industry and size")]
#[command(version)]
struct Args {
    /// Verbose logging (equivalent to RUST_LOG=savorlocal=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Industry list, one per line (or set SAVORLOCAL_INDUSTRY_FILE)
    #[arg(long, global = true)]
    industry_file: Option<PathBuf>,

    /// Company size list, one per line (or set SAVORLOCAL_SIZE_FILE)
    #[arg(long, global = true)]
    size_file: Option<PathBuf>,

    /// Local CSV/Parquet extract to query instead of the warehouse (or set SAVORLOCAL_DATASET)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the industry and company size options
    Options,
    /// Look up companies near an address
    Discover {
        /// Address, zip code, or city and state
        #[arg(short, long, default_value = savorlocal::controller::DEFAULT_ADDRESS)]
        address: String,

        /// Industry (default: first in the list)
        #[arg(short, long)]
        industry: Option<String>,

        /// Company size bucket (default: fourth in the list)
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Fill in the form repeatedly in one session
    Interactive,
}

impl Args {
    /// CLI flags, keyed like the environment variables they override
    fn overrides(&self) -> HashMap<&'static str, String> {
        let mut overrides = HashMap::new();
        let flags = [
            ("SAVORLOCAL_INDUSTRY_FILE", &self.industry_file),
            ("SAVORLOCAL_SIZE_FILE", &self.size_file),
            ("SAVORLOCAL_DATASET", &self.dataset),
        ];
        for (key, value) in flags {
            if let Some(path) = value {
                overrides.insert(key, path.display().to_string());
            }
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    let overrides = args.overrides();
    let lookup = |key: &str| overrides.get(key).cloned().or_else(|| std::env::var(key).ok());

    let reference_config = ReferenceConfig::from_lookup(&lookup);
    let reference = ReferenceData::new(reference_config.industry_file, reference_config.size_file);

    match args.command {
        Commands::Options => {
            print_options(&reference)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Discover { address, industry, size } => {
            let config = AppConfig::from_lookup(lookup)?;
            run_discover(config, &reference, address, industry, size).await
        }
        Commands::Interactive => {
            let config = AppConfig::from_lookup(lookup)?;
            run_interactive(config, &reference).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "savorlocal=debug" } else { "savorlocal=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_options(reference: &ReferenceData) -> Result<()> {
    println!("Industries:");
    for industry in reference.list_industries()?.iter() {
        println!("  {}", industry);
    }
    println!("\nCompany sizes:");
    for size in reference.list_sizes()? {
        println!("  {}", size);
    }
    Ok(())
}

async fn run_discover(
    config: AppConfig,
    reference: &ReferenceData,
    address: String,
    industry: Option<String>,
    size: Option<String>,
) -> Result<ExitCode> {
    let industries = reference.list_industries()?;
    let sizes = reference.list_sizes()?;

    let mut form = FormInput::with_defaults(&industries, &sizes);
    form.address = address;
    if let Some(industry) = industry {
        form.industry = industry;
    }
    if let Some(size) = size {
        form.size = size;
    }

    let mut controller = FormController::new(Arc::new(ConfiguredConnector::new(config)));
    let mut session = SessionContext::new();
    let mut presenter = TerminalPresenter;

    let outcome = controller.submit(&mut session, &form, &mut presenter).await?;
    Ok(ExitCode::from(exit_status(&outcome)))
}

/// Process status for a one-shot submission. The presenter has already shown
/// the notice of a rejected one.
fn exit_status(outcome: &SubmissionOutcome) -> u8 {
    match outcome {
        SubmissionOutcome::Rendered { .. } => 0,
        SubmissionOutcome::Rejected(notice) => {
            debug!("Submission rejected: {}", notice.message());
            1
        }
    }
}

async fn run_interactive(config: AppConfig, reference: &ReferenceData) -> Result<()> {
    let mut controller = FormController::new(Arc::new(ConfiguredConnector::new(config)));
    let mut session = SessionContext::new();
    controller.start_session(&mut session)?;

    let mut presenter = TerminalPresenter;
    presenter.title("Savorlocal");
    println!("Press Enter to keep the value in brackets, type 'quit' to exit.\n");

    let industries = reference.list_industries()?;
    let mut form = FormInput::with_defaults(&industries, &reference.list_sizes()?);
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        // Sizes are re-read every round; industries come from the cache.
        let industries = reference.list_industries()?;
        let sizes = reference.list_sizes()?;

        let Some(address) = prompt(&mut input, "📍 Address (zip / city, state)", &form.address)? else {
            break;
        };
        form.address = address;

        let Some(industry) = choose(&mut input, "🏭 Industry", &industries, &form.industry)? else {
            break;
        };
        form.industry = industry;

        let Some(size) = choose(&mut input, "👥 Company Size", &sizes, &form.size)? else {
            break;
        };
        form.size = size;

        println!("\n🔍 Discover\n");
        let outcome = controller.submit(&mut session, &form, &mut presenter).await?;
        if let SubmissionOutcome::Rendered { rows } = outcome {
            if let (Some(address), Some((lat, lon))) = (session.address(), session.coordinates()) {
                println!("\n{} result(s) near {} ({:.4}, {:.4})", rows, address, lat, lon);
            }
        }
        println!();
    }

    info!("Interactive session closed");
    Ok(())
}

/// Ask for a value; `None` on EOF or quit, the current value on empty input.
fn prompt(input: &mut impl BufRead, label: &str, current: &str) -> Result<Option<String>> {
    print!("{} [{}]: ", label, current);
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let answer = line.trim();
    if answer.eq_ignore_ascii_case("quit") || answer.eq_ignore_ascii_case("exit") {
        return Ok(None);
    }
    if answer.is_empty() {
        return Ok(Some(current.to_string()));
    }
    Ok(Some(answer.to_string()))
}

/// Pick from a numbered list by number or by name.
fn choose(input: &mut impl BufRead, label: &str, options: &[String], current: &str) -> Result<Option<String>> {
    for (idx, option) in options.iter().enumerate() {
        println!("  {:>3}. {}", idx + 1, option);
    }
    let Some(answer) = prompt(input, label, current)? else {
        return Ok(None);
    };

    if let Ok(number) = answer.parse::<usize>() {
        if let Some(option) = number.checked_sub(1).and_then(|idx| options.get(idx)) {
            return Ok(Some(option.clone()));
        }
    }
    if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(&answer)) {
        return Ok(Some(option.clone()));
    }

    eprintln!("[WARN] '{}' is not an option, keeping {}", answer, current);
    Ok(Some(current.to_string()))
}
