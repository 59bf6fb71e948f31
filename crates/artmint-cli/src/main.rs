use std::io::{self, BufRead, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::Result;
use artmint_contracts::chat::{parse_intent, Intent, CHAT_HELP_COMMANDS};
use artmint_contracts::error::WorkflowError;
use artmint_contracts::ipfs::gateway_url;
use artmint_contracts::mint::MintReceipt;
use artmint_contracts::session::SessionState;
use artmint_engine::config::EngineConfig;
use artmint_engine::Workflow;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "artmint",
    version,
    about = "Generate an image from a prompt and mint it as an NFT"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session: type a prompt, then /mint.
    Chat(ChatArgs),
    /// Generate, upload and mint once.
    Run(RunArgs),
    /// Print the HTTPS gateway URL for an ipfs:// URI.
    Gateway(GatewayArgs),
}

#[derive(Debug, Args)]
struct WorkflowArgs {
    /// Directory for preview images.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Append stage events to this JSONL file.
    #[arg(long)]
    events: Option<PathBuf>,
    /// Use offline providers for every stage.
    #[arg(long)]
    dryrun: bool,
    #[arg(long, default_value = "huggingface")]
    image_provider: String,
}

#[derive(Debug, Args)]
struct ChatArgs {
    #[command(flatten)]
    workflow: WorkflowArgs,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    address: String,
    #[command(flatten)]
    workflow: WorkflowArgs,
}

#[derive(Debug, Args)]
struct GatewayArgs {
    uri: String,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("artmint error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            let mut workflow = build_workflow(&args.workflow)?;
            let stdin = io::stdin();
            let stdout = io::stdout();
            run_chat(&mut workflow, stdin.lock(), stdout.lock())?;
            Ok(0)
        }
        Command::Run(args) => run_once(args),
        Command::Gateway(args) => {
            println!("{}", gateway_url(&args.uri));
            Ok(0)
        }
    }
}

fn build_workflow(args: &WorkflowArgs) -> Result<Workflow> {
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("artmint"));
    let workflow = if args.dryrun {
        Workflow::dryrun(out)
    } else {
        let cfg = EngineConfig::from_env();
        let missing = cfg.missing_credentials();
        if !missing.is_empty() {
            tracing::warn!(missing = %missing.join(", "), "credentials not configured");
        }
        Workflow::from_config(&cfg, &args.image_provider, out)?
    };
    Ok(match args.events.as_ref() {
        Some(path) => workflow.with_events(path),
        None => workflow,
    })
}

fn run_once(args: RunArgs) -> Result<i32> {
    let mut workflow = build_workflow(&args.workflow)?;
    let mut out = io::stdout().lock();
    let image = match workflow.generate_art(&args.prompt) {
        Ok(image) => image,
        Err(err) => {
            writeln!(out, "{}", failure_notice("Generation", &err))?;
            return Ok(1);
        }
    };
    writeln!(out, "Preview: {}", image.preview_url)?;
    match workflow.mint_nft(&args.name, &args.description, &args.address) {
        Ok(receipt) => {
            write_receipt(&mut out, &receipt)?;
            Ok(0)
        }
        Err(err) => {
            writeln!(out, "{}", failure_notice("Mint", &err))?;
            Ok(1)
        }
    }
}

/// Drive a workflow from line-oriented input until EOF or `/quit`.
fn run_chat<R: BufRead, W: Write>(workflow: &mut Workflow, mut input: R, mut out: W) -> Result<()> {
    let [image, storage, minter] = workflow.provider_names();
    writeln!(
        out,
        "artmint chat started (image: {image}, storage: {storage}, mint: {minter}). Type /help for commands."
    )?;

    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        let read = match input.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        match intent.action.as_str() {
            "noop" => {}
            "quit" => break,
            "help" => {
                writeln!(out, "Commands: {}", CHAT_HELP_COMMANDS.join(" "))?;
                writeln!(out, "Any other text generates an image from it.")?;
            }
            "set_name" => {
                workflow.set_name(intent.arg_str("name").unwrap_or_default());
                writeln!(out, "Name set to {:?}", workflow.session().form().name)?;
            }
            "set_description" => {
                workflow.set_description(intent.arg_str("description").unwrap_or_default());
                writeln!(
                    out,
                    "Description set to {:?}",
                    workflow.session().form().description
                )?;
            }
            "set_address" => {
                workflow.set_recipient_address(intent.arg_str("address").unwrap_or_default());
                writeln!(
                    out,
                    "Recipient set to {:?}",
                    workflow.session().form().recipient_address
                )?;
            }
            "gateway" => match intent.arg_str("uri").filter(|uri| !uri.is_empty()) {
                Some(uri) => writeln!(out, "{}", gateway_url(uri))?,
                None => writeln!(out, "/gateway requires a URI")?,
            },
            "status" => write_status(&mut out, workflow)?,
            "reset" => match workflow.reset() {
                Ok(()) if workflow.session().minted() => writeln!(
                    out,
                    "Preview cleared. This session already minted; /restart to start over."
                )?,
                Ok(()) => writeln!(out, "Preview cleared.")?,
                Err(err) => writeln!(out, "{}", failure_notice("Reset", &err))?,
            },
            "restart" => {
                workflow.restart();
                writeln!(out, "New session {}", workflow.session().id())?;
            }
            "mint_usage" => {
                writeln!(out, "Usage: /mint \"<name>\" \"<description>\" <address>")?;
                writeln!(out, "   or: set /name, /description, /address then /mint")?;
            }
            "mint" => {
                let result = if has_mint_args(&intent) {
                    workflow.mint_nft(
                        intent.arg_str("name").unwrap_or_default(),
                        intent.arg_str("description").unwrap_or_default(),
                        intent.arg_str("address").unwrap_or_default(),
                    )
                } else {
                    workflow.mint_current_form()
                };
                match result {
                    Ok(receipt) => write_receipt(&mut out, &receipt)?,
                    Err(err) => writeln!(out, "{}", failure_notice("Mint", &err))?,
                }
            }
            "generate" => {
                let prompt = intent.prompt.as_deref().unwrap_or_default();
                match workflow.generate_art(prompt) {
                    Ok(image) => {
                        writeln!(out, "Preview: {}", image.preview_url)?;
                        writeln!(out, "Set /name, /description and /address, then /mint.")?;
                    }
                    Err(err) => writeln!(out, "{}", failure_notice("Generation", &err))?,
                }
            }
            "unknown" => {
                let command = intent.arg_str("command").unwrap_or("unknown");
                writeln!(out, "Unknown command: /{command}")?;
            }
            other => {
                tracing::debug!(action = other, "unhandled chat action");
            }
        }
    }
    Ok(())
}

fn has_mint_args(intent: &Intent) -> bool {
    ["name", "description", "address"]
        .iter()
        .all(|key| intent.arg_str(key).is_some())
}

fn failure_notice(stage: &str, err: &WorkflowError) -> String {
    match err {
        WorkflowError::Validation(reason) => format!("Invalid input: {reason}"),
        WorkflowError::InvalidState { .. } => format!("{stage} not possible: {err}"),
        _ => format!("{stage} failed: {err}"),
    }
}

fn write_receipt<W: Write>(out: &mut W, receipt: &MintReceipt) -> Result<()> {
    writeln!(
        out,
        "Minted on {} to {}",
        receipt.chain, receipt.mint_to_address
    )?;
    writeln!(out, "File: {}", receipt.file_url)?;
    if let Some(hash) = receipt.transaction_hash.as_deref() {
        writeln!(out, "Transaction: {hash}")?;
    }
    if let Some(url) = receipt.transaction_external_url.as_deref() {
        writeln!(out, "Explorer: {url}")?;
    }
    Ok(())
}

fn write_status<W: Write>(out: &mut W, workflow: &Workflow) -> Result<()> {
    let session = workflow.session();
    let form = session.form();
    writeln!(out, "Session {} ({})", session.id(), session.state().label())?;
    if !session.prompt().is_empty() {
        writeln!(out, "Prompt: {}", session.prompt())?;
    }
    writeln!(out, "Name: {:?}", form.name)?;
    writeln!(out, "Description: {:?}", form.description)?;
    writeln!(out, "Recipient: {:?}", form.recipient_address)?;
    match session.state() {
        SessionState::Previewing(image) | SessionState::Minting(image) => {
            writeln!(out, "Preview: {}", image.preview_url)?;
        }
        SessionState::Minted(receipt) => {
            writeln!(
                out,
                "Minted: {}",
                receipt.transaction_hash.as_deref().unwrap_or("(no transaction hash)")
            )?;
        }
        SessionState::Idle | SessionState::Generating => {}
    }
    Ok(())
}
