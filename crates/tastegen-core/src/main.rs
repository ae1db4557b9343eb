use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tastegen_core::replay::{replay_text, PrintSink};
use tastegen_core::OrchestratorConfig;
use tastegen_stream::{GenerationSession, SessionConfig};
use tracing_subscriber::EnvFilter;

const PRESETS: [&str; 3] = ["narration_and_code", "checkpoint_only", "screen_stream"];

fn cli() -> Command {
    Command::new("tastegen-replay")
        .version(tastegen_core::VERSION)
        .about("Replay recorded generator streams through a checkpoint session")
        .subcommand(
            Command::new("replay")
                .about("Replay a recorded stream in fixed-size chunks")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Recorded generator output"),
                )
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .default_value("16")
                        .value_parser(value_parser!(usize))
                        .help("Characters per chunk"),
                )
                .arg(
                    Arg::new("preset")
                        .long("preset")
                        .default_value("narration_and_code")
                        .value_parser(PRESETS)
                        .help("Session preset"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Orchestrator config file (TOML or JSON); overrides --preset"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print events as JSON lines"),
                ),
        )
        .subcommand(
            Command::new("presets")
                .about("Print the built-in session presets as TOML"),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("replay", args)) => {
            let validated = replay(args).await?;
            std::process::exit(if validated { 0 } else { 1 });
        }
        Some(("presets", _)) => {
            for name in PRESETS {
                let config = SessionConfig::preset(name).ok_or_else(|| anyhow!("unknown preset {name}"))?;
                println!("# {name}\n{}", toml::to_string(&config)?);
            }
            Ok(())
        }
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}

async fn replay(args: &ArgMatches) -> anyhow::Result<bool> {
    let file = args
        .get_one::<PathBuf>("file")
        .ok_or_else(|| anyhow!("missing input file"))?;
    let chunk_size = args.get_one::<usize>("chunk-size").copied().unwrap_or(16);
    let json = args.get_flag("json");

    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => OrchestratorConfig::load(path).await?.session,
        None => {
            let name = args
                .get_one::<String>("preset")
                .map_or("narration_and_code", String::as_str);
            SessionConfig::preset(name).ok_or_else(|| anyhow!("unknown preset {name}"))?
        }
    };

    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let label = file
        .file_name()
        .map_or_else(|| "replay".to_string(), |n| n.to_string_lossy().into_owned());
    let session = GenerationSession::new(config)?.with_label(label);

    let mut sink = PrintSink::new(std::io::stdout(), json);
    let summary = replay_text(session, &text, chunk_size, &mut sink).await;
    tracing::info!(
        "Replayed {} chunks ({} bytes): {} checkpoints, final {:?}",
        summary.chunks,
        summary.bytes,
        summary.intermediates,
        summary.final_status()
    );
    Ok(summary.is_validated())
}
