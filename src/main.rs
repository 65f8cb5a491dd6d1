// dxcc-lookup: resolve callsigns from the command line

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use clap::Parser;

use dxcc_engine::{Engine, EngineConfig, Provider, Role};

const EXIT_ERROR: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "dxcc-lookup")]
#[command(about = "Resolve amateur radio callsigns to DXCC entities")]
#[command(version)]
#[command(after_help = "\
Examples:
  dxcc-lookup --provider clublog --file cty.xml GM3ZZA VE1ST/NA14
  dxcc-lookup --config engine.json --date 1995-08-01 T88A
  dxcc-lookup --provider cty_csv --file cty.csv --json KH6/W1AW")]
struct Cli {
    /// JSON engine config (provider, path, ...)
    #[arg(long, short = 'c', conflicts_with_all = ["provider", "file"])]
    config: Option<PathBuf>,

    /// Reference data format: clublog, cty_csv or prefix_list
    #[arg(long, short = 'p', requires = "file")]
    provider: Option<Provider>,

    /// Reference data file
    #[arg(long, short = 'f', requires = "provider")]
    file: Option<PathBuf>,

    /// Date of the contact (YYYY-MM-DD), defaults to today (UTC)
    #[arg(long, short = 'd')]
    date: Option<NaiveDate>,

    /// Resolve as the logging station (MY_* record fields)
    #[arg(long)]
    mine: bool,

    /// Print one JSON object per callsign
    #[arg(long)]
    json: bool,

    /// Callsigns to resolve
    #[arg(required = true)]
    calls: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("dxcc_engine=info"),
    )
    .init();

    let cli = Cli::parse();

    let config = match (&cli.config, cli.provider, &cli.file) {
        (Some(path), _, _) => match EngineConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}: {}", path.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
        (None, Some(provider), Some(file)) => EngineConfig::new(provider, file),
        _ => {
            eprintln!("error: pass --config, or --provider with --file");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let engine = match Engine::load(&config, None) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("error: loading {}: {}", config.path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let date = cli.date.unwrap_or_else(|| Utc::now().date_naive());
    let role = if cli.mine { Role::Mine } else { Role::Theirs };

    for call in &cli.calls {
        let res = engine.resolve(call, date, role);
        if cli.json {
            match serde_json::to_string(&res) {
                Ok(line) => println!("{}", line),
                Err(e) => {
                    eprintln!("error: {}: {}", call, e);
                    return ExitCode::from(EXIT_ERROR);
                }
            }
        } else {
            let fields: Vec<String> = res
                .record_fields()
                .into_iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            println!("{:<14} {:<15} {}", res.call(), res.provenance().as_str(), fields.join(" "));
            log::debug!("{}", res.tip());
        }
    }

    ExitCode::SUCCESS
}
