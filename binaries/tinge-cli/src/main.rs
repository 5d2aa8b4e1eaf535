//! Tinge CLI
//!
//! Issue and redeem traces from the command line.
//! Logs go to stderr, records to stdout as JSON.

use clap::{Parser, Subcommand};
use serde::Serialize;
use tinge_core::{DecodeRequest, EncodeRequest, Tinge, TingeConfig};

#[derive(Parser)]
#[command(name = "tinge")]
#[command(about = "Short public traces standing in for a secret derived from factors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a trace for a list of factors
    Encode {
        /// Factor (repeat for each one)
        #[arg(short, long = "factor", required = true)]
        factors: Vec<String>,

        /// Trace length
        #[arg(short, long)]
        length: Option<usize>,

        /// Obfuscation salt
        #[arg(long)]
        salt: Option<String>,

        /// Obfuscation alphabet
        #[arg(long)]
        dictionary: Option<String>,

        /// Embed the window bounds in the trace
        #[arg(long)]
        indexed: bool,
    },

    /// Redeem a trace against its setting
    Decode {
        code: String,
        setting: String,
    },

    /// Feed a raw JSON option record through the protocol
    Run {
        /// e.g. '{"factor": ["a", "b"], "indexed": true}'
        option: String,
    },

    /// Encode then decode the ballpen example
    Demo {
        #[arg(short, long, default_value = "3")]
        rounds: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tinge_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut tinge = Tinge::new(TingeConfig::from_env());

    match cli.command {
        Commands::Encode {
            factors,
            length,
            salt,
            dictionary,
            indexed,
        } => {
            let request = EncodeRequest {
                factor: factors,
                length,
                salt,
                dictionary,
                indexed,
            };
            print_json(&tinge.encode(&request)?)
        }
        Commands::Decode { code, setting } => {
            print_json(&tinge.decode(&DecodeRequest::new(code, setting))?)
        }
        Commands::Run { option } => {
            let value: serde_json::Value = serde_json::from_str(&option)?;
            print_json(&tinge.tinge_value(&value)?)
        }
        Commands::Demo { rounds } => demo(&mut tinge, rounds),
    }
}

#[derive(Serialize)]
struct Round {
    round: usize,
    code: String,
    hash: String,
    recovered: bool,
}

fn demo(tinge: &mut Tinge, rounds: usize) -> anyhow::Result<()> {
    let request = EncodeRequest::new(["ballpen-item", "Ballpen Item"]).indexed(true);

    let mut report = Vec::with_capacity(rounds);
    for round in 1..=rounds {
        let encoded = tinge.encode(&request)?;
        let decoded = tinge.decode(&encoded.to_decode_request())?;
        let recovered = decoded.hash == encoded.hash;
        tracing::debug!(round, recovered, "demo round");

        report.push(Round {
            round,
            recovered,
            code: encoded.code,
            hash: decoded.hash,
        });
    }

    let failed = report.iter().filter(|round| !round.recovered).count();
    print_json(&report)?;

    if failed > 0 {
        anyhow::bail!("{} of {} rounds did not recover the hash", failed, rounds);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
