mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gauntlet_common::Language;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gauntlet-cli")]
#[command(about = "Gauntlet CLI - Run code against test cases in a remote sandbox", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn parse_language(s: &str) -> Result<Language, String> {
    Language::from_str(s).ok_or_else(|| {
        let known: Vec<String> = Language::all_variants().iter().map(|l| l.to_string()).collect();
        format!("unknown language '{}' (expected one of: {})", s, known.join(", "))
    })
}

#[derive(Subcommand)]
enum Commands {
    /// Execute code against a JSON file of test cases
    Run {
        /// Source language (python, javascript, java, cpp)
        #[arg(short, long, value_parser = parse_language)]
        language: Language,

        /// Path to the source file
        #[arg(short, long)]
        code: PathBuf,

        /// Path to a JSON array of {input, expected_output}
        #[arg(short, long)]
        tests: PathBuf,
    },

    /// Execute code once with a single JSON input
    Try {
        #[arg(short, long, value_parser = parse_language)]
        language: Language,

        #[arg(short, long)]
        code: PathBuf,

        /// Input as JSON, e.g. '[2, 3]'
        #[arg(short, long)]
        input: String,

        /// Expected output as JSON (optional)
        #[arg(short, long)]
        expected: Option<String>,
    },

    /// Print the function declarations found in a source file
    Discover {
        #[arg(short, long, value_parser = parse_language)]
        language: Language,

        #[arg(short, long)]
        code: PathBuf,
    },

    /// Print the synthesized harness and stdin payload without executing
    Harness {
        #[arg(short, long, value_parser = parse_language)]
        language: Language,

        #[arg(short, long)]
        code: PathBuf,

        #[arg(short, long)]
        tests: PathBuf,
    },

    /// List configured languages and sandbox runtimes
    Langs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            language,
            code,
            tests,
        } => {
            commands::run_tests(language, &code, &tests).await?;
        }
        Commands::Try {
            language,
            code,
            input,
            expected,
        } => {
            commands::try_input(language, &code, &input, expected.as_deref()).await?;
        }
        Commands::Discover { language, code } => {
            commands::discover(language, &code)?;
        }
        Commands::Harness {
            language,
            code,
            tests,
        } => {
            commands::print_harness(language, &code, &tests)?;
        }
        Commands::Langs => {
            commands::list_languages()?;
        }
    }

    Ok(())
}
