use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use cfg_gen::{Generator, Grammar, GrammarConfig, GrammarLoader, Matcher, SeparatorMode};

/// Context-free grammar engine: generate random strings and test membership
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the grammar file
    #[arg(help = "Path to the grammar file")]
    grammar_file: Option<PathBuf>,

    /// Number of strings to generate
    #[arg(help = "Number of strings to generate", default_value = "1")]
    count: Option<usize>,

    /// Starting non-terminal (defaults to the grammar's start symbol)
    #[arg(long)]
    start: Option<String>,

    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Treat every character of a rule as one symbol and join output
    /// without spaces
    #[arg(long)]
    compact: bool,

    /// Maximum recursion depth per derivation
    #[arg(long, default_value = "10")]
    max_depth: usize,

    /// Maximum derivation retries per generated string
    #[arg(long, default_value = "10000")]
    max_attempts: u64,

    /// Generation length bound; accepted strings are strictly shorter
    /// (a length field in the grammar's env line overrides this)
    #[arg(long)]
    max_length: Option<usize>,

    /// Marker appended to every generated string
    /// (a marker field in the grammar's env line overrides this)
    #[arg(long)]
    end_marker: Option<String>,

    /// Feed each generated string back through the matcher
    #[arg(long)]
    validate: bool,

    /// Emit outcomes as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Test whether a string is derivable from the grammar
    Check {
        /// Path to the grammar file
        grammar_file: PathBuf,

        /// The string to test
        text: String,

        /// Starting non-terminal (defaults to the grammar's start symbol)
        #[arg(long)]
        start: Option<String>,

        /// Character-level grammar mode
        #[arg(long)]
        compact: bool,

        /// Emit the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write an example grammar file
    Example {
        /// Output file path
        output: Option<PathBuf>,
    },
}

const EXAMPLE_GRAMMAR: &str = "\
# Example word-level grammar
G = {the, dog, cat, chases, sees} {S, NP, VP, N, V}
env: S|50|.

Pn:
S -> NP VP
NP -> the N
VP -> V NP
N -> dog | cat
V -> chases | sees
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        match command {
            Commands::Check {
                grammar_file,
                text,
                start,
                compact,
                json,
            } => {
                let config = build_config(
                    compact,
                    cli.max_depth,
                    cli.max_attempts,
                    cli.max_length,
                    cli.end_marker,
                );
                let (grammar, warnings) = load(&grammar_file, config)?;
                for warning in &warnings {
                    eprintln!("warning: {}", warning);
                }
                let mut matcher = Matcher::new(&grammar);
                let outcome = match start {
                    Some(symbol) => matcher.is_valid_from(&symbol, &text),
                    None => matcher.is_valid(&text),
                };
                if json {
                    println!("{}", serde_json::to_string(&outcome)?);
                } else if outcome.valid {
                    println!("valid ({} steps)", outcome.steps);
                } else {
                    println!("not valid ({} steps)", outcome.steps);
                }
                return Ok(());
            }
            Commands::Example { output } => {
                let path = output.unwrap_or_else(|| PathBuf::from("example_grammar.txt"));
                fs::write(&path, EXAMPLE_GRAMMAR)?;
                println!("Created example grammar at: {}", path.display());
                return Ok(());
            }
        }
    }

    let grammar_file = cli.grammar_file.ok_or("Grammar file path required")?;
    let count = cli.count.unwrap_or(1);

    let config = build_config(
        cli.compact,
        cli.max_depth,
        cli.max_attempts,
        cli.max_length,
        cli.end_marker,
    );
    let (grammar, warnings) = load(&grammar_file, config)?;
    for warning in &warnings {
        eprintln!("warning: {}", warning);
    }
    println!("Loaded {} rules.", grammar.rules().len());

    let mut generator = match cli.seed {
        Some(seed) => Generator::seeded(&grammar, seed),
        None => Generator::new(&grammar),
    };
    let mut matcher = Matcher::new(&grammar);

    for i in 0..count {
        let outcome = match &cli.start {
            Some(symbol) => generator.generate_from(symbol)?,
            None => generator.generate()?,
        };

        if cli.json {
            println!("{}", serde_json::to_string(&outcome)?);
        } else {
            println!(
                "{}. {}  (attempts: {}, steps: {}, {:.6}s)",
                i + 1,
                outcome.text,
                outcome.attempts,
                outcome.steps,
                outcome.elapsed.as_secs_f64()
            );
        }

        if cli.validate {
            let body = outcome
                .text
                .strip_suffix(grammar.config().end_marker.as_str())
                .unwrap_or(&outcome.text);
            let verdict = match &cli.start {
                Some(symbol) => matcher.is_valid_from(symbol, body),
                None => matcher.is_valid(body),
            };
            println!("   valid: {} ({} steps)", verdict.valid, verdict.steps);
        }
    }

    Ok(())
}

fn build_config(
    compact: bool,
    max_depth: usize,
    max_attempts: u64,
    max_length: Option<usize>,
    end_marker: Option<String>,
) -> GrammarConfig {
    let mut config = GrammarConfig {
        separator: if compact {
            SeparatorMode::Compact
        } else {
            SeparatorMode::Spaced
        },
        max_depth,
        max_attempts,
        ..GrammarConfig::default()
    };
    if let Some(max_length) = max_length {
        config.max_length = max_length;
    }
    if let Some(end_marker) = end_marker {
        config.end_marker = end_marker;
    }
    config
}

fn load(
    path: &PathBuf,
    config: GrammarConfig,
) -> Result<(Grammar, Vec<String>), Box<dyn std::error::Error>> {
    let mut loader = GrammarLoader::with_config(config);
    let grammar = loader.load_file(path)?;
    Ok((grammar, loader.warnings().to_vec()))
}
