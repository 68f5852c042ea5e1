use std::io;
use thiserror::Error;

/// Custom error types for the grammar engine
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Grammar has no production rules")]
    EmptyGrammar,

    #[error("No production rules found in {0}")]
    NoProductionRules(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Generation budget exhausted after {attempts} attempts")]
    GenerationBudgetExhausted { attempts: u64 },
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;
