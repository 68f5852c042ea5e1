use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::utils::{GrammarError, Result};

/// One right-hand-side alternative for a non-terminal.
///
/// An empty symbol sequence is a legal epsilon alternative; the matcher's
/// empty-production base case relies on it being representable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    /// The ordered sequence of symbols in this alternative
    pub symbols: Vec<String>,
}

impl Production {
    /// Create a production from anything yielding symbol strings
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Production {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

/// How expansion pieces are joined into output text.
///
/// Word-level grammars join pieces with a single space; character-level
/// grammars (e.g. arithmetic expressions over single characters) concatenate
/// with no separator. The mode is fixed at construction time and never
/// inferred from rule content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeparatorMode {
    /// Join expansion pieces with a single space
    Spaced,
    /// Concatenate expansion pieces with no separator
    Compact,
}

/// Configuration options fixed when a grammar is constructed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarConfig {
    /// Separator policy for generated text
    pub separator: SeparatorMode,
    /// Maximum recursion depth for a single derivation; deeper branches
    /// expand to the empty string
    pub max_depth: usize,
    /// Accepted generated strings must be strictly shorter than this
    /// (in characters, before the end marker is appended)
    pub max_length: usize,
    /// Cap on whole-derivation retries per generate call; exceeding it is a
    /// `GenerationBudgetExhausted` error, so generation always terminates
    pub max_attempts: u64,
    /// Appended to every accepted generated string; may be empty
    pub end_marker: String,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            separator: SeparatorMode::Spaced,
            max_depth: 10,
            max_length: 50,
            max_attempts: 10_000,
            end_marker: ".".to_string(),
        }
    }
}

/// A context-free grammar: terminal alphabet, production rules, start symbol
/// and generation bounds.
///
/// Immutable once built; the generator and matcher only borrow it. Symbols
/// are classified at lookup time: a member of the terminal set matches
/// itself literally, a key of the rule map must be expanded, and anything
/// else expands to the empty string (a deliberate leniency, not a defect).
#[derive(Debug, Clone)]
pub struct Grammar {
    /// The terminal alphabet
    terminals: HashSet<String>,
    /// Production rules mapping non-terminals to their alternatives
    rules: HashMap<String, Vec<Production>>,
    /// The default starting symbol for generation and matching
    start_symbol: String,
    /// Configuration options
    config: GrammarConfig,
}

impl Grammar {
    /// Start building a grammar
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    /// Whether `symbol` is a member of the terminal alphabet
    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.terminals.contains(symbol)
    }

    /// Whether `symbol` has registered production rules
    pub fn has_non_terminal(&self, symbol: &str) -> bool {
        self.rules.contains_key(symbol)
    }

    /// The production alternatives of a registered non-terminal
    pub fn productions_for(&self, symbol: &str) -> Result<&[Production]> {
        self.rules
            .get(symbol)
            .map(Vec::as_slice)
            .ok_or_else(|| GrammarError::UnknownSymbol(symbol.to_string()))
    }

    /// Infallible rule lookup for the generation/matching hot paths
    pub(crate) fn alternatives(&self, symbol: &str) -> Option<&[Production]> {
        self.rules.get(symbol).map(Vec::as_slice)
    }

    /// Get the start symbol
    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    /// Get a reference to the grammar's configuration
    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    /// Get a reference to the grammar's rules
    pub fn rules(&self) -> &HashMap<String, Vec<Production>> {
        &self.rules
    }

    /// Get a reference to the terminal alphabet
    pub fn terminals(&self) -> &HashSet<String> {
        &self.terminals
    }
}

/// Builder for constructing validated [`Grammar`] instances
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    terminals: HashSet<String>,
    rules: HashMap<String, Vec<Production>>,
    start_symbol: Option<String>,
    first_rule: Option<String>,
    config: GrammarConfig,
}

impl GrammarBuilder {
    /// Create a new empty builder with default configuration
    pub fn new() -> Self {
        GrammarBuilder {
            terminals: HashSet::new(),
            rules: HashMap::new(),
            start_symbol: None,
            first_rule: None,
            config: GrammarConfig::default(),
        }
    }

    /// Add a single terminal to the alphabet
    pub fn terminal(mut self, symbol: &str) -> Self {
        self.terminals.insert(symbol.to_string());
        self
    }

    /// Add several terminals to the alphabet
    pub fn terminals<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terminals.extend(symbols.into_iter().map(Into::into));
        self
    }

    /// Add one production alternative for `non_terminal`.
    ///
    /// The first rule added becomes the default start symbol unless one is
    /// set explicitly.
    pub fn rule<I, S>(mut self, non_terminal: &str, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.first_rule.is_none() {
            self.first_rule = Some(non_terminal.to_string());
        }
        self.rules
            .entry(non_terminal.to_string())
            .or_default()
            .push(Production::new(symbols));
        self
    }

    /// Set the start symbol explicitly
    pub fn start_symbol(mut self, symbol: &str) -> Self {
        self.start_symbol = Some(symbol.to_string());
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: GrammarConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate and build the grammar.
    ///
    /// Fails with `EmptyGrammar` when no rules were added and with
    /// `UnknownSymbol` when the start symbol is not a rule key.
    pub fn build(self) -> Result<Grammar> {
        if self.rules.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }

        // first_rule is Some whenever rules is non-empty
        let start_symbol = match self.start_symbol.or(self.first_rule) {
            Some(s) => s,
            None => return Err(GrammarError::EmptyGrammar),
        };

        if !self.rules.contains_key(&start_symbol) {
            return Err(GrammarError::UnknownSymbol(start_symbol));
        }

        Ok(Grammar {
            terminals: self.terminals,
            rules: self.rules,
            start_symbol,
            config: self.config,
        })
    }
}
