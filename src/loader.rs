use std::fs;
use std::path::Path;

use regex::Regex;

use crate::grammar::{Grammar, GrammarConfig, SeparatorMode};
use crate::utils::{GrammarError, Result};

/// The section of the grammar file currently being read.
///
/// The format is line-oriented: a `G` line declares the alphabet, an `env:`
/// line overrides start symbol / length bound / end marker, and `Pn:` / `Pt:`
/// headers open the non-terminal and terminal rule sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Alphabet,
    Env,
    NonTerminalRules,
    TerminalRules,
}

/// Parses the line-oriented grammar format into a [`Grammar`].
///
/// The separator mode is chosen explicitly by the caller, never inferred
/// from rule content: word-level grammars list whitespace-separated symbols
/// on each right-hand side, character-level grammars treat every
/// non-whitespace character as one symbol.
///
/// The loader never prints or logs; comment lines and diagnostics are
/// collected and exposed through [`comments`](GrammarLoader::comments) and
/// [`warnings`](GrammarLoader::warnings) after a load.
#[derive(Debug)]
pub struct GrammarLoader {
    config: GrammarConfig,
    comments: Vec<String>,
    warnings: Vec<String>,
}

impl GrammarLoader {
    /// Create a loader with default configuration and the given separator mode
    pub fn new(separator: SeparatorMode) -> Self {
        GrammarLoader {
            config: GrammarConfig {
                separator,
                ..GrammarConfig::default()
            },
            comments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Create a loader with a full base configuration; `env:` fields in the
    /// file still override `max_length` and `end_marker`
    pub fn with_config(config: GrammarConfig) -> Self {
        GrammarLoader {
            config,
            comments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Load a grammar from a file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Grammar> {
        let source = path.as_ref().display().to_string();
        let text = fs::read_to_string(path)?;
        self.parse(&text, &source)
    }

    /// Load a grammar from an in-memory string
    pub fn load_str(&mut self, text: &str) -> Result<Grammar> {
        self.parse(text, "<input>")
    }

    /// Comment lines captured by the most recent load
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Diagnostics captured by the most recent load
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn parse(&mut self, text: &str, source: &str) -> Result<Grammar> {
        self.comments.clear();
        self.warnings.clear();

        let brace_group = Regex::new(r"\{([^}]*)\}").unwrap();
        let rule_line = Regex::new(r"^(.+?)->(.*)$").unwrap();

        let mut section = Section::Preamble;
        let mut config = self.config.clone();
        let mut terminals: Vec<String> = Vec::new();
        let mut declared_non_terminals: Vec<String> = Vec::new();
        // Flat (lhs, alternative) pairs in file order, so per-key alternative
        // order is stable for seeded tests
        let mut rules: Vec<(String, Vec<String>)> = Vec::new();
        let mut first_pn_lhs: Option<String> = None;
        let mut env_start: Option<String> = None;
        let mut saw_terminal_section = false;
        let mut terminal_rule_count = 0usize;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') {
                if !line.is_empty() {
                    self.comments.push(line.to_string());
                }
                continue;
            }

            // Section headers take precedence over section content
            if line.starts_with("env:") {
                section = Section::Env;
                read_env(&mut config, &line[4..], line_no, &mut env_start)?;
                continue;
            }
            if line.starts_with('G') && line.contains('{') {
                section = Section::Alphabet;
                let groups: Vec<String> = brace_group
                    .captures_iter(line)
                    .map(|c| c[1].to_string())
                    .collect();
                if groups.len() < 2 {
                    return Err(GrammarError::Parse {
                        line: line_no,
                        message: "alphabet line needs {terminals} and {non-terminals}"
                            .to_string(),
                    });
                }
                terminals = split_alphabet(&groups[0]);
                declared_non_terminals = split_alphabet(&groups[1]);
                continue;
            }
            if line.starts_with("Pn:") {
                section = Section::NonTerminalRules;
                continue;
            }
            if line.starts_with("Pt:") {
                section = Section::TerminalRules;
                saw_terminal_section = true;
                continue;
            }

            match section {
                Section::NonTerminalRules | Section::TerminalRules => {
                    let captures =
                        rule_line.captures(line).ok_or_else(|| GrammarError::Parse {
                            line: line_no,
                            message: format!("expected `LHS -> RHS | ...`, got `{}`", line),
                        })?;
                    let lhs = captures[1].trim().to_string();
                    for rhs in captures[2].split('|') {
                        rules.push((lhs.clone(), self.split_rhs(rhs)));
                    }
                    if section == Section::NonTerminalRules {
                        if first_pn_lhs.is_none() {
                            first_pn_lhs = Some(lhs);
                        }
                    } else {
                        terminal_rule_count += 1;
                    }
                }
                Section::Preamble | Section::Alphabet | Section::Env => {
                    return Err(GrammarError::Parse {
                        line: line_no,
                        message: format!("unexpected line outside a rule section: `{}`", line),
                    });
                }
            }
        }

        if rules.is_empty() {
            return Err(GrammarError::NoProductionRules(source.to_string()));
        }
        if saw_terminal_section && terminal_rule_count == 0 {
            self.warnings
                .push("terminal rule section `Pt:` declared but empty".to_string());
        }

        let mut builder = Grammar::builder().terminals(terminals).config(config);
        for (lhs, symbols) in rules {
            builder = builder.rule(&lhs, symbols);
        }
        if let Some(start) = env_start.or(first_pn_lhs) {
            builder = builder.start_symbol(&start);
        }
        let grammar = builder.build()?;

        self.check_rhs_symbols(&grammar, &declared_non_terminals);
        Ok(grammar)
    }

    /// Split one right-hand-side alternative into symbols according to the
    /// separator mode
    fn split_rhs(&self, rhs: &str) -> Vec<String> {
        match self.config.separator {
            SeparatorMode::Spaced => rhs.split_whitespace().map(str::to_string).collect(),
            SeparatorMode::Compact => rhs
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect(),
        }
    }

    /// Right-hand-side symbols that are neither terminals nor rule keys
    /// expand to the empty string; surface them so a typo in a grammar file
    /// is visible instead of silently shrinking the language
    fn check_rhs_symbols(&mut self, grammar: &Grammar, declared: &[String]) {
        let mut unknown: Vec<&str> = Vec::new();
        for productions in grammar.rules().values() {
            for production in productions {
                for symbol in &production.symbols {
                    if !grammar.is_terminal(symbol)
                        && !grammar.has_non_terminal(symbol)
                        && !unknown.contains(&symbol.as_str())
                    {
                        unknown.push(symbol);
                    }
                }
            }
        }
        unknown.sort_unstable();
        for symbol in unknown {
            let hint = if declared.iter().any(|d| d == symbol) {
                " (declared in the alphabet but has no rules)"
            } else {
                ""
            };
            self.warnings.push(format!(
                "symbol `{}` is neither a terminal nor a non-terminal; it expands to nothing{}",
                symbol, hint
            ));
        }
    }
}

/// `env: start|max_length|end_marker`; empty fields keep the defaults
fn read_env(
    config: &mut GrammarConfig,
    rest: &str,
    line_no: usize,
    env_start: &mut Option<String>,
) -> Result<()> {
    let parts: Vec<&str> = rest.split('|').collect();
    if let Some(start) = parts.first() {
        let start = start.trim();
        if !start.is_empty() {
            *env_start = Some(start.to_string());
        }
    }
    if let Some(len) = parts.get(1) {
        let len = len.trim();
        if !len.is_empty() {
            config.max_length = len.parse::<usize>().map_err(|_| GrammarError::Parse {
                line: line_no,
                message: format!("invalid length bound `{}`", len),
            })?;
        }
    }
    if let Some(marker) = parts.get(2) {
        let marker = marker.trim();
        if !marker.is_empty() {
            config.end_marker = marker.to_string();
        }
    }
    Ok(())
}

fn split_alphabet(group: &str) -> Vec<String> {
    group
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_GRAMMAR: &str = "\
# balanced pairs
G = {a, b} {S}
env: S|50|.

Pn:
S -> a S b | a b
";

    #[test]
    fn test_load_word_grammar() {
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        let grammar = loader.load_str(WORD_GRAMMAR).unwrap();

        assert_eq!(grammar.start_symbol(), "S");
        assert_eq!(grammar.config().max_length, 50);
        assert_eq!(grammar.config().end_marker, ".");
        assert!(grammar.is_terminal("a"));
        assert!(grammar.is_terminal("b"));

        let prods = grammar.productions_for("S").unwrap();
        assert_eq!(prods.len(), 2);
        assert_eq!(prods[0].symbols, vec!["a", "S", "b"]);
        assert_eq!(prods[1].symbols, vec!["a", "b"]);

        assert_eq!(loader.comments(), ["# balanced pairs"]);
        assert!(loader.warnings().is_empty());
    }

    #[test]
    fn test_compact_mode_splits_characters() {
        let text = "\
G = {a, b, +} {E}
Pn:
E -> E+E | ab
";
        let mut loader = GrammarLoader::new(SeparatorMode::Compact);
        let grammar = loader.load_str(text).unwrap();

        let prods = grammar.productions_for("E").unwrap();
        assert_eq!(prods[0].symbols, vec!["E", "+", "E"]);
        assert_eq!(prods[1].symbols, vec!["a", "b"]);
    }

    #[test]
    fn test_env_overrides_and_empty_fields() {
        let text = "\
G = {a} {S, T}
env: T||!
Pn:
S -> a
T -> a a
";
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        let grammar = loader.load_str(text).unwrap();

        assert_eq!(grammar.start_symbol(), "T");
        // empty length field keeps the default
        assert_eq!(grammar.config().max_length, 50);
        assert_eq!(grammar.config().end_marker, "!");
    }

    #[test]
    fn test_first_pn_rule_is_default_start() {
        let text = "\
G = {x} {A, B}
Pn:
B -> x
A -> x x
";
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        let grammar = loader.load_str(text).unwrap();
        assert_eq!(grammar.start_symbol(), "B");
    }

    #[test]
    fn test_terminal_rules_join_the_rule_map() {
        let text = "\
G = {num} {E}
Pn:
E -> num
Pt:
num -> 1 | 2
";
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        let grammar = loader.load_str(text).unwrap();

        assert!(grammar.has_non_terminal("num"));
        assert_eq!(grammar.productions_for("num").unwrap().len(), 2);
        // start stays with the first Pn rule
        assert_eq!(grammar.start_symbol(), "E");
    }

    #[test]
    fn test_no_rules_is_an_error() {
        let text = "\
G = {a} {S}
";
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        let result = loader.load_str(text);
        assert!(matches!(result, Err(GrammarError::NoProductionRules(_))));
    }

    #[test]
    fn test_empty_terminal_section_warns() {
        let text = "\
G = {a} {S}
Pn:
S -> a
Pt:
";
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        loader.load_str(text).unwrap();
        assert!(loader.warnings().iter().any(|w| w.contains("Pt:")));
    }

    #[test]
    fn test_unknown_rhs_symbol_warns() {
        let text = "\
G = {a} {S}
Pn:
S -> a missing
";
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        loader.load_str(text).unwrap();
        assert!(loader.warnings().iter().any(|w| w.contains("`missing`")));
    }

    #[test]
    fn test_bad_length_bound() {
        let text = "\
G = {a} {S}
env: S|lots|.
Pn:
S -> a
";
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        let result = loader.load_str(text);
        assert!(matches!(result, Err(GrammarError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_rule_line_outside_section() {
        let text = "S -> a\n";
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        let result = loader.load_str(text);
        assert!(matches!(result, Err(GrammarError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_malformed_rule_line() {
        let text = "\
G = {a} {S}
Pn:
S is a
";
        let mut loader = GrammarLoader::new(SeparatorMode::Spaced);
        let result = loader.load_str(text);
        assert!(matches!(result, Err(GrammarError::Parse { line: 3, .. })));
    }
}
