use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::grammar::{Grammar, SeparatorMode};
use crate::utils::{GrammarError, Result};

/// The result of one successful generate call
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    /// The accepted string, end marker included
    pub text: String,
    /// Whole-derivation attempts consumed by this call
    pub attempts: u64,
    /// Recursive expansion calls in the attempt that succeeded
    pub steps: u64,
    /// Wall time for the whole call, retries included
    pub elapsed: Duration,
}

/// Produces random strings derivable from a grammar symbol.
///
/// Each call runs bounded derivations until one comes out strictly shorter
/// than the grammar's `max_length`; over-length attempts are discarded and
/// retried, up to `max_attempts`. Branches deeper than `max_depth` expand to
/// the empty string, so a single derivation always terminates; the length
/// check is what filters the short or truncated strings this can produce.
///
/// The randomness source is injected, so tests can seed it for
/// reproducibility.
#[derive(Debug)]
pub struct Generator<'g, R: Rng = StdRng> {
    grammar: &'g Grammar,
    rng: R,
    attempts_total: u64,
    steps_total: u64,
}

impl<'g> Generator<'g, StdRng> {
    /// Create a generator with an entropy-seeded RNG
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_rng(grammar, StdRng::from_entropy())
    }

    /// Create a deterministic generator for reproducible output
    pub fn seeded(grammar: &'g Grammar, seed: u64) -> Self {
        Self::with_rng(grammar, StdRng::seed_from_u64(seed))
    }
}

impl<'g, R: Rng> Generator<'g, R> {
    /// Create a generator with a caller-supplied randomness source
    pub fn with_rng(grammar: &'g Grammar, rng: R) -> Self {
        Generator {
            grammar,
            rng,
            attempts_total: 0,
            steps_total: 0,
        }
    }

    /// Generate a string derivable from the grammar's start symbol
    pub fn generate(&mut self) -> Result<GenerationOutcome> {
        let grammar = self.grammar;
        self.generate_from(grammar.start_symbol())
    }

    /// Generate a string derivable from `symbol`.
    ///
    /// A symbol that is neither a terminal nor a rule key expands to the
    /// empty string rather than failing.
    pub fn generate_from(&mut self, symbol: &str) -> Result<GenerationOutcome> {
        let max_attempts = self.grammar.config().max_attempts;
        let max_length = self.grammar.config().max_length;
        let started = Instant::now();

        let mut attempts = 0u64;
        loop {
            if attempts >= max_attempts {
                return Err(GrammarError::GenerationBudgetExhausted { attempts });
            }
            attempts += 1;
            self.attempts_total += 1;

            let mut steps = 0u64;
            let candidate = self.expand(symbol, 0, &mut steps);
            self.steps_total += steps;

            if candidate.chars().count() < max_length {
                let mut text = candidate;
                text.push_str(&self.grammar.config().end_marker);
                return Ok(GenerationOutcome {
                    text,
                    attempts,
                    steps,
                    elapsed: started.elapsed(),
                });
            }
        }
    }

    /// Derivation attempts consumed over this generator's lifetime
    pub fn attempts(&self) -> u64 {
        self.attempts_total
    }

    /// Expansion steps performed over this generator's lifetime
    pub fn steps(&self) -> u64 {
        self.steps_total
    }

    /// One bounded derivation of `symbol`
    fn expand(&mut self, symbol: &str, depth: usize, steps: &mut u64) -> String {
        *steps += 1;
        let grammar = self.grammar;

        if depth > grammar.config().max_depth {
            return String::new();
        }
        if grammar.is_terminal(symbol) {
            return symbol.to_string();
        }
        let Some(alternatives) = grammar.alternatives(symbol) else {
            // Unknown symbols expand to nothing
            return String::new();
        };

        let chosen = &alternatives[self.rng.gen_range(0..alternatives.len())];
        let mut result = String::new();
        for sym in &chosen.symbols {
            let piece = self.expand(sym, depth + 1, steps);
            // A depth-cut branch contributes nothing, and no separator
            if piece.is_empty() {
                continue;
            }
            if grammar.config().separator == SeparatorMode::Spaced && !result.is_empty() {
                result.push(' ');
            }
            result.push_str(&piece);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarConfig;

    fn balanced_grammar(max_depth: usize, max_length: usize) -> Grammar {
        Grammar::builder()
            .terminals(["a", "b"])
            .rule("S", ["a", "S", "b"])
            .rule("S", ["a", "b"])
            .config(GrammarConfig {
                max_depth,
                max_length,
                ..GrammarConfig::default()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let grammar = balanced_grammar(5, 50);
        let a = Generator::seeded(&grammar, 7).generate().unwrap();
        let b = Generator::seeded(&grammar, 7).generate().unwrap();
        assert_eq!(a.text, b.text);
        assert_eq!(a.steps, b.steps);
    }

    #[test]
    fn test_end_marker_is_appended() {
        let grammar = Grammar::builder()
            .terminal("hi")
            .rule("S", ["hi"])
            .build()
            .unwrap();
        let outcome = Generator::seeded(&grammar, 0).generate().unwrap();
        assert_eq!(outcome.text, "hi.");
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn test_balanced_output_stays_balanced() {
        let grammar = balanced_grammar(5, 50);
        let mut generator = Generator::seeded(&grammar, 123);

        for _ in 0..50 {
            let outcome = generator.generate().unwrap();
            let body = outcome.text.strip_suffix('.').unwrap();
            let tokens: Vec<&str> = body.split_whitespace().collect();

            // a^n b^n with nesting bounded by the depth limit
            assert!(!tokens.is_empty());
            assert_eq!(tokens.len() % 2, 0);
            let n = tokens.len() / 2;
            assert!(n <= 5);
            assert!(tokens[..n].iter().all(|t| *t == "a"));
            assert!(tokens[n..].iter().all(|t| *t == "b"));
        }
    }

    #[test]
    fn test_over_length_output_exhausts_budget() {
        // Every derivation is at least 5 characters, the bound is 3
        let grammar = Grammar::builder()
            .terminal("x")
            .rule("S", ["x", "x", "x"])
            .config(GrammarConfig {
                max_length: 3,
                max_attempts: 10,
                ..GrammarConfig::default()
            })
            .build()
            .unwrap();

        let result = Generator::seeded(&grammar, 1).generate();
        assert!(matches!(
            result,
            Err(GrammarError::GenerationBudgetExhausted { attempts: 10 })
        ));
    }

    #[test]
    fn test_unknown_symbol_expands_to_nothing() {
        let grammar = Grammar::builder()
            .terminal("a")
            .rule("S", ["a"])
            .build()
            .unwrap();
        let outcome = Generator::seeded(&grammar, 0)
            .generate_from("nonsense")
            .unwrap();
        assert_eq!(outcome.text, ".");
    }

    #[test]
    fn test_depth_cut_leaves_no_double_spaces() {
        // Force deep recursion so some branches get cut
        let grammar = balanced_grammar(3, 50);
        let mut generator = Generator::seeded(&grammar, 99);
        for _ in 0..50 {
            let outcome = generator.generate().unwrap();
            assert!(!outcome.text.contains("  "), "got `{}`", outcome.text);
        }
    }

    #[test]
    fn test_compact_mode_concatenates() {
        let grammar = Grammar::builder()
            .terminals(["a", "+", "b"])
            .rule("E", ["a", "+", "b"])
            .config(GrammarConfig {
                separator: SeparatorMode::Compact,
                end_marker: String::new(),
                ..GrammarConfig::default()
            })
            .build()
            .unwrap();
        let outcome = Generator::seeded(&grammar, 0).generate().unwrap();
        assert_eq!(outcome.text, "a+b");
    }

    #[test]
    fn test_cyclic_grammar_still_terminates() {
        // No alternative ever reaches a terminal; the depth cut collapses
        // every branch to the empty string
        let grammar = Grammar::builder()
            .rule("R", ["R", "R"])
            .build()
            .unwrap();
        let outcome = Generator::seeded(&grammar, 0).generate().unwrap();
        assert_eq!(outcome.text, ".");
        assert!(outcome.steps > 0);
    }

    #[test]
    fn test_cumulative_counters() {
        let grammar = balanced_grammar(5, 50);
        let mut generator = Generator::seeded(&grammar, 5);

        let first = generator.generate().unwrap();
        let after_one = generator.attempts();
        assert!(after_one >= first.attempts);
        assert!(generator.steps() >= first.steps);

        generator.generate().unwrap();
        assert!(generator.attempts() > after_one);
    }
}
