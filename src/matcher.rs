use serde::Serialize;

use crate::grammar::{Grammar, SeparatorMode};

/// The result of one membership query
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MatchOutcome {
    /// Whether the text is derivable from the queried symbol
    pub valid: bool,
    /// Recursive match calls performed, backtracking included
    pub steps: u64,
}

/// Decides membership of a string in the language of a grammar symbol.
///
/// Recursive descent with backtracking over split points: a non-terminal at
/// the head of a production is tried against every non-empty prefix of the
/// remaining text. There is no memoization, so overlapping sub-splits are
/// recomputed and the worst case is exponential. Recursion is bounded by a
/// per-query depth budget of `text length + 10`, a heuristic with enough
/// slack for the shallow grammars this engine targets; running out of budget
/// is a plain mismatch, never an error.
#[derive(Debug)]
pub struct Matcher<'g> {
    grammar: &'g Grammar,
    steps_total: u64,
}

/// Slack added to the text length when initializing the depth budget
const BUDGET_SLACK: usize = 10;

impl<'g> Matcher<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Matcher {
            grammar,
            steps_total: 0,
        }
    }

    /// Test whether `text` is derivable from the grammar's start symbol
    pub fn is_valid(&mut self, text: &str) -> MatchOutcome {
        let grammar = self.grammar;
        self.is_valid_from(grammar.start_symbol(), text)
    }

    /// Test whether `text` is derivable from `symbol`.
    ///
    /// A symbol without rules (a terminal, or an unknown) matches only the
    /// exact literal text.
    pub fn is_valid_from(&mut self, symbol: &str, text: &str) -> MatchOutcome {
        let mut steps = 0u64;
        let budget = text.chars().count() + BUDGET_SLACK;
        let valid = self.match_symbol(symbol, text, budget, &mut steps);
        self.steps_total += steps;
        MatchOutcome { valid, steps }
    }

    /// Match calls performed over this matcher's lifetime
    pub fn steps(&self) -> u64 {
        self.steps_total
    }

    fn match_symbol(&self, symbol: &str, text: &str, budget: usize, steps: &mut u64) -> bool {
        *steps += 1;
        if budget == 0 {
            return false;
        }
        let Some(alternatives) = self.grammar.alternatives(symbol) else {
            return symbol == text;
        };
        for production in alternatives {
            if self.match_production(&production.symbols, text, budget - 1, steps) {
                return true;
            }
        }
        false
    }

    fn match_production(
        &self,
        symbols: &[String],
        text: &str,
        budget: usize,
        steps: &mut u64,
    ) -> bool {
        *steps += 1;
        if symbols.is_empty() {
            return text.is_empty();
        }
        if text.is_empty() {
            return false;
        }

        let head = &symbols[0];
        let rest = &symbols[1..];
        let budget = budget.saturating_sub(1);

        if self.grammar.has_non_terminal(head) {
            // Backtracking point: try every split of the text between the
            // head and the rest of the production
            for (prefix_end, rest_start) in self.split_points(text) {
                if self.match_symbol(head, &text[..prefix_end], budget, steps)
                    && self.match_production(rest, &text[rest_start..], budget, steps)
                {
                    return true;
                }
            }
            false
        } else {
            match self.consume_literal(head, text) {
                Some(remainder) => self.match_production(rest, remainder, budget, steps),
                None => false,
            }
        }
    }

    /// All positions where the text may be split between a leading
    /// non-terminal and the rest of a production. Prefixes are never empty:
    /// a leading space is not a boundary. In spaced mode symbols never
    /// contain whitespace, so only token boundaries can ever match and the
    /// separating space is consumed by the split; in compact mode every
    /// character boundary is a candidate.
    fn split_points(&self, text: &str) -> Vec<(usize, usize)> {
        let mut points = Vec::new();
        match self.grammar.config().separator {
            SeparatorMode::Spaced => {
                for (i, ch) in text.char_indices() {
                    if ch == ' ' && i > 0 {
                        points.push((i, i + 1));
                    }
                }
            }
            SeparatorMode::Compact => {
                for (i, _) in text.char_indices().skip(1) {
                    points.push((i, i));
                }
            }
        }
        points.push((text.len(), text.len()));
        points
    }

    /// Consume a literal head symbol from the front of the text, including
    /// the following separator in spaced mode
    fn consume_literal<'t>(&self, literal: &str, text: &'t str) -> Option<&'t str> {
        let remainder = text.strip_prefix(literal)?;
        match self.grammar.config().separator {
            SeparatorMode::Spaced => {
                if remainder.is_empty() {
                    Some(remainder)
                } else {
                    remainder.strip_prefix(' ')
                }
            }
            SeparatorMode::Compact => Some(remainder),
        }
    }
}
