//! cfg-gen is a small context-free-grammar engine.
//!
//! A [`Grammar`] holds terminals, production rules and generation bounds. A
//! [`Generator`] produces random strings derivable from the start symbol,
//! retrying whole derivations that come out too long; a [`Matcher`]
//! independently decides membership of an arbitrary string via backtracking
//! recursive descent. Grammars are built programmatically or loaded from a
//! line-oriented text format by [`GrammarLoader`].
//!
//! # Example
//!
//! ```rust
//! use cfg_gen::{Grammar, Generator, Matcher};
//!
//! // a^n b^n, the classic non-regular language
//! let grammar = Grammar::builder()
//!     .terminals(["a", "b"])
//!     .rule("S", ["a", "S", "b"])
//!     .rule("S", ["a", "b"])
//!     .build()?;
//!
//! let mut generator = Generator::seeded(&grammar, 42);
//! let outcome = generator.generate()?;
//! let sentence = outcome.text.strip_suffix('.').unwrap();
//!
//! // Everything the generator produces, the matcher accepts
//! let mut matcher = Matcher::new(&grammar);
//! assert!(matcher.is_valid(sentence).valid);
//! # Ok::<(), cfg_gen::GrammarError>(())
//! ```

pub mod generator;
pub mod grammar;
pub mod loader;
pub mod matcher;
pub mod utils;

pub use generator::{GenerationOutcome, Generator};
pub use grammar::{Grammar, GrammarBuilder, GrammarConfig, Production, SeparatorMode};
pub use loader::GrammarLoader;
pub use matcher::{MatchOutcome, Matcher};
pub use utils::{GrammarError, Result};
