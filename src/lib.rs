//! Log template mining library and CLI.
//!
//! The crate exposes both a library API and a `tokmine` command line
//! interface for discovering recurring structural patterns in
//! semi-structured log records.  Typical usage tokenizes newline-delimited
//! JSON records into integer vectors against a persistent token dictionary,
//! mines near-identical vectors into wildcarded templates, and reconstructs
//! records from vectors when needed.
//!
//! ```no_run
//! use tokmine::{MinerConfig, RecordTokenizer, TemplateMiner, TokenDictionary};
//!
//! # fn main() -> tokmine::Result<()> {
//! let mut dict = TokenDictionary::load("tokens.json")?;
//! let tokenizer = RecordTokenizer::new();
//! let batch = tokenizer.tokenize_reader(std::io::stdin().lock(), &mut dict)?;
//!
//! let cfg = MinerConfig::builder().target_distance(2).build()?;
//! let outcome = TemplateMiner::new(cfg).mine(batch.vectors)?;
//! for rule in &outcome.rules {
//!     println!("{:?} matched {}", rule.template, rule.match_count());
//! }
//! dict.save("tokens.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting
//! the library portion only can disable default features to avoid the CLI
//! dependencies: `tokmine = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod classify;
pub mod config;
pub mod corpus;
pub mod detokenizer;
pub mod dictionary;
pub mod error;
pub mod metrics;
pub mod miner;
pub mod tokenizer;
pub mod value;

pub use classify::{Classification, MutableClassifier, MutableKind, TimestampClassifier};
pub use config::{IngestConfig, MinerBuilder, MinerConfig};
pub use detokenizer::Detokenizer;
pub use dictionary::{Token, TokenDictionary, MUTABLE_TOKEN, TOKEN_BASE, WILDCARD_TOKEN};
pub use error::{Result, TokmineError};
pub use metrics::{IterationMetrics, MiningMetrics, StopReason};
pub use miner::{MiningOutcome, Rule, TemplateMiner, TokenVector};
pub use tokenizer::{LogRecord, RecordTokenizer, TokenizedBatch};
pub use value::CanonicalValue;
