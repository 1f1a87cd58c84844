//! Reconstruction of log records from token vectors.

use serde_json::{Map, Value};

use crate::dictionary::{Token, TokenDictionary, MUTABLE_TOKEN};
use crate::error::{Result, TokmineError};
use crate::tokenizer::LogRecord;
use crate::value::CanonicalValue;

/// Field name substituted for the mutable token during reconstruction.
///
/// The original value behind a mutable token was never stored, so any record
/// whose mutable field was not literally named "timestamp" comes back with
/// the wrong field name.  This lossy behavior is part of the format contract.
pub const MUTABLE_FIELD_NAME: &str = "timestamp";

/// Rebuilds records from interleaved `[key, value]` token vectors.
///
/// Read-only over the dictionary; the dictionary must be the one the vectors
/// were produced against, or lookups fail with
/// [`TokmineError::UnknownToken`].
#[derive(Debug, Clone, Copy)]
pub struct Detokenizer<'d> {
    dict: &'d TokenDictionary,
}

impl<'d> Detokenizer<'d> {
    /// Creates a detokenizer over the given dictionary.
    #[must_use]
    pub fn new(dict: &'d TokenDictionary) -> Self {
        Self { dict }
    }

    /// Reconstructs one record from a token vector.
    ///
    /// Tokens are paired two at a time; odd-length vectors are rejected
    /// rather than silently dropping the trailing token.
    pub fn detokenize(&self, vector: &[Token]) -> Result<LogRecord> {
        if vector.len() % 2 != 0 {
            return Err(TokmineError::OddLengthVector(vector.len()));
        }
        let mut record = LogRecord::new();
        for pair in vector.chunks_exact(2) {
            let key = self.decode(pair[0])?;
            let value = self.decode(pair[1])?;
            record.insert(key.field_name(), value);
        }
        Ok(record)
    }

    /// Reconstructs every vector in a batch, preserving input order.
    pub fn detokenize_all(&self, vectors: &[Vec<Token>]) -> Result<Vec<LogRecord>> {
        vectors.iter().map(|v| self.detokenize(v)).collect()
    }

    fn decode(&self, token: Token) -> Result<CanonicalValue> {
        if token == MUTABLE_TOKEN {
            return Ok(CanonicalValue::Str(MUTABLE_FIELD_NAME.to_string()));
        }
        let text = self.dict.reverse_lookup(token)?;
        CanonicalValue::parse_canonical(text)
    }
}

/// Renders a reconstructed record as a JSON object value.
#[must_use]
pub fn record_to_json(record: &LogRecord) -> Value {
    let mut object = Map::new();
    for (key, value) in record {
        object.insert(key.clone(), value.to_json());
    }
    Value::Object(object)
}
