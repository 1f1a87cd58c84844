//! Conversion of structured log records into token vectors.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use log::warn;
use serde_json::Value;

use crate::classify::{Classification, MutableClassifier, TimestampClassifier};
use crate::config::IngestConfig;
use crate::corpus::collect_paths;
use crate::dictionary::{Token, TokenDictionary, MUTABLE_TOKEN};
use crate::error::{Result, TokmineError};
use crate::miner::TokenVector;
use crate::value::CanonicalValue;

/// One decoded log record: field names mapped to scalar values, ordered by
/// field name.
pub type LogRecord = BTreeMap<String, CanonicalValue>;

/// A line that could not be decoded and was skipped during streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number within the stream.
    pub line: u64,
    /// Why the line was rejected.
    pub reason: String,
}

/// Result of tokenizing one stream of newline-delimited records.
#[derive(Debug, Clone, Default)]
pub struct TokenizedBatch {
    /// Token vectors in input order, one per successfully decoded record.
    pub vectors: Vec<TokenVector>,
    /// Lines rejected during decoding, in input order.
    pub skipped: Vec<SkippedLine>,
    /// Count of produced vectors per vector length.
    pub length_histogram: BTreeMap<usize, usize>,
}

impl TokenizedBatch {
    /// Merges another batch into this one, renumbering nothing: line numbers
    /// are per-stream.
    pub fn absorb(&mut self, other: TokenizedBatch) {
        for vector in &other.vectors {
            *self.length_histogram.entry(vector.len()).or_insert(0) += 1;
        }
        self.vectors.extend(other.vectors);
        self.skipped.extend(other.skipped);
    }
}

/// Turns decoded records into token vectors, growing the dictionary as a side
/// effect.
///
/// Fields are visited in lexicographic field-name order so that the same
/// record always produces the same vector against the same dictionary state.
#[derive(Debug, Clone, Default)]
pub struct RecordTokenizer<C = TimestampClassifier> {
    classifier: C,
}

impl RecordTokenizer<TimestampClassifier> {
    /// Creates a tokenizer with the default timestamp classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: MutableClassifier> RecordTokenizer<C> {
    /// Creates a tokenizer using the supplied classifier.
    #[must_use]
    pub fn with_classifier(classifier: C) -> Self {
        Self { classifier }
    }

    /// Returns the classifier in use.
    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Tokenizes one record into an interleaved `[key, value]` token vector.
    ///
    /// Every stable value encountered for the first time grows `dict`;
    /// mutable values collapse to the reserved mutable token without touching
    /// the dictionary.
    pub fn tokenize_record(&self, record: &LogRecord, dict: &mut TokenDictionary) -> TokenVector {
        let mut vector = Vec::with_capacity(record.len() * 2);
        for (key, value) in record {
            let key_value = CanonicalValue::Str(key.clone());
            vector.push(self.tokenize_value(&key_value, dict));
            vector.push(self.tokenize_value(value, dict));
        }
        vector
    }

    /// Decodes one input line and tokenizes it.
    pub fn tokenize_line(&self, line: &str, dict: &mut TokenDictionary) -> Result<TokenVector> {
        let record = parse_record(line)?;
        Ok(self.tokenize_record(&record, dict))
    }

    /// Tokenizes a stream of newline-delimited records.
    ///
    /// Malformed lines are skipped and reported through the returned batch
    /// (and a `warn!` log line); one bad record never discards the rest of
    /// the stream.  Only IO failures abort.
    pub fn tokenize_reader<R: BufRead>(
        &self,
        reader: R,
        dict: &mut TokenDictionary,
    ) -> Result<TokenizedBatch> {
        let mut batch = TokenizedBatch::default();
        for (index, line) in reader.lines().enumerate() {
            let line_no = index as u64 + 1;
            let line = line.map_err(|err| TokmineError::io(err, None))?;
            if line.trim().is_empty() {
                continue;
            }
            match self.tokenize_line(&line, dict) {
                Ok(vector) => {
                    *batch.length_histogram.entry(vector.len()).or_insert(0) += 1;
                    batch.vectors.push(vector);
                }
                Err(err) => {
                    let reason = match err {
                        TokmineError::Parse { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    warn!("skipping line {line_no}: {reason}");
                    batch.skipped.push(SkippedLine {
                        line: line_no,
                        reason,
                    });
                }
            }
        }
        Ok(batch)
    }

    /// Tokenizes records loaded from files or directories on disk.
    pub fn tokenize_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
        dict: &mut TokenDictionary,
    ) -> Result<TokenizedBatch> {
        let paths = collect_paths(inputs, ingest)?;
        let mut merged = TokenizedBatch::default();
        for path in paths {
            let file = std::fs::File::open(&path)
                .map_err(|err| TokmineError::io(err, Some(path.clone())))?;
            let batch = self.tokenize_reader(std::io::BufReader::new(file), dict)?;
            merged.absorb(batch);
        }
        Ok(merged)
    }

    fn tokenize_value(&self, value: &CanonicalValue, dict: &mut TokenDictionary) -> Token {
        match self.classifier.classify(value) {
            Classification::Mutable(_) => MUTABLE_TOKEN,
            Classification::Stable => dict.get_or_create(&value.canonical_text()),
        }
    }
}

/// Decodes one newline-delimited input line into a [`LogRecord`].
///
/// The line must be a JSON object whose values are all scalars.
pub fn parse_record(line: &str) -> Result<LogRecord> {
    let value: Value = serde_json::from_str(line)
        .map_err(|err| TokmineError::parse(0, format!("not valid JSON: {err}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| TokmineError::parse(0, "line is not a JSON object"))?;
    let mut record = LogRecord::new();
    for (key, field) in object {
        let canonical = CanonicalValue::from_json(field).map_err(|_| {
            TokmineError::parse(0, format!("field {key:?} is not a scalar value"))
        })?;
        record.insert(key.clone(), canonical);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::TOKEN_BASE;

    fn record(line: &str) -> LogRecord {
        parse_record(line).expect("valid record")
    }

    #[test]
    fn fields_are_visited_in_sorted_order() {
        // Keys arrive out of order; allocation order proves sorted traversal.
        let mut dict = TokenDictionary::new();
        let tokenizer = RecordTokenizer::new();
        let vector = tokenizer.tokenize_record(&record(r#"{"b": "x", "a": 1}"#), &mut dict);
        assert_eq!(vector, vec![1000, 1001, 1002, 1003]);
        assert_eq!(dict.token_for("\"a\""), Some(1000));
        assert_eq!(dict.token_for("1"), Some(1001));
        assert_eq!(dict.token_for("\"b\""), Some(1002));
        assert_eq!(dict.token_for("\"x\""), Some(1003));
    }

    #[test]
    fn tokenization_is_deterministic() {
        let tokenizer = RecordTokenizer::new();
        let input = record(r#"{"service": "auth", "level": "info", "code": 7}"#);

        let mut dict_a = TokenDictionary::new();
        let first = tokenizer.tokenize_record(&input, &mut dict_a);
        let second = tokenizer.tokenize_record(&input, &mut dict_a);
        assert_eq!(first, second);

        let mut dict_b = TokenDictionary::new();
        let fresh = tokenizer.tokenize_record(&input, &mut dict_b);
        assert_eq!(first, fresh);
    }

    #[test]
    fn mutable_values_bypass_the_dictionary() {
        let mut dict = TokenDictionary::new();
        let tokenizer = RecordTokenizer::new();
        let vector =
            tokenizer.tokenize_record(&record(r#"{"ts": "2025-01-01T00:00:00"}"#), &mut dict);
        assert_eq!(vector[1], MUTABLE_TOKEN);
        // Only the key was inserted.
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.next_token(), TOKEN_BASE + 1);
    }

    #[test]
    fn vector_length_is_twice_field_count() {
        let mut dict = TokenDictionary::new();
        let tokenizer = RecordTokenizer::new();
        let vector = tokenizer.tokenize_record(
            &record(r#"{"a": 1, "b": 2, "c": 3, "d": 4}"#),
            &mut dict,
        );
        assert_eq!(vector.len(), 8);
    }

    #[test]
    fn reader_skips_and_reports_bad_lines() {
        let input = "{\"a\": 1}\nnot json at all\n{\"a\": 2}\n{\"a\": [1]}\n";
        let mut dict = TokenDictionary::new();
        let tokenizer = RecordTokenizer::new();
        let batch = tokenizer
            .tokenize_reader(input.as_bytes(), &mut dict)
            .expect("stream survives bad lines");
        assert_eq!(batch.vectors.len(), 2);
        assert_eq!(batch.skipped.len(), 2);
        assert_eq!(batch.skipped[0].line, 2);
        assert_eq!(batch.skipped[1].line, 4);
        assert_eq!(batch.length_histogram.get(&2), Some(&2));
    }

    #[test]
    fn shared_namespace_reuses_tokens_between_keys_and_values() {
        // The field name "x" and the string value "x" canonicalize
        // identically and land on the same token.
        let mut dict = TokenDictionary::new();
        let tokenizer = RecordTokenizer::new();
        let vector = tokenizer.tokenize_record(&record(r#"{"x": "x"}"#), &mut dict);
        assert_eq!(vector[0], vector[1]);
        assert_eq!(dict.len(), 1);
    }
}
