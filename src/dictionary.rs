//! The persisted, bidirectional value↔token mapping.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::{Result, TokmineError};

/// Token identifier used throughout the crate.
pub type Token = u32;

/// Reserved sentinel marking a variable position in a mined rule.
pub const WILDCARD_TOKEN: Token = 0;
/// Reserved sentinel standing in for mutable (timestamp-like) values.
pub const MUTABLE_TOKEN: Token = 1;
/// First token available for ordinary value allocation.
pub const TOKEN_BASE: Token = 1000;

/// Bidirectional mapping between canonical value text and integer tokens.
///
/// The dictionary is the exclusive owner of token allocation within one
/// session: `forward` and `reverse` are exact inverses, `next_token` only
/// increases, and no value is ever assigned to two tokens.
#[derive(Debug, Clone)]
pub struct TokenDictionary {
    next_token: Token,
    forward: FxHashMap<String, Token>,
    reverse: FxHashMap<Token, String>,
}

impl TokenDictionary {
    /// Creates a fresh dictionary with no assigned tokens.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_token: TOKEN_BASE,
            forward: FxHashMap::default(),
            reverse: FxHashMap::default(),
        }
    }

    /// Loads a dictionary from `path`, or returns a fresh dictionary when the
    /// file does not exist.
    ///
    /// An existing but unreadable or corrupt file is an error; silently
    /// restarting allocation over a damaged file would hand out tokens that
    /// collide with the previous session.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        Self::load_required(path)
    }

    /// Loads a dictionary from `path`, treating a missing file as fatal.
    ///
    /// Detokenization cannot proceed without the dictionary the vectors were
    /// produced against, so this variant never falls back to a fresh state.
    pub fn load_required<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| TokmineError::DictionaryLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let (next_token, forward): (Token, FxHashMap<String, Token>) =
            serde_json::from_reader(BufReader::new(file)).map_err(|err| {
                TokmineError::DictionaryLoad {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                }
            })?;

        let mut reverse = FxHashMap::default();
        reverse.reserve(forward.len());
        for (value, &token) in &forward {
            if token < TOKEN_BASE {
                return Err(TokmineError::DictionaryLoad {
                    path: path.to_path_buf(),
                    reason: format!("token {token} for {value:?} is below the base {TOKEN_BASE}"),
                });
            }
            if token >= next_token {
                return Err(TokmineError::DictionaryLoad {
                    path: path.to_path_buf(),
                    reason: format!(
                        "token {token} for {value:?} is not below next_token {next_token}"
                    ),
                });
            }
            if let Some(previous) = reverse.insert(token, value.clone()) {
                return Err(TokmineError::DictionaryLoad {
                    path: path.to_path_buf(),
                    reason: format!("token {token} is assigned to both {previous:?} and {value:?}"),
                });
            }
        }

        Ok(Self {
            next_token,
            forward,
            reverse,
        })
    }

    /// Serializes the dictionary to `path` as `[next_token, {value: token}]`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).map_err(|err| TokmineError::io(err, Some(path.to_path_buf())))?;
        // BTreeMap keeps the persisted map in a stable order across runs.
        let ordered: BTreeMap<&str, Token> = self
            .forward
            .iter()
            .map(|(value, &token)| (value.as_str(), token))
            .collect();
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &(self.next_token, ordered)).map_err(|err| {
            TokmineError::io(
                std::io::Error::new(std::io::ErrorKind::Other, err),
                Some(path.to_path_buf()),
            )
        })?;
        writer
            .flush()
            .map_err(|err| TokmineError::io(err, Some(path.to_path_buf())))?;
        Ok(())
    }

    /// Returns the token for `canonical`, allocating a new one when absent.
    pub fn get_or_create(&mut self, canonical: &str) -> Token {
        if let Some(&token) = self.forward.get(canonical) {
            return token;
        }
        let token = self.next_token;
        self.next_token += 1;
        self.forward.insert(canonical.to_string(), token);
        self.reverse.insert(token, canonical.to_string());
        token
    }

    /// Returns the token for `canonical` without allocating.
    #[must_use]
    pub fn token_for(&self, canonical: &str) -> Option<Token> {
        self.forward.get(canonical).copied()
    }

    /// Returns the canonical text assigned to `token`.
    ///
    /// An absent token indicates a dictionary/vector mismatch and is
    /// unrecoverable locally.
    pub fn reverse_lookup(&self, token: Token) -> Result<&str> {
        self.reverse
            .get(&token)
            .map(String::as_str)
            .ok_or(TokmineError::UnknownToken(token))
    }

    /// Returns the next token that will be allocated.
    #[must_use]
    pub fn next_token(&self) -> Token {
        self.next_token
    }

    /// Returns the number of assigned tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns `true` when no tokens have been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl Default for TokenDictionary {
    fn default() -> Self {
        Self::new()
    }
}
