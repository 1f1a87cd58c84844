//! Facilities for discovering input files and loading token-vector corpora.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::dictionary::Token;
use crate::error::{Result, TokmineError};
use crate::miner::TokenVector;

/// Discovers files rooted at the provided input paths according to the ingest
/// configuration.
///
/// Directories are traversed recursively by default; set
/// [`IngestConfig::recursive`] to `false` to limit discovery to the first
/// level.  Symlink traversal is controlled through
/// [`IngestConfig::follow_symlinks`].
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(TokmineError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| TokmineError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            if cfg.recursive {
                let walker = WalkDir::new(path).follow_links(cfg.follow_symlinks);
                for entry in walker {
                    let entry = entry.map_err(|err| {
                        TokmineError::InvalidConfig(format!("cannot traverse {path:?}: {err}"))
                    })?;
                    if entry.file_type().is_file() {
                        files.push(entry.path().to_path_buf());
                    }
                }
            } else {
                for entry in std::fs::read_dir(path)
                    .map_err(|err| TokmineError::io(err, Some(path.to_path_buf())))?
                {
                    let entry =
                        entry.map_err(|err| TokmineError::io(err, Some(path.to_path_buf())))?;
                    let entry_path = entry.path();
                    if entry_path.is_file() {
                        files.push(entry_path);
                    }
                }
            }
        } else if metadata.is_file() {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(TokmineError::InvalidConfig(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Parses newline-delimited token vectors from a reader.
///
/// Each line must be a JSON array of integers.  Unlike log records, vector
/// files are machine-written, so a malformed line is fatal rather than
/// skippable; the error carries the 1-based line number.
pub fn read_vectors<R: BufRead>(reader: R) -> Result<Vec<TokenVector>> {
    let mut vectors = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index as u64 + 1;
        let line = line.map_err(|err| TokmineError::io(err, None))?;
        if line.trim().is_empty() {
            continue;
        }
        let vector: Vec<Token> = serde_json::from_str(&line)
            .map_err(|err| TokmineError::parse(line_no, format!("not an integer array: {err}")))?;
        vectors.push(vector);
    }
    Ok(vectors)
}

/// Loads token vectors from the given files in order.
pub fn load_vectors<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<TokenVector>> {
    let mut vectors = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|err| TokmineError::io(err, Some(path.to_path_buf())))?;
        vectors.extend(read_vectors(BufReader::new(file))?);
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn collect_paths_discovers_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.jsonl");
        let file_b = nested.join("b.jsonl");
        fs::write(&file_a, "{}\n").expect("write a");
        fs::write(&file_b, "{}\n").expect("write b");

        let cfg = IngestConfig {
            recursive: true,
            ..IngestConfig::default()
        };
        let mut paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        paths.sort();
        assert_eq!(paths, vec![file_a, file_b]);
    }

    #[test]
    fn collect_paths_rejects_missing_input() {
        let cfg = IngestConfig::default();
        let err = collect_paths(&["/definitely/not/here"], &cfg).unwrap_err();
        assert!(matches!(err, TokmineError::InvalidConfig(_)));
    }

    #[test]
    fn read_vectors_parses_ndjson_arrays() {
        let input = "[1000,1001]\n\n[1000,1002]\n";
        let vectors = read_vectors(input.as_bytes()).expect("parse vectors");
        assert_eq!(vectors, vec![vec![1000, 1001], vec![1000, 1002]]);
    }

    #[test]
    fn read_vectors_reports_line_numbers() {
        let input = "[1000,1001]\nnot json\n";
        let err = read_vectors(input.as_bytes()).unwrap_err();
        assert!(matches!(err, TokmineError::Parse { line: 2, .. }));
    }
}
