//! Hamming-distance template mining over a working set of token vectors.

use std::collections::BTreeMap;
use std::time::Instant;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{MinerBuilder, MinerConfig};
use crate::dictionary::{Token, WILDCARD_TOKEN};
use crate::error::{Result, TokmineError};
use crate::metrics::{sample_rss_kb, IterationMetrics, MiningMetrics, StopReason};

/// One record encoded as an interleaved `[key, value, ...]` token sequence.
pub type TokenVector = Vec<Token>;

/// A mined template: a token vector with wildcard positions, the values
/// observed at those positions, and the vectors it absorbed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    /// Sequential rule number in emission order (0-indexed).
    pub id: usize,
    /// Template body; wildcard positions hold [`WILDCARD_TOKEN`].
    pub template: TokenVector,
    /// Zero-indexed positions where the seed pair disagreed.
    pub diff_positions: Vec<usize>,
    /// Tokens observed at each wildcard position.
    ///
    /// Captured from the seed pair only, in seed order; later matches do not
    /// extend these sets.
    pub value_sets: BTreeMap<usize, Vec<Token>>,
    /// Vectors removed from the working set by this rule, in working-set
    /// order.  The seed pair is always included.
    pub matched_vectors: Vec<TokenVector>,
}

impl Rule {
    /// Number of vectors absorbed by this rule.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matched_vectors.len()
    }

    /// Returns `true` when `vector` agrees with the template at every
    /// non-wildcard position.  Wildcard positions impose no constraint.
    #[must_use]
    pub fn matches(&self, vector: &[Token]) -> bool {
        template_matches(&self.template, vector)
    }
}

/// Everything produced by one mining run.
#[must_use]
#[derive(Debug, Clone)]
pub struct MiningOutcome {
    /// Mined rules in emission order.
    pub rules: Vec<Rule>,
    /// Vectors no qualifying pair could absorb, in surviving working-set
    /// order.
    pub leftovers: Vec<TokenVector>,
    /// Detailed metrics captured during mining.
    pub metrics: MiningMetrics,
}

/// High-level façade configuring and executing mining runs.
///
/// The miner operates purely on integer vectors; it never consults the
/// dictionary.  The working set is owned exclusively for the duration of one
/// [`TemplateMiner::mine`] call.
#[derive(Debug, Clone, Default)]
pub struct TemplateMiner {
    cfg: MinerConfig,
}

impl TemplateMiner {
    /// Creates a new miner for the supplied configuration.
    #[must_use]
    pub fn new(cfg: MinerConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`MinerBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> MinerBuilder {
        MinerConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &MinerConfig {
        &self.cfg
    }

    /// Mines templates out of `vectors` until no pair of working-set vectors
    /// sits at exactly the target distance.
    ///
    /// All vectors must share one length; heterogeneous-arity input is
    /// rejected up front rather than truncated or padded.  Every input vector
    /// ends up in exactly one rule's `matched_vectors` or in `leftovers`.
    pub fn mine(&self, vectors: Vec<TokenVector>) -> Result<MiningOutcome> {
        self.cfg.validate()?;
        validate_uniform_length(&vectors)?;

        let mut working = vectors;
        let mut rules: Vec<Rule> = Vec::new();
        // Each iteration removes at least the two seeds, so n/2 bounds the
        // rule count.
        let mut metrics = MiningMetrics::new(working.len() / 2);
        let mining_start = Instant::now();
        let mut iteration = 0usize;

        loop {
            if let Some(max_iters) = self.cfg.max_iterations {
                if iteration >= max_iters {
                    metrics.stop_reason = StopReason::MaxIterationsReached;
                    break;
                }
            }

            let iteration_start = Instant::now();
            let Some(seed) = first_pair_at_distance(&working, self.cfg.target_distance) else {
                metrics.stop_reason = StopReason::NoQualifyingPairs;
                break;
            };

            let mut template = working[seed.first].clone();
            let mut value_sets = BTreeMap::new();
            for &pos in &seed.diff_positions {
                value_sets.insert(pos, vec![working[seed.first][pos], working[seed.second][pos]]);
                template[pos] = WILDCARD_TOKEN;
            }

            // Rematch against the entire current working set, not just the
            // vectors after the seeds.
            let (matched, rest): (Vec<_>, Vec<_>) = working
                .into_iter()
                .partition(|vector| template_matches(&template, vector));
            working = rest;

            let rule = Rule {
                id: rules.len(),
                template,
                diff_positions: seed.diff_positions,
                value_sets,
                matched_vectors: matched,
            };
            iteration += 1;

            if self.cfg.show_progress {
                info!(
                    "iter {:>4} seed ({}, {}) wildcards {:>2} matched {:>6} remaining {:>6}",
                    iteration,
                    seed.first,
                    seed.second,
                    rule.diff_positions.len(),
                    rule.match_count(),
                    working.len()
                );
            }

            metrics.iterations.push(IterationMetrics {
                iteration,
                seed_indices: (seed.first, seed.second),
                wildcards: rule.diff_positions.len(),
                matched: rule.match_count(),
                remaining: working.len(),
                elapsed_iteration: iteration_start.elapsed(),
                elapsed_total: mining_start.elapsed(),
                rss_kb: sample_rss_kb(),
            });
            rules.push(rule);
        }

        metrics.total_duration = mining_start.elapsed();
        if self.cfg.show_progress {
            info!(
                "mined {} rules in {:.2?}; {} vectors left unclustered",
                rules.len(),
                metrics.total_duration,
                working.len()
            );
        }

        Ok(MiningOutcome {
            rules,
            leftovers: working,
            metrics,
        })
    }
}

struct SeedPair {
    first: usize,
    second: usize,
    diff_positions: Vec<usize>,
}

/// Finds the first unordered index pair at exactly `target` Hamming
/// distance, scanning in ascending lexicographic `(i, j)` order.
///
/// The first-pair choice is a deliberate deterministic tie-break, not a
/// coverage optimization.
fn first_pair_at_distance(vectors: &[TokenVector], target: usize) -> Option<SeedPair> {
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            if let Some(diff_positions) = diff_at_distance(&vectors[i], &vectors[j], target) {
                return Some(SeedPair {
                    first: i,
                    second: j,
                    diff_positions,
                });
            }
        }
    }
    None
}

/// Returns the differing positions of `a` and `b` when their Hamming
/// distance is exactly `target`, bailing out early once it is exceeded.
fn diff_at_distance(a: &[Token], b: &[Token], target: usize) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(target);
    for (pos, (&x, &y)) in a.iter().zip(b.iter()).enumerate() {
        if x != y {
            if positions.len() == target {
                return None;
            }
            positions.push(pos);
        }
    }
    (positions.len() == target).then_some(positions)
}

fn template_matches(template: &[Token], vector: &[Token]) -> bool {
    template
        .iter()
        .zip(vector.iter())
        .all(|(&t, &v)| t == WILDCARD_TOKEN || t == v)
}

fn validate_uniform_length(vectors: &[TokenVector]) -> Result<()> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    let expected = first.len();
    for (index, vector) in vectors.iter().enumerate().skip(1) {
        if vector.len() != expected {
            return Err(TokmineError::MismatchedLength {
                index,
                expected,
                found: vector.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miner(distance: usize) -> TemplateMiner {
        let cfg = MinerConfig::builder()
            .target_distance(distance)
            .show_progress(false)
            .build()
            .unwrap();
        TemplateMiner::new(cfg)
    }

    #[test]
    fn single_differing_position_yields_one_rule() {
        let vectors = vec![vec![101, 205, 301], vec![101, 205, 302]];
        let outcome = miner(1).mine(vectors.clone()).unwrap();

        assert_eq!(outcome.rules.len(), 1);
        let rule = &outcome.rules[0];
        assert_eq!(rule.template, vec![101, 205, 0]);
        assert_eq!(rule.diff_positions, vec![2]);
        assert_eq!(rule.value_sets.get(&2), Some(&vec![301, 302]));
        assert_eq!(rule.matched_vectors, vectors);
        assert!(outcome.leftovers.is_empty());
        assert_eq!(outcome.metrics.stop_reason, StopReason::NoQualifyingPairs);
    }

    #[test]
    fn distant_vectors_stay_unclustered() {
        let vectors = vec![vec![101, 205, 301], vec![700, 800, 900]];
        let outcome = miner(1).mine(vectors.clone()).unwrap();
        assert!(outcome.rules.is_empty());
        assert_eq!(outcome.leftovers, vectors);
    }

    #[test]
    fn seed_is_first_pair_in_index_order() {
        // Pairs (0,1) and (2,3) both sit at distance 1; (0,1) must seed the
        // first rule.
        let vectors = vec![
            vec![1, 2, 3],
            vec![1, 2, 4],
            vec![9, 8, 7],
            vec![9, 8, 6],
        ];
        let outcome = miner(1).mine(vectors).unwrap();
        assert_eq!(outcome.rules.len(), 2);
        assert_eq!(outcome.rules[0].template, vec![1, 2, 0]);
        assert_eq!(outcome.rules[1].template, vec![9, 8, 0]);
        assert_eq!(outcome.metrics.iterations[0].seed_indices, (0, 1));
    }

    #[test]
    fn rematch_covers_entire_working_set() {
        // The third vector differs from both seeds at the wildcard position
        // only, so the seed rule absorbs it in the same iteration.
        let vectors = vec![vec![5, 1], vec![5, 2], vec![5, 3]];
        let outcome = miner(1).mine(vectors).unwrap();
        assert_eq!(outcome.rules.len(), 1);
        assert_eq!(outcome.rules[0].match_count(), 3);
        assert!(outcome.leftovers.is_empty());
    }

    #[test]
    fn value_sets_capture_seed_pair_only() {
        let vectors = vec![vec![5, 1], vec![5, 2], vec![5, 3]];
        let outcome = miner(1).mine(vectors).unwrap();
        // Vector [5, 3] matched but its value was not captured.
        assert_eq!(outcome.rules[0].value_sets.get(&1), Some(&vec![1, 2]));
    }

    #[test]
    fn coverage_partitions_the_input() {
        let vectors = vec![
            vec![101, 205, 301, 410],
            vec![101, 205, 302, 410],
            vec![101, 206, 301, 411],
            vec![700, 800, 900, 100],
            vec![101, 205, 301, 410],
        ];
        let outcome = miner(2).mine(vectors.clone()).unwrap();

        let mut recovered: Vec<TokenVector> = Vec::new();
        for rule in &outcome.rules {
            for vector in &rule.matched_vectors {
                assert!(rule.matches(vector), "rule soundness");
            }
            recovered.extend(rule.matched_vectors.iter().cloned());
        }
        recovered.extend(outcome.leftovers.iter().cloned());
        assert_eq!(recovered.len(), vectors.len());

        let mut expected = vectors;
        let mut actual = recovered;
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }

    #[test]
    fn terminates_within_half_the_input_size() {
        // Ten vectors pairwise at distance 1 in chains; iterations can never
        // exceed n/2.
        let vectors: Vec<TokenVector> = (0..10u32).map(|i| vec![42, i]).collect();
        let outcome = miner(1).mine(vectors).unwrap();
        assert!(outcome.metrics.iterations.len() <= 5);
    }

    #[test]
    fn iteration_budget_stops_early() {
        let vectors = vec![
            vec![1, 2, 3],
            vec![1, 2, 4],
            vec![9, 8, 7],
            vec![9, 8, 6],
        ];
        let cfg = MinerConfig::builder()
            .target_distance(1)
            .max_iterations(Some(1))
            .show_progress(false)
            .build()
            .unwrap();
        let outcome = TemplateMiner::new(cfg).mine(vectors).unwrap();
        assert_eq!(outcome.rules.len(), 1);
        assert_eq!(outcome.leftovers.len(), 2);
        assert_eq!(outcome.metrics.stop_reason, StopReason::MaxIterationsReached);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let vectors = vec![vec![1, 2], vec![1, 2, 3]];
        let err = miner(1).mine(vectors).unwrap_err();
        assert!(matches!(
            err,
            TokmineError::MismatchedLength {
                index: 1,
                expected: 2,
                found: 3,
            }
        ));
    }

    #[test]
    fn distance_zero_groups_exact_duplicates() {
        let vectors = vec![vec![1, 2], vec![3, 4], vec![1, 2]];
        let outcome = miner(0).mine(vectors).unwrap();
        assert_eq!(outcome.rules.len(), 1);
        assert_eq!(outcome.rules[0].template, vec![1, 2]);
        assert!(outcome.rules[0].diff_positions.is_empty());
        assert_eq!(outcome.rules[0].match_count(), 2);
        assert_eq!(outcome.leftovers, vec![vec![3, 4]]);
    }

    #[test]
    fn empty_input_yields_empty_outcome() {
        let outcome = miner(2).mine(Vec::new()).unwrap();
        assert!(outcome.rules.is_empty());
        assert!(outcome.leftovers.is_empty());
    }
}
