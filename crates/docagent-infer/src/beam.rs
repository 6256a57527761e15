//! Beam search decoding over a step-wise decoder.
//!
//! Supports minimum length (end-of-sequence masked until reached), no-repeat
//! n-gram blocking, length-penalized ranking of finished hypotheses, early
//! stopping once `num_beams` hypotheses have finished, and forced token
//! sequences. Forced sequences follow the bank scheme of constrained beam
//! search: candidates are grouped by how many constraint tokens they have
//! fulfilled and beam slots are filled round-robin from the most advanced
//! bank down, so hypotheses making progress on a constraint are never
//! crowded out by unconstrained ones. A hypothesis may only finish once
//! every constraint appears in it.

use std::collections::BTreeMap;

use docagent_core::{Error, Result};

/// One decoder invocation: next-token logits for every prefix.
pub trait DecoderStep {
    /// Return one row of vocabulary logits per prefix, in order. Prefixes
    /// start with the decoder start token.
    fn next_logits(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Clone)]
pub struct BeamSearchConfig {
    pub num_beams: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub length_penalty: f32,
    pub no_repeat_ngram_size: usize,
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
    /// Token sequences that must appear in the output.
    pub constraints: Vec<Vec<u32>>,
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    score: f32,
}

impl Hypothesis {
    fn generated(&self) -> usize {
        self.tokens.len() - 1
    }
}

struct Candidate {
    hyp: Hypothesis,
    progress: usize,
    is_eos: bool,
}

/// Run beam search. Returns generated token ids without the start and
/// end-of-sequence tokens.
pub fn beam_search<D: DecoderStep + ?Sized>(
    decoder: &mut D,
    config: &BeamSearchConfig,
) -> Result<Vec<u32>> {
    let num_beams = config.num_beams.max(1);
    let eos = config.eos_token_id as usize;
    let constraints: Vec<&[u32]> = config
        .constraints
        .iter()
        .filter(|c| !c.is_empty())
        .map(Vec::as_slice)
        .collect();

    let mut beams = vec![Hypothesis {
        tokens: vec![config.decoder_start_token_id],
        score: 0.0,
    }];
    let mut finished: Vec<(Vec<u32>, f32)> = Vec::new();

    for _ in 0..config.max_length {
        let prefixes: Vec<Vec<u32>> = beams.iter().map(|b| b.tokens.clone()).collect();
        let logits = decoder.next_logits(&prefixes)?;
        if logits.len() != beams.len() {
            return Err(Error::Inference(format!(
                "decoder returned {} rows for {} beams",
                logits.len(),
                beams.len()
            )));
        }

        let mut candidates = Vec::new();
        for (beam, row) in beams.iter().zip(&logits) {
            let mut log_probs = log_softmax(row);
            if beam.generated() < config.min_length {
                if let Some(v) = log_probs.get_mut(eos) {
                    *v = f32::NEG_INFINITY;
                }
            }
            for t in banned_ngram_tokens(&beam.tokens, config.no_repeat_ngram_size) {
                if let Some(v) = log_probs.get_mut(t as usize) {
                    *v = f32::NEG_INFINITY;
                }
            }

            let mut picks = top_k(&log_probs, 2 * num_beams);
            for c in &constraints {
                if let Some(next) = next_constraint_token(&beam.tokens, c) {
                    if !picks.contains(&(next as usize)) {
                        picks.push(next as usize);
                    }
                }
            }

            let beam_progress = progress(&beam.tokens, &constraints);
            for t in picks {
                let lp = match log_probs.get(t) {
                    Some(v) if v.is_finite() => *v,
                    _ => continue,
                };
                let score = beam.score + lp;
                if t == eos {
                    candidates.push(Candidate {
                        hyp: Hypothesis {
                            tokens: beam.tokens.clone(),
                            score,
                        },
                        progress: beam_progress,
                        is_eos: true,
                    });
                } else {
                    let mut tokens = beam.tokens.clone();
                    tokens.push(t as u32);
                    let p = progress(&tokens, &constraints);
                    candidates.push(Candidate {
                        hyp: Hypothesis { tokens, score },
                        progress: p,
                        is_eos: false,
                    });
                }
            }
        }

        // Bank candidates by constraint progress, best score first
        let mut banks: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
        for c in candidates {
            banks.entry(c.progress).or_default().push(c);
        }
        let mut running: Vec<Vec<Hypothesis>> = Vec::new();
        for (_, mut bank) in banks.into_iter().rev() {
            bank.sort_by(|a, b| {
                b.hyp
                    .score
                    .partial_cmp(&a.hyp.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let mut cont = Vec::new();
            for (rank, c) in bank.into_iter().enumerate() {
                if c.is_eos {
                    if rank < num_beams && satisfied(&c.hyp.tokens, &constraints) {
                        let len = c.hyp.generated() + 1;
                        finished.push((
                            c.hyp.tokens[1..].to_vec(),
                            normalize(c.hyp.score, len, config.length_penalty),
                        ));
                    }
                } else {
                    cont.push(c.hyp);
                }
            }
            running.push(cont);
        }

        if finished.len() >= num_beams {
            break;
        }

        beams = round_robin(running, num_beams);
        if beams.is_empty() {
            break;
        }
    }

    if finished.len() < num_beams {
        for b in &beams {
            if b.generated() > 0 && satisfied(&b.tokens, &constraints) {
                finished.push((
                    b.tokens[1..].to_vec(),
                    normalize(b.score, b.generated(), config.length_penalty),
                ));
            }
        }
    }

    finished
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(tokens, _)| tokens)
        .ok_or_else(|| {
            if constraints.is_empty() {
                Error::Inference("beam search produced no hypothesis".into())
            } else {
                Error::Inference("no hypothesis satisfied the forced-word constraints".into())
            }
        })
}

/// Take one hypothesis from each bank in turn (most advanced bank first)
/// until `n` are chosen.
fn round_robin(banks: Vec<Vec<Hypothesis>>, n: usize) -> Vec<Hypothesis> {
    let mut iters: Vec<_> = banks.into_iter().map(Vec::into_iter).collect();
    let mut out = Vec::with_capacity(n);
    loop {
        let mut took_any = false;
        for it in iters.iter_mut() {
            if out.len() >= n {
                return out;
            }
            if let Some(h) = it.next() {
                out.push(h);
                took_any = true;
            }
        }
        if !took_any {
            return out;
        }
    }
}

fn normalize(score: f32, len: usize, length_penalty: f32) -> f32 {
    score / (len.max(1) as f32).powf(length_penalty)
}

fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![f32::NEG_INFINITY; logits.len()];
    }
    let sum: f32 = logits.iter().map(|&l| (l - max).exp()).sum();
    let lse = max + sum.ln();
    logits.iter().map(|&l| l - lse).collect()
}

/// Indices of the `k` largest finite values, ties in index order.
fn top_k(values: &[f32], k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_finite()).collect();
    idx.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    idx.truncate(k);
    idx
}

/// Tokens that would complete an n-gram already present in `tokens`.
fn banned_ngram_tokens(tokens: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || tokens.len() + 1 < n {
        return Vec::new();
    }
    if n == 1 {
        return tokens.to_vec();
    }
    let prefix = &tokens[tokens.len() - (n - 1)..];
    tokens
        .windows(n)
        .filter(|w| &w[..n - 1] == prefix)
        .map(|w| w[n - 1])
        .collect()
}

fn contains_seq(haystack: &[u32], needle: &[u32]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Fulfilled tokens of one constraint: all of it once present, otherwise the
/// longest constraint prefix ending the hypothesis.
fn constraint_progress(tokens: &[u32], constraint: &[u32]) -> usize {
    if contains_seq(tokens, constraint) {
        return constraint.len();
    }
    (1..constraint.len())
        .rev()
        .find(|&k| tokens.ends_with(&constraint[..k]))
        .unwrap_or(0)
}

fn next_constraint_token(tokens: &[u32], constraint: &[u32]) -> Option<u32> {
    constraint.get(constraint_progress(tokens, constraint)).copied()
}

fn progress(tokens: &[u32], constraints: &[&[u32]]) -> usize {
    constraints.iter().map(|c| constraint_progress(tokens, c)).sum()
}

fn satisfied(tokens: &[u32], constraints: &[&[u32]]) -> bool {
    constraints.iter().all(|c| contains_seq(tokens, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: usize = 10;
    const START: u32 = 0;
    const EOS: u32 = 1;

    /// Prefers the chain 0 -> 2 -> 3 -> 4 -> EOS; anything else prefers EOS.
    struct ChainModel {
        calls: usize,
    }

    impl DecoderStep for ChainModel {
        fn next_logits(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
            self.calls += 1;
            Ok(prefixes
                .iter()
                .map(|p| {
                    let preferred = match p.last().copied() {
                        Some(0) => 2,
                        Some(2) => 3,
                        Some(3) => 4,
                        _ => EOS as usize,
                    };
                    let mut row = vec![0.0; VOCAB];
                    row[preferred] = 5.0;
                    row
                })
                .collect())
        }
    }

    /// Always prefers token 3.
    struct LoopModel;

    impl DecoderStep for LoopModel {
        fn next_logits(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
            Ok(prefixes
                .iter()
                .map(|_| {
                    let mut row = vec![0.0; VOCAB];
                    row[3] = 5.0;
                    row
                })
                .collect())
        }
    }

    fn config(num_beams: usize, min_length: usize, max_length: usize) -> BeamSearchConfig {
        BeamSearchConfig {
            num_beams,
            min_length,
            max_length,
            length_penalty: 2.0,
            no_repeat_ngram_size: 0,
            decoder_start_token_id: START,
            eos_token_id: EOS,
            constraints: Vec::new(),
        }
    }

    #[test]
    fn test_follows_preferred_chain() {
        let mut model = ChainModel { calls: 0 };
        let out = beam_search(&mut model, &config(4, 0, 10)).unwrap();
        assert_eq!(out, vec![2, 3, 4]);
        // Early stopping: far fewer steps than max_length
        assert!(model.calls < 10);
    }

    #[test]
    fn test_min_length_blocks_eos() {
        let mut model = ChainModel { calls: 0 };
        let out = beam_search(&mut model, &config(2, 5, 12)).unwrap();
        assert!(out.len() >= 5, "got {:?}", out);
        assert!(!out.contains(&EOS));
    }

    #[test]
    fn test_no_repeat_ngram() {
        let mut cfg = config(1, 0, 6);
        cfg.no_repeat_ngram_size = 2;
        let out = beam_search(&mut LoopModel, &cfg).unwrap();
        let mut seen = std::collections::HashSet::new();
        for w in out.windows(2) {
            assert!(seen.insert((w[0], w[1])), "repeated bigram in {:?}", out);
        }
    }

    #[test]
    fn test_forced_sequence_appears() {
        let mut cfg = config(4, 0, 10);
        cfg.constraints = vec![vec![7, 8]];
        let out = beam_search(&mut ChainModel { calls: 0 }, &cfg).unwrap();
        assert!(out.windows(2).any(|w| w == [7, 8]), "got {:?}", out);
    }

    #[test]
    fn test_unreachable_constraint_fails() {
        let mut cfg = config(2, 0, 2);
        cfg.constraints = vec![vec![7, 8, 9]];
        let err = beam_search(&mut ChainModel { calls: 0 }, &cfg).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(banned_ngram_tokens(&[1, 2, 3, 1, 2], 3), vec![3]);
        assert_eq!(constraint_progress(&[0, 5, 7], &[7, 8]), 1);
        assert_eq!(next_constraint_token(&[0, 7, 8], &[7, 8]), None);
        assert_eq!(top_k(&[0.1, 0.5, f32::NEG_INFINITY, 0.5], 2), vec![1, 3]);
    }
}
