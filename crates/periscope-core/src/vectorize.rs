//! Corpus vectorization: TF-IDF over a set of section texts and pairwise
//! cosine similarity.
//!
//! Vocabulary and document frequencies are derived jointly across the whole
//! corpus — the texts being compared form one vector space. Rows are
//! L2-normalized, so pairwise cosine similarity reduces to sparse inner
//! products. An empty text is legal input (a missing section placeholder)
//! and yields an all-zero row: zero similarity to everything, including
//! itself.

use std::collections::HashMap;

/// English stop words removed before weighting.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "must", "shall", "can", "this", "that",
    "these", "those", "it", "its", "we", "they", "them", "their", "what", "which", "who",
    "when", "where", "why", "how", "all", "each", "every", "both", "few", "more", "most",
    "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too",
    "very", "also", "now", "here", "there", "then", "once", "if", "because", "as", "until",
    "while", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "from", "up", "down", "out", "off", "over", "under", "again", "further",
    "any", "by", "via",
];

/// TF-IDF representation of a corpus.
#[derive(Debug, Clone)]
pub struct Vectorized {
    /// L2-normalized TF-IDF rows, one per input text, sorted by term id.
    pub rows: Vec<Vec<(u32, f64)>>,
    /// Size of the joint vocabulary. Zero means the corpus was degenerate
    /// (every text empty or stop words only) — callers decide whether that
    /// is fatal.
    pub vocabulary_len: usize,
    /// Pairwise cosine similarity, `n x n`, symmetric, diagonal 1.0 for
    /// non-empty rows and 0.0 for zero rows.
    pub similarity: Vec<Vec<f64>>,
}

/// Lowercase and split on non-alphanumeric boundaries, dropping single
/// characters and stop words.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2 && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Build the TF-IDF vector space and pairwise similarity matrix for `texts`.
///
/// Smoothed idf (`ln((1+n)/(1+df)) + 1`) with L2 row normalization — the
/// weighting every term-count sees before the cosine step. Never fails:
/// a degenerate corpus produces zero rows and an all-zero matrix.
pub fn vectorize(texts: &[String]) -> Vectorized {
    let n = texts.len();
    let mut vocabulary: HashMap<String, u32> = HashMap::new();
    let mut doc_freq: Vec<u32> = Vec::new();

    // Per-document term counts, interned against the joint vocabulary.
    let mut counts: Vec<HashMap<u32, u32>> = Vec::with_capacity(n);
    for text in texts {
        let mut row: HashMap<u32, u32> = HashMap::new();
        for token in tokenize(text) {
            let next_id = vocabulary.len() as u32;
            let id = *vocabulary.entry(token).or_insert(next_id);
            if id as usize == doc_freq.len() {
                doc_freq.push(0);
            }
            *row.entry(id).or_insert(0) += 1;
        }
        for &id in row.keys() {
            doc_freq[id as usize] += 1;
        }
        counts.push(row);
    }

    let idf: Vec<f64> = doc_freq
        .iter()
        .map(|&df| ((1.0 + n as f64) / (1.0 + f64::from(df))).ln() + 1.0)
        .collect();

    let mut rows: Vec<Vec<(u32, f64)>> = Vec::with_capacity(n);
    for row in counts {
        let mut weighted: Vec<(u32, f64)> = row
            .into_iter()
            .map(|(id, tf)| (id, f64::from(tf) * idf[id as usize]))
            .collect();
        weighted.sort_unstable_by_key(|&(id, _)| id);

        let norm = weighted.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for entry in &mut weighted {
                entry.1 /= norm;
            }
        }
        rows.push(weighted);
    }

    let mut similarity = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let dot = sparse_dot(&rows[i], &rows[j]);
            similarity[i][j] = dot;
            similarity[j][i] = dot;
        }
    }

    Vectorized {
        rows,
        vocabulary_len: vocabulary.len(),
        similarity,
    }
}

/// Inner product of two sparse rows sorted by term id.
fn sparse_dot(a: &[(u32, f64)], b: &[(u32, f64)]) -> f64 {
    let (mut i, mut j, mut dot) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}
