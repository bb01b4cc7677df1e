//! Exemplar-based clustering of a pairwise similarity matrix.
//!
//! Affinity propagation: every item exchanges responsibility/availability
//! messages with every candidate exemplar until a set of exemplars emerges
//! from the similarity structure itself — no preset cluster count. Items
//! dissimilar from everything end up as singleton groups.
//!
//! Self-similarities (preferences) are set to the median of the off-diagonal
//! similarities. Exactly symmetric inputs (identical rows) would deadlock
//! the message passing, so a tiny index-keyed jitter is added up front —
//! deterministic, unlike the random perturbation commonly used, so repeated
//! runs on the same input agree. Group labels are still an arbitrary
//! numbering; callers must not rely on specific label values.

const DAMPING: f64 = 0.5;
const MAX_ITER: usize = 200;
const CONVERGENCE_ITER: usize = 15;

/// Jitter magnitude for symmetry breaking. Far below any meaningful
/// similarity difference, far above f64 noise accumulated over a sweep.
const JITTER: f64 = 1e-9;

/// Cluster items by affinity propagation over `similarity` (n x n,
/// symmetric). Returns one group id per item, compacted to `0..k` in
/// first-appearance order.
pub fn cluster_similarity(similarity: &[Vec<f64>]) -> Vec<usize> {
    let n = similarity.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0];
    }

    // Working copy: median preference on the diagonal, jitter everywhere.
    let mut off_diagonal: Vec<f64> = Vec::with_capacity(n * (n - 1));
    for (i, row) in similarity.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            if i != j {
                off_diagonal.push(v);
            }
        }
    }
    let preference = median(&mut off_diagonal);

    let mut s = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            let base = if i == j {
                preference
            } else {
                similarity[i][j]
            };
            s[i][j] = base + JITTER * ((i * n + j) as f64 + 1.0);
        }
    }

    let mut r = vec![vec![0.0; n]; n];
    let mut a = vec![vec![0.0; n]; n];
    let mut last_exemplars: Vec<bool> = vec![false; n];
    let mut stable_for = 0;

    for _ in 0..MAX_ITER {
        // Responsibilities: r(i,k) = s(i,k) - max_{k'≠k}(a(i,k') + s(i,k'))
        for i in 0..n {
            let (mut best, mut second) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
            let mut best_k = 0;
            for k in 0..n {
                let v = a[i][k] + s[i][k];
                if v > best {
                    second = best;
                    best = v;
                    best_k = k;
                } else if v > second {
                    second = v;
                }
            }
            for k in 0..n {
                let competing = if k == best_k { second } else { best };
                r[i][k] = DAMPING * r[i][k] + (1.0 - DAMPING) * (s[i][k] - competing);
            }
        }

        // Availabilities: a(i,k) = min(0, r(k,k) + Σ_{i'∉{i,k}} max(0, r(i',k)))
        // and a(k,k) = Σ_{i'≠k} max(0, r(i',k)).
        for k in 0..n {
            let positive_sum: f64 = (0..n)
                .filter(|&i| i != k)
                .map(|i| r[i][k].max(0.0))
                .sum();
            for i in 0..n {
                let new = if i == k {
                    positive_sum
                } else {
                    (r[k][k] + positive_sum - r[i][k].max(0.0)).min(0.0)
                };
                a[i][k] = DAMPING * a[i][k] + (1.0 - DAMPING) * new;
            }
        }

        let exemplars: Vec<bool> = (0..n).map(|k| r[k][k] + a[k][k] > 0.0).collect();
        if exemplars == last_exemplars {
            stable_for += 1;
            if stable_for >= CONVERGENCE_ITER && exemplars.iter().any(|&e| e) {
                break;
            }
        } else {
            stable_for = 0;
            last_exemplars = exemplars;
        }
    }

    let exemplars: Vec<usize> = (0..n).filter(|&k| r[k][k] + a[k][k] > 0.0).collect();
    if exemplars.is_empty() {
        // Nothing accumulated enough evidence to represent anything else —
        // every item stands alone.
        return (0..n).collect();
    }

    // Assign each item to its most similar exemplar; exemplars to themselves.
    let assignment: Vec<usize> = (0..n)
        .map(|i| {
            if exemplars.contains(&i) {
                i
            } else {
                *exemplars
                    .iter()
                    .max_by(|&&x, &&y| s[i][x].total_cmp(&s[i][y]))
                    .unwrap_or(&exemplars[0])
            }
        })
        .collect();

    compact_labels(&assignment)
}

/// Renumber exemplar indices to consecutive group ids in first-appearance
/// order.
fn compact_labels(assignment: &[usize]) -> Vec<usize> {
    let mut ids: Vec<usize> = Vec::new();
    assignment
        .iter()
        .map(|&exemplar| {
            if let Some(pos) = ids.iter().position(|&e| e == exemplar) {
                pos
            } else {
                ids.push(exemplar);
                ids.len() - 1
            }
        })
        .collect()
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
