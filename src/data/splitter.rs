// ============================================================
// Layer 4 - Train/Test Splitter
// ============================================================
// Partitions a dataset into two disjoint index sets.
//
// Every model in a run is trained and evaluated on the SAME
// partition, so the split is computed once on indices and then
// applied to whatever representation each pipeline needs.
//
// The split is reproducible: a seeded StdRng drives the
// Fisher-Yates shuffle instead of thread_rng().
//
// Stratified mode keeps the legit:spam ratio of each side close
// to the ratio of the whole dataset (largest-remainder
// allocation per class).
//
// Reference: rand crate documentation (SliceRandom, SeedableRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::email::Label;

/// Disjoint train / held-out index sets into the original record list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train:    Vec<usize>,
    pub held_out: Vec<usize>,
}

impl SplitIndices {
    /// Pick the elements at the train and held-out positions.
    pub fn apply<T: Clone>(&self, items: &[T]) -> (Vec<T>, Vec<T>) {
        (
            self.train.iter().map(|&i| items[i].clone()).collect(),
            self.held_out.iter().map(|&i| items[i].clone()).collect(),
        )
    }
}

/// Number of training items for `total` items. For fractions strictly
/// between 0 and 1 both sides receive at least one item when possible.
fn train_count(total: usize, train_fraction: f64) -> usize {
    let raw = ((total as f64) * train_fraction).round() as usize;
    let raw = raw.min(total);
    if total >= 2 && train_fraction > 0.0 && train_fraction < 1.0 {
        raw.clamp(1, total - 1)
    } else {
        raw
    }
}

/// Split positions `0..labels.len()` into train and held-out sets.
pub fn split_indices(labels: &[Label], train_fraction: f64, seed: u64, stratify: bool) -> SplitIndices {
    let mut rng   = StdRng::seed_from_u64(seed);
    let total     = labels.len();
    let n_train   = train_count(total, train_fraction);

    let (mut train, mut held_out) = if stratify {
        stratified(labels, n_train, &mut rng)
    } else {
        let mut all: Vec<usize> = (0..total).collect();
        all.shuffle(&mut rng);
        let held_out = all.split_off(n_train);
        (all, held_out)
    };

    // Training order is shuffled; the held-out set is kept in file order
    // so reports line up with the dataset.
    train.shuffle(&mut rng);
    held_out.sort_unstable();

    tracing::debug!(
        "Split {} records: {} train, {} held out ({}% / {}%)",
        total,
        train.len(),
        held_out.len(),
        (train.len() * 100) / total.max(1),
        (held_out.len() * 100) / total.max(1),
    );

    SplitIndices { train, held_out }
}

fn stratified(labels: &[Label], n_train: usize, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let total = labels.len();

    // Per-class index lists, shuffled independently
    let mut by_class: Vec<Vec<usize>> = Label::ALL
        .iter()
        .map(|&class| (0..total).filter(|&i| labels[i] == class).collect())
        .collect();
    for members in by_class.iter_mut() {
        members.shuffle(rng);
    }

    // Largest-remainder allocation of n_train across classes
    let quotas: Vec<f64> = by_class
        .iter()
        .map(|m| m.len() as f64 * n_train as f64 / total.max(1) as f64)
        .collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let mut remaining = n_train.saturating_sub(counts.iter().sum());

    let mut order: Vec<usize> = (0..by_class.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = quotas[a] - quotas[a].floor();
        let fb = quotas[b] - quotas[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });
    while remaining > 0 {
        let before = remaining;
        for &c in &order {
            if remaining > 0 && counts[c] < by_class[c].len() {
                counts[c] += 1;
                remaining -= 1;
            }
        }
        if remaining == before {
            break;
        }
    }

    let mut train    = Vec::with_capacity(n_train);
    let mut held_out = Vec::with_capacity(total - n_train);
    for (members, &k) in by_class.iter().zip(&counts) {
        train.extend_from_slice(&members[..k]);
        held_out.extend_from_slice(&members[k..]);
    }
    (train, held_out)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::LabelDistribution;

    fn labels(legit: usize, spam: usize) -> Vec<Label> {
        let mut v = vec![Label::Legit; legit];
        v.extend(vec![Label::Spam; spam]);
        v
    }

    #[test]
    fn test_correct_split_sizes() {
        let split = split_indices(&labels(80, 20), 0.8, 42, false);
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.held_out.len(), 20);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let split = split_indices(&labels(39, 11), 0.7, 7, true);
        let mut all: Vec<usize> = split.train.iter().chain(&split.held_out).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let l = labels(60, 15);
        assert_eq!(split_indices(&l, 0.8, 3, true), split_indices(&l, 0.8, 3, true));
        assert_ne!(split_indices(&l, 0.8, 3, true), split_indices(&l, 0.8, 4, true));
    }

    #[test]
    fn test_stratified_keeps_class_ratio() {
        let l = labels(3900, 927);
        let split = split_indices(&l, 0.8, 42, true);
        let test = LabelDistribution::from_labels(split.held_out.iter().map(|&i| l[i]));
        assert_eq!(test.legit, 780);
        assert_eq!(test.spam, 185);
    }

    #[test]
    fn test_two_records_half_split_keeps_both_sides_non_empty() {
        let split = split_indices(&labels(1, 1), 0.5, 42, true);
        assert_eq!(split.train.len(), 1);
        assert_eq!(split.held_out.len(), 1);
    }

    #[test]
    fn test_empty_dataset() {
        let split = split_indices(&[], 0.8, 42, true);
        assert!(split.train.is_empty());
        assert!(split.held_out.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let split = split_indices(&labels(5, 5), 1.0, 42, false);
        assert_eq!(split.train.len(), 10);
        assert!(split.held_out.is_empty());
    }

    #[test]
    fn test_apply_picks_positions() {
        let items = vec!["a", "b", "c"];
        let split = SplitIndices { train: vec![2, 0], held_out: vec![1] };
        assert_eq!(split.apply(&items), (vec!["c", "a"], vec!["b"]));
    }
}
