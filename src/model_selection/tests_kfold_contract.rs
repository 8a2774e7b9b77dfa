// =========================================================================
// KFold contract
//
// - exactly K splits, test folds partition 0..n
// - train and test are disjoint and cover 0..n in every split
// - fold sizes differ by at most one, larger folds first
// - a seed fixes the permutation; different seeds give different ones
// =========================================================================

use super::*;
use proptest::prelude::*;
use std::collections::HashSet;

#[test]
fn falsify_kf_001_produces_k_splits() {
    assert_eq!(KFold::new(5).split(100).len(), 5);
    assert!(KFold::new(0).split(10).is_empty());
}

#[test]
fn falsify_kf_002_remainder_goes_to_first_folds() {
    let sizes: Vec<usize> = KFold::new(4)
        .split(17)
        .iter()
        .map(|(_, test)| test.len())
        .collect();
    assert_eq!(sizes, vec![5, 4, 4, 4]);
}

#[test]
fn falsify_kf_003_unshuffled_folds_are_contiguous() {
    let splits = KFold::new(3).split(6);
    assert_eq!(splits[0].1, vec![0, 1]);
    assert_eq!(splits[1].1, vec![2, 3]);
    assert_eq!(splits[1].0, vec![0, 1, 4, 5]);
}

#[test]
fn falsify_kf_004_seed_fixes_the_permutation() {
    let a = KFold::new(4).with_random_state(5).split(40);
    let b = KFold::new(4).with_random_state(5).split(40);
    let c = KFold::new(4).with_random_state(6).split(40);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, KFold::new(4).split(40));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_test_folds_partition_samples(k in 2usize..=8, n in 8usize..=60, seed in any::<u64>()) {
        let splits = KFold::new(k).with_random_state(seed).split(n);
        prop_assert_eq!(splits.len(), k);

        let mut seen = vec![0usize; n];
        for (train, test) in &splits {
            for &idx in test {
                seen[idx] += 1;
            }
            let train_set: HashSet<usize> = train.iter().copied().collect();
            prop_assert!(test.iter().all(|idx| !train_set.contains(idx)));
            prop_assert_eq!(train.len() + test.len(), n);
        }
        prop_assert!(seen.iter().all(|&c| c == 1));

        let sizes: Vec<usize> = splits.iter().map(|(_, t)| t.len()).collect();
        let max = sizes.iter().copied().max().unwrap_or(0);
        let min = sizes.iter().copied().min().unwrap_or(0);
        prop_assert!(max - min <= 1);
    }
}
