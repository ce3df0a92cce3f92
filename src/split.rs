use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::TrainingError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn test_size(rows: usize, test_ratio: f64) -> usize {
    ((rows as f64) * test_ratio).ceil() as usize
}

/// Shuffled hold-out split over `rows` indices.
pub fn train_test_split(rows: usize, test_ratio: f64, seed: u64) -> Result<Split, TrainingError> {
    let test_rows = test_size(rows, test_ratio);
    if test_rows == 0 || test_rows >= rows {
        return Err(TrainingError::EmptySplit { rows });
    }

    let mut indices: Vec<usize> = (0..rows).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let train = indices.split_off(test_rows);
    Ok(Split {
        train,
        test: indices,
    })
}

/// Hold-out split that keeps each class's share in both halves.
pub fn stratified_split(labels: &[usize], test_ratio: f64, seed: u64) -> Result<Split, TrainingError> {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, label) in labels.iter().enumerate() {
        by_class.entry(*label).or_default().push(index);
    }

    if by_class.len() < 2 {
        return Err(if labels.is_empty() {
            TrainingError::EmptySplit { rows: 0 }
        } else {
            TrainingError::SingleClass
        });
    }
    if let Some((class, members)) = by_class.iter().find(|(_, members)| members.len() < 2) {
        return Err(TrainingError::ClassTooSmall {
            class: *class,
            count: members.len(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(labels.len()),
        test: Vec::new(),
    };
    for mut members in by_class.into_values() {
        members.shuffle(&mut rng);
        let take = ((members.len() as f64) * test_ratio)
            .round()
            .clamp(1.0, (members.len() - 1) as f64) as usize;
        let train = members.split_off(take);
        split.test.extend(members);
        split.train.extend(train);
    }
    split.train.shuffle(&mut rng);
    split.test.shuffle(&mut rng);
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_disjoint_and_covers_all_rows() {
        let split = train_test_split(10, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_reproducible_for_a_seed() {
        assert_eq!(
            train_test_split(25, 0.2, 7).unwrap(),
            train_test_split(25, 0.2, 7).unwrap()
        );
    }

    #[test]
    fn tiny_inputs_cannot_be_split() {
        assert!(matches!(
            train_test_split(1, 0.2, 42),
            Err(TrainingError::EmptySplit { rows: 1 })
        ));
        assert!(matches!(
            train_test_split(0, 0.2, 42),
            Err(TrainingError::EmptySplit { rows: 0 })
        ));
    }

    #[test]
    fn stratified_split_keeps_every_class_on_both_sides() {
        let labels = [0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2];
        let split = stratified_split(&labels, 0.2, 42).unwrap();
        for class in 0..3 {
            assert_eq!(split.test.iter().filter(|&&i| labels[i] == class).count(), 1);
            assert_eq!(split.train.iter().filter(|&&i| labels[i] == class).count(), 4);
        }
    }

    #[test]
    fn stratified_split_rejects_degenerate_labels() {
        assert!(matches!(
            stratified_split(&[1, 1, 1], 0.2, 42),
            Err(TrainingError::SingleClass)
        ));
        assert!(matches!(
            stratified_split(&[0, 0, 0, 1], 0.2, 42),
            Err(TrainingError::ClassTooSmall { class: 1, count: 1 })
        ));
    }
}
