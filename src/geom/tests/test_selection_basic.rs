//! Tests for selection set algebra.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geom::{DeformError, SelectionSet};

fn random_selection(rng: &mut StdRng, n: usize) -> SelectionSet {
    SelectionSet::from_weights((0..n).map(|_| rng.random_range(0.0..=1.0)))
}

#[test]
fn test_union_and_intersection_are_max_and_min() {
    let mut rng = StdRng::seed_from_u64(0x5e1ec7);
    for _ in 0..20 {
        let a = random_selection(&mut rng, 32);
        let b = random_selection(&mut rng, 32);
        let union = a.union(&b).unwrap();
        let intersection = a.intersection(&b).unwrap();
        for i in 0..32 {
            assert_eq!(union.weight(i), a.weight(i).max(b.weight(i)));
            assert_eq!(intersection.weight(i), a.weight(i).min(b.weight(i)));
        }
    }
}

#[test]
fn test_double_invert_restores_weights() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = random_selection(&mut rng, 64);
    let back = a.invert().invert();
    for (x, y) in a.iter().zip(back.iter()) {
        assert!((x - y).abs() < 1e-12);
    }
}

#[test]
fn test_all_selected_is_identity_for_intersection() {
    let mut rng = StdRng::seed_from_u64(3);
    let a = random_selection(&mut rng, 16);
    let all = SelectionSet::all_selected(16);

    assert_eq!(all.intersection(&a).unwrap(), a);
    assert_eq!(all.union(&a).unwrap(), all);
}

#[test]
fn test_combinators_reject_mismatched_domains() {
    let a = SelectionSet::all_selected(4);
    let b = SelectionSet::all_deselected(5);
    let expected = DeformError::SizeMismatch {
        expected: 4,
        actual: 5,
    };
    assert_eq!(a.union(&b).unwrap_err(), expected);
    assert_eq!(a.intersection(&b).unwrap_err(), expected);
    assert_eq!(a.subtract(&b).unwrap_err(), expected);
}

#[test]
fn test_construction_modes() {
    assert!(SelectionSet::all_selected(3).iter().all(|w| w == 1.0));
    assert!(SelectionSet::all_deselected(3).iter().all(|w| w == 0.0));

    let odd = SelectionSet::from_predicate(4, |i| i % 2 == 1);
    assert_eq!(odd.weights(), &[0.0, 1.0, 0.0, 1.0]);
    assert_eq!(odd.len(), 4);
    assert!(!odd.is_empty());
}
