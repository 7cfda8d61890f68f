//! Invariants of the classification report for arbitrary label sequences.

use pivotlab_core::domain::Label;
use pivotlab_runner::ClassificationReport;
use proptest::prelude::*;

fn label() -> impl Strategy<Value = Label> {
    prop_oneof![Just(Label::Sell), Just(Label::Neutral), Just(Label::Buy)]
}

fn paired_labels() -> impl Strategy<Value = (Vec<Label>, Vec<Label>)> {
    (1usize..200).prop_flat_map(|n| {
        (
            prop::collection::vec(label(), n),
            prop::collection::vec(label(), n),
        )
    })
}

proptest! {
    #[test]
    fn scores_are_bounded((actual, predicted) in paired_labels()) {
        let report = ClassificationReport::from_labels(&actual, &predicted);
        prop_assert!((0.0..=1.0).contains(&report.accuracy));
        for c in &report.classes {
            prop_assert!((0.0..=1.0).contains(&c.precision));
            prop_assert!((0.0..=1.0).contains(&c.recall));
            prop_assert!((0.0..=1.0).contains(&c.f1));
        }
    }

    #[test]
    fn supports_add_up((actual, predicted) in paired_labels()) {
        let report = ClassificationReport::from_labels(&actual, &predicted);
        let total: usize = report.classes.iter().map(|c| c.support).sum();
        prop_assert_eq!(total, actual.len());
        prop_assert_eq!(report.confusion.total(), actual.len());
    }

    #[test]
    fn self_comparison_is_perfect(actual in prop::collection::vec(label(), 1..200)) {
        let report = ClassificationReport::from_labels(&actual, &actual);
        prop_assert_eq!(report.accuracy, 1.0);
        prop_assert!((report.weighted_avg.f1 - 1.0).abs() < 1e-12);
    }
}
