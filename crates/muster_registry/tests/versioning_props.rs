//! Property tests for revision selection.

use muster_registry::{BooksDate, RevisionKey, resolve_revision};
use proptest::prelude::*;

fn arb_date() -> impl Strategy<Value = BooksDate> {
    (1990u16..2040, 1u8..=12, 1u8..=28).prop_map(|(year, month, day)| BooksDate::new(year, month, day))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn picks_the_latest_revision_not_after_the_date(
        available in prop::collection::vec(arb_date(), 0..8usize),
        requested in arb_date(),
    ) {
        match resolve_revision(&available, Some(&requested)) {
            RevisionKey::Default => {
                prop_assert!(available.iter().all(|date| *date > requested));
            }
            RevisionKey::Dated(picked) => {
                prop_assert!(available.contains(&picked));
                prop_assert!(picked <= requested);
                prop_assert!(
                    available.iter().all(|date| *date > requested || *date <= picked)
                );
            }
        }
    }

    #[test]
    fn ignores_the_order_of_available_revisions(
        mut available in prop::collection::vec(arb_date(), 0..8usize),
        requested in arb_date(),
    ) {
        let before = resolve_revision(&available, Some(&requested));
        available.reverse();
        prop_assert_eq!(resolve_revision(&available, Some(&requested)), before);
        available.sort();
        prop_assert_eq!(resolve_revision(&available, Some(&requested)), before);
    }

    #[test]
    fn three_revisions_partition_the_timeline(
        dates in prop::collection::btree_set(arb_date(), 3),
        probe in arb_date(),
    ) {
        let dates: Vec<BooksDate> = dates.into_iter().collect();
        let (d1, d2, d3) = (dates[0], dates[1], dates[2]);
        let expected = if probe < d1 {
            RevisionKey::Default
        } else if probe < d2 {
            RevisionKey::Dated(d1)
        } else if probe < d3 {
            RevisionKey::Dated(d2)
        } else {
            RevisionKey::Dated(d3)
        };
        prop_assert_eq!(resolve_revision(&dates, Some(&probe)), expected);
    }

    #[test]
    fn no_date_means_default(available in prop::collection::vec(arb_date(), 0..8usize)) {
        prop_assert_eq!(resolve_revision(&available, None), RevisionKey::Default);
    }

    #[test]
    fn display_parses_back(date in arb_date()) {
        prop_assert_eq!(date.to_string().parse::<BooksDate>().unwrap(), date);
    }
}
