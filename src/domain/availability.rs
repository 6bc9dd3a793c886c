use crate::domain::models::{
    BlockedInterval, BookedInterval, CalendarDay, CalendarError, DayClassification, Selection,
};
use std::collections::BTreeSet;

/// Expands `start..=end` into the explicit list of days it spans, ascending.
/// Pure and deterministic; `start > end` is a caller bug surfaced as
/// `InvalidRange`.
pub fn expand_range(
    start: CalendarDay,
    end: CalendarDay,
) -> Result<Vec<CalendarDay>, CalendarError> {
    if start > end {
        return Err(CalendarError::InvalidRange { start, end });
    }

    let span = (end.date() - start.date()).num_days() as usize;
    let mut days = Vec::with_capacity(span + 1);
    let mut cursor = start;
    while cursor <= end {
        days.push(cursor);
        let Some(next) = cursor.succ() else {
            break;
        };
        cursor = next;
    }
    Ok(days)
}

/// Flattens confirmed reservations into a day-membership set for the
/// classifier. The classifier itself never does interval math.
pub fn booked_day_set(
    intervals: &[BookedInterval],
) -> Result<BTreeSet<CalendarDay>, CalendarError> {
    let mut days = BTreeSet::new();
    for interval in intervals {
        days.extend(expand_range(interval.check_in, interval.check_out)?);
    }
    Ok(days)
}

pub fn blocked_day_set(
    intervals: &[BlockedInterval],
) -> Result<BTreeSet<CalendarDay>, CalendarError> {
    let mut days = BTreeSet::new();
    for interval in intervals {
        days.extend(expand_range(interval.start_date, interval.end_date)?);
    }
    Ok(days)
}

/// Assigns a day its display state. The check order is fixed:
/// Past > Blocked > Booked > Selected > Available, so a day can never read
/// as bookable once any disqualifying condition holds, even on
/// contradictory inputs.
pub fn classify(
    day: CalendarDay,
    today: CalendarDay,
    selection: &Selection,
    booked: &BTreeSet<CalendarDay>,
    blocked: &BTreeSet<CalendarDay>,
) -> DayClassification {
    if day < today {
        return DayClassification::Past;
    }
    if blocked.contains(&day) {
        return DayClassification::Blocked;
    }
    if booked.contains(&day) {
        return DayClassification::Booked;
    }
    if selection.check_in == Some(day) {
        return DayClassification::Selected;
    }
    DayClassification::Available
}

impl Selection {
    /// The explicit day list this selection covers: the expanded range when
    /// both endpoints are set, the check-in day alone when only it is set.
    pub fn selected_days(&self) -> Result<Vec<CalendarDay>, CalendarError> {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => expand_range(check_in, check_out),
            (Some(check_in), None) => Ok(vec![check_in]),
            (None, _) => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn day(value: &str) -> CalendarDay {
        CalendarDay::parse(value).expect("valid calendar day")
    }

    fn day_at_offset(offset: i64) -> CalendarDay {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid base date");
        CalendarDay::new(base + Duration::days(offset))
    }

    #[test]
    fn expand_range_covers_both_endpoints_inclusive() {
        let days = expand_range(day("2024-06-10"), day("2024-06-13")).expect("valid range");
        assert_eq!(
            days,
            vec![
                day("2024-06-10"),
                day("2024-06-11"),
                day("2024-06-12"),
                day("2024-06-13"),
            ]
        );
    }

    #[test]
    fn expand_range_of_a_single_day_is_that_day() {
        let days = expand_range(day("2024-06-10"), day("2024-06-10")).expect("valid range");
        assert_eq!(days, vec![day("2024-06-10")]);
    }

    #[test]
    fn expand_range_rejects_reversed_endpoints() {
        let result = expand_range(day("2024-06-13"), day("2024-06-10"));
        assert_eq!(
            result,
            Err(CalendarError::InvalidRange {
                start: day("2024-06-13"),
                end: day("2024-06-10"),
            })
        );
    }

    proptest! {
        #[test]
        fn expand_range_length_and_endpoints_hold_for_any_span(
            start_offset in 0i64..3_000,
            span in 0i64..400,
        ) {
            let start = day_at_offset(start_offset);
            let end = day_at_offset(start_offset + span);
            let days = expand_range(start, end).expect("valid range");

            prop_assert_eq!(days.len() as i64, span + 1);
            prop_assert_eq!(days[0], start);
            prop_assert_eq!(*days.last().expect("non-empty"), end);
            for pair in days.windows(2) {
                prop_assert_eq!(pair[0].succ(), Some(pair[1]));
            }
        }
    }

    proptest! {
        #[test]
        fn expand_range_is_deterministic(start_offset in 0i64..3_000, span in 0i64..120) {
            let start = day_at_offset(start_offset);
            let end = day_at_offset(start_offset + span);
            let first = expand_range(start, end).expect("valid range");
            let second = expand_range(start, end).expect("valid range");
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn booked_day_set_flattens_every_interval() {
        let booked = vec![
            BookedInterval {
                check_in: day("2024-06-10"),
                check_out: day("2024-06-12"),
            },
            BookedInterval {
                check_in: day("2024-06-20"),
                check_out: day("2024-06-21"),
            },
        ];
        let set = booked_day_set(&booked).expect("valid intervals");
        assert_eq!(set.len(), 5);
        assert!(set.contains(&day("2024-06-11")));
        assert!(set.contains(&day("2024-06-21")));
        assert!(!set.contains(&day("2024-06-13")));
    }

    #[test]
    fn blocked_day_set_surfaces_reversed_interval_endpoints() {
        let blocked = vec![BlockedInterval {
            id: "blk-1".to_string(),
            start_date: day("2024-07-05"),
            end_date: day("2024-07-01"),
        }];
        assert!(blocked_day_set(&blocked).is_err());
    }

    proptest! {
        #[test]
        fn classify_past_wins_over_every_other_state(
            day_offset in 0i64..500,
            today_gap in 1i64..500,
            in_booked in any::<bool>(),
            in_blocked in any::<bool>(),
            is_selected in any::<bool>(),
        ) {
            let candidate = day_at_offset(day_offset);
            let today = day_at_offset(day_offset + today_gap);

            let mut booked = BTreeSet::new();
            if in_booked {
                booked.insert(candidate);
            }
            let mut blocked = BTreeSet::new();
            if in_blocked {
                blocked.insert(candidate);
            }
            let selection = Selection {
                check_in: is_selected.then_some(candidate),
                check_out: None,
            };

            prop_assert_eq!(
                classify(candidate, today, &selection, &booked, &blocked),
                DayClassification::Past
            );
        }
    }

    proptest! {
        #[test]
        fn classify_blocked_wins_over_booked_and_selected(day_offset in 0i64..500) {
            let candidate = day_at_offset(day_offset);
            let today = day_at_offset(0);

            let booked = BTreeSet::from([candidate]);
            let blocked = BTreeSet::from([candidate]);
            let selection = Selection {
                check_in: Some(candidate),
                check_out: None,
            };

            prop_assert_eq!(
                classify(candidate, today, &selection, &booked, &blocked),
                DayClassification::Blocked
            );
        }
    }

    #[test]
    fn classify_walks_the_full_priority_ladder() {
        let today = day("2024-06-10");
        let booked = BTreeSet::from([day("2024-06-12")]);
        let blocked = BTreeSet::from([day("2024-06-11")]);
        let selection = Selection {
            check_in: Some(day("2024-06-13")),
            check_out: None,
        };

        let classify_day =
            |candidate| classify(candidate, today, &selection, &booked, &blocked);

        assert_eq!(classify_day(day("2024-06-09")), DayClassification::Past);
        assert_eq!(classify_day(day("2024-06-11")), DayClassification::Blocked);
        assert_eq!(classify_day(day("2024-06-12")), DayClassification::Booked);
        assert_eq!(classify_day(day("2024-06-13")), DayClassification::Selected);
        assert_eq!(classify_day(day("2024-06-14")), DayClassification::Available);
    }

    #[test]
    fn selected_days_tracks_the_selection_shape() {
        let empty = Selection::default();
        assert!(empty.selected_days().expect("empty selection").is_empty());

        let check_in_only = Selection {
            check_in: Some(day("2024-06-10")),
            check_out: None,
        };
        assert_eq!(
            check_in_only.selected_days().expect("single day"),
            vec![day("2024-06-10")]
        );

        let both = Selection {
            check_in: Some(day("2024-06-10")),
            check_out: Some(day("2024-06-13")),
        };
        assert_eq!(both.selected_days().expect("expanded range").len(), 4);
    }
}
