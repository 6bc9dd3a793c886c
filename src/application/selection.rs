use crate::domain::availability::{blocked_day_set, booked_day_set};
use crate::domain::models::{
    BlockedInterval, BookedInterval, CalendarDay, CalendarError, Selection, SelectionState,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Called synchronously with the recomputed selected-day list after every
/// selection mutation. The explicit replacement for a UI framework's
/// re-render-on-state-change.
pub type SelectionObserver = Arc<dyn Fn(&Selection, &[CalendarDay]) + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("pick a check-in date before choosing a check-out date")]
    NoCheckInSelected,
    #[error("check-out cannot fall on the check-in day; pick a later date")]
    SameDayRange,
    #[error("check-out {picked} is before check-in {check_in}; pick a later date or restart")]
    CheckOutBeforeCheckIn {
        check_in: CalendarDay,
        picked: CalendarDay,
    },
    #[error("{day} is already booked or blocked and cannot be selected")]
    DayUnavailable { day: CalendarDay },
}

/// The range picker's state machine: Empty -> CheckInSet -> BothSet, with
/// transitions back on re-picks and resets. Owns the active property's
/// booked/blocked membership sets so an excluded day can never anchor a
/// selection.
pub struct SelectionController {
    selection: Selection,
    booked_days: BTreeSet<CalendarDay>,
    blocked_days: BTreeSet<CalendarDay>,
    observer: Option<SelectionObserver>,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionController {
    pub fn new() -> Self {
        Self {
            selection: Selection::default(),
            booked_days: BTreeSet::new(),
            blocked_days: BTreeSet::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: SelectionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Rebuilds the exclusion sets from the property's intervals. The
    /// classifier and the pick guards both read from these flattened sets.
    pub fn set_exclusions(
        &mut self,
        booked: &[BookedInterval],
        blocked: &[BlockedInterval],
    ) -> Result<(), CalendarError> {
        self.booked_days = booked_day_set(booked)?;
        self.blocked_days = blocked_day_set(blocked)?;
        Ok(())
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn state(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn booked_days(&self) -> &BTreeSet<CalendarDay> {
        &self.booked_days
    }

    pub fn blocked_days(&self) -> &BTreeSet<CalendarDay> {
        &self.blocked_days
    }

    /// The endpoints are kept strictly ordered, so expansion cannot fail.
    pub fn selected_days(&self) -> Vec<CalendarDay> {
        self.selection.selected_days().unwrap_or_default()
    }

    pub fn pick_check_in(&mut self, day: CalendarDay) -> Result<(), SelectionError> {
        self.ensure_selectable(day)?;

        self.selection.check_in = Some(day);
        if let Some(check_out) = self.selection.check_out {
            if check_out <= day {
                self.selection.check_out = None;
            }
        }
        self.notify();
        Ok(())
    }

    pub fn pick_check_out(&mut self, day: CalendarDay) -> Result<(), SelectionError> {
        let Some(check_in) = self.selection.check_in else {
            return Err(SelectionError::NoCheckInSelected);
        };
        if day == check_in {
            return Err(SelectionError::SameDayRange);
        }
        if day < check_in {
            return Err(SelectionError::CheckOutBeforeCheckIn {
                check_in,
                picked: day,
            });
        }
        self.ensure_selectable(day)?;

        self.selection.check_out = Some(day);
        self.notify();
        Ok(())
    }

    /// Back to `Empty`. Invoked when the target property changes and after
    /// a successful blocking submission.
    pub fn clear(&mut self) {
        self.selection = Selection::default();
        self.notify();
    }

    fn ensure_selectable(&self, day: CalendarDay) -> Result<(), SelectionError> {
        if self.booked_days.contains(&day) || self.blocked_days.contains(&day) {
            return Err(SelectionError::DayUnavailable { day });
        }
        Ok(())
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            let days = self.selected_days();
            observer(&self.selection, &days);
        }
    }
}
