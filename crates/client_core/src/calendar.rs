//! Calendar events derived from trainings.

use chrono::{DateTime, FixedOffset, TimeDelta};
use shared::domain::Training;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// One event per training with a usable date, in input order.
///
/// Trainings without a server id are keyed by their position. A negative
/// duration is treated as zero; one too long to represent is skipped.
pub fn calendar_events(trainings: &[Training]) -> Vec<CalendarEvent> {
    trainings
        .iter()
        .enumerate()
        .filter_map(|(index, training)| {
            let Some(start) = training.starts_at() else {
                debug!(date = %training.date, "skipping training with unparsable date");
                return None;
            };
            let Some(end) = TimeDelta::try_minutes(training.duration.max(0))
                .and_then(|length| start.checked_add_signed(length))
            else {
                debug!(duration = training.duration, "skipping training with out-of-range duration");
                return None;
            };
            Some(CalendarEvent {
                id: training
                    .id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| index.to_string()),
                title: event_title(training),
                start,
                end,
            })
        })
        .collect()
}

fn event_title(training: &Training) -> String {
    match training.customer_name() {
        Some(name) if name.is_complete() => {
            format!("{} / {}", training.activity, name.display_name())
        }
        _ => training.activity.clone(),
    }
}

/// Events overlapping `[from, to)`, ordered by start time.
pub fn events_between(
    events: &[CalendarEvent],
    from: DateTime<FixedOffset>,
    to: DateTime<FixedOffset>,
) -> Vec<&CalendarEvent> {
    let mut selected: Vec<&CalendarEvent> = events
        .iter()
        .filter(|event| event.start < to && (event.end > from || event.start == from))
        .collect();
    selected.sort_by_key(|event| event.start);
    selected
}

#[cfg(test)]
#[path = "tests/calendar_tests.rs"]
mod tests;
