//! Per-activity duration totals for the statistics chart.

use std::collections::HashMap;

use shared::domain::Training;

pub const UNKNOWN_ACTIVITY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTotal {
    pub name: String,
    pub duration: i64,
}

/// Sums durations per activity in order of first appearance. Trainings with
/// an empty activity are grouped under [`UNKNOWN_ACTIVITY`]. Sums saturate.
pub fn activity_totals(trainings: &[Training]) -> Vec<ActivityTotal> {
    let mut totals: Vec<ActivityTotal> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for training in trainings {
        let name = if training.activity.is_empty() {
            UNKNOWN_ACTIVITY
        } else {
            training.activity.as_str()
        };
        match positions.get(name) {
            Some(&index) => {
                let total = &mut totals[index].duration;
                *total = total.saturating_add(training.duration);
            }
            None => {
                positions.insert(name.to_string(), totals.len());
                totals.push(ActivityTotal {
                    name: name.to_string(),
                    duration: training.duration,
                });
            }
        }
    }

    totals
}
