//! Plain-text tables and charts for terminal output.

use client_core::{calendar::CalendarEvent, statistics::ActivityTotal};
use shared::domain::{Customer, Training};

const BAR_WIDTH: usize = 40;

pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| capitalize(h)).collect();
    push_row(&mut out, &header_cells, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn customer_table(customers: &[Customer]) -> String {
    let rows: Vec<Vec<String>> = customers
        .iter()
        .map(|c| {
            vec![
                c.firstname.clone(),
                c.lastname.clone(),
                c.email.clone(),
                c.phone.clone(),
                c.city.clone(),
            ]
        })
        .collect();
    table(&["firstname", "lastname", "email", "phone", "city"], &rows)
}

pub fn training_table(trainings: &[Training]) -> String {
    let rows: Vec<Vec<String>> = trainings
        .iter()
        .map(|t| {
            vec![
                t.id.map(|id| id.to_string()).unwrap_or_default(),
                t.date_display(),
                t.activity.clone(),
                t.duration.to_string(),
                t.customer_display(),
            ]
        })
        .collect();
    table(&["id", "date", "activity", "duration", "customer"], &rows)
}

pub fn calendar_listing(events: &[&CalendarEvent]) -> String {
    let mut out = String::new();
    for event in events {
        out.push_str(&format!(
            "{} {}-{}  {}\n",
            event.start.format("%d.%m.%Y"),
            event.start.format("%H:%M"),
            event.end.format("%H:%M"),
            event.title
        ));
    }
    out
}

/// Horizontal bars scaled so the longest total spans the full width.
pub fn duration_chart(totals: &[ActivityTotal]) -> String {
    let label_width = totals
        .iter()
        .map(|t| t.name.chars().count())
        .max()
        .unwrap_or(0);
    let max = totals.iter().map(|t| t.duration).max().unwrap_or(0).max(1);

    let mut out = String::new();
    for total in totals {
        let len = (total.duration.max(0) as u128 * BAR_WIDTH as u128 / max as u128) as usize;
        out.push_str(&format!(
            "{:<label_width$}  {:<bar_width$}  {} min\n",
            total.name,
            "#".repeat(len),
            total.duration,
            bar_width = BAR_WIDTH,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{CustomerName, CustomerRef, TrainingId};

    #[test]
    fn table_pads_columns_and_capitalizes_headers() {
        let out = table(
            &["name", "city"],
            &[vec!["Ella".to_string(), "Helsinki".to_string()]],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Name  City");
        assert_eq!(lines[1], "----  --------");
        assert_eq!(lines[2], "Ella  Helsinki");
    }

    #[test]
    fn training_rows_show_dash_for_missing_customer() {
        let trainings = vec![
            Training {
                id: Some(TrainingId(1)),
                date: "2025-11-03T10:00:00.000+00:00".to_string(),
                activity: "Gym".to_string(),
                duration: 60,
                customer: Some(CustomerRef::Embedded(CustomerName::new("Ella", "Smith"))),
                links: None,
            },
            Training {
                id: Some(TrainingId(2)),
                date: "2025-11-04".to_string(),
                activity: "Yoga".to_string(),
                duration: 30,
                customer: None,
                links: None,
            },
        ];
        let out = training_table(&trainings);
        assert!(out.contains("03.11.2025 10:00"));
        assert!(out.contains("Ella Smith"));
        assert!(out.lines().nth(3).expect("second row").ends_with('-'));
    }

    #[test]
    fn chart_scales_to_longest_total() {
        let out = duration_chart(&[
            ActivityTotal {
                name: "Gym".to_string(),
                duration: 80,
            },
            ActivityTotal {
                name: "Yoga".to_string(),
                duration: 20,
            },
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0].matches('#').count(), BAR_WIDTH);
        assert_eq!(lines[1].matches('#').count(), BAR_WIDTH / 4);
        assert!(lines[1].ends_with("20 min"));
    }

    #[test]
    fn chart_handles_extreme_totals() {
        let out = duration_chart(&[
            ActivityTotal {
                name: "Gym".to_string(),
                duration: i64::MAX,
            },
            ActivityTotal {
                name: "Yoga".to_string(),
                duration: -5,
            },
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0].matches('#').count(), BAR_WIDTH);
        assert_eq!(lines[1].matches('#').count(), 0);
    }
}
