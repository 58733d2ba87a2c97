use super::{
    find_customer, find_training, is_affirmative, month_range, parse_user_date,
    refresh_failures, sort_order,
};

use chrono::{TimeZone, Utc};
use client_core::{CustomerColumn, ListEvent, OperationId, OperationKind, SortDirection};
use shared::{
    domain::{Customer, Training, TrainingId},
    error::{ApiError, ErrorCode},
    protocol::Links,
};
use tokio::sync::broadcast;

fn customer(email: &str, href: &str) -> Customer {
    Customer {
        firstname: "Ella".to_string(),
        lastname: "Smith".to_string(),
        email: email.to_string(),
        phone: String::new(),
        streetaddress: String::new(),
        postcode: String::new(),
        city: String::new(),
        links: Some(Links::with_self(href)),
    }
}

fn training(id: i64) -> Training {
    Training {
        id: Some(TrainingId(id)),
        date: "2025-11-03T10:00:00.000Z".to_string(),
        activity: "Gym".to_string(),
        duration: 45,
        customer: None,
        links: None,
    }
}

#[test]
fn only_yes_answers_confirm() {
    assert!(is_affirmative("y\n"));
    assert!(is_affirmative(" YES "));
    assert!(!is_affirmative("\n"));
    assert!(!is_affirmative("nope"));
}

#[test]
fn customer_selector_matches_link_or_email() {
    let customers = vec![
        customer("ella@example.fi", "http://api/customers/1"),
        customer("bo@example.fi", "http://api/customers/2"),
    ];

    let by_link = find_customer(&customers, "http://api/customers/2").expect("by link");
    assert_eq!(by_link.email, "bo@example.fi");

    let by_email = find_customer(&customers, " Ella@Example.fi ").expect("by email");
    assert_eq!(by_email.self_href(), Some("http://api/customers/1"));

    assert!(find_customer(&customers, "nobody@example.fi").is_err());
}

#[test]
fn training_selector_uses_id() {
    let trainings = vec![training(3), training(7)];
    assert_eq!(find_training(&trainings, 7).expect("found").id, Some(TrainingId(7)));
    assert!(find_training(&trainings, 8).is_err());
}

#[test]
fn user_dates_accept_display_format() {
    let expected = Utc.with_ymd_and_hms(2025, 11, 3, 10, 30, 0).single().expect("date");
    assert_eq!(parse_user_date("03.11.2025 10:30").expect("display"), expected);
    assert_eq!(parse_user_date("2025-11-03T10:30:00Z").expect("rfc3339"), expected);
    assert!(parse_user_date("next tuesday").is_err());
}

#[test]
fn month_range_rolls_over_december() {
    let (from, to) = month_range("2025-12").expect("range");
    assert_eq!(from.to_rfc3339(), "2025-12-01T00:00:00+00:00");
    assert_eq!(to.to_rfc3339(), "2026-01-01T00:00:00+00:00");

    assert!(month_range("2025-13").is_err());
    assert!(month_range("december").is_err());
}

#[test]
fn sort_flag_maps_to_direction() {
    assert_eq!(sort_order::<CustomerColumn>(None, true), None);
    let order = sort_order(Some(CustomerColumn::City), true).expect("order");
    assert_eq!(order.column, CustomerColumn::City);
    assert_eq!(order.direction, SortDirection::Desc);
}

#[test]
fn only_refresh_failures_are_reported_after_a_write() {
    let (tx, mut rx) = broadcast::channel(8);
    let failed = |op, kind| ListEvent::Failed {
        resource: "customers",
        op: OperationId(op),
        kind,
        error: ApiError::new(ErrorCode::Decode, "bad json"),
    };
    tx.send(ListEvent::Completed {
        resource: "customers",
        op: OperationId(1),
        kind: OperationKind::Create,
    })
    .expect("send");
    tx.send(failed(2, OperationKind::Refresh)).expect("send");
    tx.send(failed(3, OperationKind::Update)).expect("send");

    let failures = refresh_failures(&mut rx);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("customers list could not be reloaded"));
    assert!(failures[0].ends_with("bad json"));
    assert!(refresh_failures(&mut rx).is_empty());
}
