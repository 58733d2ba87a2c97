//! Client-side filtering and sorting of fetched record lists.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, FixedOffset};
use shared::domain::{Customer, Training};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder<C> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C> SortOrder<C> {
    pub fn asc(column: C) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: C) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }
}

/// Header-click sort state: a new column starts ascending, the active
/// column flips direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<C> {
    active: Option<SortOrder<C>>,
}

impl<C> Default for SortState<C> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<C: Copy + Eq> SortState<C> {
    pub fn with_order(order: SortOrder<C>) -> Self {
        Self {
            active: Some(order),
        }
    }

    pub fn toggle(&mut self, column: C) {
        self.active = Some(match self.active {
            Some(current) if current.column == column => SortOrder {
                column,
                direction: current.direction.reversed(),
            },
            _ => SortOrder::asc(column),
        });
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn order(&self) -> Option<SortOrder<C>> {
        self.active
    }
}

/// Comparable value of one cell. Keys of the same column always share a
/// variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Number(i64),
    Time(Option<DateTime<FixedOffset>>),
    Text(String),
}

impl SortKey {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_lowercase())
    }
}

pub trait Listable {
    type Column: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    /// Values the free-text search looks at, in display order.
    fn search_fields(&self) -> Vec<String>;

    fn sort_key(&self, column: Self::Column) -> SortKey;

    fn search_text(&self) -> String {
        self.search_fields().join(" ").to_lowercase()
    }
}

pub fn matches_search<R: Listable>(record: &R, search: &str) -> bool {
    record.search_text().contains(&search.to_lowercase())
}

/// Derives the visible rows from the fetched records.
///
/// Depends only on its arguments. Sorting is stable, so rows with equal keys
/// and every row when `sort` is `None` keep their fetched order.
pub fn filter_and_sort<'a, R: Listable>(
    records: &'a [R],
    search: &str,
    sort: Option<SortOrder<R::Column>>,
) -> Vec<&'a R> {
    let mut rows: Vec<&R> = records
        .iter()
        .filter(|record| matches_search(*record, search))
        .collect();

    if let Some(order) = sort {
        rows.sort_by(|a, b| compare(*a, *b, order));
    }

    rows
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown column '{name}', expected one of: {expected}")]
pub struct UnknownColumn {
    pub name: String,
    pub expected: String,
}

macro_rules! columns {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownColumn;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let wanted = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|column| column.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| UnknownColumn {
                        name: value.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(|column| column.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

columns!(CustomerColumn {
    Firstname => "firstname",
    Lastname => "lastname",
    Email => "email",
    Phone => "phone",
    Streetaddress => "streetaddress",
    Postcode => "postcode",
    City => "city",
});

columns!(TrainingColumn {
    Date => "date",
    Activity => "activity",
    Duration => "duration",
    Customer => "customer",
});

impl Listable for Customer {
    type Column = CustomerColumn;

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.firstname.clone(),
            self.lastname.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.city.clone(),
        ]
    }

    fn sort_key(&self, column: CustomerColumn) -> SortKey {
        let value = match column {
            CustomerColumn::Firstname => &self.firstname,
            CustomerColumn::Lastname => &self.lastname,
            CustomerColumn::Email => &self.email,
            CustomerColumn::Phone => &self.phone,
            CustomerColumn::Streetaddress => &self.streetaddress,
            CustomerColumn::Postcode => &self.postcode,
            CustomerColumn::City => &self.city,
        };
        SortKey::text(value)
    }
}

impl Listable for Training {
    type Column = TrainingColumn;

    fn search_fields(&self) -> Vec<String> {
        let name = self.customer_name();
        vec![
            self.activity.clone(),
            self.duration.to_string(),
            name.and_then(|n| n.firstname.clone()).unwrap_or_default(),
            name.and_then(|n| n.lastname.clone()).unwrap_or_default(),
        ]
    }

    fn sort_key(&self, column: TrainingColumn) -> SortKey {
        match column {
            TrainingColumn::Date => SortKey::Time(self.starts_at()),
            TrainingColumn::Activity => SortKey::text(&self.activity),
            TrainingColumn::Duration => SortKey::Number(self.duration),
            TrainingColumn::Customer => match &self.customer {
                Some(customer) => SortKey::text(&customer.display()),
                None => SortKey::Text(String::new()),
            },
        }
    }
}

/// Orders two records the way `filter_and_sort` would.
pub fn compare<R: Listable>(a: &R, b: &R, order: SortOrder<R::Column>) -> Ordering {
    let ordering = a.sort_key(order.column).cmp(&b.sort_key(order.column));
    match order.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
