use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::protocol::Links;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(TrainingId);

/// Placeholder shown wherever a training has no customer attached.
pub const NO_CUSTOMER: &str = "-";

/// Table format for training timestamps.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub firstname: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lastname: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub streetaddress: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub postcode: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl Customer {
    /// The server-issued self-link, used as identity for update and delete.
    pub fn self_href(&self) -> Option<&str> {
        self.links.as_ref().map(|links| links.self_link.href.as_str())
    }

    pub fn full_name(&self) -> String {
        join_name(&self.firstname, &self.lastname)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerName {
    /// Server id of the expanded customer, when `/gettrainings` includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
}

impl CustomerName {
    pub fn new(firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        Self {
            id: None,
            firstname: Some(firstname.into()),
            lastname: Some(lastname.into()),
        }
    }

    pub fn display_name(&self) -> String {
        join_name(
            self.firstname.as_deref().unwrap_or_default(),
            self.lastname.as_deref().unwrap_or_default(),
        )
    }

    /// Both names present and non-empty.
    pub fn is_complete(&self) -> bool {
        let present = |part: &Option<String>| part.as_deref().is_some_and(|p| !p.is_empty());
        present(&self.firstname) && present(&self.lastname)
    }
}

/// The customer side of a training.
///
/// Writes reference a customer by its self-link; reads from `/gettrainings`
/// come back with the relation expanded into a name object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomerRef {
    Reference(String),
    Embedded(CustomerName),
}

impl CustomerRef {
    pub fn display(&self) -> String {
        match self {
            Self::Reference(href) => href.clone(),
            Self::Embedded(name) => name.display_name(),
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Self::Reference(href) => Some(href),
            Self::Embedded(_) => None,
        }
    }

    pub fn as_embedded(&self) -> Option<&CustomerName> {
        match self {
            Self::Reference(_) => None,
            Self::Embedded(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Training {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TrainingId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub activity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: i64,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl Training {
    pub fn self_href(&self) -> Option<&str> {
        self.links.as_ref().map(|links| links.self_link.href.as_str())
    }

    pub fn starts_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_training_date(&self.date)
    }

    pub fn customer_name(&self) -> Option<&CustomerName> {
        self.customer.as_ref().and_then(CustomerRef::as_embedded)
    }

    /// Customer column text; `-` when no customer is attached.
    pub fn customer_display(&self) -> String {
        match &self.customer {
            Some(customer) => customer.display(),
            None => NO_CUSTOMER.to_string(),
        }
    }

    /// Date column text, falling back to the raw value when it does not parse.
    pub fn date_display(&self) -> String {
        match self.starts_at() {
            Some(start) => start.format(DISPLAY_DATE_FORMAT).to_string(),
            None => self.date.clone(),
        }
    }
}

/// Accepts RFC 3339, an offset-less ISO timestamp, or a bare date.
/// Offset-less values are taken as UTC.
pub fn parse_training_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }

    let utc = FixedOffset::east_opt(0)?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_local_timezone(utc).single();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0)?.and_local_timezone(utc).single();
    }

    None
}

fn join_name(first: &str, last: &str) -> String {
    format!("{first} {last}").trim().to_string()
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
