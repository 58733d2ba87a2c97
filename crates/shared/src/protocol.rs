use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Customer, CustomerRef};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Link,
    #[serde(flatten)]
    pub related: BTreeMap<String, Link>,
}

impl Links {
    pub fn with_self(href: impl Into<String>) -> Self {
        Self {
            self_link: Link { href: href.into() },
            related: BTreeMap::new(),
        }
    }
}

/// HAL collection wrapper: `{"_embedded": {"<resource>": [...]}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "_embedded")]
    pub embedded: BTreeMap<String, Vec<T>>,
}

impl<T> Envelope<T> {
    pub fn single(resource: impl Into<String>, items: Vec<T>) -> Self {
        let mut embedded = BTreeMap::new();
        embedded.insert(resource.into(), items);
        Self { embedded }
    }
}

/// Extracts the item list from a collection response.
///
/// Accepts a bare array or a HAL envelope keyed by `resource`. Any other
/// shape yields `None`.
pub fn collection_items(body: Value, resource: &str) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(mut object) => match object.remove("_embedded")? {
            Value::Object(mut embedded) => match embedded.remove(resource)? {
                Value::Array(items) => Some(items),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

/// Write body for `POST /customers` and `PUT <self-link>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerBody {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub streetaddress: String,
    pub postcode: String,
    pub city: String,
}

impl From<&Customer> for CustomerBody {
    fn from(customer: &Customer) -> Self {
        Self {
            firstname: customer.firstname.clone(),
            lastname: customer.lastname.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            streetaddress: customer.streetaddress.clone(),
            postcode: customer.postcode.clone(),
            city: customer.city.clone(),
        }
    }
}

/// Write body for trainings. The customer link is only sent when the
/// training references a customer by URL; an expanded name cannot be
/// written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingBody {
    pub date: String,
    pub activity: String,
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
}

impl TrainingBody {
    pub fn new(
        date: impl Into<String>,
        activity: impl Into<String>,
        duration: i64,
        customer: Option<&CustomerRef>,
    ) -> Self {
        Self {
            date: date.into(),
            activity: activity.into(),
            duration,
            customer: customer
                .and_then(CustomerRef::as_reference)
                .map(str::to_string),
        }
    }
}
