//! Form data exchanged with the add/edit dialogs.

use chrono::{DateTime, SecondsFormat, Utc};
use shared::{
    domain::{parse_training_date, Customer, CustomerRef, Training},
    protocol::{CustomerBody, TrainingBody},
};

use crate::error::ClientError;

/// Default length of a new training, in minutes.
pub const DEFAULT_TRAINING_MINUTES: i64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerDraft {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub streetaddress: String,
    pub postcode: String,
    pub city: String,
}

impl CustomerDraft {
    pub fn to_body(&self) -> CustomerBody {
        CustomerBody {
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            streetaddress: self.streetaddress.clone(),
            postcode: self.postcode.clone(),
            city: self.city.clone(),
        }
    }
}

impl From<&Customer> for CustomerDraft {
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingDraft {
    pub date: String,
    pub activity: String,
    pub duration: i64,
    pub customer: Option<CustomerRef>,
}

impl TrainingDraft {
    /// Blank "add training" form starting at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            date: start.to_rfc3339_opts(SecondsFormat::Millis, true),
            activity: String::new(),
            duration: DEFAULT_TRAINING_MINUTES,
            customer: None,
        }
    }

    /// Pre-filled edit form. The customer keeps whichever shape the server
    /// returned.
    pub fn for_edit(training: &Training) -> Self {
        Self {
            date: training.date.clone(),
            activity: training.activity.clone(),
            duration: training.duration,
            customer: training.customer.clone(),
        }
    }

    pub fn with_customer_link(mut self, href: impl Into<String>) -> Self {
        self.customer = Some(CustomerRef::Reference(href.into()));
        self
    }

    /// Name shown in the customer selector; empty unless the relation came
    /// back expanded.
    pub fn customer_display_name(&self) -> String {
        self.customer
            .as_ref()
            .and_then(CustomerRef::as_embedded)
            .map(|name| name.display_name())
            .unwrap_or_default()
    }

    /// A new training must reference a customer by link; edits may keep the
    /// expanded customer, which is then left untouched on the server.
    pub fn validate(&self, is_new: bool) -> Result<(), ClientError> {
        if self.activity.trim().is_empty() {
            return Err(ClientError::validation("activity", "please enter activity"));
        }
        if parse_training_date(&self.date).is_none() {
            return Err(ClientError::validation(
                "date",
                format!("'{}' is not a recognised date", self.date),
            ));
        }
        if is_new && !matches!(self.customer, Some(CustomerRef::Reference(_))) {
            return Err(ClientError::validation(
                "customer",
                "please select a customer",
            ));
        }
        Ok(())
    }

    pub fn to_body(&self) -> TrainingBody {
        TrainingBody::new(
            self.date.clone(),
            self.activity.trim(),
            self.duration,
            self.customer.as_ref(),
        )
    }
}

impl Default for TrainingDraft {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

#[cfg(test)]
#[path = "tests/draft_tests.rs"]
mod tests;
