use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Customer, CustomerRef, Training},
    protocol::{collection_items, CustomerBody, TrainingBody},
};
use tracing::{debug, info, warn};
use url::Url;

pub mod calendar;
pub mod controller;
pub mod draft;
pub mod error;
pub mod export;
pub mod statistics;
pub mod view;

pub use controller::{
    AssumeYes, Confirm, DeleteOutcome, ListController, ListEvent, OperationId, OperationKind,
    Record,
};
pub use draft::{CustomerDraft, TrainingDraft};
pub use error::ClientError;
pub use view::{
    filter_and_sort, CustomerColumn, Listable, SortDirection, SortOrder, SortState,
    TrainingColumn,
};

/// Hosted Personal Trainer API.
pub const DEFAULT_API_URL: &str =
    "https://customer-rest-service-frontend-personaltrainer.2.rahtiapp.fi/api";

pub const CUSTOMERS_RESOURCE: &str = "customers";
pub const TRAININGS_RESOURCE: &str = "trainings";

/// Remote operations for one record type.
#[async_trait]
pub trait Gateway<R: Record>: Send + Sync {
    async fn list(&self) -> Result<Vec<R>, ClientError>;
    async fn create(&self, draft: &R::Draft) -> Result<(), ClientError>;
    async fn update(&self, record: &R, draft: &R::Draft) -> Result<(), ClientError>;
    async fn delete(&self, record: &R) -> Result<(), ClientError>;
}

pub struct RestTrainerApi {
    http: Client,
    base_url: String,
}

impl RestTrainerApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, ClientError> {
        self.get_collection("/customers", CUSTOMERS_RESOURCE).await
    }

    pub async fn create_customer(&self, body: &CustomerBody) -> Result<(), ClientError> {
        let url = format!("{}/customers", self.base_url);
        self.send_json(Method::POST, &url, body).await?;
        info!(email = %body.email, "customer created");
        Ok(())
    }

    pub async fn update_customer(
        &self,
        customer: &Customer,
        body: &CustomerBody,
    ) -> Result<(), ClientError> {
        let url = customer_location(customer)?;
        self.send_json(Method::PUT, &url, body).await?;
        info!(url = %url, "customer updated");
        Ok(())
    }

    pub async fn delete_customer(&self, customer: &Customer) -> Result<(), ClientError> {
        let url = customer_location(customer)?;
        self.send_delete(&url).await?;
        info!(url = %url, "customer deleted");
        Ok(())
    }

    /// Flat listing with each training's customer expanded.
    pub async fn list_trainings(&self) -> Result<Vec<Training>, ClientError> {
        self.get_collection("/gettrainings", TRAININGS_RESOURCE).await
    }

    /// HAL listing of trainings; customers are only linked, not expanded.
    pub async fn list_training_entries(&self) -> Result<Vec<Training>, ClientError> {
        self.get_collection("/trainings", TRAININGS_RESOURCE).await
    }

    pub async fn create_training(&self, body: &TrainingBody) -> Result<(), ClientError> {
        let url = format!("{}/trainings", self.base_url);
        self.send_json(Method::POST, &url, body).await?;
        info!(activity = %body.activity, "training created");
        Ok(())
    }

    pub async fn update_training(
        &self,
        training: &Training,
        body: &TrainingBody,
    ) -> Result<(), ClientError> {
        let url = self.training_location(training)?;
        self.send_json(Method::PUT, &url, body).await?;
        info!(url = %url, "training updated");
        Ok(())
    }

    pub async fn delete_training(&self, training: &Training) -> Result<(), ClientError> {
        let url = self.training_location(training)?;
        self.send_delete(&url).await?;
        info!(url = %url, "training deleted");
        Ok(())
    }

    /// `/trainings/{id}` when the server gave an id, otherwise the self-link.
    pub fn training_location(&self, training: &Training) -> Result<String, ClientError> {
        if let Some(id) = training.id {
            return Ok(format!("{}/trainings/{id}", self.base_url));
        }
        match training.self_href() {
            Some(href) => validate_link(href),
            None => Err(ClientError::MissingIdentity {
                resource: TRAININGS_RESOURCE,
            }),
        }
    }

    /// Customer link to send with a full training PUT.
    ///
    /// A link in the draft is sent as is. An expanded customer maps through
    /// its id, or through the training's customer association when the
    /// listing left the id out.
    pub async fn training_customer_link(
        &self,
        training: &Training,
        customer: Option<&CustomerRef>,
    ) -> Result<Option<String>, ClientError> {
        match customer {
            None => Ok(None),
            Some(CustomerRef::Reference(href)) => Ok(Some(href.clone())),
            Some(CustomerRef::Embedded(name)) => match name.id {
                Some(id) => Ok(Some(format!("{}/customers/{id}", self.base_url))),
                None => self.associated_customer_link(training).await.map(Some),
            },
        }
    }

    async fn associated_customer_link(&self, training: &Training) -> Result<String, ClientError> {
        let url = format!("{}/customer", self.training_location(training)?);
        debug!(url = %url, "resolving training customer");
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let text = read_success_body(res, "GET", &url).await?;
        let customer: Customer =
            serde_json::from_str(&text).map_err(|source| ClientError::Decode {
                resource: CUSTOMERS_RESOURCE,
                source,
            })?;
        customer_location(&customer)
    }

    async fn get_collection<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &'static str,
    ) -> Result<Vec<T>, ClientError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "fetching collection");
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let text = read_success_body(res, "GET", &url).await?;
        let body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|source| ClientError::Decode { resource, source })?;

        let Some(items) = collection_items(body, resource) else {
            warn!(url = %url, resource, "unexpected collection shape, treating as empty");
            return Ok(Vec::new());
        };

        items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|source| ClientError::Decode { resource, source })
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        let method_name = method_name(&method);
        debug!(method = method_name, url = %url, "sending write request");
        let res = self
            .http
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;
        read_success_body(res, method_name, url).await?;
        Ok(())
    }

    async fn send_delete(&self, url: &str) -> Result<(), ClientError> {
        debug!(url = %url, "sending delete request");
        let res = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;
        read_success_body(res, "DELETE", url).await?;
        Ok(())
    }
}

#[async_trait]
impl Gateway<Customer> for RestTrainerApi {
    async fn list(&self) -> Result<Vec<Customer>, ClientError> {
        self.list_customers().await
    }

    async fn create(&self, draft: &CustomerDraft) -> Result<(), ClientError> {
        self.create_customer(&draft.to_body()).await
    }

    async fn update(&self, record: &Customer, draft: &CustomerDraft) -> Result<(), ClientError> {
        self.update_customer(record, &draft.to_body()).await
    }

    async fn delete(&self, record: &Customer) -> Result<(), ClientError> {
        self.delete_customer(record).await
    }
}

#[async_trait]
impl Gateway<Training> for RestTrainerApi {
    async fn list(&self) -> Result<Vec<Training>, ClientError> {
        self.list_trainings().await
    }

    async fn create(&self, draft: &TrainingDraft) -> Result<(), ClientError> {
        draft.validate(true)?;
        self.create_training(&draft.to_body()).await
    }

    async fn update(&self, record: &Training, draft: &TrainingDraft) -> Result<(), ClientError> {
        draft.validate(false)?;
        // PUT replaces the whole training, so the customer link is always sent.
        let mut body = draft.to_body();
        body.customer = self
            .training_customer_link(record, draft.customer.as_ref())
            .await?;
        self.update_training(record, &body).await
    }

    async fn delete(&self, record: &Training) -> Result<(), ClientError> {
        self.delete_training(record).await
    }
}

fn customer_location(customer: &Customer) -> Result<String, ClientError> {
    match customer.self_href() {
        Some(href) => validate_link(href),
        None => Err(ClientError::MissingIdentity {
            resource: CUSTOMERS_RESOURCE,
        }),
    }
}

fn validate_link(href: &str) -> Result<String, ClientError> {
    Url::parse(href)
        .map(String::from)
        .map_err(|source| ClientError::InvalidLink {
            href: href.to_string(),
            source,
        })
}

async fn read_success_body(
    res: reqwest::Response,
    method: &'static str,
    url: &str,
) -> Result<String, ClientError> {
    let status = res.status();
    let text = res.text().await.map_err(|source| ClientError::Transport {
        url: url.to_string(),
        source,
    })?;
    if !status.is_success() {
        return Err(ClientError::Status {
            method,
            url: url.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(text)
}

fn method_name(method: &Method) -> &'static str {
    if *method == Method::POST {
        "POST"
    } else if *method == Method::PUT {
        "PUT"
    } else if *method == Method::DELETE {
        "DELETE"
    } else {
        "GET"
    }
}

#[cfg(test)]
#[path = "tests/mock_server.rs"]
mod mock_server;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
