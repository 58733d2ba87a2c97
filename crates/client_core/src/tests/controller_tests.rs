use std::collections::VecDeque;

use super::*;
use crate::{
    mock_server::{spawn_mock_api, CustomersShape},
    view::CustomerColumn,
    RestTrainerApi,
};
use async_trait::async_trait;
use shared::error::ErrorCode;
use tokio::sync::{oneshot, Notify};

struct Decline;

impl Confirm for Decline {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

struct RecordingConfirm {
    prompts: std::sync::Mutex<Vec<String>>,
}

impl Confirm for RecordingConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());
        true
    }
}

fn drain(rx: &mut broadcast::Receiver<ListEvent>) -> Vec<ListEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn draft(firstname: &str, lastname: &str) -> CustomerDraft {
    CustomerDraft {
        firstname: firstname.to_string(),
        lastname: lastname.to_string(),
        email: format!("{}@example.fi", firstname.to_lowercase()),
        city: "Turku".to_string(),
        ..CustomerDraft::default()
    }
}

async fn customer_controller() -> (Arc<ListController<Customer>>, crate::mock_server::MockServer) {
    let (base_url, server) = spawn_mock_api().await;
    let api: Arc<dyn Gateway<Customer>> = Arc::new(RestTrainerApi::new(base_url));
    (ListController::new(api), server)
}

#[tokio::test]
async fn refresh_then_filter_and_sort_visible_rows() {
    let (controller, server) = customer_controller().await;
    server.customer("Ella", "Smith", "Helsinki").await;
    server.customer("Mikko", "Virtanen", "Tampere").await;
    server.customer("Anna", "Smithson", "Oulu").await;

    assert_eq!(controller.refresh().await.expect("refresh"), 3);

    controller.set_search("SMITH").await;
    controller.toggle_sort(CustomerColumn::Firstname).await;
    let names: Vec<String> = controller
        .visible()
        .await
        .iter()
        .map(|c| c.firstname.clone())
        .collect();
    assert_eq!(names, vec!["Anna", "Ella"]);

    controller.toggle_sort(CustomerColumn::Firstname).await;
    let names: Vec<String> = controller
        .visible()
        .await
        .iter()
        .map(|c| c.firstname.clone())
        .collect();
    assert_eq!(names, vec!["Ella", "Anna"]);

    assert_eq!(controller.records().await.len(), 3);
}

#[tokio::test]
async fn create_refetches_full_list() {
    let (controller, server) = customer_controller().await;
    controller.refresh().await.expect("refresh");
    let mut events = controller.subscribe_events();

    // A row added behind the client's back shows up through the re-fetch.
    server.customer("Other", "Client", "Espoo").await;
    controller.create(&draft("Aino", "Berg")).await.expect("create");

    let lastnames: Vec<String> = controller
        .records()
        .await
        .iter()
        .map(|c| c.lastname.clone())
        .collect();
    assert_eq!(lastnames, vec!["Client", "Berg"]);
    assert!(!controller.is_loading().await);

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        ListEvent::Loaded { resource: "customers", count: 2 }
    )));
    assert!(matches!(
        events.last(),
        Some(ListEvent::Completed {
            kind: OperationKind::Create,
            ..
        })
    ));
}

#[tokio::test]
async fn update_and_delete_leave_no_stale_rows() {
    let (controller, server) = customer_controller().await;
    server.customer("Ella", "Smith", "Helsinki").await;
    server.customer("Mikko", "Virtanen", "Tampere").await;
    controller.refresh().await.expect("refresh");

    let ella = controller.records().await.remove(0);
    let mut edit = CustomerDraft::from(&ella);
    edit.city = "Vantaa".to_string();
    controller.update(&ella, &edit).await.expect("update");
    assert_eq!(controller.records().await[0].city, "Vantaa");

    let confirm = RecordingConfirm {
        prompts: std::sync::Mutex::new(Vec::new()),
    };
    let outcome = controller.delete(&ella, &confirm).await.expect("delete");
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(
        confirm.prompts.lock().expect("prompts lock").as_slice(),
        ["Delete Ella Smith?".to_string()]
    );

    let remaining = controller.records().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].firstname, "Mikko");
}

#[tokio::test]
async fn declined_delete_sends_nothing() {
    let (controller, server) = customer_controller().await;
    server.customer("Ella", "Smith", "Helsinki").await;
    controller.refresh().await.expect("refresh");
    let mut events = controller.subscribe_events();

    let ella = controller.records().await.remove(0);
    let outcome = controller.delete(&ella, &Decline).await.expect("declined");
    assert_eq!(outcome, DeleteOutcome::Declined);

    assert!(!server
        .requests()
        .await
        .iter()
        .any(|r| r.starts_with("DELETE")));
    assert_eq!(controller.records().await.len(), 1);
    assert!(matches!(
        drain(&mut events).as_slice(),
        [ListEvent::DeleteDeclined { resource: "customers" }]
    ));
}

#[tokio::test]
async fn failed_mutation_is_reported_and_skips_refresh() {
    let (controller, server) = customer_controller().await;
    server.customer("Ella", "Smith", "Helsinki").await;
    controller.refresh().await.expect("refresh");
    server.set_fail_writes(true).await;
    let mut events = controller.subscribe_events();
    let gets_before = server
        .requests()
        .await
        .iter()
        .filter(|r| r.starts_with("GET"))
        .count();

    let err = controller
        .create(&draft("Aino", "Berg"))
        .await
        .expect_err("server error");
    assert_eq!(err.code(), ErrorCode::Status);

    let gets_after = server
        .requests()
        .await
        .iter()
        .filter(|r| r.starts_with("GET"))
        .count();
    assert_eq!(gets_before, gets_after);
    assert_eq!(controller.records().await.len(), 1);
    assert!(!controller.is_loading().await);

    let failed = drain(&mut events)
        .into_iter()
        .find_map(|e| match e {
            ListEvent::Failed { kind, error, .. } => Some((kind, error)),
            _ => None,
        })
        .expect("failure event");
    assert_eq!(failed.0, OperationKind::Create);
    assert_eq!(failed.1.code, ErrorCode::Status);
}

#[tokio::test]
async fn failed_refresh_empties_the_list() {
    let (controller, server) = customer_controller().await;
    server.customer("Ella", "Smith", "Helsinki").await;
    controller.refresh().await.expect("refresh");
    assert_eq!(controller.records().await.len(), 1);

    server.set_customers_shape(CustomersShape::Malformed).await;
    let mut events = controller.subscribe_events();
    let err = controller.refresh().await.expect_err("malformed");
    assert_eq!(err.code(), ErrorCode::Decode);
    assert!(controller.records().await.is_empty());
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        ListEvent::Failed {
            kind: OperationKind::Refresh,
            ..
        }
    )));
}

#[tokio::test]
async fn refresh_failure_after_successful_write_is_broadcast() {
    let (controller, server) = customer_controller().await;
    server.set_customers_shape(CustomersShape::Malformed).await;
    let mut events = controller.subscribe_events();

    controller
        .create(&draft("Aino", "Berg"))
        .await
        .expect("write reached the server");

    assert!(server
        .requests()
        .await
        .contains(&"POST /customers".to_string()));
    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        ListEvent::Failed {
            kind: OperationKind::Refresh,
            ..
        }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        ListEvent::Completed {
            kind: OperationKind::Create,
            ..
        }
    )));
    assert!(!controller.is_loading().await);
}

struct GatedGateway {
    responses: Mutex<VecDeque<(Vec<Customer>, Option<oneshot::Receiver<()>>)>>,
    list_started: Arc<Notify>,
    create_started: Arc<Notify>,
    create_release: Mutex<Option<oneshot::Receiver<()>>>,
}

impl GatedGateway {
    fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            list_started: Arc::new(Notify::new()),
            create_started: Arc::new(Notify::new()),
            create_release: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Gateway<Customer> for GatedGateway {
    async fn list(&self) -> Result<Vec<Customer>, ClientError> {
        let (records, gate) = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_default();
        self.list_started.notify_one();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(records)
    }

    async fn create(&self, _draft: &CustomerDraft) -> Result<(), ClientError> {
        self.create_started.notify_one();
        let release = self.create_release.lock().await.take();
        if let Some(release) = release {
            let _ = release.await;
        }
        Ok(())
    }

    async fn update(&self, _record: &Customer, _draft: &CustomerDraft) -> Result<(), ClientError> {
        Ok(())
    }

    async fn delete(&self, _record: &Customer) -> Result<(), ClientError> {
        Ok(())
    }
}

fn named(lastname: &str) -> Customer {
    Customer {
        lastname: lastname.to_string(),
        ..Customer::default()
    }
}

#[tokio::test]
async fn loading_tracks_each_pending_operation() {
    let gateway = Arc::new(GatedGateway::new());
    let (release_tx, release_rx) = oneshot::channel();
    *gateway.create_release.lock().await = Some(release_rx);
    gateway
        .responses
        .lock()
        .await
        .extend([(vec![named("Early")], None), (vec![named("After")], None)]);
    let create_started = gateway.create_started.clone();
    let controller = ListController::new(gateway.clone() as Arc<dyn Gateway<Customer>>);

    let create = tokio::spawn({
        let controller = controller.clone();
        async move { controller.create(&draft("Aino", "Berg")).await }
    });
    create_started.notified().await;

    assert!(controller.is_loading().await);

    // A refresh finishing while the create is in flight must not clear the
    // loading state.
    controller.refresh().await.expect("refresh");
    assert!(controller.is_loading().await);
    let pending = controller.pending_operations().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].1, OperationKind::Create);

    release_tx.send(()).expect("release create");
    create.await.expect("join").expect("create");
    assert!(!controller.is_loading().await);
    assert_eq!(controller.records().await[0].lastname, "After");
}

#[tokio::test]
async fn late_fetch_completion_does_not_overwrite_newer_rows() {
    let gateway = Arc::new(GatedGateway::new());
    let (slow_tx, slow_rx) = oneshot::channel();
    gateway.responses.lock().await.extend([
        (vec![named("Stale")], Some(slow_rx)),
        (vec![named("Fresh")], None),
    ]);
    let list_started = gateway.list_started.clone();
    let controller = ListController::new(gateway.clone() as Arc<dyn Gateway<Customer>>);

    let slow = tokio::spawn({
        let controller = controller.clone();
        async move { controller.refresh().await }
    });
    list_started.notified().await;

    controller.refresh().await.expect("fast refresh");
    assert_eq!(controller.records().await[0].lastname, "Fresh");

    slow_tx.send(()).expect("release slow fetch");
    slow.await.expect("join").expect("slow refresh");
    assert_eq!(controller.records().await[0].lastname, "Fresh");
    assert!(!controller.is_loading().await);
}

#[tokio::test]
async fn sort_can_be_set_and_cleared() {
    let gateway: Arc<dyn Gateway<Customer>> = Arc::new(GatedGateway::new());
    let controller = ListController::new(gateway);

    controller
        .set_sort(Some(SortOrder::desc(CustomerColumn::City)))
        .await;
    assert_eq!(
        controller.sort_order().await,
        Some(SortOrder::desc(CustomerColumn::City))
    );
    controller.set_sort(None).await;
    assert_eq!(controller.sort_order().await, None);

    controller.set_search("abc").await;
    assert_eq!(controller.search().await, "abc");
}
