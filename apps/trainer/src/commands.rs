use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use clap::{Args, Subcommand};
use client_core::{
    calendar::{calendar_events, events_between},
    export::export_customers_to_path,
    statistics::activity_totals,
    AssumeYes, Confirm, CustomerColumn, CustomerDraft, DeleteOutcome, Gateway, ListController,
    ListEvent, OperationKind, RestTrainerApi, SortOrder, TrainingColumn, TrainingDraft,
};
use shared::domain::{
    parse_training_date, Customer, Training, TrainingId, DISPLAY_DATE_FORMAT,
};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{config::Settings, render};

#[derive(Debug, Args)]
pub struct CustomerListArgs {
    /// Case-insensitive substring matched against name, email, phone and city.
    #[arg(long, default_value = "")]
    pub search: String,
    #[arg(long)]
    pub sort: Option<CustomerColumn>,
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

#[derive(Debug, Args)]
pub struct TrainingListArgs {
    /// Case-insensitive substring matched against activity, duration and customer.
    #[arg(long, default_value = "")]
    pub search: String,
    #[arg(long)]
    pub sort: Option<TrainingColumn>,
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

fn sort_order<C>(column: Option<C>, desc: bool) -> Option<SortOrder<C>> {
    column.map(|column| {
        if desc {
            SortOrder::desc(column)
        } else {
            SortOrder::asc(column)
        }
    })
}

#[derive(Debug, Args)]
pub struct CustomerFields {
    #[arg(long)]
    pub firstname: Option<String>,
    #[arg(long)]
    pub lastname: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub streetaddress: Option<String>,
    #[arg(long)]
    pub postcode: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
}

impl CustomerFields {
    /// Overwrites only the fields that were given.
    fn apply(self, draft: &mut CustomerDraft) {
        let pairs = [
            (self.firstname, &mut draft.firstname),
            (self.lastname, &mut draft.lastname),
            (self.email, &mut draft.email),
            (self.phone, &mut draft.phone),
            (self.streetaddress, &mut draft.streetaddress),
            (self.postcode, &mut draft.postcode),
            (self.city, &mut draft.city),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    List(CustomerListArgs),
    Add(CustomerFields),
    /// Edit the customer identified by its self link or email.
    Edit {
        customer: String,
        #[command(flatten)]
        fields: CustomerFields,
    },
    Delete {
        customer: String,
        #[arg(long)]
        yes: bool,
    },
    /// Write all customers to a semicolon-separated CSV file.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TrainingCommand {
    List(TrainingListArgs),
    Add {
        /// Customer self link or email.
        #[arg(long)]
        customer: String,
        #[arg(long)]
        activity: String,
        /// RFC 3339, `YYYY-MM-DD` or `dd.mm.yyyy HH:MM`; defaults to now.
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        duration: Option<i64>,
    },
    Edit {
        id: i64,
        #[arg(long)]
        activity: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        duration: Option<i64>,
        /// Reassign to another customer by self link or email.
        #[arg(long)]
        customer: Option<String>,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
}

/// Asks on stdin; anything but `y`/`yes` declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_affirmative(&answer)
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn confirmer(yes: bool) -> &'static dyn Confirm {
    if yes {
        &AssumeYes
    } else {
        &StdinConfirm
    }
}

/// Re-fetch failures that followed a successful write. The write itself
/// returns `Ok`, so these only reach the user through the event stream.
fn refresh_failures(events: &mut broadcast::Receiver<ListEvent>) -> Vec<String> {
    let mut failures = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ListEvent::Failed {
            resource,
            kind: OperationKind::Refresh,
            error,
            ..
        } = event
        {
            failures.push(format!(
                "saved, but the {resource} list could not be reloaded: {}",
                error.message
            ));
        }
    }
    failures
}

fn warn_refresh_failures(events: &mut broadcast::Receiver<ListEvent>) {
    for failure in refresh_failures(events) {
        eprintln!("warning: {failure}");
    }
}

fn report_delete(outcome: DeleteOutcome, what: &str) {
    match outcome {
        DeleteOutcome::Deleted => println!("Deleted {what}."),
        DeleteOutcome::Declined => println!("Nothing deleted."),
    }
}

pub async fn run_customers(
    api: Arc<RestTrainerApi>,
    settings: &Settings,
    command: CustomerCommand,
) -> Result<()> {
    let gateway: Arc<dyn Gateway<Customer>> = api;
    let controller = ListController::new(gateway);
    let mut events = controller.subscribe_events();

    match command {
        CustomerCommand::List(args) => {
            controller.refresh().await?;
            controller.set_search(args.search).await;
            controller.set_sort(sort_order(args.sort, args.desc)).await;
            let visible = controller.visible().await;
            print!("{}", render::customer_table(&visible));
        }
        CustomerCommand::Add(fields) => {
            let mut draft = CustomerDraft::default();
            fields.apply(&mut draft);
            controller.create(&draft).await?;
            warn_refresh_failures(&mut events);
            println!("Customer added.");
        }
        CustomerCommand::Edit { customer, fields } => {
            controller.refresh().await?;
            let current = find_customer(&controller.records().await, &customer)?;
            let mut draft = CustomerDraft::from(&current);
            fields.apply(&mut draft);
            controller.update(&current, &draft).await?;
            warn_refresh_failures(&mut events);
            println!("Customer updated.");
        }
        CustomerCommand::Delete { customer, yes } => {
            controller.refresh().await?;
            let current = find_customer(&controller.records().await, &customer)?;
            let outcome = controller.delete(&current, confirmer(yes)).await?;
            warn_refresh_failures(&mut events);
            report_delete(outcome, "customer");
        }
        CustomerCommand::Export { output } => {
            controller.refresh().await?;
            let path = output.unwrap_or_else(|| settings.export_path.clone());
            let rows = export_customers_to_path(&controller.records().await, &path)?;
            println!("Exported {rows} customers to {}.", path.display());
        }
    }
    Ok(())
}

pub async fn run_trainings(api: Arc<RestTrainerApi>, command: TrainingCommand) -> Result<()> {
    let gateway: Arc<dyn Gateway<Training>> = api.clone();
    let controller = ListController::new(gateway);
    let mut events = controller.subscribe_events();

    match command {
        TrainingCommand::List(args) => {
            controller.refresh().await?;
            controller.set_search(args.search).await;
            controller.set_sort(sort_order(args.sort, args.desc)).await;
            let visible = controller.visible().await;
            print!("{}", render::training_table(&visible));
        }
        TrainingCommand::Add {
            customer,
            activity,
            date,
            duration,
        } => {
            let link = resolve_customer_link(&api, &customer).await?;
            let mut draft = match date {
                Some(raw) => TrainingDraft::starting_at(parse_user_date(&raw)?),
                None => TrainingDraft::default(),
            }
            .with_customer_link(link);
            draft.activity = activity;
            if let Some(duration) = duration {
                draft.duration = duration;
            }
            controller.create(&draft).await?;
            warn_refresh_failures(&mut events);
            println!("Training added.");
        }
        TrainingCommand::Edit {
            id,
            activity,
            date,
            duration,
            customer,
        } => {
            controller.refresh().await?;
            let current = find_training(&controller.records().await, id)?;
            let mut draft = TrainingDraft::for_edit(&current);
            if let Some(activity) = activity {
                draft.activity = activity;
            }
            if let Some(raw) = date {
                draft.date = parse_user_date(&raw)?.to_rfc3339_opts(SecondsFormat::Millis, true);
            }
            if let Some(duration) = duration {
                draft.duration = duration;
            }
            if let Some(selector) = customer {
                draft = draft.with_customer_link(resolve_customer_link(&api, &selector).await?);
            }
            controller.update(&current, &draft).await?;
            warn_refresh_failures(&mut events);
            println!("Training updated.");
        }
        TrainingCommand::Delete { id, yes } => {
            controller.refresh().await?;
            let current = find_training(&controller.records().await, id)?;
            let outcome = controller.delete(&current, confirmer(yes)).await?;
            warn_refresh_failures(&mut events);
            report_delete(outcome, "training");
        }
    }
    Ok(())
}

pub async fn run_calendar(api: &RestTrainerApi, month: Option<&str>) -> Result<()> {
    let (from, to) = match month {
        Some(raw) => month_range(raw)?,
        None => {
            let today = Utc::now().date_naive();
            month_bounds(today.year(), today.month())?
        }
    };
    let trainings = api.list_training_entries().await?;
    let events = calendar_events(&trainings);
    let visible = events_between(&events, from, to);
    debug!(total = events.len(), shown = visible.len(), "calendar built");
    if visible.is_empty() {
        println!("No trainings in this period.");
    } else {
        print!("{}", render::calendar_listing(&visible));
    }
    Ok(())
}

pub async fn run_stats(api: &RestTrainerApi) -> Result<()> {
    let trainings = api.list_training_entries().await?;
    let totals = activity_totals(&trainings);
    if totals.is_empty() {
        println!("No trainings recorded.");
    } else {
        print!("{}", render::duration_chart(&totals));
    }
    Ok(())
}

fn find_customer(customers: &[Customer], selector: &str) -> Result<Customer> {
    let selector = selector.trim();
    customers
        .iter()
        .find(|c| c.self_href() == Some(selector) || c.email.eq_ignore_ascii_case(selector))
        .cloned()
        .ok_or_else(|| anyhow!("no customer matches '{selector}'"))
}

fn find_training(trainings: &[Training], id: i64) -> Result<Training> {
    trainings
        .iter()
        .find(|t| t.id == Some(TrainingId(id)))
        .cloned()
        .ok_or_else(|| anyhow!("no training with id {id}"))
}

async fn resolve_customer_link(api: &RestTrainerApi, selector: &str) -> Result<String> {
    let customers = api.list_customers().await?;
    let customer = find_customer(&customers, selector)?;
    customer
        .self_href()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("customer '{selector}' has no self link"))
}

/// Accepts the server's own formats plus the `dd.mm.yyyy HH:MM` display form.
fn parse_user_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Some(parsed) = parse_training_date(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, DISPLAY_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .with_context(|| format!("'{raw}' is not a recognised date"))
}

fn month_range(raw: &str) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let (year, month) = raw
        .trim()
        .split_once('-')
        .ok_or_else(|| anyhow!("month must look like YYYY-MM, got '{raw}'"))?;
    let year: i32 = year.parse().with_context(|| format!("bad year in '{raw}'"))?;
    let month: u32 = month.parse().with_context(|| format!("bad month in '{raw}'"))?;
    month_bounds(year, month)
}

fn month_bounds(year: i32, month: u32) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("{year}-{month:02} is not a valid month"))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let Some(end) = NaiveDate::from_ymd_opt(next_year, next_month, 1) else {
        bail!("{year}-{month:02} is out of range");
    };
    let at_midnight = |date: NaiveDate| date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset();
    Ok((at_midnight(start), at_midnight(end)))
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
