//! `stowage allocations` subcommands.

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::AllocationCommand;
use crate::adapter::inbound::cli::output;
use crate::application::storage::Storage;
use crate::domain::{Allocation, AllocationId};
use crate::error::{Error, Result};
use crate::port::outbound::store::AllocationStore;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Tabled)]
struct AllocationRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Registered")]
    created_at: String,
    #[tabled(rename = "Last heartbeat")]
    updated_at: String,
}

impl From<&Allocation> for AllocationRow {
    fn from(allocation: &Allocation) -> Self {
        Self {
            id: allocation.id.to_string(),
            created_at: allocation.created_at.format(TIME_FORMAT).to_string(),
            updated_at: allocation.updated_at.format(TIME_FORMAT).to_string(),
        }
    }
}

#[derive(Tabled)]
struct OwnedRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Priority")]
    priority: i16,
    #[tabled(rename = "State")]
    state: String,
}

/// Run one `allocations` subcommand.
pub async fn execute(storage: &Storage, command: AllocationCommand) -> Result<()> {
    match command {
        AllocationCommand::List => list(storage).await,
        AllocationCommand::Register { id } => {
            register(storage, id.map_or_else(AllocationId::generate, AllocationId::new)).await
        }
        AllocationCommand::Unregister { id } => unregister(storage, AllocationId::new(id)).await,
        AllocationCommand::Show { id } => show(storage, AllocationId::new(id)).await,
    }
}

async fn list(storage: &Storage) -> Result<()> {
    let ids = storage.fetch_allocations().await?;
    let mut allocations = Vec::with_capacity(ids.len());
    for id in &ids {
        // An allocation may be unregistered between the two reads.
        if let Some(allocation) = storage.fetch_allocation(id).await? {
            allocations.push(allocation);
        }
    }

    if output::is_json() {
        output::document(json!({
            "command": "allocations.list",
            "allocations": allocations,
        }));
        return Ok(());
    }
    if output::is_quiet() {
        return Ok(());
    }

    output::section("Allocations");
    if allocations.is_empty() {
        output::note("No allocations registered");
        return Ok(());
    }
    let rows: Vec<AllocationRow> = allocations.iter().map(AllocationRow::from).collect();
    output::table(Table::new(rows));
    Ok(())
}

async fn register(storage: &Storage, id: AllocationId) -> Result<()> {
    storage.register_allocation(&id).await?;

    if output::is_json() {
        output::document(json!({
            "command": "allocations.register",
            "id": id,
        }));
        return Ok(());
    }
    output::success(&format!("Registered allocation {}", output::highlight(&id)));
    Ok(())
}

async fn unregister(storage: &Storage, id: AllocationId) -> Result<()> {
    storage.unregister_allocation(&id).await?;

    if output::is_json() {
        output::document(json!({
            "command": "allocations.unregister",
            "id": id,
        }));
        return Ok(());
    }
    output::success(&format!("Unregistered allocation {}", output::highlight(&id)));
    Ok(())
}

async fn show(storage: &Storage, id: AllocationId) -> Result<()> {
    let Some(report) = storage.allocation_report(&id).await? else {
        if output::is_json() {
            output::document(json!({
                "command": "allocations.show",
                "id": id,
                "allocation": null,
            }));
        } else {
            output::warning(&format!("No allocation named {id}"));
            output::hint("run `stowage allocations list` to see registered ids");
        }
        return Ok(());
    };

    if output::is_json() {
        let mut value = serde_json::to_value(&report).map_err(Error::Json)?;
        value["command"] = json!("allocations.show");
        output::document(value);
        return Ok(());
    }

    let allocation = &report.allocation;
    output::section("Allocation");
    output::field("Id", output::highlight(&allocation.id));
    output::field("Registered", allocation.created_at.format(TIME_FORMAT));
    output::field("Last heartbeat", allocation.updated_at.format(TIME_FORMAT));
    output::field("Presences", report.presences.len());
    output::field("Resources", report.resources.len());

    let rows: Vec<OwnedRow> = report
        .presences
        .iter()
        .map(|p| OwnedRow {
            kind: "presence",
            username: p.username.clone(),
            resource: p.resource.clone(),
            priority: p.priority,
            state: match (&p.status, p.available) {
                (Some(status), _) => status.clone(),
                (None, true) => "available".to_string(),
                (None, false) => "unavailable".to_string(),
            },
        })
        .chain(report.resources.iter().map(|r| OwnedRow {
            kind: "resource",
            username: r.username.clone(),
            resource: r.resource.clone(),
            priority: r.priority,
            state: "bound".to_string(),
        }))
        .collect();

    if !rows.is_empty() && !output::is_quiet() {
        output::section("Owned");
        output::table(Table::new(rows));
    }
    Ok(())
}
