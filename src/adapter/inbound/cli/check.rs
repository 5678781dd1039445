//! `stowage check`: connect and report what the configured storage offers.

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::application::storage::Storage;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::store::AllocationStore;

/// Report backend kind, cluster compatibility and allocation count.
pub async fn execute(storage: &Storage, config: &Config) -> Result<()> {
    let allocations = storage.fetch_allocations().await?;

    if output::is_json() {
        output::document(json!({
            "command": "check",
            "backend": storage.kind(),
            "cluster_compatible": storage.is_cluster_compatible(),
            "allocations": allocations.len(),
        }));
        return Ok(());
    }

    output::section(concat!("stowage ", env!("CARGO_PKG_VERSION")));
    output::field("Backend", output::highlight(storage.kind()));
    output::field("Allocations", allocations.len());
    output::field("Log level", &config.logging.level);
    output::success("Storage is reachable");

    if storage.is_cluster_compatible() {
        output::success("Cluster compatible");
    } else {
        output::warning("Not cluster compatible: state is local to this node");
        output::hint("use type = \"mysql\" or \"postgresql\" to share state across nodes");
    }
    Ok(())
}
