//! Warehouse selection for statement submission.

use tracing::debug;

use crate::client::WarehouseService;
use crate::error::{McpError, RemoteOperation, Result};

/// Picks the warehouse a statement runs on.
///
/// A non-empty explicit id is used as-is; an invalid id surfaces when the
/// submission fails. Otherwise the first warehouse in the listing's order is
/// chosen. That order is defined by the service and may differ between calls.
pub async fn resolve_warehouse<W>(service: &W, explicit: Option<&str>) -> Result<String>
where
    W: WarehouseService + ?Sized,
{
    if let Some(id) = explicit.filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }

    let warehouses = service
        .list_warehouses()
        .await
        .map_err(|e| McpError::remote(RemoteOperation::ListWarehouses, e))?;

    let first = warehouses
        .into_iter()
        .next()
        .ok_or(McpError::NoWarehouseAvailable)?;

    debug!(warehouse_id = %first.id, name = ?first.name, "Selected first listed warehouse");
    Ok(first.id)
}
