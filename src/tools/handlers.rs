//! Tool handlers.
//!
//! Each handler takes validated parameters, performs its remote calls and
//! returns a serializable payload. Handlers never retry.

use serde::Serialize;
use tracing::debug;

use super::filter::TableFilter;
use super::params::{GetTableParams, ListSchemasParams, ListTablesParams};
use crate::client::{
    CatalogInfo, ListTablesRequest, NamespaceService, SchemaInfo, TableInfo, WarehouseInfo,
    WarehouseService,
};
use crate::error::{McpError, RemoteOperation, Result};

/// Result of `list_tables`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableListing {
    pub tables: Vec<TableInfo>,
    /// Number of tables in `tables`.
    pub total_count: usize,
    /// True when the listing held more entries than `max_results`.
    pub truncated: bool,
}

pub async fn list_catalogs<C>(client: &C) -> Result<Vec<CatalogInfo>>
where
    C: NamespaceService + ?Sized,
{
    client
        .list_catalogs()
        .await
        .map_err(|e| McpError::remote(RemoteOperation::ListCatalogs, e))
}

pub async fn list_schemas<C>(client: &C, params: &ListSchemasParams) -> Result<Vec<SchemaInfo>>
where
    C: NamespaceService + ?Sized,
{
    client
        .list_schemas(&params.catalog)
        .await
        .map_err(|e| McpError::remote(RemoteOperation::ListSchemas, e))
}

/// Lists tables in a schema.
///
/// Fetches up to `max_results + 1` tables to learn whether the listing is
/// truncated, cuts the result to `max_results`, and only then applies the
/// name filter. A filter can therefore return fewer tables than exist
/// matches in the full listing.
pub async fn list_tables<C>(client: &C, params: &ListTablesParams) -> Result<TableListing>
where
    C: NamespaceService + ?Sized,
{
    let filter = TableFilter::compile(&params.table_name_pattern)?;

    let cap = params.max_results;
    let wanted = (cap > 0).then(|| cap.saturating_add(1));

    let mut tables: Vec<TableInfo> = Vec::new();
    let mut page_token = None;
    loop {
        let remaining = wanted.map(|w| w.saturating_sub(tables.len() as u64));
        let request = ListTablesRequest {
            catalog_name: params.catalog.clone(),
            schema_name: params.schema.clone(),
            max_results: remaining.map(|r| u32::try_from(r).unwrap_or(u32::MAX)),
            page_token: page_token.take(),
            omit_columns: params.omit_columns,
            omit_properties: params.omit_properties,
        };

        let page = client
            .list_tables(&request)
            .await
            .map_err(|e| McpError::remote(RemoteOperation::ListTables, e))?;
        debug!(
            catalog = %params.catalog,
            schema = %params.schema,
            count = page.tables.len(),
            "Fetched table page"
        );
        tables.extend(page.tables);

        if wanted.is_some_and(|w| tables.len() as u64 >= w) {
            break;
        }
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    let truncated = cap > 0 && tables.len() as u64 > cap;
    if truncated {
        tables.truncate(usize::try_from(cap).unwrap_or(usize::MAX));
    }

    let tables = filter.apply(tables);
    Ok(TableListing {
        total_count: tables.len(),
        tables,
        truncated,
    })
}

pub async fn get_table<C>(client: &C, params: &GetTableParams) -> Result<TableInfo>
where
    C: NamespaceService + ?Sized,
{
    client
        .get_table(&params.full_name)
        .await
        .map_err(|e| McpError::remote(RemoteOperation::GetTable, e))
}

pub async fn list_warehouses<C>(client: &C) -> Result<Vec<WarehouseInfo>>
where
    C: WarehouseService + ?Sized,
{
    client
        .list_warehouses()
        .await
        .map_err(|e| McpError::remote(RemoteOperation::ListWarehouses, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockCall, MockWorkspace};
    use pretty_assertions::assert_eq;

    fn workspace(names: &[&str]) -> MockWorkspace {
        let tables = names.iter().map(|n| TableInfo::new("c", "s", *n)).collect();
        MockWorkspace::new().with_tables(tables)
    }

    fn params(pattern: &str, max_results: u64) -> ListTablesParams {
        ListTablesParams {
            catalog: "c".to_string(),
            schema: "s".to_string(),
            table_name_pattern: pattern.to_string(),
            omit_properties: true,
            omit_columns: false,
            max_results,
        }
    }

    fn names(listing: &TableListing) -> Vec<&str> {
        listing.tables.iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_tables_caps_and_flags_truncation() {
        let mock = workspace(&["t0", "t1", "t2", "t3", "t4"]);

        let listing = list_tables(&mock, &params(".*", 2)).await.unwrap();

        assert_eq!(names(&listing), vec!["t0", "t1"]);
        assert_eq!(listing.total_count, 2);
        assert!(listing.truncated);
    }

    #[tokio::test]
    async fn test_list_tables_exact_fit_not_truncated() {
        let mock = workspace(&["t0", "t1"]);

        let listing = list_tables(&mock, &params(".*", 2)).await.unwrap();

        assert_eq!(listing.total_count, 2);
        assert!(!listing.truncated);
    }

    #[tokio::test]
    async fn test_list_tables_follows_pages_up_to_cap() {
        let mock = workspace(&["t0", "t1", "t2", "t3", "t4", "t5", "t6"]).with_page_size(2);

        let listing = list_tables(&mock, &params(".*", 4)).await.unwrap();

        assert_eq!(names(&listing), vec!["t0", "t1", "t2", "t3"]);
        assert!(listing.truncated);
        let requests = mock.table_requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].max_results, Some(5));
        assert_eq!(requests[2].max_results, Some(1));
    }

    #[tokio::test]
    async fn test_list_tables_zero_means_all() {
        let mock = workspace(&["t0", "t1", "t2", "t3", "t4"]).with_page_size(2);

        let listing = list_tables(&mock, &params("", 0)).await.unwrap();

        assert_eq!(listing.total_count, 5);
        assert!(!listing.truncated);
        assert_eq!(mock.table_requests()[0].max_results, None);
    }

    // Truncation happens before the name filter, so matches beyond the first
    // `max_results` entries of the listing are never seen.
    #[tokio::test]
    async fn test_list_tables_truncates_before_filtering() {
        let mock = workspace(&["a1", "b1", "a2", "a3"]);

        let listing = list_tables(&mock, &params("^a", 2)).await.unwrap();

        assert_eq!(names(&listing), vec!["a1"]);
        assert_eq!(listing.total_count, 1);
        assert!(listing.truncated);
    }

    #[tokio::test]
    async fn test_list_tables_invalid_pattern_makes_no_call() {
        let mock = workspace(&["t0"]);

        let err = list_tables(&mock, &params("(", 10)).await.unwrap_err();

        assert!(matches!(err, McpError::Filter { .. }));
        assert!(mock.table_requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_tables_passes_omit_flags() {
        let mock = workspace(&["t0"]);
        let mut p = params(".*", 10);
        p.omit_columns = true;
        p.omit_properties = false;

        list_tables(&mock, &p).await.unwrap();

        let request = &mock.table_requests()[0];
        assert!(request.omit_columns);
        assert!(!request.omit_properties);
    }

    #[tokio::test]
    async fn test_list_tables_remote_failure() {
        let mock = workspace(&["t0"]).fail_on(MockCall::ListTables);

        let err = list_tables(&mock, &params(".*", 10)).await.unwrap_err();

        assert_eq!(err.to_string(), "error listing tables");
    }

    #[tokio::test]
    async fn test_get_table_not_found() {
        let mock = workspace(&["t0"]);
        let params = GetTableParams {
            full_name: "c.s.missing".to_string(),
        };

        let err = get_table(&mock, &params).await.unwrap_err();

        assert!(matches!(
            err,
            McpError::RemoteCall {
                operation: RemoteOperation::GetTable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_list_schemas_scoped_to_catalog() {
        let mock = MockWorkspace::demo();
        let params = ListSchemasParams {
            catalog: "main".to_string(),
        };

        let schemas = list_schemas(&mock, &params).await.unwrap();

        assert_eq!(schemas.len(), 2);
    }
}
