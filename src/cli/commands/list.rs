use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde_json::json;

use crate::cli::utils::{format_table, output_success};
use crate::cli::OutputFormat;
use crate::client::views::table_columns;
use crate::client::{ApiClient, TableController};
use crate::config::config;
use crate::database::Resource;
use crate::filter::{OrderKey, OrderSpec, SortDirection};

/// `location.name:desc` => key on `location.name`, descending
pub fn parse_sort(raw: &str) -> anyhow::Result<OrderKey> {
    let (path, direction) = match raw.rsplit_once(':') {
        Some((path, literal)) => {
            let direction = SortDirection::parse(literal)
                .ok_or_else(|| anyhow!("Invalid sort direction '{}' (use asc or desc)", literal))?;
            (path, direction)
        }
        None => (raw, SortDirection::Asc),
    };
    if path.is_empty() {
        return Err(anyhow!("Empty sort key in '{}'", raw));
    }
    Ok(OrderKey::new(path, direction))
}

pub async fn handle(
    client: Arc<ApiClient>,
    resource: &str,
    page: Option<&str>,
    sort: &[String],
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let resource = Resource::parse(resource).ok_or_else(|| {
        let names: Vec<&str> = Resource::ALL.iter().map(|r| r.name()).collect();
        anyhow!("Unknown resource '{}' (expected one of: {})", resource, names.join(", "))
    })?;

    let debounce = Duration::from_millis(config().client.debounce_ms);
    let mut table = TableController::open(resource, table_columns(resource), client, debounce);

    if !sort.is_empty() {
        let keys = sort.iter().map(|s| parse_sort(s)).collect::<anyhow::Result<Vec<_>>>()?;
        table.set_order(OrderSpec::from(keys))?;
    }
    if let Some(page) = page {
        match page.trim().parse::<u64>() {
            Ok(number) if number >= 1 => {
                table.type_page(page);
                table.commit_page_input();
            }
            _ => return Err(anyhow!("Invalid page '{}' (pages start at 1)", page)),
        }
    }

    table.settle().await;
    if let Some(error) = table.last_error() {
        return Err(error.clone()).with_context(|| format!("Failed to list {}", resource));
    }

    let helper = table.helper();
    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            &format!("Listed {}", resource),
            Some(json!({
                resource.name(): table.rows(),
                "page": helper.current + 1,
                "pages": helper.total,
                "order": table.order().to_json(),
            })),
        ),
        OutputFormat::Text => {
            let headers: Vec<String> = table
                .headers()
                .into_iter()
                .map(|(title, direction)| match direction {
                    Some(SortDirection::Asc) => format!("{} ↑", title),
                    Some(SortDirection::Desc) => format!("{} ↓", title),
                    None => title.to_string(),
                })
                .collect();
            let rows: Vec<Vec<String>> = table
                .render_rows()
                .iter()
                .map(|row| row.iter().map(|cell| cell.text().to_string()).collect())
                .collect();

            println!("{}", format_table(&headers, &rows));
            if rows.is_empty() {
                println!("(no {} on this page)", resource);
            }
            println!("Page {} of {}", helper.current + 1, helper.total);
            Ok(())
        }
    }
}
