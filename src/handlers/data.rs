use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config;
use crate::database::Resource;
use crate::error::ApiError;
use crate::filter::{paginate, parse_page, Filter, FilterOrder};
use crate::middleware::AuthUser;
use crate::routes::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub order: Option<String>,
}

/// GET /api/{resource}?page=&order= - one page of the caller's rows plus the page count
pub async fn resource_list(
    State(state): State<AppState>,
    Extension(resource): Extension<Resource>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let settings = &config::config().query;

    // Both parameters are validated before any storage access
    let page = parse_page(query.page.as_deref())?;
    let order = FilterOrder::from_query(query.order.as_deref().unwrap_or(""), settings.max_order_depth)?;

    let mut filter = Filter::new(resource);
    filter.owner(user.id).order_spec(order)?;

    let total = state.repository.count(&filter).await?;
    let pages = paginate(page, total, settings.page_size);
    filter.window(pages.window);
    let rows = state.repository.select(&filter).await?;

    if settings.debug_logging {
        tracing::debug!(
            "{} list for user {}: page {:?}, {} of {} rows",
            resource,
            user.id,
            page,
            rows.len(),
            total
        );
    }

    let mut body = Map::new();
    body.insert(resource.name().to_string(), Value::Array(rows));
    body.insert("pages".to_string(), Value::from(pages.total_pages));
    Ok(Json(Value::Object(body)))
}

/// GET /api/{resource}/{id} - edit view of a single record owned by the caller
pub async fn record_get(
    State(state): State<AppState>,
    Extension(resource): Extension<Resource>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {} id: {}", resource.singular(), id)))?;

    let found = state
        .repository
        .find(resource, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No {} with id {}", resource.singular(), id)))?;

    if found.owner != user.id {
        return Err(ApiError::forbidden(format!(
            "{} {} belongs to another user",
            resource.singular(),
            id
        )));
    }

    let mut body = Map::new();
    body.insert(resource.singular().to_string(), found.record);
    Ok(Json(Value::Object(body)))
}
