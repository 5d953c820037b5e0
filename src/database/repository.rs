use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Postgres};

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::resources::Resource;
use crate::filter::Filter;

/// A detail record together with the user that owns it
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRecord {
    pub owner: i64,
    pub record: Value,
}

/// Storage behind the listing, detail and feedback endpoints.
///
/// `select` and `count` receive the same [`Filter`]; implementations must apply its
/// owner scope to both so page counts describe the rows actually listed.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn select(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError>;

    async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError>;

    async fn find(&self, resource: Resource, id: i64) -> Result<Option<OwnedRecord>, DatabaseError>;

    async fn name_in_use(&self, resource: Resource, owner: i64, name: &str) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Postgres implementation; every row is built server-side with `json_build_object`.
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceRepository for PgRepository {
    async fn select(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let sql_result = filter.to_sql()?;
        if crate::config::config().database.enable_query_logging {
            tracing::debug!("select: {}", sql_result.query);
        }

        let mut q = sqlx::query_scalar::<_, Value>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_scalar(q, p);
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        let sql_result = filter.to_count_sql()?;
        let mut q = sqlx::query_scalar::<_, i64>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_scalar(q, p);
        }
        let count = q.fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find(&self, resource: Resource, id: i64) -> Result<Option<OwnedRecord>, DatabaseError> {
        let def = resource.def();
        let query = format!(
            "SELECT {}.user_id, {} AS record FROM \"{}\" {} WHERE {} = $1",
            def.alias,
            def.detail_projection(),
            def.table,
            def.alias,
            def.id_column()
        );

        let row = sqlx::query_as::<_, (i64, Value)>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(owner, record)| OwnedRecord { owner, record }))
    }

    async fn name_in_use(&self, resource: Resource, owner: i64, name: &str) -> Result<bool, DatabaseError> {
        let def = resource.def();
        let column = def
            .name_column
            .ok_or_else(|| DatabaseError::QueryError(format!("{} has no name column", resource)))?;
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE user_id = $1 AND \"{}\" = $2)",
            def.table, column
        );

        let exists = sqlx::query_scalar::<_, bool>(&query)
            .bind(owner)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check().await
    }
}

fn bind_param_query_scalar<'q, O>(
    q: sqlx::query::QueryScalar<'q, Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryScalar<'q, Postgres, O, PgArguments>
where
    O: Send + Unpin,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
