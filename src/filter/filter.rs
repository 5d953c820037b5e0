use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::types::{OrderSpec, PageWindow, SqlResult, SortDirection};
use crate::database::resources::Resource;

/// Listing query for one resource: owner scope, validated order and page window.
///
/// Row and count SQL are generated from the same instance, so both always target the
/// same table and the same owner.
#[derive(Debug, Clone)]
pub struct Filter {
    resource: Resource,
    owner: Option<i64>,
    order_data: OrderSpec,
    window: PageWindow,
}

impl Filter {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            owner: None,
            order_data: OrderSpec::new(),
            window: PageWindow::All,
        }
    }

    pub fn owner(&mut self, user_id: i64) -> &mut Self {
        self.owner = Some(user_id);
        self
    }

    /// Validates a raw order expression and checks every key against the resource.
    pub fn order(&mut self, order_spec: &Value) -> Result<&mut Self, FilterError> {
        let max_depth = crate::config::config().query.max_order_depth;
        let spec = FilterOrder::validate_and_parse(order_spec, max_depth)?;
        self.order_spec(spec)
    }

    pub fn order_spec(&mut self, spec: OrderSpec) -> Result<&mut Self, FilterError> {
        let def = self.resource.def();
        for key in spec.keys() {
            let dotted = key.dotted();
            if def.column(&dotted).is_none() {
                return Err(FilterError::UnknownSortKey(dotted));
            }
        }

        if crate::config::config().query.debug_logging {
            tracing::debug!("{} order: {}", self.resource, spec.to_json());
        }

        self.order_data = spec;
        Ok(self)
    }

    pub fn window(&mut self, window: PageWindow) -> &mut Self {
        self.window = window;
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn owner_id(&self) -> Option<i64> {
        self.owner
    }

    pub fn order_keys(&self) -> &OrderSpec {
        &self.order_data
    }

    pub fn page_window(&self) -> PageWindow {
        self.window
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let def = self.resource.def();
        let (where_clause, params) = self.where_clause();
        let order_clause = self.order_clause()?;

        let query = [
            format!("SELECT {} AS record", def.list_projection()),
            format!("FROM {}", def.from_clause()),
            where_clause,
            order_clause,
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let def = self.resource.def();
        let (where_clause, params) = self.where_clause();

        let query = [
            "SELECT COUNT(*) AS count".to_string(),
            format!("FROM {}", def.from_clause()),
            where_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        match self.owner {
            Some(user_id) => (
                format!("WHERE {} = $1", self.resource.def().owner_column()),
                vec![Value::from(user_id)],
            ),
            None => (String::new(), vec![]),
        }
    }

    // The id tie-break keeps page boundaries stable between requests.
    fn order_clause(&self) -> Result<String, FilterError> {
        let def = self.resource.def();
        let mut columns = Vec::with_capacity(self.order_data.len() + 1);
        for key in self.order_data.keys() {
            let dotted = key.dotted();
            let column = def
                .column(&dotted)
                .ok_or_else(|| FilterError::UnknownSortKey(dotted.clone()))?;
            columns.push((column.sql.to_string(), key.direction));
        }
        columns.push((def.id_column(), SortDirection::Asc));

        let borrowed: Vec<(&str, SortDirection)> = columns.iter().map(|(s, d)| (s.as_str(), *d)).collect();
        Ok(FilterOrder::generate(&borrowed))
    }

    fn build_limit_clause(&self) -> String {
        match self.window {
            PageWindow::All => String::new(),
            // Postgres OFFSET is a signed bigint
            PageWindow::Slice { offset, limit } => {
                format!("LIMIT {} OFFSET {}", limit, offset.min(i64::MAX as u64))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_and_count_sql_share_table_and_owner() {
        let mut filter = Filter::new(Resource::Products);
        filter
            .owner(7)
            .order(&json!([{"defaultLocation": {"name": "desc"}}]))
            .unwrap()
            .window(PageWindow::Slice { offset: 20, limit: 10 });

        let rows = filter.to_sql().unwrap();
        let count = filter.to_count_sql().unwrap();

        assert!(rows.query.contains("FROM \"products\" p LEFT JOIN \"locations\" dl"));
        assert!(rows.query.ends_with("WHERE p.user_id = $1 ORDER BY dl.name DESC, p.id ASC LIMIT 10 OFFSET 20"));
        assert_eq!(
            count.query,
            "SELECT COUNT(*) AS count FROM \"products\" p LEFT JOIN \"locations\" dl ON dl.id = p.default_location_id WHERE p.user_id = $1"
        );
        assert_eq!(rows.params, vec![json!(7)]);
        assert_eq!(count.params, rows.params);
    }

    #[test]
    fn unordered_listing_still_has_tie_break() {
        let filter = Filter::new(Resource::Locations);
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT json_build_object('id', l.id, 'name', l.name) AS record FROM \"locations\" l ORDER BY l.id ASC"
        );
    }

    #[test]
    fn rejects_unknown_sort_keys() {
        let mut filter = Filter::new(Resource::Stocks);
        let err = filter.order(&json!([{"user_id": "asc"}])).unwrap_err();
        assert!(matches!(err, FilterError::UnknownSortKey(k) if k == "user_id"));

        let err = filter.order(&json!([{"product": {"price": "asc"}}])).unwrap_err();
        assert!(matches!(err, FilterError::UnknownSortKey(k) if k == "product.price"));
        assert!(filter.order_keys().is_empty(), "failed order must not be partially applied");
    }

    #[test]
    fn keeps_key_order_and_duplicates() {
        let mut filter = Filter::new(Resource::Books);
        filter
            .order(&json!([{"title": "asc"}, {"category": {"name": "desc"}}, {"title": "desc"}]))
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert!(sql.query.ends_with("ORDER BY b.title ASC, c.name DESC, b.title DESC, b.id ASC"));
    }
}
