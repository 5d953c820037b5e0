use serde_json::Value;

use super::error::FilterError;
use super::types::{OrderKey, OrderSpec, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parses an untrusted order expression.
    ///
    /// The input must be an array of objects with exactly one key each. A key's value is
    /// either a direction literal or another single-key object naming the next path
    /// segment. Nesting is capped at `max_depth` path segments.
    pub fn validate_and_parse(order: &Value, max_depth: usize) -> Result<OrderSpec, FilterError> {
        let nodes = order
            .as_array()
            .ok_or_else(|| FilterError::InvalidOrder("order must be an array".to_string()))?;

        let mut spec = OrderSpec::new();
        for node in nodes {
            let mut path = Vec::new();
            let direction = Self::parse_node(node, &mut path, max_depth)?;
            spec.push(OrderKey { path, direction });
        }
        Ok(spec)
    }

    /// Parses the raw `order` query parameter. Blank means unordered.
    pub fn from_query(raw: &str, max_depth: usize) -> Result<OrderSpec, FilterError> {
        if raw.trim().is_empty() {
            return Ok(OrderSpec::new());
        }
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| FilterError::InvalidOrder(format!("order is not valid JSON: {}", e)))?;
        Self::validate_and_parse(&value, max_depth)
    }

    fn parse_node(node: &Value, path: &mut Vec<String>, max_depth: usize) -> Result<SortDirection, FilterError> {
        let obj = node
            .as_object()
            .ok_or_else(|| FilterError::InvalidOrder(format!("order node must be an object, got {}", node)))?;

        let mut entries = obj.iter();
        let (key, value) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(FilterError::InvalidOrder(format!(
                    "order node must have exactly one key, got {}",
                    obj.len()
                )))
            }
        };

        if key.is_empty() {
            return Err(FilterError::InvalidOrder("sort key cannot be empty".to_string()));
        }
        path.push(key.clone());
        if path.len() > max_depth {
            return Err(FilterError::OrderTooDeep(max_depth));
        }

        match value {
            Value::Object(_) => Self::parse_node(value, path, max_depth),
            Value::String(literal) => SortDirection::parse(literal).ok_or_else(|| {
                FilterError::InvalidOrder(format!("invalid direction '{}' for '{}'", literal, path.join(".")))
            }),
            other => Err(FilterError::InvalidOrder(format!(
                "invalid direction {} for '{}'",
                other,
                path.join(".")
            ))),
        }
    }

    /// Builds the ORDER BY clause from resolved SQL expressions.
    pub fn generate(columns: &[(&str, SortDirection)]) -> String {
        if columns.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = columns
            .iter()
            .map(|(expr, dir)| format!("{} {}", expr, dir.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
