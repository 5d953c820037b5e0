use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::ClientError;
use super::source::RecordSource;
use crate::database::Resource;

/// Turns a driver field's committed value into `{target field id: value}`.
#[async_trait]
pub trait CascadeResolver: Send + Sync {
    async fn resolve(&self, driver_value: &str) -> Result<Map<String, Value>, ClientError>;
}

/// Driver field plus the fields it may fill in
#[derive(Clone)]
pub struct CascadeBinding {
    pub driver: String,
    pub targets: Vec<String>,
    pub resolver: Arc<dyn CascadeResolver>,
}

impl std::fmt::Debug for CascadeBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeBinding")
            .field("driver", &self.driver)
            .field("targets", &self.targets)
            .finish()
    }
}

/// Reads the driver's record and copies its defaults onto target fields,
/// e.g. a product's `defaultQuantity` into a stock's `quantity`.
pub struct RecordDefaults {
    records: Arc<dyn RecordSource>,
    resource: Resource,
    mapping: Vec<(String, String)>,
}

impl RecordDefaults {
    pub fn new(records: Arc<dyn RecordSource>, resource: Resource, mapping: &[(&str, &str)]) -> Self {
        Self {
            records,
            resource,
            mapping: mapping
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    pub fn targets(&self) -> Vec<String> {
        self.mapping.iter().map(|(_, to)| to.clone()).collect()
    }
}

#[async_trait]
impl CascadeResolver for RecordDefaults {
    async fn resolve(&self, driver_value: &str) -> Result<Map<String, Value>, ClientError> {
        let id = driver_value
            .parse::<i64>()
            .map_err(|_| ClientError::BadInput(format!("'{}' is not a record id", driver_value)))?;
        let record = self.records.record(self.resource, id).await?;

        let mut values = Map::new();
        for (from, to) in &self.mapping {
            match record.get(from) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    values.insert(to.clone(), value.clone());
                }
            }
        }
        Ok(values)
    }
}

/// Raw string form of a resolved value
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct OneProduct;

    #[async_trait]
    impl RecordSource for OneProduct {
        async fn record(&self, resource: Resource, id: i64) -> Result<Value, ClientError> {
            assert_eq!(resource, Resource::Products);
            match id {
                7 => Ok(json!({
                    "name": "Milk",
                    "defaultQuantity": 2,
                    "defaultUnitOfMeasurement": "MILLILITERS",
                    "defaultLocationId": null
                })),
                _ => Err(ClientError::Status {
                    code: 404,
                    message: "Product not found".to_string(),
                }),
            }
        }
    }

    fn resolver() -> RecordDefaults {
        RecordDefaults::new(
            Arc::new(OneProduct),
            Resource::Products,
            &[
                ("defaultQuantity", "quantity"),
                ("defaultUnitOfMeasurement", "unitOfMeasurement"),
                ("defaultLocationId", "locationId"),
            ],
        )
    }

    #[tokio::test]
    async fn maps_defaults_and_skips_missing_ones() {
        let values = resolver().resolve("7").await.unwrap();
        assert_eq!(values.get("quantity"), Some(&json!(2)));
        assert_eq!(values.get("unitOfMeasurement"), Some(&json!("MILLILITERS")));
        assert!(!values.contains_key("locationId"));
    }

    #[tokio::test]
    async fn failures_propagate() {
        assert!(matches!(resolver().resolve("8").await, Err(ClientError::Status { code: 404, .. })));
        assert!(matches!(resolver().resolve("milk").await, Err(ClientError::BadInput(_))));
    }

    #[test]
    fn value_text_strips_string_quotes() {
        assert_eq!(value_text(&json!("GRAMS")), "GRAMS");
        assert_eq!(value_text(&json!(4)), "4");
    }
}
