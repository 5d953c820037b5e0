//! In-process repository used when no `DATABASE_URL` is configured, and by tests.
//!
//! Rows are stored already projected. Ordering follows Postgres semantics closely
//! enough for the listing contract: nulls sort after every value ascending, and the
//! record id breaks ties.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::database::manager::DatabaseError;
use crate::database::repository::{OwnedRecord, ResourceRepository};
use crate::database::resources::Resource;
use crate::filter::{Filter, PageWindow, SortDirection};

#[derive(Debug, Clone)]
struct MemoryRow {
    id: i64,
    owner: i64,
    row: Value,
    detail: Value,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: HashMap<Resource, Vec<MemoryRow>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a pre-projected list row and detail view.
    pub fn insert(&mut self, resource: Resource, owner: i64, id: i64, row: Value, detail: Value) {
        self.tables
            .entry(resource)
            .or_default()
            .push(MemoryRow { id, owner, row, detail });
    }

    pub fn add_location(&mut self, owner: i64, id: i64, name: &str) -> &mut Self {
        self.insert(
            Resource::Locations,
            owner,
            id,
            json!({"id": id, "name": name}),
            json!({"name": name}),
        );
        self
    }

    pub fn add_category(&mut self, owner: i64, id: i64, name: &str, default_location: i64) -> &mut Self {
        let location = self.name_of(Resource::Locations, default_location);
        self.insert(
            Resource::Categories,
            owner,
            id,
            json!({"id": id, "name": name, "defaultLocation": {"name": location}}),
            json!({"name": name, "defaultLocationId": default_location}),
        );
        self
    }

    pub fn add_product(
        &mut self,
        owner: i64,
        id: i64,
        name: &str,
        quantity: i64,
        unit: &str,
        default_location: i64,
    ) -> &mut Self {
        let location = self.name_of(Resource::Locations, default_location);
        self.insert(
            Resource::Products,
            owner,
            id,
            json!({
                "id": id,
                "name": name,
                "defaultQuantity": quantity,
                "defaultUnitOfMeasurement": unit,
                "defaultLocation": {"name": location}
            }),
            json!({
                "name": name,
                "defaultQuantity": quantity,
                "defaultUnitOfMeasurement": unit,
                "defaultLocationId": default_location
            }),
        );
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_stock(
        &mut self,
        owner: i64,
        id: i64,
        expiration: &str,
        product: i64,
        quantity: i64,
        unit: &str,
        location: i64,
    ) -> &mut Self {
        let product_name = self.name_of(Resource::Products, product);
        let location_name = self.name_of(Resource::Locations, location);
        self.insert(
            Resource::Stocks,
            owner,
            id,
            json!({
                "id": id,
                "expiration": expiration,
                "product": {"name": product_name},
                "quantity": quantity,
                "unitOfMeasurement": unit,
                "location": {"name": location_name}
            }),
            json!({
                "expiration": expiration,
                "productId": product,
                "quantity": quantity,
                "unitOfMeasurement": unit,
                "locationId": location
            }),
        );
        self
    }

    pub fn add_book(&mut self, owner: i64, id: i64, category: i64, title: &str, location: i64) -> &mut Self {
        let category_name = self.name_of(Resource::Categories, category);
        let location_name = self.name_of(Resource::Locations, location);
        self.insert(
            Resource::Books,
            owner,
            id,
            json!({
                "id": id,
                "category": {"name": category_name},
                "title": title,
                "location": {"name": location_name}
            }),
            json!({"categoryId": category, "title": title, "locationId": location}),
        );
        self
    }

    /// Deterministic data set served by the development server.
    ///
    /// User 1 owns 5 locations, 3 categories, 23 products, 6 stocks and 5 books.
    /// User 2 owns one record of each named resource.
    pub fn demo() -> Self {
        const PRODUCTS: [(&str, i64, &str, i64); 23] = [
            ("Apples", 6, "PIECES", 2),
            ("Basil", 20, "GRAMS", 2),
            ("Butter", 250, "GRAMS", 2),
            ("Carrots", 8, "PIECES", 2),
            ("Cheese", 200, "GRAMS", 2),
            ("Coffee", 500, "GRAMS", 1),
            ("Eggs", 10, "PIECES", 2),
            ("Flour", 1000, "GRAMS", 1),
            ("Garlic", 3, "PIECES", 1),
            ("Honey", 400, "GRAMS", 1),
            ("Jam", 300, "GRAMS", 1),
            ("Lentils", 500, "GRAMS", 1),
            ("Milk", 1000, "MILLILITERS", 2),
            ("Oats", 500, "GRAMS", 1),
            ("Olive Oil", 750, "MILLILITERS", 1),
            ("Onions", 4, "PIECES", 1),
            ("Pasta", 500, "GRAMS", 1),
            ("Pepper", 50, "GRAMS", 1),
            ("Rice", 1000, "GRAMS", 1),
            ("Salt", 500, "GRAMS", 1),
            ("Sugar", 1000, "GRAMS", 1),
            ("Tea", 100, "GRAMS", 1),
            ("Yogurt", 500, "GRAMS", 2),
        ];

        let mut repo = Self::new();
        repo.add_location(1, 1, "Pantry")
            .add_location(1, 2, "Fridge")
            .add_location(1, 3, "Freezer")
            .add_location(1, 4, "Bookshelf")
            .add_location(1, 5, "Garage")
            .add_location(2, 100, "Cellar");

        repo.add_category(1, 1, "Novels", 4)
            .add_category(1, 2, "Cooking", 1)
            .add_category(1, 3, "Comics", 5)
            .add_category(2, 100, "Poetry", 100);

        // Ids run backwards so name order differs from insertion and id order.
        for (index, (name, quantity, unit, location)) in PRODUCTS.iter().enumerate() {
            let id = (PRODUCTS.len() - index) as i64;
            repo.add_product(1, id, name, *quantity, unit, *location);
        }
        repo.add_product(2, 100, "Wine", 750, "MILLILITERS", 100);

        repo.add_stock(1, 1, "2026/11/02", 11, 1, "PIECES", 2)
            .add_stock(1, 2, "2027/03/15", 5, 400, "GRAMS", 1)
            .add_stock(1, 3, "2026/10/28", 17, 12, "PIECES", 2)
            .add_stock(1, 4, "2028/01/01", 4, 1000, "GRAMS", 1)
            .add_stock(1, 5, "2026/12/24", 19, 200, "GRAMS", 3)
            .add_stock(1, 6, "2027/06/30", 10, 500, "GRAMS", 1)
            .add_stock(2, 100, "2030/01/01", 100, 750, "MILLILITERS", 100);

        repo.add_book(1, 1, 1, "Moby Dick", 4)
            .add_book(1, 2, 2, "Salt Fat Acid Heat", 1)
            .add_book(1, 3, 1, "Dune", 4)
            .add_book(1, 4, 3, "Watchmen", 5)
            .add_book(1, 5, 1, "Emma", 4)
            .add_book(2, 100, 100, "Leaves of Grass", 100);

        repo
    }

    fn name_of(&self, resource: Resource, id: i64) -> Value {
        let field = match resource {
            Resource::Books => "title",
            _ => "name",
        };
        self.tables
            .get(&resource)
            .and_then(|rows| rows.iter().find(|r| r.id == id))
            .and_then(|r| r.detail.get(field).cloned())
            .unwrap_or(Value::Null)
    }

    fn scoped(&self, filter: &Filter) -> Vec<&MemoryRow> {
        self.tables
            .get(&filter.resource())
            .map(|rows| {
                rows.iter()
                    .filter(|r| filter.owner_id().map_or(true, |owner| r.owner == owner))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResourceRepository for MemoryRepository {
    async fn select(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let mut rows = self.scoped(filter);
        let pointers: Vec<(String, SortDirection)> = filter
            .order_keys()
            .keys()
            .iter()
            .map(|k| (format!("/{}", k.path.join("/")), k.direction))
            .collect();

        rows.sort_by(|a, b| {
            pointers
                .iter()
                .map(|(pointer, direction)| {
                    let ord = compare_json(a.row.pointer(pointer), b.row.pointer(pointer));
                    match direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or_else(|| a.id.cmp(&b.id))
        });

        let selected = match filter.page_window() {
            PageWindow::All => rows,
            PageWindow::Slice { offset, limit } => rows
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
        };
        Ok(selected.into_iter().map(|r| r.row.clone()).collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64, DatabaseError> {
        Ok(self.scoped(filter).len() as u64)
    }

    async fn find(&self, resource: Resource, id: i64) -> Result<Option<OwnedRecord>, DatabaseError> {
        Ok(self
            .tables
            .get(&resource)
            .and_then(|rows| rows.iter().find(|r| r.id == id))
            .map(|r| OwnedRecord { owner: r.owner, record: r.detail.clone() }))
    }

    async fn name_in_use(&self, resource: Resource, owner: i64, name: &str) -> Result<bool, DatabaseError> {
        let column = resource
            .def()
            .name_column
            .ok_or_else(|| DatabaseError::QueryError(format!("{} has no name column", resource)))?;
        Ok(self
            .tables
            .get(&resource)
            .map(|rows| {
                rows.iter()
                    .any(|r| r.owner == owner && r.detail.get(column).and_then(Value::as_str) == Some(name))
            })
            .unwrap_or(false))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Total order over projected values; missing and null sort last.
fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{paginate, OrderKey, OrderSpec};

    fn names(rows: &[Value], pointer: &str) -> Vec<String> {
        rows.iter()
            .map(|r| r.pointer(pointer).and_then(Value::as_str).unwrap_or("-").to_string())
            .collect()
    }

    #[tokio::test]
    async fn pages_products_by_name() {
        let repo = MemoryRepository::demo();
        let mut filter = Filter::new(Resource::Products);
        filter
            .owner(1)
            .order_spec(OrderSpec::from(vec![OrderKey::new("name", SortDirection::Asc)]))
            .unwrap();

        let total = repo.count(&filter).await.unwrap();
        assert_eq!(total, 23);

        let page = paginate(Some(2), total, 10);
        filter.window(page.window);
        let rows = repo.select(&filter).await.unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(names(&rows, "/name"), vec!["Sugar", "Tea", "Yogurt"]);
    }

    #[tokio::test]
    async fn out_of_range_page_is_empty() {
        let repo = MemoryRepository::demo();
        let mut filter = Filter::new(Resource::Products);
        filter.owner(1).window(paginate(Some(3), 23, 10).window);
        assert!(repo.select(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nested_keys_sort_with_id_tie_break() {
        let repo = MemoryRepository::demo();
        let mut filter = Filter::new(Resource::Books);
        filter
            .owner(1)
            .order_spec(OrderSpec::from(vec![OrderKey::new("location.name", SortDirection::Desc)]))
            .unwrap();

        let rows = repo.select(&filter).await.unwrap();
        // Pantry, Garage, then Bookshelf (ids 1, 3, 5)
        assert_eq!(
            names(&rows, "/title"),
            vec!["Salt Fat Acid Heat", "Watchmen", "Moby Dick", "Dune", "Emma"]
        );
    }

    #[tokio::test]
    async fn owner_scope_applies_to_rows_and_count() {
        let repo = MemoryRepository::demo();
        let mut filter = Filter::new(Resource::Locations);
        filter.owner(2);
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
        assert_eq!(names(&repo.select(&filter).await.unwrap(), "/name"), vec!["Cellar"]);
    }

    #[tokio::test]
    async fn finds_details_and_names() {
        let repo = MemoryRepository::demo();
        let category = repo.find(Resource::Categories, 2).await.unwrap().unwrap();
        assert_eq!(category.owner, 1);
        assert_eq!(category.record, json!({"name": "Cooking", "defaultLocationId": 1}));
        assert!(repo.find(Resource::Categories, 42).await.unwrap().is_none());

        assert!(repo.name_in_use(Resource::Locations, 1, "Fridge").await.unwrap());
        assert!(!repo.name_in_use(Resource::Locations, 2, "Fridge").await.unwrap());
        assert!(repo.name_in_use(Resource::Stocks, 1, "x").await.is_err());
    }

    #[test]
    fn nulls_sort_last() {
        let one = json!(1);
        assert_eq!(compare_json(None, Some(&one)), Ordering::Greater);
        assert_eq!(compare_json(Some(&Value::Null), Some(&one)), Ordering::Greater);
        assert_eq!(compare_json(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
    }
}
