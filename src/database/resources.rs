//! Static description of the five listable resources.
//!
//! Every resource is owned by a user (`user_id`) and exposes two projections: the list
//! row returned by `GET /api/{resource}` and the detail view returned by
//! `GET /api/{resource}/{id}`. Paths in the list projection are the only accepted sort
//! keys.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Locations,
    Products,
    Stocks,
    Categories,
    Books,
}

/// `LEFT JOIN "<table>" <alias> ON <alias>.id = <base alias>.<on_column>`
#[derive(Debug)]
pub struct JoinDef {
    pub table: &'static str,
    pub alias: &'static str,
    pub on_column: &'static str,
}

#[derive(Debug)]
pub struct ColumnDef {
    /// Dotted path in the JSON projection, e.g. `location.name`
    pub path: &'static str,
    pub sql: &'static str,
}

#[derive(Debug)]
pub struct ResourceDef {
    pub name: &'static str,
    pub table: &'static str,
    pub alias: &'static str,
    pub joins: &'static [JoinDef],
    pub columns: &'static [ColumnDef],
    pub detail: &'static [ColumnDef],
    pub name_column: Option<&'static str>,
}

static LOCATIONS: ResourceDef = ResourceDef {
    name: "locations",
    table: "locations",
    alias: "l",
    joins: &[],
    columns: &[
        ColumnDef { path: "id", sql: "l.id" },
        ColumnDef { path: "name", sql: "l.name" },
    ],
    detail: &[ColumnDef { path: "name", sql: "l.name" }],
    name_column: Some("name"),
};

static CATEGORIES: ResourceDef = ResourceDef {
    name: "categories",
    table: "categories",
    alias: "c",
    joins: &[JoinDef { table: "locations", alias: "dl", on_column: "default_location_id" }],
    columns: &[
        ColumnDef { path: "id", sql: "c.id" },
        ColumnDef { path: "name", sql: "c.name" },
        ColumnDef { path: "defaultLocation.name", sql: "dl.name" },
    ],
    detail: &[
        ColumnDef { path: "name", sql: "c.name" },
        ColumnDef { path: "defaultLocationId", sql: "c.default_location_id" },
    ],
    name_column: Some("name"),
};

static PRODUCTS: ResourceDef = ResourceDef {
    name: "products",
    table: "products",
    alias: "p",
    joins: &[JoinDef { table: "locations", alias: "dl", on_column: "default_location_id" }],
    columns: &[
        ColumnDef { path: "id", sql: "p.id" },
        ColumnDef { path: "name", sql: "p.name" },
        ColumnDef { path: "defaultQuantity", sql: "p.default_quantity" },
        ColumnDef { path: "defaultUnitOfMeasurement", sql: "p.default_unit_of_measurement" },
        ColumnDef { path: "defaultLocation.name", sql: "dl.name" },
    ],
    detail: &[
        ColumnDef { path: "name", sql: "p.name" },
        ColumnDef { path: "defaultQuantity", sql: "p.default_quantity" },
        ColumnDef { path: "defaultUnitOfMeasurement", sql: "p.default_unit_of_measurement" },
        ColumnDef { path: "defaultLocationId", sql: "p.default_location_id" },
    ],
    name_column: Some("name"),
};

// Dates are rendered zero-padded so text order matches date order.
static STOCKS: ResourceDef = ResourceDef {
    name: "stocks",
    table: "stocks",
    alias: "s",
    joins: &[
        JoinDef { table: "products", alias: "p", on_column: "product_id" },
        JoinDef { table: "locations", alias: "l", on_column: "location_id" },
    ],
    columns: &[
        ColumnDef { path: "id", sql: "s.id" },
        ColumnDef { path: "expiration", sql: "to_char(s.expiration, 'YYYY/MM/DD')" },
        ColumnDef { path: "product.name", sql: "p.name" },
        ColumnDef { path: "quantity", sql: "s.quantity" },
        ColumnDef { path: "unitOfMeasurement", sql: "s.unit_of_measurement" },
        ColumnDef { path: "location.name", sql: "l.name" },
    ],
    detail: &[
        ColumnDef { path: "expiration", sql: "to_char(s.expiration, 'YYYY/MM/DD')" },
        ColumnDef { path: "productId", sql: "s.product_id" },
        ColumnDef { path: "quantity", sql: "s.quantity" },
        ColumnDef { path: "unitOfMeasurement", sql: "s.unit_of_measurement" },
        ColumnDef { path: "locationId", sql: "s.location_id" },
    ],
    name_column: None,
};

static BOOKS: ResourceDef = ResourceDef {
    name: "books",
    table: "books",
    alias: "b",
    joins: &[
        JoinDef { table: "categories", alias: "c", on_column: "category_id" },
        JoinDef { table: "locations", alias: "l", on_column: "location_id" },
    ],
    columns: &[
        ColumnDef { path: "id", sql: "b.id" },
        ColumnDef { path: "category.name", sql: "c.name" },
        ColumnDef { path: "title", sql: "b.title" },
        ColumnDef { path: "location.name", sql: "l.name" },
    ],
    detail: &[
        ColumnDef { path: "categoryId", sql: "b.category_id" },
        ColumnDef { path: "title", sql: "b.title" },
        ColumnDef { path: "locationId", sql: "b.location_id" },
    ],
    name_column: None,
};

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Locations,
        Resource::Products,
        Resource::Stocks,
        Resource::Categories,
        Resource::Books,
    ];

    pub fn def(&self) -> &'static ResourceDef {
        match self {
            Resource::Locations => &LOCATIONS,
            Resource::Products => &PRODUCTS,
            Resource::Stocks => &STOCKS,
            Resource::Categories => &CATEGORIES,
            Resource::Books => &BOOKS,
        }
    }

    pub fn name(&self) -> &'static str {
        self.def().name
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }

    /// Singular noun used in feedback endpoints and messages
    pub fn singular(&self) -> &'static str {
        match self {
            Resource::Locations => "location",
            Resource::Products => "product",
            Resource::Stocks => "stock",
            Resource::Categories => "category",
            Resource::Books => "book",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ResourceDef {
    pub fn column(&self, path: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.path == path)
    }

    pub fn id_column(&self) -> String {
        format!("{}.id", self.alias)
    }

    pub fn owner_column(&self) -> String {
        format!("{}.user_id", self.alias)
    }

    /// `"stocks" s LEFT JOIN "products" p ON p.id = s.product_id ...`
    pub fn from_clause(&self) -> String {
        let mut sql = format!("\"{}\" {}", self.table, self.alias);
        for join in self.joins {
            sql.push_str(&format!(
                " LEFT JOIN \"{}\" {} ON {}.id = {}.{}",
                join.table, join.alias, join.alias, self.alias, join.on_column
            ));
        }
        sql
    }

    pub fn list_projection(&self) -> String {
        json_object_sql(self.columns)
    }

    pub fn detail_projection(&self) -> String {
        json_object_sql(self.detail)
    }
}

/// Nests dotted paths into `json_build_object` calls, preserving column order.
fn json_object_sql(columns: &[ColumnDef]) -> String {
    let entries: Vec<(Vec<&str>, &str)> = columns
        .iter()
        .map(|c| (c.path.split('.').collect(), c.sql))
        .collect();
    build_object(&entries)
}

fn build_object(entries: &[(Vec<&str>, &str)]) -> String {
    let mut parts = Vec::new();
    let mut nested_seen: Vec<&str> = Vec::new();

    for (segments, sql) in entries {
        let head = segments[0];
        if segments.len() == 1 {
            parts.push(format!("'{}', {}", head, sql));
        } else if !nested_seen.contains(&head) {
            nested_seen.push(head);
            let children: Vec<(Vec<&str>, &str)> = entries
                .iter()
                .filter(|(s, _)| s.len() > 1 && s[0] == head)
                .map(|(s, q)| (s[1..].to_vec(), *q))
                .collect();
            parts.push(format!("'{}', {}", head, build_object(&children)));
        }
    }

    format!("json_build_object({})", parts.join(", "))
}
