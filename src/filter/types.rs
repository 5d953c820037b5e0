use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Wire literal used when re-serialising an order
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Accepts the short wire literals and their long forms, case-sensitive.
    pub fn parse(literal: &str) -> Option<Self> {
        match literal {
            "asc" | "ascending" => Some(SortDirection::Asc),
            "desc" | "descending" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// One sort instruction: a path into the row projection plus a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub path: Vec<String>,
    pub direction: SortDirection,
}

impl OrderKey {
    pub fn new(dotted: &str, direction: SortDirection) -> Self {
        Self {
            path: dotted.split('.').map(str::to_string).collect(),
            direction,
        }
    }

    pub fn dotted(&self) -> String {
        self.path.join(".")
    }

    /// `location.name` + asc => `{"location": {"name": "asc"}}`
    pub fn to_node(&self) -> Value {
        self.path
            .iter()
            .rev()
            .fold(Value::String(self.direction.as_str().to_string()), |inner, segment| {
                let mut node = Map::new();
                node.insert(segment.clone(), inner);
                Value::Object(node)
            })
    }
}

/// Ordered list of sort keys, primary key first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSpec {
    keys: Vec<OrderKey>,
}

impl OrderSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &[OrderKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Appends as given; duplicates are kept.
    pub fn push(&mut self, key: OrderKey) {
        self.keys.push(key);
    }

    /// Removes every entry for `dotted`, returning the direction of the first one.
    pub fn remove(&mut self, dotted: &str) -> Option<SortDirection> {
        let found = self.direction(dotted);
        self.keys.retain(|k| k.dotted() != dotted);
        found
    }

    pub fn direction(&self, dotted: &str) -> Option<SortDirection> {
        self.keys
            .iter()
            .find(|k| k.dotted() == dotted)
            .map(|k| k.direction)
    }

    /// Canonical wire form: array of single-key nodes using `asc`/`desc`
    pub fn to_json(&self) -> Value {
        Value::Array(self.keys.iter().map(OrderKey::to_node).collect())
    }
}

impl From<Vec<OrderKey>> for OrderSpec {
    fn from(keys: Vec<OrderKey>) -> Self {
        Self { keys }
    }
}

impl Serialize for OrderSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Row slice selected by a page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWindow {
    All,
    Slice { offset: u64, limit: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageResult {
    pub window: PageWindow,
    pub total_pages: u64,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}
