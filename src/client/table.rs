use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::cascade::value_text;
use super::debounce::DebouncedTask;
use super::dropdown::unit_label;
use super::error::ClientError;
use super::source::{ListPage, TableSource};
use crate::database::Resource;
use crate::filter::{OrderKey, OrderSpec, SortDirection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Quantity followed by the unit found at `unit_path`
    Quantity { unit_path: String },
    /// `{id}` in the template is replaced by the row id
    Link { href_template: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: String,
    /// Dotted path into the row; link columns have none and cannot be sorted
    pub path: Option<String>,
    pub kind: ColumnKind,
}

impl Column {
    pub fn text(title: &str, path: &str) -> Self {
        Self {
            title: title.to_string(),
            path: Some(path.to_string()),
            kind: ColumnKind::Text,
        }
    }

    pub fn quantity(title: &str, path: &str, unit_path: &str) -> Self {
        Self {
            title: title.to_string(),
            path: Some(path.to_string()),
            kind: ColumnKind::Quantity {
                unit_path: unit_path.to_string(),
            },
        }
    }

    pub fn link(title: &str, href_template: &str) -> Self {
        Self {
            title: title.to_string(),
            path: None,
            kind: ColumnKind::Link {
                href_template: href_template.to_string(),
            },
        }
    }

    pub fn sortable(&self) -> bool {
        self.path.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Null,
    Link { label: String, href: String },
}

impl Cell {
    pub fn text(&self) -> &str {
        match self {
            Cell::Text(text) => text,
            Cell::Null => "",
            Cell::Link { label, .. } => label,
        }
    }
}

fn lookup<'a>(row: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(row, |node, segment| node.get(segment))
        .filter(|v| !v.is_null())
}

/// Navigation targets for the page footer; all indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHelper {
    pub first: u64,
    pub previous: u64,
    pub current: u64,
    pub next: u64,
    pub last: u64,
    pub total: u64,
}

impl PageHelper {
    pub fn new(current: u64, total: u64) -> Self {
        let last = total.saturating_sub(1);
        Self {
            first: 0,
            previous: current.saturating_sub(1),
            current,
            next: current.saturating_add(1).min(last),
            last,
            total,
        }
    }
}

#[derive(Debug)]
pub enum TableEvent {
    PageTyped { generation: u64 },
    Fetched { generation: u64, result: Result<ListPage, ClientError> },
}

/// Drives one listing: order, page and the rows currently shown.
///
/// Every change of order or page issues exactly one fetch. Only the reply to
/// the latest fetch is applied.
pub struct TableController {
    resource: Resource,
    columns: Vec<Column>,
    source: Arc<dyn TableSource>,
    debounce: Duration,
    order: OrderSpec,
    page: u64,
    pages: u64,
    rows: Vec<Value>,
    generation: u64,
    in_flight: usize,
    page_input: String,
    page_generation: u64,
    page_timer: DebouncedTask,
    page_pending: bool,
    last_error: Option<ClientError>,
    tx: UnboundedSender<TableEvent>,
    rx: UnboundedReceiver<TableEvent>,
    closed: bool,
}

impl TableController {
    /// Sorts by the first sortable column ascending and fetches page 0.
    pub fn open(resource: Resource, columns: Vec<Column>, source: Arc<dyn TableSource>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut order = OrderSpec::new();
        if let Some(path) = columns.iter().find_map(|c| c.path.as_deref()) {
            order.push(OrderKey::new(path, SortDirection::Asc));
        }
        let mut table = Self {
            resource,
            columns,
            source,
            debounce,
            order,
            page: 0,
            pages: 0,
            rows: Vec::new(),
            generation: 0,
            in_flight: 0,
            page_input: String::new(),
            page_generation: 0,
            page_timer: DebouncedTask::new(),
            page_pending: false,
            last_error: None,
            tx,
            rx,
            closed: false,
        };
        table.fetch();
        table
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn order(&self) -> &OrderSpec {
        &self.order
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn pages(&self) -> u64 {
        self.pages
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    pub fn helper(&self) -> PageHelper {
        PageHelper::new(self.page, self.pages)
    }

    /// Column titles with the direction each is currently sorted in
    pub fn headers(&self) -> Vec<(&str, Option<SortDirection>)> {
        self.columns
            .iter()
            .map(|c| (c.title.as_str(), c.path.as_deref().and_then(|p| self.order.direction(p))))
            .collect()
    }

    fn fetch(&mut self) {
        if self.closed {
            return;
        }
        self.generation += 1;
        self.in_flight += 1;
        let generation = self.generation;
        let source = self.source.clone();
        let resource = self.resource;
        let page = self.page;
        let order = self.order.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = source.list(resource, Some(page), &order).await;
            let _ = tx.send(TableEvent::Fetched { generation, result });
        });
    }

    /// Header click: none, then ascending, then descending, then none again.
    /// A new direction moves the key to the end of the order.
    pub fn toggle(&mut self, path: &str) -> Result<Option<SortDirection>, ClientError> {
        if !self.columns.iter().any(|c| c.path.as_deref() == Some(path)) {
            return Err(ClientError::BadInput(format!("'{}' is not a sortable column", path)));
        }
        let next = match self.order.remove(path) {
            None => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => None,
        };
        if let Some(direction) = next {
            self.order.push(OrderKey::new(path, direction));
        }
        self.fetch();
        Ok(next)
    }

    /// Replaces the whole order at once; unknown paths are rejected.
    pub fn set_order(&mut self, order: OrderSpec) -> Result<(), ClientError> {
        if let Some(key) = order
            .keys()
            .iter()
            .find(|k| !self.columns.iter().any(|c| c.path.as_deref() == Some(k.dotted().as_str())))
        {
            return Err(ClientError::BadInput(format!("'{}' is not a sortable column", key.dotted())));
        }
        if order != self.order {
            self.order = order;
            self.fetch();
        }
        Ok(())
    }

    /// Returns false, without fetching, when `page` is already shown.
    pub fn set_page(&mut self, page: u64) -> bool {
        if page == self.page {
            return false;
        }
        self.page = page;
        self.fetch();
        true
    }

    pub fn first(&mut self) -> bool {
        self.set_page(self.helper().first)
    }

    pub fn previous(&mut self) -> bool {
        self.set_page(self.helper().previous)
    }

    pub fn next(&mut self) -> bool {
        self.set_page(self.helper().next)
    }

    pub fn last(&mut self) -> bool {
        self.set_page(self.helper().last)
    }

    /// Typing in the page box; applied after the debounce delay.
    pub fn type_page(&mut self, raw: &str) {
        self.page_input = raw.to_string();
        self.page_generation += 1;
        self.page_pending = true;
        let generation = self.page_generation;
        let tx = self.tx.clone();
        self.page_timer.schedule(self.debounce, async move {
            let _ = tx.send(TableEvent::PageTyped { generation });
        });
    }

    /// Applies the typed, one-based page number now. Unparseable input is ignored.
    pub fn commit_page_input(&mut self) -> bool {
        self.page_timer.cancel();
        self.page_pending = false;
        match self.page_input.trim().parse::<u64>() {
            Ok(number) if number >= 1 => self.set_page(number - 1),
            _ => {
                tracing::debug!("Ignoring page input '{}'", self.page_input);
                false
            }
        }
    }

    pub fn handle(&mut self, event: TableEvent) {
        if let TableEvent::Fetched { .. } = event {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        if self.closed {
            return;
        }
        match event {
            TableEvent::PageTyped { generation } => {
                if self.page_pending && generation == self.page_generation {
                    self.commit_page_input();
                }
            }
            TableEvent::Fetched { generation, result } => {
                if generation != self.generation {
                    tracing::debug!(
                        "Discarding {} page for generation {} (current {})",
                        self.resource,
                        generation,
                        self.generation
                    );
                    return;
                }
                match result {
                    Ok(page) => {
                        self.rows = page.rows;
                        self.pages = page.pages;
                        self.last_error = None;
                    }
                    Err(e) => {
                        tracing::warn!("Fetching {} failed: {}", self.resource, e);
                        self.last_error = Some(e);
                    }
                }
            }
        }
    }

    pub async fn next_event(&mut self) -> Option<TableEvent> {
        self.rx.recv().await
    }

    /// Processes events until the page box is idle and no fetch is outstanding.
    pub async fn settle(&mut self) {
        while !self.closed && (self.in_flight > 0 || self.page_pending) {
            match self.rx.recv().await {
                Some(event) => self.handle(event),
                None => break,
            }
        }
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.page_timer.cancel();
        self.page_pending = false;
    }

    pub fn render_rows(&self) -> Vec<Vec<Cell>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().map(|column| render_cell(row, column)).collect())
            .collect()
    }
}

fn render_cell(row: &Value, column: &Column) -> Cell {
    match &column.kind {
        ColumnKind::Link { href_template } => {
            let id = row.get("id").map(value_text).unwrap_or_default();
            Cell::Link {
                label: column.title.clone(),
                href: href_template.replace("{id}", &id),
            }
        }
        kind => {
            let Some(value) = column.path.as_deref().and_then(|p| lookup(row, p)) else {
                return Cell::Null;
            };
            let text = value_text(value);
            match kind {
                ColumnKind::Quantity { unit_path } => match lookup(row, unit_path).map(value_text) {
                    Some(unit) => Cell::Text(format!("{} {}", text, unit_label(&unit).unwrap_or(&unit))),
                    None => Cell::Text(text),
                },
                _ => Cell::Text(text),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves 23 products named "p00".."p22", recording every request.
    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<(Option<u64>, Value)>>,
        slow_first: bool,
    }

    #[async_trait]
    impl TableSource for Recorder {
        async fn list(&self, _resource: Resource, page: Option<u64>, order: &OrderSpec) -> Result<ListPage, ClientError> {
            let first = {
                let mut requests = self.requests.lock().unwrap();
                requests.push((page, order.to_json()));
                requests.len() == 1
            };
            if self.slow_first && first {
                tokio::time::sleep(Duration::from_millis(2000)).await;
            }
            let page = page.unwrap_or(0);
            let rows = (page * 10..(page * 10 + 10).min(23))
                .map(|i| json!({"id": i + 1, "name": format!("p{:02}", i), "quantity": 2, "unitOfMeasurement": "GRAMS"}))
                .collect();
            Ok(ListPage { rows, pages: 3 })
        }
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::text("Name", "name"),
            Column::quantity("Quantity", "quantity", "unitOfMeasurement"),
            Column::text("Location", "location.name"),
            Column::link("Edit", "/products/{id}/edit"),
        ]
    }

    fn open(source: Arc<Recorder>) -> TableController {
        TableController::open(Resource::Products, columns(), source, Duration::from_millis(1000))
    }

    #[test]
    fn page_helper_clamps() {
        let helper = PageHelper::new(0, 3);
        assert_eq!((helper.previous, helper.next, helper.last), (0, 1, 2));
        let helper = PageHelper::new(2, 3);
        assert_eq!((helper.previous, helper.next, helper.last), (1, 2, 2));
        let empty = PageHelper::new(0, 0);
        assert_eq!((empty.previous, empty.next, empty.last), (0, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn opens_sorted_by_first_column() {
        let source = Arc::new(Recorder::default());
        let mut table = open(source.clone());
        table.settle().await;

        assert_eq!(
            *source.requests.lock().unwrap(),
            vec![(Some(0), json!([{"name": "asc"}]))]
        );
        assert_eq!(table.rows().len(), 10);
        assert_eq!(table.pages(), 3);
        assert_eq!(table.headers()[0], ("Name", Some(SortDirection::Asc)));
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_cycles_and_moves_key_to_the_end() {
        let source = Arc::new(Recorder::default());
        let mut table = open(source.clone());

        assert_eq!(table.toggle("location.name").unwrap(), Some(SortDirection::Asc));
        assert_eq!(table.toggle("name").unwrap(), Some(SortDirection::Desc));
        assert_eq!(
            table.order().to_json(),
            json!([{"location": {"name": "asc"}}, {"name": "desc"}])
        );
        assert_eq!(table.toggle("name").unwrap(), None);
        assert_eq!(table.order().to_json(), json!([{"location": {"name": "asc"}}]));
        assert!(table.toggle("Edit").is_err());

        table.settle().await;
        // One fetch on open plus one per toggle that succeeded
        assert_eq!(source.requests.lock().unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn three_toggles_return_to_unsorted() {
        let source = Arc::new(Recorder::default());
        let mut table = open(source.clone());

        assert_eq!(table.toggle("quantity").unwrap(), Some(SortDirection::Asc));
        assert_eq!(table.toggle("quantity").unwrap(), Some(SortDirection::Desc));
        assert_eq!(table.toggle("quantity").unwrap(), None);
        assert_eq!(table.order().direction("quantity"), None);
        assert_eq!(table.order().to_json(), json!([{"name": "asc"}]));

        table.settle().await;
        assert_eq!(source.requests.lock().unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn set_order_fetches_once() {
        let source = Arc::new(Recorder::default());
        let mut table = open(source.clone());
        let order: OrderSpec = vec![OrderKey::new("location.name", SortDirection::Desc)].into();
        table.set_order(order.clone()).unwrap();
        table.set_order(order).unwrap();
        assert!(table.set_order(vec![OrderKey::new("id", SortDirection::Asc)].into()).is_err());
        table.settle().await;
        assert_eq!(source.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn same_page_does_not_refetch() {
        let source = Arc::new(Recorder::default());
        let mut table = open(source.clone());
        table.settle().await;

        assert!(!table.set_page(0));
        assert!(!table.first());
        assert!(table.next());
        table.settle().await;
        assert!(table.last());
        table.settle().await;
        assert!(!table.next());

        assert_eq!(table.page(), 2);
        assert_eq!(table.rows().len(), 3);
        assert_eq!(source.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn typed_page_is_debounced_and_one_based() {
        let source = Arc::new(Recorder::default());
        let mut table = open(source.clone());
        table.settle().await;

        table.type_page("2");
        tokio::time::sleep(Duration::from_millis(500)).await;
        table.type_page("3");
        table.settle().await;
        assert_eq!(table.page(), 2);
        assert_eq!(source.requests.lock().unwrap().len(), 2);

        table.type_page("zero");
        assert!(!table.commit_page_input());
        table.type_page("0");
        assert!(!table.commit_page_input());
        assert_eq!(table.page(), 2);

        // Past the end: not an error, just nothing to show
        table.type_page("9");
        assert!(table.commit_page_input());
        table.settle().await;
        assert!(table.rows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_pages_are_discarded() {
        let source = Arc::new(Recorder {
            slow_first: true,
            ..Recorder::default()
        });
        let mut table = open(source.clone());
        table.set_page(1);
        table.settle().await;

        assert_eq!(table.page(), 1);
        assert_eq!(table.rows()[0]["name"], "p10");
    }

    #[tokio::test(start_paused = true)]
    async fn renders_cells() {
        let source = Arc::new(Recorder::default());
        let mut table = open(source);
        table.settle().await;

        let rows = table.render_rows();
        assert_eq!(
            rows[0],
            vec![
                Cell::Text("p00".to_string()),
                Cell::Text("2 g".to_string()),
                Cell::Null,
                Cell::Link {
                    label: "Edit".to_string(),
                    href: "/products/1/edit".to_string()
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn closed_table_stops_fetching() {
        let source = Arc::new(Recorder::default());
        let mut table = open(source.clone());
        table.close();
        assert!(table.set_page(1));
        let event = table.next_event().await.unwrap();
        table.handle(event);
        assert!(table.rows().is_empty());
        assert_eq!(source.requests.lock().unwrap().len(), 1);
    }
}
