//! Form controller: owns the fields, their debounce timers and every request
//! issued on their behalf. Responses come back through one event channel and
//! are applied by [`Form::handle`], which drops anything stale.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::cascade::{value_text, CascadeBinding};
use super::debounce::DebouncedTask;
use super::dropdown::{Dropdown, OptionSource, SelectOption};
use super::error::ClientError;
use super::field::{Field, Validation};
use super::source::{FeedbackSource, RecordSource, TableSource};
use super::store::KeyValueStore;
use crate::config::config;
use crate::database::Resource;
use crate::filter::{OrderKey, OrderSpec, SortDirection};

/// Collaborators shared by every form of a session
#[derive(Clone)]
pub struct FormContext {
    pub feedback: Arc<dyn FeedbackSource>,
    pub tables: Arc<dyn TableSource>,
    pub records: Arc<dyn RecordSource>,
    pub store: Arc<dyn KeyValueStore>,
    pub debounce: Duration,
}

impl FormContext {
    /// Uses one client for all remote sources and the configured debounce delay.
    pub fn new<C>(client: Arc<C>, store: Arc<dyn KeyValueStore>) -> Self
    where
        C: FeedbackSource + TableSource + RecordSource + 'static,
    {
        Self {
            feedback: client.clone(),
            tables: client.clone(),
            records: client,
            store,
            debounce: Duration::from_millis(config().client.debounce_ms),
        }
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }
}

#[derive(Debug)]
pub enum FormEvent {
    DebounceElapsed {
        field: String,
        generation: u64,
    },
    Feedback {
        field: String,
        generation: u64,
        result: Result<String, ClientError>,
    },
    OptionsLoaded {
        field: String,
        result: Result<Vec<SelectOption>, ClientError>,
    },
    Cascade {
        driver: String,
        driver_generation: u64,
        snapshot: Vec<(String, u64)>,
        result: Result<Map<String, Value>, ClientError>,
    },
    Prefill {
        snapshot: Vec<(String, u64)>,
        result: Result<Value, ClientError>,
    },
}

/// Named group of fields; valid when all of its fields are
#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub fields: Vec<String>,
}

pub struct Form {
    name: String,
    fields: Vec<Field>,
    sections: Vec<Section>,
    cascades: Vec<CascadeBinding>,
    ctx: FormContext,
    timers: HashMap<String, DebouncedTask>,
    pending_debounce: HashMap<String, u64>,
    in_flight: usize,
    tx: UnboundedSender<FormEvent>,
    rx: UnboundedReceiver<FormEvent>,
    cascade_error: Option<ClientError>,
    load_error: Option<ClientError>,
    mounted: bool,
    prefills_pending: usize,
    closed: bool,
}

impl Form {
    pub fn new(name: impl Into<String>, fields: Vec<Field>, ctx: FormContext) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            fields,
            sections: Vec::new(),
            cascades: Vec::new(),
            ctx,
            timers: HashMap::new(),
            pending_debounce: HashMap::new(),
            in_flight: 0,
            tx,
            rx,
            cascade_error: None,
            load_error: None,
            mounted: false,
            prefills_pending: 0,
            closed: false,
        }
    }

    pub fn section(mut self, title: &str, fields: &[&str]) -> Self {
        self.sections.push(Section {
            title: title.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        });
        self
    }

    pub fn cascade(mut self, binding: CascadeBinding) -> Self {
        self.cascades.push(binding);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id() == id)
    }

    pub fn cascade_error(&self) -> Option<&ClientError> {
        self.cascade_error.as_ref()
    }

    pub fn load_error(&self) -> Option<&ClientError> {
        self.load_error.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn index_of(&self, id: &str) -> Result<usize, ClientError> {
        self.fields
            .iter()
            .position(|f| f.id() == id)
            .ok_or_else(|| ClientError::BadInput(format!("Form '{}' has no field '{}'", self.name, id)))
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::BadInput(format!("Form '{}' is closed", self.name)));
        }
        Ok(())
    }

    fn cancel_timer(&mut self, id: &str) {
        if let Some(timer) = self.timers.get_mut(id) {
            timer.cancel();
        }
        self.pending_debounce.remove(id);
    }

    /// Requests option lists for every resource-backed selector.
    pub fn mount(&mut self) {
        self.mounted = true;
        let order: OrderSpec = vec![OrderKey::new("name", SortDirection::Asc)].into();
        for field in &self.fields {
            let Some(OptionSource::Resource { resource, .. }) = field.dropdown().map(Dropdown::source) else {
                continue;
            };
            let resource = *resource;
            let id = field.id().to_string();
            let tables = self.ctx.tables.clone();
            let tx = self.tx.clone();
            let order = order.clone();
            self.in_flight += 1;
            tokio::spawn(async move {
                let result = tables.list(resource, None, &order).await.map(|page| {
                    page.rows.iter().filter_map(SelectOption::from_row).collect::<Vec<_>>()
                });
                let _ = tx.send(FormEvent::OptionsLoaded { field: id, result });
            });
        }

        let fixed: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| matches!(f.dropdown().map(Dropdown::source), Some(OptionSource::Fixed)))
            .map(|(i, _)| i)
            .collect();
        for index in fixed {
            self.restore_selection(index);
        }
    }

    /// Loads an existing record into the form, as when editing. Fields edited
    /// before the record arrives keep their values. Selectors are not restored
    /// from memory until the record has been applied.
    pub fn prefill(&mut self, resource: Resource, id: i64) {
        let snapshot = self.generations(self.fields.iter().map(Field::id));
        let records = self.ctx.records.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        self.prefills_pending += 1;
        tokio::spawn(async move {
            let result = records.record(resource, id).await;
            let _ = tx.send(FormEvent::Prefill { snapshot, result });
        });
    }

    fn generations<'a>(&self, ids: impl Iterator<Item = &'a str>) -> Vec<(String, u64)> {
        ids.filter_map(|id| self.field(id).map(|f| (id.to_string(), f.generation())))
            .collect()
    }

    /// Raw keystrokes; validation runs once the debounce delay passes quietly.
    pub fn input(&mut self, id: &str, raw: &str) -> Result<u64, ClientError> {
        self.ensure_open()?;
        let index = self.index_of(id)?;
        let generation = self.fields[index].input(raw);
        if self.fields[index].is_valid() {
            self.cancel_timer(id);
            return Ok(generation);
        }

        let tx = self.tx.clone();
        let field = id.to_string();
        self.timers
            .entry(field.clone())
            .or_default()
            .schedule(self.ctx.debounce, async move {
                let _ = tx.send(FormEvent::DebounceElapsed { field, generation });
            });
        self.pending_debounce.insert(id.to_string(), generation);
        Ok(generation)
    }

    /// Focus loss or change: validate right away.
    pub fn commit(&mut self, id: &str) -> Result<(), ClientError> {
        self.ensure_open()?;
        let index = self.index_of(id)?;
        self.cancel_timer(id);
        self.run_validation(index);
        Ok(())
    }

    /// Picks a dropdown option, remembers it and fires the field's cascades.
    pub fn select(&mut self, id: &str, value: &str) -> Result<(), ClientError> {
        self.ensure_open()?;
        let index = self.index_of(id)?;
        if self.fields[index].dropdown().is_none() {
            return Err(ClientError::BadInput(format!("'{}' is not a selector", id)));
        }
        self.choose(index, value);
        Ok(())
    }

    /// Loads a server-provided value into a field and fires its cascades.
    pub fn precompile(&mut self, id: &str, value: &str) -> Result<(), ClientError> {
        self.ensure_open()?;
        let index = self.index_of(id)?;
        self.cancel_timer(id);
        self.fields[index].precompile(value);
        self.trigger_cascades(index);
        Ok(())
    }

    fn choose(&mut self, index: usize, value: &str) {
        let id = self.fields[index].id().to_string();
        self.cancel_timer(&id);
        self.fields[index].input(value);
        self.fields[index].validate();
        Dropdown::remember(self.ctx.store.as_ref(), &id, value);
        self.trigger_cascades(index);
    }

    fn restore_selection(&mut self, index: usize) {
        if self.prefills_pending > 0 {
            return;
        }
        let field = &self.fields[index];
        let Some(dropdown) = field.dropdown() else {
            return;
        };
        let current = Some(field.raw()).filter(|raw| !raw.is_empty());
        match dropdown.restore(self.ctx.store.as_ref(), field.id(), current) {
            Some(value) if Some(value.as_str()) != current => {
                self.choose(index, &value);
            }
            Some(_) => {
                self.fields[index].validate();
            }
            None => {}
        }
    }

    fn run_validation(&mut self, index: usize) {
        let Validation::Remote(request) = self.fields[index].validate() else {
            return;
        };
        let feedback = self.ctx.feedback.clone();
        let tx = self.tx.clone();
        let field = self.fields[index].id().to_string();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = feedback.feedback(&request.endpoint, &request.param, &request.value).await;
            let _ = tx.send(FormEvent::Feedback {
                field,
                generation: request.generation,
                result,
            });
        });
    }

    fn trigger_cascades(&mut self, index: usize) {
        let driver = self.fields[index].id().to_string();
        let driver_generation = self.fields[index].generation();
        let driver_value = self.fields[index].raw().to_string();

        let bindings: Vec<CascadeBinding> = self.cascades.iter().filter(|b| b.driver == driver).cloned().collect();
        for binding in bindings {
            let snapshot = self.generations(binding.targets.iter().map(String::as_str));
            let tx = self.tx.clone();
            let driver = driver.clone();
            let value = driver_value.clone();
            self.in_flight += 1;
            tokio::spawn(async move {
                let result = binding.resolver.resolve(&value).await;
                let _ = tx.send(FormEvent::Cascade {
                    driver,
                    driver_generation,
                    snapshot,
                    result,
                });
            });
        }
    }

    /// Applies one event. Events arriving after [`Form::close`] are dropped.
    pub fn handle(&mut self, event: FormEvent) {
        if !matches!(event, FormEvent::DebounceElapsed { .. }) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        if matches!(event, FormEvent::Prefill { .. }) {
            self.prefills_pending = self.prefills_pending.saturating_sub(1);
        }
        if self.closed {
            tracing::debug!("Form '{}' is closed, dropping {:?}", self.name, event);
            return;
        }

        match event {
            FormEvent::DebounceElapsed { field, generation } => {
                if self.pending_debounce.get(&field) != Some(&generation) {
                    return;
                }
                self.pending_debounce.remove(&field);
                if let Ok(index) = self.index_of(&field) {
                    if self.fields[index].generation() == generation {
                        self.run_validation(index);
                    }
                }
            }
            FormEvent::Feedback {
                field,
                generation,
                result,
            } => {
                if let Ok(index) = self.index_of(&field) {
                    self.fields[index].apply_feedback(generation, result);
                }
            }
            FormEvent::OptionsLoaded { field, result } => {
                let Ok(index) = self.index_of(&field) else {
                    return;
                };
                match result {
                    Ok(options) => {
                        let noun = self.fields[index].noun_text().to_string();
                        if let Some(dropdown) = self.fields[index].dropdown_mut() {
                            dropdown.load(options, &noun);
                        }
                        self.restore_selection(index);
                    }
                    Err(e) => {
                        tracing::warn!("Loading options for {} failed: {}", field, e);
                        self.load_error = Some(e);
                    }
                }
            }
            FormEvent::Cascade {
                driver,
                driver_generation,
                snapshot,
                result,
            } => self.apply_cascade(&driver, driver_generation, snapshot, result),
            FormEvent::Prefill { snapshot, result } => {
                match result {
                    Ok(record) => self.apply_prefill(snapshot, &record),
                    Err(e) => {
                        tracing::warn!("Prefilling form '{}' failed: {}", self.name, e);
                        self.load_error = Some(e);
                    }
                }
                if self.mounted && self.prefills_pending == 0 {
                    for index in 0..self.fields.len() {
                        self.restore_selection(index);
                    }
                }
            }
        }
    }

    fn apply_cascade(
        &mut self,
        driver: &str,
        driver_generation: u64,
        snapshot: Vec<(String, u64)>,
        result: Result<Map<String, Value>, ClientError>,
    ) {
        let current = self.field(driver).map(Field::generation);
        if current != Some(driver_generation) {
            tracing::debug!("Dropping cascade for superseded value of {}", driver);
            return;
        }
        let values = match result {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("Cascade from {} failed: {}", driver, e);
                self.cascade_error = Some(e);
                return;
            }
        };
        self.cascade_error = None;

        for (target, generation) in snapshot {
            let Some(value) = values.get(&target) else {
                continue;
            };
            let Ok(index) = self.index_of(&target) else {
                continue;
            };
            if self.fields[index].generation() != generation {
                tracing::debug!("{} changed since the cascade from {} was issued", target, driver);
                continue;
            }
            self.cancel_timer(&target);
            self.fields[index].precompile(value_text(value));
        }
    }

    fn apply_prefill(&mut self, snapshot: Vec<(String, u64)>, record: &Value) {
        let Some(record) = record.as_object() else {
            self.load_error = Some(ClientError::Decode("record is not an object".to_string()));
            return;
        };
        for (id, generation) in snapshot {
            let Some(value) = record.get(&id).filter(|v| !v.is_null()) else {
                continue;
            };
            let Ok(index) = self.index_of(&id) else {
                continue;
            };
            if self.fields[index].generation() != generation {
                tracing::debug!("{} was edited before the record arrived, keeping it", id);
                continue;
            }
            self.cancel_timer(&id);
            self.fields[index].precompile(value_text(value));
        }
    }

    pub async fn next_event(&mut self) -> Option<FormEvent> {
        self.rx.recv().await
    }

    /// Processes events until no timer or request is outstanding.
    pub async fn settle(&mut self) {
        while !self.closed && (self.in_flight > 0 || !self.pending_debounce.is_empty()) {
            match self.rx.recv().await {
                Some(event) => self.handle(event),
                None => break,
            }
        }
    }

    pub fn is_submittable(&self) -> bool {
        !self.closed && self.fields.iter().all(Field::is_valid)
    }

    pub fn section_valid(&self, title: &str) -> Option<bool> {
        let section = self.sections.iter().find(|s| s.title == title)?;
        Some(
            section
                .fields
                .iter()
                .all(|id| self.field(id).map_or(false, Field::is_valid)),
        )
    }

    /// Submission body: every valid field keyed by id.
    pub fn values(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|f| f.value().map(|v| (f.id().to_string(), v.to_json())))
            .collect()
    }

    /// Cancels timers; responses still in flight are ignored.
    pub fn close(&mut self) {
        self.closed = true;
        for timer in self.timers.values_mut() {
            timer.cancel();
        }
        self.pending_debounce.clear();
    }
}

impl Drop for Form {
    fn drop(&mut self) {
        self.close();
    }
}
