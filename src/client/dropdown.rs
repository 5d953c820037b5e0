use serde_json::Value;

use super::store::KeyValueStore;
use crate::database::Resource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// `{"id": 3, "name": "Fridge"}` => option `3` labelled `Fridge`
    pub fn from_row(row: &Value) -> Option<Self> {
        let value = match row.get("id")? {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            _ => return None,
        };
        let label = row.get("name").and_then(Value::as_str).unwrap_or(&value).to_string();
        Some(Self { value, label })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionSource {
    Fixed,
    /// Options are the caller's rows of `resource`, sorted by name
    Resource { resource: Resource, create_href: String },
}

/// What the widget shows in place of the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectAffordance {
    Loading,
    Selector,
    CreateNew { href: String, label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropdown {
    source: OptionSource,
    options: Vec<SelectOption>,
    affordance: SelectAffordance,
}

/// Units of measurement as stored, with their short labels
pub const UNITS: [(&str, &str); 3] = [("PIECES", "pcs"), ("GRAMS", "g"), ("MILLILITERS", "ml")];

pub fn unit_options() -> Vec<SelectOption> {
    UNITS.iter().map(|(value, label)| SelectOption::new(*value, *label)).collect()
}

pub fn unit_label(value: &str) -> Option<&'static str> {
    UNITS.iter().find(|(v, _)| *v == value).map(|(_, label)| *label)
}

/// Store key under which a field's last choice is remembered
pub fn selection_key(field_id: &str) -> String {
    format!("{}-select", field_id)
}

impl Dropdown {
    pub fn fixed(options: Vec<SelectOption>) -> Self {
        Self {
            source: OptionSource::Fixed,
            options,
            affordance: SelectAffordance::Selector,
        }
    }

    pub fn remote(resource: Resource, create_href: impl Into<String>) -> Self {
        Self {
            source: OptionSource::Resource {
                resource,
                create_href: create_href.into(),
            },
            options: Vec::new(),
            affordance: SelectAffordance::Loading,
        }
    }

    pub fn source(&self) -> &OptionSource {
        &self.source
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn affordance(&self) -> &SelectAffordance {
        &self.affordance
    }

    pub fn contains(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    pub fn label_of(&self, value: &str) -> Option<&str> {
        self.options.iter().find(|o| o.value == value).map(|o| o.label.as_str())
    }

    /// Installs a loaded option list. An empty list switches to the "create new"
    /// affordance labelled after `noun`.
    pub fn load(&mut self, options: Vec<SelectOption>, noun: &str) {
        self.affordance = match (&self.source, options.is_empty()) {
            (OptionSource::Resource { create_href, .. }, true) => SelectAffordance::CreateNew {
                href: create_href.clone(),
                label: format!("Create {}", noun),
            },
            _ => SelectAffordance::Selector,
        };
        self.options = options;
    }

    /// Picks the value to show after mounting: `current` if it is an option, else the
    /// remembered choice if it is still an option, else the first option.
    pub fn restore(&self, store: &dyn KeyValueStore, field_id: &str, current: Option<&str>) -> Option<String> {
        if let Some(current) = current.filter(|v| self.contains(v)) {
            return Some(current.to_string());
        }
        if let Some(remembered) = store.get(&selection_key(field_id)).filter(|v| self.contains(v)) {
            return Some(remembered);
        }
        self.options.first().map(|o| o.value.clone())
    }

    pub fn remember(store: &dyn KeyValueStore, field_id: &str, value: &str) {
        store.set(&selection_key(field_id), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::store::MemoryStore;
    use serde_json::json;

    fn locations() -> Vec<SelectOption> {
        vec![SelectOption::new("4", "Bookshelf"), SelectOption::new("2", "Fridge")]
    }

    #[test]
    fn restores_remembered_choice_then_first_option() {
        let store = MemoryStore::new();
        let mut dropdown = Dropdown::remote(Resource::Locations, "/locations/create");
        dropdown.load(locations(), "Location");

        assert_eq!(dropdown.restore(&store, "locationId", None).as_deref(), Some("4"));

        Dropdown::remember(&store, "locationId", "2");
        assert_eq!(store.get("locationId-select").as_deref(), Some("2"));
        assert_eq!(dropdown.restore(&store, "locationId", None).as_deref(), Some("2"));

        // A prefilled value wins over the remembered one
        assert_eq!(dropdown.restore(&store, "locationId", Some("4")).as_deref(), Some("4"));

        // A remembered value that no longer exists falls back to the first option
        Dropdown::remember(&store, "locationId", "99");
        assert_eq!(dropdown.restore(&store, "locationId", None).as_deref(), Some("4"));
    }

    #[test]
    fn empty_option_list_offers_create_new() {
        let store = MemoryStore::new();
        let mut dropdown = Dropdown::remote(Resource::Locations, "/locations/create");
        assert_eq!(dropdown.affordance(), &SelectAffordance::Loading);

        dropdown.load(Vec::new(), "Location");
        assert_eq!(
            dropdown.affordance(),
            &SelectAffordance::CreateNew {
                href: "/locations/create".to_string(),
                label: "Create Location".to_string()
            }
        );
        assert_eq!(dropdown.restore(&store, "locationId", None), None);
    }

    #[test]
    fn options_from_rows() {
        assert_eq!(
            SelectOption::from_row(&json!({"id": 3, "name": "Freezer"})),
            Some(SelectOption::new("3", "Freezer"))
        );
        assert_eq!(SelectOption::from_row(&json!({"name": "orphan"})), None);
    }
}
