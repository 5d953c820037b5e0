use std::sync::Arc;

use anyhow::{anyhow, Context};
use serde_json::{json, Value};

use crate::cli::utils::{format_table, output_success};
use crate::cli::OutputFormat;
use crate::client::views::{form, form_resource, FORMS};
use crate::client::{ApiClient, FieldState, FileStore, Form, FormContext};
use crate::config::config;

fn state_name(state: &FieldState) -> &'static str {
    match state {
        FieldState::Pristine => "pristine",
        FieldState::Validating => "validating",
        FieldState::Valid(_) => "valid",
        FieldState::Invalid(_) => "invalid",
        FieldState::Unreachable => "unreachable",
    }
}

/// Applies `id=value` assignments: selectors are picked, other fields typed then committed.
pub fn apply_assignments(form: &mut Form, assignments: &[String]) -> anyhow::Result<()> {
    for assignment in assignments {
        let (id, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected id=value, got '{}'", assignment))?;
        let is_selector = form
            .field(id)
            .ok_or_else(|| anyhow!("Form '{}' has no field '{}'", form.name(), id))?
            .dropdown()
            .is_some();
        if is_selector {
            form.select(id, value)?;
        } else {
            form.input(id, value)?;
            form.commit(id)?;
        }
    }
    Ok(())
}

pub async fn handle(
    client: Arc<ApiClient>,
    name: &str,
    assignments: &[String],
    record: Option<i64>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let store = Arc::new(FileStore::open(&config().client.selection_store));
    let ctx = FormContext::new(client, store);
    let mut form = form(name, ctx)
        .ok_or_else(|| anyhow!("Unknown form '{}' (expected one of: {})", name, FORMS.join(", ")))?;

    // Prefill first so selectors wait for the record instead of restoring memory
    if let Some(id) = record {
        let resource = form_resource(name).ok_or_else(|| anyhow!("Form '{}' does not edit records", name))?;
        form.prefill(resource, id);
    }
    form.mount();
    form.settle().await;
    if let Some(error) = form.load_error() {
        return Err(error.clone()).context("Failed to load the form");
    }

    apply_assignments(&mut form, assignments)?;
    form.settle().await;

    let submittable = form.is_submittable();
    match output_format {
        OutputFormat::Json => {
            let fields: Vec<Value> = form
                .fields()
                .iter()
                .map(|f| {
                    json!({
                        "id": f.id(),
                        "value": f.raw(),
                        "state": state_name(f.state()),
                        "message": f.render().0,
                    })
                })
                .collect();
            let cascade_error = form.cascade_error().map(|e| e.to_string());
            output_success(
                &output_format,
                &format!("Checked {} form", name),
                Some(json!({
                    "fields": fields,
                    "submittable": submittable,
                    "values": form.values(),
                    "cascade_error": cascade_error,
                })),
            )
        }
        OutputFormat::Text => {
            let headers = ["Field", "Value", "State", "Message"].map(String::from).to_vec();
            let rows: Vec<Vec<String>> = form
                .fields()
                .iter()
                .map(|f| {
                    vec![
                        f.label().to_string(),
                        f.raw().to_string(),
                        state_name(f.state()).to_string(),
                        f.render().0,
                    ]
                })
                .collect();
            println!("{}", format_table(&headers, &rows));
            for section in form.sections() {
                let valid = form.section_valid(&section.title).unwrap_or(false);
                println!("Section {}: {}", section.title, if valid { "complete" } else { "incomplete" });
            }
            if let Some(error) = form.cascade_error() {
                println!("Defaults could not be loaded: {}", error);
            }
            println!("{}", if submittable { "Ready to submit" } else { "Not ready to submit" });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryStore;

    #[tokio::test]
    async fn assignments_need_a_known_field_and_an_equals_sign() {
        let client = Arc::new(ApiClient::new("http://127.0.0.1:9", None).unwrap());
        let mut form = form("password", FormContext::new(client, Arc::new(MemoryStore::new()))).unwrap();

        assert!(apply_assignments(&mut form, &["password".to_string()]).is_err());
        assert!(apply_assignments(&mut form, &["colour=red".to_string()]).is_err());

        apply_assignments(&mut form, &["password=ab12cd34!".to_string()]).unwrap();
        assert_eq!(state_name(form.field("password").unwrap().state()), "valid");
    }
}
