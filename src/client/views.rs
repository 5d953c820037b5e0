//! Table layouts and form definitions for each resource.

use std::sync::Arc;

use super::cascade::{CascadeBinding, RecordDefaults};
use super::dropdown::{unit_options, Dropdown};
use super::field::{Field, FieldKind};
use super::form::{Form, FormContext};
use super::table::Column;
use crate::database::Resource;

pub const FORMS: [&str; 6] = ["location", "category", "product", "stock", "book", "password"];

pub fn table_columns(resource: Resource) -> Vec<Column> {
    let edit = Column::link("Edit", &format!("/{}/{{id}}/edit", resource));
    let delete = Column::link("Delete", &format!("/{}/{{id}}/delete", resource));
    match resource {
        Resource::Locations => vec![Column::text("Name", "name"), edit],
        Resource::Categories => vec![
            Column::text("Name", "name"),
            Column::text("Default Location", "defaultLocation.name"),
            edit,
        ],
        Resource::Products => vec![
            Column::text("Name", "name"),
            Column::quantity("Default Quantity", "defaultQuantity", "defaultUnitOfMeasurement"),
            Column::text("Default Location", "defaultLocation.name"),
            edit,
        ],
        Resource::Stocks => vec![
            Column::text("Expiration", "expiration"),
            Column::text("Product", "product.name"),
            Column::quantity("Quantity", "quantity", "unitOfMeasurement"),
            Column::text("Location", "location.name"),
            edit,
            delete,
        ],
        Resource::Books => vec![
            Column::text("Category", "category.name"),
            Column::text("Title", "title"),
            Column::text("Location", "location.name"),
            edit,
            delete,
        ],
    }
}

/// Resource a form edits, if any
pub fn form_resource(name: &str) -> Option<Resource> {
    match name {
        "location" => Some(Resource::Locations),
        "category" => Some(Resource::Categories),
        "product" => Some(Resource::Products),
        "stock" => Some(Resource::Stocks),
        "book" => Some(Resource::Books),
        _ => None,
    }
}

fn name_field(resource: Resource) -> Field {
    Field::new(
        "name",
        "Name",
        FieldKind::Remote {
            endpoint: format!("/api/feedbacks/{}-name", resource.singular()),
        },
    )
}

fn picker(id: &str, label: &str, noun: &str, resource: Resource) -> Field {
    let dropdown = Dropdown::remote(resource, format!("/{}/create", resource));
    Field::new(id, label, FieldKind::Select(dropdown)).noun(noun)
}

fn units(id: &str, label: &str) -> Field {
    Field::new(id, label, FieldKind::Select(Dropdown::fixed(unit_options()))).noun("Unit of Measurement")
}

pub fn form(name: &str, ctx: FormContext) -> Option<Form> {
    let form = match name {
        "location" => Form::new(name, vec![name_field(Resource::Locations)], ctx),
        "category" => Form::new(
            name,
            vec![
                name_field(Resource::Categories),
                picker("defaultLocationId", "Default Location", "Location", Resource::Locations),
            ],
            ctx,
        ),
        "product" => Form::new(
            name,
            vec![
                name_field(Resource::Products),
                Field::new("defaultQuantity", "Default Quantity", FieldKind::Quantity),
                units("defaultUnitOfMeasurement", "Default Unit of Measurement"),
                picker("defaultLocationId", "Default Location", "Location", Resource::Locations),
            ],
            ctx,
        ),
        "stock" => {
            let defaults = RecordDefaults::new(
                ctx.records.clone(),
                Resource::Products,
                &[
                    ("defaultQuantity", "quantity"),
                    ("defaultUnitOfMeasurement", "unitOfMeasurement"),
                    ("defaultLocationId", "locationId"),
                ],
            );
            let targets = defaults.targets();
            Form::new(
                name,
                vec![
                    Field::new("expiration", "Expiration", FieldKind::Date),
                    picker("productId", "Product", "Product", Resource::Products),
                    Field::new("quantity", "Quantity", FieldKind::Quantity),
                    units("unitOfMeasurement", "Unit of Measurement"),
                    picker("locationId", "Location", "Location", Resource::Locations),
                ],
                ctx,
            )
            .section("Product", &["expiration", "productId"])
            .section("Amount", &["quantity", "unitOfMeasurement"])
            .section("Storage", &["locationId"])
            .cascade(CascadeBinding {
                driver: "productId".to_string(),
                targets,
                resolver: Arc::new(defaults),
            })
        }
        "book" => {
            let defaults = RecordDefaults::new(
                ctx.records.clone(),
                Resource::Categories,
                &[("defaultLocationId", "locationId")],
            );
            let targets = defaults.targets();
            Form::new(
                name,
                vec![
                    picker("categoryId", "Category", "Category", Resource::Categories),
                    Field::new("title", "Title", FieldKind::Text { min: 1, max: 32 }),
                    picker("locationId", "Location", "Location", Resource::Locations),
                ],
                ctx,
            )
            .cascade(CascadeBinding {
                driver: "categoryId".to_string(),
                targets,
                resolver: Arc::new(defaults),
            })
        }
        "password" => Form::new(name, vec![Field::new("password", "Password", FieldKind::Password)], ctx),
        _ => return None,
    };
    Some(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::dropdown::OptionSource;

    #[test]
    fn sortable_columns_exist_on_the_server() {
        for resource in Resource::ALL {
            for column in table_columns(resource) {
                if let Some(path) = &column.path {
                    assert!(
                        resource.def().column(path).is_some(),
                        "{} cannot sort by {}",
                        resource,
                        path
                    );
                }
            }
        }
    }

    #[test]
    fn link_columns_point_at_rows() {
        let columns = table_columns(Resource::Stocks);
        let hrefs: Vec<_> = columns.iter().filter(|c| !c.sortable()).map(|c| c.kind.clone()).collect();
        assert_eq!(hrefs.len(), 2);
        assert_eq!(
            hrefs[0],
            crate::client::table::ColumnKind::Link {
                href_template: "/stocks/{id}/edit".to_string()
            }
        );
    }

    #[tokio::test]
    async fn every_form_builds() {
        let store = Arc::new(crate::client::store::MemoryStore::new());
        let client = Arc::new(crate::client::api::ApiClient::new("http://127.0.0.1:3000", None).unwrap());
        for name in FORMS {
            let form = form(name, FormContext::new(client.clone(), store.clone())).unwrap();
            assert!(!form.fields().is_empty());
            for field in form.fields() {
                if let Some(OptionSource::Resource { create_href, .. }) = field.dropdown().map(|d| d.source()) {
                    assert!(create_href.ends_with("/create"));
                }
            }
        }
        assert!(form("nothing", FormContext::new(client, store)).is_none());
    }
}
