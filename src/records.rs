use std::collections::HashMap;

use crate::domain::CvaError;

/// A displayable field value. Every record is a flat mapping of field
/// names to these; the backend never hands us anything deeper.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(String),
    List(Vec<String>),
    Null,
}

impl Value {
    /// Default string form used for rendering and matching.
    /// Null renders empty, lists join their elements.
    pub fn display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Date(s) => s.clone(),
            Value::List(items) => items.join(", "),
            Value::Null => String::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    id: u64,
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new(id: u64) -> Self {
        Record {
            id,
            fields: HashMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    /// Absent fields read as Null; callers never need to distinguish.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&Value::Null)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
}

/// Ordered set of fields a record type can carry, with display labels.
/// The filter engine and table renderer only ever reference fields that
/// are present here.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: Vec<FieldSpec>,
}

impl FieldCatalog {
    pub fn new(specs: &[(&str, &str)]) -> Self {
        FieldCatalog {
            fields: specs
                .iter()
                .map(|(name, label)| FieldSpec {
                    name: name.to_string(),
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn label<'a>(&'a self, field: &'a str) -> &'a str {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.label.as_str())
            .unwrap_or(field)
    }

    pub fn labels(&self) -> HashMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.label.clone()))
            .collect()
    }

    pub fn require(&self, field: &str) -> Result<(), CvaError> {
        if self.contains(field) {
            Ok(())
        } else {
            Err(CvaError::UnknownField(field.to_string()))
        }
    }
}

/// Field catalog for client affiliation records (the customer
/// management page).
pub fn affiliation_catalog() -> FieldCatalog {
    FieldCatalog::new(&[
        ("fullName", "Nombre completo"),
        ("document", "Documento"),
        ("phones", "Telefonos"),
        ("office", "Oficina"),
        ("plan", "Plan"),
        ("value", "Valor"),
        ("startDate", "Fecha de inicio"),
        ("status", "Estado"),
    ])
}

/// Field catalog for unsubscription (termination) records.
pub fn unsubscription_catalog() -> FieldCatalog {
    FieldCatalog::new(&[
        ("fullName", "Nombre completo"),
        ("document", "Documento"),
        ("endDate", "Fecha de retiro"),
        ("value", "Valor"),
        ("paymentStatus", "Estado de pago"),
    ])
}

pub fn catalog_for(dataset: &str) -> Result<FieldCatalog, CvaError> {
    match dataset {
        "affiliations" => Ok(affiliation_catalog()),
        "unsubscriptions" => Ok(unsubscription_catalog()),
        other => Err(CvaError::UnknownDataset(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_displays_as_empty_string() {
        assert_eq!(Value::Null.display(), "");
    }

    #[test]
    fn list_display_joins_elements() {
        let v = Value::List(vec!["3001112222".into(), "3015556666".into()]);
        assert_eq!(v.display(), "3001112222, 3015556666");
    }

    #[test]
    fn whole_numbers_drop_the_fraction() {
        assert_eq!(Value::Number(150000.0).display(), "150000");
        assert_eq!(Value::Number(1.5).display(), "1.5");
    }

    #[test]
    fn absent_field_reads_as_null() {
        let r = Record::new(1).with("fullName", Value::Text("Ana".into()));
        assert!(r.get("phones").is_null());
    }

    #[test]
    fn set_patches_in_place() {
        let mut r = Record::new(7).with("paymentStatus", Value::Text("pendiente".into()));
        r.set("paymentStatus", Value::Text("pagado".into()));
        assert_eq!(r.get("paymentStatus").display(), "pagado");
    }

    #[test]
    fn catalog_labels_and_membership() {
        let cat = affiliation_catalog();
        assert!(cat.contains("phones"));
        assert!(!cat.contains("paymentStatus"));
        assert_eq!(cat.label("value"), "Valor");
        assert!(cat.require("nope").is_err());
    }
}
