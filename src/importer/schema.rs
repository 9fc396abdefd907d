//! Column mapping: which CSV columns feed which fields, and how they are
//! converted and checked.

use std::collections::HashMap;
use csv::StringRecord;
use super::{ImportError, RowError};
use crate::sock::{MAX_COTTON, MAX_QUANTITY, MIN_COTTON, MIN_MOVEMENT};

/// Target type of a field, with its range constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text; blank values count as missing
    Text,
    /// Signed integer, optionally bounded (inclusive)
    Integer { min: Option<i64>, max: Option<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(column: &str, kind: FieldKind) -> Self {
        Self { column: column.to_string(), kind, required: true }
    }

    pub fn optional(column: &str, kind: FieldKind) -> Self {
        Self { column: column.to_string(), kind, required: false }
    }

    fn convert(&self, raw: &str) -> Result<Value, String> {
        match self.kind {
            FieldKind::Text => Ok(Value::Text(raw.to_string())),
            FieldKind::Integer { min, max } => {
                let value: i64 = raw
                    .parse()
                    .map_err(|_| format!("'{}' is not a valid integer", raw))?;
                if let Some(min) = min {
                    if value < min {
                        return Err(format!("value {} is less than minimum {}", value, min));
                    }
                }
                if let Some(max) = max {
                    if value > max {
                        return Err(format!("value {} is greater than maximum {}", value, max));
                    }
                }
                Ok(Value::Integer(value))
            }
        }
    }
}

/// A converted field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Integer(i64),
}

/// One validated row, keyed by field column name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRow {
    pub row: usize,
    values: HashMap<String, Value>,
}

impl ParsedRow {
    pub fn text(&self, column: &str) -> Option<&str> {
        match self.values.get(column) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        match self.values.get(column) {
            Some(Value::Integer(n)) => Some(*n),
            _ => None,
        }
    }
}

/// Ordered set of fields expected in an input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSchema {
    fields: Vec<FieldSpec>,
}

impl ImportSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Resolve a header record against this schema.
    ///
    /// Column names are matched case-insensitively. Duplicate names and
    /// absent required columns are fatal; unknown columns are ignored.
    pub fn bind(&self, header: &StringRecord) -> Result<ColumnBinding, ImportError> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (index, name) in header.iter().enumerate() {
            let key = name.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if seen.insert(key, index).is_some() {
                return Err(ImportError::DuplicateColumn(name.trim().to_string()));
            }
        }

        let mut slots = Vec::with_capacity(self.fields.len());
        for (field_index, field) in self.fields.iter().enumerate() {
            match seen.remove(&field.column.to_lowercase()) {
                Some(csv_index) => slots.push(Slot { csv_index, field_index }),
                None if field.required => {
                    return Err(ImportError::MissingColumn(field.column.clone()));
                }
                None => {}
            }
        }

        let mut ignored: Vec<(usize, String)> = seen.into_iter().map(|(name, i)| (i, name)).collect();
        ignored.sort();

        Ok(ColumnBinding {
            width: header.len(),
            slots,
            ignored: ignored.into_iter().map(|(_, name)| name).collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    csv_index: usize,
    field_index: usize,
}

/// A schema bound to the column positions of one particular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    width: usize,
    slots: Vec<Slot>,
    ignored: Vec<String>,
}

impl ColumnBinding {
    /// Number of fields every row must carry
    pub fn width(&self) -> usize {
        self.width
    }

    /// Header columns no field maps to
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    /// Convert and validate one record. All problems of the row are returned.
    pub fn parse(
        &self,
        schema: &ImportSchema,
        row: usize,
        record: &StringRecord,
    ) -> Result<ParsedRow, Vec<RowError>> {
        if record.len() != self.width {
            return Err(vec![RowError::new(
                row,
                None,
                format!("expected {} fields, found {}", self.width, record.len()),
            )]);
        }

        let mut parsed = ParsedRow { row, values: HashMap::new() };
        let mut errors = Vec::new();

        for slot in &self.slots {
            let field = &schema.fields[slot.field_index];
            let raw = record.get(slot.csv_index).unwrap_or("").trim();

            if raw.is_empty() {
                if field.required {
                    errors.push(RowError::new(row, Some(&field.column), "missing required value"));
                }
                continue;
            }

            match field.convert(raw) {
                Ok(value) => {
                    parsed.values.insert(field.column.clone(), value);
                }
                Err(reason) => errors.push(RowError::new(row, Some(&field.column), reason)),
            }
        }

        if errors.is_empty() { Ok(parsed) } else { Err(errors) }
    }
}

/// Column mapping of the stock import file
pub fn sock_schema() -> ImportSchema {
    ImportSchema::new(vec![
        FieldSpec::required("color", FieldKind::Text),
        FieldSpec::required(
            "cottonPercentage",
            FieldKind::Integer { min: Some(MIN_COTTON), max: Some(MAX_COTTON) },
        ),
        FieldSpec::required(
            "quantity",
            FieldKind::Integer { min: Some(MIN_MOVEMENT), max: Some(MAX_QUANTITY) },
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> StringRecord {
        StringRecord::from(names.to_vec())
    }

    #[test]
    fn test_bind_is_case_insensitive_and_ignores_extras() {
        let schema = sock_schema();
        let binding = schema
            .bind(&header(&["Quantity", "note", "COLOR", "cottonpercentage"]))
            .unwrap();
        assert_eq!(binding.width(), 4);
        assert_eq!(binding.ignored(), &["note".to_string()]);

        let parsed = binding
            .parse(&schema, 1, &header(&["7", "gift", "red", "80"]))
            .unwrap();
        assert_eq!(parsed.text("color"), Some("red"));
        assert_eq!(parsed.integer("cottonPercentage"), Some(80));
        assert_eq!(parsed.integer("quantity"), Some(7));
    }

    #[test]
    fn test_bind_rejects_duplicates() {
        let err = sock_schema()
            .bind(&header(&["color", "cottonPercentage", "Color", "quantity"]))
            .unwrap_err();
        assert!(matches!(err, ImportError::DuplicateColumn(name) if name == "Color"));
    }

    #[test]
    fn test_bind_requires_columns() {
        let err = sock_schema().bind(&header(&["color", "quantity"])).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(name) if name == "cottonPercentage"));
    }

    #[test]
    fn test_parse_reports_each_bad_field() {
        let schema = sock_schema();
        let binding = schema.bind(&header(&["color", "cottonPercentage", "quantity"])).unwrap();

        let errors = binding
            .parse(&schema, 3, &header(&["", "abc", "0"]))
            .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.row == 3));
        assert_eq!(errors[0].column.as_deref(), Some("color"));
        assert_eq!(errors[1].reason, "'abc' is not a valid integer");
        assert_eq!(errors[2].reason, "value 0 is less than minimum 1");
    }

    #[test]
    fn test_optional_field_may_be_blank() {
        let schema = ImportSchema::new(vec![
            FieldSpec::required("color", FieldKind::Text),
            FieldSpec::optional("note", FieldKind::Text),
        ]);
        let binding = schema.bind(&header(&["color", "note"])).unwrap();
        let parsed = binding.parse(&schema, 1, &header(&["red", ""])).unwrap();
        assert_eq!(parsed.text("note"), None);
        assert_eq!(parsed.text("color"), Some("red"));
    }

    #[test]
    fn test_field_count_mismatch() {
        let schema = sock_schema();
        let binding = schema.bind(&header(&["color", "cottonPercentage", "quantity"])).unwrap();
        let errors = binding.parse(&schema, 2, &header(&["red", "40"])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column, None);
    }
}
