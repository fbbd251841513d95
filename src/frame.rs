use serde::{Deserialize, Serialize};

/// One typed cell in a tabular result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the cell; `Text` and `Null` yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Cursor tokens are opaque text, but some sources return them as
    /// integers; stringify those rather than dropping them.
    pub fn as_cursor_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Int(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A named column of typed values, with optional display annotations.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            unit: None,
            values,
        }
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Tabular result: named columns of typed values. Lookup is by name only;
/// column order carries no meaning.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub columns: Vec<Column>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Row count, taken as the longest column. Ragged frames are tolerated;
    /// short columns read as absent cells.
    pub fn rows(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
    }

    pub fn cell(&self, name: &str, row: usize) -> Option<&Value> {
        self.column(name).and_then(|c| c.values.get(row))
    }
}

/// One response unit from the remote source: a primary record frame plus
/// optional scan metadata (next cursor, per-page work count).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub data: Frame,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Frame>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup_by_name() {
        let frame = Frame::new()
            .with_column(Column::new("key", vec![Value::Text("a".into())]))
            .with_column(Column::new("metric", vec![Value::Int(7)]));
        assert_eq!(frame.rows(), 1);
        assert_eq!(frame.cell("metric", 0).and_then(Value::as_f64), Some(7.0));
        assert!(frame.column("missing").is_none());
    }

    #[test]
    fn ragged_frame_reads_short_columns_as_absent() {
        let frame = Frame::new()
            .with_column(Column::new(
                "key",
                vec![Value::Text("a".into()), Value::Text("b".into())],
            ))
            .with_column(Column::new("metric", vec![Value::Int(1)]));
        assert_eq!(frame.rows(), 2);
        assert!(frame.cell("metric", 1).is_none());
    }

    #[test]
    fn cursor_text_from_int_cell() {
        assert_eq!(Value::Int(42).as_cursor_text().as_deref(), Some("42"));
        assert_eq!(Value::Text("7c".into()).as_cursor_text().as_deref(), Some("7c"));
        assert_eq!(Value::Null.as_cursor_text(), None);
    }
}
