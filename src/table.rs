use crate::frame::{Column, Frame, Value};
use crate::types::ScanRecord;

/// Project the current record set back into tabular form for rendering and
/// sorting. Pure; an empty record list produces an empty three-column frame.
pub fn to_table(records: &[ScanRecord]) -> Frame {
    let mut keys = Vec::with_capacity(records.len());
    let mut kinds = Vec::with_capacity(records.len());
    let mut metrics = Vec::with_capacity(records.len());
    for record in records {
        keys.push(Value::Text(record.key.clone()));
        kinds.push(match &record.kind {
            Some(kind) => Value::Text(kind.clone()),
            None => Value::Null,
        });
        metrics.push(match record.metric {
            Some(metric) => Value::Float(metric),
            None => Value::Null,
        });
    }

    Frame::new()
        .with_column(Column::new("key", keys).display_name("Key"))
        .with_column(Column::new("type", kinds).display_name("Type"))
        .with_column(
            Column::new("metric", metrics)
                .display_name("Memory")
                .unit("bytes"),
        )
}
