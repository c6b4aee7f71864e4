use crate::prelude::*;

/// Trim every non-null String cell in the model; a value that trims down to
/// nothing becomes Null rather than an empty string. Idempotent.
pub fn trim_strings(model: &mut Model) {
    for table in model.tables_mut() {
        let string_columns: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.column_type == ColumnType::String)
            .map(|c| c.name.clone())
            .collect();

        for row in &mut table.rows {
            for column in &string_columns {
                let replacement = match row.get(column.as_str()) {
                    Some(Value::Text(text)) => {
                        let trimmed = text.trim();
                        if trimmed.is_empty() {
                            Some(Value::Null)
                        } else if trimmed.len() != text.len() {
                            Some(Value::Text(trimmed.to_string()))
                        } else {
                            None
                        }
                    }
                    _ => None,
                };
                if let Some(value) = replacement {
                    row.insert(column.clone(), value);
                }
            }
        }
    }
}
