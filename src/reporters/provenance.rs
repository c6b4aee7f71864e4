use crate::prelude::*;

/// Accumulates one flat summary row per imported file for reporting and
/// auditing. Not key-linked to the per-file models, so it needs none of the
/// merge engine's offset logic.
#[derive(Debug, Clone)]
pub struct ProvenanceCollector {
    table: Table,
}

impl Default for ProvenanceCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvenanceCollector {
    pub fn new() -> Self {
        let mut table = Table::new("report");
        table.add_column(Column::string("category"));
        table.add_column(Column::string("filename"));
        table.add_column(Column::string("file_version"));
        Self { table }
    }

    /// Record one file: the three fixed columns plus a copy of every non-key
    /// column on the file's hoisted root row. Summary columns are added on
    /// demand, so the table ends up with the union of columns seen across
    /// all files.
    pub fn record(
        &mut self,
        category: &str,
        filename: &str,
        file_version: &str,
        root: &Table,
    ) -> ForgeResult<()> {
        let root_row = root.rows.first().ok_or_else(|| ForgeError::StructuralAssumption {
            path: filename.to_string(),
            expected: format!("one '{}' row", root.name),
            found: "0 rows".to_string(),
            suggestion: "Hoist the header before recording provenance".to_string(),
        })?;

        for column in &root.columns {
            if column.is_key() {
                continue;
            }
            self.table.add_column(column.clone());
        }

        let mut row = Row::new();
        row.insert("category".to_string(), Value::Text(category.to_string()));
        row.insert("filename".to_string(), Value::Text(filename.to_string()));
        row.insert("file_version".to_string(), Value::Text(file_version.to_string()));
        for column in &root.columns {
            if column.is_key() {
                continue;
            }
            if let Some(value) = root_row.get(&column.name) {
                row.insert(column.name.clone(), value.clone());
            }
        }
        self.table.append_row(row);

        Ok(())
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// Render the summary as a JSON array of objects, one per file, columns
    /// in table order. Used by the report writer.
    pub fn to_json(&self) -> JsonValue {
        let rows: Vec<JsonValue> = self
            .table
            .rows
            .iter()
            .map(|row| {
                let mut object = serde_json::Map::new();
                for column in &self.table.columns {
                    let value = match row.get(&column.name) {
                        Some(Value::Text(s)) => json!(s),
                        Some(Value::Integer(n)) => json!(n),
                        _ => JsonValue::Null,
                    };
                    object.insert(column.name.clone(), value);
                }
                JsonValue::Object(object)
            })
            .collect();
        JsonValue::Array(rows)
    }
}
