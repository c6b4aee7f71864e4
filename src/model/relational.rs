use crate::prelude::*;

/// Suffix shared by every surrogate and foreign key column.
pub const KEY_SUFFIX: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn integer(name: impl Into<String>) -> Self {
        Self { name: name.into(), column_type: ColumnType::Integer }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self { name: name.into(), column_type: ColumnType::String }
    }

    pub fn is_key(&self) -> bool {
        self.name.ends_with(KEY_SUFFIX)
    }
}

/// A single cell. Null is distinct from an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Text(String),
    Null,
}

static NULL: Value = Value::Null;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// A row maps column names to cell values. A column missing from the map
/// reads as Null, which is how rows created before a column was added see it.
pub type Row = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table with its surrogate key column in place.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = format!("{}{}", name, KEY_SUFFIX);
        Self {
            name,
            columns: vec![Column::integer(key)],
            rows: Vec::new(),
        }
    }

    /// Name of this table's surrogate key column.
    pub fn key_column(&self) -> String {
        format!("{}{}", self.name, KEY_SUFFIX)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Adds a column if not already present. Existing rows read Null for it.
    /// Returns true when the column was actually added.
    pub fn add_column(&mut self, column: Column) -> bool {
        if self.has_column(&column.name) {
            return false;
        }
        self.columns.push(column);
        true
    }

    /// Surrogate key the next appended row will receive.
    pub fn next_key(&self) -> i64 {
        self.rows.len() as i64 + 1
    }

    /// Appends a row, assigning the next surrogate key. Any caller-supplied
    /// value under the key column name is overwritten.
    pub fn append_row(&mut self, mut row: Row) -> i64 {
        let key = self.next_key();
        row.insert(self.key_column(), Value::Integer(key));
        self.rows.push(row);
        key
    }

    pub fn value(&self, row_index: usize, column: &str) -> &Value {
        self.rows
            .get(row_index)
            .and_then(|row| row.get(column))
            .unwrap_or(&NULL)
    }
}

/// The in-memory multi-table relational model. Table names are unique and
/// iteration order is the order tables were first registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    tables: Vec<Table>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut [Table] {
        &mut self.tables
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Registers a table. Duplicate names are an invalid operation because
    /// name is the only table identity the model has.
    pub fn add_table(&mut self, table: Table) -> ForgeResult<()> {
        if self.contains(&table.name) {
            return Err(ForgeError::InvalidOperation {
                operation: "Add Table".to_string(),
                reason: format!("Table '{}' already registered", table.name),
                suggestion: "Use table_mut() to extend an existing table".to_string(),
            });
        }
        self.tables.push(table);
        Ok(())
    }

    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        let index = self.tables.iter().position(|t| t.name == name)?;
        Some(self.tables.remove(index))
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Verifies the model invariants: surrogate keys are contiguous 1..=N in
    /// row order, and every non-null key column value resolves to a row in
    /// the table the column name points at.
    pub fn validate(&self) -> ForgeResult<()> {
        for table in &self.tables {
            let key = table.key_column();
            for (index, row) in table.rows.iter().enumerate() {
                match row.get(&key).and_then(Value::as_integer) {
                    Some(n) if n == index as i64 + 1 => {}
                    other => {
                        return Err(ForgeError::SchemaConflict {
                            table: table.name.clone(),
                            column: Some(key),
                            reason: format!(
                                "Surrogate key at row {} is {:?}, expected {}",
                                index,
                                other,
                                index + 1
                            ),
                            suggestion: "Rows must only be appended through append_row()"
                                .to_string(),
                        });
                    }
                }
            }

            for column in &table.columns {
                if !column.is_key() || column.name == key {
                    continue;
                }
                let parent_name = &column.name[..column.name.len() - KEY_SUFFIX.len()];
                let parent_rows = match self.table(parent_name) {
                    Some(parent) => parent.rows.len() as i64,
                    None => {
                        return Err(ForgeError::SchemaConflict {
                            table: table.name.clone(),
                            column: Some(column.name.clone()),
                            reason: format!("References missing table '{}'", parent_name),
                            suggestion: "Foreign key columns must name an existing table"
                                .to_string(),
                        });
                    }
                };
                for row in &table.rows {
                    if let Some(Value::Integer(n)) = row.get(&column.name) {
                        if *n < 1 || *n > parent_rows {
                            return Err(ForgeError::SchemaConflict {
                                table: table.name.clone(),
                                column: Some(column.name.clone()),
                                reason: format!(
                                    "Foreign key value {} outside parent '{}' range 1..={}",
                                    n, parent_name, parent_rows
                                ),
                                suggestion: "Merge key remapping must run before rows are appended"
                                    .to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
