use std::fmt::Write;

use crate::prelude::*;

/// Rows per INSERT statement in generated scripts.
const INSERT_BATCH: usize = 1000;

/// Builds the DDL and bulk-insert script for a finished model. String column
/// widths are derived from the data: VARCHAR(max observed length). Text
/// output only; executing it belongs to the relational sink.
pub struct SqlBuilder {
    pub buffer: String,
}

impl SqlBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
        }
    }

    /// CREATE TABLE and INSERTs for every table in the model, in model order.
    pub fn script(&mut self, model: &Model) -> &mut Self {
        for table in model.tables() {
            self.create_table(table);
            self.insert_rows(table);
        }
        self
    }

    pub fn create_table(&mut self, table: &Table) -> &mut Self {
        let key = table.key_column();
        write!(self.buffer, "CREATE TABLE \"{}\" (", table.name).unwrap();
        for (i, column) in table.columns.iter().enumerate() {
            if i > 0 {
                self.buffer.push_str(", ");
            }
            write!(self.buffer, "\"{}\" ", column.name).unwrap();
            match column.column_type {
                ColumnType::Integer if column.name == key => {
                    self.buffer.push_str("BIGINT NOT NULL PRIMARY KEY");
                }
                ColumnType::Integer => self.buffer.push_str("BIGINT NULL"),
                ColumnType::String => {
                    write!(self.buffer, "VARCHAR({}) NULL", varchar_width(table, &column.name))
                        .unwrap();
                }
            }
        }
        self.buffer.push_str(");\n");
        self
    }

    pub fn insert_rows(&mut self, table: &Table) -> &mut Self {
        for batch in table.rows.chunks(INSERT_BATCH) {
            write!(self.buffer, "INSERT INTO \"{}\" (", table.name).unwrap();
            for (i, column) in table.columns.iter().enumerate() {
                if i > 0 {
                    self.buffer.push_str(", ");
                }
                write!(self.buffer, "\"{}\"", column.name).unwrap();
            }
            self.buffer.push_str(") VALUES\n");
            for (i, row) in batch.iter().enumerate() {
                if i > 0 {
                    self.buffer.push_str(",\n");
                }
                self.buffer.push('(');
                for (j, column) in table.columns.iter().enumerate() {
                    if j > 0 {
                        self.buffer.push_str(", ");
                    }
                    self.push_literal(row.get(&column.name));
                }
                self.buffer.push(')');
            }
            self.buffer.push_str(";\n");
        }
        self
    }

    fn push_literal(&mut self, value: Option<&Value>) {
        match value {
            Some(Value::Integer(n)) => {
                write!(self.buffer, "{}", n).unwrap();
            }
            Some(Value::Text(s)) => {
                self.buffer.push('\'');
                for ch in s.chars() {
                    if ch == '\'' {
                        self.buffer.push('\'');
                    }
                    self.buffer.push(ch);
                }
                self.buffer.push('\'');
            }
            Some(Value::Null) | None => self.buffer.push_str("NULL"),
        }
    }

    pub fn build(self) -> String {
        self.buffer
    }
}

/// Widest observed value in characters, minimum 1 so empty columns still get
/// a valid declaration.
fn varchar_width(table: &Table, column: &str) -> usize {
    table
        .rows
        .iter()
        .filter_map(|row| row.get(column).and_then(Value::as_text))
        .map(|text| text.chars().count())
        .max()
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_table() -> Table {
        let mut table = Table::new("game");
        table.add_column(Column::integer("datafile_id"));
        table.add_column(Column::string("name"));

        let mut row = Row::new();
        row.insert("datafile_id".to_string(), Value::Integer(1));
        row.insert("name".to_string(), Value::Text("O'Brien".to_string()));
        table.append_row(row);

        let mut row = Row::new();
        row.insert("datafile_id".to_string(), Value::Integer(1));
        table.append_row(row);

        table
    }

    #[test]
    fn create_table_derives_varchar_width() {
        let mut builder = SqlBuilder::with_capacity(256);
        builder.create_table(&game_table());
        let sql = builder.build();
        assert_eq!(
            sql,
            "CREATE TABLE \"game\" (\"game_id\" BIGINT NOT NULL PRIMARY KEY, \"datafile_id\" BIGINT NULL, \"name\" VARCHAR(7) NULL);\n"
        );
    }

    #[test]
    fn empty_string_column_gets_width_one() {
        let mut table = Table::new("header");
        table.add_column(Column::string("homepage"));
        table.append_row(Row::new());
        let mut builder = SqlBuilder::with_capacity(128);
        builder.create_table(&table);
        assert!(builder.build().contains("\"homepage\" VARCHAR(1) NULL"));
    }

    #[test]
    fn insert_rows_escapes_quotes_and_renders_nulls() {
        let mut builder = SqlBuilder::with_capacity(256);
        builder.insert_rows(&game_table());
        let sql = builder.build();
        assert!(sql.starts_with("INSERT INTO \"game\" (\"game_id\", \"datafile_id\", \"name\") VALUES\n"));
        assert!(sql.contains("(1, 1, 'O''Brien')"));
        assert!(sql.contains("(2, 1, NULL)"));
    }

    #[test]
    fn script_covers_every_table_in_order() {
        let mut model = Model::new();
        model.add_table(Table::new("datafile")).unwrap();
        model.add_table(game_table()).unwrap();

        let mut builder = SqlBuilder::with_capacity(1024);
        builder.script(&model);
        let sql = builder.build();

        let datafile_at = sql.find("CREATE TABLE \"datafile\"").unwrap();
        let game_at = sql.find("CREATE TABLE \"game\"").unwrap();
        assert!(datafile_at < game_at);
        // empty tables produce no INSERT
        assert!(!sql.contains("INSERT INTO \"datafile\""));
    }
}
