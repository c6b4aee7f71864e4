use crate::prelude::*;

/// Table names the Header Hoister operates on. Datfiles conventionally use a
/// `datafile` root with a singleton `header` child.
#[derive(Debug, Clone)]
pub struct HoistOptions {
    pub root_table: String,
    pub header_table: String,
}

impl Default for HoistOptions {
    fn default() -> Self {
        Self {
            root_table: "datafile".to_string(),
            header_table: "header".to_string(),
        }
    }
}

/// Copy every non-key header column onto the root row, then drop the header
/// table. `extra_columns` are caller-supplied scalars (category label, source
/// filename) injected onto the root row before hoisting. Both tables must
/// hold exactly one row; downstream provenance extraction assumes it, so a
/// violation is fatal and names the offending file.
pub fn hoist_header(
    model: &mut Model,
    options: &HoistOptions,
    extra_columns: &[(String, String)],
    origin: &str,
) -> ForgeResult<()> {
    expect_singleton(model, &options.header_table, origin)?;
    expect_singleton(model, &options.root_table, origin)?;

    let header = model
        .remove_table(&options.header_table)
        .ok_or_else(|| ForgeError::Custom(format!("Table '{}' vanished mid-hoist", options.header_table)))?;
    let header_row = header
        .rows
        .into_iter()
        .next()
        .ok_or_else(|| ForgeError::Custom("Header row vanished mid-hoist".to_string()))?;

    let root = model
        .table_mut(&options.root_table)
        .ok_or_else(|| ForgeError::Custom(format!("Table '{}' vanished mid-hoist", options.root_table)))?;

    for (name, _) in extra_columns {
        root.add_column(Column::string(name.clone()));
    }
    for column in &header.columns {
        if column.is_key() {
            continue;
        }
        root.add_column(column.clone());
    }

    let root_row = root
        .rows
        .first_mut()
        .ok_or_else(|| ForgeError::Custom("Root row vanished mid-hoist".to_string()))?;

    for (name, value) in extra_columns {
        root_row.insert(name.clone(), Value::Text(value.clone()));
    }
    for column in &header.columns {
        if column.is_key() {
            continue;
        }
        let value = header_row.get(&column.name).cloned().unwrap_or(Value::Null);
        root_row.insert(column.name.clone(), value);
    }

    Ok(())
}

fn expect_singleton(model: &Model, table: &str, origin: &str) -> ForgeResult<()> {
    let found = match model.table(table) {
        None => "missing table".to_string(),
        Some(t) if t.rows.len() == 1 => return Ok(()),
        Some(t) => format!("{} rows", t.rows.len()),
    };
    Err(ForgeError::StructuralAssumption {
        path: origin.to_string(),
        expected: format!("one '{}' row", table),
        found,
        suggestion: "Check the datfile has the usual one-datafile, one-header shape".to_string(),
    })
}

/// Fold one freshly imported model into the cumulative target.
///
/// Each file's import starts surrogate keys at 1, so rows cannot simply be
/// concatenated: every key column is re-based by the target table's current
/// row count before appending. Offsets for all tables are taken up front so a
/// table's offset is never polluted by this file's own appends.
pub fn merge_into(source: Model, target: &mut Model) -> ForgeResult<()> {
    // 1. schema reconciliation: target gains any missing tables and columns,
    // declared types are copied and never change once set
    for table in source.tables() {
        if !target.contains(&table.name) {
            let mut created = Table::new(table.name.as_str());
            for column in &table.columns {
                created.add_column(column.clone());
            }
            target.add_table(created)?;
            continue;
        }
        let target_table = target
            .table_mut(&table.name)
            .ok_or_else(|| ForgeError::Custom(format!("Table '{}' vanished mid-merge", table.name)))?;
        for column in &table.columns {
            match target_table.column(&column.name) {
                None => {
                    target_table.add_column(column.clone());
                }
                Some(existing) if existing.column_type != column.column_type => {
                    return Err(ForgeError::SchemaConflict {
                        table: table.name.clone(),
                        column: Some(column.name.clone()),
                        reason: format!(
                            "Column re-declared as {:?} but target has {:?}",
                            column.column_type, existing.column_type
                        ),
                        suggestion: "Column types never widen or narrow once set".to_string(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    // 2. offsets for every source table, before any rows are appended
    let mut offsets: HashMap<String, i64> = HashMap::new();
    for table in source.tables() {
        let target_table = target.table(&table.name).ok_or_else(|| ForgeError::SchemaConflict {
            table: table.name.clone(),
            column: None,
            reason: "Table not in target at offset computation".to_string(),
            suggestion: "Schema reconciliation must run before offsets are taken".to_string(),
        })?;
        offsets.insert(
            format!("{}{}", table.name, KEY_SUFFIX),
            target_table.rows.len() as i64,
        );
    }

    // 3 + 4. re-base every surrogate and foreign key, then append in order
    for mut table in source.into_tables() {
        let key_columns: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.is_key())
            .map(|c| c.name.clone())
            .collect();

        for column in &key_columns {
            let offset = *offsets.get(column).ok_or_else(|| ForgeError::SchemaConflict {
                table: table.name.clone(),
                column: Some(column.clone()),
                reason: "Key column does not match any table in this file".to_string(),
                suggestion: "Key-suffixed columns must name a table present in the import"
                    .to_string(),
            })?;
            if offset == 0 {
                continue;
            }
            for row in &mut table.rows {
                if let Some(Value::Integer(n)) = row.get_mut(column.as_str()) {
                    *n += offset;
                }
            }
        }

        let target_table = target
            .table_mut(&table.name)
            .ok_or_else(|| ForgeError::Custom(format!("Table '{}' vanished mid-merge", table.name)))?;
        target_table.rows.extend(table.rows);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::xml_loader::{import_tree, parse_datfile_str, ImportOptions};
    use crate::normalizers::normalize::trim_strings;

    fn import(xml: &str) -> Model {
        let root = parse_datfile_str(xml, "<test>").unwrap();
        let mut model = import_tree(&root, &ImportOptions::default()).unwrap();
        trim_strings(&mut model);
        model
    }

    fn datfile(name: &str, games: &[&str]) -> Model {
        let body: String = games
            .iter()
            .map(|g| format!(r#"<game name="{}"/>"#, g))
            .collect();
        import(&format!(
            "<datafile><header><name>{}</name></header>{}</datafile>",
            name, body
        ))
    }

    #[test]
    fn hoist_copies_header_onto_root_row() {
        let mut model = import(
            r#"<datafile><header><name>Foo</name></header><game name="A"/><game name="B"/></datafile>"#,
        );
        hoist_header(&mut model, &HoistOptions::default(), &[], "<test>").unwrap();

        assert!(model.table("header").is_none());
        let datafile = model.table("datafile").unwrap();
        assert_eq!(datafile.rows.len(), 1);
        assert_eq!(datafile.value(0, "datafile_id").as_integer(), Some(1));
        assert_eq!(datafile.value(0, "name").as_text(), Some("Foo"));

        let game = model.table("game").unwrap();
        assert_eq!(game.rows.len(), 2);
        assert_eq!(game.value(0, "name").as_text(), Some("A"));
        assert_eq!(game.value(1, "name").as_text(), Some("B"));
        assert_eq!(game.value(1, "datafile_id").as_integer(), Some(1));
    }

    #[test]
    fn hoist_injects_extra_columns_before_header() {
        let mut model = import(
            r#"<datafile><header><name>Foo</name></header><game name="A"/></datafile>"#,
        );
        let extras = vec![
            ("category".to_string(), "TOSEC".to_string()),
            ("filename".to_string(), "Foo Systems".to_string()),
        ];
        hoist_header(&mut model, &HoistOptions::default(), &extras, "<test>").unwrap();

        let datafile = model.table("datafile").unwrap();
        assert_eq!(datafile.value(0, "category").as_text(), Some("TOSEC"));
        assert_eq!(datafile.value(0, "filename").as_text(), Some("Foo Systems"));
        assert_eq!(datafile.value(0, "name").as_text(), Some("Foo"));
    }

    #[test]
    fn hoist_requires_exactly_one_header_row() {
        let mut model = import(r#"<datafile><game name="A"/></datafile>"#);
        let err = hoist_header(&mut model, &HoistOptions::default(), &[], "bad.dat").unwrap_err();
        match err {
            ForgeError::StructuralAssumption { path, found, .. } => {
                assert_eq!(path, "bad.dat");
                assert_eq!(found, "missing table");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn hoist_requires_a_singleton_header_not_two() {
        let mut model = import(
            r#"<datafile>
                <header><name>First</name></header>
                <header><name>Second</name></header>
                <game name="A"/>
            </datafile>"#,
        );
        let err = hoist_header(&mut model, &HoistOptions::default(), &[], "two.dat").unwrap_err();
        match err {
            ForgeError::StructuralAssumption { path, expected, found, .. } => {
                assert_eq!(path, "two.dat");
                assert_eq!(expected, "one 'header' row");
                assert_eq!(found, "2 rows");
            }
            other => panic!("unexpected error: {}", other),
        }
        // nothing was hoisted or removed
        assert_eq!(model.table("header").unwrap().rows.len(), 2);
    }

    #[test]
    fn merge_offsets_rebase_keys() {
        let mut target = Model::new();
        merge_into(datfile("One", &["A", "B"]), &mut target).unwrap();
        merge_into(datfile("Two", &["C", "D", "E"]), &mut target).unwrap();

        let game = target.table("game").unwrap();
        assert_eq!(game.rows.len(), 5);
        let keys: Vec<i64> = game
            .rows
            .iter()
            .map(|r| r.get("game_id").and_then(Value::as_integer).unwrap())
            .collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);

        // second file's games point at the shifted second datafile row
        assert_eq!(game.value(2, "datafile_id").as_integer(), Some(2));
        assert_eq!(game.value(4, "datafile_id").as_integer(), Some(2));
        assert_eq!(target.table("datafile").unwrap().rows.len(), 2);
        target.validate().unwrap();
    }

    #[test]
    fn merge_is_associative_over_batches() {
        let a = datfile("A", &["1", "2"]);
        let b = datfile("B", &["3"]);
        let c = datfile("C", &["4", "5", "6"]);

        let mut one_at_a_time = Model::new();
        merge_into(a.clone(), &mut one_at_a_time).unwrap();
        merge_into(b.clone(), &mut one_at_a_time).unwrap();
        merge_into(c.clone(), &mut one_at_a_time).unwrap();

        let mut batched = Model::new();
        merge_into(a, &mut batched).unwrap();
        merge_into(b, &mut batched).unwrap();
        let mut rest = Model::new();
        merge_into(c, &mut rest).unwrap();
        // folding an already merged model continues the same sequence
        merge_into(rest, &mut batched).unwrap();

        assert_eq!(one_at_a_time, batched);
    }

    #[test]
    fn merge_unions_column_sets_additively() {
        let mut target = Model::new();
        merge_into(
            import(r#"<datafile><header><name>X</name></header><game name="A" year="1987"/></datafile>"#),
            &mut target,
        )
        .unwrap();
        merge_into(
            import(r#"<datafile><header><name>Y</name></header><game name="B" publisher="Acme"/></datafile>"#),
            &mut target,
        )
        .unwrap();

        let game = target.table("game").unwrap();
        assert!(game.has_column("year"));
        assert!(game.has_column("publisher"));
        assert!(game.value(0, "publisher").is_null());
        assert_eq!(game.value(1, "publisher").as_text(), Some("Acme"));
    }

    #[test]
    fn merge_rejects_retyped_column() {
        let mut target = Model::new();
        let mut table = Table::new("game");
        table.add_column(Column::string("name"));
        target.add_table(table).unwrap();

        let mut source = Model::new();
        let mut table = Table::new("game");
        table.add_column(Column::integer("name"));
        source.add_table(table).unwrap();

        assert!(matches!(
            merge_into(source, &mut target),
            Err(ForgeError::SchemaConflict { .. })
        ));
    }

    #[test]
    fn first_fold_into_empty_target_is_a_copy() {
        let source = datfile("Solo", &["A"]);
        let mut target = Model::new();
        merge_into(source.clone(), &mut target).unwrap();
        assert_eq!(source, target);
    }
}
