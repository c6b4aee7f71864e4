use crate::prelude::*;

/// One parsed XML element. Attribute order follows the document so inferred
/// column order is reproducible.
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub name: String,
    pub text: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// A leaf carries neither attributes nor children; it becomes a column on
    /// its parent's row instead of a row of its own.
    pub fn is_leaf(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }
}

/// Parse one datfile into an element tree.
pub fn parse_datfile(path: &Path) -> ForgeResult<XmlNode> {
    let file = File::open(path).map_err(|e| ForgeError::MalformedInput {
        path: path.display().to_string(),
        reason: format!("Cannot open file: {}", e),
        suggestion: "Check file permissions and path".to_string(),
    })?;
    parse_reader(BufReader::new(file), &path.display().to_string())
}

/// Parse an in-memory document. `origin` names the source in errors.
pub fn parse_datfile_str(xml: &str, origin: &str) -> ForgeResult<XmlNode> {
    parse_reader(xml.as_bytes(), origin)
}

fn parse_reader<R: Read>(reader: R, origin: &str) -> ForgeResult<XmlNode> {
    let parser = EventReader::new(reader);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    for event in parser {
        match event.map_err(|e| ForgeError::MalformedInput {
            path: origin.to_string(),
            reason: format!("XML parse error: {}", e),
            suggestion: "Check if the datfile is well-formed XML".to_string(),
        })? {
            XmlEvent::StartElement { name, attributes, .. } => {
                let mut node = XmlNode {
                    name: name.local_name,
                    text: None,
                    attributes: Vec::with_capacity(attributes.len()),
                    children: Vec::new(),
                };

                for attr in attributes {
                    node.attributes.push((attr.name.local_name, attr.value));
                }

                stack.push(node);
            }
            XmlEvent::EndElement { .. } => {
                if let Some(node) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    } else {
                        root = Some(node);
                    }
                }
            }
            XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                if let Some(node) = stack.last_mut() {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        match node.text {
                            Some(ref mut existing) => existing.push_str(trimmed),
                            None => node.text = Some(trimmed.to_string()),
                        }
                    }
                }
            }
            _ => {}
        }
    }

    root.ok_or_else(|| ForgeError::MalformedInput {
        path: origin.to_string(),
        reason: "No root element found".to_string(),
        suggestion: "Ensure the datfile has a valid root element".to_string(),
    })
}

/// Configuration for the tree-to-table import walk.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Tables checked for duplicate rows, mapped to the column that carries
    /// the human-readable identifying value. A second row under the same
    /// parent with the same value is skipped with a warning; first one wins.
    pub natural_keys: HashMap<String, String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        let mut natural_keys = HashMap::new();
        natural_keys.insert("game".to_string(), "name".to_string());
        Self { natural_keys }
    }
}

/// Walk one element tree into a fresh relational model: one table per
/// distinct tag name, synthetic integer keys, string-typed attribute and
/// leaf-text columns.
pub fn import_tree(root: &XmlNode, options: &ImportOptions) -> ForgeResult<Model> {
    let mut model = Model::new();
    import_element(root, None, &mut model, options)?;
    Ok(model)
}

fn import_element(
    node: &XmlNode,
    parent: Option<(&str, i64)>,
    model: &mut Model,
    options: &ImportOptions,
) -> ForgeResult<()> {
    if !model.contains(&node.name) {
        model.add_table(Table::new(node.name.as_str()))?;
    }

    let foreign_key = parent.map(|(parent_table, _)| format!("{}{}", parent_table, KEY_SUFFIX));

    // Attributes first, then leaf children: on a name collision the leaf
    // child's text is the value that survives (last write wins).
    let mut cells: Vec<(String, Value)> = Vec::new();
    for (name, value) in &node.attributes {
        cells.push((name.clone(), Value::Text(value.clone())));
    }
    for child in &node.children {
        if child.is_leaf() {
            if cells.iter().any(|(name, _)| name == &child.name) {
                warn!(
                    "Ambiguous cell '{}' on <{}>: leaf child collides with an earlier value, last write wins",
                    child.name, node.name
                );
            }
            let value = child.text.clone().map(Value::Text).unwrap_or(Value::Null);
            cells.push((child.name.clone(), value));
        }
    }

    let key = {
        let table = model
            .table_mut(&node.name)
            .ok_or_else(|| ForgeError::Custom(format!("Table '{}' vanished mid-import", node.name)))?;

        // The same tag at a new depth still shares one table; its foreign key
        // column set grows with the union of parents seen.
        if let Some(fk) = &foreign_key {
            table.add_column(Column::integer(fk.clone()));
        }
        for (name, _) in &cells {
            table.add_column(Column::string(name.clone()));
        }

        if let Some(skipped) = duplicate_of(table, &cells, &foreign_key, parent, options) {
            warn!(
                "Skipping duplicate '{}' row '{}' (keeping first occurrence)",
                node.name, skipped
            );
            None
        } else {
            let mut row = Row::new();
            if let (Some(fk), Some((_, parent_key))) = (&foreign_key, parent) {
                row.insert(fk.clone(), Value::Integer(parent_key));
            }
            for (name, value) in cells {
                row.insert(name, value);
            }
            Some(table.append_row(row))
        }
    };

    let Some(key) = key else {
        return Ok(());
    };

    for child in &node.children {
        if !child.is_leaf() {
            import_element(child, Some((node.name.as_str(), key)), model, options)?;
        }
    }

    Ok(())
}

/// Returns the identifying value when a row with the same parent and same
/// natural key already exists in the table.
fn duplicate_of(
    table: &Table,
    cells: &[(String, Value)],
    foreign_key: &Option<String>,
    parent: Option<(&str, i64)>,
    options: &ImportOptions,
) -> Option<String> {
    let natural_column = options.natural_keys.get(&table.name)?;
    let natural_value = cells
        .iter()
        .rev()
        .find(|(name, _)| name == natural_column)
        .and_then(|(_, value)| value.as_text())?;

    let parent_key = parent.map(|(_, key)| key);

    let exists = table.rows.iter().any(|row| {
        if row.get(natural_column.as_str()).and_then(Value::as_text) != Some(natural_value) {
            return false;
        }
        match foreign_key {
            Some(fk) => row.get(fk.as_str()).and_then(Value::as_integer) == parent_key,
            None => true,
        }
    });

    exists.then(|| natural_value.to_string())
}
