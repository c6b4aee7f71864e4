use crate::prelude::*;

#[derive(Debug)]
pub enum ForgeError {
    /// The source document is not well-formed XML. Fatal for the whole run.
    MalformedInput {
        path: String,
        reason: String,
        suggestion: String,
    },
    /// An expected singleton table or row is missing or duplicated. The
    /// assumed file shape is "one datafile root, one header, N games".
    StructuralAssumption {
        path: String,
        expected: String,
        found: String,
        suggestion: String,
    },
    /// A table name is missing from the merge target, or a column's type was
    /// re-declared incompatibly. Indicates an internal invariant violation.
    SchemaConflict {
        table: String,
        column: Option<String>,
        reason: String,
        suggestion: String,
    },
    InvalidOperation {
        operation: String,
        reason: String,
        suggestion: String,
    },
    Io(std::io::Error),
    Custom(String),
}

impl fmt::Display for ForgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForgeError::MalformedInput { path, reason, suggestion } => write!(
                f,
                "📄 Malformed Input: {}\n\
                 ❌ Problem: {}\n\
                 💡 Suggestion: {}",
                path, reason, suggestion
            ),
            ForgeError::StructuralAssumption { path, expected, found, suggestion } => write!(
                f,
                "🏗️ Unexpected File Shape: {}\n\
                 ✅ Expected: {}\n\
                 ❌ Found: {}\n\
                 💡 Suggestion: {}",
                path, expected, found, suggestion
            ),
            ForgeError::SchemaConflict { table, column, reason, suggestion } => {
                let column_info = column
                    .as_ref()
                    .map_or(String::new(), |c| format!("\n📍 Column: {}", c));
                write!(
                    f,
                    "⚡ Schema Conflict in table '{}'{}\n\
                     ❌ Problem: {}\n\
                     💡 Suggestion: {}",
                    table, column_info, reason, suggestion
                )
            }
            ForgeError::InvalidOperation { operation, reason, suggestion } => write!(
                f,
                "⚠️ Invalid Operation: {}\n\
                 ❌ Problem: {}\n\
                 💡 Suggestion: {}",
                operation, reason, suggestion
            ),
            ForgeError::Io(err) => write!(
                f,
                "📁 I/O Error: {}\n\
                 💡 Quick fixes to try:\n\
                 1. Check if the file/directory exists\n\
                 2. Verify your permissions\n\
                 3. Ensure the path is correct",
                err
            ),
            ForgeError::Custom(err) => write!(f, "💫 {}", err),
        }
    }
}

impl Error for ForgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ForgeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ForgeError {
    fn from(err: std::io::Error) -> Self {
        ForgeError::Io(err)
    }
}

pub type ForgeResult<T> = Result<T, ForgeError>;
