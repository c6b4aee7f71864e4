pub use xml::reader::{EventReader, XmlEvent};

pub use once_cell::sync::Lazy;
pub use regex::Regex;

pub use log::{debug, info, warn};

pub use serde::{Deserialize, Serialize};
pub use serde_json::{json, Value as JsonValue};

// Standard Library Imports
pub use std::collections::{HashMap, HashSet};
pub use std::error::Error;
pub use std::fmt;
pub use std::fs::{self, File};
pub use std::io::{BufReader, Read};
pub use std::path::{Path, PathBuf};

pub use crate::custom_error::cust_error::{ForgeError, ForgeResult};
pub use crate::model::relational::{
    Column, ColumnType, Model, Row, Table, Value, KEY_SUFFIX,
};

pub use crate::{ActionRegistry, DatIngest, IngestOptions};
