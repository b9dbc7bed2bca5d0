use crate::error::{Result, TabletalkError};
use crate::llm::tools::{FunctionDescriptor, LlmTool, ToolDescriptor};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const MAX_ROWS: usize = 200;

/// Toolkit exposing a single bound database to the model.
///
/// The toolkit owns one connection and hands out three model-callable tools
/// that share it: `list_tables`, `describe_table`, and `run_sql_query`.
/// Tool execution is synchronous; the connection is guarded by a mutex so the
/// boxed tools stay `Send + Sync`.
///
/// # Examples
///
/// ```ignore
/// use tabletalk::llm::tools::sql::SqlToolkit;
///
/// let toolkit = SqlToolkit::open("sqlite://survey.db")?;
/// let tools = toolkit.tools();
/// // tools can now be handed to a ChatSession
/// ```
pub struct SqlToolkit {
    conn: Arc<Mutex<Connection>>,
}

impl SqlToolkit {
    /// Open the database named by `database_url`.
    ///
    /// Accepts a plain file path or a `sqlite://`-prefixed URL.
    pub fn open(database_url: &str) -> Result<Self> {
        let path = database_url.strip_prefix("sqlite://").unwrap_or(database_url);
        info!("Opening bound database at {}", path);
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database, useful for demos and tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// The model-callable tools backed by this toolkit's connection.
    pub fn tools(&self) -> Vec<Box<dyn LlmTool>> {
        vec![
            Box::new(ListTablesTool {
                conn: self.conn.clone(),
            }),
            Box::new(DescribeTableTool {
                conn: self.conn.clone(),
            }),
            Box::new(RunSqlQueryTool {
                conn: self.conn.clone(),
            }),
        ]
    }
}

/// Convert a SQLite value into its JSON representation.
///
/// Blobs are summarized by length rather than inlined; the analyst prompt has
/// no use for raw binary and it keeps tool output compact.
fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => json!({ "blob_length": b.len() }),
    }
}

fn require_str_arg<'a>(args: &'a HashMap<String, Value>, name: &str) -> Result<&'a str> {
    let value = args.get(name).and_then(|v| v.as_str()).ok_or_else(|| {
        TabletalkError::InvalidArgument(format!("{} parameter is required", name))
    })?;

    if value.is_empty() {
        return Err(TabletalkError::InvalidArgument(format!(
            "{} parameter cannot be empty",
            name
        )));
    }

    Ok(value)
}

/// Lists the user tables in the bound database
#[derive(Clone)]
pub struct ListTablesTool {
    conn: Arc<Mutex<Connection>>,
}

impl LlmTool for ListTablesTool {
    fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Listed {} tables", tables.len());
        Ok(json!({ "tables": tables }))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: "list_tables".to_string(),
                description: "List the tables available in the database.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
        }
    }

    fn clone_box(&self) -> Box<dyn LlmTool> {
        Box::new(self.clone())
    }
}

/// Describes the columns of one table
#[derive(Clone)]
pub struct DescribeTableTool {
    conn: Arc<Mutex<Connection>>,
}

impl LlmTool for DescribeTableTool {
    fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let table_name = require_str_arg(args, "table_name")?;

        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table_name], |row| {
                Ok(json!({
                    "name": row.get::<_, String>(0)?,
                    "type": row.get::<_, String>(1)?,
                    "notnull": row.get::<_, i64>(2)? != 0,
                    "primary_key": row.get::<_, i64>(3)? != 0,
                }))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(TabletalkError::ToolError(format!(
                "No such table: {}",
                table_name
            )));
        }

        Ok(json!({ "table": table_name, "columns": columns }))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: "describe_table".to_string(),
                description: "Describe the columns of a table, including name, type, \
                              nullability, and primary key membership."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "table_name": {
                            "type": "string",
                            "description": "The name of the table to describe"
                        }
                    },
                    "required": ["table_name"]
                }),
            },
        }
    }

    fn clone_box(&self) -> Box<dyn LlmTool> {
        Box::new(self.clone())
    }
}

/// Runs an arbitrary SQL query and returns the rows as JSON
#[derive(Clone)]
pub struct RunSqlQueryTool {
    conn: Arc<Mutex<Connection>>,
}

impl LlmTool for RunSqlQueryTool {
    fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let query = require_str_arg(args, "query")?;
        info!("Executing SQL query");
        debug!("Query text: {}", query);

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(query)?;
        let column_names: Vec<String> =
            stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut collected = Vec::new();
        let mut truncated = false;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            if collected.len() >= MAX_ROWS {
                truncated = true;
                break;
            }
            let mut record = serde_json::Map::new();
            for (i, name) in column_names.iter().enumerate() {
                record.insert(name.clone(), value_to_json(row.get_ref(i)?));
            }
            collected.push(Value::Object(record));
        }

        Ok(json!({
            "columns": column_names,
            "rows": collected,
            "row_count": collected.len(),
            "truncated": truncated,
        }))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: "run_sql_query".to_string(),
                description: format!(
                    "Run a SQL query against the database and return the result rows as JSON. \
                     At most {} rows are returned; the result marks itself truncated when \
                     the limit is hit.",
                    MAX_ROWS
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The SQL query to execute"
                        }
                    },
                    "required": ["query"]
                }),
            },
        }
    }

    fn clone_box(&self) -> Box<dyn LlmTool> {
        Box::new(self.clone())
    }
}
