use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

use idb_explorer::engine::{FjallEngine, IndexDefinition, StoreDefinition};
use idb_explorer::explorer::{Direction, Explorer, QueryOptions};
use idb_explorer::{EngineError, Key, KeyPath};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Explorer(#[from] idb_explorer::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid index spec '{0}': expected name:path[:unique][:multi]")]
    IndexSpec(String),

    #[error("Invalid key {0}: keys are numbers, strings or arrays of keys")]
    InvalidKey(String),

    #[error("{0}")]
    Rejected(String),
}

/// Sort direction for `query`.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl From<SortOrder> for Direction {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Direction::Asc,
            SortOrder::Desc => Direction::Desc,
        }
    }
}

#[derive(Parser)]
#[command(name = "idb-explorer")]
#[command(about = "Browse, search, sort, paginate and edit object-store databases")]
struct Cli {
    /// Engine storage path
    #[arg(long, global = true, default_value = ".idb-explorer", env = "IDB_EXPLORER_PATH")]
    path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List databases with their stores
    Databases,

    /// List the stores of a database with their schemas
    Stores {
        /// Database name
        database: String,
    },

    /// Show the schema of one store
    Schema {
        database: String,
        store: String,
    },

    /// Read a page of records
    Query {
        database: String,
        store: String,

        /// Case-insensitive search term
        #[arg(short, long)]
        search: Option<String>,

        /// Restrict the search to one field (dotted path)
        #[arg(long)]
        field: Option<String>,

        /// Sort by field (dotted path)
        #[arg(long)]
        order_by: Option<String>,

        #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
        direction: SortOrder,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long)]
        offset: Option<usize>,
    },

    /// Show the first records of a store
    Sample {
        database: String,
        store: String,

        /// Number of records
        #[arg(short = 'n', long)]
        size: Option<usize>,
    },

    /// Fetch one record by key (JSON; bare text is a string key)
    Get {
        database: String,
        store: String,
        key: String,
    },

    /// Insert a record (JSON)
    Create {
        database: String,
        store: String,
        record: String,

        /// Explicit key for stores with out-of-line keys
        #[arg(long)]
        key: Option<String>,
    },

    /// Insert or replace a record (JSON)
    Update {
        database: String,
        store: String,
        record: String,

        /// Explicit key for stores with out-of-line keys
        #[arg(long)]
        key: Option<String>,
    },

    /// Delete the record identified by a record (JSON) or out-of-line key
    Delete {
        database: String,
        store: String,
        record: String,
    },

    /// Answer a raw contract request (JSON)
    Request {
        /// Request body, e.g. '{"action":"GET_DATABASES"}'
        body: String,
    },

    /// Create an object store (creates the database when missing)
    CreateStore {
        database: String,
        store: String,

        /// Key path; comma-separated for a compound key
        #[arg(long)]
        key_path: Option<String>,

        /// Generate keys
        #[arg(long)]
        auto_increment: bool,

        /// Index as name:path[:unique][:multi]; repeatable
        #[arg(long = "index")]
        indexes: Vec<String>,
    },

    /// Delete a database and all its records
    DropDatabase {
        database: String,
    },
}

fn parse_key_path(text: &str) -> KeyPath {
    if text.contains(',') {
        KeyPath::Compound(text.split(',').map(|p| p.trim().to_string()).collect())
    } else {
        KeyPath::Single(text.to_string())
    }
}

fn parse_index(spec: &str) -> Result<IndexDefinition, AppError> {
    let mut parts = spec.split(':');
    let (Some(name), Some(path)) = (parts.next(), parts.next()) else {
        return Err(AppError::IndexSpec(spec.to_string()));
    };
    if name.is_empty() || path.is_empty() {
        return Err(AppError::IndexSpec(spec.to_string()));
    }
    let mut index = IndexDefinition::new(name, parse_key_path(path));
    for flag in parts {
        index = match flag {
            "unique" => index.unique(),
            "multi" => index.multi_entry(),
            _ => return Err(AppError::IndexSpec(spec.to_string())),
        };
    }
    Ok(index)
}

fn parse_json(text: &str) -> Result<Value, AppError> {
    Ok(serde_json::from_str(text)?)
}

fn parse_key(text: &str) -> Result<Key, AppError> {
    let value = serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
    Key::from_value(&value).ok_or_else(|| AppError::InvalidKey(text.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let engine = FjallEngine::init(&cli.path)?;

    match cli.command {
        Commands::CreateStore {
            database,
            store,
            key_path,
            auto_increment,
            indexes,
        } => {
            let mut definition = StoreDefinition::new(&store);
            if let Some(path) = key_path {
                definition = definition.key_path(parse_key_path(&path));
            }
            if auto_increment {
                definition = definition.auto_increment();
            }
            for spec in &indexes {
                definition = definition.index(parse_index(spec)?);
            }
            let info = engine.create_store(&database, definition)?;
            println!(
                "Created store '{}' in database '{}' (version {})",
                store, info.name, info.version
            );
            Ok(())
        }
        Commands::DropDatabase { database } => {
            if engine.delete_database(&database)? {
                println!("Deleted database '{}'", database);
            } else {
                eprintln!("Database '{}' not found", database);
                std::process::exit(1);
            }
            Ok(())
        }
        command => {
            let explorer = Explorer::new(engine);
            let outcome = run(&explorer, command);
            explorer.close_all();
            outcome
        }
    }
}

fn run(explorer: &Explorer<FjallEngine>, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Databases => print_json(&explorer.list_databases()),
        Commands::Stores { database } => print_json(&explorer.list_stores(&database)?),
        Commands::Schema { database, store } => {
            print_json(&explorer.store_schema(&database, &store)?)
        }
        Commands::Query {
            database,
            store,
            search,
            field,
            order_by,
            direction,
            limit,
            offset,
        } => {
            let options = QueryOptions {
                search,
                search_field: field,
                order_by,
                direction: Some(direction.into()),
                limit,
                offset,
            };
            print_json(&explorer.query(&database, &store, &options)?)
        }
        Commands::Sample {
            database,
            store,
            size,
        } => print_json(&explorer.sample(&database, &store, size)?),
        Commands::Get {
            database,
            store,
            key,
        } => match explorer.get_one(&database, &store, &parse_key(&key)?)? {
            Some(record) => print_json(&record),
            None => {
                eprintln!("Key {} not found in store '{}'", key, store);
                std::process::exit(1);
            }
        },
        Commands::Create {
            database,
            store,
            record,
            key,
        } => {
            let key = key.as_deref().map(parse_key).transpose()?;
            let key = explorer.create(&database, &store, parse_json(&record)?, key)?;
            println!("Created record {} in store '{}'", key, store);
            Ok(())
        }
        Commands::Update {
            database,
            store,
            record,
            key,
        } => {
            let key = key.as_deref().map(parse_key).transpose()?;
            let key = explorer.update(&database, &store, parse_json(&record)?, key)?;
            println!("Updated record {} in store '{}'", key, store);
            Ok(())
        }
        Commands::Delete {
            database,
            store,
            record,
        } => {
            let record = serde_json::from_str(&record).unwrap_or(Value::String(record));
            explorer.delete(&database, &store, &record)?;
            println!("Deleted record from store '{}'", store);
            Ok(())
        }
        Commands::Request { body } => {
            let response = explorer.handle_json(&body);
            print_json(&response)?;
            match response.error {
                Some(error) if !response.success => Err(AppError::Rejected(error)),
                _ => Ok(()),
            }
        }
        Commands::CreateStore { .. } | Commands::DropDatabase { .. } => Ok(()),
    }
}
