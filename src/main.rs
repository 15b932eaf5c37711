// RecordGate - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// CLI and stdio JSON server. All record operations route through the gateway.
// Usage:
//   record-gate serve                                # Run stdio server
//   record-gate op <operation> <resource> [...]      # One-shot gateway call
//   record-gate token issue <user-id>                # Issue a bearer token
//   record-gate token revoke <token>                 # Revoke a token
//   record-gate seed                                 # Load sample records
//   record-gate status                               # Store entry counts
//   record-gate schema-export <json_file>            # Dump resource schemas
//   record-gate schema-import <json_file>            # Install resource schemas

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use record_gate::{
    auth::TokenRegistry,
    gateway::Gateway,
    paths,
    record::FieldValue,
    resource::SchemaRegistry,
    rpc,
    store::RecordStore,
    store_db::GateStorage,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "record-gate")]
#[command(author = "Joseph Stone")]
#[command(version = "1.0.0")]
#[command(about = "RecordGate - record access gateway with per-resource policy enforcement")]
struct Cli {
    /// Store directory (LMDB environment)
    #[arg(short, long, default_value_os_t = paths::store_path())]
    storage: PathBuf,

    /// Resource schema config (JSON); defaults are used when absent
    #[arg(long, default_value_os_t = paths::schema_path())]
    schemas: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stdio JSON server
    Serve,

    /// One-shot gateway call, prints the JSON response
    Op {
        /// Operation (list, retrieve, create, update, delete)
        operation: String,

        /// Resource name (books, posts, comments, ...)
        resource: String,

        /// Target record id (path position)
        #[arg(long)]
        id: Option<String>,

        /// Bearer token
        #[arg(long)]
        token: Option<String>,

        /// Payload as a JSON object
        #[arg(long)]
        data: Option<String>,

        /// Query param as key=value, repeatable
        #[arg(long)]
        query: Vec<String>,
    },

    /// Token management
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Load built-in sample records
    Seed,

    /// Show store entry counts per resource
    Status,

    /// Export resource schemas to a JSON file
    SchemaExport {
        /// Device file to write JSON to
        json_file: PathBuf,
    },

    /// Import resource schemas from a JSON file
    SchemaImport {
        /// JSON schema file to import
        json_file: PathBuf,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Issue a fresh token for a user id
    Issue { user_id: u64 },

    /// Revoke a previously issued token
    Revoke { token: String },
}

fn main() -> Result<()> {
    // Initialize logging (safe if already init)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let cli = Cli::parse();

    let registry = SchemaRegistry::load(&cli.schemas)
        .with_context(|| format!("Failed to load schemas from {:?}", cli.schemas))?;

    let storage = GateStorage::open(&cli.storage, &registry)
        .with_context(|| format!("Failed to open store at {:?}", cli.storage))?;

    match &cli.command {
        Commands::Serve => {
            let tokens = TokenRegistry::new(&storage);
            let gateway = Gateway::new(registry, &storage);
            rpc::serve(&gateway, &tokens)?;
        }

        Commands::Op {
            operation,
            resource,
            id,
            token,
            data,
            query,
        } => {
            let body: Option<Map<String, Value>> = match data {
                Some(raw) => Some(
                    serde_json::from_str(raw)
                        .with_context(|| format!("Invalid payload JSON: {}", raw))?,
                ),
                None => None,
            };

            let mut query_map = Map::new();
            for pair in query {
                let (key, value) = pair
                    .split_once('=')
                    .with_context(|| format!("Query param must be key=value: {:?}", pair))?;
                query_map.insert(key.to_string(), Value::String(value.to_string()));
            }

            let request = rpc::RpcRequest {
                op: operation.clone(),
                resource: resource.clone(),
                token: token.clone(),
                id: id.clone().map(Value::String),
                query: if query_map.is_empty() {
                    None
                } else {
                    Some(query_map)
                },
                body,
            };

            let tokens = TokenRegistry::new(&storage);
            let gateway = Gateway::new(registry, &storage);
            let response = rpc::handle(&gateway, &tokens, request);

            println!("{}", serde_json::to_string_pretty(&response)?);

            if response.status >= 400 {
                std::process::exit(1);
            }
        }

        Commands::Token { command } => {
            let tokens = TokenRegistry::new(&storage);
            match command {
                TokenCommands::Issue { user_id } => {
                    let token = tokens.issue(*user_id)?;
                    println!("{}", token);
                }
                TokenCommands::Revoke { token } => {
                    if tokens.revoke(token)? {
                        println!("Token revoked.");
                    } else {
                        println!("Token not found.");
                        std::process::exit(1);
                    }
                }
            }
        }

        Commands::Seed => {
            let count = seed(&storage)?;
            println!("Seeded {} records.", count);
        }

        Commands::Status => {
            println!("RecordGate v1.0.0");
            println!("Storage: {:?}", cli.storage);
            println!("Schemas: {:?}", cli.schemas);
            println!();
            for resource in &registry.resources {
                let count = storage.entry_count(&resource.name)?;
                println!(
                    "  {:<12} {:>6} record(s) | policy: {:?}",
                    resource.name, count, resource.policy
                );
            }
        }

        Commands::SchemaExport { json_file } => {
            registry
                .save(json_file)
                .with_context(|| format!("Failed to write schemas to {:?}", json_file))?;
            println!("Schemas exported to {:?}", json_file);
        }

        Commands::SchemaImport { json_file } => {
            let imported = SchemaRegistry::load(json_file)
                .with_context(|| format!("Failed to read schemas from {:?}", json_file))?;
            imported
                .save(&cli.schemas)
                .with_context(|| format!("Failed to install schemas at {:?}", cli.schemas))?;
            println!(
                "Imported {} resource schema(s) to {:?}",
                imported.resources.len(),
                cli.schemas
            );
        }
    }

    Ok(())
}

/// Sample catalog for demos: a few books plus two posts owned by user 1.
fn seed(storage: &GateStorage) -> Result<usize> {
    let books: [(&str, i64, i64); 4] = [
        ("Things Fall Apart", 1958, 1),
        ("No Longer at Ease", 1960, 1),
        ("Brave New World", 1932, 2),
        ("The Fall", 1956, 3),
    ];

    let mut count = 0;
    for (title, year, author) in books {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), FieldValue::Text(title.to_string()));
        fields.insert("publication_year".to_string(), FieldValue::Int(year));
        fields.insert("author".to_string(), FieldValue::Int(author));
        let record = storage.insert("books", None, fields)?;
        log::info!("seeded books/{}: {}", record.id, title);
        count += 1;
    }

    let posts: [(&str, &str); 2] = [
        ("First post", "Welcome to the gate."),
        ("Reading list", "Start with the catalog."),
    ];
    for (title, content) in posts {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), FieldValue::Text(title.to_string()));
        fields.insert("content".to_string(), FieldValue::Text(content.to_string()));
        let record = storage.insert("posts", Some(1), fields)?;
        log::info!("seeded posts/{}: {}", record.id, title);
        count += 1;
    }

    Ok(count)
}
