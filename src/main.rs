//! dynobj CLI - store and read objects of caller-defined types

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use dynobj::config::{self, DynobjConfig};
use dynobj::object::{CreateRequest, UpdateRequest};
use dynobj::ui::{self, Icons};
use dynobj::ObjectService;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dynobj")]
#[command(version = "0.0.1")]
#[command(about = "Schema-on-write object store - persist objects of any type without a predeclared schema")]
#[command(long_about = r#"
dynobj stores objects whose type and fields are only known when they are written:
  • Each new type gets its own table, each new field its own column
  • A master object and its nested sub-objects are written atomically
  • Deletes are soft and cascade to the master's direct children

Example usage:
  dynobj init
  dynobj create --file order.json
  dynobj get Order 1
  dynobj serve --port 8080
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./dynobj.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file, overriding the config
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file spelling out every default
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on (defaults to the config, then 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create a master object and its sub-objects from a JSON request
    Create {
        /// JSON file with `masterObject` and `relatedSubObjects`
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Fetch a live object by type and id
    Get {
        /// Object type name
        object_type: String,

        /// Object id
        id: i64,

        /// Print the object as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace the fields of a live object
    Update {
        /// Object id
        id: i64,

        /// JSON file with a `fields` object
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Soft-delete an object and its direct children
    Delete {
        /// Object id
        id: i64,
    },

    /// List registered object types
    Types,

    /// Show statistics about the store
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    let config = config::load_config(Some(&config_path))?.unwrap_or_default();
    let database = cli.database.clone().unwrap_or_else(|| config.database_path());
    let open = || open_service(&config, &database);

    match cli.command {
        Commands::Init { force } => {
            let defaults = DynobjConfig::with_defaults();
            config::write_config(&config_path, &defaults, force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
            ui::status(Icons::DATABASE, "Database", &defaults.database_path().display().to_string());
        }

        Commands::Serve { port } => {
            let service = open()?;
            let port = port.or(config.port).unwrap_or(config::DEFAULT_PORT);
            ui::header(&format!("dynobj listening on port {}", port));
            ui::status(Icons::DATABASE, "Database", &database.display().to_string());

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(dynobj::server::start_server(port, service))?;
        }

        Commands::Create { file } => {
            let service = open()?;
            let request: CreateRequest = read_json(&file)?;
            let tree = request.into_tree();
            let count = tree.walk().len();

            let started = Instant::now();
            let id = service.create(&tree)?;
            ui::success(&format!("Created {} #{}", tree.type_name, id));
            if count > 1 {
                ui::status(Icons::LINK, "Sub-objects linked", &(count - 1).to_string());
            }
            ui::status(Icons::CLOCK, "Elapsed", &format!("{:.2?}", started.elapsed()));
        }

        Commands::Get { object_type, id, json } => {
            let service = open()?;
            let object = service.get(&object_type, id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&object)?);
                return Ok(());
            }

            ui::section(&format!(" {} #{} ", object.object_type.name, object.id));
            ui::summary_row("Created", &object.created_at.to_rfc3339());
            if let Some(modified) = object.modified_at {
                ui::summary_row("Modified", &modified.to_rfc3339());
            }
            match object.master_object_id {
                Some(master) => ui::summary_row("Master", &format!("#{}", master)),
                None => ui::summary_row("Master", &ui::dim("(this object)")),
            }

            let table = ui::fields_table(&object.fields);
            if table.is_empty() {
                println!("{}", ui::dim("  no fields"));
            } else {
                println!("{}", table);
            }
        }

        Commands::Update { id, file } => {
            let service = open()?;
            let request: UpdateRequest = read_json(&file)?;
            service.update(id, &request.fields)?;
            ui::status(Icons::MOD, "Updated", &format!("#{} ({} fields)", id, request.fields.len()));
        }

        Commands::Delete { id } => {
            let service = open()?;
            let cascaded = service.delete(id)?;
            ui::status(Icons::DEL, "Deleted", &format!("#{}", id));
            if cascaded > 0 {
                ui::info("Sub-objects deleted", &cascaded.to_string());
            }
        }

        Commands::Types => {
            let service = open()?;
            let types = service.list_types()?;
            if types.is_empty() {
                ui::warn("No types registered yet.");
            } else {
                ui::status(Icons::PACKAGE, "Types", &types.len().to_string());
                println!("{}", ui::types_table(&types));
            }
        }

        Commands::Stats => {
            let service = open()?;
            let stats = service.stats()?;
            ui::status(Icons::STATS, "dynobj statistics", &database.display().to_string());
            println!("{}", ui::stats_table(&stats));
        }
    }

    Ok(())
}

fn open_service(config: &DynobjConfig, database: &Path) -> anyhow::Result<ObjectService> {
    config::ensure_db_dir(database)?;
    tracing::debug!("Opening store at {}", database.display());
    let service = ObjectService::open(database, &config.store_options(), config.policy())
        .with_context(|| format!("failed to open {}", database.display()))?;
    Ok(service)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid request", path.display()))?;
    Ok(value)
}
