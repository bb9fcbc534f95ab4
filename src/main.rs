use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use team_points::client::{ApiClient, API_URL_ENV, DEFAULT_API_URL};
use team_points::config::Config;
use team_points::model::{step_delta, CategoryPatch, MemberFields, Step};
use team_points::service::TeamService;
use team_points::store::{JsonFileStore, MemoryStore};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_STORAGE: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on, keeping the configured host
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Directory for members.json and categories.json
    #[arg(long, env = "TEAM_POINTS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Serve a built web UI from this directory
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Keep everything in memory (nothing is written to disk)
    #[arg(long)]
    in_memory: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default if no subcommand)
    Serve(ServeArgs),
    /// Show standings, highest total first
    List {
        /// Only show members whose name contains this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Add a member
    Add {
        name: String,
    },
    /// Remove a member by id
    Remove {
        id: String,
    },
    /// Change a member's name
    Rename {
        id: String,
        name: String,
    },
    /// Add one step of a category (its increment) to a member
    Plus {
        id: String,
        category: String,
    },
    /// Take one step of a category (its decrement) from a member
    Minus {
        id: String,
        category: String,
    },
    /// Add a value to one category of a member (negative to subtract)
    Adjust {
        id: String,
        category: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Zero every member's points
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Replace all members with the rows of a sheet (TSV or CSV)
    Import {
        file: PathBuf,
    },
    /// Write standings as TSV (defaults to a dated file in the current directory)
    Export {
        file: Option<PathBuf>,
        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "file")]
        stdout: bool,
    },
    /// List scoring categories, or change one
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },
    /// Create a config file interactively
    Init,
}

#[derive(Subcommand, Debug)]
enum CategoriesAction {
    /// Change the label or step sizes of a category
    Set {
        key: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        increment: Option<i64>,
        #[arg(long)]
        decrement: Option<i64>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "team-points")]
#[command(about = "Team scorekeeping server and CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/team-points/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// API base URL used by client commands
    #[arg(long, global = true, env = API_URL_ENV, default_value = DEFAULT_API_URL)]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Serve flags as if `serve` had been given with no arguments, so env-backed
/// flags still apply when the subcommand is omitted.
fn default_command() -> Commands {
    #[derive(Parser)]
    struct ServeDefaults {
        #[command(flatten)]
        args: ServeArgs,
    }
    Commands::Serve(ServeDefaults::parse_from(["team-points"]).args)
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "team_points=debug,tower_http=debug"
    } else {
        "team_points=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = cli.command.unwrap_or_else(default_command);

    if let Commands::Init = command {
        let path = cli.config.map(PathBuf::from);
        if let Err(e) = team_points::config::init::run_init_wizard(path) {
            eprintln!("Init failed: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
        std::process::exit(EXIT_SUCCESS);
    }

    // Load config
    let config_path = cli.config.map(PathBuf::from);
    let config = match team_points::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let code = match command {
        Commands::Serve(args) => serve(config, args).await,
        command => {
            let client = match config
                .connect_timeout()
                .and_then(|timeout| ApiClient::new(&cli.server, timeout))
            {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Config error: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };
            match run_client_command(&client, command, cli.verbose).await {
                Ok(()) => EXIT_SUCCESS,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    EXIT_NETWORK
                }
            }
        }
    };

    std::process::exit(code);
}

async fn serve(mut config: Config, args: ServeArgs) -> i32 {
    let start_time = Instant::now();

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(dir) = args.static_dir {
        config.server.static_dir = Some(dir);
    }

    // Validate before applying the port so a bad bind address is reported as such
    if let Err(errors) = team_points::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return EXIT_CONFIG;
    }
    if let Err(e) = config.apply_overrides(args.port, args.data_dir) {
        eprintln!("Config error: {:#}", e);
        return EXIT_CONFIG;
    }

    let (addr, timeout) = match (config.bind_addr(), config.connect_timeout()) {
        (Ok(addr), Ok(timeout)) => (addr, timeout),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Config error: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    let service = if args.in_memory {
        tracing::warn!("using in-memory storage, data is lost on exit");
        TeamService::with_store(Arc::new(MemoryStore::new()))
    } else {
        let data_dir = config.data_dir();
        match JsonFileStore::open(&data_dir, timeout).await {
            Ok(store) => {
                tracing::info!("storage ready at {}", data_dir.display());
                TeamService::with_store(Arc::new(store))
            }
            Err(e) => {
                eprintln!("{}", e);
                return EXIT_STORAGE;
            }
        }
    };

    // Categories must exist before the first request is served
    if let Err(e) = service.seed_default_categories().await {
        eprintln!("Failed to seed categories: {}", e);
        return EXIT_STORAGE;
    }

    tracing::debug!("startup took {:?}", start_time.elapsed());

    let app = team_points::server::router(Arc::new(service), config.server.static_dir.as_deref());
    match team_points::server::run(addr, app).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            EXIT_FAILURE
        }
    }
}

async fn run_client_command(
    client: &ApiClient,
    command: Commands,
    verbose: bool,
) -> anyhow::Result<()> {
    let use_colors = team_points::output::should_use_colors();

    match command {
        Commands::List { search } => {
            let mut members = client.list_members().await?;
            if let Some(term) = search {
                members.retain(|m| m.matches_search(&term));
            }
            if verbose && !members.is_empty() {
                for member in &members {
                    println!("{}", team_points::output::format_member_detail(member, use_colors));
                    println!();
                }
            } else {
                println!("{}", team_points::output::format_standings(&members, use_colors));
            }
        }
        Commands::Add { name } => {
            let member = client.create_member(&MemberFields::named(name)).await?;
            println!("Added {} ({})", member.name, member.id);
        }
        Commands::Remove { id } => {
            client.delete_member(&id).await?;
            println!("Removed {}", id);
        }
        Commands::Rename { id, name } => {
            let member = client.update_member(&id, &MemberFields::named(name)).await?;
            println!("Renamed {} to {}", member.id, member.name);
        }
        Commands::Plus { id, category } => {
            let member = step_member(client, &id, &category, Step::Up).await?;
            println!("{}", team_points::output::format_member_detail(&member, use_colors));
        }
        Commands::Minus { id, category } => {
            let member = step_member(client, &id, &category, Step::Down).await?;
            println!("{}", team_points::output::format_member_detail(&member, use_colors));
        }
        Commands::Adjust {
            id,
            category,
            value,
        } => {
            let member = client.adjust(&id, &category, value).await?;
            println!("{}", team_points::output::format_member_detail(&member, use_colors));
        }
        Commands::Reset { yes } => {
            if !yes {
                let confirmed = team_points::config::init::prompt_yes_no(
                    "Reset every member's points to zero?",
                    false,
                )?;
                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }
            let outcome = client.reset_points().await?;
            println!("{}", outcome.message);
        }
        Commands::Import { file } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let text = team_points::sheet::decode_text(&bytes)
                .with_context(|| format!("Cannot import {}", file.display()))?;
            let members = client.import_sheet(text).await?;
            println!("Imported {} members", members.len());
            if verbose {
                println!("{}", team_points::output::format_standings(&members, use_colors));
            }
        }
        Commands::Export { file, stdout } => {
            let tsv = client.export_sheet().await?;
            if stdout {
                print!("{}", tsv);
                return Ok(());
            }
            let path = file.unwrap_or_else(|| {
                PathBuf::from(team_points::sheet::export_file_name(
                    chrono::Local::now().date_naive(),
                ))
            });
            std::fs::write(&path, tsv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        Commands::Categories { action: None } => {
            let categories = client.list_categories().await?;
            println!("{}", team_points::output::format_categories(&categories, use_colors));
        }
        Commands::Categories {
            action:
                Some(CategoriesAction::Set {
                    key,
                    label,
                    increment,
                    decrement,
                }),
        } => {
            if label.is_none() && increment.is_none() && decrement.is_none() {
                anyhow::bail!("Nothing to change: give --label, --increment or --decrement");
            }
            let patch = CategoryPatch {
                label,
                increment,
                decrement,
                is_negative: None,
            };
            let category = client.update_category_by_key(&key, &patch).await?;
            println!(
                "{}",
                team_points::output::format_categories(std::slice::from_ref(&category), use_colors)
            );
        }
        Commands::Serve(_) | Commands::Init => unreachable!("handled in main"),
    }

    Ok(())
}

/// Apply one increment or decrement step of `category`, using the server's
/// configured step sizes
async fn step_member(
    client: &ApiClient,
    id: &str,
    category: &str,
    step: Step,
) -> anyhow::Result<team_points::model::Member> {
    let categories = client.list_categories().await?;
    let delta = step_delta(&categories, category, step);
    client.adjust(id, category, delta).await
}
