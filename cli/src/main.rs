//! # shelfwise CLI
//!
//! Ask questions about a product catalog and find nearby stores.
//!
//! ## Usage
//!
//! ```bash
//! # One question
//! shelfwise ask "How many coffee products are there?"
//!
//! # A conversation
//! shelfwise chat --lat 43.65 --lon -79.38
//!
//! # Stores carrying a product
//! shelfwise stores --lat 43.65 --lon -79.38 --product kitkat
//! ```

use clap::{Parser, Subcommand};
use shelfwise::commands;
use std::path::PathBuf;

/// Initialize logger based on verbose flag
fn init_logger(verbose: bool) {
    let mut log_builder = env_logger::Builder::from_default_env();
    if verbose {
        log_builder.filter_level(log::LevelFilter::Debug);
    } else {
        log_builder.filter_level(log::LevelFilter::Info);
    }
    log_builder.init();
}

/// Main CLI structure
#[derive(Parser)]
#[command(name = "shelfwise")]
#[command(about = "Ask questions about a product catalog and find nearby stores", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Ask one question about the catalog
    Ask {
        /// Natural language question
        #[arg(value_name = "QUERY")]
        query: String,
        /// Session id to record the exchange under
        #[arg(long, short = 's', value_name = "SESSION_ID")]
        session: Option<String>,
        /// Your latitude, for nearby stores
        #[arg(long, value_name = "LAT", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Your longitude, for nearby stores
        #[arg(long, value_name = "LON", allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Hold a multi-turn conversation on stdin
    Chat {
        #[arg(long, value_name = "LAT", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, value_name = "LON", allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Find stores carrying a product
    Stores {
        #[arg(long, value_name = "LAT", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, value_name = "LON", allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Product name
        #[arg(long, short = 'p', value_name = "PRODUCT")]
        product: Option<String>,
        /// Search radius in km
        #[arg(long, value_name = "KM")]
        max_distance: Option<f64>,
        /// Maximum number of stores
        #[arg(long, short = 'n', value_name = "COUNT")]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Answer a count or list question from catalog metadata only
    Classify {
        #[arg(value_name = "QUERY")]
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report which collaborators are configured
    Status {
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config subcommands
#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show {
        /// Show full secrets instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },
    /// Configure the completion model
    Llm {
        #[command(subcommand)]
        command: LlmCommands,
    },
    /// Configure the Neo4j knowledge graph
    Graph {
        #[arg(long, default_value = "http://localhost:7474")]
        uri: String,
        #[arg(long, default_value = "neo4j")]
        user: String,
        #[arg(long, default_value = "neo4j")]
        database: String,
        /// Environment variable holding the password
        #[arg(long, default_value = "NEO4J_PASSWORD")]
        password_env: String,
        /// Remove the graph configuration instead
        #[arg(long)]
        remove: bool,
    },
    /// Configure the search index
    Search {
        #[arg(long, required_unless_present = "remove")]
        endpoint: Option<String>,
        #[arg(long, default_value = "products")]
        index: String,
        #[arg(long, short = 'k')]
        api_key: Option<String>,
        /// Environment variable holding the API key
        #[arg(long, default_value = "AZURE_SEARCH_KEY")]
        api_key_env: String,
        /// Remove the search configuration instead
        #[arg(long)]
        remove: bool,
    },
    /// Set catalog file locations
    Data {
        #[arg(long, value_name = "FILE")]
        products: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        stores: Option<PathBuf>,
    },
    /// Delete the configuration file
    Reset,
}

/// LLM subcommands
#[derive(Subcommand)]
enum LlmCommands {
    /// Configure OpenAI
    Openai {
        #[arg(long, short = 'm', default_value = "gpt-4")]
        model: String,
        #[arg(long, short = 'k')]
        api_key: Option<String>,
    },
    /// Configure an Azure OpenAI deployment
    Azure {
        #[arg(long, short = 'e')]
        endpoint: String,
        #[arg(long, short = 'd')]
        deployment: String,
        #[arg(long)]
        api_version: Option<String>,
        #[arg(long, short = 'k')]
        api_key: Option<String>,
    },
    /// Configure a custom OpenAI-compatible endpoint
    Custom {
        #[arg(long, short = 'e')]
        endpoint: String,
        #[arg(long, short = 'm')]
        model: String,
        #[arg(long, short = 'k')]
        api_key: Option<String>,
    },
    /// Remove the completion configuration
    Remove,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = run_command(cli.command).await;
    std::process::exit(exit_code);
}

async fn run_command(command: Commands) -> i32 {
    use shelfwise::exit_codes::*;

    match command {
        Commands::Ask {
            query,
            session,
            lat,
            lon,
            json,
            verbose,
        } => {
            init_logger(verbose);
            let args = commands::ask::AskArgs {
                query,
                session_id: session,
                latitude: lat,
                longitude: lon,
                json,
                verbose,
            };
            match commands::ask::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Ask error: {}", e);
                    EXIT_ERROR
                }
            }
        }
        Commands::Chat { lat, lon, verbose } => {
            init_logger(verbose);
            let args = commands::chat::ChatArgs {
                latitude: lat,
                longitude: lon,
                verbose,
            };
            match commands::chat::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Chat error: {}", e);
                    EXIT_ERROR
                }
            }
        }
        Commands::Stores {
            lat,
            lon,
            product,
            max_distance,
            limit,
            json,
            verbose,
        } => {
            init_logger(verbose);
            let args = commands::stores::StoresArgs {
                latitude: lat,
                longitude: lon,
                product,
                max_distance_km: max_distance,
                limit,
                json,
            };
            match commands::stores::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Stores error: {}", e);
                    EXIT_ERROR
                }
            }
        }
        Commands::Classify { query, json } => {
            init_logger(false);
            let args = commands::classify::ClassifyArgs { query, json };
            match commands::classify::execute(args) {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Classify error: {}", e);
                    EXIT_ERROR
                }
            }
        }
        Commands::Status { verbose } => {
            init_logger(verbose);
            match commands::status::execute().await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Status error: {}", e);
                    EXIT_CONFIG_ERROR
                }
            }
        }
        Commands::Config { command } => {
            init_logger(false);
            run_config_command(command)
        }
    }
}

fn run_config_command(command: ConfigCommands) -> i32 {
    use commands::config::*;
    use shelfwise::exit_codes::*;

    let result = match command {
        ConfigCommands::Show { show_secrets } => execute_show(ConfigShowArgs { show_secrets }),
        ConfigCommands::Llm { command } => {
            let args = match command {
                LlmCommands::Openai { model, api_key } => {
                    ConfigLlmArgs::Set(LlmProvider::OpenAI { model, api_key })
                }
                LlmCommands::Azure {
                    endpoint,
                    deployment,
                    api_version,
                    api_key,
                } => ConfigLlmArgs::Set(LlmProvider::Azure {
                    endpoint,
                    deployment,
                    api_version,
                    api_key,
                }),
                LlmCommands::Custom {
                    endpoint,
                    model,
                    api_key,
                } => ConfigLlmArgs::Set(LlmProvider::Custom {
                    endpoint,
                    model,
                    api_key,
                }),
                LlmCommands::Remove => ConfigLlmArgs::Remove,
            };
            execute_llm(args)
        }
        ConfigCommands::Graph {
            uri,
            user,
            database,
            password_env,
            remove,
        } => execute_graph(if remove {
            ConfigGraphArgs::Remove
        } else {
            ConfigGraphArgs::Set {
                uri,
                user,
                database,
                password_env,
            }
        }),
        ConfigCommands::Search {
            endpoint,
            index,
            api_key,
            api_key_env,
            remove,
        } => execute_search(match (remove, endpoint) {
            (false, Some(endpoint)) => ConfigSearchArgs::Set {
                endpoint,
                index,
                api_key,
                api_key_env,
            },
            _ => ConfigSearchArgs::Remove,
        }),
        ConfigCommands::Data { products, stores } => {
            execute_data(ConfigDataArgs { products, stores })
        }
        ConfigCommands::Reset => execute_reset(),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Config error: {}", e);
            EXIT_CONFIG_ERROR
        }
    }
}
