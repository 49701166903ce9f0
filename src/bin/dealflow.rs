//! dealflow CLI: Airtable proxy server and store inspection.
//!
//! Usage:
//!   dealflow serve [--bind addr]
//!   dealflow snapshot [--proxy url] [--loan id]
//!   dealflow create-loan --name N --amount A --product-type P [--proxy url]

use clap::{Parser, Subcommand};
use dealflow::{
    AggregationStore, AirtableClient, AirtableProxy, CollectionSource, Config, NewLoan,
    ProxyClient,
};
use serde::Serialize;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "dealflow",
    version,
    about = "Airtable proxy for the loan pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the proxy routes
    Serve {
        /// Address to listen on (overrides DEALFLOW_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Load the store once and print what it holds
    Snapshot {
        /// Read through a running proxy instead of Airtable directly
        #[arg(long)]
        proxy: Option<String>,
        /// Print the conditions and responses of this loan
        #[arg(long)]
        loan: Option<String>,
    },
    /// Create a loan in the test table
    CreateLoan {
        /// Deal name
        #[arg(long)]
        name: String,
        /// Maximum loan amount
        #[arg(long)]
        amount: serde_json::Number,
        /// Product type
        #[arg(long)]
        product_type: String,
        /// Write through a running proxy instead of Airtable directly
        #[arg(long)]
        proxy: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DEALFLOW_LOG")
        .unwrap_or_else(|_| EnvFilter::new("dealflow=info,warn"));

    let format = env::var("DEALFLOW_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load_config() -> Result<Config, String> {
    let config = Config::from_env().map_err(|e| format!("invalid configuration: {}", e))?;
    for var in config.airtable.missing() {
        warn!(var, "not set; Airtable requests will fail");
    }
    Ok(config)
}

fn direct_proxy(config: &Config) -> Result<AirtableProxy, String> {
    let client = AirtableClient::new(&config.airtable).map_err(|e| e.to_string())?;
    Ok(AirtableProxy::new(Arc::new(client)))
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_serve(config: Config, bind: Option<SocketAddr>) -> i32 {
    let proxy = match direct_proxy(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let addr = bind.unwrap_or(config.bind);
    match dealflow::server::serve(addr, Arc::new(proxy)).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: server failed on {}: {}", addr, e);
            1
        }
    }
}

async fn cmd_snapshot(config: Config, proxy: Option<String>, loan: Option<String>) -> i32 {
    let source: Arc<dyn CollectionSource> = match proxy {
        Some(url) => match ProxyClient::new(&url) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
        None => match direct_proxy(&config) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
    };

    let store = AggregationStore::new(source);
    if let Err(e) = store.fetch_all().await {
        eprintln!("Error: {}", e);
        return 1;
    }

    let state = store.snapshot();
    println!("{:<12}  {:>7}", "COLLECTION", "RECORDS");
    println!("{}", "-".repeat(21));
    println!("{:<12}  {:>7}", "loans", state.loans.len());
    println!("{:<12}  {:>7}", "test loans", state.test_loans.len());
    println!("{:<12}  {:>7}", "conditions", state.conditions.len());
    println!("{:<12}  {:>7}", "responses", state.responses.len());

    match loan {
        Some(id) => print_json(&serde_json::json!({
            "loan": id,
            "conditions": store.conditions_by_loan_id(&id),
            "responses": store.responses_by_loan_id(&id),
        })),
        None => 0,
    }
}

async fn cmd_create_loan(config: Config, input: NewLoan, proxy: Option<String>) -> i32 {
    let created = match proxy {
        Some(url) => match ProxyClient::new(&url) {
            Ok(client) => client.create_test_loan(&input).await,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
        None => match direct_proxy(&config) {
            Ok(p) => p.create_test_loan(&input).await,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
    };

    match created {
        Ok(record) => print_json(&record),
        Err(e) => {
            eprintln!("Error: {}: {}", dealflow::CREATE_FAILED_MESSAGE, e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = rt.block_on(async {
        match cli.command {
            Commands::Serve { bind } => cmd_serve(config, bind).await,
            Commands::Snapshot { proxy, loan } => cmd_snapshot(config, proxy, loan).await,
            Commands::CreateLoan {
                name,
                amount,
                product_type,
                proxy,
            } => {
                let input = NewLoan {
                    name,
                    amount,
                    product_type,
                };
                cmd_create_loan(config, input, proxy).await
            }
        }
    });
    std::process::exit(code);
}
