//! Rich Habits CLI - Database migrations, seeding and data utilities.
//!
//! # Usage
//!
//! ```bash
//! # Apply schema migrations
//! rh-cli migrate run
//!
//! # Rewrite legacy manufacturing statuses
//! rh-cli migrate manufacturing-status
//!
//! # Seed the permission matrix
//! rh-cli seed permissions
//!
//! # Create a user
//! rh-cli user create -e admin@example.com -n "Admin Name" -r admin -p 'long-password'
//!
//! # Export / import all data
//! rh-cli data export -f json -o backup.json
//! rh-cli data import -i backup.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Schema migrations and data remaps
//! - `seed` - Seed reference data
//! - `user create` - Create staff users
//! - `data` - Export and import every table

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::data::ExportFormat;

#[derive(Parser)]
#[command(name = "rh-cli")]
#[command(author, version, about = "Rich Habits OS CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage staff users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Export or import all data
    Data {
        #[command(subcommand)]
        action: DataAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Apply embedded schema migrations
    Run,
    /// Rewrite legacy manufacturing statuses to the current set
    ManufacturingStatus,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Write the built-in permission table to the database
    Permissions,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `sales`, `designer`, `ops`, `manufacturer`)
        #[arg(short, long, default_value = "sales")]
        role: String,

        /// Login password; omit to create an account that cannot log in yet
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum DataAction {
    /// Dump every table in dependency order
    Export {
        /// Output format (`json` or `text`)
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all data with a JSON export
    Import {
        /// Path to a JSON export
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so `data export` can write to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Run => commands::migrate::run().await?,
            MigrateTarget::ManufacturingStatus => {
                commands::migrate::manufacturing_status().await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Permissions => commands::seed::permissions().await?,
        },
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::user::create(&email, &name, &role, password.as_deref()).await?;
            }
        },
        Commands::Data { action } => match action {
            DataAction::Export { format, output } => {
                commands::data::export(format, output.as_deref()).await?;
            }
            DataAction::Import { input } => commands::data::import(&input).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_create_short_flags() {
        let cli = Cli::try_parse_from([
            "rh-cli", "user", "create", "-e", "a@example.com", "-n", "Ann", "-r", "admin", "-p",
            "long-password",
        ]);
        match cli.map(|c| c.command) {
            Ok(Commands::User {
                action:
                    UserAction::Create {
                        email,
                        role,
                        password,
                        ..
                    },
            }) => {
                assert_eq!(email, "a@example.com");
                assert_eq!(role, "admin");
                assert_eq!(password.as_deref(), Some("long-password"));
            }
            _ => panic!("expected user create"),
        }
    }

    #[test]
    fn test_parse_manufacturing_status() {
        let cli = Cli::try_parse_from(["rh-cli", "migrate", "manufacturing-status"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Migrate {
                target: MigrateTarget::ManufacturingStatus
            })
        ));
    }

    #[test]
    fn test_parse_export_defaults_to_json_stdout() {
        let cli = Cli::try_parse_from(["rh-cli", "data", "export"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Data {
                action: DataAction::Export {
                    format: ExportFormat::Json,
                    output: None
                }
            })
        ));
    }

    #[test]
    fn test_parse_export_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["rh-cli", "data", "export", "-f", "yaml"]).is_err());
    }

    #[test]
    fn test_import_requires_input() {
        assert!(Cli::try_parse_from(["rh-cli", "data", "import"]).is_err());
    }
}
