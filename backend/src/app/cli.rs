// cli.rs - CLI utility for database migrations and admin provisioning
use std::env;
use std::io;
use std::io::Write;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::auth;
use crate::core;
use crate::db;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Migration creation failed")]
    MigrationCreateFailed { #[source] source: db::DbMigrationError },

    #[error("Listing migrations failed")]
    MigrationListFailed { #[source] source: db::DbMigrationError },

    // For the Status command, only actual errors from check_pending should be wrapped.
    // NoMigrationsApplied is handled as informational output.
    #[error("Checking migration status failed")]
    MigrationStatusCheckFailed { #[source] source: db::DbMigrationError },

    #[error("Running migrations failed")]
    MigrationRunFailed { #[source] source: db::DbMigrationError },

    // The Other(String) variant is kept as a fallback, though ideally all errors should be specific.
    #[error("An unexpected CLI error occurred: {0}")]
    Other(String),
}

#[derive(Parser)]
#[command(name = "migrate")]
#[command(about = "Database migration utility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    migrate_sub_command: MigrateSubCommands,
}

#[derive(Subcommand)]
enum MigrateSubCommands {
    /// Create a new migration file
    Create {
        /// Name of the migration
        name: String,
    },
    /// List all available migrations
    List,
    /// Check if there are pending migrations
    Status,
    /// Run all pending migrations
    Run,
    /// Create a super admin account
    CreateSuperAdmin {
        /// Email for the super admin account
        #[arg(short, long)]
        email: String,
        /// Full name shown on the profile (optional)
        #[arg(short, long)]
        full_name: Option<String>,
    },
}

pub async fn run_cli(context: &core::Context) -> Result<(), CliError> {
    let args: Vec<String> = env::args().collect();

    // Only run if this is explicitly called with the right arguments
    if args.len() < 2 || args[1] != "migrate" {
        return Ok(());
    }

    // Rewrite args for clap to parse correctly (remove the "migrate" argument)
    let mut cli_args = vec![args[0].clone()];
    cli_args.extend(args.iter().skip(2).cloned());

    let cli = Cli::parse_from(cli_args);

    match cli.migrate_sub_command {
        MigrateSubCommands::Create { name } => {
            let filename = context.db.create_migration(&name)
                .map_err(|e| CliError::MigrationCreateFailed { source: e })?;
            println!("Created new migration file: {filename}");
        },
        MigrateSubCommands::List => {
            let migrations = context.db.list_migrations()
                .map_err(|e| CliError::MigrationListFailed { source: e })?;
            if migrations.is_empty() {
                println!("No migrations found.");
            } else {
                println!("Available migrations:");
                for (i, migration) in migrations.iter().enumerate() {
                    println!("{}. {}", i + 1, migration);
                }
            }
        },
        MigrateSubCommands::Status => {
            match context.db.check_pending_migrations().await {
                Ok(true) => println!("There are pending migrations that need to be applied."),
                Ok(false) => println!("Database is up to date. No pending migrations."),
                Err(e) => {
                    if let db::DbMigrationError::NoMigrationsApplied = e {
                        println!("No migrations have been applied yet.");
                    } else {
                        // Propagate other migration errors
                        return Err(CliError::MigrationStatusCheckFailed { source: e });
                    }
                }
            }
        },
        MigrateSubCommands::Run => {
            context.db.run_migrations().await
                .map_err(|e| CliError::MigrationRunFailed { source: e })?;
            println!("Migrations applied successfully.");
        },
        MigrateSubCommands::CreateSuperAdmin { email, full_name } => {
            // Prompt for the password without echoing it
            print!("Enter password for super admin '{email}': ");
            io::stdout().flush().map_err(|e| CliError::Other(e.to_string()))?;
            let password = rpassword::read_password().map_err(|e| CliError::Other(e.to_string()))?;

            if password.trim().is_empty() {
                return Err(CliError::Other("Password cannot be empty".to_string()));
            }

            create_super_admin(&context.db, &email, &password, full_name.as_deref()).await
                .map_err(|e| CliError::Other(e.to_string()))?;

            println!("Super admin '{email}' created successfully!");
        },
    }

    // Exit the process since this is a CLI command
    std::process::exit(0);
}

async fn create_super_admin(
    database: &db::Database,
    email: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Check if the user already exists
    if database.users.get_by_email(email).await.is_ok() {
        return Err("User already exists".into());
    }

    let password_hash = auth::hash_password(password)?;
    let user = database.users.create(db::NewUser {
        email: email.to_string(),
        password_hash: Some(password_hash),
    }).await?;

    database.profiles.create(db::NewProfile {
        id: user.id.clone(),
        email: user.email,
        full_name: full_name.map(ToString::to_string),
        system_role: db::SystemRole::SuperAdmin,
    }).await?;

    Ok(())
}
