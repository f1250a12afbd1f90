use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use dotenvy::dotenv;
use trainhub_cli::admin::{self, NewAdmin};
use trainhub_cli::seeder::{self, PerOrganization, SeedConfig};

#[derive(Parser)]
#[command(name = "trainhub-cli")]
#[command(about = "TrainHub CLI - administration and demo data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an administrator (with a new organization unless --system)
    CreateAdmin {
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        #[arg(short = 'l', long)]
        last_name: Option<String>,

        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Prompted securely when omitted
        #[arg(short = 'p', long)]
        password: Option<String>,

        /// Name of the organization to create
        #[arg(short = 'o', long, conflicts_with = "system")]
        organization: Option<String>,

        /// Create a platform-wide system administrator instead
        #[arg(long)]
        system: bool,
    },
    /// Seed fake organizations, trainers, formations, sessions, students and enrollments
    Seed {
        #[arg(short = 'o', long, default_value = "3")]
        organizations: usize,

        #[arg(long, default_value = "3")]
        trainers: usize,

        #[arg(long, default_value = "4")]
        formations: usize,

        /// Sessions per formation
        #[arg(long, default_value = "2")]
        sessions: usize,

        /// Students per organization
        #[arg(long, default_value = "60")]
        students: usize,
    },
    /// Delete every seeded organization and its data
    ClearSeed {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("\n❌ {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    match cli.command {
        Commands::CreateAdmin {
            first_name,
            last_name,
            email,
            password,
            organization,
            system,
        } => {
            let first_name = prompt_if_missing(first_name, "First name")?;
            let last_name = prompt_if_missing(last_name, "Last name")?;
            let email = prompt_if_missing(email, "Email address")?;
            let organization_name = if system {
                None
            } else {
                Some(prompt_if_missing(organization, "Organization name")?)
            };
            let password = match password {
                Some(p) => p,
                None => Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Confirm password", "Passwords don't match")
                    .interact()?,
            };

            let created = admin::create_admin(
                &pool,
                NewAdmin {
                    first_name,
                    last_name,
                    email: email.clone(),
                    password,
                    organization_name,
                },
            )
            .await?;

            println!("\n✅ Administrator created");
            println!("   Email: {email}");
            println!("   Role: {}", created.role);
            if let Some(org) = created.organization_id {
                println!("   Organization: {org}");
            }
        }
        Commands::Seed {
            organizations,
            trainers,
            formations,
            sessions,
            students,
        } => {
            let config = SeedConfig::new(organizations).with_per_organization(PerOrganization {
                trainers,
                formations,
                sessions_per_formation: sessions,
                students,
            });
            seeder::seed_all(&pool, config).await?;
        }
        Commands::ClearSeed { yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("Delete all seeded organizations and their data?")
                    .default(false)
                    .interact()?;
            if confirmed {
                seeder::clear_all(&pool).await?;
            } else {
                println!("Aborted");
            }
        }
    }

    Ok(())
}

fn prompt_if_missing(value: Option<String>, prompt: &str) -> anyhow::Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new().with_prompt(prompt).interact_text()?),
    }
}
