use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use partner_core::client::PartnerDeskApi;
use partner_core::config::PartnerCoreConfig;
use partner_core::domain::format::{format_date, truncate_text};
use partner_core::model::{
    BusinessVertical, GeoPoint, Reservation, ReservationStatus, ReservationTab, YearMonth,
};
use partner_core::PartnerDesk;
use runtime::{AppConfig, CliArgs};
use serde::Serialize;
use uuid::Uuid;

const MODULE_NAME: &str = "partner_core";

/// Partner desk command line client
#[derive(Parser)]
#[command(name = "partner-cli")]
#[command(about = "Partner desk - manage your business's reservations from the terminal")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local data directory (overrides app.home_dir)
    #[arg(long)]
    home_dir: Option<PathBuf>,

    /// Account email (falls back to PARTNER_EMAIL)
    #[arg(long)]
    email: Option<String>,

    /// Account password (falls back to PARTNER_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check configuration
    Check,
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
    },
    /// Send a password-reset email
    ResetPassword,
    /// Show or change the selected business vertical
    Vertical {
        #[command(subcommand)]
        action: VerticalAction,
    },
    /// List reservations of a tab or of one day
    Reservations {
        /// upcoming | past | canceled
        #[arg(long, default_value = "upcoming", conflicts_with = "day")]
        tab: String,
        /// YYYY-MM-DD
        #[arg(long)]
        day: Option<String>,
    },
    /// Month grid with days that have activity
    Calendar {
        /// YYYY-MM, defaults to the current month
        #[arg(long)]
        month: Option<String>,
    },
    /// Dashboard counters of the active business
    Stats,
    /// Calendar, day list and counters in one JSON document
    Dashboard {
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        day: Option<String>,
    },
    /// Change the status of one reservation
    SetStatus { id: Uuid, status: String },
    /// Print the reservation count whenever the list changes (Ctrl-C to stop)
    Watch,
    /// Resolve coordinates into a place label
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
}

#[derive(Subcommand)]
enum VerticalAction {
    Show,
    Set { vertical: String },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        home_dir: cli
            .home_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string()),
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args)?;

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.app.home_dir));
    tracing::debug!(home_dir = %config.app.home_dir, "Partner CLI starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let module_cfg: PartnerCoreConfig = config.module_config(MODULE_NAME)?;
    let command = cli.command.unwrap_or(Commands::Check);
    if let Commands::Check = command {
        return check_config(&config, &module_cfg);
    }

    let desk = PartnerDesk::from_config(
        &module_cfg,
        Path::new(&config.app.home_dir),
        Duration::from_secs(config.app.http_timeout_sec),
    )?;
    desk.start().await?;
    let api = desk.api();
    let credentials = Credentials::resolve(cli.email, cli.password);

    let result = run_command(command, &api, &credentials).await;
    desk.shutdown().await;
    result
}

fn check_config(config: &AppConfig, module_cfg: &PartnerCoreConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    url::Url::parse(&module_cfg.backend_url)
        .with_context(|| format!("Invalid backend_url '{}'", module_cfg.backend_url))?;
    if module_cfg.anon_key.trim().is_empty() {
        tracing::warn!("modules.partner_core.anon_key is empty; the backend will reject requests");
    }
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

impl Credentials {
    fn resolve(email: Option<String>, password: Option<String>) -> Self {
        Self {
            email: email.or_else(|| std::env::var("PARTNER_EMAIL").ok()),
            password: password.or_else(|| std::env::var("PARTNER_PASSWORD").ok()),
        }
    }

    fn email(&self) -> Result<&str> {
        self.email
            .as_deref()
            .ok_or_else(|| anyhow!("--email (or PARTNER_EMAIL) is required"))
    }

    fn password(&self) -> Result<&str> {
        self.password
            .as_deref()
            .ok_or_else(|| anyhow!("--password (or PARTNER_PASSWORD) is required"))
    }
}

async fn run_command(
    command: Commands,
    api: &Arc<dyn PartnerDeskApi>,
    credentials: &Credentials,
) -> Result<()> {
    let today = Local::now().date_naive();

    match command {
        Commands::Check => Ok(()),
        Commands::Register { name } => {
            let session = api
                .register(credentials.email()?, credentials.password()?, &name)
                .await?;
            println!("Registered {} ({})", session.email, session.user_id);
            println!("Check your inbox to confirm the address before signing in.");
            Ok(())
        }
        Commands::ResetPassword => {
            api.reset_password(credentials.email()?).await?;
            println!("Password reset email sent");
            Ok(())
        }
        Commands::Vertical { action } => {
            sign_in(api, credentials).await?;
            match action {
                VerticalAction::Show => match api.current_vertical() {
                    Some(v) => {
                        println!("{v}");
                        if let Some(profile) = api.business_profile() {
                            print_json(&profile)?;
                        }
                    }
                    None => println!("No vertical selected"),
                },
                VerticalAction::Set { vertical } => {
                    let vertical: BusinessVertical = vertical.parse().map_err(|e: String| anyhow!(e))?;
                    match api.select_vertical(vertical).await? {
                        Some(profile) => println!("Active business: {}", profile.name),
                        None => println!("No {vertical} business registered yet"),
                    }
                }
                VerticalAction::Clear => {
                    api.clear_vertical().await?;
                    println!("Selection cleared");
                }
            }
            Ok(())
        }
        Commands::Reservations { tab, day } => {
            sign_in(api, credentials).await?;
            let items = match day {
                Some(day) => api.reservations_on(parse_date(&day)?)?,
                None => {
                    let tab: ReservationTab = tab.parse().map_err(|e: String| anyhow!(e))?;
                    api.reservations_by_tab(tab, today)
                }
            };
            print_reservations(&items);
            Ok(())
        }
        Commands::Calendar { month } => {
            sign_in(api, credentials).await?;
            let month = parse_month(month.as_deref(), today)?;
            let cells = api.calendar(month)?;
            println!("{month}");
            println!(" Su Mo Tu We Th Fr Sa");
            let mut line = String::new();
            for (i, cell) in cells.iter().enumerate() {
                if cell.is_padding() {
                    line.push_str("   ");
                } else if cell.has_activity {
                    line.push_str(&format!("{:>2}*", cell.day_number));
                } else {
                    line.push_str(&format!("{:>3}", cell.day_number));
                }
                if (i + 1) % 7 == 0 {
                    println!("{line}");
                    line.clear();
                }
            }
            if !line.is_empty() {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Stats => {
            sign_in(api, credentials).await?;
            print_json(&api.stats(today)?)
        }
        Commands::Dashboard { month, day } => {
            sign_in(api, credentials).await?;
            let month = parse_month(month.as_deref(), today)?;
            let selected = match day {
                Some(day) => parse_date(&day)?,
                None => today,
            };
            print_json(&api.dashboard(month, selected, today)?)
        }
        Commands::SetStatus { id, status } => {
            sign_in(api, credentials).await?;
            let status: ReservationStatus = status.parse().map_err(|e: String| anyhow!(e))?;
            api.set_reservation_status(id, status).await?;
            println!("Reservation {id} is now {status}");
            Ok(())
        }
        Commands::Watch => {
            sign_in(api, credentials).await?;
            let mut updates = api.watch_reservations();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    next = updates.next() => match next {
                        Some(items) => println!("{} reservations", items.len()),
                        None => break,
                    },
                }
            }
            Ok(())
        }
        Commands::Locate { lat, lng } => {
            let picked = api.pick_location(GeoPoint { lat, lng }).await;
            print_json(&picked)
        }
    }
}

async fn sign_in(api: &Arc<dyn PartnerDeskApi>, credentials: &Credentials) -> Result<()> {
    if api.current_session().is_some() {
        return Ok(());
    }
    let session = api
        .sign_in(credentials.email()?, credentials.password()?)
        .await?;
    tracing::debug!(user_id = %session.user_id, "Signed in");
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Expected YYYY-MM-DD, got '{raw}'"))
}

fn parse_month(raw: Option<&str>, today: NaiveDate) -> Result<YearMonth> {
    match raw {
        Some(raw) => raw.parse().map_err(|e: String| anyhow!(e)),
        None => Ok(YearMonth::of(today)),
    }
}

fn print_reservations(items: &[Reservation]) {
    if items.is_empty() {
        println!("No reservations");
        return;
    }
    for r in items {
        let notes = r.notes.as_deref().map(|n| truncate_text(n, 40));
        println!(
            "{}  {:<10} {:<24} {}  {}",
            format_date(r.schedule.anchor_date()),
            r.status.as_str(),
            r.client_name,
            r.id,
            notes.unwrap_or_default()
        );
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
