use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use defectscope_lib::api::{ApiClient, DEFAULT_RECENT_DEFECTS, DEFAULT_TREND_DAYS};
use defectscope_lib::logging::Logger;
use defectscope_lib::settings::parse_settings;
use defectscope_lib::state::{default_secret_store, AuthState, SessionManager};
use defectscope_lib::types::DefectInputData;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "defectscope", version, about = "Defect-tracking client")]
struct Cli {
    /// Settings file (TOML). Missing files fall back to defaults.
    #[arg(long)]
    settings: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "DEFECTSCOPE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the signed-in user.
    Whoami,
    /// Sign out and forget stored tokens.
    Logout,
    Stats,
    Defects {
        #[arg(long, default_value_t = DEFAULT_RECENT_DEFECTS)]
        limit: u32,
    },
    /// Submit a defect report read from a JSON file.
    Report {
        file: PathBuf,
    },
    Machines,
    Kpis,
    Summary,
    Trends {
        #[arg(long, default_value_t = DEFAULT_TREND_DAYS)]
        days: u32,
    },
    MachineStatus,
    /// Ask the assistant a question.
    Ask {
        question: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();
    let settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_filter(&settings.log.filter)?;
    tracing::debug!(?settings, "settings loaded");

    let store = default_secret_store(&settings.session.keyring_service);
    let session = SessionManager::new(store, &settings.api.normalized_base_url())?;
    let api = Arc::new(ApiClient::new(&settings.api, session)?);
    let auth = AuthState::new(api.clone(), settings.session.user_fetch_timeout());

    match cli.command {
        Command::Login { username, password } => {
            auth.login(&username, &password).await?;
            match auth.snapshot().user {
                Some(user) => print_json(&user)?,
                None => bail!("signed in, but the user profile could not be loaded"),
            }
        }
        Command::Whoami => {
            auth.initialize().await;
            match auth.snapshot().user {
                Some(user) => print_json(&user)?,
                None => bail!("not signed in; run `defectscope login`"),
            }
        }
        Command::Logout => auth.logout().await,
        Command::Stats => print_json(&api.dashboard_stats().await?)?,
        Command::Defects { limit } => print_json(&api.recent_defects(limit).await?)?,
        Command::Report { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let data: DefectInputData = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;
            print_json(&api.create_defect_report(&data).await?)?;
        }
        Command::Machines => print_json(&api.machines().await?)?,
        Command::Kpis => print_json(&api.manufacturing_kpis().await?)?,
        Command::Summary => print_json(&api.executive_summary().await?)?,
        Command::Trends { days } => print_json(&api.defect_trends(days).await?)?,
        Command::MachineStatus => print_json(&api.machine_status().await?)?,
        Command::Ask { question } => print_json(&api.send_chat_message(&question, &[]).await?)?,
    }

    Ok(())
}
