use std::io::{self, Write};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use costar::config::{ConnectionSettings, Settings};
use costar::persist::SqliteSession;
use costar::run::run;
use costar::Result;

// Enter keeps whatever the configuration already holds.
fn prompt(label: &str, current: &str, shown: &str) -> Result<String> {
    if shown.is_empty() {
        print!("Enter {label}: ");
    } else {
        print!("Enter {label} [{shown}]: ");
    }
    io::stdout().flush()?;
    let mut entered = String::new();
    io::stdin().read_line(&mut entered)?;
    let entered = entered.trim();
    if entered.is_empty() {
        Ok(current.to_string())
    } else {
        Ok(entered.to_string())
    }
}

fn prompt_connection(configured: &ConnectionSettings) -> Result<ConnectionSettings> {
    let host = prompt("host name", &configured.host, &configured.host)?;
    let database = prompt("database name", &configured.database, &configured.database)?;
    let username = prompt("username", &configured.username, &configured.username)?;
    let masked = if configured.password.is_empty() { "" } else { "configured" };
    let password = prompt("password", &configured.password, masked)?;
    Ok(ConnectionSettings {
        host,
        database,
        username,
        password,
    })
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(mut settings: Settings) -> Result<()> {
    settings.connection = prompt_connection(&settings.connection)?;
    let mut session = SqliteSession::open(&settings.connection)?;
    let report = run(&mut session, &settings)?;
    println!("{report}");
    Ok(())
}

fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&settings.logging.level);
    match execute(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
