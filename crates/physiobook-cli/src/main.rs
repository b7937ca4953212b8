//! physiobook - command-line patient client for the booking platform.
//!
//! Sign in, browse physiotherapists, request and decide appointments,
//! top up the wallet and review transactions from a terminal. Every
//! protected command gates on the startup bootstrap reaching a settled
//! auth state first.

mod app;

use anyhow::Result;
use physiobook_core::config::Config;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

const USAGE: &str = "physiobook - patient client for the physiotherapy booking platform

Usage: physiobook <command> [args]

Commands:
  login                     Sign in with email or phone
  signup                    Create an account and sign in
  logout                    Sign out on the server and locally
  whoami                    Show the signed-in patient and wallet balance
  physios                   List physiotherapists
  physio <id>               Show one physiotherapist with booking slots
  book <id> <date> <time>   Request an appointment (YYYY-MM-DD HH:MM)
  bookings                  List your appointments
  accept <booking-id>       Accept a proposed appointment (paid from wallet)
  reject <booking-id>       Reject a proposed appointment
  topup <amount>            Top up the wallet (minimum 100)
  transactions              Show wallet transactions
  set-name <name>           Update your display name
  overview                  Profile, appointments and transactions at once
";

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=debug); logs also go
/// to a daily-rolled file under the app data directory.
fn init_tracing(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = config.log_dir().ok().and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        let appender = tracing_appender::rolling::daily(dir, "physiobook.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        Some((fmt::layer().with_writer(writer).with_ansi(false), guard))
    });

    match file_layer {
        Some((layer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().unwrap_or_default();
    let _log_guard = init_tracing(&config);
    info!("physiobook starting");

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        print!("{}", USAGE);
        return Ok(());
    };

    let mut app = App::new(config)?;

    match command.as_str() {
        "login" => app.login().await,
        "signup" => app.signup().await,
        "logout" => app.logout().await,
        "whoami" => app.whoami().await,
        "physios" => app.list_physiotherapists().await,
        "physio" => app.show_physiotherapist(arg(&args, 2, "physio <id>")?).await,
        "book" => {
            app.book(
                arg(&args, 2, "book <id> <date> <time>")?,
                arg(&args, 3, "book <id> <date> <time>")?,
                arg(&args, 4, "book <id> <date> <time>")?,
            )
            .await
        }
        "bookings" => app.list_bookings().await,
        "accept" => app.accept_booking(arg(&args, 2, "accept <booking-id>")?).await,
        "reject" => app.reject_booking(arg(&args, 2, "reject <booking-id>")?).await,
        "topup" => app.top_up(arg(&args, 2, "topup <amount>")?).await,
        "transactions" => app.list_transactions().await,
        "set-name" => {
            let name = args[2..].join(" ");
            app.set_name(name.trim()).await
        }
        "overview" => app.overview().await,
        _ => {
            print!("{}", USAGE);
            anyhow::bail!("Unknown command: {}", command);
        }
    }
}

fn arg<'a>(args: &'a [String], index: usize, usage: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("Usage: physiobook {}", usage))
}
