//! Command implementations for the physiobook CLI.
//!
//! `App` owns the wired-up session lifecycle: the encrypted store, the
//! auth state container, the API client with its middleware pipeline and
//! the bootstrap sequencer. Each public method is one CLI command.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use physiobook_core::api::{ApiClient, ApiError, BearerAuth, HttpClient, Identifier, SessionGuard};
use physiobook_core::auth::{
    teardown, AuthState, Bootstrap, BootstrapOutcome, SessionStore, SessionValidator,
};
use physiobook_core::config::Config;
use physiobook_core::models::booking::BOOKING_TIME_FORMAT;
use physiobook_core::models::{BookingRequest, DecisionRequest, PatientUpdate, Physiotherapist};
use physiobook_core::nav::{Navigator, Route};
use physiobook_core::schedule;
use physiobook_core::store::SecureStore;

/// Maximum concurrent detail requests when enriching the provider list.
/// Limits parallel requests to avoid overwhelming the server.
const MAX_CONCURRENT_REQUESTS: usize = 5;

/// Navigator for a terminal frontend: there is nothing to render, so a
/// route change is just remembered and logged. Replacing with the current
/// route is a no-op, which keeps duplicate redirects harmless.
#[derive(Default)]
pub struct TerminalNavigator {
    current: Mutex<Option<Route>>,
}

impl Navigator for TerminalNavigator {
    fn replace(&self, route: Route) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if *current == Some(route) {
            debug!(%route, "Already at route");
            return;
        }
        info!(%route, "Navigating");
        *current = Some(route);
    }
}

pub struct App {
    config: Config,
    state: Arc<AuthState>,
    sessions: SessionStore,
    api: ApiClient,
    bootstrap: Bootstrap,
    navigator: Arc<TerminalNavigator>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let base_url = config.backend_url();
        debug!(%base_url, "Configuring API client");

        let data_dir = config.data_dir()?;
        let store = Arc::new(
            SecureStore::open(data_dir).context("Failed to open the session vault")?,
        );
        let sessions = SessionStore::new(store);
        let state = Arc::new(AuthState::new());
        let navigator = Arc::new(TerminalNavigator::default());

        let mut http = HttpClient::new(base_url.as_str())?;
        http.layer_request(Arc::new(BearerAuth::new(sessions.clone())));
        http.layer_response(Arc::new(SessionGuard::new(
            sessions.clone(),
            state.clone(),
            navigator.clone(),
        )));
        let api = ApiClient::new(http);

        let validator = Arc::new(SessionValidator::new(base_url));
        let bootstrap = Bootstrap::new(sessions.clone(), validator, state.clone());

        Ok(Self {
            config,
            state,
            sessions,
            api,
            bootstrap,
            navigator,
        })
    }

    /// Run the startup bootstrap and require a signed-in session.
    async fn ensure_session(&self) -> Result<()> {
        match self.bootstrap.run().await {
            BootstrapOutcome::Authenticated => {
                self.navigator.replace(Route::Home);
                Ok(())
            }
            BootstrapOutcome::SignedOut => {
                self.navigator.replace(Route::SignIn);
                anyhow::bail!("Not signed in. Run `physiobook login` first.")
            }
        }
    }

    // =========================================================================
    // Authentication commands
    // =========================================================================

    pub async fn login(&mut self) -> Result<()> {
        let identifier = self.prompt_identifier()?;
        let password = rpassword::prompt_password("Password: ")?;

        self.state.set_loading(true);
        match self.api.authenticate(identifier.as_str(), &password).await {
            Ok(record) => {
                if let Err(e) = self.sessions.save(&record).await {
                    warn!(error = %e, "Failed to persist session");
                }
                self.config.last_identifier = Some(identifier.as_str().to_string());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                let name = record.patient.display_name().to_string();
                let wallet = record.patient.wallet;
                self.state.login(record.patient);
                self.navigator.replace(Route::Home);

                println!("Signed in as {} (wallet ₹{:.2})", name, wallet);
                Ok(())
            }
            Err(e) => {
                let message = Self::login_error_message(&e);
                self.state.set_error(message.clone());
                anyhow::bail!(message)
            }
        }
    }

    pub async fn signup(&mut self) -> Result<()> {
        let identifier = self.prompt_identifier()?;
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            anyhow::bail!("Passwords do not match");
        }

        self.state.set_loading(true);
        let message = self
            .api
            .register(&identifier, &password)
            .await
            .map_err(|e| anyhow::anyhow!(Self::login_error_message(&e)))?;
        println!("{}", message);

        // Accounts are signed in immediately after registration
        match self.api.authenticate(identifier.as_str(), &password).await {
            Ok(record) => {
                if let Err(e) = self.sessions.save(&record).await {
                    warn!(error = %e, "Failed to persist session");
                }
                self.config.last_identifier = Some(identifier.as_str().to_string());
                let _ = self.config.save();

                let name = record.patient.display_name().to_string();
                self.state.login(record.patient);
                self.navigator.replace(Route::Home);
                println!("Signed in as {}", name);
                Ok(())
            }
            Err(e) => {
                let message = Self::login_error_message(&e);
                self.state.set_error(message.clone());
                anyhow::bail!("Account created, but sign-in failed: {}", message)
            }
        }
    }

    pub async fn logout(&mut self) -> Result<()> {
        teardown::sign_out(
            &self.api,
            &self.sessions,
            &self.state,
            self.navigator.as_ref(),
            true,
        )
        .await;
        println!("Logged out successfully");
        Ok(())
    }

    pub async fn whoami(&self) -> Result<()> {
        self.ensure_session().await?;

        let snapshot = self.state.snapshot();
        let patient = snapshot
            .patient
            .context("Signed in but no patient in state")?;

        println!("{}", patient.display_name());
        println!("  id:      {}", patient.id);
        if let Some(ref email) = patient.email {
            println!("  email:   {}", email);
        }
        if let Some(ref phone) = patient.phone {
            println!("  phone:   {}", phone);
        }
        println!("  wallet:  ₹{:.2}", patient.wallet);
        Ok(())
    }

    pub async fn set_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            anyhow::bail!("Usage: physiobook set-name <name>");
        }
        self.ensure_session().await?;

        let current = self
            .state
            .snapshot()
            .patient
            .and_then(|p| p.name)
            .unwrap_or_default();
        if current.trim() == name {
            println!("No changes to name detected");
            return Ok(());
        }

        let message = self.api.update_display_name(name).await?;
        self.state.update_patient(&PatientUpdate::name(name));
        println!("{}", message);
        Ok(())
    }

    // =========================================================================
    // Physiotherapists
    // =========================================================================

    pub async fn list_physiotherapists(&self) -> Result<()> {
        self.ensure_session().await?;

        let physios = self
            .api
            .fetch_physiotherapists()
            .await
            .context("Failed to fetch physiotherapists")?;
        if physios.is_empty() {
            println!("No physiotherapists available right now");
            return Ok(());
        }

        // The list endpoint returns summary cards; fill in ratings with a
        // bounded number of parallel detail requests.
        let detailed = self.enrich_physiotherapists(physios).await;

        println!("{:<10} {:<28} {:<20} {:>8} {:>7}", "ID", "NAME", "SPECIALIZATION", "FEE", "RATING");
        for physio in &detailed {
            println!(
                "{:<10} {:<28} {:<20} {:>8} {:>7}",
                physio.id,
                physio.display_name(),
                physio.specialization.as_deref().unwrap_or("General"),
                physio
                    .consultation_fee
                    .map(|f| format!("₹{:.0}", f))
                    .unwrap_or_else(|| "-".to_string()),
                physio
                    .rating
                    .map(|r| format!("{:.1}", r))
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        Ok(())
    }

    async fn enrich_physiotherapists(&self, physios: Vec<Physiotherapist>) -> Vec<Physiotherapist> {
        let api = self.api.clone();
        stream::iter(physios)
            .map(|summary| {
                let api = api.clone();
                async move {
                    match api.fetch_physiotherapist(&summary.id).await {
                        Ok(detail) => detail,
                        Err(e) => {
                            debug!(id = %summary.id, error = %e, "Detail fetch failed, keeping summary");
                            summary
                        }
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .collect()
            .await
    }

    pub async fn show_physiotherapist(&self, id: &str) -> Result<()> {
        self.ensure_session().await?;

        let physio = self
            .api
            .fetch_physiotherapist(id)
            .await
            .context("Failed to fetch physiotherapist details")?;

        println!("{}", physio.summary());
        if let Some(years) = physio.experience_years {
            println!("  experience: {} years", years);
        }
        if let Some(rating) = physio.rating {
            println!("  rating:     {:.1}/5", rating);
        }
        if let Some(ref bio) = physio.bio {
            println!("  {}", bio);
        }

        let now = Local::now().naive_local();
        println!("\nNext available days:");
        for date in schedule::upcoming_dates(now.date()) {
            let slots = schedule::available_slots(date, now);
            if let (Some(first), Some(last)) = (slots.first(), slots.last()) {
                println!(
                    "  {}  {} slots ({} - {})",
                    date.format("%a %b %d"),
                    slots.len(),
                    first.format("%H:%M"),
                    last.format("%H:%M"),
                );
            }
        }
        Ok(())
    }

    // =========================================================================
    // Bookings
    // =========================================================================

    pub async fn book(&self, id: &str, date: &str, time: &str) -> Result<()> {
        self.ensure_session().await?;

        let date: NaiveDate = date
            .parse()
            .context("Date must look like 2026-08-14")?;
        let time = NaiveTime::parse_from_str(time, "%H:%M").context("Time must look like 09:30")?;
        let start: NaiveDateTime = date.and_time(time);

        schedule::validate_appointment_time(start, Local::now().naive_local())?;

        let physio = self
            .api
            .fetch_physiotherapist(id)
            .await
            .context("Failed to fetch physiotherapist details")?;

        let request = BookingRequest {
            physiotherapist_user_id: physio.physiotherapist_user_id.clone(),
            date_time: start.format(BOOKING_TIME_FORMAT).to_string(),
        };
        let booking = self
            .api
            .create_booking(&request)
            .await
            .context("Failed to create booking")?;

        println!(
            "Appointment request {} created with {} for {}",
            booking.id,
            physio.display_name(),
            start.format("%a %b %d at %H:%M"),
        );
        println!("You will be able to accept it once the physiotherapist confirms.");
        Ok(())
    }

    pub async fn list_bookings(&self) -> Result<()> {
        self.ensure_session().await?;

        let bookings = self
            .api
            .fetch_bookings()
            .await
            .context("Failed to load appointments")?;
        if bookings.is_empty() {
            println!("No appointments yet");
            return Ok(());
        }

        println!("{:<12} {:<18} {:<10} {:>8}", "ID", "WHEN", "STATUS", "AMOUNT");
        for booking in &bookings {
            let when = booking
                .start_time()
                .map(|t| t.format("%b %d %H:%M").to_string())
                .or_else(|| booking.date_time.clone())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<12} {:<18} {:<10} {:>8}",
                booking.id,
                when,
                booking.status.to_string(),
                booking
                    .amount
                    .map(|a| format!("₹{:.0}", a))
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        Ok(())
    }

    pub async fn accept_booking(&self, booking_id: &str) -> Result<()> {
        self.ensure_session().await?;

        // Accepting pays from the wallet, so the decision carries the
        // amount the server quoted on the booking.
        let bookings = self.api.fetch_bookings().await?;
        let booking = bookings
            .iter()
            .find(|b| b.id == booking_id)
            .with_context(|| format!("No booking with id {}", booking_id))?;
        let amount = booking.amount.unwrap_or(0.0);

        let message = self
            .api
            .decide_booking(&DecisionRequest::accept(booking_id, amount))
            .await
            .context("Failed to accept booking")?;
        println!("{}", message);
        Ok(())
    }

    pub async fn reject_booking(&self, booking_id: &str) -> Result<()> {
        self.ensure_session().await?;

        let message = self
            .api
            .decide_booking(&DecisionRequest::reject(booking_id))
            .await
            .context("Failed to reject booking")?;
        println!("{}", message);
        Ok(())
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    pub async fn top_up(&self, amount: &str) -> Result<()> {
        self.ensure_session().await?;

        let amount: f64 = amount.parse().context("Amount must be a number")?;
        let receipt = self.api.top_up_wallet(amount).await?;

        self.state
            .update_patient(&PatientUpdate::wallet(receipt.wallet_balance));
        println!("Wallet topped up. New balance: ₹{:.2}", receipt.wallet_balance);
        Ok(())
    }

    pub async fn list_transactions(&self) -> Result<()> {
        self.ensure_session().await?;

        let transactions = self
            .api
            .fetch_transactions()
            .await
            .context("Failed to load transactions")?;
        if transactions.is_empty() {
            println!("No transactions yet");
            return Ok(());
        }

        println!("{:<12} {:>10} {:<10} {:<12}", "ID", "AMOUNT", "TYPE", "STATUS");
        for txn in &transactions {
            println!(
                "{:<12} {:>10} {:<10} {:<12}",
                txn.id,
                format!("₹{:.2}", txn.amount),
                txn.kind.as_deref().unwrap_or("-"),
                txn.status.as_deref().unwrap_or("-"),
            );
        }
        Ok(())
    }

    // =========================================================================
    // Overview
    // =========================================================================

    /// Profile, appointments and transactions fetched concurrently
    pub async fn overview(&self) -> Result<()> {
        self.ensure_session().await?;

        let (user_res, bookings_res, txns_res) = tokio::join!(
            self.api.fetch_current_user(),
            self.api.fetch_bookings(),
            self.api.fetch_transactions(),
        );

        match user_res {
            Ok(patient) => {
                println!("{} - wallet ₹{:.2}", patient.display_name(), patient.wallet);
            }
            Err(e) => warn!(error = %e, "Profile fetch failed"),
        }

        match bookings_res {
            Ok(bookings) => println!("Appointments: {}", bookings.len()),
            Err(e) => warn!(error = %e, "Bookings fetch failed"),
        }

        match txns_res {
            Ok(txns) => println!("Transactions: {}", txns.len()),
            Err(e) => warn!(error = %e, "Transactions fetch failed"),
        }
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn prompt_identifier(&self) -> Result<Identifier> {
        let prompt = match self.config.last_identifier {
            Some(ref last) => format!("Email or phone [{}]: ", last),
            None => "Email or phone: ".to_string(),
        };
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        let raw = if input.is_empty() {
            self.config
                .last_identifier
                .clone()
                .context("Email or phone is required")?
        } else {
            input.to_string()
        };

        Ok(Identifier::parse(&raw)?)
    }

    /// Map API failures to the messages shown on the sign-in screen
    fn login_error_message(error: &ApiError) -> String {
        match error {
            ApiError::Unauthorized => "Invalid username or password".to_string(),
            ApiError::Rejected(msg) | ApiError::Validation(msg) => msg.clone(),
            ApiError::NetworkError(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            other => format!("Unable to login: {}", other),
        }
    }
}
