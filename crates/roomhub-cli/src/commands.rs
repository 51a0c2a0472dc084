//! Subcommands and their output.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Subcommand;
use tracing::warn;

use roomhub_core::auth::{GuardDecision, Route};
use roomhub_core::filter::{ApplicationFilter, RoomFilter};
use roomhub_core::models::ApplicationStatus;
use roomhub_core::service::{ApplicationView, RoomView};
use roomhub_core::utils::truncate_string;
use roomhub_core::{App, Config};

/// Width of the title column in listings
const TITLE_WIDTH: usize = 28;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account (does not log in)
    Register {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long, env = "ROOMHUB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log in and remember the session
    Login {
        /// Defaults to the last email used
        #[arg(long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(long, env = "ROOMHUB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// List rooms
    Rooms {
        /// Address or title contains this text
        #[arg(long)]
        location: Option<String>,
        /// Maximum monthly rent
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        postcode: Option<String>,
        /// Also look up the distance to campus for each room
        #[arg(long)]
        distance: bool,
    },

    /// Show one room
    Room { room_id: String },

    /// List your applications
    Applications {
        /// applied, pending, accepted, rejected or cancelled
        #[arg(long, value_parser = parse_status)]
        status: Option<ApplicationStatus>,
        /// Day the application was made (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Room address or title contains this text
        #[arg(long)]
        location: Option<String>,
    },

    /// Apply for a room
    Apply { room_id: String },

    /// Cancel your application for a room
    Cancel {
        room_id: Option<String>,
        /// Cancel by application id instead of room id
        #[arg(long, conflicts_with = "room_id")]
        application: Option<String>,
    },

    /// Look up coordinates for a postcode
    Geocode { postcode: String },

    /// Distance from a room to campus
    Distance { room_id: String },
}

impl Command {
    /// The view this command stands for; protected views need a login.
    fn route(&self) -> Route {
        match self {
            Command::Register { .. } => Route::Register,
            Command::Login { .. } | Command::Logout | Command::Whoami => Route::Login,
            Command::Rooms { .. } | Command::Room { .. } | Command::Apply { .. } => Route::Rooms,
            Command::Applications { .. } | Command::Cancel { .. } => Route::Applications,
            Command::Geocode { .. } | Command::Distance { .. } => Route::Home,
        }
    }
}

fn parse_status(s: &str) -> Result<ApplicationStatus, String> {
    match ApplicationStatus::parse(s) {
        ApplicationStatus::Other(other) => Err(format!("unknown status '{}'", other)),
        status => Ok(status),
    }
}

/// Refuse protected commands without a session.
fn require(app: &App, route: Route) -> Result<()> {
    match app.session.guard().check(route, ()) {
        GuardDecision::Render(()) => Ok(()),
        GuardDecision::Redirect(to) => bail!("Not logged in ({} requires login, go to {}). Run `roomhub login`.", route, to),
        GuardDecision::Pending => bail!("Session not loaded yet"),
    }
}

pub async fn run(app: &mut App, command: Command) -> Result<()> {
    require(app, command.route())?;

    match command {
        Command::Register { email, password } => {
            let password = password_or_prompt(password)?;
            let result = app.session.register(&email, &password).await?;
            println!(
                "Registered {}. Run `roomhub login` to sign in.",
                result.email().unwrap_or(&email)
            );
        }

        Command::Login { email, password } => {
            let email = match email {
                Some(email) => email,
                None => prompt_email(app.config.last_email.as_deref())?,
            };
            let password = password_or_prompt(password)?;
            let session = app.session.login(&email, &password).await?;
            remember_email(&email);
            println!("Login successful - {}", session);
        }

        Command::Logout => {
            let was = app.session.current();
            app.session.logout()?;
            match was.and_then(|s| s.principal().map(str::to_string)) {
                Some(principal) => println!("Logged out {}", principal),
                None => println!("Not logged in"),
            }
        }

        Command::Whoami => match app.session.current() {
            Some(session) => println!("{} ({})", session, app.session.storage_location()),
            None => println!("Session not loaded"),
        },

        Command::Rooms {
            location,
            max_price,
            postcode,
            distance,
        } => {
            let filter = RoomFilter {
                location,
                max_price,
                postcode,
            };
            let views = app.rooms.rooms_with_status(&mut app.session, &filter).await?;
            if views.is_empty() {
                println!("No rooms found.");
                return Ok(());
            }

            let distances = if distance {
                let rooms: Vec<_> = views.iter().map(|v| v.room.clone()).collect();
                app.rooms
                    .distances(&rooms)
                    .await
                    .into_iter()
                    .map(|(room, result)| match result {
                        Ok(d) => d.display(),
                        Err(e) => {
                            warn!(room_id = %room.id, error = %e, "Distance lookup failed");
                            "-".to_string()
                        }
                    })
                    .collect()
            } else {
                Vec::new()
            };

            for (i, view) in views.iter().enumerate() {
                println!("{}", room_line(view, distances.get(i).map(String::as_str)));
            }
        }

        Command::Room { room_id } => {
            let room = app.rooms.room(&room_id).await?;
            println!("{}", room.headline());
            println!("  {}", room.display_price());
            println!("  {}, {}", room.address, room.postcode);
            println!("  {}", room.display_description());
        }

        Command::Applications { status, date, location } => {
            let filter = ApplicationFilter { status, date, location };
            let views = app.rooms.applications(&mut app.session, &filter).await?;
            if views.is_empty() {
                println!("No applications found.");
            }
            for view in &views {
                println!("{}", application_line(view));
            }
        }

        Command::Apply { room_id } => {
            let application = app.rooms.apply(&mut app.session, &room_id).await?;
            println!(
                "Applied for room {} - status {} (application {})",
                application.room_id,
                application.status.label(),
                application.id
            );
        }

        Command::Cancel { room_id, application } => {
            let cancelled = match (application, room_id) {
                (Some(application_id), _) => app.rooms.cancel(&mut app.session, &application_id).await?,
                (None, Some(room_id)) => app.rooms.cancel_for_room(&mut app.session, &room_id).await?,
                (None, None) => bail!("Give a room id or --application <id>"),
            };
            println!("Application {} is now {}", cancelled.id, cancelled.status.label());
        }

        Command::Geocode { postcode } => {
            let coordinates = app.rooms.geocode(&postcode).await?;
            println!("{}", coordinates.display());
        }

        Command::Distance { room_id } => {
            let distance = app.rooms.distance(&room_id).await?;
            println!("{}", distance.display());
        }
    }

    Ok(())
}

fn room_line(view: &RoomView, distance: Option<&str>) -> String {
    let room = &view.room;
    let mut line = format!(
        "{:<10} {:<width$} {:>10}  {:<9} {}",
        room.id,
        truncate_string(room.headline(), TITLE_WIDTH),
        room.display_price(),
        room.postcode,
        room.address,
        width = TITLE_WIDTH
    );
    if let Some((status, _)) = &view.application {
        line.push_str(&format!("  [{}]", status.label()));
    }
    if let Some(distance) = distance {
        line.push_str(&format!("  {}", distance));
    }
    line
}

fn application_line(view: &ApplicationView) -> String {
    let application = &view.application;
    let room = view
        .room
        .as_ref()
        .map(|r| truncate_string(r.headline(), TITLE_WIDTH))
        .unwrap_or_else(|| format!("room {}", application.room_id));
    format!(
        "{:<10} {}  {:<10} {}",
        application.id,
        application.applied_on(),
        application.status.label(),
        room
    )
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => rpassword::prompt_password("Password: ").context("Failed to read password"),
    }
}

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), last) {
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("Email required"),
        (false, _) => Ok(input.to_string()),
    }
}

/// Record the email for the next login prompt. Loads the file without
/// environment overrides so they are not persisted.
fn remember_email(email: &str) {
    let result = Config::config_path().and_then(|path| {
        let mut config = Config::load_from(&path)?;
        config.last_email = Some(email.to_string());
        config.save_to(&path)
    });
    if let Err(e) = result {
        warn!(error = %e, "Failed to save config");
    }
}
