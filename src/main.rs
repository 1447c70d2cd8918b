use clap::{Parser, Subcommand};
use dialoguer::Password;
use mimalloc::MiMalloc;
use neatify_staff::auth::{AuthHandshake, Identity, IdentityProvider};
use neatify_staff::config::Config;
use neatify_staff::device::TerminalPin;
use neatify_staff::staff::{BookingId, StaffBookings, StaffProfiles, maps_search_url};
use neatify_staff::{SupabaseAuth, SupabaseClient};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "neatify-staff", version, about = "Neatify staff client")]
struct Cli {
    /// Staff account email.
    #[arg(long, env = "NEATIFY_EMAIL")]
    email: String,

    /// Account password; prompted for when not set.
    #[arg(long, env = "NEATIFY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and verify this device, then sign out again.
    Login,
    /// List bookings assigned to you.
    Bookings,
    /// Count assigned bookings you have not opened yet.
    Unread,
    /// Mark one assigned booking as viewed.
    MarkViewed { id: String },
    /// Show your profile.
    Profile,
    UpdateProfile {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        phone: String,
    },
    /// Upload a JPEG as your avatar.
    UploadAvatar { file: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        supabase_url = %cfg.supabase_url,
        loglevel = %cfg.loglevel,
        device_pin = cfg.device_pin.is_some()
    );

    match run(cli, cfg).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, cfg: Config) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let client = SupabaseClient::new(&cfg)?;
    let provider = Arc::new(SupabaseAuth::new(client.clone()));
    let handshake = AuthHandshake::with_prompt(
        provider.clone(),
        TerminalPin::new(cfg.device_pin.clone()),
        cfg.prompt.clone(),
    );

    let password = match cli.password {
        Some(p) => p,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let session = match handshake.authenticate(&cli.email, &password).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}: {}", e.title(), e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };
    let Some(identity) = session.identity() else {
        return Ok(ExitCode::FAILURE);
    };

    let outcome = execute(cli.command, identity, client, &cfg).await;

    if let Err(e) = provider.sign_out().await {
        warn!(error = %e, "sign-out after command failed");
    }
    outcome?;
    Ok(ExitCode::SUCCESS)
}

async fn execute(
    command: Command,
    identity: &Identity,
    client: SupabaseClient,
    cfg: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Login => println!("Signed in as {}", identity.email),
        Command::Bookings => {
            let bookings = StaffBookings::new(client).assigned(identity).await?;
            if bookings.is_empty() {
                println!("No assigned services");
            }
            for booking in bookings {
                println!("{booking}");
                let address = booking.full_address.as_deref().unwrap_or_default();
                match maps_search_url(&cfg.maps_base_url, address) {
                    Some(url) => println!("  Navigate: {url}\n"),
                    None => println!("  Navigate: Address not available\n"),
                }
            }
        }
        Command::Unread => {
            let count = StaffBookings::new(client).unviewed_count(identity).await?;
            println!("{count}");
        }
        Command::MarkViewed { id } => {
            let id = id
                .parse::<i64>()
                .map(BookingId::Int)
                .unwrap_or(BookingId::Text(id));
            StaffBookings::new(client).mark_viewed(identity, &id).await?;
        }
        Command::Profile => {
            let profile = StaffProfiles::new(client, cfg.avatar_bucket.clone())
                .load(identity)
                .await?;
            println!("Name:   {}", profile.full_name.unwrap_or_default());
            println!("Email:  {}", identity.email);
            println!("Phone:  {}", profile.phone.unwrap_or_default());
            println!("Avatar: {}", profile.avatar_url.unwrap_or_default());
        }
        Command::UpdateProfile { full_name, phone } => {
            StaffProfiles::new(client, cfg.avatar_bucket.clone())
                .update(identity, &full_name, &phone)
                .await?;
            println!("Profile updated");
        }
        Command::UploadAvatar { file } => {
            let jpeg = tokio::fs::read(&file).await?;
            let url = StaffProfiles::new(client, cfg.avatar_bucket.clone())
                .upload_avatar(identity, jpeg)
                .await?;
            println!("{url}");
        }
    }
    Ok(())
}
