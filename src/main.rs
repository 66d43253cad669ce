use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use personal_site::captcha::{CaptchaVerifier, RecaptchaVerifier};
use personal_site::config::ServerConfig;
use personal_site::constants::generate_session_secret;
use personal_site::credentials::{get_secret, load_credentials, CredentialType, Credentials};
use personal_site::db::{init_database_schema, open_database_connection};
use personal_site::dedup::DeviceNotificationDeduplicator;
use personal_site::mailer::{Mailer, SmtpMailer};
use personal_site::password::hash_password;
use personal_site::server::{run_server, AppState};
use personal_site::session::SessionManager;
use personal_site::store::Store;
use personal_site::timezone::{self, TimezoneResolution};

type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Personal site backend: sessions, contact form and reminder schedule")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create a login user with a bcrypt-hashed password
    CreateUser {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },
    /// Store the timezone the reminder schedule is evaluated in
    SetTimezone {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// IANA timezone name, e.g. Asia/Shanghai
        timezone: String,
    },
}

fn main() -> Result<(), DynError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let rt = tokio::runtime::Runtime::new()?;

    match args.command {
        Command::Serve { config, port } => rt.block_on(serve(config, port)),
        Command::CreateUser {
            config,
            username,
            password,
        } => rt.block_on(create_user(config, username, password)),
        Command::SetTimezone { config, timezone } => rt.block_on(set_timezone(config, timezone)),
    }
}

async fn open_store(config: &ServerConfig) -> Result<Store, DynError> {
    let pool = open_database_connection(&config.database_path).await?;
    init_database_schema(&pool).await?;
    Ok(Store::new(pool))
}

/// Secret for a credential profile, or None when no profile is configured
fn profile_secret(
    credentials: &Option<Credentials>,
    cred_type: CredentialType,
    profile: Option<&str>,
) -> Result<Option<String>, DynError> {
    match profile {
        Some(profile) => Ok(Some(get_secret(credentials, cred_type, profile)?)),
        None => Ok(None),
    }
}

async fn serve(config_path: PathBuf, port_override: Option<u16>) -> Result<(), DynError> {
    let config = ServerConfig::load(&config_path)?;
    let credentials = load_credentials()?;
    let port = port_override.unwrap_or(config.api_port);

    let session_secret = match profile_secret(
        &credentials,
        CredentialType::Session,
        config.session.credential_profile.as_deref(),
    )? {
        Some(secret) => secret,
        None => {
            warn!("No session secret configured; using a random one, sessions end on restart");
            generate_session_secret()
        }
    };
    let sessions = SessionManager::new(
        &session_secret,
        &config.session.cookie_name,
        config.session.ttl_seconds,
    );

    let recaptcha_secret = profile_secret(
        &credentials,
        CredentialType::Recaptcha,
        config.recaptcha.credential_profile.as_deref(),
    )?;
    if recaptcha_secret.is_none() {
        warn!("No reCAPTCHA secret configured; captcha-protected requests will fail");
    }
    let captcha: Arc<dyn CaptchaVerifier> = Arc::new(RecaptchaVerifier::new(recaptcha_secret));

    let mailer: Option<Arc<dyn Mailer>> = match &config.smtp {
        Some(smtp) => {
            let password = get_secret(&credentials, CredentialType::Smtp, &smtp.credential_profile)?;
            let mailer = SmtpMailer::new(
                &smtp.host,
                smtp.port,
                &smtp.username,
                &password,
                &smtp.mail_to,
            )?;
            Some(Arc::new(mailer))
        }
        None => None,
    };

    let store = open_store(&config).await?;
    // Self-heal the stored timezone at startup so the first request does not have to
    let stored_timezone = store.load_timezone(&config.reminder.default_timezone).await?;
    info!("Reminder schedule timezone: {}", stored_timezone);

    let state = Arc::new(AppState {
        store,
        sessions,
        dedup: DeviceNotificationDeduplicator::new(),
        captcha,
        mailer,
        recaptcha_site_key: config.recaptcha.site_key.clone(),
        login_captcha_required: config.recaptcha.login_required,
        default_timezone: config.reminder.default_timezone.clone(),
        app_name: config.app_name.clone(),
        app_version: config.app_version.clone(),
    });

    run_server(state, port, &config.cors_allow_origins, &config.database_path).await
}

async fn create_user(config_path: PathBuf, username: String, password: String) -> Result<(), DynError> {
    let config = ServerConfig::load(&config_path)?;
    let username = username.trim();
    if username.is_empty() || password.trim().is_empty() {
        return Err("username and password are required".into());
    }

    let store = open_store(&config).await?;
    let hashed = hash_password(&password)?;
    let id = store.create_user(username, &hashed).await?;
    println!("Created user '{}' with id {}", username, id);
    Ok(())
}

async fn set_timezone(config_path: PathBuf, timezone_name: String) -> Result<(), DynError> {
    let config = ServerConfig::load(&config_path)?;
    let name = match timezone::resolve(&timezone_name) {
        TimezoneResolution::Resolved { name, .. } => name,
        TimezoneResolution::Fallback { requested, reason } => {
            return Err(format!("Cannot use timezone '{}': {}", requested, reason).into());
        }
    };

    let store = open_store(&config).await?;
    store.set_timezone(&name).await?;
    println!("Reminder schedule timezone set to {}", name);
    Ok(())
}
