//! Markdraft - markdown documents with a sync server and a terminal editor.
//!
//! # Usage
//!
//! ```bash
//! markdraft serve --database docs.db
//! markdraft register --email me@example.com --password secret
//! markdraft edit
//! markdraft export notes.md --format html
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use markdraft::auth::{DEFAULT_TOKEN_TTL_DAYS, LoginRequest, RegisterRequest};
use markdraft::client::{
    AuthClient, DEFAULT_API_URL, DocumentService, HttpDocumentService, ServiceError, Session,
    clear_session, load_session, save_session,
};
use markdraft::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags, session_path,
};
use markdraft::document::DocumentId;
use markdraft::export::{
    Delivery, ExportFormat, ExportRequest, describe, export, open_in_browser, write_artifact,
};
use markdraft::server::{self, DEFAULT_CORS_ORIGIN, DEFAULT_PORT, ServerConfig};
use markdraft::sync::{DEFAULT_AUTOSAVE_MS, SyncDriver};
use markdraft::tui::EditorApp;

/// Markdown documents with a sync server and a terminal editor
#[derive(Parser, Debug)]
#[command(name = "markdraft", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the document API
    #[arg(long, global = true, env = "MARKDRAFT_API_URL", value_name = "URL")]
    api_url: Option<String>,

    /// Idle time before edits are saved automatically
    #[arg(long, global = true, value_name = "MS")]
    autosave_ms: Option<u64>,

    /// Write logs to a file (the editor logs nowhere else)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the document API server
    Serve(ServeArgs),
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the session and revoke its token
    Logout,
    /// List your documents
    List,
    /// Open the terminal editor
    Edit {
        /// Document to open first
        #[arg(value_name = "ID")]
        id: Option<String>,
    },
    /// Export a markdown file or a stored document
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// SQLite database file; in-memory when omitted
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
    /// Allowed front-end origin (repeatable)
    #[arg(long = "cors-origin", value_name = "ORIGIN")]
    cors_origins: Vec<String>,
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_DAYS)]
    token_ttl_days: i64,
}

#[derive(Args, Debug)]
#[command(group(
    clap::ArgGroup::new("source").required(true).args(["file", "document", "public"])
))]
struct ExportArgs {
    /// Markdown file to export
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
    /// One of your documents
    #[arg(long, value_name = "ID")]
    document: Option<String>,
    /// A public document
    #[arg(long, value_name = "ID")]
    public: Option<String>,
    #[arg(long, value_enum, default_value = "html")]
    format: ExportFormat,
    /// Output file or directory
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Do not open print exports in the browser
    #[arg(long)]
    no_open: bool,
}

fn init_tracing(command: &Command, log_file: Option<&Path>) -> Result<()> {
    let default = if matches!(command, Command::Serve(_)) {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else if !matches!(command, Command::Edit { .. }) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    // Parsed values include MARKDRAFT_API_URL, which --save never records
    let effective = file_flags.union(&cli_flags).union(&ConfigFlags {
        api_url: cli.api_url.clone(),
        autosave_ms: cli.autosave_ms,
        log_file: cli.log_file.clone(),
        ..ConfigFlags::default()
    });
    init_tracing(&cli.command, effective.log_file.as_deref())?;

    let api_url = effective
        .api_url
        .clone()
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    match cli.command {
        Command::Serve(args) => serve(args, &effective).await,
        Command::Register {
            email,
            password,
            name,
        } => register(&api_url, RegisterRequest { email, password, name }).await,
        Command::Login { email, password } => login(&api_url, LoginRequest { email, password }).await,
        Command::Logout => logout().await,
        Command::List => list(&api_url).await,
        Command::Edit { id } => {
            let autosave_ms = effective.autosave_ms.unwrap_or(DEFAULT_AUTOSAVE_MS);
            edit(&api_url, id.map(DocumentId::new), autosave_ms).await
        }
        Command::Export(args) => export_command(&api_url, args).await,
    }
}

async fn serve(args: ServeArgs, flags: &ConfigFlags) -> Result<()> {
    let config = ServerConfig {
        host: args
            .host
            .or_else(|| flags.host.clone())
            .unwrap_or_else(|| ServerConfig::default().host),
        port: args.port.or(flags.port).unwrap_or(DEFAULT_PORT),
        database: args.database.or_else(|| flags.database.clone()),
        cors_origins: if args.cors_origins.is_empty() {
            vec![DEFAULT_CORS_ORIGIN.to_string()]
        } else {
            args.cors_origins
        },
        token_ttl_days: args.token_ttl_days,
    };
    if config.database.is_none() {
        tracing::warn!("no --database given; documents live in memory until shutdown");
    }
    server::run(config).await.context("Server error")
}

async fn register(api_url: &str, request: RegisterRequest) -> Result<()> {
    let errors = request.validate();
    if !errors.is_empty() {
        bail!("{}", join_errors(&errors));
    }
    let response = AuthClient::new(api_url)
        .register(&request)
        .await
        .context("Registration failed")?;
    remember(api_url, response.token, response.user)?;
    println!("{}", response.message);
    Ok(())
}

async fn login(api_url: &str, request: LoginRequest) -> Result<()> {
    let errors = request.validate();
    if !errors.is_empty() {
        bail!("{}", join_errors(&errors));
    }
    let response = AuthClient::new(api_url)
        .login(&request)
        .await
        .context("Login failed")?;
    remember(api_url, response.token, response.user)?;
    println!("{}", response.message);
    Ok(())
}

fn join_errors(errors: &[markdraft::document::ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn remember(api_url: &str, token: String, user: markdraft::store::User) -> Result<()> {
    let session = Session {
        api_url: api_url.to_string(),
        token,
        user,
    };
    save_session(&session_path(), &session)
}

async fn logout() -> Result<()> {
    let path = session_path();
    let Some(session) = load_session(&path)? else {
        println!("Not logged in");
        return Ok(());
    };
    if let Err(err) = AuthClient::new(&session.api_url)
        .logout(&session.token)
        .await
    {
        tracing::warn!(error = %err, "server did not revoke the token");
    }
    clear_session(&path)?;
    println!("Logged out {}", session.user.email);
    Ok(())
}

/// The stored session for `api_url`.
fn require_session(api_url: &str) -> Result<Session> {
    match load_session(&session_path())? {
        Some(session) if session.api_url == api_url => Ok(session),
        Some(session) => bail!(
            "Logged in to {} but using {api_url}; run `markdraft login`",
            session.api_url
        ),
        None => bail!("Not logged in; run `markdraft login`"),
    }
}

fn explain(err: ServiceError) -> anyhow::Error {
    match err {
        ServiceError::Unauthorized(_) => {
            anyhow::anyhow!("{err}; run `markdraft login` again")
        }
        other => other.into(),
    }
}

async fn list(api_url: &str) -> Result<()> {
    let session = require_session(api_url)?;
    let service = HttpDocumentService::new(api_url, Some(session.token));
    let documents = service.list().await.map_err(explain)?;
    if documents.is_empty() {
        println!("No documents");
    }
    for summary in documents {
        let visibility = if summary.is_public { "public" } else { "private" };
        println!(
            "{}  {}  {:<7}  {}",
            summary.id,
            summary.updated_at.format("%Y-%m-%d %H:%M"),
            visibility,
            summary.title
        );
    }
    Ok(())
}

async fn edit(api_url: &str, initial: Option<DocumentId>, autosave_ms: u64) -> Result<()> {
    let session = require_session(api_url)?;
    let service: Arc<dyn DocumentService> =
        Arc::new(HttpDocumentService::new(api_url, Some(session.token)));
    tracing::info!(api_url, autosave_ms, "starting editor");
    let driver = SyncDriver::new(service, autosave_ms);
    EditorApp::new(driver, initial).run().await
}

async fn export_command(api_url: &str, args: ExportArgs) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let request = if let Some(path) = &args.file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let title = path
            .file_stem()
            .map_or_else(|| "document".to_string(), |s| s.to_string_lossy().into_owned());
        ExportRequest::new(title, content, today)
    } else if let Some(id) = &args.document {
        let session = require_session(api_url)?;
        let service = HttpDocumentService::new(api_url, Some(session.token));
        let document = service
            .get(&DocumentId::new(id.as_str()))
            .await
            .map_err(explain)?;
        ExportRequest::new(document.title, document.content, today)
    } else if let Some(id) = &args.public {
        let service = HttpDocumentService::new(api_url, None);
        let document = service
            .get_public(&DocumentId::new(id.as_str()))
            .await
            .map_err(explain)?;
        ExportRequest::new(document.title, document.content, today)
    } else {
        bail!("Nothing to export");
    };

    let artifact = export(args.format, &request)?;
    let path = write_artifact(&artifact, args.output.as_deref())?;
    println!("{}", describe(&artifact, &path));
    if artifact.delivery == Delivery::OpenInBrowser && !args.no_open {
        open_in_browser(&path)
            .with_context(|| format!("Failed to open {} in a browser", path.display()))?;
    }
    Ok(())
}
