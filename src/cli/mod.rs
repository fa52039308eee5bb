#![forbid(unsafe_code)]

use std::process::ExitCode;

use clap::{CommandFactory as _, Parser, Subcommand};

use crate::api::ApiClient;
use crate::api::types::{Priority, RecurringRule, TaskPatch};
use crate::config::{self, Config, TaskFilter};
use crate::error::TodotuiError;
use crate::form::{self, TaskDraft};
use crate::output::table::TaskTable;
use crate::session::{self, SessionState};
use crate::store::TaskStore;
use crate::tui;

#[derive(Debug, Parser)]
#[command(
    name = "todotui",
    version,
    about = "Terminal client for the todo backend (tasks + assistant chat)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Login(LoginArgs),
    Logout,
    List(ListArgs),
    Add(AddArgs),
    Edit(EditArgs),
    Done(DoneArgs),
    #[command(alias = "rm")]
    Remove(RemoveArgs),
    Chat(ChatArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct LoginArgs {
    /// Identity issued by the auth provider
    #[arg(long = "user-id")]
    pub user_id: String,
    /// Bearer token issued by the auth provider (omit for anonymous probing)
    #[arg(long = "token")]
    pub token: Option<String>,
    #[arg(long = "email")]
    pub email: Option<String>,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Output in JSON format
    #[arg(long = "json")]
    pub json: bool,
    /// Output in CSV format
    #[arg(long = "csv")]
    pub csv: bool,
    /// all, pending, or completed
    #[arg(short = 'f', long = "filter")]
    pub filter: Option<String>,
}

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    #[arg(short = 'd', long = "description", default_value = "")]
    pub description: String,
    /// low, medium, or high
    #[arg(short = 'p', long = "priority")]
    pub priority: Option<String>,
    /// Comma-separated labels
    #[arg(long = "tags")]
    pub tags: Option<String>,
    /// Local time, e.g. "2026-09-01 09:30"
    #[arg(long = "due")]
    pub due: Option<String>,
    /// daily, weekly, or monthly
    #[arg(long = "recurring")]
    pub recurring: Option<String>,
}

#[derive(Debug, Parser)]
pub struct EditArgs {
    pub id: i64,
    #[arg(long = "title")]
    pub title: Option<String>,
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    #[arg(short = 'p', long = "priority")]
    pub priority: Option<String>,
    #[arg(long = "tags")]
    pub tags: Option<String>,
    /// Local time, e.g. "2026-09-01 09:30"
    #[arg(long = "due")]
    pub due: Option<String>,
    #[arg(long = "recurring")]
    pub recurring: Option<String>,
}

#[derive(Debug, Parser)]
pub struct DoneArgs {
    pub id: i64,
}

#[derive(Debug, Parser)]
pub struct RemoveArgs {
    pub id: i64,
}

#[derive(Debug, Parser)]
pub struct ChatArgs {
    /// Message for the assistant
    #[arg(required = true)]
    pub message: Vec<String>,
    /// Continue an existing conversation
    #[arg(long = "conversation")]
    pub conversation: Option<i64>,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

pub async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    // Opt-in via TODOTUI_LOG so the alternate screen stays clean by default.
    if std::env::var_os("TODOTUI_LOG").is_none() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("TODOTUI_LOG"))
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        None => cmd_default().await,
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "todotui", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config(args)) => match args.cmd {
            ConfigCmd::List => {
                print!("{}", config::list_resolved_toml()?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Set(set) => {
                config::set_value_string(&set.key, &set.value)?;
                println!("Set {} = {}", set.key, set.value);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Get(get) => match config::get_value_string(&get.key)? {
                Some(v) => {
                    println!("{v}");
                    Ok(ExitCode::SUCCESS)
                }
                None => anyhow::bail!(
                    "configuration key '{}' not found - use 'todotui config list' to see available keys",
                    get.key
                ),
            },
        },
        Some(Commands::Login(args)) => cmd_login(args).await,
        Some(Commands::Logout) => cmd_logout().await,
        Some(Commands::List(args)) => cmd_list(args).await,
        Some(Commands::Add(args)) => cmd_add(args).await,
        Some(Commands::Edit(args)) => cmd_edit(args).await,
        Some(Commands::Done(args)) => cmd_done(args).await,
        Some(Commands::Remove(args)) => cmd_remove(args).await,
        Some(Commands::Chat(args)) => cmd_chat(args).await,
        Some(Commands::Version) => Ok(cmd_version()),
    }
}

async fn load_cfg() -> anyhow::Result<Config> {
    let cfg = tokio::task::spawn_blocking(|| -> anyhow::Result<Config> { config::load() }).await??;
    Ok(cfg)
}

async fn connect() -> anyhow::Result<(Config, ApiClient)> {
    let cfg = load_cfg().await?;
    let session = session::resolve(&cfg)?;
    let client = ApiClient::new(&cfg.base_url(), &session);
    Ok((cfg, client))
}

async fn cmd_default() -> anyhow::Result<ExitCode> {
    let (cfg, client) = connect().await?;

    if tui::is_tty() {
        crate::tui::app::run(cfg, client).await?;
        return Ok(ExitCode::SUCCESS);
    }

    // Non-TTY fallback: print the list with config defaults.
    let args = ListArgs {
        json: false,
        csv: false,
        filter: Some(cfg.ui.default_filter.as_str().to_owned()),
    };
    cmd_list_with(&client, args).await
}

async fn cmd_login(args: LoginArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let path = session::session_path(&cfg);
    let state = SessionState {
        user_id: Some(args.user_id.clone()),
        token: args.token,
        email: args.email,
    };
    session::save_state(&path, &state)?;
    println!("Signed in as {} ({})", args.user_id, path.display());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_logout() -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let path = session::session_path(&cfg);
    session::clear_state(&path)?;
    println!("Signed out");
    Ok(ExitCode::SUCCESS)
}

async fn cmd_list(args: ListArgs) -> anyhow::Result<ExitCode> {
    let (_cfg, client) = connect().await?;
    cmd_list_with(&client, args).await
}

async fn cmd_list_with(client: &ApiClient, args: ListArgs) -> anyhow::Result<ExitCode> {
    let filter = match args.filter.as_deref() {
        Some(f) => TaskFilter::parse(f)?,
        None => TaskFilter::All,
    };

    let mut store = TaskStore::new();
    let ticket = store.begin_reload();
    let tasks = client.list_tasks().await?;
    store.commit_reload(ticket, tasks);

    let selected: Vec<&crate::api::Task> = match filter {
        TaskFilter::All => store.tasks().iter().collect(),
        TaskFilter::Pending => store.pending(),
        TaskFilter::Completed => store.completed(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(ExitCode::SUCCESS);
    }
    let table = TaskTable::from_tasks(selected.iter().copied());
    if args.csv {
        table.print_csv()?;
    } else {
        table.print()?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_add(args: AddArgs) -> anyhow::Result<ExitCode> {
    let (_cfg, client) = connect().await?;

    let draft = TaskDraft {
        title: args.title,
        description: args.description,
        priority: match args.priority.as_deref() {
            Some(p) => Priority::parse(p)?,
            None => Priority::default(),
        },
        tags: args.tags.unwrap_or_default(),
        due_local: args.due.unwrap_or_default(),
        recurring: match args.recurring.as_deref() {
            Some(r) => Some(RecurringRule::parse(r)?),
            None => None,
        },
    };
    let created = client.create_task(&draft.to_new_task()?).await?;
    println!("Created task {} \"{}\"", created.id, created.title);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_edit(args: EditArgs) -> anyhow::Result<ExitCode> {
    let (_cfg, client) = connect().await?;

    let patch = TaskPatch {
        title: args.title,
        description: args.description,
        priority: match args.priority.as_deref() {
            Some(p) => Some(Priority::parse(p)?),
            None => None,
        },
        tags: args.tags.as_deref().and_then(form::normalize_tags),
        due_date: match args.due.as_deref() {
            Some(d) => form::normalize_due(d)?,
            None => None,
        },
        recurring_rule: match args.recurring.as_deref() {
            Some(r) => Some(RecurringRule::parse(r)?),
            None => None,
        },
    };
    if patch.is_empty() {
        anyhow::bail!("nothing to change - pass at least one field flag");
    }
    let updated = client.update_task(args.id, &patch).await?;
    println!("Updated task {} \"{}\"", updated.id, updated.title);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_done(args: DoneArgs) -> anyhow::Result<ExitCode> {
    let (_cfg, client) = connect().await?;

    let toggled = client.toggle_complete(args.id).await?;
    let state = if toggled.completed { "completed" } else { "reopened" };
    println!("Task {} {state}", toggled.id);

    // A completed recurring task means the server spawned the successor;
    // show the refreshed list so it is visible immediately.
    if toggled.spawns_successor() {
        let tasks = client.list_tasks().await?;
        let table = TaskTable::from_tasks(tasks.iter());
        table.print()?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_remove(args: RemoveArgs) -> anyhow::Result<ExitCode> {
    let (_cfg, client) = connect().await?;

    let ack = client.delete_task(args.id).await?;
    if !ack.ok {
        return Err(TodotuiError::TaskNotFound(args.id).into());
    }
    println!("Deleted task {}", ack.id);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_chat(args: ChatArgs) -> anyhow::Result<ExitCode> {
    let (_cfg, client) = connect().await?;

    let message = args.message.join(" ");
    let reply = client.send_chat(&message, args.conversation).await?;
    println!("{}", reply.response);
    for call in &reply.tool_calls {
        println!("  [tool] {} {}", call.name, call.arguments);
    }
    println!("(conversation {})", reply.conversation_id);
    Ok(ExitCode::SUCCESS)
}

fn cmd_version() -> ExitCode {
    println!("todotui version {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}
