//! Clap derive structures for the `mbsi` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// mbsi -- student-facing CLI for the MBSI school statistics portal
#[derive(Debug, Parser)]
#[command(
    name = "mbsi",
    version,
    about = "View grades, rankings, and coins from the MBSI portal",
    long_about = "A command-line client for the MBSI school statistics portal.\n\n\
        Log in once; the session token is kept in the OS keyring (or a\n\
        token file) and verified on startup. Portal responses are cached\n\
        between requests within a run.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Portal base URL (overrides the config file)
    #[arg(long, env = "MBSI_PORTAL", global = true)]
    pub portal: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MBSI_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, env = "MBSI_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in to the portal and persist the session
    Login(LoginArgs),

    /// Log out and discard the persisted session
    Logout,

    /// Show the logged-in account
    #[command(alias = "me")]
    Whoami,

    /// Weekly grade statistics and rankings
    #[command(alias = "st")]
    Stats(StatsArgs),

    /// View and edit the account profile
    Profile(ProfileArgs),

    /// Coin balance and transaction ledger
    #[command(alias = "c")]
    Coins(CoinsArgs),

    /// Interactive first-run setup (portal URL, login, preferences)
    GetStarted,

    /// Show or edit the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Portal username
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Portal password (prompted when omitted; avoid on shared shells)
    #[arg(long, hide_env = true, env = "MBSI_PASSWORD")]
    pub password: Option<String>,
}

// ── Stats ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Student id (defaults to the logged-in student)
    #[arg(long)]
    pub student: Option<String>,
}

// ── Profile ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show the account profile
    Show,

    /// Update the profile names
    Edit(ProfileEditArgs),
}

#[derive(Debug, Args)]
pub struct ProfileEditArgs {
    /// New first name
    #[arg(long)]
    pub first_name: Option<String>,

    /// New last name
    #[arg(long)]
    pub last_name: Option<String>,
}

// ── Coins ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CoinsArgs {
    #[command(subcommand)]
    pub command: CoinsCommand,
}

#[derive(Debug, Subcommand)]
pub enum CoinsCommand {
    /// Current coin balance
    Balance,

    /// Transaction ledger, paged
    #[command(alias = "tx")]
    Transactions(TransactionsArgs),

    /// Mark a ledger transaction as read
    MarkRead(MarkReadArgs),
}

#[derive(Debug, Args)]
pub struct TransactionsArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Transactions per page
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Args)]
pub struct MarkReadArgs {
    /// Transaction id
    pub id: String,

    /// Page the transaction is shown on (for the cached view)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Transactions per page
    #[arg(long)]
    pub limit: Option<u32>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a config value (e.g. `portal`, `defaults.output`)
    Set(ConfigSetArgs),
}

#[derive(Debug, Args)]
pub struct ConfigSetArgs {
    /// Key to set
    pub key: String,

    /// Value
    pub value: String,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}
