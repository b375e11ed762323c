use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clientq_core::ClientId;

#[derive(Parser)]
#[command(name = "clientq")]
#[command(about = "Submit client records and work the approval queue")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// CLI profile name for Supabase configuration and session
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a client record for administrator review
    #[command(alias = "new")]
    Submit {
        /// Client title
        #[arg(long)]
        title: String,
        /// Client description
        text: Vec<String>,
    },
    /// List approved clients
    List {
        /// Only show clients you created
        #[arg(long)]
        mine: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an approved client you created
    Edit {
        /// Client ID
        id: ClientId,
        /// New title (unchanged when omitted)
        #[arg(long)]
        title: Option<String>,
        /// New description (unchanged when omitted)
        #[arg(long)]
        text: Option<String>,
    },
    /// Delete an approved client you created
    Delete {
        /// Client ID
        id: ClientId,
    },
    /// List clients waiting for approval (admin)
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Approve a pending client (admin)
    Approve {
        /// Pending client ID
        id: ClientId,
    },
    /// Reject a pending client (admin)
    Reject {
        /// Pending client ID
        id: ClientId,
    },
    /// Follow the approval queue live until interrupted (admin)
    Watch,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate CLI profile with Supabase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Table holding approved clients
        #[arg(long, value_name = "TABLE")]
        clients_table: Option<String>,
        /// Table holding clients awaiting approval
        #[arg(long, value_name = "TABLE")]
        pending_table: Option<String>,
        /// Seconds a live notification stays visible
        #[arg(long, value_name = "SECONDS")]
        notification_ttl_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile config
    Show {
        /// Profile name to show
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with Supabase email/password and store session in keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create a Supabase account and record its role
    Signup {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        /// Register as an administrator
        #[arg(long)]
        admin: bool,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Logout profile and clear stored session
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
