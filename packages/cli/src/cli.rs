//! Command-line definition.

use clap::{Args, Parser, Subcommand, ValueEnum};
use ledger::Role;

/// Personal expense ledger
#[derive(Parser, Debug)]
#[command(name = "ledgerbook")]
#[command(version)]
#[command(about = "Track monthly expenses against your income")]
pub struct Cli {
    /// Ledger server URL (overrides api.base_url)
    #[arg(long, env = "LEDGERBOOK_URL")]
    pub url: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "LEDGERBOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in
    Register(RegisterArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List the expenses of a month
    List(SelectArgs),

    /// Add an expense
    Add(ExpenseArgs),

    /// Change an expense; omitted fields keep their value
    Edit {
        id: String,
        #[command(flatten)]
        fields: EditArgs,
    },

    /// Delete an expense
    Rm { id: String },

    /// Month-by-month totals for a year
    Summary {
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Administrator commands
    #[command(subcommand)]
    Admin(AdminCommands),
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(short, long, default_value = "")]
    pub name: String,
    #[arg(short, long)]
    pub email: String,
    #[arg(short, long, env = "LEDGERBOOK_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Repeat the password
    #[arg(long)]
    pub confirm: String,
    /// Monthly income, blank if unknown
    #[arg(short, long, default_value = "")]
    pub income: String,
}

#[derive(Args, Debug, Default)]
pub struct SelectArgs {
    /// Month number, 1 to 12
    #[arg(short, long)]
    pub month: Option<String>,
    #[arg(short, long)]
    pub year: Option<i32>,
    #[arg(short, long)]
    pub page: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ExpenseArgs {
    #[arg(short, long)]
    pub description: String,
    #[arg(short, long, default_value = "")]
    pub category: String,
    /// Amount, `45.50` or `45,50`
    #[arg(short, long, allow_hyphen_values = true)]
    pub amount: String,
    /// YYYY-MM-DD; blank files it under the selected month
    #[arg(long, default_value = "")]
    pub date: String,
    /// Month used when no date is given
    #[arg(short, long)]
    pub month: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct EditArgs {
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub category: Option<String>,
    #[arg(short, long, allow_hyphen_values = true)]
    pub amount: Option<String>,
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// List every user
    Users,
    /// Create a user without signing in as them
    AddUser(AddUserArgs),
    /// Change a user; omitted fields keep their value
    EditUser {
        id: String,
        #[command(flatten)]
        fields: EditUserArgs,
    },
    /// Delete a user and every record they own
    DeleteUser { id: String },
    /// List records, optionally for one owner
    Records {
        #[arg(short, long)]
        owner: Option<String>,
    },
    /// Add a record for a user
    AddRecord {
        #[arg(short, long)]
        owner: String,
        #[command(flatten)]
        expense: ExpenseArgs,
    },
    /// Change any user's record; omitted fields keep their value
    EditRecord {
        id: String,
        #[command(flatten)]
        fields: EditArgs,
    },
    /// Delete any user's record
    DeleteRecord { id: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    User,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => Role::Standard,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Args, Debug)]
pub struct AddUserArgs {
    #[arg(short, long, default_value = "")]
    pub name: String,
    #[arg(short, long)]
    pub email: String,
    #[arg(short, long)]
    pub password: String,
    /// Monthly income, blank if unknown
    #[arg(short, long, default_value = "")]
    pub income: String,
    #[arg(short, long, value_enum, default_value_t = RoleArg::User)]
    pub role: RoleArg,
}

#[derive(Args, Debug, Default)]
pub struct EditUserArgs {
    #[arg(short, long)]
    pub name: Option<String>,
    #[arg(short, long)]
    pub email: Option<String>,
    #[arg(short, long)]
    pub password: Option<String>,
    #[arg(short, long)]
    pub income: Option<String>,
    #[arg(short, long, value_enum)]
    pub role: Option<RoleArg>,
}
