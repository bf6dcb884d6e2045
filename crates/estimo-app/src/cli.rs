// Command-line definitions for `estimo`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use estimo_core::filters::{AnalyticsFilter, ClientFilter, EstimateFilter, Granularity, LogFilter};
use estimo_core::models::{EntityId, ExportFormat};

#[derive(Parser, Debug)]
#[command(name = "estimo", version, about = "Client for the estimates API")]
pub struct Cli {
    /// Logging verbosity (-v for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Directory holding `config/` and `defaults/`
    #[arg(long, global = true, env = "ESTIMO_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with a login or e-mail
    Login {
        identifier: String,
        #[arg(long, env = "ESTIMO_PASSWORD")]
        password: String,
    },

    /// Create an account; a verification code is e-mailed
    Register {
        #[arg(long)]
        login: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ESTIMO_PASSWORD")]
        password: String,
    },

    /// Confirm an account with the e-mailed code
    Verify {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },

    /// Send the verification code again
    Resend {
        #[arg(long)]
        email: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the current user
    Me,

    /// Update login, e-mail, name and company
    Profile(ProfileArgs),

    /// Change the account password
    Password {
        #[arg(long)]
        current: String,
        #[arg(long = "new")]
        new_password: String,
        #[arg(long)]
        confirm: String,
    },

    #[command(subcommand)]
    Estimates(EstimatesCommand),

    #[command(subcommand)]
    Clients(ClientsCommand),

    #[command(subcommand)]
    Templates(TemplatesCommand),

    #[command(subcommand)]
    Notes(NotesCommand),

    #[command(subcommand)]
    Analytics(AnalyticsCommand),

    /// Resolve a route and print the page data
    Open { path: String },
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[arg(long)]
    pub login: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
}

/// JSON payload read from disk.
#[derive(Args, Debug)]
pub struct PayloadArgs {
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Where a download is written.
#[derive(Args, Debug, Default)]
pub struct OutArgs {
    /// Output file or directory (default: the configured downloads dir)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct PagingArgs {
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub offset: Option<u64>,
}

impl From<&PagingArgs> for LogFilter {
    fn from(args: &PagingArgs) -> Self {
        LogFilter {
            limit: args.limit,
            offset: args.offset,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct EstimateListArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub client: Option<EntityId>,
    #[arg(long)]
    pub date_from: Option<NaiveDate>,
    #[arg(long)]
    pub date_to: Option<NaiveDate>,
    #[arg(long)]
    pub favorite: Option<bool>,
    #[command(flatten)]
    pub paging: PagingArgs,
}

impl From<&EstimateListArgs> for EstimateFilter {
    fn from(args: &EstimateListArgs) -> Self {
        EstimateFilter {
            name: args.name.clone(),
            client: args.client,
            date_from: args.date_from,
            date_to: args.date_to,
            favorite: args.favorite,
            limit: args.paging.limit,
            offset: args.paging.offset,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum EstimatesCommand {
    List(EstimateListArgs),
    Get { id: EntityId },
    Create(PayloadArgs),
    Update {
        id: EntityId,
        #[command(flatten)]
        payload: PayloadArgs,
    },
    Delete { id: EntityId },
    /// Version history of an estimate
    Versions {
        id: EntityId,
        #[command(flatten)]
        paging: PagingArgs,
    },
    Version {
        estimate_id: EntityId,
        version_id: EntityId,
    },
    RestoreVersion {
        estimate_id: EntityId,
        version_id: EntityId,
    },
    DeleteVersion {
        estimate_id: EntityId,
        version_id: EntityId,
    },
    Logs {
        id: EntityId,
        #[command(flatten)]
        paging: PagingArgs,
    },
    Favorite { id: EntityId },
    Unfavorite { id: EntityId },
    /// Download an estimate as JSON, PDF or Excel
    Export {
        id: EntityId,
        #[arg(long, value_enum, default_value_t = EstimateExport::Json)]
        format: EstimateExport,
        #[command(flatten)]
        out: OutArgs,
    },
    /// Create an estimate from a previously exported JSON file
    Import(PayloadArgs),
    /// Create a copy of an existing estimate
    Copy { id: EntityId },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateExport {
    Json,
    Pdf,
    Excel,
}

#[derive(Args, Debug, Default)]
pub struct ClientListArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[command(flatten)]
    pub paging: PagingArgs,
}

impl From<&ClientListArgs> for ClientFilter {
    fn from(args: &ClientListArgs) -> Self {
        ClientFilter {
            name: args.name.clone(),
            company: args.company.clone(),
            limit: args.paging.limit,
            offset: args.paging.offset,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ClientsCommand {
    List(ClientListArgs),
    Get {
        id: EntityId,
        /// Include the client's estimates
        #[arg(long)]
        with_estimates: bool,
    },
    Create(PayloadArgs),
    Update {
        id: EntityId,
        #[command(flatten)]
        payload: PayloadArgs,
    },
    Delete { id: EntityId },
    Logs {
        id: EntityId,
        #[command(flatten)]
        paging: PagingArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
    List {
        #[arg(long)]
        name: Option<String>,
    },
    Get { id: EntityId },
    Create(PayloadArgs),
    Update {
        id: EntityId,
        #[command(flatten)]
        payload: PayloadArgs,
    },
    Delete { id: EntityId },
    Export {
        id: EntityId,
        #[command(flatten)]
        out: OutArgs,
    },
    Import(PayloadArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Estimate,
    Client,
    Template,
}

#[derive(Subcommand, Debug)]
pub enum NotesCommand {
    List { kind: NoteKind, id: EntityId },
    Add {
        kind: NoteKind,
        id: EntityId,
        text: String,
    },
    Update { note_id: EntityId, text: String },
    Delete { note_id: EntityId },
}

#[derive(Args, Debug, Default)]
pub struct AnalyticsArgs {
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    /// Repeatable estimate status filter
    #[arg(long)]
    pub status: Vec<String>,
    #[arg(long)]
    pub vat_enabled: Option<bool>,
    #[arg(long = "category")]
    pub categories: Vec<String>,
    #[arg(long)]
    pub granularity: Option<Granularity>,
}

impl From<&AnalyticsArgs> for AnalyticsFilter {
    fn from(args: &AnalyticsArgs) -> Self {
        AnalyticsFilter {
            start_date: args.start_date,
            end_date: args.end_date,
            status: args.status.clone(),
            vat_enabled: args.vat_enabled,
            categories: args.categories.clone(),
            granularity: args.granularity,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum AnalyticsCommand {
    Global(AnalyticsArgs),
    Client {
        id: EntityId,
        #[command(flatten)]
        filter: AnalyticsArgs,
    },
    Export {
        #[arg(long)]
        client: Option<EntityId>,
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        #[command(flatten)]
        filter: AnalyticsArgs,
        #[command(flatten)]
        out: OutArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definitions_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_estimate_filter() {
        let cli = Cli::try_parse_from([
            "estimo",
            "estimates",
            "list",
            "--client",
            "4",
            "--date-from",
            "2024-02-01",
            "--limit",
            "5",
        ])
        .unwrap();

        let Command::Estimates(EstimatesCommand::List(args)) = cli.command else {
            panic!("wrong command");
        };
        let filter = EstimateFilter::from(&args);
        assert_eq!(filter.client, Some(4));
        assert_eq!(filter.date_from, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn parses_analytics_export() {
        let cli = Cli::try_parse_from([
            "estimo",
            "-v",
            "analytics",
            "export",
            "--format",
            "xlsx",
            "--status",
            "draft",
            "--status",
            "sent",
            "--granularity",
            "quarter",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Command::Analytics(AnalyticsCommand::Export {
            format, filter, ..
        }) = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(format, ExportFormat::Excel);
        assert_eq!(filter.status, vec!["draft", "sent"]);
        assert_eq!(filter.granularity, Some(Granularity::Quarter));
    }
}
