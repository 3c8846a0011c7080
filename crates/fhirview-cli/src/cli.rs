use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "fhirview")]
#[command(about = "fhirview — browse patients held in a FHIR registry")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Registry base URL, e.g. https://hapi.fhir.org/baseR4 (overrides config and FHIRVIEW_URL env var)
    #[arg(short, long, global = true, env = "FHIRVIEW_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "FHIRVIEW_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Clone, Copy, ValueEnum, Default, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every patient in the registry
    List(ListArgs),
    /// List patients born inside a date range
    Range(RangeArgs),
    /// Search patients by name and/or birth date
    Search(SearchArgs),
    /// Interactive session: search, sort, filter and expand rows
    Shell,
    /// Manage CLI configuration
    Config(ConfigArgs),
}

/// How the fetched rows are shown
#[derive(clap::Args, Default)]
pub struct ViewArgs {
    /// Column to sort by (e.g. name, age, birthDate)
    #[arg(long)]
    pub sort: Option<String>,
    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,
    /// Only show rows containing this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,
    /// Print the raw resource of a row, by patient id or row number
    #[arg(long)]
    pub expand: Option<String>,
}

#[derive(clap::Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(clap::Args)]
pub struct RangeArgs {
    /// Lower birthdate bound with FHIR prefix (default ge1960-01-01)
    #[arg(long)]
    pub from: Option<String>,
    /// Upper birthdate bound with FHIR prefix (default le1965-01-01)
    #[arg(long)]
    pub to: Option<String>,
    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(clap::Args)]
pub struct SearchArgs {
    /// Patient name (letters and spaces)
    #[arg(long)]
    pub name: Option<String>,
    /// Birth date (yyyy-MM-dd)
    #[arg(long)]
    pub birthdate: Option<String>,
    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, format)
    pub key: String,
    /// Value
    pub value: String,
}
