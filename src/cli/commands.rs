use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kg", about = concat!("kg v", env!("CARGO_PKG_VERSION"), " - vendor-scoped keyword templates"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    /// Vendor to work in (default: last selection)
    #[arg(short = 'v', long, global = true)]
    pub vendor: Option<String>,

    /// Issue to work in (default: last selection)
    #[arg(short = 'i', long, global = true)]
    pub issue: Option<String>,

    /// Category to work in (default: last selection)
    #[arg(short = 'c', long, global = true)]
    pub category: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or repair the data files and show a summary
    Init,
    /// Show or change the current vendor / issue / category
    Select(SelectArgs),
    /// List vendors with their delimiter and sizes
    Vendors,
    /// List the issues of the current vendor
    Issues,
    /// List the categories of the current issue
    Categories,
    /// Add, remove or rename issues of the current vendor
    Issue(IssueCmd),
    /// Add, remove or rename categories of the current issue
    Category(CategoryCmd),
    /// List keywords of the current category
    List,
    /// Add, edit, remove or reorder keywords
    Kw(KwCmd),
    /// Manage the current category's placeholder values
    Param(ParamCmd),
    /// Show or set the current vendor's join delimiter
    Delimiter(DelimiterArgs),
    /// Print a keyword the way it is copied to the clipboard
    Copy(CopyArgs),
    /// List a keyword's placeholders and their values
    Placeholders(IndexArg),
    /// Write everything to an export package
    Export(FileArg),
    /// Replace everything with an export package
    Import(FileArg),
    /// View or prune the recovery log
    Recovery(RecoveryArgs),
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SelectArgs {
    /// Vendor name
    pub vendor: Option<String>,
    /// Issue name
    pub issue: Option<String>,
    /// Category name
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Issues and categories
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IssueCmd {
    #[command(subcommand)]
    pub action: NameAction,
}

#[derive(Args)]
pub struct CategoryCmd {
    #[command(subcommand)]
    pub action: NameAction,
}

#[derive(Subcommand)]
pub enum NameAction {
    /// Add a new entry
    Add(NameArg),
    /// Delete an entry
    Rm(NameArg),
    /// Rename an entry in place
    Mv(RenameArgs),
}

#[derive(Args)]
pub struct NameArg {
    pub name: String,
}

#[derive(Args)]
pub struct RenameArgs {
    /// Current name
    pub old: String,
    /// New name
    pub new: String,
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct KwCmd {
    #[command(subcommand)]
    pub action: KwAction,
}

#[derive(Subcommand)]
pub enum KwAction {
    /// Append a keyword to the current category
    Add(KwAddArgs),
    /// Change a keyword; omitted fields keep their value
    Edit(KwEditArgs),
    /// Delete a keyword
    Rm(IndexArg),
    /// Move a keyword one place up
    Up(IndexArg),
    /// Move a keyword one place down
    Down(IndexArg),
}

#[derive(Args)]
pub struct KwAddArgs {
    /// A template part (repeatable, kept in order)
    #[arg(short = 'p', long = "part", action = clap::ArgAction::Append)]
    pub parts: Vec<String>,
    #[command(flatten)]
    pub meta: KwMetaArgs,
}

#[derive(Args)]
pub struct KwEditArgs {
    /// Keyword index (0-based, as shown by `kg list`)
    pub index: usize,
    /// Replace all parts (repeatable)
    #[arg(short = 'p', long = "part", action = clap::ArgAction::Append)]
    pub parts: Vec<String>,
    #[command(flatten)]
    pub meta: KwMetaArgs,
}

#[derive(Args)]
pub struct KwMetaArgs {
    /// Short label
    #[arg(short = 's', long)]
    pub summary: Option<String>,
    /// Secondary label
    #[arg(short = 'g', long)]
    pub group: Option<String>,
    /// Plain description
    #[arg(short = 'd', long)]
    pub desc: Option<String>,
    /// Styled description as JSON runs: [{"text": "..", "b": true, "c": "red"}]
    #[arg(long, value_name = "JSON")]
    pub desc_rich: Option<String>,
}

#[derive(Args)]
pub struct IndexArg {
    /// Keyword index (0-based, as shown by `kg list`)
    pub index: usize,
}

// ---------------------------------------------------------------------------
// Params and delimiter
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ParamCmd {
    #[command(subcommand)]
    pub action: Option<ParamAction>,
}

#[derive(Subcommand)]
pub enum ParamAction {
    /// List params (default)
    List,
    /// Set a param value
    Set(ParamSetArgs),
    /// Remove a param
    Rm(NameArg),
}

#[derive(Args)]
pub struct ParamSetArgs {
    pub name: String,
    pub value: String,
}

#[derive(Args)]
pub struct DelimiterArgs {
    /// New delimiter (omit to show the current one)
    pub value: Option<String>,
    /// Confirm setting an empty delimiter
    #[arg(long)]
    pub allow_empty: bool,
}

// ---------------------------------------------------------------------------
// Copy, export, import
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct CopyArgs {
    /// Keyword index (0-based, as shown by `kg list`)
    pub index: usize,
    /// Strip placeholders instead of substituting them
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args)]
pub struct FileArg {
    /// Package file path
    pub file: String,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryArgs {
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Remove entries older than 30 days
    #[arg(long)]
    pub prune: bool,
    /// With --prune, remove all entries
    #[arg(long, requires = "prune")]
    pub all: bool,
}
