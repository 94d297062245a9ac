use std::path::PathBuf;

use clap::{value_parser, ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Snapshot RPM repositories into content-addressed object storage",
    disable_help_subcommand = true
)]
pub struct RpmrepoCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[arg(
        long,
        value_name = "LOCATOR",
        help = "Snapshot store: memory:, dir:<path> or an http(s) bucket URL (overrides RPMREPO_STORE)",
        global = true
    )]
    pub store: Option<String>,
    #[arg(
        long,
        value_name = "LOCATOR",
        help = "Store holding legacy anon/psi refs (overrides RPMREPO_LEGACY_STORE)",
        global = true
    )]
    pub legacy_store: Option<String>,
    #[arg(
        long,
        value_name = "N",
        value_parser = value_parser!(u32).range(1..),
        help = "Keys requested per listing page (overrides RPMREPO_PAGE_SIZE)",
        global = true
    )]
    pub page_size: Option<u32>,
    #[command(subcommand)]
    pub command: CommandCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandCli {
    #[command(about = "Mirror a remote repository into the local cache with dnf reposync.")]
    Pull(PullArgs),
    #[command(about = "Hash the pulled repository into index/data and index/snapshot.")]
    Index(LocalArgs),
    #[command(about = "Upload blobs and/or publish the index as a snapshot.")]
    Push(PushArgs),
    #[command(
        name = "enumerate-cache",
        about = "Rebuild data/thread/meta/cache.json from the committed markers."
    )]
    EnumerateCache,
    #[command(about = "Resolve one request path the way the HTTP front end does.")]
    Resolve(ResolveArgs),
    #[command(about = "Answer a proxy-integration event read from stdin.")]
    Gateway,
}

#[derive(Args, Debug)]
pub struct PullArgs {
    #[arg(long, value_name = "DIR", help = "Cache directory holding local repositories")]
    pub cache: PathBuf,
    #[arg(
        long,
        value_name = "ID",
        help = "Local repository id (a random one is generated and printed if omitted)"
    )]
    pub local: Option<String>,
    #[arg(
        long,
        value_name = "FILE",
        help = "Repository descriptor providing base-url and platform-id"
    )]
    pub repo: Option<PathBuf>,
    #[arg(
        long,
        value_name = "ID",
        required_unless_present = "repo",
        conflicts_with = "repo"
    )]
    pub platform_id: Option<String>,
    #[arg(
        long,
        value_name = "URL",
        required_unless_present = "repo",
        conflicts_with = "repo"
    )]
    pub base_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct LocalArgs {
    #[arg(long, value_name = "DIR", help = "Cache directory holding local repositories")]
    pub cache: PathBuf,
    #[arg(long, value_name = "ID", help = "Local repository id")]
    pub local: String,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub local: LocalArgs,
    #[arg(
        long = "to",
        num_args = 3,
        value_names = ["KIND", "A", "B"],
        action = ArgAction::Append,
        required_unless_present = "repo",
        help = "`data <storage> <platform-id>` or `snapshot <snapshot-id> <suffix>`; repeatable"
    )]
    pub to: Vec<String>,
    #[arg(
        long,
        value_name = "FILE",
        requires = "suffix",
        help = "Push data and snapshot targets derived from a repository descriptor"
    )]
    pub repo: Option<PathBuf>,
    #[arg(long, value_name = "SUFFIX", help = "Snapshot suffix used with --repo")]
    pub suffix: Option<String>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[arg(long, value_name = "STAGE", default_value = "default")]
    pub stage: String,
    #[arg(value_name = "PATH", default_value = "")]
    pub path: String,
}
