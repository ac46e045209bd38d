use clap::{Args, Parser, Subcommand};

use crate::driver::PageFormat;
use crate::profile::BuiltinProfile;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl every chapter of a documentation site into one PDF.
    Build(BuildArgs),
    /// Print the chapters a profile finds on a landing page, as JSON lines.
    Chapters(ChaptersArgs),
    /// Print built-in site profiles as YAML.
    Profiles(ProfilesArgs),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Landing page with the table of contents (http, https or file URL).
    #[arg(long)]
    pub url: String,

    /// Output PDF path.
    #[arg(long)]
    pub out: String,

    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Paper size of the rendered document.
    #[arg(long, value_enum, default_value_t = PageFormat::A4)]
    pub page_format: PageFormat,

    /// Write a JSON run report (chapters included and dropped).
    #[arg(long)]
    pub report: Option<String>,

    /// Overwrite existing output files.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(Debug, Args)]
pub struct ChaptersArgs {
    /// Landing page with the table of contents (http, https or file URL).
    #[arg(long)]
    pub url: String,

    #[command(flatten)]
    pub profile: ProfileArgs,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(Debug, Args)]
pub struct ProfilesArgs {
    /// Only print this profile.
    #[arg(long, value_enum)]
    pub name: Option<BuiltinProfile>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Built-in site profile.
    #[arg(
        long,
        value_enum,
        conflicts_with = "profile_file",
        required_unless_present = "profile_file"
    )]
    pub profile: Option<BuiltinProfile>,

    /// YAML file with a custom site profile.
    #[arg(long)]
    pub profile_file: Option<String>,
}

#[derive(Debug, Args)]
pub struct BrowserArgs {
    /// Timeout for each browser call, in seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Chrome/Chromium executable (default: $SITEPDF_CHROME, then auto-detect).
    #[arg(long)]
    pub chrome: Option<String>,

    /// Launch Chrome without its sandbox (needed in some containers).
    #[arg(long, default_value_t = false)]
    pub no_sandbox: bool,

    /// Show the browser window.
    #[arg(long, default_value_t = false)]
    pub headful: bool,
}
