use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use url::Url;

use crate::assemble::AssemblyOutcome;
use crate::chrome::{BrowserConfig, ChromeDriver};
use crate::cli::{BuildArgs, ChaptersArgs, ProfileArgs};
use crate::driver::{NavigationDriver, PageFormat, SessionId};
use crate::error::PipelineError;
use crate::fetch::ContentFetcher;
use crate::formats::{ChapterDescriptor, Fragment, RunReport, chapter_outcomes};
use crate::index::is_accepted_scheme;
use crate::profile::SiteProfile;

/// Inputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub url: String,
    pub out: PathBuf,
    pub profile: SiteProfile,
    pub page_format: PageFormat,
}

pub async fn run(args: BuildArgs) -> anyhow::Result<()> {
    let profile = select_profile(&args.profile)?;
    let url = parse_landing_url(&args.url)?;
    let out = PathBuf::from(&args.out);
    crate::export::prepare_output(&out, args.force).context("check output path")?;
    let report_path = args.report.as_deref().map(PathBuf::from);
    if let Some(path) = &report_path
        && path.exists()
        && !args.force
    {
        anyhow::bail!("report output already exists: {}", path.display());
    }

    let driver = launch(&BrowserConfig::from_args(&args.browser))?;
    let request = RunRequest {
        url: url.to_string(),
        out,
        profile,
        page_format: args.page_format,
    };
    let report = run_pipeline(&driver, &request).await?;

    if let Some(path) = report_path {
        write_report(&path, &report).context("write run report")?;
    }
    Ok(())
}

pub async fn chapters(args: ChaptersArgs) -> anyhow::Result<()> {
    let profile = select_profile(&args.profile)?;
    let url = parse_landing_url(&args.url)?;
    let driver = launch(&BrowserConfig::from_args(&args.browser))?;

    let stdout = std::io::BufWriter::new(std::io::stdout().lock());
    list_chapters(&driver, &profile, url.as_str(), stdout).await?;
    Ok(())
}

/// Indexes the landing page only and writes one JSON descriptor per line.
pub async fn list_chapters<D, W>(
    driver: &D,
    profile: &SiteProfile,
    url: &str,
    mut out: W,
) -> anyhow::Result<Vec<ChapterDescriptor>>
where
    D: NavigationDriver + ?Sized,
    W: Write,
{
    profile.validate()?;
    let session = driver
        .new_session()
        .await
        .context("open landing session")?;
    let indexed = open_and_index(driver, session, profile, url).await;
    close_quietly(driver, session).await;
    let descriptors = indexed?;

    for descriptor in &descriptors {
        serde_json::to_writer(&mut out, descriptor).context("write chapter json")?;
        out.write_all(b"\n").context("write chapter newline")?;
    }
    out.flush().context("flush chapter list")?;
    Ok(descriptors)
}

fn select_profile(args: &ProfileArgs) -> anyhow::Result<SiteProfile> {
    let file = args.profile_file.as_deref().map(Path::new);
    let profile = crate::profile::select(args.profile, file).context("select site profile")?;
    tracing::info!(profile = %profile.name, "selected site profile");
    Ok(profile)
}

fn parse_landing_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).context("parse --url")?;
    if !is_accepted_scheme(&url) {
        anyhow::bail!("--url must be http, https or file: {url}");
    }
    Ok(url)
}

fn launch(config: &BrowserConfig) -> anyhow::Result<ChromeDriver> {
    tokio::task::block_in_place(|| ChromeDriver::launch(config)).context("start browser")
}

/// Runs Indexer → Fetcher → Sanitizer → Assembler → Exporter against one
/// landing page. Every driver call is awaited before the next one is made.
pub async fn run_pipeline<D>(
    driver: &D,
    request: &RunRequest,
) -> Result<RunReport, PipelineError>
where
    D: NavigationDriver + ?Sized,
{
    request.profile.validate()?;
    let started_at = chrono::Utc::now().to_rfc3339();

    let landing = driver
        .new_session()
        .await
        .map_err(PipelineError::driver("open landing session"))?;
    let result = run_stages(driver, landing, request).await;
    close_quietly(driver, landing).await;
    let (descriptors, fragments, assembly) = result?;

    let chapters = chapter_outcomes(&descriptors, &fragments);
    if !assembly.dropped.is_empty() {
        tracing::warn!(
            dropped = ?assembly.dropped,
            total = chapters.len(),
            "document is missing chapters"
        );
    }

    let report = RunReport {
        url: request.url.clone(),
        profile: request.profile.name.clone(),
        output: request.out.to_string_lossy().to_string(),
        page_format: request.page_format.as_str().to_owned(),
        started_at,
        finished_at: chrono::Utc::now().to_rfc3339(),
        chapters,
        dropped: assembly.dropped,
    };
    tracing::info!(
        out = %request.out.display(),
        included = assembly.chapter_blocks,
        total = assembly.toc_entries,
        "wrote document"
    );
    Ok(report)
}

async fn run_stages<D>(
    driver: &D,
    landing: SessionId,
    request: &RunRequest,
) -> Result<(Vec<ChapterDescriptor>, Vec<Fragment>, AssemblyOutcome), PipelineError>
where
    D: NavigationDriver + ?Sized,
{
    let profile = &request.profile;

    tracing::info!(url = %request.url, "build: index");
    let descriptors = open_and_index(driver, landing, profile, &request.url).await?;

    tracing::info!(chapters = descriptors.len(), "build: fetch");
    let fragments = ContentFetcher::new(driver, profile)
        .fetch_all(&descriptors)
        .await?;

    tracing::info!("build: sanitize");
    crate::sanitize::sanitize_page(driver, landing, profile).await?;

    tracing::info!("build: assemble");
    let assembly = crate::assemble::assemble_document(
        driver,
        landing,
        profile,
        &request.url,
        &descriptors,
        &fragments,
    )
    .await?;

    tracing::info!("build: export");
    crate::export::export_document(driver, landing, &request.out, request.page_format).await?;

    Ok((descriptors, fragments, assembly))
}

async fn open_and_index<D>(
    driver: &D,
    session: SessionId,
    profile: &SiteProfile,
    url: &str,
) -> Result<Vec<ChapterDescriptor>, PipelineError>
where
    D: NavigationDriver + ?Sized,
{
    driver
        .navigate(session, url)
        .await
        .map_err(PipelineError::navigation(url))?;
    crate::index::index_chapters(driver, session, profile, url).await
}

async fn close_quietly<D>(driver: &D, session: SessionId)
where
    D: NavigationDriver + ?Sized,
{
    if let Err(err) = driver.close_session(session).await {
        tracing::debug!(%session, ?err, "close session failed");
    }
}

fn write_report(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create report dir: {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(report).context("serialize run report")?;
    std::fs::write(path, json).with_context(|| format!("write report: {}", path.display()))?;
    Ok(())
}
