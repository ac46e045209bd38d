use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::driver::{NavigationDriver, PageFormat, SessionId};
use crate::error::PipelineError;

/// Checks the output path before any browser work starts.
pub fn prepare_output(out: &Path, force: bool) -> anyhow::Result<()> {
    if out.exists() && !force {
        anyhow::bail!("export output already exists: {}", out.display());
    }
    if out.is_dir() {
        anyhow::bail!("export output is a directory: {}", out.display());
    }
    let parent = output_dir(out);
    std::fs::create_dir_all(&parent)
        .with_context(|| format!("create export output dir: {}", parent.display()))?;
    Ok(())
}

fn output_dir(out: &Path) -> PathBuf {
    match out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Renders the landing page to `out`.
///
/// The driver writes into a temporary file next to `out`, which is only
/// moved into place once rendering succeeded, so a failed run leaves no
/// artifact behind.
pub async fn export_document<D>(
    driver: &D,
    session: SessionId,
    out: &Path,
    format: PageFormat,
) -> Result<(), PipelineError>
where
    D: NavigationDriver + ?Sized,
{
    let output_error = |source| PipelineError::Output {
        path: out.to_path_buf(),
        source,
    };

    let staging = tempfile::Builder::new()
        .prefix(".sitepdf-")
        .suffix(".part")
        .tempfile_in(output_dir(out))
        .map_err(output_error)?;

    tracing::info!(out = %out.display(), format = format.as_str(), "render document");
    driver
        .render_to_file(session, staging.path(), format)
        .await
        .map_err(PipelineError::driver("render document"))?;

    staging
        .persist(out)
        .map_err(|err| output_error(err.error))?;
    Ok(())
}
