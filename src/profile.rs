use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::cli::ProfilesArgs;
use crate::error::PipelineError;

/// Selectors describing one documentation-site family.
///
/// A profile is chosen once per run and never mutated; every pipeline stage
/// receives it as an explicit argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteProfile {
    pub name: String,
    /// Navigation links, one per chapter, in reading order.
    pub chapter_links: String,
    /// Container holding one chapter's content.
    pub content_container: String,
    /// Outer page wrapper whose positioning is adjusted for printing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_container: Option<String>,
    pub sidebar: String,
    pub header: String,
    pub next_nav: String,
    pub menu_anchor_container: String,
    pub menu_insertion_point: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BuiltinProfile {
    /// Legacy GitBook (`.book-summary` sidebar).
    GitbookLegacy,
    /// mdBook default theme.
    Mdbook,
}

impl BuiltinProfile {
    pub const ALL: [Self; 2] = [Self::GitbookLegacy, Self::Mdbook];

    pub fn name(self) -> &'static str {
        match self {
            Self::GitbookLegacy => "gitbook-legacy",
            Self::Mdbook => "mdbook",
        }
    }

    pub fn profile(self) -> SiteProfile {
        match self {
            Self::GitbookLegacy => SiteProfile {
                name: self.name().to_owned(),
                chapter_links: ".summary li.chapter>a".to_owned(),
                content_container: "#book-search-results".to_owned(),
                body_container: Some(".book-body".to_owned()),
                sidebar: ".book-summary".to_owned(),
                header: ".book-header".to_owned(),
                next_nav: ".navigation-next".to_owned(),
                menu_anchor_container: "#book-search-results".to_owned(),
                menu_insertion_point: "#book-search-results > :first-child".to_owned(),
            },
            Self::Mdbook => SiteProfile {
                name: self.name().to_owned(),
                chapter_links: "#sidebar .chapter-item a:not(.active)".to_owned(),
                content_container: "#content".to_owned(),
                body_container: Some(".page".to_owned()),
                sidebar: "#sidebar".to_owned(),
                header: "#menu-bar".to_owned(),
                next_nav: ".nav-wrapper".to_owned(),
                menu_anchor_container: "#content".to_owned(),
                menu_insertion_point: "#content main".to_owned(),
            },
        }
    }
}

impl SiteProfile {
    /// Fails on the first required selector that is empty or whitespace.
    /// An optional `body_container` that is present must be non-empty too.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let required: [(&'static str, &str); 7] = [
            ("chapter_links", &self.chapter_links),
            ("content_container", &self.content_container),
            ("sidebar", &self.sidebar),
            ("header", &self.header),
            ("next_nav", &self.next_nav),
            ("menu_anchor_container", &self.menu_anchor_container),
            ("menu_insertion_point", &self.menu_insertion_point),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(self.malformed(key));
            }
        }
        if let Some(body) = &self.body_container
            && body.trim().is_empty()
        {
            return Err(self.malformed("body_container"));
        }
        Ok(())
    }

    fn malformed(&self, key: &'static str) -> PipelineError {
        PipelineError::MalformedProfile {
            profile: self.name.clone(),
            key,
        }
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let profile: Self = serde_yaml::from_str(yaml).context("parse site profile yaml")?;
        Ok(profile)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read site profile: {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("load {}", path.display()))
    }
}

/// Resolves and validates the profile for a run, from a file or a built-in.
pub fn select(
    builtin: Option<BuiltinProfile>,
    file: Option<&Path>,
) -> anyhow::Result<SiteProfile> {
    let profile = match (builtin, file) {
        (_, Some(path)) => SiteProfile::load(path)?,
        (Some(builtin), None) => builtin.profile(),
        (None, None) => anyhow::bail!("either --profile or --profile-file is required"),
    };
    profile.validate()?;
    Ok(profile)
}

pub fn run(args: ProfilesArgs) -> anyhow::Result<()> {
    let profiles = match args.name {
        Some(builtin) => vec![builtin.profile()],
        None => BuiltinProfile::ALL.map(BuiltinProfile::profile).to_vec(),
    };
    let yaml = serde_yaml::to_string(&profiles).context("serialize site profiles")?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(yaml.as_bytes())
        .context("write site profiles")?;
    stdout.flush().context("flush stdout")?;
    Ok(())
}
