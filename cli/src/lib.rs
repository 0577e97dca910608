use anyhow::Context as _;
use clap::Parser;
use regex::Regex;
use rotor_core::classify::RetentionPolicy;
use rotor_core::rotate::ArtifactPayload;
use rotor_core::rotate::RotateOutcome;
use rotor_core::rotate::rotate;
use rotor_core::template::AssetNameTemplate;
use rotor_core::template::ShortCommit;
use rotor_github::GitHubReleaseClient;
use std::path::PathBuf;

/// Upload a release asset under a date+commit qualified name, replacing any
/// name collision and pruning older uploads beyond the retention window.
#[derive(Debug, Parser)]
#[command(name = "rotor", version)]
pub struct Cli {
    /// Release the asset belongs to.
    #[arg(long)]
    pub release_id: u64,

    /// Asset name template containing the `$$` placeholder, e.g. `app-$$.zip`.
    #[arg(long)]
    pub asset_name: String,

    /// Path of the artifact file to upload.
    #[arg(long)]
    pub asset_path: PathBuf,

    /// MIME type sent with the upload.
    #[arg(long)]
    pub asset_content_type: String,

    /// How many matching assets to keep; omit to keep everything.
    #[arg(long)]
    pub max_releases: Option<u32>,

    /// Pattern selecting the asset names subject to retention, tried before
    /// the template-based match.
    #[arg(long)]
    pub assets_names_regex: Option<String>,

    /// Commit id to embed in the asset name; defaults to `GITHUB_SHA`.
    #[arg(long)]
    pub commit: Option<String>,

    /// `owner/repo` coordinates; defaults to `GITHUB_REPOSITORY`.
    #[arg(long)]
    pub repo: Option<String>,

    /// GitHub API base URL.
    #[arg(long, default_value = rotor_github::DEFAULT_API_BASE)]
    pub api_url: String,

    /// GitHub upload base URL.
    #[arg(long, default_value = rotor_github::DEFAULT_UPLOAD_BASE)]
    pub upload_url: String,
}

struct Inputs {
    template: AssetNameTemplate,
    commit: ShortCommit,
    owner: String,
    repo: String,
    policy: RetentionPolicy,
    token: String,
    artifact: ArtifactPayload,
}

/// Resolve and validate every input before the first remote call.
fn resolve(cli: &Cli) -> anyhow::Result<Inputs> {
    let template = AssetNameTemplate::parse(&cli.asset_name)?;

    let sha = env_or_flag(cli.commit.clone(), "GITHUB_SHA")?;
    let commit = ShortCommit::parse(&sha)?;

    let repository = env_or_flag(cli.repo.clone(), "GITHUB_REPOSITORY")?;
    let (owner, repo) = repository
        .split_once('/')
        .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
        .with_context(|| format!("expected `owner/repo` coordinates, got `{repository}`"))?;

    let token = std::env::var("GITHUB_TOKEN").context("`GITHUB_TOKEN` is not set")?;

    let match_pattern = cli
        .assets_names_regex
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --assets-names-regex")?;

    let bytes = std::fs::read(&cli.asset_path)
        .with_context(|| format!("reading artifact `{}`", cli.asset_path.display()))?;

    Ok(Inputs {
        template,
        commit,
        owner: owner.to_string(),
        repo: repo.to_string(),
        policy: RetentionPolicy {
            max_releases: cli.max_releases,
            match_pattern,
        },
        token,
        artifact: ArtifactPayload {
            content_type: cli.asset_content_type.clone(),
            bytes,
        },
    })
}

fn env_or_flag(flag: Option<String>, var: &str) -> anyhow::Result<String> {
    match flag {
        Some(value) => Ok(value),
        None => std::env::var(var)
            .map_err(|_| anyhow::anyhow!("`{var}` is not set and no flag override was given")),
    }
}

/// Execute one rotation run and report its outputs.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let inputs = resolve(&cli)?;
    tracing::info!(
        "rotating assets on release {} of {}/{}",
        cli.release_id,
        inputs.owner,
        inputs.repo
    );
    let host = GitHubReleaseClient::with_bases(
        inputs.token,
        &inputs.owner,
        &inputs.repo,
        cli.release_id,
        &cli.api_url,
        &cli.upload_url,
    )?;

    let outcome = rotate(
        &host,
        &inputs.template,
        &inputs.commit,
        &inputs.policy,
        inputs.artifact,
    )
    .await?;

    report(&outcome)
}

/// Print `key=value` outputs to stdout and, when running under a workflow
/// with `GITHUB_OUTPUT` set, append the same lines there.
fn report(outcome: &RotateOutcome) -> anyhow::Result<()> {
    let mut lines = vec![format!("uploaded={}", outcome.uploaded)];
    if let Some(url) = &outcome.url {
        lines.push(format!("url={url}"));
    }
    for line in &lines {
        println!("{line}");
    }

    if let Ok(path) = std::env::var("GITHUB_OUTPUT")
        && !path.is_empty()
    {
        use std::io::Write as _;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening `{path}` for outputs"))?;
        for line in &lines {
            writeln!(file, "{line}")?;
        }
    }
    Ok(())
}
