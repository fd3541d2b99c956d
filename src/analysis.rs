//! Static code-quality analysis through an external program
//!
//! The pipeline only needs a map of metric name → number per repository.
//! `CommandAnalyzer` gets it by running a configured program against a
//! checkout and reading a JSON object from its stdout; `GitCheckout`
//! provides the checkout.

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::model::RepositoryRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Produces quality metrics for one repository
#[async_trait]
pub trait QualityAnalyzer: Send + Sync {
    /// Metrics by name; an error means "metrics absent" for this repository
    async fn analyze(&self, record: &RepositoryRecord) -> Result<BTreeMap<String, f64>>;
}

/// Shallow git clones under a working directory
#[derive(Debug, Clone)]
pub struct GitCheckout {
    workdir: PathBuf,
    timeout: Duration,
}

impl GitCheckout {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
        }
    }

    /// Where a repository is checked out
    pub fn path_for(&self, record: &RepositoryRecord) -> PathBuf {
        self.workdir
            .join(format!("{}__{}", record.owner, record.name))
    }

    /// Clone the default branch at depth 1, replacing any previous checkout
    pub async fn checkout(&self, record: &RepositoryRecord) -> Result<PathBuf> {
        let dest = self.path_for(record);
        tokio::fs::create_dir_all(&self.workdir).await?;
        if tokio::fs::try_exists(&dest).await? {
            tokio::fs::remove_dir_all(&dest).await?;
        }

        info!("Cloning {} into {}", record.url, dest.display());
        let output = run(clone_command(&record.url, &dest), self.timeout).await?;
        if !output.status.success() {
            return Err(Error::analysis(format!(
                "git clone of {} failed: {}",
                record.full_name(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(dest)
    }

    /// Delete a checkout
    pub async fn remove(&self, path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path).await? {
            tokio::fs::remove_dir_all(path).await?;
        }
        Ok(())
    }
}

/// `git clone`; the URL follows `--` so it is never read as an option
fn clone_command(url: &str, dest: &Path) -> Command {
    let mut command = Command::new("git");
    command
        .args(["clone", "--depth", "1", "--quiet", "--", url])
        .arg(dest);
    command
}

/// Runs a configured program with the checkout path as its last argument
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    config: AnalysisConfig,
    checkout: GitCheckout,
}

impl CommandAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let checkout = GitCheckout::new(
            config.workdir.clone(),
            Duration::from_secs(config.timeout_secs),
        );
        Self { config, checkout }
    }

    async fn run_program(&self, path: &Path) -> Result<BTreeMap<String, f64>> {
        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args).arg(path);
        debug!("Running {:?}", command);

        let output = run(command, Duration::from_secs(self.config.timeout_secs)).await?;
        if !output.status.success() {
            return Err(Error::analysis(format!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_metrics(&output.stdout)
    }
}

#[async_trait]
impl QualityAnalyzer for CommandAnalyzer {
    async fn analyze(&self, record: &RepositoryRecord) -> Result<BTreeMap<String, f64>> {
        if !self.config.clone {
            return self.run_program(&self.checkout.path_for(record)).await;
        }

        let path = self.checkout.checkout(record).await?;
        let result = self.run_program(&path).await;
        if let Err(e) = self.checkout.remove(&path).await {
            warn!("Could not remove {}: {}", path.display(), e);
        }
        result
    }
}

async fn run(mut command: Command, limit: Duration) -> Result<Output> {
    command.kill_on_drop(true);
    match tokio::time::timeout(limit, command.output()).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(Error::Timeout {
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Parse `{"metric": number, ...}`; non-numeric entries are skipped
pub fn parse_metrics(stdout: &[u8]) -> Result<BTreeMap<String, f64>> {
    let value: Value = serde_json::from_slice(stdout)
        .map_err(|e| Error::analysis(format!("analyzer output is not JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(Error::analysis("analyzer output is not a JSON object"));
    };

    Ok(map
        .into_iter()
        .filter_map(|(name, v)| v.as_f64().filter(|f| f.is_finite()).map(|f| (name, f)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record() -> RepositoryRecord {
        RepositoryRecord {
            name: "widget".to_string(),
            owner: "acme".to_string(),
            url: "https://github.com/acme/widget".to_string(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            star_count: 0,
            merged_pr_count: 0,
            release_count: 0,
            open_issue_count: 0,
            closed_issue_count: 0,
            primary_language: "Java".to_string(),
            enrichment: Default::default(),
            quality: BTreeMap::new(),
        }
    }

    fn shell(script: &str, workdir: &Path) -> CommandAnalyzer {
        CommandAnalyzer::new(AnalysisConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            workdir: workdir.to_path_buf(),
            clone: false,
            timeout_secs: 5,
        })
    }

    #[test]
    fn test_parse_metrics() {
        let metrics = parse_metrics(br#"{"cbo": 5.25, "dit": 2, "note": "x"}"#).unwrap();
        assert_eq!(
            metrics,
            BTreeMap::from([("cbo".to_string(), 5.25), ("dit".to_string(), 2.0)])
        );
        assert!(parse_metrics(b"[1, 2]").is_err());
        assert!(parse_metrics(b"not json").is_err());
    }

    #[test]
    fn test_checkout_path() {
        let checkout = GitCheckout::new("/tmp/work", Duration::from_secs(1));
        assert_eq!(
            checkout.path_for(&record()),
            PathBuf::from("/tmp/work/acme__widget")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_analyzer_reads_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = shell(r#"echo "{\"lcom\": 12.5}""#, dir.path());
        let metrics = analyzer.analyze(&record()).await.unwrap();
        assert_eq!(metrics.get("lcom"), Some(&12.5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_analyzer_passes_path() {
        let dir = tempfile::tempdir().unwrap();
        // with `sh -c`, the trailing path argument becomes $0
        let analyzer = shell(r#"case "$0" in *acme__widget) echo '{"ok": 1}';; *) exit 1;; esac"#, dir.path());
        assert!(analyzer.analyze(&record()).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_analyzer_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = shell("echo boom >&2; exit 3", dir.path());
        let err = analyzer.analyze(&record()).await.unwrap_err();
        assert!(matches!(err, Error::Analysis { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_analyzer_malformed_output() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = shell("echo not-json", dir.path());
        assert!(analyzer.analyze(&record()).await.is_err());
    }

    #[test]
    fn test_clone_url_is_not_an_option() {
        let command = clone_command("--upload-pack=touch pwned", Path::new("/tmp/work/x"));
        let args: Vec<_> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["clone", "--depth", "1", "--quiet", "--", "--upload-pack=touch pwned", "/tmp/work/x"]
        );
    }

    #[tokio::test]
    async fn test_remove_missing_checkout_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = GitCheckout::new(dir.path(), Duration::from_secs(1));
        checkout.remove(&dir.path().join("absent")).await.unwrap();
    }
}
