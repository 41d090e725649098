//! Publish sink: the external mechanism that makes a finished dataset
//! visible to consumers. Injected as a capability so the pipeline never
//! assumes network access to a remote repository, and so tests can swap in
//! a no-op.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::PublishError;

#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn publish(&self, json: &Path, csv: &Path, label: &str) -> Result<(), PublishError>;
}

/// Commits and pushes the artifacts inside an existing git checkout. The
/// checkout is assumed to already track the right remote and branch; this
/// just stages the two files, commits with the run label, and pushes.
pub struct GitPublisher {
    repo_dir: PathBuf,
}

impl GitPublisher {
    pub fn new(repo_dir: PathBuf) -> Self {
        Self { repo_dir }
    }

    async fn git(&self, args: &[&str]) -> Result<Output, PublishError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|err| PublishError(format!("git {}: {err}", args.join(" "))))
    }

    fn check(step: &str, output: &Output) -> Result<(), PublishError> {
        if output.status.success() {
            Ok(())
        } else {
            Err(PublishError(format!(
                "git {step} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[async_trait]
impl PublishSink for GitPublisher {
    async fn publish(&self, json: &Path, csv: &Path, label: &str) -> Result<(), PublishError> {
        let json = json.to_string_lossy();
        let csv = csv.to_string_lossy();

        let add = self.git(&["add", "--", json.as_ref(), csv.as_ref()]).await?;
        Self::check("add", &add)?;

        let commit = self.git(&["commit", "-m", label]).await?;
        if !commit.status.success() {
            let stdout = String::from_utf8_lossy(&commit.stdout);
            // An unchanged dataset is a valid outcome, not a publish failure.
            if stdout.contains("nothing to commit") {
                info!("dataset unchanged since last publish; nothing to commit");
                return Ok(());
            }
            return Self::check("commit", &commit);
        }

        let push = self.git(&["push"]).await?;
        Self::check("push", &push)
    }
}

/// Leaves the artifacts where the writer put them. Used when no publish
/// repository is configured, and in tests.
pub struct NoopPublisher;

#[async_trait]
impl PublishSink for NoopPublisher {
    async fn publish(&self, _json: &Path, _csv: &Path, label: &str) -> Result<(), PublishError> {
        info!(label, "publication disabled; artifacts remain local");
        Ok(())
    }
}
