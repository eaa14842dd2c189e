//! Post-interview hook abstraction and file-writing implementation.
//!
//! After a call reaches `ended`, the final transcript and score can be handed
//! to a hook for persistence (dashboard import, ATS sync, etc.). Hook failure
//! never affects anything else — the call is already over.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::generation::InterviewScore;
use crate::session::ConversationEntry;

/// Everything known about a finished interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewReport {
    pub call_id: String,
    pub job_role: String,
    pub completed_at: DateTime<Utc>,
    pub transcript: Vec<ConversationEntry>,
    pub score: InterviewScore,
}

#[async_trait]
pub trait PostInterviewHook: Send + Sync {
    async fn execute(&self, report: &InterviewReport) -> Result<()>;
}

/// Writes each report as pretty-printed JSON into the reports directory.
pub struct FileReportHook {
    reports_dir: PathBuf,
}

impl FileReportHook {
    pub fn new(reports_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&reports_dir).context("Failed to create reports directory")?;
        Ok(Self { reports_dir })
    }
}

#[async_trait]
impl PostInterviewHook for FileReportHook {
    async fn execute(&self, report: &InterviewReport) -> Result<()> {
        let path = self.reports_dir.join(format!("{}.json", report.call_id));
        let content =
            serde_json::to_string_pretty(report).context("Failed to serialize interview report")?;

        tokio::fs::write(&path, content)
            .await
            .context("Failed to write interview report")?;

        info!("Interview report saved: {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Speaker;
    use tempfile::tempdir;

    fn report() -> InterviewReport {
        InterviewReport {
            call_id: "CA1".to_string(),
            job_role: "Backend Engineer".to_string(),
            completed_at: Utc::now(),
            transcript: vec![ConversationEntry {
                speaker: Speaker::User,
                text: "I build Rust services".to_string(),
            }],
            score: InterviewScore {
                technical_score: 7,
                communication_score: 8,
                justification: "Clear and specific answers".to_string(),
                completion_status: "complete".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_file_hook_writes_parseable_report() {
        let dir = tempdir().unwrap();
        let hook = FileReportHook::new(dir.path().to_path_buf()).unwrap();

        hook.execute(&report()).await.unwrap();

        let path = dir.path().join("CA1.json");
        assert!(path.exists());

        let content = std::fs::read_to_string(path).unwrap();
        let parsed: InterviewReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.call_id, "CA1");
        assert_eq!(parsed.score.technical_score, 7);
    }

    #[tokio::test]
    async fn test_file_hook_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let hook = FileReportHook::new(nested.clone()).unwrap();
        hook.execute(&report()).await.unwrap();
        assert!(nested.join("CA1.json").exists());
    }
}
