//! Recording retrieval and transcoding.
//!
//! Downloads a call recording with a bounded retry budget and converts it into
//! the encoding the transcription provider expects. Every intermediate file is
//! tagged with the call id and lives in a scoped work directory; `sweep`
//! removes anything left behind when the pipeline fails partway through.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct RecordingPipeline {
    client: reqwest::Client,
    work_dir: PathBuf,
    fetch_attempts: u32,
    retry_delay: Duration,
}

impl RecordingPipeline {
    pub fn new(work_dir: PathBuf, fetch_attempts: u32, retry_delay: Duration) -> Result<Self> {
        std::fs::create_dir_all(&work_dir).context("Failed to create recording work directory")?;

        Ok(Self {
            client: reqwest::Client::new(),
            work_dir,
            fetch_attempts: fetch_attempts.max(1),
            retry_delay,
        })
    }

    /// Check if ffmpeg is available on the system.
    pub fn check_ffmpeg_available() -> bool {
        std::process::Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Fetch and transcode a recording, returning a transcription-ready file.
    /// The caller owns the returned file and removes it via [`Self::cleanup`].
    pub async fn retrieve(&self, recording_url: &str, call_id: &str) -> Result<PathBuf> {
        let raw = match self.fetch(recording_url, call_id).await {
            Ok(path) => path,
            Err(e) => {
                self.sweep(call_id);
                return Err(e);
            }
        };

        let prepared = self.transcode(&raw, call_id).await;
        self.cleanup(&raw);

        match prepared {
            Ok(path) => Ok(path),
            Err(e) => {
                self.sweep(call_id);
                Err(e)
            }
        }
    }

    async fn fetch(&self, recording_url: &str, call_id: &str) -> Result<PathBuf> {
        let target = self.work_dir.join(format!("{call_id}-{}.raw", Uuid::new_v4()));
        let mut last_err = None;

        for attempt in 1..=self.fetch_attempts {
            match self.try_fetch(recording_url, &target).await {
                Ok(()) => {
                    debug!(
                        "Fetched recording for call {} on attempt {}: {:?}",
                        call_id, attempt, target
                    );
                    return Ok(target);
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} to fetch recording for call {} failed: {e:#}",
                        attempt, self.fetch_attempts, call_id
                    );
                    last_err = Some(e);
                    if attempt < self.fetch_attempts {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("recording fetch failed"))).with_context(|| {
            format!(
                "Recording unreachable after {} attempts: {}",
                self.fetch_attempts, recording_url
            )
        })
    }

    async fn try_fetch(&self, recording_url: &str, target: &Path) -> Result<()> {
        let response = self
            .client
            .get(recording_url)
            .send()
            .await
            .context("Failed to request recording")?;

        let status = response.status();
        if !status.is_success() {
            bail!("recording host returned status {}", status);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read recording body")?;
        if bytes.is_empty() {
            bail!("recording body was empty");
        }

        tokio::fs::write(target, &bytes)
            .await
            .context("Failed to write recording to work directory")?;

        Ok(())
    }

    /// Transcode to 16kHz mono MP3, the format the transcription API expects.
    async fn transcode(&self, input: &Path, call_id: &str) -> Result<PathBuf> {
        let output = self.work_dir.join(format!("{call_id}-{}.mp3", Uuid::new_v4()));

        let result = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args(["-vn", "-ac", "1", "-ar", "16000"])
            .args(["-codec:a", "libmp3lame", "-b:a", "64k", "-y"])
            .arg(&output)
            .output()
            .await
            .context("Failed to run ffmpeg")?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            bail!("ffmpeg transcode failed: {}", stderr);
        }

        if !output.exists() {
            bail!("ffmpeg did not produce an output file");
        }

        info!("Transcoded recording for call {}: {:?}", call_id, output);
        Ok(output)
    }

    /// Remove a single pipeline file. Missing files are fine.
    pub fn cleanup(&self, path: &Path) {
        let _ = std::fs::remove_file(path);
    }

    /// Remove every leftover work file tagged with this call id.
    pub fn sweep(&self, call_id: &str) {
        let prefix = format!("{call_id}-");
        let Ok(entries) = std::fs::read_dir(&self.work_dir) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                debug!("Sweeping leftover work file {:?}", entry.path());
                let _ = std::fs::remove_file(entry.path());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pipeline(dir: &Path) -> RecordingPipeline {
        RecordingPipeline::new(dir.to_path_buf(), 3, Duration::from_millis(10)).unwrap()
    }

    #[test]
    fn test_new_creates_work_dir() {
        let dir = tempdir().unwrap();
        let work = dir.path().join("nested").join("work");
        pipeline(&work);
        assert!(work.exists());
    }

    #[test]
    fn test_sweep_removes_only_tagged_files() {
        let dir = tempdir().unwrap();
        let p = pipeline(dir.path());

        let mine = dir.path().join("CA1-abc.raw");
        let other = dir.path().join("CA2-def.raw");
        std::fs::write(&mine, b"x").unwrap();
        std::fs::write(&other, b"y").unwrap();

        p.sweep("CA1");
        assert!(!mine.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_cleanup_ignores_missing_file() {
        let dir = tempdir().unwrap();
        let p = pipeline(dir.path());
        p.cleanup(&dir.path().join("does-not-exist.mp3"));
    }

    #[tokio::test]
    async fn test_retrieve_unreachable_host_exhausts_retries_and_sweeps() {
        let dir = tempdir().unwrap();
        let p = pipeline(dir.path());

        // Port 9 (discard) refuses connections, so every attempt fails fast.
        let result = p.retrieve("http://127.0.0.1:9/rec.wav", "CA-gone").await;
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("after 3 attempts"));

        // Nothing tagged with the call id survives.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with("CA-gone-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
