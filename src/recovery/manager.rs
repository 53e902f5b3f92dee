use super::{PendingUrl, RecoveryError, RecoveryResult, RecoveryState};
use crate::config::{compute_config_checksum, Config};
use crate::state::CrawlState;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome of looking at the checkpoint file on disk
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    /// Checkpoint parsed and matches the current configuration
    Valid(RecoveryState),

    /// Checkpoint parsed but was written under a different configuration
    ConfigMismatch { saved: String, current: String },

    /// No checkpoint file exists
    NotFound,

    /// Checkpoint exists but cannot be read or parsed
    Corrupt(String),

    /// Recovery is turned off in the configuration
    Disabled,
}

impl Resume {
    /// Short label used by `--recovery-info` and log fields
    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::ConfigMismatch { .. } => "config mismatch",
            Self::NotFound => "not found",
            Self::Corrupt(_) => "corrupt",
            Self::Disabled => "disabled",
        }
    }
}

/// What `--recovery-info` prints
#[derive(Debug, Clone)]
pub struct ResumeInfo {
    pub path: PathBuf,
    pub verdict: Resume,
}

/// Owns the checkpoint file of one crawl
///
/// Writes go to `<recovery-file>.tmp` first and are renamed over the real
/// file, so a reader only ever sees a complete checkpoint. Non-forced saves
/// only write every `save_interval` calls.
#[derive(Debug)]
pub struct RecoveryManager {
    path: PathBuf,
    save_interval: u64,
    enabled: bool,
    checksum: String,
    save_counter: u64,
}

impl RecoveryManager {
    /// Creates a manager for the checkpoint described by `config`
    pub fn new(config: &Config) -> Self {
        Self {
            path: PathBuf::from(&config.recovery.recovery_file),
            save_interval: u64::from(config.recovery.save_interval.max(1)),
            enabled: config.recovery.enable_recovery,
            checksum: compute_config_checksum(config),
            save_counter: 0,
        }
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the staging file used during writes
    ///
    /// `.tmp` is appended to the full file name, so it never equals the
    /// checkpoint path itself.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("recovery_state"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Checksum of the current crawl-relevant configuration
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Saves a checkpoint of `state` and the queued `pending` URLs
    ///
    /// Without `force`, only every `save_interval`-th call writes. Returns
    /// whether a checkpoint was written. When recovery is disabled this is a
    /// no-op returning `Ok(false)`.
    pub fn save(
        &mut self,
        start_url: &str,
        state: &CrawlState,
        pending: &[PendingUrl],
        force: bool,
    ) -> RecoveryResult<bool> {
        if !self.enabled {
            return Ok(false);
        }

        if !force {
            self.save_counter += 1;
            if self.save_counter % self.save_interval != 0 {
                return Ok(false);
            }
        }

        let snapshot = RecoveryState::capture(start_url, state, pending, &self.checksum);
        self.write(&snapshot)?;

        info!(
            path = %self.path.display(),
            visited = snapshot.visited_urls.len(),
            processed = snapshot.processed_count,
            pending = snapshot.pending_urls.len(),
            forced = force,
            "Checkpoint saved"
        );
        Ok(true)
    }

    /// Atomically replaces the checkpoint file with `snapshot`
    pub fn write(&self, snapshot: &RecoveryState) -> RecoveryResult<()> {
        let temp = self.stage(snapshot)?;

        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        Ok(())
    }

    /// Writes `snapshot` to the staging file and syncs it, without renaming
    ///
    /// On failure the partial staging file is removed.
    pub fn stage(&self, snapshot: &RecoveryState) -> RecoveryResult<PathBuf> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.temp_path();
        if let Err(e) = write_synced(&temp, snapshot) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        Ok(temp)
    }

    /// Reads and classifies the checkpoint file
    pub fn inspect(&self) -> Resume {
        if !self.enabled {
            return Resume::Disabled;
        }

        match self.read() {
            Ok(state) if state.config_checksum == self.checksum => Resume::Valid(state),
            Ok(state) => Resume::ConfigMismatch {
                saved: state.config_checksum,
                current: self.checksum.clone(),
            },
            Err(RecoveryError::Missing(_)) => Resume::NotFound,
            Err(e) => Resume::Corrupt(e.to_string()),
        }
    }

    /// Returns true if a valid checkpoint exists for the current configuration
    pub fn can_resume(&self) -> bool {
        matches!(self.inspect(), Resume::Valid(_))
    }

    /// Loads the checkpoint, rejecting one written under another configuration
    pub fn load(&self) -> RecoveryResult<RecoveryState> {
        if !self.enabled {
            return Err(RecoveryError::Disabled);
        }

        let state = self.read()?;
        if state.config_checksum != self.checksum {
            return Err(RecoveryError::ChecksumMismatch {
                saved: state.config_checksum,
                current: self.checksum.clone(),
            });
        }

        Ok(state)
    }

    /// Deletes the checkpoint and any staging leftover
    ///
    /// Missing files are not an error, so calling this twice is fine.
    pub fn cleanup(&self) -> RecoveryResult<()> {
        if !self.enabled {
            return Ok(());
        }

        for path in [self.path.clone(), self.temp_path()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed checkpoint file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Summarizes the checkpoint for display
    pub fn resume_info(&self) -> ResumeInfo {
        ResumeInfo {
            path: self.path.clone(),
            verdict: self.inspect(),
        }
    }

    fn read(&self) -> RecoveryResult<RecoveryState> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RecoveryError::Missing(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let state = serde_json::from_reader(BufReader::new(file))?;
        Ok(state)
    }
}

fn write_synced(path: &Path, snapshot: &RecoveryState) -> RecoveryResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}
