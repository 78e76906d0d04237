//! Per-request compilation workspace inside the shared working directory.

use std::{
    io,
    path::{Path, PathBuf},
};

use metrics::counter;
use tempfile::TempDir;
use tracing::{debug, warn};

const JOB_PREFIX: &str = "resume_";
const SOURCE_FILE: &str = "resume.tex";
const OUTPUT_FILE: &str = "resume.pdf";

/// A private directory holding everything one compilation writes.
///
/// The directory and its contents (source, artifact and whatever auxiliary
/// files the compiler leaves behind) are removed by [`CompilationJob::close`],
/// or on drop when the job is abandoned mid-flight.
#[derive(Debug)]
pub struct CompilationJob {
    id: String,
    dir: TempDir,
    source_path: PathBuf,
    output_path: PathBuf,
}

impl CompilationJob {
    pub fn new(work_dir: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(JOB_PREFIX)
            .tempdir_in(work_dir)?;
        let id = dir
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source_path = dir.path().join(SOURCE_FILE);
        let output_path = dir.path().join(OUTPUT_FILE);

        Ok(Self {
            id,
            dir,
            source_path,
            output_path,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Remove the job directory. Failures are logged and counted, never returned.
    pub fn close(self) {
        let Self { id, dir, .. } = self;
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!(
                target = "application::resume::job",
                op = "job::cleanup",
                job_id = %id,
                "Job directory removed"
            ),
            Err(err) => {
                counter!("jobdesk_cleanup_failure_total").increment(1);
                warn!(
                    target = "application::resume::job",
                    op = "job::cleanup",
                    job_id = %id,
                    path = %path.display(),
                    error = %err,
                    "Failed to remove job directory"
                );
            }
        }
    }
}
