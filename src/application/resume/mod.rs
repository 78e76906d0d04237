//! Résumé compilation pipeline: markup in, PDF bytes out, no files left behind.

mod compiler;
mod job;

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

pub use compiler::{CompilerOutput, DocumentCompiler, PdfLatexCompiler};
pub use job::CompilationJob;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Pipeline step at which a compilation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStage {
    Write,
    Invoke,
    Timeout,
    Locate,
    Send,
}

impl CompileStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CompileStage::Write => "write",
            CompileStage::Invoke => "invoke",
            CompileStage::Timeout => "timeout",
            CompileStage::Locate => "locate",
            CompileStage::Send => "send",
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to write markup source")]
    Write(#[source] io::Error),
    #[error("failed to launch compiler")]
    Spawn(#[source] io::Error),
    #[error("compiler failed (exit {exit_code:?}): {stderr}")]
    Compiler {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("compiler did not finish within {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("compiled artifact missing at `{}`", path.display())]
    Locate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read compiled artifact")]
    Read(#[source] io::Error),
}

impl CompileError {
    pub fn stage(&self) -> CompileStage {
        match self {
            CompileError::Write(_) => CompileStage::Write,
            CompileError::Spawn(_) | CompileError::Compiler { .. } => CompileStage::Invoke,
            CompileError::Timeout(_) => CompileStage::Timeout,
            CompileError::Locate { .. } => CompileStage::Locate,
            CompileError::Read(_) => CompileStage::Send,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub job_id: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct ResumeService {
    compiler: Arc<dyn DocumentCompiler>,
    work_dir: PathBuf,
    timeout: Duration,
}

impl ResumeService {
    /// Create the service, making sure the working directory exists.
    pub fn new(
        compiler: Arc<dyn DocumentCompiler>,
        work_dir: PathBuf,
        timeout: Duration,
    ) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&work_dir)?;
        Ok(Self {
            compiler,
            work_dir,
            timeout,
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Compile `markup` into a PDF.
    ///
    /// The job directory is removed before this returns, whatever the outcome.
    /// If the returned future is dropped early it is removed as well.
    pub async fn compile(&self, markup: &str) -> Result<CompiledArtifact, CompileError> {
        let started_at = Instant::now();
        let (job_id, result) = match CompilationJob::new(&self.work_dir) {
            Ok(job) => {
                let job_id = job.id().to_string();
                let result = self.run(&job, markup).await;
                job.close();
                (job_id, result)
            }
            Err(err) => (String::new(), Err(CompileError::Write(err))),
        };

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        histogram!("jobdesk_compile_ms").record(elapsed_ms as f64);

        match &result {
            Ok(artifact) => {
                counter!("jobdesk_compile_total", "result" => "ok").increment(1);
                info!(
                    target = "application::resume",
                    op = "resume::compile",
                    result = "ok",
                    job_id = %job_id,
                    elapsed_ms,
                    markup_bytes = markup.len(),
                    artifact_bytes = artifact.bytes.len(),
                    "Résumé compiled"
                );
            }
            Err(err) => {
                let stage = err.stage().as_str();
                counter!("jobdesk_compile_total", "result" => stage).increment(1);
                warn!(
                    target = "application::resume",
                    op = "resume::compile",
                    result = "error",
                    job_id = %job_id,
                    elapsed_ms,
                    stage,
                    error = %err,
                    "Résumé compilation failed"
                );
            }
        }

        result
    }

    async fn run(
        &self,
        job: &CompilationJob,
        markup: &str,
    ) -> Result<CompiledArtifact, CompileError> {
        fs::write(job.source_path(), markup.as_bytes())
            .await
            .map_err(CompileError::Write)?;

        let invocation = self.compiler.compile(job.source_path(), job.dir());
        let output = match tokio::time::timeout(self.timeout, invocation).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(CompileError::Spawn(err)),
            Err(_) => return Err(CompileError::Timeout(self.timeout)),
        };

        if !output.succeeded() {
            return Err(CompileError::Compiler {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        let output_path = job.output_path();
        match fs::metadata(output_path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                return Err(CompileError::Locate {
                    path: output_path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::InvalidData, "not a regular file"),
                });
            }
            Err(source) => {
                return Err(CompileError::Locate {
                    path: output_path.to_path_buf(),
                    source,
                });
            }
        }

        let bytes = fs::read(output_path).await.map_err(CompileError::Read)?;

        Ok(CompiledArtifact {
            job_id: job.id().to_string(),
            content_type: PDF_CONTENT_TYPE,
            bytes: Bytes::from(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    enum Behavior {
        Echo,
        Exit(i32, &'static str),
        PartialThenFail,
        NoArtifact,
        DirectoryArtifact,
        Hang,
        SpawnError,
    }

    struct ScriptedCompiler(Behavior);

    #[async_trait]
    impl DocumentCompiler for ScriptedCompiler {
        async fn compile(&self, source: &Path, _out_dir: &Path) -> io::Result<CompilerOutput> {
            let artifact = source.with_extension("pdf");
            let ok = CompilerOutput {
                exit_code: Some(0),
                stderr: String::new(),
            };
            match &self.0 {
                Behavior::Echo => {
                    let markup = fs::read(source).await?;
                    fs::write(&artifact, markup).await?;
                    fs::write(source.with_extension("log"), "log").await?;
                    Ok(ok)
                }
                Behavior::Exit(code, stderr) => Ok(CompilerOutput {
                    exit_code: Some(*code),
                    stderr: (*stderr).to_string(),
                }),
                Behavior::PartialThenFail => {
                    fs::write(&artifact, "%PDF-partial").await?;
                    Ok(CompilerOutput {
                        exit_code: Some(1),
                        stderr: "! Emergency stop.".to_string(),
                    })
                }
                Behavior::NoArtifact => Ok(ok),
                Behavior::DirectoryArtifact => {
                    fs::create_dir(&artifact).await?;
                    Ok(ok)
                }
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(ok)
                }
                Behavior::SpawnError => Err(io::Error::new(io::ErrorKind::NotFound, "no pdflatex")),
            }
        }
    }

    fn service(dir: &TempDir, behavior: Behavior) -> ResumeService {
        ResumeService::new(
            Arc::new(ScriptedCompiler(behavior)),
            dir.path().join("work"),
            Duration::from_millis(200),
        )
        .expect("service")
    }

    fn residual_files(service: &ResumeService) -> Vec<String> {
        std::fs::read_dir(service.work_dir())
            .expect("read work dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn returns_artifact_bytes_and_cleans_up() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::Echo);

        let artifact = service.compile("\\section{Hi}").await.expect("artifact");

        assert_eq!(artifact.bytes.as_ref(), b"\\section{Hi}");
        assert_eq!(artifact.content_type, PDF_CONTENT_TYPE);
        assert!(artifact.job_id.starts_with("resume_"));
        assert!(residual_files(&service).is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_fails_at_invoke() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::Exit(1, ""));

        let err = service.compile("x").await.expect_err("failure");
        assert_eq!(err.stage(), CompileStage::Invoke);
        assert!(residual_files(&service).is_empty());
    }

    #[tokio::test]
    async fn stderr_output_fails_at_invoke() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::Exit(0, "warning"));

        let err = service.compile("x").await.expect_err("failure");
        match err {
            CompileError::Compiler { exit_code, stderr } => {
                assert_eq!(exit_code, Some(0));
                assert_eq!(stderr, "warning");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn partial_artifact_is_discarded() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::PartialThenFail);

        let err = service.compile("x").await.expect_err("failure");
        assert_eq!(err.stage(), CompileStage::Invoke);
        assert!(residual_files(&service).is_empty());
    }

    #[tokio::test]
    async fn missing_artifact_fails_at_locate() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::NoArtifact);

        let err = service.compile("x").await.expect_err("failure");
        assert_eq!(err.stage(), CompileStage::Locate);
        assert!(residual_files(&service).is_empty());
    }

    #[tokio::test]
    async fn unreadable_artifact_fails_at_locate() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::DirectoryArtifact);

        let err = service.compile("x").await.expect_err("failure");
        assert_eq!(err.stage(), CompileStage::Locate);
    }

    #[tokio::test]
    async fn slow_compiler_times_out() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::Hang);

        let err = service.compile("x").await.expect_err("timeout");
        assert_eq!(err.stage(), CompileStage::Timeout);
        assert!(residual_files(&service).is_empty());
    }

    #[tokio::test]
    async fn launch_failure_fails_at_invoke() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::SpawnError);

        let err = service.compile("x").await.expect_err("spawn error");
        assert!(matches!(err, CompileError::Spawn(_)));
        assert_eq!(err.stage(), CompileStage::Invoke);
        assert!(residual_files(&service).is_empty());
    }

    #[tokio::test]
    async fn missing_work_dir_fails_at_write() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::Echo);
        std::fs::remove_dir_all(service.work_dir()).expect("remove work dir");

        let err = service.compile("x").await.expect_err("write failure");
        assert_eq!(err.stage(), CompileStage::Write);
    }

    struct RecordingCompiler(std::sync::Mutex<Vec<(PathBuf, PathBuf)>>);

    #[async_trait]
    impl DocumentCompiler for RecordingCompiler {
        async fn compile(&self, source: &Path, out_dir: &Path) -> io::Result<CompilerOutput> {
            if let Ok(mut calls) = self.0.lock() {
                calls.push((source.to_path_buf(), out_dir.to_path_buf()));
            }
            fs::write(out_dir.join("resume.pdf"), "%PDF").await?;
            fs::write(out_dir.join("resume.aux"), "aux").await?;
            Ok(CompilerOutput {
                exit_code: Some(0),
                stderr: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn compiler_runs_in_a_private_job_directory() {
        let dir = TempDir::new().expect("temp dir");
        let compiler = Arc::new(RecordingCompiler(std::sync::Mutex::new(Vec::new())));
        let service = ResumeService::new(
            compiler.clone(),
            dir.path().join("work"),
            Duration::from_secs(5),
        )
        .expect("service");

        service.compile("a").await.expect("first");
        service.compile("b").await.expect("second");

        let calls = compiler.0.lock().expect("calls").clone();
        assert_eq!(calls.len(), 2);
        for (source, out_dir) in &calls {
            assert_eq!(source.parent(), Some(out_dir.as_path()));
            assert_eq!(out_dir.parent(), Some(service.work_dir()));
        }
        assert_ne!(calls[0].1, calls[1].1);
        assert!(residual_files(&service).is_empty());
    }

    #[tokio::test]
    async fn dropped_compilation_still_cleans_up() {
        let dir = TempDir::new().expect("temp dir");
        let service = service(&dir, Behavior::Hang);

        let pending = service.compile("x");
        let _ = tokio::time::timeout(Duration::from_millis(50), pending).await;

        assert!(residual_files(&service).is_empty());
    }
}
