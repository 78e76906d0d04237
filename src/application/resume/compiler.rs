use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::process::Command;

/// Exit status and diagnostics of one compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOutput {
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl CompilerOutput {
    /// A run only counts as successful with exit code zero and a silent error stream.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0) && self.stderr.is_empty()
    }
}

/// Turns a markup source file into an artifact inside `out_dir`.
///
/// The artifact must be written as `<out_dir>/<source stem>.pdf`.
#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    async fn compile(&self, source: &Path, out_dir: &Path) -> io::Result<CompilerOutput>;
}

/// Runs `pdflatex` (or a compatible executable) as a child process.
#[derive(Debug, Clone)]
pub struct PdfLatexCompiler {
    program: PathBuf,
}

impl PdfLatexCompiler {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

#[async_trait]
impl DocumentCompiler for PdfLatexCompiler {
    async fn compile(&self, source: &Path, out_dir: &Path) -> io::Result<CompilerOutput> {
        let mut output_dir_arg = OsString::from("-output-directory=");
        output_dir_arg.push(out_dir);

        // kill_on_drop lets a caller-side timeout terminate a stuck compiler.
        let output = Command::new(&self.program)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(output_dir_arg)
            .arg(source)
            .current_dir(out_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CompilerOutput {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
