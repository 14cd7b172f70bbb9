//! Mermaid rendering through the `mmdc` command-line tool.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use super::{DiagramRenderer, RenderError};
use crate::consts::{DEFAULT_MERMAID_BACKGROUND, PROCESS_POLL_INTERVAL};
use crate::language::DiagramLanguage;
use crate::png::is_png;

const MMDC: &str = "mmdc";

/// Renders Mermaid diagrams by running `mmdc` as a child process.
///
/// The child is killed when it runs longer than the configured timeout.
#[derive(Debug, Clone)]
pub struct MermaidCliRenderer {
    program: PathBuf,
    timeout: Duration,
}

impl MermaidCliRenderer {
    /// Create a renderer that runs `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Locate `mmdc`, preferring an explicitly configured path over `PATH` lookup.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Io` when no executable can be found.
    pub fn discover(explicit: Option<&Path>, timeout: Duration) -> Result<Self, RenderError> {
        let program = match explicit {
            Some(path) => path.to_path_buf(),
            None => which::which(MMDC).map_err(|e| {
                RenderError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{MMDC} not found in PATH: {e}"),
                ))
            })?,
        };
        Ok(Self::new(program, timeout))
    }

    /// Executable this renderer runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl DiagramRenderer for MermaidCliRenderer {
    fn supports(&self, language: DiagramLanguage) -> bool {
        language == DiagramLanguage::Mermaid
    }

    fn render(&self, language: DiagramLanguage, source: &str) -> Result<Vec<u8>, RenderError> {
        if !self.supports(language) {
            return Err(RenderError::Unsupported(language));
        }

        let workdir = tempfile::TempDir::new()?;
        let input = workdir.path().join("diagram.mmd");
        let output = workdir.path().join("diagram.png");
        let stderr_path = workdir.path().join("stderr.log");
        std::fs::write(&input, source)?;

        let mut child = Command::new(&self.program)
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-b")
            .arg(DEFAULT_MERMAID_BACKGROUND)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(File::create(&stderr_path)?))
            .spawn()?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                // The process may have exited between the poll and the kill.
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(program = %self.program.display(), "mmdc timed out, killed");
                return Err(RenderError::Timeout(self.timeout));
            }
            std::thread::sleep(PROCESS_POLL_INTERVAL);
        };

        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(RenderError::Process {
                status: status.to_string(),
                stderr: stderr.trim().to_owned(),
            });
        }

        let data = std::fs::read(&output)?;
        if !is_png(&data) {
            return Err(RenderError::InvalidPng);
        }
        Ok(data)
    }
}
