// src/transform/command.rs

//! External processor transform.
//!
//! The asset is written to the command's stdin and whatever the command
//! prints on stdout becomes the new contents. A non-zero exit is a transform
//! error carrying the command's stderr.

use std::path::PathBuf;
use std::process::Stdio;

use futures::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Asset, Transform};
use crate::errors::{Result, SitepipeError};

/// Environment variable holding the source path of the asset being processed.
pub const SOURCE_FILE_ENV: &str = "SITEPIPE_FILE";

#[derive(Debug, Clone)]
pub struct CommandTransform {
    cmd: String,
    extension: Option<String>,
    cwd: PathBuf,
}

impl CommandTransform {
    pub fn new(cmd: String, extension: Option<String>, cwd: PathBuf) -> Self {
        Self {
            cmd,
            extension,
            cwd,
        }
    }

    fn error(&self, asset: &Asset, message: String) -> SitepipeError {
        SitepipeError::Transform {
            unit: format!("command `{}`", self.cmd),
            path: asset.source.clone(),
            message,
        }
    }

    /// Build a shell command appropriate for the platform.
    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    async fn run(&self, mut asset: Asset) -> Result<Asset> {
        debug!(cmd = %self.cmd, source = ?asset.source, "running external processor");

        let mut cmd = self.shell();
        cmd.current_dir(&self.cwd)
            .env(SOURCE_FILE_ENV, &asset.source)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| self.error(&asset, format!("spawning process: {e}")))?;

        // Feed stdin concurrently with draining stdout so large assets cannot
        // deadlock on full pipe buffers.
        let input = std::mem::take(&mut asset.contents);
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                let res = stdin.write_all(&input).await;
                drop(stdin);
                res
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.error(&asset, format!("waiting for process: {e}")))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!(cmd = %self.cmd, "processor closed stdin early");
                }
                Ok(Err(e)) => warn!(cmd = %self.cmd, error = %e, "failed writing processor stdin"),
                Err(e) => warn!(cmd = %self.cmd, error = %e, "stdin writer task panicked"),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(self.error(
                &asset,
                format!("exited with status {code}: {}", stderr.trim()),
            ));
        }

        asset.contents = output.stdout;
        Ok(asset.with_extension(self.extension.as_deref()))
    }
}

impl Transform for CommandTransform {
    fn name(&self) -> &str {
        "command"
    }

    fn apply<'a>(&'a self, asset: Asset) -> BoxFuture<'a, Result<Asset>> {
        Box::pin(self.run(asset))
    }
}
