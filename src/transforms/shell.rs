// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Shell step
//!
//! Pipes asset content through an external command: content on stdin,
//! transformed content on stdout.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{Transform, TransformContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::pipeline::Asset;

/// Runs a shell command as a transform
pub struct ShellStep {
    command: String,
    shell: String,
}

impl ShellStep {
    /// Create a new shell step
    pub fn new(command: String, shell: String) -> Self {
        Self { command, shell }
    }
}

#[async_trait]
impl Transform for ShellStep {
    fn name(&self) -> &str {
        "shell"
    }

    fn fingerprint(&self) -> String {
        format!("shell({}:{})", self.shell, self.command)
    }

    async fn apply(
        &self,
        asset: &Asset,
        ctx: &TransformContext,
    ) -> Result<TransformOutput, AssetflowError> {
        debug!(asset = %asset.id, command = %self.command, "running shell step");

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(&self.command);
        cmd.current_dir(ctx.base_dir());
        cmd.env("ASSETFLOW_ENV", ctx.environment());
        cmd.env("ASSETFLOW_ASSET", &asset.id);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| AssetflowError::transform(&asset.id, self.name(), e))?;

        // Feed stdin concurrently so a chatty command cannot deadlock on a full pipe
        let stdin = child.stdin.take();
        let input = asset.content.clone();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                // A command that ignores stdin may close it early
                let _ = stdin.write_all(&input).await;
            }
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AssetflowError::transform(&asset.id, self.name(), e))?;
        let _ = writer.await;

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AssetflowError::transform(
                &asset.id,
                self.name(),
                format!("exit {}: {}", code, stderr.trim()),
            ));
        }

        Ok(TransformOutput::content(output.stdout))
    }

    async fn check_available(&self) -> Result<bool, AssetflowError> {
        Ok(which::which(&self.shell).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::test_support::context;

    #[tokio::test]
    async fn test_pipes_content_through_command() {
        let step = ShellStep::new("tr a-z A-Z".into(), "sh".into());
        let asset = Asset::new("a.txt", "hello");

        let out = step.apply(&asset, &context("development")).await.unwrap();
        assert_eq!(out.content, b"HELLO");
    }

    #[tokio::test]
    async fn test_command_sees_environment() {
        let step = ShellStep::new("printf '%s' \"$ASSETFLOW_ENV\"".into(), "sh".into());
        let asset = Asset::new("a.txt", "");

        let out = step.apply(&asset, &context("production")).await.unwrap();
        assert_eq!(out.content, b"production");
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let step = ShellStep::new("echo broken >&2; exit 3".into(), "sh".into());
        let asset = Asset::new("a.txt", "x");

        let err = step.apply(&asset, &context("development")).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exit 3"));
        assert!(message.contains("broken"));
    }

    #[tokio::test]
    async fn test_check_available() {
        let step = ShellStep::new("true".into(), "definitely-not-a-shell-xyz".into());
        assert!(!step.check_available().await.unwrap());
    }
}
