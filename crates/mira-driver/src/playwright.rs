use std::process::Stdio;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::network::NetworkConditions;
use crate::page::{ConsoleLine, DriverError, DriverResult, PageDriver, SelectorState};

fn default_timeout_ms() -> u64 {
    5_000
}

/// One operation sent to the bridge CLI as a JSON argv payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCommand {
    pub op: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub state: Option<SelectorState>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub network: Option<NetworkConditions>,
}

impl PageCommand {
    fn op(op: &str) -> Self {
        Self {
            op: op.to_string(),
            selector: String::new(),
            text: String::new(),
            url: String::new(),
            state: None,
            timeout_ms: default_timeout_ms(),
            expression: String::new(),
            network: None,
        }
    }
}

/// JSON response printed by the bridge CLI on stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCommandResult {
    pub ok: bool,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Default)]
struct BridgeSessionState {
    started: bool,
    shut_down: bool,
}

/// [`PageDriver`] bridging to a Playwright CLI subprocess.
///
/// The bridge accepts `start-session`, `execute <json>` and `shutdown-session`
/// subcommands and prints one JSON [`PageCommandResult`] per invocation. The
/// browser session starts lazily on first use and shuts down exactly once;
/// `Drop` fires a best-effort shutdown for abandoned sessions.
#[derive(Debug)]
pub struct PlaywrightCliPageDriver {
    cli_path: String,
    session: Mutex<BridgeSessionState>,
}

impl PlaywrightCliPageDriver {
    pub fn new(cli_path: impl Into<String>) -> anyhow::Result<Self> {
        let cli_path = cli_path.into();
        if cli_path.trim().is_empty() {
            anyhow::bail!("playwright bridge cli path cannot be empty");
        }
        Ok(Self {
            cli_path,
            session: Mutex::new(BridgeSessionState::default()),
        })
    }

    async fn invoke(&self, subcommand: &str, payload: Option<&PageCommand>) -> DriverResult<String> {
        let mut command = tokio::process::Command::new(self.cli_path.trim());
        command.arg(subcommand);
        if let Some(payload) = payload {
            let encoded = serde_json::to_string(payload)
                .map_err(|error| DriverError::Other(format!("encode page command: {error}")))?;
            command.arg(encoded);
        }
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = command.output().await.map_err(|error| {
            DriverError::Other(format!(
                "failed to launch bridge cli '{}': {error}",
                self.cli_path
            ))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DriverError::Other(format!(
                "bridge subcommand '{subcommand}' failed: {}",
                if stderr.is_empty() { "no output" } else { &stderr }
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn ensure_session(&self) -> DriverResult<()> {
        let mut session = self.session.lock().await;
        if session.started {
            return Ok(());
        }
        self.invoke("start-session", None).await?;
        session.started = true;
        debug!(cli = %self.cli_path, "bridge session started");
        Ok(())
    }

    async fn execute(&self, command: PageCommand) -> DriverResult<Value> {
        self.ensure_session().await?;
        let what = if command.selector.is_empty() {
            command.op.clone()
        } else {
            format!("{} {}", command.op, command.selector)
        };
        let timeout_ms = command.timeout_ms;
        let raw = self.invoke("execute", Some(&command)).await?;
        if raw.is_empty() {
            return Err(DriverError::Other(
                "bridge returned empty response for execute".to_string(),
            ));
        }
        let result: PageCommandResult = serde_json::from_str(&raw)
            .map_err(|error| DriverError::Other(format!("parse bridge response: {error}")))?;
        if result.timed_out {
            return Err(DriverError::Timeout { what, timeout_ms });
        }
        if !result.ok {
            return Err(DriverError::Other(if result.error.is_empty() {
                "bridge reported failure without detail".to_string()
            } else {
                result.error
            }));
        }
        Ok(result.value)
    }

    /// Shuts the bridge session down. Safe to call more than once.
    pub async fn shutdown(&self) -> DriverResult<()> {
        let mut session = self.session.lock().await;
        if !session.started || session.shut_down {
            return Ok(());
        }
        self.invoke("shutdown-session", None).await?;
        session.shut_down = true;
        Ok(())
    }
}

impl Drop for PlaywrightCliPageDriver {
    fn drop(&mut self) {
        let state = self.session.get_mut();
        if state.started && !state.shut_down {
            let _ = std::process::Command::new(self.cli_path.trim())
                .arg("shutdown-session")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
        }
    }
}

#[async_trait::async_trait]
impl PageDriver for PlaywrightCliPageDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut command = PageCommand::op("navigate");
        command.url = url.to_string();
        self.execute(command).await.map(|_| ())
    }

    async fn fill(&self, selector: &str, text: &str) -> DriverResult<()> {
        let mut command = PageCommand::op("fill");
        command.selector = selector.to_string();
        command.text = text.to_string();
        self.execute(command).await.map(|_| ())
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        let mut command = PageCommand::op("click");
        command.selector = selector.to_string();
        self.execute(command).await.map(|_| ())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: SelectorState,
        timeout_ms: u64,
    ) -> DriverResult<()> {
        let mut command = PageCommand::op("wait_for_selector");
        command.selector = selector.to_string();
        command.state = Some(state);
        command.timeout_ms = timeout_ms;
        self.execute(command).await.map(|_| ())
    }

    async fn text_content(&self, selector: &str) -> DriverResult<String> {
        let mut command = PageCommand::op("text_content");
        command.selector = selector.to_string();
        let value = self.execute(command).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn count(&self, selector: &str) -> DriverResult<usize> {
        let mut command = PageCommand::op("count");
        command.selector = selector.to_string();
        let value = self.execute(command).await?;
        value
            .as_u64()
            .map(|count| count as usize)
            .ok_or_else(|| DriverError::Other(format!("count returned non-integer: {value}")))
    }

    async fn is_visible(&self, selector: &str) -> DriverResult<bool> {
        let mut command = PageCommand::op("is_visible");
        command.selector = selector.to_string();
        let value = self.execute(command).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn evaluate(&self, expression: &str) -> DriverResult<Value> {
        let mut command = PageCommand::op("evaluate");
        command.expression = expression.to_string();
        self.execute(command).await
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        let value = self.execute(PageCommand::op("screenshot")).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| DriverError::Other("screenshot returned no data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|error| DriverError::Other(format!("decode screenshot: {error}")))
    }

    async fn emulate_network(&self, conditions: &NetworkConditions) -> DriverResult<()> {
        let mut command = PageCommand::op("emulate_network");
        command.network = Some(*conditions);
        self.execute(command).await.map(|_| ())
    }

    async fn drain_console(&self) -> DriverResult<Vec<ConsoleLine>> {
        let value = self.execute(PageCommand::op("drain_console")).await?;
        serde_json::from_value(value)
            .map_err(|error| DriverError::Other(format!("parse console lines: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::PlaywrightCliPageDriver;
    use crate::page::{DriverError, PageDriver, SelectorState};

    fn write_mock_bridge(path: &PathBuf) {
        std::fs::write(
            path,
            r##"#!/usr/bin/env python3
import json
import pathlib
import sys

session_file = pathlib.Path(__file__).with_suffix(".session")
command = sys.argv[1] if len(sys.argv) > 1 else ""

if command == "start-session":
    session_file.write_text("active", encoding="utf-8")
    print(json.dumps({"ok": True}))
    raise SystemExit(0)

if command == "shutdown-session":
    if session_file.exists():
        session_file.unlink()
    print(json.dumps({"ok": True}))
    raise SystemExit(0)

payload = json.loads(sys.argv[2]) if len(sys.argv) > 2 else {}
op = payload.get("op", "")

if op == "navigate":
    print(json.dumps({"ok": True, "value": {"url": payload.get("url", "")}}))
elif op == "count":
    print(json.dumps({"ok": True, "value": 2}))
elif op == "text_content":
    print(json.dumps({"ok": True, "value": "He encontrado resultados"}))
elif op == "wait_for_selector":
    if payload.get("selector") == "#never":
        print(json.dumps({"ok": False, "timed_out": True}))
    else:
        print(json.dumps({"ok": True}))
else:
    print(json.dumps({"ok": False, "error": "unsupported op " + op}))
"##,
        )
        .expect("write mock bridge");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path).expect("stat").permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(path, perms).expect("chmod");
        }
    }

    #[test]
    fn unit_driver_rejects_empty_bridge_path() {
        let error = PlaywrightCliPageDriver::new("  ").expect_err("empty path should fail");
        assert!(error.to_string().contains("cannot be empty"));
    }

    #[tokio::test]
    async fn functional_bridge_round_trip_starts_session_once_and_shuts_down() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("mock-bridge.py");
        write_mock_bridge(&script);
        let session_file = script.with_extension("session");

        let driver =
            PlaywrightCliPageDriver::new(script.to_string_lossy().to_string()).expect("driver");
        driver
            .navigate("https://example.test")
            .await
            .expect("navigate");
        assert!(session_file.exists());

        let count = driver.count(".property-thumbnail").await.expect("count");
        assert_eq!(count, 2);
        let text = driver
            .text_content(".message.assistant:last-child")
            .await
            .expect("text");
        assert!(text.contains("encontrado"));

        driver.shutdown().await.expect("shutdown");
        assert!(!session_file.exists());
        // Second shutdown is a no-op.
        driver.shutdown().await.expect("repeat shutdown");
    }

    #[tokio::test]
    async fn regression_bridge_timeout_maps_to_typed_timeout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("mock-bridge.py");
        write_mock_bridge(&script);

        let driver =
            PlaywrightCliPageDriver::new(script.to_string_lossy().to_string()).expect("driver");
        let error = driver
            .wait_for_selector("#never", SelectorState::Visible, 250)
            .await
            .expect_err("should time out");
        assert!(error.is_timeout());
        match error {
            DriverError::Timeout { timeout_ms, .. } => assert_eq!(timeout_ms, 250),
            other => panic!("unexpected error: {other}"),
        }
        driver.shutdown().await.expect("shutdown");
    }
}
