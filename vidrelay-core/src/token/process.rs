//! Token module hosted in a child process.
//!
//! The vendor artifact only runs inside a browser-like host, so it is driven
//! through an external host command over stdin/stdout, one JSON object per
//! line:
//!
//! ```text
//! -> {"op":"probe"}
//! <- {"ok":true,"ready":true}
//! -> {"op":"derive","key":"550","context":{"href":"..","path":"..","origin":".."}}
//! <- {"ok":true,"token":"..."}        or  {"ok":false,"error":"..."}
//! ```
//!
//! Exchanges are serialized over the single pipe pair, and every derive
//! request carries its own page context. A host that exits after a
//! successful load is started again on the next exchange.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use super::{TokenError, TokenModule};
use crate::config::TokenConfig;
use crate::content::PageContext;

/// [`TokenModule`] backed by a long-running host process.
#[derive(Debug)]
pub struct ProcessTokenModule {
    module_path: PathBuf,
    host_command: PathBuf,
    host_args: Vec<String>,
    host: Mutex<Option<HostProcess>>,
    loaded: AtomicBool,
}

#[derive(Debug)]
struct HostProcess {
    // Held so the host is killed when the handle is dropped.
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum HostRequest<'a> {
    Probe,
    Derive {
        key: &'a str,
        context: &'a PageContext,
    },
}

#[derive(Debug, Deserialize)]
struct HostResponse {
    ok: bool,
    #[serde(default)]
    ready: Option<bool>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ProcessTokenModule {
    /// Creates a module that runs `host_command host_args... module_path`.
    pub fn new(module_path: PathBuf, host_command: PathBuf, host_args: Vec<String>) -> Self {
        Self {
            module_path,
            host_command,
            host_args,
            host: Mutex::new(None),
            loaded: AtomicBool::new(false),
        }
    }

    /// Creates a module from token configuration.
    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(
            config.module_path.clone(),
            config.host_command.clone(),
            config.host_args.clone(),
        )
    }

    fn spawn_host(&self) -> Result<HostProcess, TokenError> {
        tracing::debug!(
            "Spawning token host {} {:?} {}",
            self.host_command.display(),
            self.host_args,
            self.module_path.display()
        );

        let mut child = Command::new(&self.host_command)
            .args(&self.host_args)
            .arg(&self.module_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TokenError::ModuleLoad {
                reason: format!("failed to start {}: {e}", self.host_command.display()),
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(TokenError::ModuleLoad {
                reason: "host pipes unavailable".to_string(),
            });
        };

        Ok(HostProcess {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    async fn exchange(&self, request: &HostRequest<'_>) -> Result<Option<HostResponse>, TokenError> {
        let mut line = serde_json::to_string(request).map_err(|e| TokenError::Protocol {
            reason: format!("request encoding failed: {e}"),
        })?;
        line.push('\n');

        let mut slot = self.host.lock().await;
        // The host stays out of the slot until its reply is read. If this
        // future is dropped mid-exchange the host is killed with it, so no
        // unread reply is left for the next caller.
        let mut host = match slot.take() {
            Some(host) => host,
            None if self.loaded.load(Ordering::Acquire) => {
                tracing::warn!("Token host exited, starting a new one");
                self.spawn_host()?
            }
            None => return Ok(None),
        };

        let written = async {
            host.stdin.write_all(line.as_bytes()).await?;
            host.stdin.flush().await
        }
        .await;
        if let Err(e) = written {
            return Err(TokenError::ModuleCrashed {
                reason: format!("write to host failed: {e}"),
            });
        }

        let reply = match host.stdout.next_line().await {
            Ok(Some(reply)) => reply,
            Ok(None) => {
                return Err(TokenError::ModuleCrashed {
                    reason: "host closed its output".to_string(),
                });
            }
            Err(e) => {
                return Err(TokenError::ModuleCrashed {
                    reason: format!("read from host failed: {e}"),
                });
            }
        };
        *slot = Some(host);

        serde_json::from_str(&reply)
            .map(Some)
            .map_err(|e| TokenError::Protocol {
                reason: format!("unreadable host reply {reply:?}: {e}"),
            })
    }
}

#[async_trait]
impl TokenModule for ProcessTokenModule {
    async fn load(&self) -> Result<(), TokenError> {
        tokio::fs::metadata(&self.module_path)
            .await
            .map_err(|e| TokenError::ModuleLoad {
                reason: format!("{}: {e}", self.module_path.display()),
            })?;

        let host = self.spawn_host()?;
        *self.host.lock().await = Some(host);
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    async fn has_entry_point(&self) -> Result<bool, TokenError> {
        match self.exchange(&HostRequest::Probe).await? {
            None => Ok(false),
            Some(response) if response.ok => Ok(response.ready.unwrap_or(false)),
            Some(response) => Err(TokenError::Protocol {
                reason: response
                    .error
                    .unwrap_or_else(|| "probe rejected".to_string()),
            }),
        }
    }

    async fn derive(&self, key: &str, context: &PageContext) -> Result<Option<String>, TokenError> {
        match self.exchange(&HostRequest::Derive { key, context }).await? {
            None => Err(TokenError::Unavailable),
            Some(response) if response.ok => Ok(response.token),
            Some(response) => Err(TokenError::Derivation {
                reason: response.error.unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::token::{Readiness, TokenProvider};

    const ECHO_HOST: &str = r#"while read -r line; do
  case "$line" in
    *probe*) echo '{"ok":true,"ready":true}' ;;
    *missing*) echo '{"ok":false,"error":"getAdv not defined"}' ;;
    *derive*) echo '{"ok":true,"token":"abc123"}' ;;
  esac
done"#;

    const SLOW_HOST: &str = r#"while read -r line; do
  case "$line" in
    *probe*) echo '{"ok":true,"ready":true}' ;;
    *derive*)
      key=$(printf '%s' "$line" | sed 's/.*"key":"\([^"]*\)".*/\1/')
      sleep 0.3
      printf '{"ok":true,"token":"tok-%s"}\n' "$key" ;;
  esac
done"#;

    const ONE_SHOT_HOST: &str = r#"while read -r line; do
  case "$line" in
    *probe*) echo '{"ok":true,"ready":true}' ;;
    *derive*) echo '{"ok":true,"token":"abc123"}'; exit 0 ;;
  esac
done"#;

    fn shell_module(script: &str, module_path: PathBuf) -> ProcessTokenModule {
        ProcessTokenModule::new(
            module_path,
            PathBuf::from("sh"),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    fn context() -> PageContext {
        PageContext {
            href: "https://vidlink.pro/movie/550".to_string(),
            path: "/movie/550".to_string(),
            origin: "https://vidlink.pro".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_module_artifact_fails_load() {
        let module = shell_module(ECHO_HOST, PathBuf::from("/nonexistent/fu.wasm"));
        let err = module.load().await.unwrap_err();
        assert!(matches!(err, TokenError::ModuleLoad { .. }));
    }

    #[tokio::test]
    async fn test_probe_before_load_reports_not_ready() {
        let artifact = NamedTempFile::new().unwrap();
        let module = shell_module(ECHO_HOST, artifact.path().to_path_buf());
        assert!(!module.has_entry_point().await.unwrap());
    }

    #[tokio::test]
    async fn test_probe_and_derive_over_pipes() {
        let artifact = NamedTempFile::new().unwrap();
        let module = shell_module(ECHO_HOST, artifact.path().to_path_buf());

        module.load().await.unwrap();
        assert!(module.has_entry_point().await.unwrap());
        let token = module.derive("550", &context()).await.unwrap();
        assert_eq!(token.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_host_error_maps_to_derivation_failure() {
        let artifact = NamedTempFile::new().unwrap();
        let module = shell_module(ECHO_HOST, artifact.path().to_path_buf());
        module.load().await.unwrap();

        let err = module.derive("missing", &context()).await.unwrap_err();
        assert_eq!(
            err,
            TokenError::Derivation {
                reason: "getAdv not defined".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_exited_host_is_reported_as_crash() {
        let artifact = NamedTempFile::new().unwrap();
        let module = shell_module("exit 0", artifact.path().to_path_buf());
        module.load().await.unwrap();

        let err = module.has_entry_point().await.unwrap_err();
        assert!(matches!(err, TokenError::ModuleCrashed { .. }));
        // The replacement host exits the same way.
        let err = module.has_entry_point().await.unwrap_err();
        assert!(matches!(err, TokenError::ModuleCrashed { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_derive_does_not_leak_reply() {
        let artifact = NamedTempFile::new().unwrap();
        let module = shell_module(SLOW_HOST, artifact.path().to_path_buf());
        module.load().await.unwrap();

        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), module.derive("550", &context())).await;
        assert!(cancelled.is_err());

        let token = module.derive("1399", &context()).await.unwrap();
        assert_eq!(token.as_deref(), Some("tok-1399"));
    }

    #[tokio::test]
    async fn test_provider_recovers_after_host_exits() {
        let artifact = NamedTempFile::new().unwrap();
        let module = Arc::new(shell_module(ONE_SHOT_HOST, artifact.path().to_path_buf()));
        let provider = TokenProvider::new(
            module,
            Readiness {
                timeout: Duration::from_secs(2),
                poll_interval: Duration::from_millis(10),
            },
        );
        provider.ensure_ready().await.unwrap();

        assert_eq!(provider.derive_token("550", &context()).await.unwrap(), "abc123");

        let err = provider.derive_token("550", &context()).await.unwrap_err();
        assert!(matches!(err, TokenError::ModuleCrashed { .. }));

        assert_eq!(provider.derive_token("550", &context()).await.unwrap(), "abc123");
        assert!(provider.is_ready());
    }
}
