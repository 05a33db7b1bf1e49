use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    Cpu,
    Gpu,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Cpu => write!(f, "cpu"),
            Backend::Gpu => write!(f, "gpu"),
        }
    }
}

/// One invocation of the inference binary. Built once per run, then turned
/// into the flat argument vector the binary expects.
#[derive(Debug, Clone)]
pub struct InvocationSpec {
    pub binary_path: PathBuf,
    pub model_path: PathBuf,
    pub prompt: Option<String>,
    pub backend: Backend,
    pub benchmark: bool,
    pub prefill_tokens: u32,
    pub decode_tokens: u32,
    pub async_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl InvocationSpec {
    /// The binary requires async=false whenever benchmark_prefill_tokens > 0.
    pub fn effective_async(&self) -> bool {
        if self.benchmark && self.prefill_tokens > 0 {
            false
        } else {
            self.async_mode
        }
    }

    /// True when the requested async mode had to be overridden.
    pub fn async_forced_off(&self) -> bool {
        self.async_mode && !self.effective_async()
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--model_path".to_string(),
            self.model_path.display().to_string(),
            "--backend".to_string(),
            self.backend.to_string(),
            "--async".to_string(),
            self.effective_async().to_string(),
        ];

        if self.benchmark {
            args.push("--benchmark".to_string());
            args.push("true".to_string());
            if self.prefill_tokens > 0 {
                args.push("--benchmark_prefill_tokens".to_string());
                args.push(self.prefill_tokens.to_string());
            }
            if self.decode_tokens > 0 {
                args.push("--benchmark_decode_tokens".to_string());
                args.push(self.decode_tokens.to_string());
            }
            // with a prefill token count the binary generates its own input
            if self.prefill_tokens == 0 {
                if let Some(prompt) = &self.prompt {
                    args.push("--input_prompt".to_string());
                    args.push(prompt.clone());
                }
            }
        } else if let Some(prompt) = &self.prompt {
            args.push("--input_prompt".to_string());
            args.push(prompt.clone());
        }

        args
    }

    /// Runs the binary and captures both output streams. A non-zero exit
    /// code is not an error at this layer; callers inspect the streams.
    pub async fn run(&self) -> Result<RunOutput> {
        if !self.binary_path.exists() {
            return Err(Error::BinaryNotFound(self.binary_path.display().to_string()));
        }
        ensure_executable(&self.binary_path)?;
        if !self.model_path.exists() {
            return Err(Error::ModelNotFound(self.model_path.display().to_string()));
        }

        let args = self.to_args();
        tracing::info!("Running: {} {}", self.binary_path.display(), args.join(" "));

        let output = Command::new(&self.binary_path).args(&args).output().await?;

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)?;
    let mode = metadata.permissions().mode();
    if mode & 0o111 != 0 {
        return Ok(());
    }

    let mut permissions = metadata.permissions();
    permissions.set_mode(mode | 0o111);
    std::fs::set_permissions(path, permissions).map_err(|e| {
        Error::PermissionDenied(format!(
            "{} is not executable and execute permission could not be granted: {}",
            path.display(),
            e
        ))
    })?;

    tracing::info!("Granted execute permission on {:?}", path);
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> InvocationSpec {
        InvocationSpec {
            binary_path: PathBuf::from("binary/litert_lm_main"),
            model_path: PathBuf::from("model/weights.litertlm"),
            prompt: None,
            backend: Backend::Cpu,
            benchmark: false,
            prefill_tokens: 0,
            decode_tokens: 0,
            async_mode: true,
        }
    }

    #[test]
    fn prefill_benchmark_forces_async_off() {
        for input_async in [true, false] {
            let spec = InvocationSpec {
                benchmark: true,
                prefill_tokens: 16,
                async_mode: input_async,
                ..spec()
            };
            let args = spec.to_args();
            let pos = args.iter().position(|a| a == "--async").unwrap();
            assert_eq!(args[pos + 1], "false");
        }
    }

    #[test]
    fn no_benchmark_flags_without_benchmark_mode() {
        let spec = InvocationSpec {
            prefill_tokens: 16,
            decode_tokens: 32,
            ..spec()
        };
        let args = spec.to_args();
        assert!(!args.iter().any(|a| a.starts_with("--benchmark")));
    }

    #[test]
    fn plain_run_ends_with_the_prompt() {
        let spec = InvocationSpec {
            prompt: Some("capital of Japan?".to_string()),
            ..spec()
        };
        let args = spec.to_args();
        assert!(args.join(" ").ends_with("--input_prompt capital of Japan?"));
    }

    #[test]
    fn prefill_benchmark_drops_the_prompt() {
        let spec = InvocationSpec {
            prompt: Some("hello".to_string()),
            benchmark: true,
            prefill_tokens: 16,
            async_mode: true,
            ..spec()
        };
        let args = spec.to_args();

        let joined = args.join(" ");
        assert!(joined.contains("--async false --benchmark true --benchmark_prefill_tokens 16"));
        assert!(!args.iter().any(|a| a == "--input_prompt"));
        assert!(!args.iter().any(|a| a == "--benchmark_decode_tokens"));
    }

    #[test]
    fn benchmark_without_prefill_keeps_prompt_and_async() {
        let spec = InvocationSpec {
            prompt: Some("hello".to_string()),
            benchmark: true,
            decode_tokens: 8,
            ..spec()
        };
        let args = spec.to_args();

        let joined = args.join(" ");
        assert!(joined.contains("--async true --benchmark true --benchmark_decode_tokens 8"));
        assert!(joined.ends_with("--input_prompt hello"));
    }

    #[cfg(unix)]
    fn fake_binary(dir: &Path, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake_lm");
        std::fs::write(&path, "#!/bin/sh\necho model says hi\necho warn >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_both_streams_and_nonzero_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let model = tmp.path().join("weights.litertlm");
        std::fs::write(&model, b"w").unwrap();

        let spec = InvocationSpec {
            binary_path: fake_binary(tmp.path(), 0o755),
            model_path: model,
            ..spec()
        };
        let output = spec.run().await.unwrap();

        assert_eq!(output.stdout, "model says hi\n");
        assert_eq!(output.stderr, "warn\n");
        assert_eq!(output.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn grants_execute_permission_before_running() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let model = tmp.path().join("weights.litertlm");
        std::fs::write(&model, b"w").unwrap();
        let binary = fake_binary(tmp.path(), 0o644);

        let spec = InvocationSpec {
            binary_path: binary.clone(),
            model_path: model,
            ..spec()
        };
        spec.run().await.unwrap();

        let mode = std::fs::metadata(&binary).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_model_is_a_not_found_error() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = InvocationSpec {
            binary_path: fake_binary(tmp.path(), 0o755),
            model_path: tmp.path().join("missing.litertlm"),
            ..spec()
        };
        let err = spec.run().await.unwrap_err();
        assert!(matches!(err, Error::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_a_not_found_error() {
        let spec = InvocationSpec {
            binary_path: PathBuf::from("does/not/exist"),
            ..spec()
        };
        let err = spec.run().await.unwrap_err();
        assert!(matches!(err, Error::BinaryNotFound(_)));
    }
}
