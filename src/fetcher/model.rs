use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::prompt::{FetchPrompt, RepoAction};
use std::path::{Path, PathBuf};
use tokio::process::Command;

pub struct ModelFetcher {
    config: Config,
}

impl ModelFetcher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Makes sure the model repository exists locally, cloning, pulling or
    /// re-cloning it as decided by the supplied prompt.
    pub async fn ensure_present(&self, prompt: &dyn FetchPrompt) -> Result<()> {
        let dest = self.config.model_dest_path();
        tokio::fs::create_dir_all(&self.config.model_dir).await?;

        if dest.exists() {
            if dest.join(".git").is_dir() {
                match prompt.existing_repo(&dest) {
                    RepoAction::Update => return self.pull(&dest).await,
                    RepoAction::Skip => {
                        tracing::info!("Keeping existing model repository at {:?}", dest);
                        return Ok(());
                    }
                    RepoAction::Reclone => {
                        tracing::info!("Removing existing model repository {:?}", dest);
                        tokio::fs::remove_dir_all(&dest).await?;
                    }
                }
            } else if prompt.existing_non_repo(&dest) {
                tracing::info!("Removing non-git directory {:?}", dest);
                tokio::fs::remove_dir_all(&dest).await?;
            } else {
                tracing::info!("Keeping existing non-git directory at {:?}", dest);
                return Ok(());
            }
        }

        self.clone_repo(&dest).await
    }

    async fn clone_repo(&self, dest: &Path) -> Result<()> {
        tracing::info!(
            "Cloning {} into {:?} (shallow)",
            self.config.model_repo_url,
            dest
        );

        // stdio is inherited so git renders its own progress output
        let status = Command::new("git")
            .args(["clone", "--progress", "--depth", "1"])
            .arg(&self.config.model_repo_url)
            .arg(dest)
            .status()
            .await
            .map_err(git_spawn_error)?;

        if status.success() {
            tracing::info!("Model repository cloned successfully");
            Ok(())
        } else {
            Err(Error::GitFailed(format!("git clone exited with {}", status)))
        }
    }

    async fn pull(&self, dest: &Path) -> Result<()> {
        tracing::info!("Updating model repository at {:?}", dest);

        let status = Command::new("git")
            .arg("-C")
            .arg(dest)
            .args(["pull", "--progress"])
            .status()
            .await
            .map_err(git_spawn_error)?;

        if status.success() {
            tracing::info!("Model repository updated successfully");
            Ok(())
        } else {
            Err(Error::GitFailed(format!("git pull exited with {}", status)))
        }
    }

    /// Finds the single file with the configured model extension inside the
    /// cloned repository. Zero or multiple matches need the operator to pick
    /// a file explicitly.
    pub fn locate_model_file(&self) -> Result<PathBuf> {
        let dir = self.config.model_dest_path();
        let extension = self.config.model_extension.as_str();

        let mut matches = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
                matches.push(path);
            }
        }
        matches.sort();

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(Error::ModelFileMissing(dir.display().to_string())),
            _ => {
                let listing = matches
                    .iter()
                    .map(|p| format!("  - {}", p.display()))
                    .collect::<Vec<_>>()
                    .join("\n");
                Err(Error::ModelFileAmbiguous(listing))
            }
        }
    }
}

fn git_spawn_error(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::GitMissing
    } else {
        Error::IoError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::prompt::FixedPolicy;

    fn test_config(model_dir: &Path) -> Config {
        Config {
            model_repo_url: "https://example.com/acme/tiny-lm".to_string(),
            model_dir: model_dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn locates_single_model_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let dest = config.model_dest_path();
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("weights.litertlm"), b"w").unwrap();
        std::fs::write(dest.join("README.md"), b"r").unwrap();

        let found = ModelFetcher::new(config).locate_model_file().unwrap();
        assert_eq!(found, dest.join("weights.litertlm"));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        std::fs::create_dir_all(config.model_dest_path()).unwrap();

        let err = ModelFetcher::new(config).locate_model_file().unwrap_err();
        assert!(matches!(err, Error::ModelFileMissing(_)));
    }

    #[test]
    fn multiple_model_files_are_ambiguous() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let dest = config.model_dest_path();
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("a.litertlm"), b"a").unwrap();
        std::fs::write(dest.join("b.litertlm"), b"b").unwrap();

        let err = ModelFetcher::new(config).locate_model_file().unwrap_err();
        match err {
            Error::ModelFileAmbiguous(listing) => {
                assert!(listing.contains("a.litertlm"));
                assert!(listing.contains("b.litertlm"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn skip_keeps_existing_non_repo_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path());
        let dest = config.model_dest_path();
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("keep.litertlm"), b"k").unwrap();

        let policy = FixedPolicy {
            repo_action: RepoAction::Skip,
            redownload: false,
        };
        ModelFetcher::new(config)
            .ensure_present(&policy)
            .await
            .unwrap();

        assert!(dest.join("keep.litertlm").exists());
    }
}
