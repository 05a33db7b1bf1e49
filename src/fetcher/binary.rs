use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::prompt::FetchPrompt;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub struct BinaryFetcher {
    config: Config,
    client: reqwest::Client,
}

impl BinaryFetcher {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("literun/", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| Error::DownloadFailed(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Makes sure the inference binary exists locally and is executable.
    /// When the file is already there the prompt decides whether to
    /// re-download; declining touches neither the network nor the file.
    pub async fn ensure_present(&self, prompt: &dyn FetchPrompt) -> Result<()> {
        let dest = self.config.binary_dest_path();

        if dest.exists() && !prompt.redownload_binary(&dest) {
            tracing::info!("Keeping existing binary at {:?}", dest);
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.config.binary_dir).await?;
        self.download(&dest).await?;
        set_executable(&dest)?;
        Ok(())
    }

    async fn download(&self, dest: &Path) -> Result<()> {
        tracing::info!("Downloading {} to {:?}", self.config.binary_url, dest);

        let response = self
            .client
            .get(&self.config.binary_url)
            .send()
            .await
            .map_err(request_error)?
            .error_for_status()
            .map_err(request_error)?;

        let progress = match response.content_length() {
            Some(total) => {
                tracing::info!("Total size: {:.2} MB", total as f64 / (1024.0 * 1024.0));
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("[{bar:50}] {bytes} / {total_bytes} ({bytes_per_sec})")
                        .unwrap()
                        .progress_chars("= "),
                );
                bar
            }
            None => {
                tracing::info!("Total size unknown, downloading...");
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner} downloaded {bytes}")
                        .unwrap(),
                );
                spinner
            }
        };

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(request_error)?;
            file.write_all(&chunk).await?;
            progress.inc(chunk.len() as u64);
        }
        file.flush().await?;
        progress.finish();

        tracing::info!("Binary downloaded successfully");
        Ok(())
    }
}

fn request_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::DownloadFailed(format!(
            "request timed out after {} seconds",
            DOWNLOAD_TIMEOUT.as_secs()
        ))
    } else if let Some(status) = err.status() {
        Error::DownloadFailed(format!("server returned {}", status))
    } else {
        Error::DownloadFailed(err.to_string())
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions)?;

    tracing::info!("Granted execute permission on {:?}", path);
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
