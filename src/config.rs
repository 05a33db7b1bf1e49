use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_MODEL_REPO_URL: &str =
	"https://huggingface.co/google/gemma-3n-E4B-it-litert-lm-preview";
const DEFAULT_BINARY_URL: &str =
	"https://github.com/google-ai-edge/LiteRT-LM/releases/latest/download/litert_lm_main.macos_arm64";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	#[serde(default = "default_model_repo_url")]
	pub model_repo_url: String,
	#[serde(default = "default_model_dir")]
	pub model_dir: PathBuf,
	#[serde(default = "default_binary_url")]
	pub binary_url: String,
	#[serde(default = "default_binary_dir")]
	pub binary_dir: PathBuf,
	#[serde(default = "default_model_extension")]
	pub model_extension: String,
}

fn default_model_repo_url() -> String {
	DEFAULT_MODEL_REPO_URL.to_string()
}

fn default_model_dir() -> PathBuf {
	PathBuf::from("model")
}

fn default_binary_url() -> String {
	DEFAULT_BINARY_URL.to_string()
}

fn default_binary_dir() -> PathBuf {
	PathBuf::from("binary")
}

fn default_model_extension() -> String {
	"litertlm".to_string()
}

fn last_url_segment(url: &str) -> &str {
	url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

impl Config {
	pub fn from_env() -> crate::error::Result<Self> {
		let path = std::env::var("LITERUN_CONFIG")
			.map(PathBuf::from)
			.unwrap_or_else(|_| PathBuf::from("literun.toml"));

		if path.exists() {
			let content = std::fs::read_to_string(&path)?;
			let config: Config = toml::from_str(&content)?;
			Ok(config)
		} else {
			Ok(Self::default())
		}
	}

	/// Directory the model repository is cloned into: `<model_dir>/<repo-name>`.
	pub fn model_dest_path(&self) -> PathBuf {
		self.model_dir.join(last_url_segment(&self.model_repo_url))
	}

	/// File the binary is downloaded to: `<binary_dir>/<url-filename>`.
	pub fn binary_dest_path(&self) -> PathBuf {
		self.binary_dir.join(last_url_segment(&self.binary_url))
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			model_repo_url: default_model_repo_url(),
			model_dir: default_model_dir(),
			binary_url: default_binary_url(),
			binary_dir: default_binary_dir(),
			model_extension: default_model_extension(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn destination_paths_use_last_url_segment() {
		let config = Config::default();
		assert_eq!(
			config.model_dest_path(),
			PathBuf::from("model/gemma-3n-E4B-it-litert-lm-preview")
		);
		assert_eq!(
			config.binary_dest_path(),
			PathBuf::from("binary/litert_lm_main.macos_arm64")
		);
	}

	#[test]
	fn partial_toml_falls_back_to_defaults() {
		let config: Config = toml::from_str(
			r#"
			model_repo_url = "https://huggingface.co/acme/tiny-lm"
			binary_dir = "bin"
			"#,
		)
		.unwrap();

		assert_eq!(config.model_dest_path(), PathBuf::from("model/tiny-lm"));
		assert_eq!(
			config.binary_dest_path(),
			PathBuf::from("bin/litert_lm_main.macos_arm64")
		);
		assert_eq!(config.model_extension, "litertlm");
	}
}
