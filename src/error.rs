use std::fmt;

#[derive(Debug)]
pub enum Error {
	BinaryNotFound(String),
	ModelNotFound(String),
	ModelFileMissing(String),
	ModelFileAmbiguous(String),
	PermissionDenied(String),
	DownloadFailed(String),
	GitMissing,
	GitFailed(String),
	IoError(std::io::Error),
	SerializationError(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::BinaryNotFound(path) => write!(f, "Inference binary not found: {}", path),
			Error::ModelNotFound(path) => write!(f, "Model file not found: {}", path),
			Error::ModelFileMissing(dir) => {
				write!(f, "No model file found in directory: {}", dir)
			}
			Error::ModelFileAmbiguous(msg) => {
				write!(f, "Multiple model files found, pass --model_path to pick one:\n{}", msg)
			}
			Error::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
			Error::DownloadFailed(msg) => write!(f, "Download failed: {}", msg),
			Error::GitMissing => {
				write!(f, "git command not found. Install git and make sure it is on PATH")
			}
			Error::GitFailed(msg) => write!(f, "git command failed: {}", msg),
			Error::IoError(e) => write!(f, "IO error: {}", e),
			Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::IoError(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
