pub mod binary;
pub mod model;
pub mod prompt;

pub use binary::BinaryFetcher;
pub use model::ModelFetcher;
pub use prompt::{FetchPrompt, FixedPolicy, RepoAction, StdinPrompt};
