use std::io::{self, Write};
use std::path::Path;

/// What to do with a model repository that already exists locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RepoAction {
    /// Run git pull in the existing clone
    Update,
    /// Leave the existing directory untouched
    Skip,
    /// Delete the existing directory and clone again
    Reclone,
}

/// Decision source for conflicts with existing local assets. Injected into
/// the fetchers so automated environments can run without a terminal.
pub trait FetchPrompt {
    fn existing_repo(&self, path: &Path) -> RepoAction;

    /// The destination exists but is not a git clone. Returns true to
    /// delete it and clone fresh, false to keep it as-is.
    fn existing_non_repo(&self, path: &Path) -> bool;

    fn redownload_binary(&self, path: &Path) -> bool;
}

/// Interactive prompts on stdin. Any unrecognized answer is treated as skip.
pub struct StdinPrompt;

fn ask(question: &str) -> String {
    print!("{}", question);
    if io::stdout().flush().is_err() {
        return String::new();
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return String::new();
    }
    answer.trim().to_lowercase()
}

impl FetchPrompt for StdinPrompt {
    fn existing_repo(&self, path: &Path) -> RepoAction {
        println!("Model repository already exists: {}", path.display());
        match ask("Update (git pull) (u), skip (s), or re-clone (delete existing) (r)? [u/s/r]: ")
            .as_str()
        {
            "u" => RepoAction::Update,
            "r" => RepoAction::Reclone,
            "s" => RepoAction::Skip,
            _ => {
                println!("Invalid choice, skipping.");
                RepoAction::Skip
            }
        }
    }

    fn existing_non_repo(&self, path: &Path) -> bool {
        println!(
            "Warning: directory {} exists but is not a git repository.",
            path.display()
        );
        ask("Delete and clone (d), or skip (s)? [d/s]: ") == "d"
    }

    fn redownload_binary(&self, path: &Path) -> bool {
        println!("Binary file {} already exists.", path.display());
        ask("Re-download it? (y/n): ") == "y"
    }
}

/// Pre-supplied answers, built from CLI flags.
pub struct FixedPolicy {
    pub repo_action: RepoAction,
    pub redownload: bool,
}

impl FetchPrompt for FixedPolicy {
    fn existing_repo(&self, _path: &Path) -> RepoAction {
        self.repo_action
    }

    fn existing_non_repo(&self, _path: &Path) -> bool {
        self.repo_action == RepoAction::Reclone
    }

    fn redownload_binary(&self, _path: &Path) -> bool {
        self.redownload
    }
}
