mod cli;
mod config;
mod error;
mod fetcher;
mod runner;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use fetcher::{BinaryFetcher, FetchPrompt, FixedPolicy, ModelFetcher, RepoAction, StdinPrompt};
use runner::{Backend, InvocationSpec, RunOutput};
use std::path::PathBuf;

fn make_prompt(on_existing: Option<RepoAction>, redownload: bool) -> Box<dyn FetchPrompt> {
    match on_existing {
        Some(action) => Box::new(FixedPolicy {
            repo_action: action,
            redownload,
        }),
        None => Box::new(StdinPrompt),
    }
}

async fn fetch_assets(config: &Config, prompt: &dyn FetchPrompt) {
    if let Err(e) = ModelFetcher::new(config.clone()).ensure_present(prompt).await {
        tracing::error!("Model fetch failed: {}", e);
    }

    match BinaryFetcher::new(config.clone()) {
        Ok(fetcher) => {
            if let Err(e) = fetcher.ensure_present(prompt).await {
                tracing::error!("Binary fetch failed: {}", e);
            }
        }
        Err(e) => tracing::error!("Binary fetch failed: {}", e),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_model(
    config: Config,
    skip_download: bool,
    binary_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    prompt: String,
    backend: Backend,
    benchmark: bool,
    prefill_tokens: u32,
    decode_tokens: u32,
    async_mode: bool,
    on_existing: Option<RepoAction>,
    redownload: bool,
) -> Result<RunOutput> {
    let mut final_model_path = model_path;
    let binary_overridden = binary_path.is_some();
    let final_binary_path = binary_path.unwrap_or_else(|| config.binary_dest_path());

    if !skip_download {
        // Unlike `fetch`, existing assets are reused without asking unless
        // the operator passed --on_existing
        let decision = FixedPolicy {
            repo_action: on_existing.unwrap_or(RepoAction::Skip),
            redownload,
        };

        if final_model_path.is_none() {
            let fetcher = ModelFetcher::new(config.clone());
            if let Err(e) = fetcher.ensure_present(&decision).await {
                tracing::error!("Model fetch failed: {}", e);
            }
            final_model_path = Some(fetcher.locate_model_file()?);
        } else {
            tracing::info!("Using supplied model path, skipping model fetch");
        }

        if !binary_overridden {
            if let Err(e) = BinaryFetcher::new(config.clone())?
                .ensure_present(&decision)
                .await
            {
                tracing::error!("Binary fetch failed: {}", e);
            }
        } else {
            tracing::info!("Using supplied binary path, skipping binary fetch");
        }
    } else {
        tracing::info!("Download step skipped");
        if final_model_path.is_none() && config.model_dest_path().is_dir() {
            final_model_path = Some(ModelFetcher::new(config.clone()).locate_model_file()?);
        }
    }

    // Fetch failures above are not fatal on their own; what matters is
    // whether the files are actually there now
    let final_model_path = final_model_path.ok_or_else(|| {
        error::Error::ModelNotFound(format!(
            "no --model_path given and {} does not exist",
            config.model_dest_path().display()
        ))
    })?;
    if !final_model_path.is_file() {
        return Err(error::Error::ModelNotFound(
            final_model_path.display().to_string(),
        ));
    }
    if !final_binary_path.exists() {
        return Err(error::Error::BinaryNotFound(
            final_binary_path.display().to_string(),
        ));
    }

    let spec = InvocationSpec {
        binary_path: final_binary_path,
        model_path: final_model_path,
        prompt: if prompt.is_empty() { None } else { Some(prompt) },
        backend,
        benchmark,
        prefill_tokens,
        decode_tokens,
        async_mode,
    };

    if spec.async_forced_off() {
        tracing::warn!("benchmark_prefill_tokens > 0, async mode forced to false");
    }

    spec.run().await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Fetch {
            on_existing,
            redownload,
        } => {
            let prompt = make_prompt(on_existing, redownload);
            fetch_assets(&config, prompt.as_ref()).await;

            println!("\nSummary:");
            let model_dest = config.model_dest_path();
            if model_dest.is_dir() {
                println!("  ✓ Model repository: {}", model_dest.display());
            } else {
                println!("  ✗ Model repository was not downloaded: {}", model_dest.display());
            }
            let binary_dest = config.binary_dest_path();
            if binary_dest.is_file() {
                println!("  ✓ Inference binary: {}", binary_dest.display());
            } else {
                println!("  ✗ Inference binary was not downloaded: {}", binary_dest.display());
            }
        }

        Commands::Run {
            skip_download,
            binary_path,
            model_path,
            prompt,
            backend,
            benchmark,
            benchmark_prefill_tokens,
            benchmark_decode_tokens,
            async_mode,
            show_stderr,
            json,
            on_existing,
            redownload,
        } => {
            let output = run_model(
                config,
                skip_download,
                binary_path,
                model_path,
                prompt,
                backend,
                benchmark,
                benchmark_prefill_tokens,
                benchmark_decode_tokens,
                async_mode,
                on_existing,
                redownload,
            )
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                if !output.stdout.is_empty() {
                    println!("--- model output (stdout) ---");
                    print!("{}", output.stdout);
                }
                if !output.stderr.is_empty() && (output.stdout.is_empty() || show_stderr) {
                    println!("--- model diagnostics (stderr) ---");
                    print!("{}", output.stderr);
                }
                if output.stdout.is_empty() && output.stderr.is_empty() {
                    println!("The model run produced no output.");
                }
                if let Some(code) = output.exit_code {
                    if code != 0 {
                        println!("\nThe binary exited with code {}. Check the output above.", code);
                    }
                }
            }
        }
    }

    Ok(())
}
