// Copyright (c) 2025 MUVA. All rights reserved.

mod config;
mod consts;
mod controller;
mod environment;
mod inference;
mod job;
mod proxy;
mod uploader;

use crate::config::{Config, get_config_path};
use crate::controller::{JobRunner, RunnerConfig};
use crate::environment::Environment;
use crate::inference::{Deployment, InferenceClient, InferenceService};
use crate::job::{ExtractPolicy, JobParameters};
use crate::uploader::AssetUploader;
use clap::{Parser, Subcommand};
use log::debug;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Command-line arguments
struct Args {
    /// Command to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transform a photo into an avatar and print the result URL
    Run {
        /// Path to the photo to transform
        #[arg(long, value_name = "IMAGE")]
        image: PathBuf,

        /// Override the default style prompt
        #[arg(long, value_name = "PROMPT")]
        prompt: Option<String>,

        /// Pin the generation seed instead of drawing a random one
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,

        /// Which element of a multi-result output to keep
        #[arg(long, value_enum, default_value_t = ExtractPolicy::SelectFirst)]
        policy: ExtractPolicy,

        /// Maximum seconds to wait for the job before giving up
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Download the finished avatar to FILE instead of only printing its URL
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Serve the browser-facing prediction proxy
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3000")]
        listen: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();

    let config_path = get_config_path()?;
    let config = match Config::load_from_file(&config_path) {
        Ok(config) => config,
        Err(_) => Config::new(
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ),
    };

    // The environment variable wins over the config file.
    let mut environment_str = std::env::var("BOOTH_ENVIRONMENT").unwrap_or_default();
    if environment_str.is_empty() {
        environment_str = config.environment.clone();
    }
    let environment = if environment_str.is_empty() {
        Environment::default()
    } else {
        match environment_str.parse::<Environment>() {
            Ok(env) => env,
            Err(_) => {
                eprintln!("Invalid environment: {}", environment_str);
                return Err("Invalid environment".into());
            }
        }
    };

    let token = std::env::var("REPLICATE_API_TOKEN").unwrap_or_default();
    if token.is_empty() {
        eprintln!("REPLICATE_API_TOKEN is not set");
        return Err("missing API token".into());
    }

    let deployment = Deployment {
        owner: require(&config.deployment_owner, "deployment_owner", &config_path)?,
        name: require(&config.deployment_name, "deployment_name", &config_path)?,
    };
    let client = InferenceClient::new(environment, deployment, token);

    match args.command {
        Command::Run {
            image,
            prompt,
            seed,
            policy,
            timeout,
            output,
        } => {
            let uploader = AssetUploader::new(
                environment,
                require(&config.cloud_name, "cloud_name", &config_path)?,
                require(&config.upload_preset, "upload_preset", &config_path)?,
            );
            run(client, uploader, image, prompt, seed, policy, timeout, output).await
        }
        Command::Serve { listen } => {
            let service: Arc<dyn InferenceService> = Arc::new(client);
            tokio::select! {
                res = proxy::run_server(&listen, service, JobParameters::default()) => {
                    res.map_err(|e| e.into())
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("\nShutting down proxy.");
                    Ok(())
                }
            }
        }
    }
}

/// Fail with a pointer at the config file when a required field is missing.
fn require(value: &str, field: &str, config_path: &Path) -> Result<String, Box<dyn Error>> {
    if value.is_empty() {
        eprintln!(
            "{} is not configured; set it in {}",
            field,
            config_path.display()
        );
        return Err(format!("missing {}", field).into());
    }
    Ok(value.to_string())
}

/// Upload the photo, drive the transformation job to completion and report
/// the result.
async fn run(
    client: InferenceClient,
    uploader: AssetUploader,
    image: PathBuf,
    prompt: Option<String>,
    seed: Option<u64>,
    policy: ExtractPolicy,
    timeout: Option<u64>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let bytes = tokio::fs::read(&image).await?;
    let mime = uploader::guess_mime(&image);
    println!("Uploading {} ({} bytes)...", image.display(), bytes.len());
    let image_url = uploader.upload(bytes, mime).await?;
    debug!("photo stored at {}", image_url);

    let mut params = JobParameters::default();
    if let Some(prompt) = prompt {
        params.prompt = prompt;
    }
    params.seed = seed;

    let mut runner_config = RunnerConfig::default();
    runner_config.extract = policy;
    if let Some(secs) = timeout {
        runner_config.deadline = Duration::from_secs(secs);
    }

    let (progress_sender, mut progress_receiver) =
        mpsc::channel(consts::run::PROGRESS_QUEUE_SIZE);
    let mut runner = JobRunner::with_config(client, runner_config).with_progress(progress_sender);

    let printer = tokio::spawn(async move {
        while let Some(snapshot) = progress_receiver.recv().await {
            println!(
                "[{}] job {} is {}",
                chrono::Local::now().format("%H:%M:%S"),
                snapshot.id,
                snapshot.status
            );
        }
    });

    // Ctrl-C abandons the run at the pre-poll wait; dropping the run future
    // also cancels the pending timer.
    let result = tokio::select! {
        result = runner.run(&image_url, &params) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted, abandoning job.");
            return Ok(());
        }
    };
    drop(runner);
    let _ = printer.await;

    let result_url = result?;
    println!("Avatar ready: {}", result_url);

    if let Some(path) = output {
        download(&result_url, &path).await?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

/// Fetch the finished avatar and write it to disk.
async fn download(url: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(format!("download failed with status {}", response.status()).into());
    }
    let bytes = response.bytes().await?;
    tokio::fs::write(path, &bytes).await?;
    Ok(())
}
