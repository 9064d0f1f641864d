//! capfetch - fetch videos with captions and translate the captions
//!
//! Entry point: parses the command line, loads configuration, wires logging
//! and terminal progress, then hands off to the workflow.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use capfetch::caption::cleaner::{clean_caption_file, find_caption_files, CleanOptions};
use capfetch::cli::{Args, Commands};
use capfetch::config::Config;
use capfetch::fetch::DownloadStatus;
use capfetch::progress::{ProgressEvent, ProgressReporter};
use capfetch::validation::classify_error;
use capfetch::workflow::Workflow;

const DEFAULT_CONFIG_FILE: &str = "capfetch.toml";

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _guard = match setup_logging(args.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args).await {
        let message = format!("{:#}", e);
        error!("{}", message);
        eprintln!("{}", classify_error(&message).user_message(&message));
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting capfetch");

    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Clean {
            dir,
            tags_only,
            lang_tag,
        } => {
            let options = CleanOptions::from(&config.clean);
            let options = if tags_only { options.markup_only() } else { options };

            let files = find_caption_files(&dir, &lang_tag);
            if files.is_empty() {
                println!("No *.{}.vtt files found under {}", lang_tag, dir.display());
                return Ok(());
            }

            for file in &files {
                clean_caption_file(file, &options).await?;
                println!("Cleaned {}", display_relative(file, &dir).display());
            }
            println!("Cleaned {} caption files", files.len());
        }
        Commands::Info { url, output_dir } => {
            let workflow = Workflow::new(config)?;
            let (video, existing) = workflow.info(&url, output_dir.as_deref()).await?;

            println!("Title:  {}", video.title);
            println!("ID:     {}", video.id);
            if let Some(uploader) = &video.uploader {
                println!("By:     {}", uploader);
            }
            if let Some(duration) = video.duration {
                let secs = duration as u64;
                println!("Length: {}:{:02}", secs / 60, secs % 60);
            }
            println!("Folder: {}", existing.folder.display());
            if existing.exists() {
                println!("Already downloaded: {}", existing.files.join(", "));
            }
        }
        Commands::Fetch {
            url,
            output_dir,
            no_translate,
            force,
            target_language,
        } => {
            if no_translate {
                config.translate.enabled = false;
            }
            if let Some(language) = target_language {
                config.translate.target_language = language;
            }

            let workflow = Workflow::new(config)?;
            cancel_on_ctrl_c(&workflow);

            let (reporter, bar) = terminal_progress();
            let outcome = workflow.fetch(&url, output_dir.as_deref(), force, &reporter).await;
            bar.finish_and_clear();
            let outcome = outcome?;

            if outcome.reused_video {
                println!("Video already downloaded: {}", outcome.folder.display());
            } else {
                println!("Downloaded to {}", outcome.folder.display());
            }
            for caption in &outcome.captions {
                println!("Captions: {}", caption.display());
            }
        }
        Commands::Translate {
            folder,
            target_language,
        } => {
            if let Some(language) = target_language {
                config.translate.target_language = language;
            }

            let workflow = Workflow::new(config)?;
            cancel_on_ctrl_c(&workflow);

            let (reporter, bar) = terminal_progress();
            let produced = workflow.translate_folder(&folder, &reporter).await;
            bar.finish_and_clear();

            let produced = produced?;
            if produced.is_empty() {
                println!("No translated captions produced for {}", folder.display());
            }
            for path in produced {
                println!("Captions: {}", path.display());
            }
        }
        Commands::TranslateFile {
            input,
            target_language,
        } => {
            if let Some(language) = target_language {
                config.translate.target_language = language;
            }

            let workflow = Workflow::new(config)?;
            let (reporter, bar) = terminal_progress();
            let output = workflow.translate_file(&input, &reporter).await;
            bar.finish_and_clear();

            match output? {
                Some(path) => println!("Wrote {}", path.display()),
                None => println!("Nothing to translate in {}", input.display()),
            }
        }
    }

    info!("capfetch finished");
    Ok(())
}

/// `--config` if given, else `./capfetch.toml` when present, else defaults; then the environment
fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
            Config::from_file(DEFAULT_CONFIG_FILE)?
        }
        None => Config::default(),
    };
    config.apply_env();
    Ok(config)
}

fn cancel_on_ctrl_c(workflow: &Workflow) {
    let token = workflow.session().token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            token.cancel();
        }
    });
}

/// Progress bar driven by workflow events
fn terminal_progress() -> (ProgressReporter, ProgressBar) {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let handle = bar.clone();
    let reporter = ProgressReporter::new(move |event| match event {
        ProgressEvent::Download(progress) => match progress.status {
            DownloadStatus::Downloading => {
                handle.set_length(100);
                handle.set_position(progress.percent as u64);
                handle.set_message(format!(
                    "{} | {} | ETA {}",
                    progress.size_str(),
                    progress.speed_str(),
                    progress.eta_str()
                ));
            }
            DownloadStatus::Finished => {
                handle.set_position(100);
                handle.set_message(format!("Completed in {:.1}s", progress.elapsed.as_secs_f64()));
            }
            DownloadStatus::Error => {
                handle.set_message(format!("Failed after {:.1}s", progress.elapsed.as_secs_f64()));
            }
            DownloadStatus::Starting => {}
        },
        ProgressEvent::BatchStarted { current, total } => {
            handle.set_length(*total as u64);
            handle.set_position(*current as u64);
            handle.set_message(format!("Translating batch {}/{}", current, total));
        }
        ProgressEvent::Parsed { path, entries } => {
            handle.set_message(format!("Parsed {} entries from {}", entries, file_name(path)));
        }
        ProgressEvent::TranslationStarted { texts } => {
            handle.set_position(0);
            handle.set_message(format!("Translating {} captions", texts));
        }
        ProgressEvent::Written { path } => handle.println(format!("Wrote {}", path.display())),
        ProgressEvent::Reused { path } => handle.println(format!("Using existing {}", path.display())),
        ProgressEvent::Status(message) => handle.set_message(message.clone()),
    });

    (reporter, bar)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn display_relative(path: &Path, base: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".capfetch").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "capfetch.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("capfetch.log").display()
    );

    Ok(guard)
}
