use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::caption::cleaner::{clean_caption_file, CleanOptions};
use crate::caption::language::{
    carries_output_tag, has_tag, language_code, source_preference, translated_file_name,
};
use crate::config::Config;
use crate::error::{CapfetchError, Result};
use crate::fetch::{check_existing, ExistingVideo, Fetcher, VideoInfo};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::session::Session;
use crate::translate::{BatchTranslator, TranslationService, TranslationServiceFactory};
use crate::validation::{validate_output_directory, validate_video_url};

/// Result of a fetch: where the video lives and which translated captions sit next to it
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub folder: PathBuf,
    /// The video was already present and no download ran
    pub reused_video: bool,
    pub captions: Vec<PathBuf>,
}

pub struct Workflow {
    config: Config,
    fetcher: Fetcher,
    translator: Option<BatchTranslator>,
    session: Session,
}

impl Workflow {
    /// Build from configuration; the translation backend is only created when it can run
    pub fn new(config: Config) -> Result<Self> {
        let translator = if config.translate.is_ready() {
            let service = TranslationServiceFactory::create_service(&config.translate)?;
            Some(BatchTranslator::new(service, config.translate.clone()))
        } else {
            None
        };
        Ok(Self::assemble(config, translator))
    }

    /// Build around an already constructed translation backend
    pub fn with_service(config: Config, service: Box<dyn TranslationService>) -> Self {
        let translator = BatchTranslator::new(service, config.translate.clone());
        Self::assemble(config, Some(translator))
    }

    fn assemble(config: Config, translator: Option<BatchTranslator>) -> Self {
        Self {
            fetcher: Fetcher::new(config.fetch.clone()),
            config,
            translator,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn clean_options(&self) -> CleanOptions {
        CleanOptions::from(&self.config.clean)
    }

    fn active_translator(&self) -> Option<&BatchTranslator> {
        self.translator.as_ref().filter(|_| self.config.translate.enabled)
    }

    /// Metadata for a URL plus whatever an earlier fetch left on disk
    pub async fn info(&self, url: &str, output_dir: Option<&Path>) -> Result<(VideoInfo, ExistingVideo)> {
        let url = validate_video_url(url)?;
        let info = self.fetcher.video_info(url.as_str()).await?;
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&self.config.fetch.output_dir));
        let existing = check_existing(&output_dir, &info)?;
        Ok((info, existing))
    }

    /// Validate, download (unless already present), then translate captions when enabled
    pub async fn fetch(
        &self,
        url: &str,
        output_dir: Option<&Path>,
        force: bool,
        progress: &ProgressReporter,
    ) -> Result<FetchOutcome> {
        let url = validate_video_url(url)?;
        let output_dir = match output_dir {
            Some(dir) => validate_output_directory(&dir.to_string_lossy())?,
            None => validate_output_directory(&self.config.fetch.output_dir)?,
        };

        self.session.check_cancelled()?;
        progress.status("Extracting video info");
        let info = self.fetcher.video_info(url.as_str()).await?;
        let existing = check_existing(&output_dir, &info)?;

        let reused_video = existing.exists() && !force;
        let folder = if reused_video {
            info!(
                "Video already present in {} ({}); skipping download",
                existing.folder.display(),
                existing.files.join(", ")
            );
            progress.report(ProgressEvent::Reused {
                path: existing.folder.clone(),
            });
            self.session.record_download(&existing.folder);
            existing.folder
        } else {
            self.fetcher
                .download_into(url.as_str(), &existing.folder, &self.session, progress)
                .await?
        };

        let captions = if self.config.translate.enabled {
            self.translate_folder(&folder, progress).await?
        } else {
            Vec::new()
        };

        Ok(FetchOutcome {
            folder,
            reused_video,
            captions,
        })
    }

    /// Produce target-language captions for a fetched folder, reusing what is already there.
    ///
    /// Order of preference: captions already tagged with the target code, previously
    /// translated files, then fresh translation of every untagged caption file.
    pub async fn translate_folder(&self, folder: &Path, progress: &ProgressReporter) -> Result<Vec<PathBuf>> {
        let target = &self.config.translate.target_language;
        let code = language_code(target);

        let caption_files = list_caption_files(folder).await?;
        if caption_files.is_empty() {
            info!("No caption files found in {}", folder.display());
            return Ok(Vec::new());
        }

        let native: Vec<PathBuf> = caption_files
            .iter()
            .filter(|path| has_tag(path, code))
            .cloned()
            .collect();
        if !native.is_empty() {
            for path in &native {
                info!("Using existing {} captions: {}", target, path.display());
                progress.report(ProgressEvent::Reused { path: path.clone() });
            }
            return Ok(native);
        }

        let mut existing = Vec::new();
        for path in &caption_files {
            let expected = translated_file_name(path, target);
            if expected.is_file() && !existing.contains(&expected) {
                info!("Using existing translated captions: {}", expected.display());
                progress.report(ProgressEvent::Reused { path: expected.clone() });
                existing.push(expected);
            }
        }
        if !existing.is_empty() {
            return Ok(existing);
        }

        let Some(translator) = self.active_translator() else {
            warn!(
                "No {} captions found and translation is not configured; skipping",
                target
            );
            progress.status(format!("No {} captions found and translation is not configured", target));
            return Ok(Vec::new());
        };

        let options = self.clean_options();
        let mut sources: Vec<&PathBuf> = caption_files
            .iter()
            .filter(|path| !carries_output_tag(path))
            .collect();
        sources.sort_by_key(|path| source_preference(path));

        let mut produced: Vec<PathBuf> = Vec::new();
        for path in sources {
            self.session.check_cancelled()?;

            let destination = translated_file_name(path, target);
            if produced.contains(&destination) {
                info!(
                    "Skipping {}: {} already written from another source",
                    path.display(),
                    destination.display()
                );
                continue;
            }

            info!("Translating caption file: {}", path.display());
            match self.translate_and_clean(translator, path, &options, progress).await {
                Ok(Some(output)) => produced.push(output),
                Ok(None) => {}
                Err(CapfetchError::Cancelled) => return Err(CapfetchError::Cancelled),
                Err(e) => warn!("Failed to translate {}: {}", path.display(), e),
            }
        }

        Ok(produced)
    }

    async fn translate_and_clean(
        &self,
        translator: &BatchTranslator,
        path: &Path,
        options: &CleanOptions,
        progress: &ProgressReporter,
    ) -> Result<Option<PathBuf>> {
        let output = translator
            .translate_file(path, &self.config.translate.target_language, progress)
            .await?;
        if let Some(output) = &output {
            clean_caption_file(output, options).await?;
        }
        Ok(output)
    }

    /// Translate one caption file and clean the result
    pub async fn translate_file(&self, path: &Path, progress: &ProgressReporter) -> Result<Option<PathBuf>> {
        if !path.is_file() {
            return Err(CapfetchError::FileNotFound(path.display().to_string()));
        }

        let translator = self.active_translator().ok_or_else(|| {
            CapfetchError::Config("Translation is disabled or missing credentials".to_string())
        })?;

        self.translate_and_clean(translator, path, &self.clean_options(), progress)
            .await
    }
}

/// `*.vtt` files directly inside `folder`, sorted by name
async fn list_caption_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(CapfetchError::FileNotFound(folder.display().to_string()));
    }

    let mut entries = fs::read_dir(folder).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_vtt = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("vtt"));
        if is_vtt && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
