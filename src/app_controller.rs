use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, OutputLayout};
use crate::errors::{AppError, TranslationError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::Provider;
use crate::table::Table;
use crate::translation::{BatchTranslator, CellKind, TokenUsageStats, TranslationService};
use crate::validation::{FileValidator, Severity};

// @module: Application controller for CSV translation

/// Translation of one source column into one target column
#[derive(Debug, Clone, Copy)]
struct ColumnJob<'a> {
    source: usize,
    target: usize,
    kind: CellKind<'a>,
}

/// A translated table waiting to be written
struct PendingOutput {
    path: PathBuf,
    table: Table,
}

/// Main application controller for CSV translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Service shared by every language of a run
    service: TranslationService,
    // @field: Draw progress bars
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let service = TranslationService::new(config.translation.clone())
            .context("Failed to initialize translation provider")?;
        Ok(Self::from_parts(config, service))
    }

    // @method: Create a controller around an existing provider
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Self {
        let service = TranslationService::with_provider(config.translation.clone(), provider);
        Self::from_parts(config, service)
    }

    fn from_parts(config: Config, service: TranslationService) -> Self {
        let service = service.with_language_separator(config.csv.language_separator.clone());
        Self {
            config,
            service,
            show_progress: true,
        }
    }

    /// Hide progress bars
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Configuration of this controller
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token usage of the requests made so far
    pub fn usage_stats(&self) -> TokenUsageStats {
        self.service.usage_stats()
    }

    /// Check that the provider answers
    pub async fn test_connection(&self) -> Result<()> {
        self.service.test_connection().await
            .with_context(|| format!("Failed to connect to {}", self.service.provider_name()))
    }

    /// Translate a CSV file and return the written output files.
    /// Nothing is written unless every requested translation succeeded.
    pub async fn run(&self, input_file: &Path) -> Result<Vec<PathBuf>> {
        let start_time = Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(AppError::File(format!("Input file does not exist: {:?}", input_file)).into());
        }

        let delimiter = self.delimiter()?;
        let table = Table::load(input_file, delimiter)?;
        self.report_file_warnings(input_file);

        info!(
            "Translating {:?} ({} rows) with {} - {}",
            input_file,
            table.row_count(),
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );

        let outputs = match self.config.output.layout {
            OutputLayout::InPlace => self.translate_in_place(&table, input_file).await?,
            OutputLayout::LanguageColumns => self.translate_language_columns(&table, input_file).await?,
        };

        let mut written: Vec<PathBuf> = Vec::with_capacity(outputs.len());
        for output in outputs {
            if let Err(e) = output.table.write(&output.path, delimiter) {
                if !written.is_empty() {
                    let done: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
                    error!(
                        "Failed to write {}; already written: {}",
                        output.path.display(),
                        done.join(", ")
                    );
                }
                return Err(e.into());
            }
            info!("Success: {}", output.path.display());
            written.push(output.path);
        }

        let usage = self.usage_stats();
        if usage.requests > 0 {
            info!("{}", usage.summary());
        }
        let (hits, misses, hit_rate) = self.service.cache.stats();
        if hits > 0 {
            debug!("Cache: {} hits, {} misses ({:.1}% hit rate)", hits, misses, hit_rate * 100.0);
        }
        info!("Translation completed in {}.", Self::format_duration(start_time.elapsed()));

        Ok(written)
    }

    fn delimiter(&self) -> Result<u8> {
        let delimiter = self.config.csv.delimiter;
        u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| AppError::Config(format!("CSV delimiter must be an ASCII character, got '{}'", delimiter)).into())
    }

    fn report_file_warnings(&self, input_file: &Path) {
        let results = FileValidator::new(self.config.csv.delimiter).validate(input_file);
        for result in results.iter().filter(|r| r.severity == Severity::Warning) {
            warn!("{}", result);
        }
    }

    /// Overwrite the text columns, one output table per target language
    async fn translate_in_place(&self, table: &Table, input_file: &Path) -> Result<Vec<PendingOutput>> {
        let columns: Vec<&String> = self.config.columns.text_columns.iter()
            .filter(|c| !self.config.columns.is_excluded(c))
            .collect();
        table.require_columns(&columns)?;

        let jobs: Vec<ColumnJob> = columns.iter()
            .filter_map(|name| table.column_index(name).map(|index| (name.as_str(), index)))
            .map(|(name, index)| ColumnJob { source: index, target: index, kind: self.cell_kind(name) })
            .collect();

        let targets = &self.config.target_languages;
        if targets.is_empty() {
            return Err(AppError::Config("At least one target language is required for the in-place layout".to_string()).into());
        }
        let mut outputs = Vec::with_capacity(targets.len());

        for target_language in targets {
            let mut translated = table.clone();
            self.translate_jobs(table, &mut translated, &jobs, target_language).await?;

            let language_tag = if targets.len() > 1 { Some(target_language.as_str()) } else { None };
            let path = FileManager::generate_output_path(
                input_file,
                self.config.output.path.as_deref(),
                &self.config.output.suffix,
                language_tag,
            );
            outputs.push(PendingOutput { path, table: translated });
        }

        Ok(outputs)
    }

    /// Fill `<field><sep><lang>` columns from the source language column
    async fn translate_language_columns(&self, table: &Table, input_file: &Path) -> Result<Vec<PendingOutput>> {
        let fields = self.language_columns(table);
        let source_language = &self.config.source_language;
        let targets = &self.config.target_languages;

        if targets.is_empty() {
            info!("No target languages given, filling every language column");
        }

        // target language -> jobs, in header order
        let mut jobs_by_language: Vec<(String, Vec<ColumnJob>)> = Vec::new();

        for (field, languages) in &fields {
            let Some((source_column, source_index)) = self.source_column(languages) else {
                debug!("Skipping field '{}': no '{}' column", field, source_language);
                continue;
            };

            for (language, target_index) in languages {
                if *language == source_column || (!targets.is_empty() && !targets.contains(language)) {
                    continue;
                }

                let job = ColumnJob { source: *source_index, target: *target_index, kind: self.cell_kind(field) };
                match jobs_by_language.iter_mut().find(|(lang, _)| lang == language) {
                    Some((_, jobs)) => jobs.push(job),
                    None => jobs_by_language.push((language.clone(), vec![job])),
                }
            }
        }

        if jobs_by_language.is_empty() {
            warn!("No target language columns found for source language '{}'", source_language);
        }

        let mut translated = table.clone();
        for (language, jobs) in &jobs_by_language {
            self.translate_jobs(table, &mut translated, jobs, language).await?;
        }

        let path = FileManager::generate_output_path(
            input_file,
            self.config.output.path.as_deref(),
            &self.config.output.suffix,
            None,
        );

        Ok(vec![PendingOutput { path, table: translated }])
    }

    /// Base fields with their language columns, in header order
    fn language_columns<'t>(&self, table: &'t Table) -> Vec<(&'t str, Vec<(String, usize)>)> {
        let field_separator = &self.config.csv.field_language_separator;
        let language_separator = &self.config.csv.language_separator;
        let columns = &self.config.columns;
        let mut fields: Vec<(&str, Vec<(String, usize)>)> = Vec::new();

        for (index, header) in table.headers().iter().enumerate() {
            let Some((field, language)) = header.rsplit_once(field_separator.as_str()) else {
                continue;
            };

            let base = language_utils::base_language(language, language_separator);
            if field.is_empty() || language_utils::validate_language_code(&base).is_err() {
                continue;
            }

            let selected = columns.text_columns.is_empty() || columns.text_columns.iter().any(|c| c == field);
            if !selected || columns.is_excluded(field) || columns.is_excluded(header) {
                continue;
            }

            match fields.iter_mut().find(|(name, _)| *name == field) {
                Some((_, languages)) => languages.push((language.to_string(), index)),
                None => fields.push((field, vec![(language.to_string(), index)])),
            }
        }

        fields
    }

    /// Column holding the source language. An exact code wins; a source code
    /// without region (`en`) also matches the first `en-*` column.
    fn source_column<'l>(&self, languages: &'l [(String, usize)]) -> Option<(&'l str, &'l usize)> {
        let source_language = &self.config.source_language;
        let separator = &self.config.csv.language_separator;

        languages.iter()
            .find(|(lang, _)| lang == source_language)
            .or_else(|| {
                if source_language.contains(separator.as_str()) {
                    return None;
                }
                languages.iter().find(|(lang, _)| {
                    language_utils::language_codes_match(&language_utils::base_language(lang, separator), source_language)
                })
            })
            .map(|(lang, index)| (lang.as_str(), index))
    }

    fn cell_kind(&self, column: &str) -> CellKind<'_> {
        let columns = &self.config.columns;
        if let Some(json) = columns.json_field(column) {
            CellKind::Json(json)
        } else if columns.is_set_column(column) {
            CellKind::Set { separator: &self.config.csv.set_separator }
        } else {
            CellKind::Plain
        }
    }

    /// Translate every job's source cells into `output` for one language
    async fn translate_jobs(
        &self,
        source: &Table,
        output: &mut Table,
        jobs: &[ColumnJob<'_>],
        target_language: &str,
    ) -> Result<()> {
        // Unique segments, each with the first cell it appears in
        let mut segments: Vec<String> = Vec::new();
        let mut first_cells: Vec<(usize, usize)> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for job in jobs {
            for (row, value) in source.column_values(job.source).enumerate() {
                for segment in job.kind.segments(value) {
                    if !seen.contains_key(&segment) {
                        seen.insert(segment.clone(), segments.len());
                        segments.push(segment);
                        first_cells.push((row, job.source));
                    }
                }
            }
        }

        let translations: HashMap<String, String> = if segments.is_empty() {
            debug!("Nothing to translate to {}", target_language);
            HashMap::new()
        } else {
            let progress_bar = self.progress_bar(segments.len() as u64, target_language);
            let pb = progress_bar.clone();

            let translator = BatchTranslator::new(self.service.clone());
            let result = translator
                .translate_segments(&segments, &self.config.source_language, target_language, move |done, _total| {
                    pb.set_position(done as u64);
                })
                .await;
            progress_bar.finish_and_clear();

            let translated = result.map_err(|failure| {
                let (row, column) = first_cells[failure.segment];
                let error: TranslationError = failure.error.at_cell(source.cell_ref(row, column), target_language);
                anyhow::Error::new(error)
            })?;

            segments.into_iter().zip(translated).collect()
        };

        for job in jobs {
            for row in 0..source.row_count() {
                let value = source.rows()[row].get(job.source).unwrap_or("");
                output.set_cell(row, job.target, job.kind.rebuild(value, &translations));
            }
        }

        Ok(())
    }

    fn progress_bar(&self, total: u64, target_language: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message(target_language.to_string());
        progress_bar
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
