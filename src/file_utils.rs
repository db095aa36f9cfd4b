use anyhow::{Result, Context};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Output path for a translated CSV file
    // @params: input_file, explicit output path, suffix, target language when one file per language is written
    //
    // input.csv              -> input_translated.csv
    // input.csv + fr-FR      -> input_translated.fr-FR.csv
    // out.csv + fr-FR        -> out.fr-FR.csv
    pub fn generate_output_path<P: AsRef<Path>>(
        input_file: P,
        output_path: Option<&Path>,
        suffix: &str,
        target_language: Option<&str>,
    ) -> PathBuf {
        let input_file = input_file.as_ref();

        let base = match output_path {
            Some(path) => path.to_path_buf(),
            None => {
                let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();
                let mut file_name = format!("{}{}", stem, suffix);
                if let Some(ext) = input_file.extension() {
                    file_name.push('.');
                    file_name.push_str(&ext.to_string_lossy());
                }
                input_file.with_file_name(file_name)
            }
        };

        match target_language {
            None => base,
            Some(language) => {
                let stem = base.file_stem().unwrap_or_default().to_string_lossy();
                let mut file_name = format!("{}.{}", stem, language);
                if let Some(ext) = base.extension() {
                    file_name.push('.');
                    file_name.push_str(&ext.to_string_lossy());
                }
                base.with_file_name(file_name)
            }
        }
    }

    /// Write bytes to a file through a temporary file in the same directory,
    /// so the destination either keeps its old content or gets the new one
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self::ensure_dir(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
        temp.write_all(content)
            .with_context(|| format!("Failed to write temporary file for {:?}", path))?;
        temp.as_file().sync_all()
            .with_context(|| format!("Failed to flush temporary file for {:?}", path))?;
        temp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move output into place: {:?}", path))?;

        Ok(())
    }
}
