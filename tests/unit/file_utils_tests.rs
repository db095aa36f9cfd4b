/*!
 * Tests for file utility functions
 */

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use csv_translate::file_utils::FileManager;
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "test_file_exists.csv", "a,b\n")?;

    assert!(FileManager::file_exists(&test_file));

    Ok(())
}

/// Test that file_exists returns false for missing files and directories
#[test]
fn test_file_exists_withNonExistentFileOrDirectory_shouldReturnFalse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    assert!(!FileManager::file_exists("non_existent_file.csv"));
    assert!(!FileManager::file_exists(temp_dir.path()));

    Ok(())
}

/// Test that generate_output_path keeps the input directory and extension
#[test]
fn test_generate_output_path_withDefaults_shouldSuffixStem() {
    let output_path = FileManager::generate_output_path("/tmp/input/products.csv", None, "_translated", None);
    assert_eq!(output_path, Path::new("/tmp/input/products_translated.csv"));
}

/// Test that an explicit output path is used as is for a single language
#[test]
fn test_generate_output_path_withExplicitOutput_shouldUseIt() {
    let explicit = PathBuf::from("/tmp/output/result.csv");
    let output_path = FileManager::generate_output_path("products.csv", Some(&explicit), "_translated", None);
    assert_eq!(output_path, explicit);
}

/// Test that a file without extension still gets a language tag
#[test]
fn test_generate_output_path_withoutExtension_shouldAppendLanguage() {
    let output_path = FileManager::generate_output_path("data/products", None, "_fr", Some("fr-FR"));
    assert_eq!(output_path, Path::new("data/products_fr.fr-FR"));
}

/// Test that ensure_dir creates directories as needed
#[test]
fn test_ensure_dir_withNonExistentDir_shouldCreateDirectory() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_subdir = temp_dir.path().join("a").join("b");

    FileManager::ensure_dir(&test_subdir)?;

    assert!(test_subdir.is_dir());

    // Calling it again is a no-op
    FileManager::ensure_dir(&test_subdir)?;

    Ok(())
}

/// Test that write_atomic creates the file with the given content
#[test]
fn test_write_atomic_withNewFile_shouldCreateFileWithContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = temp_dir.path().join("out.csv");

    FileManager::write_atomic(&test_file, "id,name\n1,Chair\n".as_bytes())?;

    assert_eq!(fs::read_to_string(&test_file)?, "id,name\n1,Chair\n");

    Ok(())
}
