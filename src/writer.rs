use crate::{
    config::Config,
    error::{Error, Result},
    profile::ProfileReference,
};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const OUTPUT_SUFFIX: &str = "_persona.txt";

/// Persists generated personas as `<output_dir>/<username>_persona.txt`.
pub(crate) struct Writer {
    output_dir: PathBuf,
}

impl Writer {
    /// Creates a new writer from configuration.
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
        }
    }

    /// Path the persona for `profile` is written to.
    pub(crate) fn output_path(&self, profile: &ProfileReference) -> PathBuf {
        self.output_dir
            .join(format!("{}{OUTPUT_SUFFIX}", profile.username()))
    }

    /// Writes `text` unchanged, replacing any earlier persona for the same
    /// user. Creates the output directory when needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub(crate) fn write(&self, profile: &ProfileReference, text: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))?;

        let path = self.output_path(profile);
        if path.exists() {
            debug!("Overwriting {}", path.display());
        }

        write_file_atomic(&path, text)?;

        info!("Wrote {} bytes to {}", text.len(), path.display());
        Ok(path)
    }
}

/// Writes a file atomically.
///
/// # Process
///
/// 1. Writes content to a temporary sibling file
/// 2. Syncs it to disk
/// 3. Renames it over the target path
///
/// A crash mid-write leaves the previous file intact. On any failure the
/// temporary file is removed, so a failed write leaves no persona text behind.
fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("txt.tmp");
    let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

    let written = temp_file
        .write_all(content.as_bytes())
        .and_then(|()| temp_file.sync_all())
        .map_err(|e| Error::io(&temp_path, e));
    drop(temp_file);

    let result =
        written.and_then(|()| fs::rename(&temp_path, path).map_err(|e| Error::io(path, e)));

    if result.is_err() {
        // The original error is the one worth reporting
        let _ = fs::remove_file(&temp_path);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn create_test_config(output_dir: &Path) -> Config {
        Config::builder().output_dir(output_dir).build().unwrap()
    }

    fn profile(name: &str) -> ProfileReference {
        ProfileReference::from_url(&format!("https://www.reddit.com/user/{name}/")).unwrap()
    }

    #[test]
    fn test_writer_creates_output_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output_dir = temp.child("nested").child("output");

        let writer = Writer::new(&create_test_config(output_dir.path()));
        writer.write(&profile("alice"), "persona").unwrap();

        assert!(output_dir.exists());
    }

    #[test]
    fn test_writer_file_name_and_content() {
        let temp = assert_fs::TempDir::new().unwrap();
        let writer = Writer::new(&create_test_config(temp.path()));

        let text = "Name: alice\nLikes: ☕ and Rust\n";
        let path = writer.write(&profile("alice"), text).unwrap();

        assert_eq!(path, temp.path().join("alice_persona.txt"));
        temp.child("alice_persona.txt").assert(text);
    }

    #[test]
    fn test_writer_is_idempotent() {
        let temp = assert_fs::TempDir::new().unwrap();
        let writer = Writer::new(&create_test_config(temp.path()));

        writer.write(&profile("bob"), "same text").unwrap();
        let once = fs::read_to_string(temp.child("bob_persona.txt").path()).unwrap();

        writer.write(&profile("bob"), "same text").unwrap();
        let twice = fs::read_to_string(temp.child("bob_persona.txt").path()).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_writer_overwrites_without_backup() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("carol_persona.txt").write_str("old persona").unwrap();

        let writer = Writer::new(&create_test_config(temp.path()));
        writer.write(&profile("carol"), "new persona").unwrap();

        temp.child("carol_persona.txt").assert("new persona");

        let entries: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["carol_persona.txt".to_string()]);
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        // A directory in the way makes the final rename fail
        temp.child("dave_persona.txt").create_dir_all().unwrap();

        let writer = Writer::new(&create_test_config(temp.path()));
        let err = writer.write(&profile("dave"), "persona").unwrap_err();
        assert!(err.is_io());

        let entries: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["dave_persona.txt".to_string()]);
        assert!(temp.child("dave_persona.txt").path().is_dir());
    }

    #[test]
    fn test_output_path() {
        let writer = Writer::new(&create_test_config(Path::new("output")));
        assert_eq!(
            writer.output_path(&profile("Hungry-Move-6603")),
            PathBuf::from("output/Hungry-Move-6603_persona.txt")
        );
    }
}
