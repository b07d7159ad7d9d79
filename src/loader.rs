//! Document loading - enumerate a corpus directory and chunk each file

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunker::{Chunk, SimpleChunker};
use crate::error::{RagError, Result};

/// Label used when no category rule matches
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Substring rule for inferring a category from a file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Matched case-insensitively against the file name
    pub pattern: String,
    pub label: String,
}

impl CategoryRule {
    pub fn new(pattern: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            label: label.into(),
        }
    }
}

/// Built-in rules, checked in order
pub fn default_category_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("13", "Apollo 13"),
        CategoryRule::new("11", "Apollo 11"),
    ]
}

/// Infer a category from a file name; first matching rule wins
pub fn detect_category(file_name: &str, rules: &[CategoryRule]) -> String {
    let name = file_name.to_lowercase();
    rules
        .iter()
        .find(|rule| name.contains(&rule.pattern.to_lowercase()))
        .map(|rule| rule.label.clone())
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}

/// A file that was found but could not be read
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Chunks loaded from a corpus, plus the files that were skipped
#[derive(Debug, Default)]
pub struct LoadReport {
    pub chunks: Vec<Chunk>,
    /// Number of files read successfully
    pub files_loaded: usize,
    pub skipped: Vec<SkippedFile>,
}

impl LoadReport {
    pub fn has_warnings(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Load every `.txt` file directly inside `data_dir` and chunk it
///
/// Files are visited in file-name order so repeated builds over the same
/// corpus produce the same insertion order. A file that cannot be read is
/// logged and recorded in [`LoadReport::skipped`]; the run continues.
pub fn load_documents(
    data_dir: &Path,
    chunker: &SimpleChunker,
    rules: &[CategoryRule],
) -> Result<LoadReport> {
    if !data_dir.is_dir() {
        return Err(RagError::io(
            format!("opening corpus directory {}", data_dir.display()),
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    info!("Loading documents from {:?}", data_dir);

    let walker = WalkBuilder::new(data_dir)
        .max_depth(Some(1))
        .standard_filters(false)
        .hidden(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut report = LoadReport::default();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read directory entry: {}", e);
                report.skipped.push(SkippedFile {
                    path: data_dir.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let path = entry.path();
        if entry.depth() == 0 || !is_text_file(path) {
            continue;
        }

        // Symlinks are followed; a `.txt` name that does not resolve to a
        // regular file is reported rather than dropped
        if !path.is_file() {
            if path.is_dir() {
                continue;
            }
            warn!("Skipping {}: not a regular file", path.display());
            report.skipped.push(SkippedFile {
                path: path.to_path_buf(),
                reason: "not a regular file or a broken link".to_string(),
            });
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", path.display(), e);
                report.skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let category = detect_category(&file_name, rules);
        let before = report.chunks.len();
        report
            .chunks
            .extend(chunker.chunk(&content).map(|text| Chunk {
                text: text.to_string(),
                source: file_name.clone(),
                category: category.clone(),
            }));
        report.files_loaded += 1;

        debug!(
            "{} -> {} chunks ({})",
            file_name,
            report.chunks.len() - before,
            category
        );
    }

    info!(
        "Loaded {} chunks from {} files ({} skipped)",
        report.chunks.len(),
        report.files_loaded,
        report.skipped.len()
    );

    Ok(report)
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn test_detect_category() {
        let rules = default_category_rules();
        assert_eq!(detect_category("apollo13_transcript.txt", &rules), "Apollo 13");
        assert_eq!(detect_category("apollo11_log.txt", &rules), "Apollo 11");
        assert_eq!(detect_category("mission_x.txt", &rules), "Unknown");
    }

    #[test]
    fn test_detect_category_first_rule_wins() {
        let rules = default_category_rules();
        // contains both "11" and "13"; the "13" rule is listed first
        assert_eq!(detect_category("a11_vs_a13.txt", &rules), "Apollo 13");
    }

    #[test]
    fn test_detect_category_case_insensitive() {
        let rules = vec![CategoryRule::new("Gemini", "Gemini Program")];
        assert_eq!(detect_category("GEMINI_flight.TXT", &rules), "Gemini Program");
    }

    #[test]
    fn test_load_skips_unreadable_and_non_text() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("apollo11_log.txt"), "Eagle has landed.").unwrap();
        std::fs::write(dir.join("broken.txt"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        std::fs::write(dir.join("notes.md"), "ignored").unwrap();
        std::fs::create_dir(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested").join("apollo13.txt"), "not visited").unwrap();

        let chunker = SimpleChunker::default();
        let report = load_documents(dir, &chunker, &default_category_rules()).unwrap();

        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].source, "apollo11_log.txt");
        assert_eq!(report.chunks[0].category, "Apollo 11");
        assert!(report.has_warnings());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("broken.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_follows_links_and_dot_files() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let dir = tmp.path();

        std::fs::write(dir.join("apollo11_plain.txt"), "Tranquility Base here.").unwrap();
        std::fs::write(dir.join(".apollo11_hidden.txt"), "The Eagle has wings.").unwrap();
        let target = outside.path().join("apollo13_source.txt");
        std::fs::write(&target, "Houston, we've had a problem.").unwrap();
        std::os::unix::fs::symlink(&target, dir.join("apollo13_linked.txt")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("gone.txt"),
            dir.join("apollo13_dangling.txt"),
        )
        .unwrap();

        let report =
            load_documents(dir, &SimpleChunker::default(), &default_category_rules()).unwrap();

        let sources: Vec<&str> = report.chunks.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![".apollo11_hidden.txt", "apollo11_plain.txt", "apollo13_linked.txt"]
        );
        assert_eq!(report.files_loaded, 3);
        assert_eq!(report.chunks[2].category, "Apollo 13");
        assert_eq!(report.chunks[2].text, "Houston, we've had a problem.");

        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("apollo13_dangling.txt"));
    }

    #[test]
    fn test_load_order_is_by_file_name() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.txt"), "second").unwrap();
        std::fs::write(tmp.path().join("a.txt"), "first").unwrap();

        let report =
            load_documents(tmp.path(), &SimpleChunker::default(), &default_category_rules())
                .unwrap();
        let sources: Vec<&str> = report.chunks.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let err = load_documents(
            Path::new("/definitely/not/here"),
            &SimpleChunker::default(),
            &default_category_rules(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}
