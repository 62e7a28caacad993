//! Log scanning against the error pattern set.

use mirai_common::{DetectedError, PatternSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Source name used for piped standard input
pub const STDIN_SOURCE: &str = "<stdin>";

/// Matches log lines against the enabled patterns
pub struct LogScanner {
    patterns: PatternSet,
}

impl LogScanner {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    /// Scan each file; one detection per matching line.
    ///
    /// Unreadable files are logged and skipped.
    pub fn scan_logs<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<DetectedError> {
        let mut detected = Vec::new();
        for path in paths {
            let path = path.as_ref();
            match self.scan_file(path) {
                Ok(mut found) => detected.append(&mut found),
                Err(e) => warn!("Cannot scan {}: {}", path.display(), e),
            }
        }
        detected
    }

    pub fn scan_file(&self, path: &Path) -> io::Result<Vec<DetectedError>> {
        let file = File::open(path)?;
        let found = self.scan_reader(BufReader::new(file), &path.display().to_string())?;
        debug!("{}: {} matches", path.display(), found.len());
        Ok(found)
    }

    /// Scan any buffered source line by line; invalid UTF-8 is replaced
    pub fn scan_reader<R: BufRead>(&self, reader: R, source: &str) -> io::Result<Vec<DetectedError>> {
        let mut detected = Vec::new();
        for (idx, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            let line = String::from_utf8_lossy(&line);
            if let Some(pattern) = self.patterns.match_line(&line) {
                detected.push(DetectedError::from_match(pattern, source, idx + 1, &line));
            }
        }
        Ok(detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirai_common::{PatternDocument, Severity};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn scanner() -> LogScanner {
        let doc = PatternDocument::from_json(
            r#"{"error_patterns": [
                {"id": "test_error", "name": "Test error", "pattern": "TEST_ERROR_PATTERN",
                 "severity": "high", "auto_fix": true, "actions": ["log_analysis"]},
                {"id": "any_error", "pattern": "ERROR", "severity": "low"}
            ]}"#,
        )
        .unwrap();
        LogScanner::new(PatternSet::compile(&doc.error_patterns).unwrap())
    }

    #[test]
    fn test_scan_logs_empty_input() {
        let paths: Vec<&Path> = Vec::new();
        assert!(scanner().scan_logs(&paths).is_empty());
    }

    #[test]
    fn test_single_match_yields_one_error() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("app.log");
        std::fs::write(
            &log,
            "server started\nTEST_ERROR_PATTERN occurred here\nrequest served\n",
        )
        .unwrap();

        let found = scanner().scan_logs(&[&log]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "test_error");
        assert_eq!(found[0].severity, Severity::High);
        assert_eq!(found[0].line_number, 2);
        assert_eq!(found[0].matched_line, "TEST_ERROR_PATTERN occurred here");
    }

    #[test]
    fn test_first_match_wins_per_line() {
        // both patterns match this line; the first declared one wins
        let input = Cursor::new("ERROR TEST_ERROR_PATTERN\nERROR other\n");
        let found = scanner().scan_reader(input, STDIN_SOURCE).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "test_error");
        assert_eq!(found[1].id, "any_error");
        assert_eq!(found[1].source_file, STDIN_SOURCE);
    }

    #[test]
    fn test_missing_file_skipped() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("present.log");
        std::fs::write(&present, "ERROR boom\n").unwrap();

        let found = scanner().scan_logs(&[dir.path().join("absent.log"), present]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_invalid_utf8_does_not_abort() {
        let input = Cursor::new(b"\xff\xfe ERROR garbled\n".to_vec());
        let found = scanner().scan_reader(input, "bin.log").unwrap();
        assert_eq!(found.len(), 1);
    }
}
