//! Opening input files
//!
//! Every input is streamed line by line; a file that cannot be opened or read
//! is a structural `FileRead` problem.

use crate::models::{ErrorKind, Problem};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Open a file for line-oriented reading
pub fn open(path: &Path) -> Result<BufReader<File>, Problem> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| read_error(&path.display().to_string(), &e))
}

/// Read a whole (small) document into memory
pub fn read_to_string(path: &Path) -> Result<String, Problem> {
    std::fs::read_to_string(path).map_err(|e| read_error(&path.display().to_string(), &e))
}

pub(crate) fn read_error(source: &str, error: &std::io::Error) -> Problem {
    Problem::new(ErrorKind::FileRead, format!("cannot read {source}")).with_detail(error.to_string())
}

/// Lines that carry no content: blank or `#` comments
pub(crate) fn is_blank_or_comment(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_file_read() {
        let err = open(Path::new("/definitely/not/here.txt")).expect_err("missing file");
        assert_eq!(err.kind, ErrorKind::FileRead);
        assert!(err.description.contains("/definitely/not/here.txt"));
        assert!(err.detail.is_some());
    }

    #[test]
    fn test_blank_or_comment() {
        assert!(is_blank_or_comment(""));
        assert!(is_blank_or_comment("   "));
        assert!(is_blank_or_comment("# note"));
        assert!(is_blank_or_comment("   # indented note"));
        assert!(!is_blank_or_comment("com.a."));
    }
}
