//! Loading [`FitsOptions`] from JSON
//!
//! Missing fields keep their defaults, so `{"long_strings": true}` is a
//! complete configuration.

use std::fs;
use std::path::Path;

use fitskit_core::FitsOptions;

use crate::error::Result;

/// Parse options from a JSON document
pub fn parse_options(json: &str) -> Result<FitsOptions> {
    Ok(serde_json::from_str(json)?)
}

/// Read options from a JSON file
pub fn load_options<P: AsRef<Path>>(path: P) -> Result<FitsOptions> {
    let text = fs::read_to_string(path)?;
    parse_options(&text)
}

/// Render options as pretty-printed JSON
pub fn options_to_json(options: &FitsOptions) -> Result<String> {
    Ok(serde_json::to_string_pretty(options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let options = parse_options(r#"{"long_strings": true}"#).unwrap();
        assert!(options.long_strings);
        assert!(options.use_hierarch);
        assert!(options.allow_terminal_junk);
        assert!(!options.strict_fields);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_options("{"), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let options = FitsOptions::default().with_strict_fields(true);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(options_to_json(&options).unwrap().as_bytes())
            .unwrap();
        assert_eq!(load_options(file.path()).unwrap(), options);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_options(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
