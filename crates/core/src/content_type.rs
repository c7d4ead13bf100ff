//! Content-type inference for uploaded assets.

use std::path::Path;

/// Content type used when the extension is unknown or missing.
pub const FALLBACK_CONTENT_TYPE: &str = "application/zip";

/// Look up the MIME type for `path` by extension.
///
/// Never fails: an unknown extension yields [`FALLBACK_CONTENT_TYPE`].
pub fn resolve(path: &Path) -> String {
    match mime_guess::from_path(path).first_raw() {
        Some(mime) => mime.to_string(),
        None => FALLBACK_CONTENT_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(resolve(Path::new("report.json")), "application/json");
        assert_eq!(resolve(Path::new("dist/app.zip")), "application/zip");
        assert_eq!(resolve(Path::new("notes.txt")), "text/plain");
        assert_eq!(resolve(Path::new("logo.png")), "image/png");
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(resolve(Path::new("blob.unknownext")), FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_missing_extension_falls_back() {
        assert_eq!(resolve(Path::new("bin/assetsync")), FALLBACK_CONTENT_TYPE);
        assert_eq!(resolve(Path::new("Makefile")), FALLBACK_CONTENT_TYPE);
    }
}
