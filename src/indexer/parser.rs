//! Plain-text extraction for indexable files.
//!
//! Recognizes an explicit allow-list of extensions. Anything else is skipped
//! by the scanner rather than treated as an error; an unreadable file in the
//! list surfaces as [`EngineError::Parse`] so the scan can log and move on.

use std::path::Path;

use crate::error::{EngineError, Result};

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "md", "txt", "rs", "ts", "tsx", "js", "jsx", "py", "json", "toml", "yaml", "yml", "html",
    "css", "sh", "bash", "zsh", "fish", "swift", "go", "java", "c", "cpp", "h", "hpp", "rb",
    "lua", "sql", "xml", "csv", "log", "conf", "cfg", "ini", "env",
];

pub fn is_supported(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Extract normalized text from a supported file.
pub fn parse_file(path: &Path) -> Result<String> {
    let ext = extension_of(path);
    if !is_supported(&ext) {
        return Err(EngineError::Parse {
            path: path.to_path_buf(),
            reason: format!("unsupported extension: {ext}"),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| EngineError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let text = match ext.as_str() {
        "html" | "xml" => clean_text(&strip_markup(&content)),
        _ => clean_text(&content),
    };
    Ok(text)
}

/// Trim lines and drop empty ones.
fn clean_text(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop tags and the bodies of script/style elements.
fn strip_markup(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(open) = rest.find('<') {
        result.push_str(&rest[..open]);
        rest = &rest[open..];

        let lower = rest.to_lowercase();
        let skip_to = if lower.starts_with("<script") {
            lower.find("</script").map(|i| i + "</script".len())
        } else if lower.starts_with("<style") {
            lower.find("</style").map(|i| i + "</style".len())
        } else {
            None
        };
        if let Some(skip) = skip_to {
            rest = &rest[skip..];
        }

        match rest.find('>') {
            Some(close) => rest = &rest[close + 1..],
            None => return result,
        }
        // tags act as word separators
        result.push(' ');
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_covers_code_and_text() {
        for ext in ["rs", "md", "py", "toml", "SQL"] {
            assert!(is_supported(ext), "{ext} should be supported");
        }
        for ext in ["exe", "png", "zip", ""] {
            assert!(!is_supported(ext), "{ext} should not be supported");
        }
    }

    #[test]
    fn clean_text_collapses_blank_lines() {
        assert_eq!(clean_text("  hello  \n\n\n  world  \n  "), "hello\nworld");
    }

    #[test]
    fn markup_is_stripped() {
        let html = "<p>Hello <b>world</b></p><script>alert(1)</script><p>bye</p>";
        let text = clean_text(&strip_markup(html));
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
        assert!(text.contains("bye"));
        assert!(!text.contains("alert"));
    }

    #[test]
    fn unsupported_path_is_a_parse_error() {
        let err = parse_file(Path::new("/tmp/image.png")).unwrap_err();
        assert!(matches!(err, EngineError::Parse { .. }));
    }

    #[test]
    fn reads_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Title\n\nsome body text\n").unwrap();
        let text = parse_file(&path).unwrap();
        assert_eq!(text, "# Title\nsome body text");
    }
}
