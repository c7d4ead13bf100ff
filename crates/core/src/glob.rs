//! Expansion of the `files` input into a concrete list of paths.
//!
//! The input holds one or more glob patterns joined by `;`. Each pattern is
//! expanded against the file system below a root directory; results keep
//! pattern order, walk each directory in lexical order, and drop duplicates.
//!
//! | Pattern | Meaning |
//! |---------|---------|
//! | `dist/*.zip` | zip files directly inside `dist` |
//! | `dist/**/*.tar.gz` | tarballs anywhere below `dist` |
//! | `pkg/app-{linux,macos}.tar.gz` | alternatives |
//! | `!dist/*-debug.zip` | remove matches from the combined result |
//!
//! Wildcards do not match names starting with `.` unless the pattern itself
//! spells the leading dot.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::GlobError;

/// Separator between patterns in the `files` input.
pub const PATTERN_DELIMITER: char = ';';

const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// Expands pattern specifications relative to a root directory.
#[derive(Debug, Clone)]
pub struct GlobResolver {
    root: PathBuf,
}

impl GlobResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expand `spec` into an ordered, deduplicated list of regular files.
    ///
    /// Returns [`GlobError::NoFilesFound`] when nothing matches.
    pub fn resolve(&self, spec: &str) -> Result<Vec<PathBuf>, GlobError> {
        let (includes, excludes) = parse_spec(spec)?;

        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        for pattern in &includes {
            for candidate in self.expand(pattern)? {
                if excludes
                    .iter()
                    .any(|ex| glob_match::glob_match(&ex.text, &candidate))
                {
                    debug!(path = %candidate, "excluded by negated pattern");
                    continue;
                }
                if seen.insert(candidate.clone()) {
                    matches.push(self.root.join(&candidate));
                }
            }
        }

        if matches.is_empty() {
            return Err(GlobError::NoFilesFound);
        }
        info!(
            patterns = includes.len(),
            count = matches.len(),
            "resolved files to upload"
        );
        Ok(matches)
    }

    /// Matches for a single pattern, as `/`-separated strings relative to the root.
    fn expand(&self, pattern: &Pattern) -> Result<Vec<String>, GlobError> {
        let Some(base) = pattern.base.as_deref() else {
            // No wildcards: the pattern names one file.
            let full = self.root.join(&pattern.text);
            return Ok(if full.is_file() {
                vec![pattern.text.clone()]
            } else {
                Vec::new()
            });
        };

        let walk_root = self.root.join(base);
        if !walk_root.is_dir() {
            debug!(pattern = %pattern.text, dir = %walk_root.display(), "pattern base does not exist");
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut walker = WalkDir::new(&walk_root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        if let Some(depth) = pattern.max_depth {
            walker = walker.max_depth(depth);
        }
        let walker = walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || pattern.dot || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_skippable(&e) => {
                    warn!(pattern = %pattern.text, error = %e, "skipping unreadable path");
                    continue;
                }
                Err(source) => {
                    return Err(GlobError::WalkFailed {
                        pattern: pattern.text.clone(),
                        source,
                    })
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&walk_root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let candidate = join_base(base, &relative);
            if glob_match::glob_match(&pattern.text, &candidate) {
                found.push(candidate);
            }
        }

        debug!(pattern = %pattern.text, count = found.len(), "expanded pattern");
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// Pattern parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pattern {
    text: String,
    /// Literal directory prefix to walk from; `None` when the pattern has no wildcards.
    base: Option<String>,
    /// Whether wildcards may match dot-prefixed names.
    dot: bool,
    /// Deepest walk level the pattern can reach below `base`; `None` for `**`.
    max_depth: Option<usize>,
}

impl Pattern {
    fn parse(raw: &str) -> Result<Self, GlobError> {
        let text = normalize(raw);
        check_balanced(&text)?;

        let segments: Vec<&str> = text.split('/').collect();
        let first_glob = segments.iter().position(|s| s.contains(GLOB_CHARS));
        let base = first_glob.map(|idx| {
            let prefix = segments[..idx].join("/");
            if prefix.is_empty() && text.starts_with('/') {
                "/".to_string()
            } else {
                prefix
            }
        });
        let dot = segments.iter().any(|s| s.starts_with('.') && *s != "..");
        // A brace group may hide a `/`, so only plain segment counts bound the walk.
        let max_depth = match first_glob {
            Some(idx) if !text.contains("**") && !has_slash_in_braces(&text) => {
                Some(segments.len() - idx)
            }
            _ => None,
        };

        Ok(Self {
            text,
            base,
            dot,
            max_depth,
        })
    }
}

/// Drop `.` segments and repeated or trailing `/`, keeping a leading `/`.
fn normalize(raw: &str) -> String {
    let joined = raw
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/");
    if raw.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

fn has_slash_in_braces(pattern: &str) -> bool {
    let mut depth = 0usize;
    for c in pattern.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth > 0 => return true,
            _ => {}
        }
    }
    false
}

/// Split `spec` on [`PATTERN_DELIMITER`] into include and `!`-prefixed exclude patterns.
fn parse_spec(spec: &str) -> Result<(Vec<Pattern>, Vec<Pattern>), GlobError> {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    for raw in spec.split(PATTERN_DELIMITER).map(str::trim) {
        if raw.is_empty() {
            continue;
        }
        match raw.strip_prefix('!') {
            Some(negated) if negated.trim().is_empty() => {
                return Err(GlobError::InvalidPattern {
                    pattern: raw.to_string(),
                    detail: "negation without a pattern".into(),
                });
            }
            Some(negated) => excludes.push(Pattern::parse(negated.trim())?),
            None => includes.push(Pattern::parse(raw)?),
        }
    }
    Ok((includes, excludes))
}

/// Reject unterminated `[...]` classes and `{...}` groups.
fn check_balanced(pattern: &str) -> Result<(), GlobError> {
    let mut in_class = false;
    let mut brace_depth = 0usize;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '{' if !in_class => brace_depth += 1,
            '}' if !in_class => {
                if brace_depth == 0 {
                    return Err(invalid(pattern, "unmatched '}'"));
                }
                brace_depth -= 1;
            }
            _ => {}
        }
    }
    if in_class {
        return Err(invalid(pattern, "unterminated character class"));
    }
    if brace_depth > 0 {
        return Err(invalid(pattern, "unterminated brace group"));
    }
    Ok(())
}

fn invalid(pattern: &str, detail: &str) -> GlobError {
    GlobError::InvalidPattern {
        pattern: pattern.to_string(),
        detail: detail.to_string(),
    }
}

fn join_base(base: &str, relative: &str) -> String {
    match base {
        "" => relative.to_string(),
        "/" => format!("/{relative}"),
        _ => format!("{}/{}", base.trim_end_matches('/'), relative),
    }
}

/// Symlink loops, dangling links, and unreadable directories are skipped.
fn is_skippable(err: &walkdir::Error) -> bool {
    if err.depth() == 0 {
        return false;
    }
    err.loop_ancestor().is_some()
        || err.io_error().is_some_and(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            )
        })
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|n| n.starts_with('.')).unwrap_or(false)
}
