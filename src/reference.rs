//! Reference data for the form's select boxes.
//!
//! Industries are read once and kept for the life of the loader (which the
//! binary holds for the life of the process); there is no invalidation.
//! Sizes are re-read on every call.

use crate::error::{LookupError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;

pub struct ReferenceData {
    industry_file: PathBuf,
    size_file: PathBuf,
    industries: OnceLock<Arc<Vec<String>>>,
}

impl ReferenceData {
    pub fn new(industry_file: impl Into<PathBuf>, size_file: impl Into<PathBuf>) -> Self {
        Self {
            industry_file: industry_file.into(),
            size_file: size_file.into(),
            industries: OnceLock::new(),
        }
    }

    /// Industry names, title-cased, in file order.
    pub fn list_industries(&self) -> Result<Arc<Vec<String>>> {
        if let Some(cached) = self.industries.get() {
            return Ok(Arc::clone(cached));
        }

        let industries: Vec<String> = read_lines(&self.industry_file)?
            .iter()
            .map(|line| title_case(line))
            .collect();
        debug!("Loaded {} industries from {}", industries.len(), self.industry_file.display());

        // A concurrent first call may have won the race; keep whichever landed.
        let _ = self.industries.set(Arc::new(industries));
        self.industries
            .get()
            .cloned()
            .ok_or_else(|| LookupError::Resource("industry cache was not populated".to_string()))
    }

    /// Company size buckets, verbatim, in file order.
    pub fn list_sizes(&self) -> Result<Vec<String>> {
        let sizes = read_lines(&self.size_file)?;
        debug!("Loaded {} size buckets from {}", sizes.len(), self.size_file.display());
        Ok(sizes)
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| LookupError::Resource(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Upper-case the first letter of every run of letters, lower-case the rest.
///
/// Any non-letter starts a new word, so `joe's diner` becomes `Joe'S Diner`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                push_titlecase(&mut out, c);
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Title-case form of a word's first letter. Differs from upper case for
/// letters whose capital is several letters (`ß` -> `Ss`) and for the Latin
/// digraphs (`ǆ` -> `ǅ`).
fn push_titlecase(out: &mut String, c: char) {
    let digraph = match c {
        '\u{01C4}'..='\u{01C6}' => Some('\u{01C5}'),
        '\u{01C7}'..='\u{01C9}' => Some('\u{01C8}'),
        '\u{01CA}'..='\u{01CC}' => Some('\u{01CB}'),
        '\u{01F1}'..='\u{01F3}' => Some('\u{01F2}'),
        _ => None,
    };
    if let Some(title) = digraph {
        out.push(title);
        return;
    }

    let mut upper = c.to_uppercase();
    if let Some(first) = upper.next() {
        out.push(first);
    }
    for rest in upper {
        out.extend(rest.to_lowercase());
    }
}
