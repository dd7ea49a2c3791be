use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::path::Path;

use crate::error::{AppError, Result};

static CORPUS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/corpus");

/// Supplies the target paragraph for a new session
pub trait TextProvider {
    fn choose_text(&self) -> String;
}

/// A named, non-empty set of sample paragraphs
#[derive(Deserialize, Clone, Debug)]
pub struct Corpus {
    pub name: String,
    pub texts: Vec<String>,
}

impl Corpus {
    /// Load one of the corpora bundled into the binary
    pub fn builtin(name: &str) -> Result<Self> {
        let file = CORPUS_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| AppError::Corpus(format!("unknown corpus '{name}'")))?;

        let contents = file
            .contents_utf8()
            .ok_or_else(|| AppError::Corpus(format!("corpus '{name}' is not utf-8")))?;

        Self::parse(contents)
    }

    pub fn english() -> Result<Self> {
        Self::builtin("english")
    }

    /// Load a user corpus file in the same JSON shape as the bundled ones
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self> {
        let mut corpus: Corpus = serde_json::from_str(contents)
            .map_err(|e| AppError::Corpus(format!("invalid corpus: {e}")))?;

        corpus.texts.retain(|t| !t.trim().is_empty());
        if corpus.texts.is_empty() {
            return Err(AppError::Corpus(format!(
                "corpus '{}' has no texts",
                corpus.name
            )));
        }

        Ok(corpus)
    }
}

/// Uniform random choice from a corpus
#[derive(Debug, Clone)]
pub struct CorpusProvider {
    corpus: Corpus,
}

impl CorpusProvider {
    pub fn new(corpus: Corpus) -> Self {
        Self { corpus }
    }
}

impl TextProvider for CorpusProvider {
    fn choose_text(&self) -> String {
        // texts is never empty once parsed
        self.corpus
            .texts
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default()
    }
}

/// Always returns the same user-supplied prompt
#[derive(Debug, Clone)]
pub struct FixedText(String);

impl FixedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl TextProvider for FixedText {
    fn choose_text(&self) -> String {
        self.0.clone()
    }
}
