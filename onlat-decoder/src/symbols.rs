//! Word symbol tables (`words.txt`).

use crate::error::{GraphError, Result};
use crate::fst::Label;
use std::collections::HashMap;
use std::path::Path;

/// Map from output labels to words.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    words: HashMap<Label, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: Label, word: impl Into<String>) {
        self.words.insert(label, word.into());
    }

    pub fn word(&self, label: Label) -> Option<&str> {
        self.words.get(&label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words for `labels`, falling back to the number for unknown labels.
    pub fn render(&self, labels: &[Label]) -> String {
        labels
            .iter()
            .map(|&l| match self.word(l) {
                Some(w) => w.to_string(),
                None => l.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse `word label` lines.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut table = Self::new();

        for (i, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [] => continue,
                [word, label] => {
                    let label = label
                        .parse::<Label>()
                        .map_err(|e| GraphError::parse(i + 1, format!("bad label: {e}")))?;
                    table.insert(label, *word);
                }
                _ => return Err(GraphError::parse(i + 1, "expected `word label`").into()),
            }
        }

        Ok(table)
    }

    pub fn read_text(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_words_txt() {
        let table = SymbolTable::from_text("<eps> 0\nhello 1\nworld 2\n").unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.word(1), Some("hello"));
        assert_eq!(table.word(2), Some("world"));
    }

    #[test]
    fn renders_unknown_labels_as_numbers() {
        let table = SymbolTable::from_text("hello 1\n").unwrap();
        assert_eq!(table.render(&[1, 7]), "hello 7");
    }

    #[test]
    fn rejects_extra_fields() {
        assert!(SymbolTable::from_text("a b 1\n").is_err());
    }
}
