//! Whitespace cleanup and sentence re-segmentation for extracted page text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Error;

const PORTUGUESE_ABBREVIATIONS: &[&str] = &[
    "sr", "sra", "srta", "dr", "dra", "prof", "profa", "art", "arts", "pág", "págs", "cap",
    "fig", "vol", "av", "ex", "obs", "ltda", "cia", "núm", "nº", "dept", "eng",
];

const ENGLISH_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "st", "vs", "fig", "no", "vol", "e.g", "i.e", "approx",
    "dept", "inc", "ltd", "jr", "sr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Portuguese,
    English,
}

impl Language {
    fn abbreviations(self) -> &'static [&'static str] {
        match self {
            Language::Portuguese => PORTUGUESE_ABBREVIATIONS,
            Language::English => ENGLISH_ABBREVIATIONS,
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portuguese" | "pt" | "pt-br" => Ok(Language::Portuguese),
            "english" | "en" => Ok(Language::English),
            other => Err(Error::InvalidConfig(format!(
                "unsupported language '{other}' (expected portuguese or english)"
            ))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Portuguese => f.write_str("portuguese"),
            Language::English => f.write_str("english"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextNormalizer {
    language: Language,
}

impl TextNormalizer {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Single-line form of `text`: newlines become spaces, whitespace runs
    /// collapse, and sentences are rejoined with one space.
    pub fn normalize(&self, text: &str) -> String {
        let collapsed = text.replace('\n', " ").split_whitespace().collect::<Vec<_>>().join(" ");
        self.sentences(&collapsed).join(" ")
    }

    /// Sentence split on Unicode boundaries, re-merging breaks that follow a
    /// known abbreviation or a single-letter initial.
    pub fn sentences(&self, text: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for piece in text.unicode_sentences() {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            match out.last_mut() {
                Some(prev) if self.ends_with_abbreviation(prev) => {
                    prev.push(' ');
                    prev.push_str(piece);
                }
                _ => out.push(piece.to_string()),
            }
        }
        out
    }

    fn ends_with_abbreviation(&self, sentence: &str) -> bool {
        let last = sentence.rsplit(' ').next().unwrap_or(sentence);
        let Some(word) = last.strip_suffix('.') else { return false };
        let word = word.to_lowercase();
        if word.chars().count() == 1 && word.chars().all(char::is_alphabetic) {
            return true;
        }
        self.language.abbreviations().contains(&word.as_str())
    }
}
