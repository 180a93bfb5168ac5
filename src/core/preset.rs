use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::error::ExportError;

pub const OUTPUT_PLACEHOLDER: &str = "[output]";

/// Kind of media a template input slot accepts. Presets ask for their
/// files in this order, one per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Video,
    Audio,
    Media,
    Subtitle,
}

impl SlotKind {
    const ALL: [SlotKind; 4] = [
        SlotKind::Video,
        SlotKind::Audio,
        SlotKind::Media,
        SlotKind::Subtitle,
    ];

    pub fn placeholder(&self) -> &'static str {
        match self {
            SlotKind::Video => "[video]",
            SlotKind::Audio => "[audio]",
            SlotKind::Media => "[media]",
            SlotKind::Subtitle => "[subtitle]",
        }
    }
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.placeholder().trim_matches(&['[', ']'][..]))
    }
}

/// One stored command template: engine tokens with placeholder slots
/// for input files and the output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetTemplate {
    pub tokens: Vec<String>,
}

impl PresetTemplate {
    pub fn parse(line: &str) -> Result<Self, ExportError> {
        let tokens = shell_words::split(line).map_err(|err| ExportError::InvalidTemplate {
            message: err.to_string(),
        })?;
        if tokens.is_empty() {
            return Err(ExportError::InvalidTemplate {
                message: "empty template".to_string(),
            });
        }
        Ok(PresetTemplate { tokens })
    }

    /// Input slots in the order files must be supplied: by kind
    /// (video, audio, media, subtitle), then token order within a
    /// kind. One slot per token holding that placeholder.
    pub fn slots(&self) -> Vec<SlotKind> {
        let mut slots = Vec::new();
        for kind in SlotKind::ALL {
            for token in &self.tokens {
                if token.contains(kind.placeholder()) {
                    slots.push(kind);
                }
            }
        }
        slots
    }

    /// Fill the template with one file per input slot and the output
    /// path, yielding tokens ready for the runner. Each file replaces
    /// the placeholder in the first token still carrying it;
    /// `[output]` is replaced wherever it appears.
    pub fn substitute(&self, files: &[String], output: &str) -> Result<Vec<String>, ExportError> {
        let slots = self.slots();
        if files.len() != slots.len() {
            return Err(ExportError::InvalidTemplate {
                message: format!(
                    "template takes {} input file(s), {} supplied",
                    slots.len(),
                    files.len()
                ),
            });
        }

        let mut tokens = self.tokens.clone();
        for (kind, file) in slots.iter().zip(files) {
            let token = tokens
                .iter_mut()
                .find(|token| token.contains(kind.placeholder()))
                .expect("slot listed but placeholder missing");
            *token = token.replacen(kind.placeholder(), file, 1);
        }

        for token in &mut tokens {
            if token.contains(OUTPUT_PLACEHOLDER) {
                *token = token.replace(OUTPUT_PLACEHOLDER, output);
            }
        }

        Ok(tokens)
    }
}

/// Read an ordered template list from a preset file: one command per
/// line, `#` comments, trailing backslash continues onto the next
/// line.
pub fn load_presets(path: &Path) -> Result<Vec<PresetTemplate>, ExportError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut templates = Vec::new();
    let mut current = String::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() && current.is_empty() {
            continue;
        }

        if trimmed.starts_with('#') {
            continue;
        }

        if let Some(stripped) = trimmed.strip_suffix('\\') {
            current.push_str(stripped.trim());
            current.push(' ');
        } else {
            current.push_str(trimmed);
            if !current.is_empty() {
                templates.push(PresetTemplate::parse(&current)?);
                current.clear();
            }
        }
    }

    if !current.is_empty() {
        templates.push(PresetTemplate::parse(&current)?);
    }

    Ok(templates)
}
