//! Caption text helpers

use crate::core::types::SelectedFile;
use crate::core::utils::normalize_display_name;

/// End-of-turn markers emitted by the supported vision-language models
const END_OF_TURN_MARKERS: &[&str] = &["<end_of_turn>", "<|im_end|>", "<|endoftext|>", "</s>", "<eos>"];

/// Strip model-specific end-of-turn markers and surrounding whitespace
pub fn clean_caption(raw: &str) -> String {
    let mut text = raw.to_string();
    for marker in END_OF_TURN_MARKERS {
        if text.contains(marker) {
            text = text.replace(marker, "");
        }
    }
    text.trim().to_string()
}

/// Name used for captions: the display name, or the last uri segment
pub fn display_label(file: &SelectedFile) -> String {
    file.filename()
}

/// Caption substituted when an image cannot be captioned
pub fn fallback_caption(file: &SelectedFile) -> String {
    format!("{}: {}", file.kind, normalize_display_name(&display_label(file)))
}

/// Caption for a document from its extracted text.
///
/// Text longer than `min_chars` is folded into the caption; shorter (or no)
/// text degrades to a name-only caption.
pub fn document_caption(file: &SelectedFile, text: &str, min_chars: usize) -> String {
    let name = normalize_display_name(&display_label(file));
    let text = text.trim();
    if text.chars().count() > min_chars {
        format!("{}: {}. Content: {}", file.kind, name, text)
    } else {
        format!("{} document: {}", file.kind, name)
    }
}
