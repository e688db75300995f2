//! WGSL highlighting for the playground editor
//!
//! Playground directives (`//! playground_...`) and the print helpers are
//! highlighted apart from ordinary comments and calls.

use std::ops::Range;

use eframe::egui::text::{LayoutJob, TextFormat};
use eframe::egui::{Color32, FontId};

use crate::utils::playground_constants::DIRECTIVE_PREFIX;

const KEYWORDS: [&str; 20] = [
    "fn", "let", "var", "const", "override", "struct", "return", "if", "else", "switch", "case",
    "default", "loop", "break", "continue", "while", "for", "discard", "enable", "alias",
];

const TYPES: [&str; 16] = [
    "bool", "i32", "u32", "f32", "f16", "vec2", "vec3", "vec4", "mat2x2", "mat3x3", "mat4x4",
    "array", "atomic", "texture_2d", "texture_storage_2d", "sampler",
];

const SPECIAL: [&str; 12] = [
    "uniform", "storage", "private", "workgroup", "read", "write", "read_write",
    "getStringHash", "print_begin", "print_end", "imageMain", "printMain",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Plain,
    Keyword,
    Type,
    Special,
    Attribute,
    Number,
    Str,
    Comment,
    Directive,
}

impl TokenKind {
    #[cfg_attr(feature = "code_editor", allow(dead_code))]
    fn color(self) -> Color32 {
        match self {
            TokenKind::Plain => Color32::from_gray(225),
            TokenKind::Keyword => Color32::from_rgb(220, 140, 60),
            TokenKind::Type => Color32::from_rgb(170, 120, 230),
            TokenKind::Special => Color32::from_rgb(120, 180, 255),
            TokenKind::Attribute => Color32::from_rgb(110, 200, 230),
            TokenKind::Number => Color32::from_rgb(230, 170, 90),
            TokenKind::Str => Color32::from_rgb(200, 140, 200),
            TokenKind::Comment => Color32::from_rgb(90, 150, 110),
            TokenKind::Directive => Color32::from_rgb(250, 210, 90),
        }
    }
}

#[cfg_attr(feature = "code_editor", allow(dead_code))]
fn word_kind(word: &str) -> TokenKind {
    if word.starts_with('@') {
        TokenKind::Attribute
    } else if KEYWORDS.contains(&word) {
        TokenKind::Keyword
    } else if TYPES.iter().any(|t| word.starts_with(t)) {
        TokenKind::Type
    } else if SPECIAL.contains(&word) || word.starts_with("print_") {
        TokenKind::Special
    } else {
        TokenKind::Plain
    }
}

/// Split `src` into highlighted byte ranges covering the whole input.
#[cfg_attr(feature = "code_editor", allow(dead_code))]
pub fn tokenize(src: &str) -> Vec<(Range<usize>, TokenKind)> {
    let bytes = src.as_bytes();
    let mut tokens: Vec<(Range<usize>, TokenKind)> = Vec::new();
    let mut push = |range: Range<usize>, kind: TokenKind| match tokens.last_mut() {
        Some((last, last_kind)) if *last_kind == kind && last.end == range.start => last.end = range.end,
        _ => tokens.push((range, kind)),
    };

    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let c = bytes[i];
        let rest = &src[i..];

        if rest.starts_with("//") {
            let end = rest.find('\n').map_or(bytes.len(), |n| i + n);
            let kind = if rest.starts_with("//!") && rest[3..].trim_start().starts_with(DIRECTIVE_PREFIX) {
                TokenKind::Directive
            } else {
                TokenKind::Comment
            };
            push(start..end, kind);
            i = end;
        } else if rest.starts_with("/*") {
            let end = rest[2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
            push(start..end, TokenKind::Comment);
            i = end;
        } else if c == b'"' {
            i += 1;
            while i < bytes.len() && bytes[i] != b'"' {
                i += if bytes[i] == b'\\' { 2 } else { 1 };
            }
            i = (i + 1).min(bytes.len());
            push(start..i, TokenKind::Str);
        } else if c.is_ascii_alphabetic() || c == b'_' || c == b'@' {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            push(start..i, word_kind(&src[start..i]));
        } else if c.is_ascii_digit() {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                i += 1;
            }
            push(start..i, TokenKind::Number);
        } else {
            // one whole char, so ranges stay on UTF-8 boundaries
            i += rest.chars().next().map_or(1, char::len_utf8);
            push(start..i, TokenKind::Plain);
        }
    }
    tokens
}

/// Layout job for a plain `TextEdit` layouter.
#[cfg_attr(feature = "code_editor", allow(dead_code))]
pub fn layout_job(src: &str, font_size: f32) -> LayoutJob {
    let mut job = LayoutJob::default();
    let font_id = FontId::monospace(font_size);
    for (range, kind) in tokenize(src) {
        job.append(
            &src[range],
            0.0,
            TextFormat {
                font_id: font_id.clone(),
                color: kind.color(),
                italics: kind == TokenKind::Comment,
                ..Default::default()
            },
        );
    }
    job
}

#[cfg(feature = "code_editor")]
pub fn wgsl() -> egui_code_editor::Syntax {
    egui_code_editor::Syntax::new("wgsl")
        .with_comment("//")
        .with_comment_multiline(["/*", "*/"])
        .with_keywords(KEYWORDS)
        .with_types(TYPES)
        .with_special(SPECIAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(&str, TokenKind)> {
        tokenize(src)
            .into_iter()
            .filter(|(_, kind)| *kind != TokenKind::Plain)
            .map(|(range, kind)| (&src[range], kind))
            .collect()
    }

    #[test]
    fn test_directive_comment_is_distinct() {
        let src = "//! playground_RAND(16)\n// note\n";
        let k = kinds(src);
        assert_eq!(k[0], ("//! playground_RAND(16)", TokenKind::Directive));
        assert_eq!(k[1], ("// note", TokenKind::Comment));
    }

    #[test]
    fn test_declaration_tokens() {
        let src = "@compute fn imageMain() { let x: f32 = 1.5; print_f32(x); }";
        let k = kinds(src);
        assert!(k.contains(&("@compute", TokenKind::Attribute)));
        assert!(k.contains(&("fn", TokenKind::Keyword)));
        assert!(k.contains(&("imageMain", TokenKind::Special)));
        assert!(k.contains(&("f32", TokenKind::Type)));
        assert!(k.contains(&("1.5", TokenKind::Number)));
        assert!(k.contains(&("print_f32", TokenKind::Special)));
    }

    #[test]
    fn test_ranges_cover_input() {
        let src = "let s = getStringHash(\"a \\\"b\\\"\"); // é\n/* open";
        let tokens = tokenize(src);
        let joined: String = tokens.iter().map(|(r, _)| &src[r.clone()]).collect();
        assert_eq!(joined, src);
        assert!(tokens.iter().any(|(r, k)| *k == TokenKind::Str && &src[r.clone()] == "\"a \\\"b\\\"\""));
    }
}
