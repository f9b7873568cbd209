//! Syntax highlighting for interactive code blocks.
//!
//! Uses syntect for highlighting with Sublime Text syntax definitions.
//! Loading the syntax set takes long enough that it runs on a background
//! thread (see [`HighlightLoader`]); documents render plain code first and
//! upgrade once the highlighter is ready.

mod loader;

pub use loader::{Capability, HighlightLoader};

use std::sync::{Arc, OnceLock};

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::render::{InlineColor, InlineStyle, StyledSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightBackground {
    Light,
    Dark,
}

/// A loaded syntax set and theme.
#[derive(Debug)]
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
    background: HighlightBackground,
}

impl Highlighter {
    /// Load syntaxes and pick a theme suited to `background`.
    pub fn load(background: HighlightBackground) -> Self {
        let _scope = crate::perf::scope("highlight.load");
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme = pick_theme(&ThemeSet::load_defaults(), background);
        Self {
            syntax_set,
            theme,
            background,
        }
    }

    /// Process-wide highlighter for `background`, loaded on first use.
    pub fn shared(background: HighlightBackground) -> Arc<Self> {
        static DARK: OnceLock<Arc<Highlighter>> = OnceLock::new();
        static LIGHT: OnceLock<Arc<Highlighter>> = OnceLock::new();
        let cell = match background {
            HighlightBackground::Dark => &DARK,
            HighlightBackground::Light => &LIGHT,
        };
        Arc::clone(cell.get_or_init(|| Arc::new(Self::load(background))))
    }

    pub const fn background(&self) -> HighlightBackground {
        self.background
    }

    /// Highlight `code` as `language`.
    ///
    /// Returns `None` when no language is given or it is not recognized; the
    /// caller keeps its plain rendering.
    pub fn highlight_code(
        &self,
        language: Option<&str>,
        code: &str,
    ) -> Option<Vec<Vec<StyledSpan>>> {
        let language = language?;
        let syntax = self
            .syntax_set
            .find_syntax_by_token(language)
            .or_else(|| self.syntax_set.find_syntax_by_name(language))?;

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(code) {
            let ranges = highlighter
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_default();
            let mut spans = Vec::new();
            for (style, text) in ranges {
                let text = text.trim_end_matches(['\n', '\r']);
                if text.is_empty() {
                    continue;
                }
                let fg = InlineColor::rgb(style.foreground.r, style.foreground.g, style.foreground.b);
                let inline_style = InlineStyle {
                    code: true,
                    fg: Some(adjust_fg_for_background(fg, self.background)),
                    ..InlineStyle::default()
                };
                spans.push(StyledSpan::new(text.to_string(), inline_style));
            }
            lines.push(spans);
        }
        Some(lines)
    }
}

fn pick_theme(theme_set: &ThemeSet, background: HighlightBackground) -> Theme {
    let preferred = match background {
        HighlightBackground::Dark => [
            "base16-ocean.dark",
            "Solarized (dark)",
            "base16-eighties.dark",
            "base16-mocha.dark",
        ]
        .as_slice(),
        HighlightBackground::Light => {
            ["InspiredGitHub", "Solarized (light)", "base16-ocean.light"].as_slice()
        }
    };

    for name in preferred {
        if let Some(theme) = theme_set.themes.get(*name) {
            return theme.clone();
        }
    }

    theme_set
        .themes
        .values()
        .next()
        .cloned()
        .unwrap_or_default()
}

/// Background guess from the `COLORFGBG` convention (`fg;bg`).
pub fn detect_background() -> HighlightBackground {
    background_from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
}

fn background_from_colorfgbg(colorfgbg: Option<&str>) -> HighlightBackground {
    let Some(value) = colorfgbg else {
        return HighlightBackground::Light;
    };
    let bg_str = value.rsplit(';').next().unwrap_or(value);
    let Ok(bg) = bg_str.parse::<u8>() else {
        return HighlightBackground::Light;
    };

    if bg >= 7 {
        HighlightBackground::Light
    } else {
        HighlightBackground::Dark
    }
}

fn adjust_fg_for_background(color: InlineColor, background: HighlightBackground) -> InlineColor {
    match background {
        HighlightBackground::Dark => color,
        HighlightBackground::Light => {
            let luma = (0.2126 * f32::from(color.r))
                + (0.7152 * f32::from(color.g))
                + (0.0722 * f32::from(color.b));
            if luma < 155.0 {
                return color;
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let scale = |c: u8| (f32::from(c) * 0.42).round() as u8;
            InlineColor::rgb(scale(color.r), scale(color.g), scale(color.b))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust_produces_colored_spans() {
        let highlighter = Highlighter::shared(HighlightBackground::Dark);
        let code = "fn main() {\n    let x = 1;\n}\n";
        let lines = highlighter.highlight_code(Some("rust"), code).unwrap();

        assert_eq!(lines.len(), 3);
        let has_color = lines
            .iter()
            .flatten()
            .any(|span| span.style().fg.is_some());
        assert!(has_color, "Expected at least one colored span for Rust");
        assert!(lines.iter().flatten().all(|span| !span.text().contains('\n')));
    }

    #[test]
    fn test_highlight_unknown_language_returns_none() {
        let highlighter = Highlighter::shared(HighlightBackground::Dark);
        assert!(highlighter.highlight_code(Some("nope"), "just text").is_none());
        assert!(highlighter.highlight_code(None, "just text").is_none());
    }

    #[test]
    fn test_language_found_by_token_or_name() {
        let highlighter = Highlighter::shared(HighlightBackground::Light);
        assert!(highlighter.highlight_code(Some("js"), "let a = 1;").is_some());
        assert!(highlighter.highlight_code(Some("Rust"), "fn main() {}").is_some());
        assert!(highlighter.highlight_code(Some("klingon"), "x").is_none());
    }

    #[test]
    fn test_colorfgbg_dark_background() {
        assert_eq!(
            background_from_colorfgbg(Some("15;0")),
            HighlightBackground::Dark
        );
    }

    #[test]
    fn test_colorfgbg_light_background() {
        assert_eq!(
            background_from_colorfgbg(Some("0;15")),
            HighlightBackground::Light
        );
    }

    #[test]
    fn test_light_mode_caps_luma_for_readability() {
        let bright = InlineColor::rgb(240, 230, 120);
        let adjusted = adjust_fg_for_background(bright, HighlightBackground::Light);
        let luma = (0.2126 * f32::from(adjusted.r))
            + (0.7152 * f32::from(adjusted.g))
            + (0.0722 * f32::from(adjusted.b));
        assert!(luma < 120.0, "Adjusted color still too bright: {luma}");
    }
}
