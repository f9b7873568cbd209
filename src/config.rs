//! Saved default flags.
//!
//! Defaults live in an rc file of command line tokens: a global one in the
//! user's config directory and an optional `.fleetreportrc` in the working
//! directory. Flags given on the command line win over both.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::highlight::{HighlightBackground, detect_background};
use crate::render::Profile;

const APP_DIR: &str = "fleetreport";
const LOCAL_RC: &str = ".fleetreportrc";

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    /// Code panel background for this mode; `Auto` asks the terminal.
    pub fn background(self) -> HighlightBackground {
        match self {
            Self::Auto => detect_background(),
            Self::Light => HighlightBackground::Light,
            Self::Dark => HighlightBackground::Dark,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub no_images: bool,
    pub perf: bool,
    pub theme: Option<ThemeMode>,
    pub profile: Option<Profile>,
    pub model: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge with `other` taking precedence for valued options.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            no_images: self.no_images || other.no_images,
            perf: self.perf || other.perf,
            theme: other.theme.or(self.theme),
            profile: other.profile.or(self.profile),
            model: other.model.clone().or_else(|| self.model.clone()),
            out_dir: other.out_dir.clone().or_else(|| self.out_dir.clone()),
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }
}

/// Per-user directory for config and the credential store.
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join(APP_DIR);
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join(APP_DIR);
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join(APP_DIR);
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join(APP_DIR);
        }
    }

    PathBuf::from(".").join(APP_DIR)
}

pub fn global_config_path() -> PathBuf {
    config_dir().join("config")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(LOCAL_RC)
}

/// Where `credential set` stores the API key.
pub fn credentials_path() -> PathBuf {
    config_dir().join("credentials.json")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# fleetreport defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.no_images {
        lines.push("--no-images".to_string());
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    if let Some(profile) = flags.profile {
        lines.push(format!("--profile {}", profile_name(profile)));
    }
    if let Some(model) = &flags.model {
        lines.push(format!("--model {model}"));
    }
    if let Some(dir) = &flags.out_dir {
        lines.push(format!("--out-dir {}", dir.display()));
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the flags this module knows out of a token list; others are ignored.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        match name {
            "--watch" | "-w" => flags.watch = true,
            "--no-images" => flags.no_images = true,
            "--perf" => flags.perf = true,
            "--theme" => {
                flags.theme = take_value(tokens, &mut i, inline_value).and_then(parse_theme);
            }
            "--profile" => {
                flags.profile = take_value(tokens, &mut i, inline_value).and_then(parse_profile);
            }
            "--model" => {
                flags.model = take_value(tokens, &mut i, inline_value).map(ToOwned::to_owned);
            }
            "--out-dir" => {
                flags.out_dir = take_value(tokens, &mut i, inline_value).map(PathBuf::from);
            }
            "--render-debug-log" => {
                flags.render_debug_log =
                    take_value(tokens, &mut i, inline_value).map(PathBuf::from);
            }
            _ => {}
        }
        i += 1;
    }
    flags
}

/// The value of a flag: either its `=value` suffix or the next token.
fn take_value<'a>(tokens: &'a [String], i: &mut usize, inline: Option<&'a str>) -> Option<&'a str> {
    if inline.is_some() {
        return inline;
    }
    let next = tokens.get(*i + 1)?;
    *i += 1;
    Some(next.as_str())
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "auto" => Some(ThemeMode::Auto),
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}

fn parse_profile(s: &str) -> Option<Profile> {
    match s {
        "interactive" => Some(Profile::Interactive),
        "print" => Some(Profile::Print),
        _ => None,
    }
}

const fn profile_name(profile: Profile) -> &'static str {
    match profile {
        Profile::Interactive => "interactive",
        Profile::Print => "print",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let flags = parse_flag_tokens(&tokens(&[
            "fleetreport",
            "export",
            "--watch",
            "--no-images",
            "--theme",
            "dark",
            "--profile=print",
            "--render-debug-log=render.log",
            "report.md",
        ]));
        assert!(flags.watch);
        assert!(flags.no_images);
        assert_eq!(flags.theme, Some(ThemeMode::Dark));
        assert_eq!(flags.profile, Some(Profile::Print));
        assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
    }

    #[test]
    fn test_short_watch_flag() {
        let flags = parse_flag_tokens(&tokens(&["fleetreport", "export", "-w", "report.md"]));
        assert!(flags.watch);
        assert!(!parse_flag_tokens(&tokens(&["fleetreport", "export", "report.md"])).watch);
    }

    #[test]
    fn test_unknown_value_is_ignored() {
        let flags = parse_flag_tokens(&tokens(&["--theme", "sepia", "--perf"]));
        assert_eq!(flags.theme, None);
        assert!(flags.perf);
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            watch: true,
            theme: Some(ThemeMode::Light),
            model: Some("file-model".to_string()),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            perf: true,
            theme: Some(ThemeMode::Dark),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert!(merged.perf);
        assert_eq!(merged.theme, Some(ThemeMode::Dark));
        assert_eq!(merged.model.as_deref(), Some("file-model"));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".fleetreportrc");
        let flags = ConfigFlags {
            watch: true,
            no_images: true,
            perf: true,
            theme: Some(ThemeMode::Dark),
            profile: Some(Profile::Print),
            model: Some("openai/gpt-4o-mini".to_string()),
            out_dir: Some(PathBuf::from("reports")),
            render_debug_log: Some(PathBuf::from("render.log")),
        };

        save_config_flags(&path, &flags).unwrap();
        assert_eq!(load_config_flags(&path).unwrap(), flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_light_and_dark_modes_are_fixed() {
        assert_eq!(ThemeMode::Light.background(), HighlightBackground::Light);
        assert_eq!(ThemeMode::Dark.background(), HighlightBackground::Dark);
    }
}
