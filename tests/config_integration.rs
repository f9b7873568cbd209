use std::path::PathBuf;

use fleetreport::config::{ConfigFlags, ThemeMode, load_config_flags, parse_flag_tokens};
use fleetreport::render::Profile;

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".fleetreportrc");
    let content = r"
# comment
--watch

--theme light

--profile print
--render-debug-log=render.log
";
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.watch);
    assert_eq!(flags.theme, Some(ThemeMode::Light));
    assert_eq!(flags.profile, Some(Profile::Print));
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".fleetreportrc");
    let content = "--watch\n--theme light\n--out-dir reports\n--render-debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args: Vec<String> = ["fleetreport", "export", "--theme", "dark", "--no-images"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.watch, "file flags should remain enabled");
    assert!(effective.no_images, "cli flags should be applied");
    assert_eq!(effective.theme, Some(ThemeMode::Dark), "cli should override theme");
    assert_eq!(effective.out_dir, Some(PathBuf::from("reports")));
    assert_eq!(
        effective.render_debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_missing_config_file_is_default() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_config_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, ConfigFlags::default());
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args: Vec<String> = ["fleetreport", "--theme=dark", "--model=meta-llama/llama-3.1-70b-instruct"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.theme, Some(ThemeMode::Dark));
    assert_eq!(flags.model.as_deref(), Some("meta-llama/llama-3.1-70b-instruct"));
}
