//! Fleetreport - render and export markdown operations reports.
//!
//! # Usage
//!
//! ```bash
//! fleetreport render weekly.md -o weekly.html
//! fleetreport export weekly.md --out-dir reports
//! fleetreport export weekly.md --watch
//! fleetreport draft --metrics metrics.json --period weekly --export
//! fleetreport credential set sk-or-...
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use fleetreport::config::{
    ConfigFlags, ThemeMode, clear_config_flags, credentials_path, global_config_path,
    load_config_flags, local_override_path, parse_flag_tokens, save_config_flags,
};
use fleetreport::export::{ExportInput, Exporter, simple_html};
use fleetreport::image::ImageLoader;
use fleetreport::perf;
use fleetreport::render::{InteractiveView, Profile, RenderOptions, render_markdown, to_html};
use fleetreport::report::{
    API_KEY, FileStore, KeyValueStore, OpenRouterClient, ReportConfig, ReportGenerator,
    ReportPeriod, ReportRequest,
};
use fleetreport::watcher::FileWatcher;

/// How long interactive output waits for the highlighter before giving up.
const HIGHLIGHT_WAIT: Duration = Duration::from_secs(5);
const WATCH_DEBOUNCE: Duration = Duration::from_millis(250);
const WATCH_POLL: Duration = Duration::from_millis(100);

/// Render markdown operations reports to HTML and paginated PDF
#[derive(Parser, Debug)]
#[command(name = "fleetreport", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Background the code panels are themed for (light or dark)
    #[arg(long, value_enum, global = true)]
    theme: Option<ThemeMode>,

    /// Title for the print header
    #[arg(long, global = true)]
    title: Option<String>,

    /// Enable performance logging
    #[arg(long, global = true)]
    perf: bool,

    /// Write detailed render/export debug events to a file
    #[arg(long, value_name = "PATH", global = true)]
    render_debug_log: Option<PathBuf>,

    /// Model used by `draft`
    #[arg(long, global = true)]
    model: Option<String>,

    /// Save current command-line flags as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a report to HTML
    Render {
        /// Markdown file to render
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, value_enum)]
        profile: Option<Profile>,

        /// Use the minimal renderer
        #[arg(long)]
        simple: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Export a report to PDF
    Export {
        /// Markdown file to export
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file name without extension (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,

        /// Destination directory (defaults to the file's directory)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        #[arg(long, value_enum)]
        profile: Option<Profile>,

        /// Re-export whenever the file changes
        #[arg(short, long)]
        watch: bool,

        /// Draw placeholders instead of images
        #[arg(long)]
        no_images: bool,
    },

    /// Draft a report from metrics with the configured model
    Draft {
        /// Metrics as a JSON file path or inline JSON
        #[arg(long, value_name = "JSON")]
        metrics: String,

        #[arg(long, value_enum)]
        period: ReportPeriod,

        /// Extra instructions for the model
        #[arg(long)]
        instructions: Option<String>,

        /// Write the markdown here (stdout if omitted)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Also export the draft to PDF
        #[arg(long)]
        export: bool,

        /// Destination directory for --export
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Manage the stored API key
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },
}

#[derive(Subcommand, Debug)]
enum CredentialAction {
    /// Store the API key
    Set { key: String },
    /// Remove the stored API key
    Clear,
    /// Show whether a key is stored
    Show,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("FLEETREPORT_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize render debug log {}: {}",
            render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    let mut options = RenderOptions {
        code_theme: effective.theme.unwrap_or(ThemeMode::Auto).background(),
        ..RenderOptions::default()
    };
    if let Some(title) = cli.title {
        options.title = title;
    }

    let Some(command) = cli.command else {
        if cli.save || cli.clear {
            return Ok(());
        }
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Render {
            file,
            profile,
            simple,
            output,
        } => {
            let profile = profile.or(effective.profile).unwrap_or(Profile::Interactive);
            run_render(&file, profile, simple, output.as_deref(), &options)
        }
        Command::Export {
            file,
            name,
            out_dir,
            profile,
            watch,
            no_images,
        } => {
            let target = ExportTarget::new(
                &file,
                name,
                out_dir.or_else(|| effective.out_dir.clone()),
            );
            let profile = profile.or(effective.profile).unwrap_or(Profile::Print);
            let exporter = Exporter::new()
                .with_images(
                    ImageLoader::new(target.source_dir.clone())
                        .with_enabled(!(no_images || effective.no_images)),
                )
                .with_options(options.clone());
            if watch || effective.watch {
                watch_and_export(&file, &target, &exporter, profile, &options)
            } else {
                export_file(&file, &target, &exporter, profile, &options).map(|_| ())
            }
        }
        Command::Draft {
            metrics,
            period,
            instructions,
            output,
            export,
            out_dir,
        } => run_draft(
            &DraftArgs {
                metrics,
                period,
                instructions,
                output,
                export,
                out_dir: out_dir.or_else(|| effective.out_dir.clone()),
            },
            effective.model.as_deref(),
            &options,
        ),
        Command::Credential { action } => run_credential(&action),
    }
}

fn run_render(
    file: &Path,
    profile: Profile,
    simple: bool,
    output: Option<&Path>,
    options: &RenderOptions,
) -> Result<()> {
    let source = read_source(file)?;
    let html = if simple {
        simple_html(&source)
    } else {
        match profile {
            Profile::Interactive => {
                let mut view = InteractiveView::open(&source, options);
                view.settle(HIGHLIGHT_WAIT);
                to_html(view.document())
            }
            Profile::Print => to_html(&render_markdown(&source, Profile::Print, options)),
        }
    };
    write_output(output, &html)
}

/// Where an export lands.
#[derive(Debug)]
struct ExportTarget {
    source_dir: PathBuf,
    out_dir: PathBuf,
    name: String,
}

impl ExportTarget {
    fn new(file: &Path, name: Option<String>, out_dir: Option<PathBuf>) -> Self {
        let source_dir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = name.unwrap_or_else(|| {
            file.file_stem()
                .map_or_else(|| "report".to_string(), |s| s.to_string_lossy().into_owned())
        });
        Self {
            out_dir: out_dir.unwrap_or_else(|| source_dir.clone()),
            source_dir,
            name,
        }
    }

    fn pdf_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.pdf", self.name))
    }
}

fn export_file(
    file: &Path,
    target: &ExportTarget,
    exporter: &Exporter,
    profile: Profile,
    options: &RenderOptions,
) -> Result<PathBuf> {
    let source = read_source(file)?;
    export_source(&source, target, exporter, profile, options)
}

fn export_source(
    source: &str,
    target: &ExportTarget,
    exporter: &Exporter,
    profile: Profile,
    options: &RenderOptions,
) -> Result<PathBuf> {
    std::fs::create_dir_all(&target.out_dir)
        .with_context(|| format!("Failed to create {}", target.out_dir.display()))?;
    let path = match profile {
        Profile::Print => {
            exporter.export(ExportInput::Markdown(source), &target.out_dir, &target.name)
        }
        Profile::Interactive => {
            let mut view = InteractiveView::open(source, options);
            view.settle(HIGHLIGHT_WAIT);
            exporter.export(
                ExportInput::Document(view.document()),
                &target.out_dir,
                &target.name,
            )
        }
    }
    .with_context(|| format!("Failed to export {}", target.pdf_path().display()))?;
    println!("{}", path.display());
    Ok(path)
}

fn watch_and_export(
    file: &Path,
    target: &ExportTarget,
    exporter: &Exporter,
    profile: Profile,
    options: &RenderOptions,
) -> Result<()> {
    let mut watcher = FileWatcher::new(file, WATCH_DEBOUNCE)
        .with_context(|| format!("Failed to watch {}", file.display()))?
        .ignoring(target.pdf_path());

    if let Err(err) = export_file(file, target, exporter, profile, options) {
        eprintln!("[warn] {err:#}");
    }
    watcher.discard_pending();
    eprintln!("Watching {} (Ctrl-C to stop)", watcher.target_path().display());

    loop {
        if watcher.take_change_ready() {
            if let Err(err) = export_file(file, target, exporter, profile, options) {
                eprintln!("[warn] {err:#}");
            }
            watcher.discard_pending();
        }
        thread::sleep(WATCH_POLL);
    }
}

#[derive(Debug)]
struct DraftArgs {
    metrics: String,
    period: ReportPeriod,
    instructions: Option<String>,
    output: Option<PathBuf>,
    export: bool,
    out_dir: Option<PathBuf>,
}

fn run_draft(args: &DraftArgs, model: Option<&str>, options: &RenderOptions) -> Result<()> {
    let metrics_text = if Path::new(&args.metrics).is_file() {
        std::fs::read_to_string(&args.metrics)
            .with_context(|| format!("Failed to read metrics {}", args.metrics))?
    } else {
        args.metrics.clone()
    };
    let metrics: serde_json::Value =
        serde_json::from_str(&metrics_text).context("Metrics are not valid JSON")?;

    let mut request = ReportRequest::new(args.period, metrics);
    if let Some(instructions) = &args.instructions {
        request = request.with_instructions(instructions.as_str());
    }

    let store = FileStore::new(credentials_path());
    let mut config = ReportConfig::from_store(&store).context("Failed to read credentials")?;
    if let Some(model) = model {
        config = config.with_model(model);
    }
    let markdown = OpenRouterClient::new(config)
        .generate(&request)
        .context("Failed to draft report")?;

    if let Some(output) = &args.output {
        write_output(Some(output.as_path()), &markdown)?;
    } else if !args.export {
        write_output(None, &markdown)?;
    }

    if args.export {
        let stem = args.output.as_deref().and_then(Path::file_stem).map_or_else(
            || format!("{}-report", args.period.label()),
            |s| s.to_string_lossy().into_owned(),
        );
        let source_dir = args
            .output
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let target = ExportTarget {
            out_dir: args.out_dir.clone().unwrap_or_else(|| source_dir.clone()),
            source_dir,
            name: stem,
        };
        let exporter = Exporter::new()
            .with_images(ImageLoader::new(target.source_dir.clone()))
            .with_options(options.clone());
        export_source(&markdown, &target, &exporter, Profile::Print, options)?;
    }
    Ok(())
}

fn run_credential(action: &CredentialAction) -> Result<()> {
    let store = FileStore::new(credentials_path());
    match action {
        CredentialAction::Set { key } => {
            store
                .set(API_KEY, key.trim())
                .context("Failed to store API key")?;
            println!("API key saved to {}", store.path().display());
        }
        CredentialAction::Clear => {
            store.remove(API_KEY).context("Failed to remove API key")?;
            println!("API key removed");
        }
        CredentialAction::Show => match store.get(API_KEY).context("Failed to read credentials")? {
            Some(key) => println!("{}", mask_key(&key)),
            None => println!("(not set)"),
        },
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn read_source(file: &Path) -> Result<String> {
    // Verify file exists
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}
