use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::unbounded;

use d4_assistant::capture::{CaptureRegion, ScreenSource, StillImage, XcapScreen};
use d4_assistant::cli::{theme_name, Cli, Command};
use d4_assistant::config::{
    app_dir, EnchantConfig, KurastConfig, OcrSettings, RestockConfig, ToolConfig,
};
use d4_assistant::error::{AppResult, WorkerError};
use d4_assistant::hotkey::{spawn_stop_listener, STOP_KEY};
use d4_assistant::input::RdevClicker;
use d4_assistant::launcher::{launch_tool, ToolKind};
use d4_assistant::logging;
use d4_assistant::matcher::PhraseSet;
use d4_assistant::ocr::OcrManager;
use d4_assistant::picker::{self, PickShape};
use d4_assistant::template::{ScreenTemplateFinder, TemplateFinder};
use d4_assistant::theme::{load_theme, save_theme, theme_path};
use d4_assistant::tools::{EnchantTool, KurastTool, RestockTool, TextScanner};
use d4_assistant::worker::{Tool, ToolRunner, WorkerEvent, WorkerOutcome};

fn main() {
    let cli = Cli::parse();

    let log_name = cli.command.as_ref().map_or("d4-assistant", Command::log_name);
    logging::init(log_name);
    logging::log_runtime_environment();

    if let Err(e) = dispatch(cli.command) {
        tracing::error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn dispatch(command: Option<Command>) -> AppResult<()> {
    let Some(command) = command else {
        return run_menu();
    };

    match command {
        Command::Launch { tool } => {
            launch_tool(tool)?;
            println!("Launched {} successfully!", tool);
            Ok(())
        }
        Command::Run { tool } => run_tool(tool),
        Command::Config { tool } => match tool {
            ToolKind::Restock => show_config::<RestockConfig>(tool),
            ToolKind::Enchant => show_config::<EnchantConfig>(tool),
            ToolKind::Kurast => show_config::<KurastConfig>(tool),
        },
        Command::Theme { name } => match theme_name(&name) {
            None => {
                println!("{}", load_theme(&theme_path()?));
                Ok(())
            }
            Some(name) => {
                save_theme(&theme_path()?, &name)?;
                println!("✓ Theme set to {}", name.trim());
                Ok(())
            }
        },
        Command::Check { tool, image } => match image {
            Some(path) => {
                let screen = StillImage::open(&path)?;
                check_tool(tool, screen)
            }
            None => check_tool(tool, XcapScreen::new()),
        },
        Command::Pick { tool, field, index } => {
            let index = index.map(|i| i as usize);
            match tool {
                ToolKind::Restock => pick_field::<RestockConfig>(tool, &field, index),
                ToolKind::Enchant => pick_field::<EnchantConfig>(tool, &field, index),
                ToolKind::Kurast => pick_field::<KurastConfig>(tool, &field, index),
            }
        }
    }
}

/// Interactive launcher: pick a tool, start it in its own process, repeat
fn run_menu() -> AppResult<()> {
    let theme = load_theme(&theme_path()?);

    println!("===========================================");
    println!("  D4 Assistant Launcher (theme: {})", theme);
    println!("===========================================\n");
    for (index, kind) in ToolKind::ALL.iter().enumerate() {
        println!("  {}. {}", index + 1, kind);
    }
    println!("\nSelect a tool (Enter = {}, q = exit)", ToolKind::ALL[0]);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let choice = line?;
        let choice = choice.trim();
        if matches!(choice, "q" | "quit" | "exit") {
            return Ok(());
        }

        let kind = match choice.parse::<usize>() {
            Ok(n) if (1..=ToolKind::ALL.len()).contains(&n) => ToolKind::ALL[n - 1],
            _ if choice.is_empty() => ToolKind::ALL[0],
            _ => match choice.parse::<ToolKind>() {
                Ok(kind) => kind,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            },
        };

        match launch_tool(kind) {
            Ok(_) => println!("Launched {} successfully!", kind),
            Err(e) => {
                tracing::error!("Error launching tool: {}", e);
                println!("Failed to launch {}", kind);
            }
        }
    }
}

fn load_valid<C: ToolConfig>() -> AppResult<C> {
    let config = C::load()?;
    config
        .validate()
        .with_context(|| format!("Fix {} (d4-assistant config <tool>)", C::FILE_NAME))?;
    Ok(config)
}

fn ocr_for(settings: OcrSettings) -> Result<OcrManager, WorkerError> {
    Ok(OcrManager::new_with_options(
        settings.ocr_threshold,
        settings.enable_morph_open,
    )?)
}

fn run_tool(kind: ToolKind) -> AppResult<()> {
    match kind {
        ToolKind::Restock => {
            let config = load_valid::<RestockConfig>()?;
            run_worker(kind, move || {
                let ocr = ocr_for(config.ocr)?;
                Ok(RestockTool::new(&config, XcapScreen::new(), ocr, RdevClicker::new()))
            })
        }
        ToolKind::Enchant => {
            let config = load_valid::<EnchantConfig>()?;
            run_worker(kind, move || {
                let ocr = ocr_for(config.ocr)?;
                Ok(EnchantTool::new(&config, XcapScreen::new(), ocr, RdevClicker::new()))
            })
        }
        ToolKind::Kurast => {
            let config = load_valid::<KurastConfig>()?;
            run_worker(kind, move || {
                let finder =
                    ScreenTemplateFinder::open(Path::new(&config.target_image), XcapScreen::new())?;
                Ok(KurastTool::new(&config, finder, RdevClicker::new()))
            })
        }
    }
}

/// Run a tool on a worker thread until it finishes or the stop key is pressed
fn run_worker<F, T>(kind: ToolKind, build: F) -> AppResult<()>
where
    F: FnOnce() -> Result<T, WorkerError> + Send + 'static,
    T: Tool + 'static,
{
    let (tx, rx) = unbounded();
    let mut runner = ToolRunner::new();
    runner.start(kind.slug(), build, tx)?;

    if let Some(stop) = runner.stop_token() {
        spawn_stop_listener(stop, STOP_KEY);
    }
    println!("{} running. Press {:?} to stop.", kind, STOP_KEY);

    // Updates and errors are already logged by the worker
    for event in rx.iter() {
        if matches!(event, WorkerEvent::Finished | WorkerEvent::Stopped) {
            break;
        }
    }

    if let Some(uptime) = runner.state().uptime() {
        tracing::info!("{} ran for {:.1}s", kind, uptime.as_secs_f64());
    }

    match runner.stop()? {
        WorkerOutcome::Finished => println!("✓ {} finished", kind),
        WorkerOutcome::Cancelled => println!("{} stopped", kind),
        WorkerOutcome::Failed(reason) => anyhow::bail!("{} could not start: {}", kind, reason),
    }
    Ok(())
}

fn config_path(kind: ToolKind) -> AppResult<PathBuf> {
    Ok(app_dir()?.join(kind.config_file_name()))
}

fn show_config<C: ToolConfig>(kind: ToolKind) -> AppResult<()> {
    let path = config_path(kind)?;
    let config = C::load_from(&path)?;

    println!("{}", path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    match config.validate() {
        Ok(()) => println!("\n✓ Configuration is complete"),
        Err(e) => println!("\n✗ {}", e),
    }
    Ok(())
}

/// Record a position or region by clicking, then save it into the tool's config
fn pick_field<C: ToolConfig>(kind: ToolKind, field: &str, index: Option<usize>) -> AppResult<()> {
    let path = config_path(kind)?;
    let config = C::load_from(&path)?;
    let target = picker::target(&config, field, index)?;

    match target.shape {
        PickShape::Point => println!("Left-click the position for {} (Esc cancels)", target),
        PickShape::Region => println!(
            "Drag across the region for {}, or click two opposite corners (Esc cancels)",
            target
        ),
    }

    let picked = picker::pick(target.shape)?;
    let updated = picker::apply(&config, &target, picked)?;
    updated.save_to(&path)?;
    println!("✓ {} = {} saved to {}", target, picked, path.display());

    if let Err(e) = updated.validate() {
        println!("  Still incomplete: {}", e);
    }
    Ok(())
}

/// One read-only pass over a tool's regions; never clicks
fn check_tool<S: ScreenSource>(kind: ToolKind, screen: S) -> AppResult<()> {
    match kind {
        ToolKind::Restock => {
            let config = RestockConfig::load()?;
            check_text(screen, config.ocr, &config.scan_regions, &config.target_words)
        }
        ToolKind::Enchant => {
            let config = EnchantConfig::load()?;
            check_text(screen, config.ocr, &config.scan_regions, &config.target_words)
        }
        ToolKind::Kurast => {
            let config = KurastConfig::load()?;
            let region = CaptureRegion::from_array(config.scan_region);
            let mut finder = ScreenTemplateFinder::open(Path::new(&config.target_image), screen)
                .context("Kurast target image could not be loaded")?;
            match finder.find(region, config.confidence)? {
                Some((x, y)) => println!("✓ Portal target found at ({}, {})", x, y),
                None => println!(
                    "✗ Portal target not found in {:?} (confidence {})",
                    region.to_array(),
                    config.confidence
                ),
            }
            Ok(())
        }
    }
}

fn check_text<S: ScreenSource>(
    screen: S,
    settings: OcrSettings,
    regions: &[[u32; 4]],
    target_words: &[String],
) -> AppResult<()> {
    let targets = PhraseSet::new(target_words);
    let ocr = OcrManager::new_with_options(settings.ocr_threshold, settings.enable_morph_open)
        .context("OCR engine unavailable (is Tesseract installed?)")?;
    let mut scanner = TextScanner::new(screen, ocr);

    println!("Targets: {:?}\n", targets.iter().collect::<Vec<_>>());
    for (index, region) in regions.iter().enumerate() {
        let region = CaptureRegion::from_array(*region);
        if region.is_empty() {
            println!("Region {}: not set", index + 1);
            continue;
        }

        let text = scanner.scan(region);
        match targets.first_match(&text) {
            Some(target) => println!("Region {}: \"{}\" ✓ matches '{}'", index + 1, text, target),
            None => println!("Region {}: \"{}\"", index + 1, text),
        }
    }
    Ok(())
}
