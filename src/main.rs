//! Tweakstage CLI
//!
//! Entry point for the `tweakstage` command-line tool.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process;

use tweakstage::apply::ApplySummary;
use tweakstage::config::default_config_path;
use tweakstage::device::Device;
use tweakstage::tools::{BundledTools, DeviceBridge, DEVICE_QUERY_EXIT_CODE};
use tweakstage::tweak::TweakId;
use tweakstage::{logging, AppLayout, ApplyPipeline, Provisioner, Session, Settings};

#[derive(Parser)]
#[command(name = "tweakstage")]
#[command(about = "Stage per-device tweak overlays and restore them onto a device", version)]
struct Cli {
    /// Path to user config file (default: <config dir>/tweakstage/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Override the data root
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected devices
    Devices {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Select a connected device and provision its workspace
    Select {
        /// Device identifier (UDID)
        identifier: String,
    },

    /// Show the enabled tweaks
    Tweaks {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Enable tweaks by tag
    Enable {
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Disable tweaks by tag
    Disable {
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Re-seed the current workspace from the template tree
    Provision,

    /// Compose the enabled tweaks and restore them onto the device
    Apply {
        /// Compose staging only; skip backup and restore
        #[arg(long)]
        dry_run: bool,

        /// Output the apply summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget the selected device and enabled tweaks
    Reset,

    /// Show home screen apps of the selected device
    Apps {
        /// Print the number of home screen pages instead
        #[arg(long)]
        pages: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration and its sources
    Config,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let settings = load_settings(cli.config, cli.data_root);

    match cli.command {
        Commands::Devices { json } => run_devices(&settings, json),
        Commands::Select { identifier } => run_select(&settings, &identifier),
        Commands::Tweaks { json } => run_tweaks(&settings, json),
        Commands::Enable { tags } => run_set_enabled(&settings, tags, true),
        Commands::Disable { tags } => run_set_enabled(&settings, tags, false),
        Commands::Provision => run_provision(&settings),
        Commands::Apply { dry_run, json } => run_apply(&settings, dry_run, json),
        Commands::Reset => run_reset(&settings),
        Commands::Apps { pages, json } => run_apps(&settings, pages, json),
        Commands::Config => run_config(&settings),
    }
}

fn load_settings(config: Option<PathBuf>, data_root: Option<PathBuf>) -> Settings {
    let config_path = config.or_else(default_config_path);
    let overrides = data_root.map(|root| json!({ "data_root": root.to_string_lossy() }));

    match Settings::load(config_path.as_deref(), overrides) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    }
}

fn bundled_tools(settings: &Settings) -> BundledTools {
    BundledTools::new(settings.tools_dir(), settings.data_root.clone())
        .with_theme_command(settings.tools.theme_command.clone())
}

fn provisioner(settings: &Settings) -> Provisioner {
    let options = settings.merge_options().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    });
    Provisioner::new(settings.layout(), settings.template_dir()).with_merge_options(options)
}

fn load_session(layout: &AppLayout) -> Session {
    match Session::load(&layout.session_path()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error loading session: {}", e);
            process::exit(1);
        }
    }
}

fn save_session(layout: &AppLayout, session: &Session) {
    if let Err(e) = session.save(&layout.session_path()) {
        eprintln!("Error saving session: {}", e);
        process::exit(1);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn list_devices(settings: &Settings) -> Vec<Device> {
    match bundled_tools(settings).list_devices() {
        Ok(devices) => devices,
        Err(e) => {
            eprintln!("Device discovery failed: {}", e);
            process::exit(DEVICE_QUERY_EXIT_CODE);
        }
    }
}

fn run_devices(settings: &Settings, json_output: bool) {
    let devices = list_devices(settings);

    if json_output {
        print_json(&devices);
        return;
    }

    if devices.is_empty() {
        println!("No devices connected.");
        return;
    }

    println!("{:<28} {:<24} {:<10} KIND", "IDENTIFIER", "NAME", "VERSION");
    for device in &devices {
        println!(
            "{:<28} {:<24} {:<10} {}",
            device.identifier,
            device.name,
            device.version,
            if device.is_tablet { "tablet" } else { "phone" }
        );
    }
}

fn run_select(settings: &Settings, identifier: &str) {
    let devices = list_devices(settings);
    let Some(device) = devices.into_iter().find(|d| d.identifier == identifier) else {
        eprintln!("Device '{}' is not connected.", identifier);
        process::exit(3);
    };

    let policy = settings.device_policy().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    });

    let layout = settings.layout();
    let mut session = load_session(&layout);
    let name = device.name.clone();
    let version = device.version.to_string();
    let result = session.select_device(device, &provisioner(settings), &policy);
    save_session(&layout, &session);

    match result {
        Ok(eligibility) if !eligibility.available => {
            eprintln!("{} runs {}, which is not supported.", name, version);
            process::exit(4);
        }
        Ok(eligibility) => {
            println!("Selected {} ({}), version {}", name, identifier, version);
            if !eligibility.tested {
                println!("Warning: version {} has not been tested.", version);
            }
            if let Some(workspace) = session.current_workspace() {
                println!("Workspace: {}", workspace.display());
            }
        }
        Err(e) => {
            eprintln!("Provisioning failed: {}", e);
            process::exit(5);
        }
    }
}

fn run_tweaks(settings: &Settings, json_output: bool) {
    let session = load_session(&settings.layout());
    let enabled = session.enabled_tweaks();

    if json_output {
        print_json(enabled);
        return;
    }

    if enabled.is_empty() {
        println!("No tweaks enabled.");
        return;
    }
    for tweak in enabled {
        println!("{}", tweak);
    }
}

fn run_set_enabled(settings: &Settings, tags: Vec<String>, enabled: bool) {
    let layout = settings.layout();
    let mut session = load_session(&layout);

    for tag in tags {
        let tweak = match TweakId::new(tag.as_str()) {
            Ok(tweak) => tweak,
            Err(e) => {
                eprintln!("Invalid tweak '{}': {}", tag, e);
                process::exit(1);
            }
        };
        if !tweak.is_known() {
            eprintln!("Note: '{}' is not a built-in tweak.", tweak);
        }
        session.set_tweak_enabled(tweak, enabled);
    }

    save_session(&layout, &session);
}

fn run_provision(settings: &Settings) {
    let session = load_session(&settings.layout());
    let workspace = match session.active_target() {
        Ok((_, workspace)) => workspace.to_path_buf(),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    match provisioner(settings).seed(&workspace) {
        Ok(report) => println!("{}: {}", workspace.display(), report),
        Err(e) => {
            eprintln!("Provisioning failed: {}", e);
            process::exit(5);
        }
    }
}

fn run_apply(settings: &Settings, dry_run: bool, json_output: bool) {
    let layout = settings.layout();
    let session = load_session(&layout);
    let tools = bundled_tools(settings);
    let options = settings.merge_options().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    });

    let pipeline = ApplyPipeline::new(layout.clone(), &tools)
        .with_merge_options(options)
        .dry_run(dry_run);

    match pipeline.run(&session) {
        Ok(summary) => {
            if json_output {
                print_json(&summary);
            } else {
                println!("{}", summary.human_summary());
            }
        }
        Err(e) => {
            if json_output {
                if let Ok(summary) = ApplySummary::from_file(&layout.last_apply_path()) {
                    print_json(&summary);
                }
            }
            eprintln!("Apply failed in {}: {}", e.stage(), e);
            process::exit(e.exit_code());
        }
    }
}

fn run_reset(settings: &Settings) {
    let layout = settings.layout();
    let mut session = load_session(&layout);
    session.reset();
    save_session(&layout, &session);
    println!("Session cleared.");
}

fn run_apps(settings: &Settings, pages: bool, json_output: bool) {
    let session = load_session(&settings.layout());
    let Some(identifier) = session.current_device_identifier() else {
        eprintln!("No device selected");
        process::exit(2);
    };
    let tools = bundled_tools(settings);

    if pages {
        // The page count falls back to a single page.
        let count = tools.home_screen_pages(identifier).unwrap_or(1);
        if json_output {
            print_json(&json!({ "pages": count }));
        } else {
            println!("{}", count);
        }
        return;
    }

    match tools.home_screen_apps(identifier) {
        Ok(apps) if json_output => print_json(&apps),
        Ok(apps) => {
            for app in apps {
                println!("{:<48} {}", app.bundle_id, app.name);
            }
        }
        Err(e) => {
            eprintln!("Failed to list apps: {}", e);
            process::exit(DEVICE_QUERY_EXIT_CODE);
        }
    }
}

#[derive(Serialize)]
struct ConfigView<'a> {
    settings: &'a Settings,
    template_dir: PathBuf,
    tools_dir: PathBuf,
}

fn run_config(settings: &Settings) {
    print_json(&ConfigView {
        settings,
        template_dir: settings.template_dir(),
        tools_dir: settings.tools_dir(),
    });
}
