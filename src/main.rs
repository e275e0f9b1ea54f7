//! Style Grouper - Main entry point
//!
//! Loads a document and either runs a single scan or serves the panel
//! protocol over stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Group the text layers of the saved selection and print the result
//! style-grouper --document page.json --scan selection
//!
//! # Serve the panel protocol (length-prefixed JSON frames)
//! style-grouper --document page.json
//! ```

use std::path::PathBuf;
use std::process;

use style_grouper::protocol::{decode_request, read_frame, write_event};
use style_grouper::{
    Config, GroupOrder, MemoryDocument, MemoryHost, PanelController, PanelEvent, PanelRequest,
    ScanScope,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Parsed command line
#[derive(Debug, Default)]
struct Options {
    document: Option<PathBuf>,
    config: Option<PathBuf>,
    scan: Option<ScanScope>,
    order: GroupOrder,
}

/// Parse command line arguments; `Ok(None)` means help was printed
fn parse_args() -> Result<Option<Options>, String> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            "--document" | "-d" => {
                i += 1;
                let path = args.get(i).ok_or("--document requires a path")?;
                options.document = Some(PathBuf::from(path));
            }
            "--config" | "-c" => {
                i += 1;
                let path = args.get(i).ok_or("--config requires a path")?;
                options.config = Some(PathBuf::from(path));
            }
            "--scan" | "-s" => {
                i += 1;
                options.scan = match args.get(i).map(String::as_str) {
                    Some("selection") => Some(ScanScope::Selection),
                    Some("all") => Some(ScanScope::All),
                    _ => return Err("--scan requires 'selection' or 'all'".into()),
                };
            }
            "--order" => {
                i += 1;
                options.order = match args.get(i).map(String::as_str) {
                    Some("usage") => GroupOrder::Usage,
                    Some("size") => GroupOrder::Size,
                    _ => return Err("--order requires 'usage' or 'size'".into()),
                };
            }
            arg => return Err(format!("Unknown argument: {}", arg)),
        }
        i += 1;
    }

    Ok(Some(options))
}

fn print_help() {
    println!("style-grouper - Group text layers by typographic style");
    println!();
    println!("USAGE:");
    println!("    style-grouper [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -d, --document <FILE>      Document JSON to load");
    println!("    -c, --config <FILE>        Configuration file");
    println!("    -s, --scan <SCOPE>         Scan once ('selection' or 'all') and print JSON");
    println!("        --order <ORDER>        Group order for --scan ('usage' or 'size')");
    println!("    -h, --help                 Print this help message");
    println!();
    println!("Without --scan, panel messages are read from stdin and events written");
    println!("to stdout as length-prefixed JSON frames.");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = match parse_args() {
        Ok(Some(options)) => options,
        Ok(None) => return Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            process::exit(1);
        }
    };

    let config_path = options
        .config
        .clone()
        .unwrap_or_else(Config::default_config_path);
    let loaded = Config::read_from_path(&config_path);

    // stdout carries the protocol, so logs go to stderr
    let log_level = match &loaded {
        Ok(config) => config.general.log_level.clone(),
        Err(_) => Config::default().general.log_level,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Style Grouper");
    let config = Config::or_default(&config_path, loaded);

    let document = match &options.document {
        Some(path) => MemoryDocument::load(path)?,
        None => {
            warn!("No document given, starting with an empty page");
            MemoryDocument::default()
        }
    };

    let mut host = MemoryHost::new(document);
    let host_events = host.subscribe();
    let (event_tx, mut event_rx) = mpsc::channel::<PanelEvent>(64);
    let mut controller = PanelController::new(host, config, event_tx, host_events);

    if let Some(scope) = options.scan {
        let outcome = controller.scan(scope, options.order).await?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    controller.init();

    let (request_tx, request_rx) = mpsc::channel::<PanelRequest>(64);

    // Panel -> controller
    let reader = tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        loop {
            match read_frame(&mut stdin).await {
                Ok(Some(frame)) => match decode_request(&frame) {
                    Ok(request) => {
                        if request_tx.send(request).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring malformed request: {}", e),
                },
                Ok(None) => {
                    info!("Panel closed the session");
                    break;
                }
                Err(e) => {
                    error!("Failed to read from panel: {}", e);
                    break;
                }
            }
        }
    });

    // Controller -> panel
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = event_rx.recv().await {
            if let Err(e) = write_event(&mut stdout, &event).await {
                error!("Failed to write {} to panel: {}", event.as_str(), e);
                break;
            }
        }
    });

    let result = controller.run(request_rx).await;
    drop(controller);

    reader.abort();
    if let Err(e) = writer.await {
        warn!("Writer task ended abnormally: {}", e);
    }

    result?;
    info!("Style Grouper stopped");
    Ok(())
}
