//! bbterm - sprite-capable terminal client for BBS-style servers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              Driver Loop                 │
//! ├──────────────────────────────────────────┤
//! │  Transport (TCP)  →  Parser              │
//! │                       ↓         ↘        │
//! │              Screen state    Replies     │
//! │                       ↓                  │
//! │              Framebuffer → PNG           │
//! └──────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};

use bbterm::config::Config;
use bbterm::render::{self, Framebuffer};
use bbterm::terminal::transport::{MemoryTransport, Recorder, TcpTransport, Transport, TransportError};
use bbterm::terminal::{Engine, Terminal};

/// Default replay chunk size
const DEFAULT_REPLAY_CHUNK: usize = 4096;

/// Flags that take a value
const VALUE_FLAGS: &[&str] = &["--replay", "--chunk", "--screenshot"];

fn print_help() {
    println!(
        r#"bbterm {} - sprite-capable terminal client for BBS-style servers

USAGE:
    bbterm [OPTIONS] [HOST] [PORT]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --init-config           Generate default config file
    -f, --force             Overwrite config file
    --replay FILE           Feed a captured stream instead of connecting
    --chunk N               Replay read size in bytes (default {})
    --screenshot PATH       Write the final screen to PATH (PNG)

EXAMPLES:
    bbterm bbs.example.org 2323          Connect to a server
    bbterm --replay session.bin          Render a captured session
    bbterm --init-config                 Generate default config

ENVIRONMENT:
    BBTERM_CONFIG    Config file path
    RUST_LOG         Log filter (default: warn)

CONFIG FILE:
    ~/.config/bbterm/config.toml
"#,
        env!("CARGO_PKG_VERSION"),
        DEFAULT_REPLAY_CHUNK
    );
}

/// Value following `flag`, if present
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => args
            .get(i + 1)
            .map(|v| Some(v.as_str()))
            .ok_or_else(|| anyhow!("{} requires a value", flag)),
        None => Ok(None),
    }
}

/// Arguments that are neither flags nor flag values
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args.iter().skip(1) {
        if skip {
            skip = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    // --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // --version
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("bbterm {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Config file generation mode
    if args.iter().any(|a| a == "--init-config") {
        let force = args.iter().any(|a| a == "--force" || a == "-f");
        let path = Config::write_default_config(force)?;
        println!("Config file generated: {}", path.display());
        return Ok(());
    }

    let config = Config::load();
    let screenshot = flag_value(&args, "--screenshot")?.map(PathBuf::from);

    config.display.validate()?;
    let atlas = render::load_atlas(&config.font, config.display.cell_size)?;
    let surface = Framebuffer::new(config.display.width(), config.display.height(), atlas);
    let engine = Engine::new(surface, config.engine_options());

    let engine = if let Some(file) = flag_value(&args, "--replay")? {
        let chunk = match flag_value(&args, "--chunk")? {
            Some(n) => n
                .parse::<usize>()
                .with_context(|| format!("Invalid --chunk value: {}", n))?,
            None => DEFAULT_REPLAY_CHUNK,
        };
        replay(engine, Path::new(file), chunk, config.connection.read_size)?
    } else {
        connect(engine, &config, &positional(&args))?
    };

    save_final_screen(engine.screen().surface(), screenshot.as_deref(), &config)
}

/// Feed a captured stream through the engine
fn replay(
    engine: Engine<Framebuffer>,
    file: &Path,
    chunk: usize,
    read_size: usize,
) -> Result<Engine<Framebuffer>> {
    let data = std::fs::read(file)
        .with_context(|| format!("Failed to read capture: {}", file.display()))?;
    info!("Replaying {} ({} bytes, chunk {})", file.display(), data.len(), chunk);

    let transport = MemoryTransport::from_bytes(&data, chunk);
    let mut terminal = Terminal::new(engine, transport, read_size);
    run(&mut terminal, None)?;
    Ok(terminal.into_engine())
}

/// Connect to the server and run until it closes the connection
fn connect(
    engine: Engine<Framebuffer>,
    config: &Config,
    positional: &[&str],
) -> Result<Engine<Framebuffer>> {
    let host = match positional.first() {
        Some(h) => h.to_string(),
        None if !config.connection.host.is_empty() => config.connection.host.clone(),
        None => bail!("No host given (see --help)"),
    };
    let port = match positional.get(1) {
        Some(p) => p
            .parse::<u16>()
            .with_context(|| format!("Invalid port: {}", p))?,
        None if config.connection.port != 0 => config.connection.port,
        None => bail!("No port given (see --help)"),
    };

    let transport = TcpTransport::connect(&host, port, config.connect_timeout())
        .with_context(|| format!("Failed to connect to {}:{}", host, port))?;
    let mut terminal = Terminal::new(engine, transport, config.connection.read_size);

    if let Some(path) = config.paths.dump_path() {
        match Recorder::create(&path) {
            Ok(recorder) => terminal = terminal.with_recorder(recorder),
            Err(e) => warn!("Cannot open dump file {}: {}", path.display(), e),
        }
    }

    run(&mut terminal, Some(config.timing.tick()))?;
    info!("Connection closed");
    Ok(terminal.into_engine())
}

/// Driver loop; `tick` sleeps between iterations (None = run flat out)
fn run<T: Transport>(
    terminal: &mut Terminal<Framebuffer, T>,
    tick: Option<std::time::Duration>,
) -> Result<()> {
    loop {
        match terminal.process() {
            Ok(_) => {}
            Err(TransportError::Closed) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        if let Some(period) = tick {
            std::thread::sleep(period);
        }
    }
}

fn save_final_screen(surface: &Framebuffer, path: Option<&Path>, config: &Config) -> Result<()> {
    match path {
        Some(path) => {
            surface.save_png(path)?;
            info!("Screenshot saved: {}", path.display());
        }
        None => {
            surface.save_screenshot(&config.paths.screenshot_path())?;
        }
    }
    Ok(())
}
