//! Console log output
//!
//! `[HH:MM:SS] LEVEL: message`, coloured by level when stderr is a terminal.
//! Records logged under the stage target become section headers.

use chrono::Local;
use env_logger::Builder;
use log::{Level, LevelFilter};
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Write};

pub fn init(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let color = std::io::stderr().is_terminal();

    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(move |buf, record| {
            let timestamp = Local::now().format("%H:%M:%S").to_string();
            let message = record.args().to_string();
            writeln!(
                buf,
                "{}",
                render(&timestamp, record.level(), record.target(), &message, color)
            )
        })
        .init();
}

pub(crate) fn render(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    color: bool,
) -> String {
    if target == governance::STAGE {
        let header = format!("=== {} ===", message);
        return if color {
            format!("\n{}", header.magenta().bold())
        } else {
            format!("\n{}", header)
        };
    }

    let prefix = format!("[{}] {}:", timestamp, level);
    if !color {
        return format!("{} {}", prefix, message);
    }

    let prefix = match level {
        Level::Error => prefix.red().to_string(),
        Level::Warn => prefix.yellow().to_string(),
        Level::Info => prefix.blue().to_string(),
        Level::Debug | Level::Trace => prefix.cyan().to_string(),
    };
    format!("{} {}", prefix, message)
}
