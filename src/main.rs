mod config;
mod console;
mod core;
mod plugin_container;
mod session;

use crate::console::ConsoleHost;
use crate::core::Core;
use crate::session::Session;
use env_logger::Env;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::Path;
use std::process;
use std::sync::Arc;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // If the configuration file does not exist, try copying over the template.
    if !Path::new(config::PATH).exists() {
        if let Err(e) = std::fs::copy(config::TEMPLATE_PATH, config::PATH) {
            eprintln!(
                "Could not copy {} to {}. Try copying it manually. (error: {})",
                config::TEMPLATE_PATH,
                config::PATH,
                e
            );
            process::exit(1);
        }
        println!(
            "Created configuration file \"{}\". Please review it.",
            config::PATH
        );
        return;
    }

    let config = match config::load(Path::new(config::PATH)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };
    let host = Arc::new(ConsoleHost::new(&config));
    let mut core = Core::new(Arc::clone(&host), config.bot.plugin_dir.clone());
    for name in config.plugins.keys() {
        if let Err(e) = core.load_plugin(name) {
            log::error!("Failed to load \"{}\": {}", name, e);
        }
    }

    let (user, channel) = match (host.owner_user(), host.default_channel()) {
        (Some(user), Some(channel)) => (user, channel),
        _ => {
            eprintln!("The [console] section needs at least one channel.");
            process::exit(1);
        }
    };
    let mut session = Session::new(user, channel);
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Could not set up the terminal: {}", e);
            process::exit(1);
        }
    };
    println!(
        "Plugins: {}. Type :quit to leave.",
        core.plugin_names().join(", ")
    );
    loop {
        match editor.readline(&session.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                if !session.handle(&mut core, &host, &line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                log::error!("Could not read input: {}", e);
                break;
            }
        }
    }
}
