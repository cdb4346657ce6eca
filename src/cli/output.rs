//! Terminal output for the convergence-server binary
//!
//! Every line is rendered to a `String` first and printed second, so what the
//! operator sees at startup can be checked without a terminal.

use crate::peers::OUTBOUND_QUEUE_CAPACITY;
use crate::utils::toml_config::{ConvergenceConfig, LogFormat};
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Success => "[OK]",
            Level::Info => "[INFO]",
            Level::Warning => "[WARN]",
            Level::Error => "[ERROR]",
        }
    }
}

pub struct Output {
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        let art = [
            "  ___ ___  _ ___   _____ ___  ___ ___ ",
            " / __/ _ \\| \\| \\ \\ / / __| _ \\/ __| __|",
            " \\__\\___/|_|\\_|\\_V_/|___|_|_\\\\___|___|",
        ];
        let tagline = "Multi-agent fan-out and synthesis hub";
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));

        println!();
        if self.colored {
            println!("   {}", art[0].bright_cyan().bold());
            println!("   {}", art[1].cyan().bold());
            println!("   {}", art[2].blue().bold());
            println!("\n   {} {}\n", tagline.bright_white().bold(), version.dimmed());
        } else {
            for line in art {
                println!("   {}", line);
            }
            println!("\n   {} {}\n", tagline, version);
        }
    }

    fn status_line(&self, level: Level, message: &str) -> String {
        if !self.colored {
            return format!("  {} {}", level.tag(), message);
        }
        match level {
            Level::Success => format!("  {} {}", "✓".green().bold(), message.green()),
            Level::Info => format!("  {} {}", "•".blue(), message),
            Level::Warning => format!("  {} {}", "⚠".yellow().bold(), message.yellow()),
            Level::Error => format!("  {} {}", "✗".red().bold(), message.red()),
        }
    }

    pub fn success(&self, message: &str) {
        println!("{}", self.status_line(Level::Success, message));
    }

    pub fn info(&self, message: &str) {
        println!("{}", self.status_line(Level::Info, message));
    }

    pub fn warning(&self, message: &str) {
        println!("{}", self.status_line(Level::Warning, message));
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.status_line(Level::Error, message));
    }

    fn header_line(&self, title: &str) -> String {
        if self.colored {
            format!("\n  {}", title.bright_white().bold().underline())
        } else {
            format!("\n  === {} ===", title)
        }
    }

    pub fn header(&self, title: &str) {
        println!("{}", self.header_line(title));
    }

    fn kv_line(&self, key: &str, value: &str) -> String {
        if self.colored {
            format!("    {:<16} {}", key.dimmed(), value.bright_white())
        } else {
            format!("    {:<16} {}", key, value)
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        println!("{}", self.kv_line(key, value));
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// The settings a running server is operating under, one line each.
    pub fn startup_summary(&self, config: &ConvergenceConfig) -> Vec<String> {
        let addr = config.bind_address();
        let log_format = match config.server.log_format {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        };
        let sweep = if config.sweep.enabled {
            format!(
                "every {}s, completed rounds kept {}s",
                config.sweep.interval_secs, config.sweep.completed_round_ttl_secs
            )
        } else {
            "disabled, completed rounds kept until restart".to_string()
        };
        let idle = match config.sweep.peer_idle_timeout_secs {
            Some(secs) if config.sweep.enabled => format!("dropped after {}s silent", secs),
            _ => "kept until disconnect".to_string(),
        };

        let mut lines = vec![self.header_line("Server")];
        for (key, value) in [
            ("listening", format!("http://{}", addr)),
            ("websocket", format!("ws://{}/ws", addr)),
            ("max frame", format!("{} bytes", config.websocket.max_message_size)),
            ("peer queue", format!("{} events", OUTBOUND_QUEUE_CAPACITY)),
            ("sweep", sweep),
            ("idle peers", idle),
            ("log", format!("{} ({})", config.server.log_level, log_format)),
        ] {
            lines.push(self.kv_line(key, &value));
        }
        lines
    }

    pub fn print_startup_summary(&self, config: &ConvergenceConfig) {
        for line in self.startup_summary(config) {
            println!("{}", line);
        }
        println!();
    }
}
