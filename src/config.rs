//! Server configuration: host/port plus the handful of ambient knobs this
//! core needs (log level, the multi-set/collector fan-out bound, the SCAN
//! default page size). Loaded the way the teacher's `load_server_config`
//! does — an optional config file of whitespace-separated directives,
//! named as `argv[1]` — layered with defaults.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::process::exit;
use tracing::error;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub fan_out_timeout_ms: u64,
    pub scan_default_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 6380,
            log_level: "info".to_string(),
            fan_out_timeout_ms: 2000,
            scan_default_count: 10,
        }
    }
}

impl Config {
    /// Parses a config file of `directive value` lines, `#`-comments and
    /// blank lines ignored, matching the teacher's directive-table style.
    pub fn load_from_file(&mut self, filename: &str) {
        let file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                error!(%filename, error = %e, "can't open config file");
                exit(1);
            }
        };

        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let Ok(line) = line else { continue };
            let trimmed = line.trim();
            if trimmed.starts_with('#') || trimmed.is_empty() {
                continue;
            }
            let argv: Vec<&str> = trimmed.split_whitespace().collect();
            match argv[0].to_ascii_lowercase().as_str() {
                "bind" if argv.len() == 2 => self.host = argv[1].to_string(),
                "port" if argv.len() == 2 => match argv[1].parse() {
                    Ok(p) => self.port = p,
                    Err(_) => fatal_config_error("invalid port", trimmed, line_num + 1),
                },
                "loglevel" if argv.len() == 2 => self.log_level = argv[1].to_string(),
                "fanouttimeoutms" if argv.len() == 2 => match argv[1].parse() {
                    Ok(ms) => self.fan_out_timeout_ms = ms,
                    Err(_) => fatal_config_error("invalid fanouttimeoutms", trimmed, line_num + 1),
                },
                "scandefaultcount" if argv.len() == 2 => match argv[1].parse() {
                    Ok(n) => self.scan_default_count = n,
                    Err(_) => fatal_config_error("invalid scandefaultcount", trimmed, line_num + 1),
                },
                _ => fatal_config_error("unknown directive", trimmed, line_num + 1),
            }
        }
    }
}

fn fatal_config_error(err: &str, line: &str, line_num: usize) {
    eprintln!("*** FATAL CONFIG FILE ERROR ***");
    eprintln!("Reading the configuration file, at line {line_num}");
    eprintln!(">>> '{line}'");
    eprintln!("{err}");
    exit(1);
}
