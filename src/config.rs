use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::net::FetchSettings;
use crate::window::WindowPolicy;

pub const DEFAULT_PROXY_URL: &str = "http://localhost:3000/api/flights";
pub const DEFAULT_ALLOW_HTTP: bool = true;
pub const DEFAULT_REFRESH_SECS: u64 = 180;
pub const MIN_REFRESH_SECS: u64 = 10;
pub const DEFAULT_ROTATION_SECS: u64 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RESIZE_SETTLE_MS: u64 = 500;
pub const DEFAULT_AIRPORTS_FILE: &str = "airports.json";
pub const DEFAULT_FALLBACK_LIMIT: usize = 20;
pub const DEFAULT_ARRIVAL_WINDOW: (u32, u32) = (240, 240);
pub const DEFAULT_DEPARTURE_WINDOW: (u32, u32) = (60, 360);
pub const DEFAULT_CELL_PX: (u16, u16) = (9, 18);
pub const DEFAULT_FLAP_ANIMATION: bool = true;
pub const DEFAULT_CONFIG_FILE: &str = "fids-tui.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub proxy_url: String,
    pub allow_http: bool,
    pub config_path: PathBuf,
    pub refresh: Duration,
    pub rotation: Duration,
    pub request_timeout: Duration,
    pub resize_settle: Duration,
    pub airports_file: String,
    pub fallback_limit: usize,
    pub arrival_window: (u32, u32),
    pub departure_window: (u32, u32),
    // Nominal terminal cell size in pixels, used when the terminal won't report one.
    pub cell_px: (u16, u16),
    pub flap_animation: bool,
    pub log_enabled: bool,
    pub log_level: String,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            allow_http: DEFAULT_ALLOW_HTTP,
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            refresh: Duration::from_secs(DEFAULT_REFRESH_SECS),
            rotation: Duration::from_secs(DEFAULT_ROTATION_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            resize_settle: Duration::from_millis(DEFAULT_RESIZE_SETTLE_MS),
            airports_file: DEFAULT_AIRPORTS_FILE.to_string(),
            fallback_limit: DEFAULT_FALLBACK_LIMIT,
            arrival_window: DEFAULT_ARRIVAL_WINDOW,
            departure_window: DEFAULT_DEPARTURE_WINDOW,
            cell_px: DEFAULT_CELL_PX,
            flap_animation: DEFAULT_FLAP_ANIMATION,
            log_enabled: false,
            log_level: "info".to_string(),
            log_file: "fids-tui.log".to_string(),
        }
    }
}

impl Config {
    pub fn window_policy(&self) -> WindowPolicy {
        WindowPolicy::from_minutes(self.arrival_window, self.departure_window)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            policy: self.window_policy(),
            fallback_limit: self.fallback_limit,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    proxy_url: Option<String>,
    allow_http: Option<bool>,
    refresh_secs: Option<u64>,
    rotation_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    resize_settle_ms: Option<u64>,
    airports_file: Option<String>,
    fallback_limit: Option<usize>,
    arrival_before_mins: Option<u32>,
    arrival_after_mins: Option<u32>,
    departure_before_mins: Option<u32>,
    departure_after_mins: Option<u32>,
    cell_width_px: Option<u16>,
    cell_height_px: Option<u16>,
    flap_animation: Option<bool>,
    log_enabled: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
}

pub fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_from(&args, |key| env::var(key).ok())
}

pub fn parse_from<F>(args: &[String], env_var: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut explicit_config: Option<PathBuf> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("--config needs a value"))?;
            explicit_config = Some(PathBuf::from(value));
        }
    }

    let env_config = env_var("FIDS_CONFIG").map(PathBuf::from);
    let config_path = explicit_config
        .clone()
        .or(env_config)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut config = Config::default();

    if config_path.exists() {
        let file_config = load_file_config(&config_path)?;
        apply_file_config(&mut config, file_config);
    } else if explicit_config.is_some() {
        return Err(anyhow!("Config file not found: {}", config_path.display()));
    }
    config.config_path = config_path;

    apply_env(&mut config, &env_var)?;
    apply_flags(&mut config, args)?;

    validate(&config)?;
    Ok(config)
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(cfg)
}

fn apply_file_config(target: &mut Config, file: FileConfig) {
    if let Some(url) = file.proxy_url {
        target.proxy_url = url;
    }
    if let Some(allow_http) = file.allow_http {
        target.allow_http = allow_http;
    }
    if let Some(secs) = file.refresh_secs {
        target.refresh = Duration::from_secs(secs.max(MIN_REFRESH_SECS));
    }
    if let Some(secs) = file.rotation_secs {
        target.rotation = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = file.request_timeout_secs {
        target.request_timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(ms) = file.resize_settle_ms {
        target.resize_settle = Duration::from_millis(ms);
    }
    if let Some(path) = file.airports_file {
        target.airports_file = path;
    }
    if let Some(limit) = file.fallback_limit {
        target.fallback_limit = limit.max(1);
    }
    if let Some(mins) = file.arrival_before_mins {
        target.arrival_window.0 = mins;
    }
    if let Some(mins) = file.arrival_after_mins {
        target.arrival_window.1 = mins;
    }
    if let Some(mins) = file.departure_before_mins {
        target.departure_window.0 = mins;
    }
    if let Some(mins) = file.departure_after_mins {
        target.departure_window.1 = mins;
    }
    if let Some(px) = file.cell_width_px {
        target.cell_px.0 = px.max(1);
    }
    if let Some(px) = file.cell_height_px {
        target.cell_px.1 = px.max(1);
    }
    if let Some(flap) = file.flap_animation {
        target.flap_animation = flap;
    }
    if let Some(log_enabled) = file.log_enabled {
        target.log_enabled = log_enabled;
    }
    if let Some(level) = file.log_level {
        target.log_level = level;
    }
    if let Some(path) = file.log_file {
        target.log_file = path;
    }
}

fn truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes" | "on")
}

fn apply_env<F>(config: &mut Config, env_var: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env_var("FIDS_PROXY_URL") {
        config.proxy_url = url;
    }
    if let Some(value) = env_var("FIDS_ALLOW_HTTP") {
        config.allow_http = truthy(&value);
    }
    if let Some(value) = env_var("FIDS_REFRESH") {
        if let Ok(secs) = value.parse::<u64>() {
            config.refresh = Duration::from_secs(secs.max(MIN_REFRESH_SECS));
        }
    }
    if let Some(value) = env_var("FIDS_ROTATION") {
        if let Ok(secs) = value.parse::<u64>() {
            config.rotation = Duration::from_secs(secs.max(1));
        }
    }
    if let Some(value) = env_var("FIDS_TIMEOUT") {
        if let Ok(secs) = value.parse::<u64>() {
            config.request_timeout = Duration::from_secs(secs.max(1));
        }
    }
    if let Some(value) = env_var("FIDS_RESIZE_SETTLE_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.resize_settle = Duration::from_millis(ms);
        }
    }
    if let Some(path) = env_var("FIDS_AIRPORTS_FILE") {
        config.airports_file = path;
    }
    if let Some(value) = env_var("FIDS_FALLBACK_LIMIT") {
        if let Ok(limit) = value.parse::<usize>() {
            config.fallback_limit = limit.max(1);
        }
    }
    if let Some(value) = env_var("FIDS_ARRIVAL_WINDOW") {
        config.arrival_window =
            parse_pair(&value).context("FIDS_ARRIVAL_WINDOW expects BEFORE,AFTER minutes")?;
    }
    if let Some(value) = env_var("FIDS_DEPARTURE_WINDOW") {
        config.departure_window =
            parse_pair(&value).context("FIDS_DEPARTURE_WINDOW expects BEFORE,AFTER minutes")?;
    }
    if let Some(value) = env_var("FIDS_CELL_PX") {
        let (w, h): (u16, u16) =
            parse_pair(&value).context("FIDS_CELL_PX expects WIDTH,HEIGHT pixels")?;
        config.cell_px = (w.max(1), h.max(1));
    }
    if let Some(value) = env_var("FIDS_FLAP") {
        config.flap_animation = truthy(&value);
    }
    if let Some(value) = env_var("FIDS_LOG_ENABLED") {
        config.log_enabled = truthy(&value);
    }
    if let Some(value) = env_var("FIDS_LOG_LEVEL") {
        config.log_level = value;
    }
    if let Some(value) = env_var("FIDS_LOG_FILE") {
        config.log_file = value;
    }
    Ok(())
}

fn apply_flags(config: &mut Config, args: &[String]) -> Result<()> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .map(String::as_str)
                .ok_or_else(|| anyhow!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--config" => {
                value("--config")?;
            }
            "--proxy-url" => {
                config.proxy_url = value("--proxy-url")?.to_string();
            }
            "--allow-http" => {
                config.allow_http = true;
            }
            "--refresh" => {
                let secs: u64 = value("--refresh")?.parse()?;
                config.refresh = Duration::from_secs(secs.max(MIN_REFRESH_SECS));
            }
            "--rotation" => {
                let secs: u64 = value("--rotation")?.parse()?;
                config.rotation = Duration::from_secs(secs.max(1));
            }
            "--timeout" => {
                let secs: u64 = value("--timeout")?.parse()?;
                config.request_timeout = Duration::from_secs(secs.max(1));
            }
            "--resize-settle" => {
                let ms: u64 = value("--resize-settle")?.parse()?;
                config.resize_settle = Duration::from_millis(ms);
            }
            "--airports" => {
                config.airports_file = value("--airports")?.to_string();
            }
            "--fallback-limit" => {
                let limit: usize = value("--fallback-limit")?.parse()?;
                config.fallback_limit = limit.max(1);
            }
            "--arrival-window" => {
                config.arrival_window = parse_pair(value("--arrival-window")?)
                    .context("--arrival-window expects BEFORE,AFTER minutes")?;
            }
            "--departure-window" => {
                config.departure_window = parse_pair(value("--departure-window")?)
                    .context("--departure-window expects BEFORE,AFTER minutes")?;
            }
            "--cell-px" => {
                let (w, h): (u16, u16) = parse_pair(value("--cell-px")?)
                    .context("--cell-px expects WIDTH,HEIGHT pixels")?;
                config.cell_px = (w.max(1), h.max(1));
            }
            "--flap" => {
                config.flap_animation = true;
            }
            "--no-flap" => {
                config.flap_animation = false;
            }
            "--log" => {
                config.log_enabled = true;
            }
            "--no-log" => {
                config.log_enabled = false;
            }
            "--log-level" => {
                config.log_level = value("--log-level")?.to_string();
            }
            "--log-file" => {
                config.log_file = value("--log-file")?.to_string();
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                return Err(anyhow!("Unknown argument: {other}"));
            }
        }
    }
    Ok(())
}

fn parse_pair<T>(value: &str) -> Result<(T, T)>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let (first, second) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("expected two comma-separated values, got {value:?}"))?;
    Ok((first.trim().parse()?, second.trim().parse()?))
}

fn print_help() {
    println!("fids-tui");
    println!("Usage: fids-tui [--proxy-url URL] [--allow-http] [--config PATH]");
    println!("       [--refresh SECS] [--rotation SECS] [--timeout SECS] [--resize-settle MS]");
    println!("       [--airports PATH] [--fallback-limit N]");
    println!("       [--arrival-window BEFORE,AFTER] [--departure-window BEFORE,AFTER]");
    println!("       [--cell-px WIDTH,HEIGHT] [--flap] [--no-flap]");
    println!("       [--log] [--no-log] [--log-level LEVEL] [--log-file PATH]");
    println!("Environment: FIDS_PROXY_URL overrides the flight proxy endpoint");
    println!("Environment: FIDS_ALLOW_HTTP=1 allows http:// to non-local hosts");
    println!("Environment: FIDS_CONFIG overrides config path");
    println!("Environment: FIDS_REFRESH FIDS_ROTATION FIDS_TIMEOUT set intervals in seconds");
    println!("Environment: FIDS_RESIZE_SETTLE_MS sets the resize debounce");
    println!("Environment: FIDS_AIRPORTS_FILE sets the airport translation table");
    println!("Environment: FIDS_FALLBACK_LIMIT caps the unfiltered fallback list");
    println!("Environment: FIDS_ARRIVAL_WINDOW/FIDS_DEPARTURE_WINDOW take BEFORE,AFTER minutes");
    println!("Environment: FIDS_CELL_PX sets the nominal cell size as WIDTH,HEIGHT");
    println!("Environment: FIDS_FLAP toggles the split-flap animation");
    println!("Environment: FIDS_LOG_ENABLED/LEVEL/FILE configure logging");
    println!("Keys: q/Esc quit | r refresh now | n next page");
}

fn url_host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if let Some(bracketed) = authority.strip_prefix('[') {
        return bracketed.split(']').next().unwrap_or(bracketed);
    }
    authority.split(':').next().unwrap_or(authority)
}

fn is_loopback(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost") || host == "::1" || host.starts_with("127.")
}

fn validate(config: &Config) -> Result<()> {
    let url = config.proxy_url.trim();
    let lower = url.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(anyhow!("Proxy URL must be http(s): {url}"));
    }
    if lower.starts_with("http://") && !config.allow_http && !is_loopback(url_host(url)) {
        return Err(anyhow!(
            "Refusing insecure http URL (set allow_http=true or FIDS_ALLOW_HTTP=1 to override)"
        ));
    }
    for (name, (before, after)) in [
        ("arrival", config.arrival_window),
        ("departure", config.departure_window),
    ] {
        if u64::from(before) + u64::from(after) == 0 {
            return Err(anyhow!("The {name} window must span more than an instant"));
        }
    }
    Ok(())
}
