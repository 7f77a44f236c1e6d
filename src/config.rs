use log::{info, warn};
use packforge::key::ResourceKey;
use packforge::pack::DEFAULT_PACK_FORMAT;
use packforge::font::compiler::DEFAULT_GENERATED_NAMESPACE;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_PATH: &str = "packforge.ini";
const STORE_FILE_NAME: &str = "custom_model_data.json";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content);
        Ok(())
    }

    fn parse(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section = String::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current_section = name.trim().to_string();
                self.sections.entry(current_section.clone()).or_default();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                self.sections
                    .entry(current_section.clone())
                    .or_default()
                    .insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }

    pub fn get_section(&self, section: &str) -> Option<&HashMap<String, String>> {
        self.sections.get(section)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Pack to build; a `.zip` path selects the archive backend.
    pub output: PathBuf,
    pub description: String,
    pub pack_format: i32,
    /// Packs merged into the output, in order.
    pub sources: Vec<PathBuf>,
    pub vanilla: Option<PathBuf>,
    pub store: PathBuf,
    pub generated_namespace: String,
    pub log_level: LogLevel,
    /// `base = target` pairs, sorted by base.
    pub overrides: Vec<(ResourceKey, ResourceKey)>,
}

fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "packforge")
        .map(|dirs| dirs.data_dir().join(STORE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(STORE_FILE_NAME))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from("pack"),
            description: "Generated by packforge".to_string(),
            pack_format: DEFAULT_PACK_FORMAT,
            sources: Vec::new(),
            vanilla: None,
            store: default_store_path(),
            generated_namespace: DEFAULT_GENERATED_NAMESPACE.to_string(),
            log_level: LogLevel::Info,
            overrides: Vec::new(),
        }
    }
}

// --- File I/O ---

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    let default = Config::default();

    let mut content = String::new();
    content.push_str("[Pack]\n");
    content.push_str(&format!("Description={}\n", default.description));
    content.push_str(&format!("GeneratedNamespace={}\n", default.generated_namespace));
    content.push_str(&format!("Output={}\n", default.output.display()));
    content.push_str(&format!("PackFormat={}\n", default.pack_format));
    content.push_str("Sources=\n");
    content.push_str(&format!("Store={}\n", default.store.display()));
    content.push_str("Vanilla=\n");
    content.push('\n');
    content.push_str("[Options]\n");
    content.push_str(&format!("LogLevel={}\n", default.log_level.as_str()));
    content.push('\n');
    content.push_str("; base = target, e.g. item/paper = mypack:item/letter\n");
    content.push_str("[Overrides]\n");

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

#[inline(always)]
fn non_empty(v: String) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

fn from_ini(conf: &SimpleIni) -> Config {
    let default = Config::default();

    let overrides = conf.get_section("Overrides").map_or_else(Vec::new, |section| {
        let mut pairs: Vec<(ResourceKey, ResourceKey)> = section
            .iter()
            .filter_map(|(base, target)| match (base.parse(), target.parse()) {
                (Ok(b), Ok(t)) => Some((b, t)),
                _ => {
                    warn!("Ignoring invalid override '{base} = {target}'.");
                    None
                }
            })
            .collect();
        pairs.sort();
        pairs
    });

    Config {
        output: conf
            .get("Pack", "Output")
            .and_then(non_empty)
            .map_or(default.output, PathBuf::from),
        description: conf
            .get("Pack", "Description")
            .unwrap_or(default.description),
        pack_format: conf
            .get("Pack", "PackFormat")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(default.pack_format),
        sources: conf
            .get("Pack", "Sources")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or(default.sources),
        vanilla: conf
            .get("Pack", "Vanilla")
            .and_then(non_empty)
            .map(PathBuf::from),
        store: conf
            .get("Pack", "Store")
            .and_then(non_empty)
            .map_or(default.store, PathBuf::from),
        generated_namespace: conf
            .get("Pack", "GeneratedNamespace")
            .and_then(non_empty)
            .unwrap_or(default.generated_namespace),
        log_level: conf
            .get("Options", "LogLevel")
            .and_then(|v| LogLevel::from_str(&v).ok())
            .unwrap_or(default.log_level),
        overrides,
    }
}

/// Read `path`, writing a default file first if it does not exist.
/// Missing or unreadable values fall back to their defaults.
pub fn load(path: &Path) -> Config {
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(path) {
        Ok(()) => {
            let cfg = from_ini(&conf);
            info!("Configuration loaded from '{}'.", path.display());
            cfg
        }
        Err(e) => {
            warn!("Failed to load '{}': {e}. Using defaults.", path.display());
            Config::default()
        }
    }
}
