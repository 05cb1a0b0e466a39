use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Options that can be remembered in an rc file.
///
/// Files hold the same tokens as the command line, one or more per line,
/// with `#` comments.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub api_url: Option<String>,
    pub autosave_ms: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ConfigFlags {
    /// Merge `other` over `self`; values set in `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            api_url: other.api_url.clone().or_else(|| self.api_url.clone()),
            autosave_ms: other.autosave_ms.or(self.autosave_ms),
            log_file: other.log_file.clone().or_else(|| self.log_file.clone()),
            database: other.database.clone().or_else(|| self.database.clone()),
            host: other.host.clone().or_else(|| self.host.clone()),
            port: other.port.or(self.port),
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Some(PathBuf::from(appdata).join("markdraft"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("markdraft"),
            );
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("markdraft"));
        }
        if let Some(home) = std::env::var_os("HOME") {
            return Some(PathBuf::from(home).join(".config").join("markdraft"));
        }
    }

    None
}

pub fn global_config_path() -> PathBuf {
    config_dir().map_or_else(local_override_path, |dir| dir.join("config"))
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".markdraftrc")
}

/// Where `login` keeps the bearer token.
pub fn session_path() -> PathBuf {
    config_dir().map_or_else(
        || PathBuf::from(".markdraft-session.json"),
        |dir| dir.join("session.json"),
    )
}

/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// # Errors
/// Returns an error if the config directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# markdraft defaults (saved with --save)".to_string()];
    if let Some(url) = &flags.api_url {
        lines.push(format!("--api-url {url}"));
    }
    if let Some(ms) = flags.autosave_ms {
        lines.push(format!("--autosave-ms {ms}"));
    }
    if let Some(path) = &flags.log_file {
        lines.push(format!("--log-file {}", path.display()));
    }
    if let Some(path) = &flags.database {
        lines.push(format!("--database {}", path.display()));
    }
    if let Some(host) = &flags.host {
        lines.push(format!("--host {host}"));
    }
    if let Some(port) = flags.port {
        lines.push(format!("--port {port}"));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// # Errors
/// Returns an error if an existing file cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the remembered options out of a raw argument list.
///
/// Unknown tokens are skipped, and values that fail to parse are dropped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        if is_known(name) {
            let value = match inline {
                Some(value) => Some(value),
                None => {
                    let next = tokens.get(i + 1).map(String::as_str);
                    if next.is_some() {
                        i += 1;
                    }
                    next
                }
            };
            if let Some(value) = value {
                apply(&mut flags, name, value);
            }
        }
        i += 1;
    }
    flags
}

fn is_known(name: &str) -> bool {
    matches!(
        name,
        "--api-url" | "--autosave-ms" | "--log-file" | "--database" | "--host" | "--port"
    )
}

fn apply(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "--api-url" => flags.api_url = Some(value.to_string()),
        "--autosave-ms" => flags.autosave_ms = value.parse().ok(),
        "--log-file" => flags.log_file = Some(PathBuf::from(value)),
        "--database" => flags.database = Some(PathBuf::from(value)),
        "--host" => flags.host = Some(value.to_string()),
        "--port" => flags.port = value.parse().ok(),
        _ => {}
    }
}
