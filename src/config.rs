use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub line: LineConfig,
    pub github: GitHubConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineConfig {
    pub channel_access_token: String,
    pub channel_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub username: String,
    /// Optional personal access token. Without it the events API still
    /// answers, just with a much lower rate limit.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_threshold")]
    pub threshold: u64,
    #[serde(default = "default_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    /// Offset used for "today" day boundaries and the nightly trigger,
    /// e.g. "+09:00".
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            hour: default_hour(),
            minute: 0,
            utc_offset: default_utc_offset(),
        }
    }
}

impl NotifyConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.utc_offset)
            .with_context(|| format!("Invalid utc_offset '{}' (expected \"+HH:MM\" or \"-HH:MM\")", self.utc_offset))
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (east, rest) = if let Some(rest) = s.strip_prefix('+') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('-') {
        (false, rest)
    } else {
        return None;
    };

    let (hours, minutes) = rest.split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    let seconds = ((hours * 60 + minutes) * 60) as i32;
    if east {
        FixedOffset::east_opt(seconds)
    } else {
        FixedOffset::west_opt(seconds)
    }
}

fn default_threshold() -> u64 {
    5
}

fn default_hour() -> u32 {
    21
}

fn default_utc_offset() -> String {
    "+09:00".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5001".to_string()
}

pub fn load(path: &str) -> Result<Config> {
    let path = expand_tilde(path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;

    if config.github.username.is_empty() {
        anyhow::bail!("github.username must not be empty");
    }
    if let Some(token) = &config.github.token
        && token.is_empty()
    {
        anyhow::bail!("github.token must not be empty when set (omit it to go tokenless)");
    }
    if config.line.channel_secret.is_empty() {
        anyhow::bail!("line.channel_secret must not be empty");
    }
    if config.line.channel_access_token.is_empty() {
        anyhow::bail!("line.channel_access_token must not be empty");
    }
    if config.notify.hour > 23 || config.notify.minute > 59 {
        anyhow::bail!(
            "notify.hour/minute out of range: {}:{:02}",
            config.notify.hour,
            config.notify.minute
        );
    }
    config.notify.offset()?;

    Ok(config)
}

pub async fn init_config_dir() -> Result<()> {
    let base = default_base_dir();
    tokio::fs::create_dir_all(&base).await?;

    let config_path = base.join("config.toml");
    if !config_path.exists() {
        tokio::fs::write(
            &config_path,
            r#"[line]
channel_access_token = "YOUR_CHANNEL_ACCESS_TOKEN"
channel_secret = "YOUR_CHANNEL_SECRET"

[github]
username = "your-github-username"
# token = "ghp_YOUR_TOKEN"  # optional, raises the API rate limit

[notify]
threshold = 5
hour = 21
minute = 0
utc_offset = "+09:00"

[server]
bind = "0.0.0.0:5001"
"#,
        )
        .await?;
    }

    Ok(())
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kusabot")
}

fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[line]
channel_access_token = "token"
channel_secret = "secret"

[github]
username = "octocat"
"#,
        )
        .unwrap();
        assert_eq!(cfg.notify.threshold, 5);
        assert_eq!(cfg.notify.hour, 21);
        assert_eq!(cfg.notify.minute, 0);
        assert_eq!(cfg.server.bind, "0.0.0.0:5001");
        assert!(cfg.github.token.is_none());
    }

    #[test]
    fn test_offset_parses_tokyo() {
        let notify = NotifyConfig::default();
        let offset = notify.offset().unwrap();
        assert_eq!(offset.local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_offset_parses_western() {
        let offset = parse_offset("-05:00").unwrap();
        assert_eq!(offset.local_minus_utc(), -5 * 3600);

        let offset = parse_offset("+05:45").unwrap();
        assert_eq!(offset.local_minus_utc(), 5 * 3600 + 45 * 60);
    }

    #[test]
    fn test_offset_rejects_garbage() {
        for bad in ["Asia/Tokyo", "09:00", "+9", "+24:00", "+09:60", "+0a:00", ""] {
            assert!(parse_offset(bad).is_none(), "{bad:?} should not parse");
        }

        let notify = NotifyConfig {
            utc_offset: "Asia/Tokyo".into(),
            ..NotifyConfig::default()
        };
        assert!(notify.offset().is_err());
    }

    #[test]
    fn test_load_rejects_empty_token() {
        let path = std::env::temp_dir().join("kusabot-test-empty-token.toml");
        std::fs::write(
            &path,
            r#"
[line]
channel_access_token = "token"
channel_secret = "secret"

[github]
username = "octocat"
token = ""
"#,
        )
        .unwrap();

        let result = load(path.to_str().unwrap());
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
