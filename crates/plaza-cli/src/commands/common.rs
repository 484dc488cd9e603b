use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use plaza_core::alerts::{AlertKind, Notifier};
use plaza_core::config::{default_config_path, ClientConfig};
use plaza_core::gateway::Fault;
use plaza_core::models::{
    Download, Friend, HistoryEntry, MediaItem, Notification, Post, Profile, Session,
};
use plaza_core::AppServices;
use serde::Serialize;

use crate::error::CliError;

const SIMULATED_FAILURE: &str = "Simulated server failure (--fail)";

/// Flags shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub fail: bool,
    pub json: bool,
}

/// Prints alerts to stderr and counts them so the final error is not
/// reported twice.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    shown: AtomicUsize,
}

impl ConsoleNotifier {
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    /// Handle the stores raise alerts through; counts stay visible here.
    pub fn shared(self: &Arc<Self>) -> Arc<dyn Notifier> {
        self.clone()
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: AlertKind, title: &str, message: &str) {
        self.shown.fetch_add(1, Ordering::SeqCst);
        eprintln!("{}", format_alert(kind, title, message));
    }
}

pub fn format_alert(kind: AlertKind, title: &str, message: &str) -> String {
    let marker = match kind {
        AlertKind::Success => "ok",
        AlertKind::Info => "--",
        AlertKind::Warning => "!",
        AlertKind::Error => "x",
    };
    format!("[{marker}] {title}: {message}")
}

/// Services plus the flags that shape output.
pub struct AppContext {
    pub services: AppServices,
    pub config: ClientConfig,
    pub json: bool,
    fail: bool,
}

impl AppContext {
    /// Load config, build services and restore the previous session.
    pub fn open(options: &GlobalOptions, notifier: Arc<dyn Notifier>) -> Result<Self, CliError> {
        let config = load_config(options.config.as_deref(), options.data_dir.as_deref())?;
        let services = AppServices::from_config(&config, notifier)?;
        services.restore()?;
        Ok(Self {
            services,
            config,
            json: options.json,
            fail: options.fail,
        })
    }

    /// Under `--fail`, make every later gateway call fail. Called after the
    /// initial fetch so there is state to roll back.
    pub fn arm_failure(&self) {
        if self.fail {
            tracing::debug!("Injecting gateway failures");
            self.services
                .backend
                .fail_always(Fault::Envelope(SIMULATED_FAILURE.to_string()));
        }
    }

    pub fn require_session(&self) -> Result<Session, CliError> {
        self.services
            .session
            .current()
            .ok_or(CliError::NotSignedIn)
    }
}

pub fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf, CliError> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(default_config_path()?),
    }
}

/// Config file, then environment, then command-line overrides.
pub fn load_config(path: Option<&Path>, data_dir: Option<&Path>) -> Result<ClientConfig, CliError> {
    let path = resolve_config_path(path)?;
    let mut config = ClientConfig::load_from_path(&path)?;
    config.apply_env()?;
    if let Some(dir) = data_dir {
        config.data_dir = Some(dir.to_path_buf());
    }
    Ok(config)
}

pub fn join_words(parts: &[String]) -> Option<String> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format_timestamp(timestamp_ms)
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms).single().map_or_else(
        || timestamp_ms.to_string(),
        |time| time.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let mut truncated = collapsed
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn format_post_lines(posts: &[Post], now_ms: i64) -> Vec<String> {
    posts
        .iter()
        .map(|post| {
            let mark = if post.liked { "*" } else { " " };
            format!(
                "{:<13}  @{:<10}  {:<40}  {mark}{:>4} likes  {:>3} comments  {}",
                short_id(post.id.as_str()),
                post.author.handle,
                truncate(&post.preview(80), 40),
                post.likes,
                post.comments,
                format_relative_time(post.created_at, now_ms),
            )
        })
        .collect()
}

pub fn format_friend_lines(friends: &[Friend]) -> Vec<String> {
    friends
        .iter()
        .map(|friend| {
            let star = if friend.favorite { "*" } else { " " };
            let status = if friend.online { "online" } else { "offline" };
            format!(
                "{star} {:<12}  {:<22}  {status}",
                friend.id, friend.display_name
            )
        })
        .collect()
}

pub fn format_notification_lines(notifications: &[Notification], now_ms: i64) -> Vec<String> {
    notifications
        .iter()
        .map(|notification| {
            let dot = if notification.unread { "*" } else { " " };
            format!(
                "{dot} {:<6}  {:<18}  {:<36}  {}",
                notification.id,
                notification.kind.icon(),
                truncate(&notification.title, 36),
                format_relative_time(notification.created_at, now_ms),
            )
        })
        .collect()
}

pub fn format_profile(profile: &Profile) -> Vec<String> {
    let mut lines = vec![
        format!("{} (@{})", profile.display_name, profile.handle),
        format!(
            "{} followers, {} following{}",
            profile.followers,
            profile.following,
            if profile.followed_by_me {
                ", you follow"
            } else {
                ""
            }
        ),
    ];
    if !profile.bio.is_empty() {
        lines.push(profile.bio.clone());
    }
    if let Some(avatar) = &profile.avatar_url {
        lines.push(format!("avatar: {avatar}"));
    }
    lines
}

pub fn format_media_lines(items: &[MediaItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let mark = if item.in_my_list { "+" } else { " " };
            format!(
                "{mark} {:<5}  {:<24}  {:<7}  {}",
                item.id,
                truncate(&item.title, 24),
                item.kind.label(),
                format_duration(item.duration_secs),
            )
        })
        .collect()
}

pub fn format_history_lines(entries: &[HistoryEntry], now_ms: i64) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{:<24}  {}",
                truncate(&entry.title, 24),
                format_relative_time(entry.watched_at, now_ms)
            )
        })
        .collect()
}

pub fn format_download_lines(downloads: &[Download]) -> Vec<String> {
    downloads
        .iter()
        .map(|download| {
            format!(
                "{:<5}  {:<24}  {:<11}  {}",
                download.id,
                truncate(&download.title, 24),
                download.status.label(),
                format_bytes(download.size_bytes),
            )
        })
        .collect()
}

pub fn format_duration(seconds: u32) -> String {
    let minutes = seconds / 60;
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
