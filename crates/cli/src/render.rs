//! Console rendering helpers

use chrono::DateTime;
use schemeauth_common::TokenRecord;

/// Token lifetime as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid { remaining: i64 },
    /// Inside the refresh buffer; the next `access-token` call refreshes
    Expiring { remaining: i64 },
    Expired,
    /// No expiry recorded
    Unknown,
}

impl Validity {
    pub fn of(record: &TokenRecord, now: i64, buffer_secs: i64) -> Self {
        match record.seconds_until_expiry(now) {
            None => Self::Unknown,
            Some(remaining) if remaining <= 0 => Self::Expired,
            Some(remaining) if remaining < buffer_secs => Self::Expiring { remaining },
            Some(remaining) => Self::Valid { remaining },
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Valid { remaining } => format!("valid ({} remaining)", duration(remaining)),
            Self::Expiring { remaining } => {
                format!("expiring ({} remaining, will refresh)", duration(remaining))
            }
            Self::Expired => "expired".to_string(),
            Self::Unknown => "unknown expiry (will refresh)".to_string(),
        }
    }
}

/// Keep enough of a secret to tell tokens apart, nothing more.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 16 {
        return "*".repeat(chars.len().min(8));
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub fn timestamp(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map_or_else(|| epoch_secs.to_string(), |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

pub fn duration(secs: i64) -> String {
    let secs = secs.max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

/// Label/value rows for `token`; secrets are masked.
pub fn token_rows(record: &TokenRecord, now: i64, buffer_secs: i64) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Access token", mask(&record.access_token)),
        (
            "Refresh token",
            record.refresh_token.as_deref().map_or_else(|| "none".to_string(), mask),
        ),
        ("Token type", record.token_type.clone()),
    ];
    if let Some(saved_at) = record.saved_at {
        rows.push(("Saved", timestamp(saved_at)));
    }
    if let Some(expires_at) = record.expires_at {
        rows.push(("Expires", timestamp(expires_at)));
    }
    rows.push(("Status", Validity::of(record, now, buffer_secs).label()));
    rows
}

pub fn print_rows(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("  {label:<width$}  {value}");
    }
}
