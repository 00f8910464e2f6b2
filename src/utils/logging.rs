//! Structured Logging with Sensitive Data Redaction
//!
//! Every stage logs through the `log_*!` macros. Field values are redacted by key:
//! - Passphrases, seeds, secrets and keystore blobs are never printed
//! - Addresses are shortened to prefix and suffix
//! - Hex artifacts (payloads, signatures, envelopes, hashes) are shortened

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag to enable/disable debug logging
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable debug logging
pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

/// Disable debug logging
pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field (auto-redacts by key)
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let redacted = redact_if_sensitive(key, &value.to_string());
        self.fields.push((key, redacted));
        self
    }

    /// Render the entry as a single line, without the timestamp
    pub fn render(&self) -> String {
        let mut line = format!("{} [{}] {}", self.level, self.module, self.message);
        if !self.fields.is_empty() {
            let fields = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            line.push_str(" | ");
            line.push_str(&fields);
        }
        line
    }

    /// Write the entry to stderr
    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

fn redact_if_sensitive(key: &str, value: &str) -> String {
    let key_lower = key.to_lowercase();

    const SECRET_KEYS: [&str; 6] = ["passphrase", "password", "seed", "secret", "keystore", "mnemonic"];
    if SECRET_KEYS.iter().any(|k| key_lower.contains(k)) {
        return redact_value(value);
    }

    const ADDRESS_KEYS: [&str; 4] = ["address", "sender", "signer", "dest"];
    if ADDRESS_KEYS.iter().any(|k| key_lower.contains(k)) {
        return shorten(value, 6, 4);
    }

    const BLOB_KEYS: [&str; 5] = ["payload", "signature", "envelope", "hash", "call_hex"];
    if BLOB_KEYS.iter().any(|k| key_lower.contains(k)) {
        let prefix = if value.starts_with("0x") { 12 } else { 10 };
        return shorten(value, prefix, 6);
    }

    value.to_string()
}

fn redact_value(value: &str) -> String {
    if value.is_empty() {
        "[EMPTY]".to_string()
    } else {
        "[REDACTED]".to_string()
    }
}

/// Keep `prefix` leading and `suffix` trailing chars; short values pass through.
fn shorten(value: &str, prefix: usize, suffix: usize) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }
    if !trimmed.is_ascii() || trimmed.len() <= prefix + suffix + 3 {
        return trimmed.to_string();
    }
    format!("{}...{}", &trimmed[..prefix], &trimmed[trimmed.len() - suffix..])
}

/// Convenience macro for debug logging
#[macro_export]
macro_rules! log_debug {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for info logging
#[macro_export]
macro_rules! log_info {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for warning logging
#[macro_export]
macro_rules! log_warn {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for error logging
#[macro_export]
macro_rules! log_error {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_fully_redacted() {
        assert_eq!(redact_if_sensitive("passphrase", "hunter2"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("seed_hex", ""), "[EMPTY]");
        assert_eq!(redact_if_sensitive("encoded_keystore", "{...}"), "[REDACTED]");
    }

    #[test]
    fn test_addresses_shortened() {
        let alice = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
        assert_eq!(redact_if_sensitive("sender", alice), "5Grwva...utQY");
        assert_eq!(redact_if_sensitive("address", "short"), "short");
    }

    #[test]
    fn test_blobs_shortened() {
        let hash = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        let shown = redact_if_sensitive("tx_hash", hash);
        assert!(shown.starts_with("0x1234567890"));
        assert!(shown.ends_with("abcdef"));
        assert!(shown.contains("..."));
    }

    #[test]
    fn test_plain_fields_untouched() {
        assert_eq!(redact_if_sensitive("nonce", "7"), "7");
        assert_eq!(redact_if_sensitive("method", "Balances.transfer_keep_alive"), "Balances.transfer_keep_alive");
    }

    #[test]
    fn test_render() {
        let entry = LogEntry::new(LogLevel::Warn, "payload", "nonce unavailable")
            .field("nonce", 0)
            .field("passphrase", "x");
        assert_eq!(entry.render(), "WARN [payload] nonce unavailable | nonce=0 passphrase=[REDACTED]");
    }
}
