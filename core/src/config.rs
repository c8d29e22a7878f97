/// Configuration management
use crate::error::{ChatError, Result};
use crate::view::ClockStyle;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const FAST_DIVISOR: u32 = 10;

/// Timing, probability and canned-content settings for conversation sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Simulated history load on open
    pub load_delay: Duration,

    /// Presence tick interval
    pub presence_interval: Duration,

    /// Chance that a presence tick starts a typing episode (0.0 to 1.0)
    pub presence_probability: f64,

    /// Bounds of a presence typing episode
    pub presence_typing_min: Duration,
    pub presence_typing_max: Duration,

    /// Delay between a local send and the remote starting to type
    pub reply_typing_delay_min: Duration,
    pub reply_typing_delay_max: Duration,

    /// Length of the typing window before the reply lands
    pub reply_delay_min: Duration,
    pub reply_delay_max: Duration,

    /// Fixed delay before an attachment acknowledgement
    pub attachment_ack_delay: Duration,

    /// Fixed delay of a pull-to-refresh
    pub refresh_delay: Duration,

    /// Canned replies, picked uniformly
    pub reply_pool: Vec<String>,

    /// Messages injected by refresh, picked uniformly
    pub refresh_pool: Vec<String>,

    pub image_ack_text: String,
    pub file_ack_text: String,

    /// Seed for reproducible timing and reply choice (entropy when unset)
    pub rng_seed: Option<u64>,

    pub clock_style: ClockStyle,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            load_delay: Duration::from_millis(300),
            presence_interval: Duration::from_secs(15),
            presence_probability: 0.3,
            presence_typing_min: Duration::from_secs(2),
            presence_typing_max: Duration::from_secs(4),
            reply_typing_delay_min: Duration::from_millis(500),
            reply_typing_delay_max: Duration::from_millis(1500),
            reply_delay_min: Duration::from_millis(1000),
            reply_delay_max: Duration::from_millis(3000),
            attachment_ack_delay: Duration::from_millis(1000),
            refresh_delay: Duration::from_millis(1500),
            reply_pool: vec![
                "Thanks for reaching out! I'll review this and get back to you shortly.".to_string(),
                "That sounds great. Would you be available for a quick call this week?".to_string(),
                "Could you share a bit more about your experience with this stack?".to_string(),
                "Perfect, I'll forward your profile to the hiring manager.".to_string(),
                "Got it! The team is still reviewing applications for this role.".to_string(),
                "Thanks! Let me check the schedule and confirm a time.".to_string(),
            ],
            refresh_pool: vec![
                "Just following up on our last conversation.".to_string(),
                "Any updates on your side?".to_string(),
                "We have a new opening that might interest you.".to_string(),
            ],
            image_ack_text: "Thanks for the image! I'll take a look.".to_string(),
            file_ack_text: "Thanks for sending the document! I'll review it and get back to you."
                .to_string(),
            rng_seed: None,
            clock_style: ClockStyle::TwelveHour,
        }
    }
}

impl ChatConfig {
    /// Load a JSON config file; absent fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ChatConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Same behaviour with every delay divided by ten (demo mode)
    pub fn fast(mut self) -> Self {
        for d in [
            &mut self.load_delay,
            &mut self.presence_interval,
            &mut self.presence_typing_min,
            &mut self.presence_typing_max,
            &mut self.reply_typing_delay_min,
            &mut self.reply_typing_delay_max,
            &mut self.reply_delay_min,
            &mut self.reply_delay_max,
            &mut self.attachment_ack_delay,
            &mut self.refresh_delay,
        ] {
            *d /= FAST_DIVISOR;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let ranges = [
            ("presence_typing", self.presence_typing_min, self.presence_typing_max),
            ("reply_typing_delay", self.reply_typing_delay_min, self.reply_typing_delay_max),
            ("reply_delay", self.reply_delay_min, self.reply_delay_max),
        ];
        for (name, min, max) in ranges {
            if min > max {
                return Err(ChatError::Config(format!(
                    "{}_min ({:?}) exceeds {}_max ({:?})",
                    name, min, name, max
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.presence_probability) {
            return Err(ChatError::Config(format!(
                "presence_probability must be within [0, 1], got {}",
                self.presence_probability
            )));
        }

        if self.presence_interval.is_zero() {
            return Err(ChatError::Config(
                "presence_interval must be non-zero".to_string(),
            ));
        }

        if self.reply_pool.is_empty() {
            return Err(ChatError::Config("reply_pool is empty".to_string()));
        }
        if self.refresh_pool.is_empty() {
            return Err(ChatError::Config("refresh_pool is empty".to_string()));
        }

        Ok(())
    }
}

/// Options for the `convo` binary
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub participant_id: String,
    pub chat: ChatConfig,
}

impl LaunchOptions {
    /// Create options from command line arguments
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() < 2 {
            return Err(ChatError::Config(format!(
                "Usage: {} <participant_id> [--seed <n>] [--config <path>] [--fast] [--24h]",
                args.first().map(String::as_str).unwrap_or("convo")
            )));
        }

        let participant_id = args[1].clone();
        let mut seed: Option<u64> = None;
        let mut config_path: Option<PathBuf> = None;
        let mut fast = false;
        let mut twenty_four_hour = false;

        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--seed" => {
                    let s = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--seed requires a number".to_string())
                    })?;
                    seed = Some(s.parse::<u64>().map_err(|_| {
                        ChatError::Config("--seed must be a non-negative integer".to_string())
                    })?);
                    i += 2;
                }
                "--config" => {
                    let path = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--config requires a path argument".to_string())
                    })?;
                    config_path = Some(PathBuf::from(path));
                    i += 2;
                }
                "--fast" => {
                    fast = true;
                    i += 1;
                }
                "--24h" => {
                    twenty_four_hour = true;
                    i += 1;
                }
                other => {
                    return Err(ChatError::Config(format!("Unknown argument: {}", other)));
                }
            }
        }

        // Env overrides (nice for scripts)
        if let Some(s) = std::env::var("CONVO_SEED")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            seed = Some(s);
        }
        if std::env::var("CONVO_FAST").is_ok() {
            fast = true;
        }

        let mut chat = match config_path {
            Some(path) => ChatConfig::from_file(&path)?,
            None => ChatConfig::default(),
        };
        if seed.is_some() {
            chat.rng_seed = seed;
        }
        if twenty_four_hour {
            chat.clock_style = ClockStyle::TwentyFourHour;
        }
        if fast {
            chat = chat.fast();
        }
        chat.validate()?;

        Ok(Self {
            participant_id,
            chat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ChatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let config = ChatConfig {
            reply_delay_min: Duration::from_secs(5),
            reply_delay_max: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ChatError::Config(_))));
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        let config = ChatConfig {
            presence_probability: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ChatError::Config(_))));
    }

    #[test]
    fn test_empty_reply_pool_rejected() {
        let config = ChatConfig {
            reply_pool: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_keeps_defaults_for_missing_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"presence_probability": 0.0, "rng_seed": 7, "reply_pool": ["ok"]}}"#
        )
        .unwrap();

        let config = ChatConfig::from_file(file.path()).unwrap();
        assert_eq!(config.presence_probability, 0.0);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.reply_pool, vec!["ok".to_string()]);
        assert_eq!(config.refresh_delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_from_file_rejects_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            ChatConfig::from_file(file.path()),
            Err(ChatError::Serialization(_))
        ));
    }

    #[test]
    fn test_fast_divides_delays() {
        let config = ChatConfig::default().fast();
        assert_eq!(config.presence_interval, Duration::from_millis(1500));
        assert_eq!(config.reply_delay_max, Duration::from_millis(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_args() {
        let opts = LaunchOptions::from_args(&args(&["convo", "recruiter-1", "--seed", "42", "--24h"]))
            .unwrap();
        assert_eq!(opts.participant_id, "recruiter-1");
        assert_eq!(opts.chat.rng_seed, Some(42));
        assert_eq!(opts.chat.clock_style, ClockStyle::TwentyFourHour);
    }

    #[test]
    fn test_from_args_requires_participant() {
        assert!(LaunchOptions::from_args(&args(&["convo"])).is_err());
        assert!(LaunchOptions::from_args(&args(&["convo", "x", "--seed"])).is_err());
        assert!(LaunchOptions::from_args(&args(&["convo", "x", "--bogus"])).is_err());
    }
}
