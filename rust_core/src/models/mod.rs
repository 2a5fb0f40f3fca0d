// Shared models for the relay services
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Lobby Language
// ============================================================================

/// Lobby language as reported by the game server (wire value 0..=15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LangName {
    English = 0,
    Latam = 1,
    Brazilian = 2,
    Portuguese = 3,
    Korean = 4,
    Russian = 5,
    Dutch = 6,
    Filipino = 7,
    French = 8,
    German = 9,
    Italian = 10,
    Japanese = 11,
    Spanish = 12,
    SChinese = 13,
    TChinese = 14,
    Irish = 15,
}

impl LangName {
    pub fn as_str(&self) -> &'static str {
        match self {
            LangName::English => "English",
            LangName::Latam => "Latam",
            LangName::Brazilian => "Brazilian",
            LangName::Portuguese => "Portuguese",
            LangName::Korean => "Korean",
            LangName::Russian => "Russian",
            LangName::Dutch => "Dutch",
            LangName::Filipino => "Filipino",
            LangName::French => "French",
            LangName::German => "German",
            LangName::Italian => "Italian",
            LangName::Japanese => "Japanese",
            LangName::Spanish => "Spanish",
            LangName::SChinese => "SChinese",
            LangName::TChinese => "TChinese",
            LangName::Irish => "Irish",
        }
    }
}

impl TryFrom<u8> for LangName {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let lang = match value {
            0 => LangName::English,
            1 => LangName::Latam,
            2 => LangName::Brazilian,
            3 => LangName::Portuguese,
            4 => LangName::Korean,
            5 => LangName::Russian,
            6 => LangName::Dutch,
            7 => LangName::Filipino,
            8 => LangName::French,
            9 => LangName::German,
            10 => LangName::Italian,
            11 => LangName::Japanese,
            12 => LangName::Spanish,
            13 => LangName::SChinese,
            14 => LangName::TChinese,
            15 => LangName::Irish,
            other => return Err(other),
        };
        Ok(lang)
    }
}

impl fmt::Display for LangName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Game Version
// ============================================================================

/// Dotted game version: `major.minor[.build[.revision]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameVersion {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

impl GameVersion {
    pub fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
            revision: Some(revision),
        }
    }
}

impl FromStr for GameVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(());
        }

        let mut nums = [0u32; 4];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            // u32::from_str accepts a leading '+', a version component does not
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(());
            }
            *slot = part.parse().map_err(|_| ())?;
        }

        Ok(Self {
            major: nums[0],
            minor: nums[1],
            build: (parts.len() > 2).then_some(nums[2]),
            revision: (parts.len() > 3).then_some(nums[3]),
        })
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
            if let Some(revision) = self.revision {
                write!(f, ".{}", revision)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Room Announcements
// ============================================================================

/// One lobby announcement from a game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub code: String,
    pub version: GameVersion,
    pub count: u32,
    pub lang_id: LangName,
    pub server_name: String,
    pub player_name: String,
}

impl Room {
    /// Multi-line summary forwarded verbatim to the bot.
    pub fn summary(&self) -> String {
        format!(
            "Code:{}\nVersion:{}\nCount:{}\nLang:{}\nServer:{}\nPlayer:{}\n",
            self.code, self.version, self.count, self.lang_id, self.server_name, self.player_name
        )
    }
}

// ============================================================================
// Anti-cheat Reports
// ============================================================================

/// A single decoded anti-cheat report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspicionReport {
    pub client_id: i32,
    pub friend_code: String,
    pub reporter_name: String,
    pub reason: String,
}

/// Aggregated suspicion state for one friend code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspicionRecord {
    pub friend_code: String,
    pub client_id: i32,
    pub reporter_name: String,
    pub reason: String,
    pub report_count: u32,
    pub banned: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl SuspicionRecord {
    pub fn from_report(report: SuspicionReport, now: DateTime<Utc>) -> Self {
        Self {
            friend_code: report.friend_code,
            client_id: report.client_id,
            reporter_name: report.reporter_name,
            reason: report.reason,
            report_count: 1,
            banned: false,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Overwrite the mutable fields with the latest report and bump the count.
    pub fn absorb(&mut self, report: SuspicionReport, now: DateTime<Utc>) {
        self.client_id = report.client_id;
        self.reporter_name = report.reporter_name;
        self.reason = report.reason;
        self.report_count = self.report_count.saturating_add(1);
        self.last_seen = now;
    }

    /// One line of the persistent ban log. Embedded line breaks in the
    /// reported fields are flattened to spaces.
    pub fn ban_log_line(&self, at: DateTime<Utc>) -> String {
        format!(
            "{} Id:{} FriendCode:{} Name:{} Reason:{} Count:{}",
            at.to_rfc3339(),
            self.client_id,
            single_line(&self.friend_code),
            single_line(&self.reporter_name),
            single_line(&self.reason),
            self.report_count
        )
    }

    /// Operator alert sent through the bot when a ban fires.
    pub fn ban_alert(&self) -> String {
        format!(
            "AddBan\nName:{}\nFriendCode:{}\nReason:{}\nCount:{}",
            self.reporter_name, self.friend_code, self.reason, self.report_count
        )
    }
}

fn single_line(field: &str) -> String {
    field.replace(['\r', '\n'], " ")
}
