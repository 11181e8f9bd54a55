//! Channels, risks and branches.
//!
//! A channel is the triple `track/risk[/branch]`. Risk order is a single
//! total order (`stable < candidate < beta < edge < available`) and every
//! comparison in the workspace goes through [`Risk::rank`] or the derived
//! `Ord`, so the rule engine and the views never disagree on it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the track every snap has.
pub const LATEST_TRACK: &str = "latest";

/// Error returned when a channel or risk string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelParseError {
    #[error("empty channel name")]
    Empty,
    #[error("unknown risk: {0}")]
    UnknownRisk(String),
    #[error("empty segment in channel name: {0}")]
    EmptySegment(String),
    #[error("too many segments in channel name: {0}")]
    TooManySegments(String),
    #[error("the available pseudo-risk cannot carry a branch: {0}")]
    AvailableBranch(String),
}

/// Trust level of a channel.
///
/// `Stable` is the most trusted risk, `Edge` the least. `Available` is the
/// pseudo-risk of revisions that are not released anywhere yet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Stable,
    Candidate,
    Beta,
    Edge,
    Available,
}

impl Risk {
    /// The four real risks, most trusted first.
    pub const RELEASABLE: [Risk; 4] = [Risk::Stable, Risk::Candidate, Risk::Beta, Risk::Edge];

    /// Position in the risk order; lower is more trusted.
    pub fn rank(self) -> u8 {
        match self {
            Risk::Stable => 0,
            Risk::Candidate => 1,
            Risk::Beta => 2,
            Risk::Edge => 3,
            Risk::Available => 4,
        }
    }

    /// Whether `self` is strictly more trusted than `other`.
    pub fn is_more_trusted_than(self, other: Risk) -> bool {
        self.rank() < other.rank()
    }

    /// Risks that refuse devmode confinement and devel grade revisions.
    pub fn requires_stable_grade(self) -> bool {
        matches!(self, Risk::Stable | Risk::Candidate)
    }

    /// Whether this is the `available` pseudo-risk.
    pub fn is_available(self) -> bool {
        self == Risk::Available
    }

    /// Wire name of the risk.
    pub fn as_str(self) -> &'static str {
        match self {
            Risk::Stable => "stable",
            Risk::Candidate => "candidate",
            Risk::Beta => "beta",
            Risk::Edge => "edge",
            Risk::Available => "available",
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Risk {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Risk::Stable),
            "candidate" => Ok(Risk::Candidate),
            "beta" => Ok(Risk::Beta),
            "edge" => Ok(Risk::Edge),
            "available" => Ok(Risk::Available),
            other => Err(ChannelParseError::UnknownRisk(other.to_string())),
        }
    }
}

/// A release channel: `track/risk[/branch]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Channel {
    track: String,
    risk: Risk,
    branch: Option<String>,
}

impl Channel {
    /// A channel without a branch.
    pub fn new(track: impl Into<String>, risk: Risk) -> Self {
        Self {
            track: track.into(),
            risk,
            branch: None,
        }
    }

    /// A branch of `track/risk`.
    pub fn branch_of(track: impl Into<String>, risk: Risk, branch: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            risk,
            branch: Some(branch.into()),
        }
    }

    /// The `available` pseudo-channel of a track.
    pub fn available(track: impl Into<String>) -> Self {
        Self::new(track, Risk::Available)
    }

    /// Parse `risk`, `risk/branch`, `track/risk` or `track/risk/branch`.
    ///
    /// A bare risk (or risk with branch) lands on the `latest` track.
    pub fn parse(s: &str) -> Result<Self, ChannelParseError> {
        if s.is_empty() {
            return Err(ChannelParseError::Empty);
        }

        let parts: Vec<&str> = s.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ChannelParseError::EmptySegment(s.to_string()));
        }

        let channel = match parts.as_slice() {
            [risk] => Channel::new(LATEST_TRACK, risk.parse()?),
            [first, second] => match first.parse::<Risk>() {
                Ok(risk) => Channel::branch_of(LATEST_TRACK, risk, *second),
                Err(_) => Channel::new(*first, second.parse()?),
            },
            [track, risk, branch] => Channel::branch_of(*track, risk.parse()?, *branch),
            _ => return Err(ChannelParseError::TooManySegments(s.to_string())),
        };

        if channel.risk.is_available() && channel.branch.is_some() {
            return Err(ChannelParseError::AvailableBranch(s.to_string()));
        }

        Ok(channel)
    }

    pub fn track(&self) -> &str {
        &self.track
    }

    pub fn risk(&self) -> Risk {
        self.risk
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Whether the channel is a time-limited branch.
    pub fn is_branch(&self) -> bool {
        self.branch.is_some()
    }

    /// Whether this is an `available` pseudo-channel.
    pub fn is_available(&self) -> bool {
        self.risk.is_available()
    }

    pub fn is_latest_track(&self) -> bool {
        self.track == LATEST_TRACK
    }

    /// The risk-level channel a branch hangs off. `None` for non-branches.
    pub fn parent(&self) -> Option<Channel> {
        self.branch
            .as_ref()
            .map(|_| Channel::new(self.track.clone(), self.risk))
    }

    /// Same track, a different risk, no branch.
    pub fn with_risk(&self, risk: Risk) -> Channel {
        Channel::new(self.track.clone(), risk)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{}/{}/{}", self.track, self.risk, branch),
            None => write!(f, "{}/{}", self.track, self.risk),
        }
    }
}

impl FromStr for Channel {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::parse(s)
    }
}

impl TryFrom<String> for Channel {
    type Error = ChannelParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Channel::parse(&value)
    }
}

impl From<Channel> for String {
    fn from(value: Channel) -> Self {
        value.to_string()
    }
}

/// Canonical ordering: `latest` track first, then tracks by name; within a
/// track by risk; a risk before its branches, branches by name.
impl Ord for Channel {
    fn cmp(&self, other: &Self) -> Ordering {
        track_order(&self.track, &other.track)
            .then(self.risk.cmp(&other.risk))
            .then_with(|| match (&self.branch, &other.branch) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Channel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Order two track names: `latest` first, the rest by name.
pub fn track_order(a: &str, b: &str) -> Ordering {
    (a != LATEST_TRACK)
        .cmp(&(b != LATEST_TRACK))
        .then_with(|| a.cmp(b))
}

/// A time-limited branch channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub channel: Channel,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Branch {
    /// A branch opened at `created_at` that lives for `lifetime`.
    pub fn new(channel: Channel, created_at: DateTime<Utc>, lifetime: TimeDelta) -> Self {
        Self {
            channel,
            created_at,
            expires_at: created_at + lifetime,
        }
    }

    /// A branch is visible strictly before its expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
