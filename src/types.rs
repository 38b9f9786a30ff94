use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastMode {
    #[default]
    Default,
    Sticky,
}

impl ToastMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Sticky => "sticky",
        }
    }
}

impl Display for ToastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "sticky" => Ok(Self::Sticky),
            other => Err(format!("unknown toast mode: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        })
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ltr" => Ok(Self::Ltr),
            "rtl" => Ok(Self::Rtl),
            other => Err(format!("unknown layout direction: {other}")),
        }
    }
}

/// Why a toast closed; handed to `on_close`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseReason {
    Timer,
    Manual,
    Action,
}

impl Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Timer => "timer",
            Self::Manual => "manual",
            Self::Action => "action",
        })
    }
}

/// Display role of a toast inside its container's stack.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Active,
    Secondary,
    Tertiary,
    Hidden,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::Hidden => "hidden",
        })
    }
}

/// State carried by a per-toast directive on the event channel.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackState {
    Activate,
    Secondary,
    Tertiary,
    Hide,
    Remove,
}

impl StackState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::Hide => "hide",
            Self::Remove => "remove",
        }
    }
}

impl From<Role> for StackState {
    fn from(role: Role) -> Self {
        match role {
            Role::Active => Self::Activate,
            Role::Secondary => Self::Secondary,
            Role::Tertiary => Self::Tertiary,
            Role::Hidden => Self::Hide,
        }
    }
}

impl Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StackState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "activate" | "active" => Ok(Self::Activate),
            "secondary" => Ok(Self::Secondary),
            "tertiary" => Ok(Self::Tertiary),
            "hide" | "hidden" => Ok(Self::Hide),
            "remove" => Ok(Self::Remove),
            other => Err(format!("unknown stack state: {other}")),
        }
    }
}
