use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Stroke {
    Free,
    Back,
    Breast,
    Fly,
    #[serde(rename = "IM")]
    Im,
}

impl Stroke {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Back => "Back",
            Self::Breast => "Breast",
            Self::Fly => "Fly",
            Self::Im => "IM",
        }
    }
}

impl FromStr for Stroke {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" | "freestyle" => Ok(Self::Free),
            "back" | "backstroke" => Ok(Self::Back),
            "breast" | "breaststroke" => Ok(Self::Breast),
            "fly" | "butterfly" => Ok(Self::Fly),
            "im" | "individual medley" => Ok(Self::Im),
            _ => Err(StorageError::invalid_filter(format!(
                "unknown stroke '{}', expected one of Free, Back, Breast, Fly, IM",
                s
            ))),
        }
    }
}

impl fmt::Display for Stroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pool configuration an event was swum in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Course {
    /// Short course yards
    Scy,
    /// Short course meters
    Scm,
    /// Long course meters
    Lcm,
}

impl Course {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scy => "SCY",
            Self::Scm => "SCM",
            Self::Lcm => "LCM",
        }
    }
}

impl FromStr for Course {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SCY" => Ok(Self::Scy),
            "SCM" => Ok(Self::Scm),
            "LCM" => Ok(Self::Lcm),
            _ => Err(StorageError::invalid_filter(format!(
                "unknown course '{}', expected SCY, SCM or LCM",
                s
            ))),
        }
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Gender {
    M,
    F,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M => "M",
            Self::F => "F",
        }
    }
}

impl FromStr for Gender {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "M" | "MALE" | "MEN" => Ok(Self::M),
            "F" | "FEMALE" | "WOMEN" => Ok(Self::F),
            _ => Err(StorageError::invalid_filter("gender must be 'M', 'F' or 'all'")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distances swum in sanctioned pool events.
pub const EVENT_DISTANCES: [u16; 10] = [25, 50, 100, 200, 400, 500, 800, 1000, 1500, 1650];
