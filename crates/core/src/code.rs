//! Product codes and the closed tag set embedded in their first character.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Product family encoded by the first character of a [`ProductCode`].
///
/// The tag set is closed: `L`, `C`, `R`, `S` are component families and
/// `M`, `P` are boxed-set families. Any other leading character means the
/// code belongs to no known composite kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    /// `L` — locomotive component.
    Locomotive,
    /// `C` — controller component.
    Controller,
    /// `R` — track component.
    Track,
    /// `S` — generic accessory component (no variant table of its own).
    Accessory,
    /// `M` — boxed train set.
    TrainSet,
    /// `P` — boxed track pack.
    TrackPack,
}

impl ProductKind {
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'L' => Some(Self::Locomotive),
            'C' => Some(Self::Controller),
            'R' => Some(Self::Track),
            'S' => Some(Self::Accessory),
            'M' => Some(Self::TrainSet),
            'P' => Some(Self::TrackPack),
            _ => None,
        }
    }

    pub fn tag(&self) -> char {
        match self {
            Self::Locomotive => 'L',
            Self::Controller => 'C',
            Self::Track => 'R',
            Self::Accessory => 'S',
            Self::TrainSet => 'M',
            Self::TrackPack => 'P',
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(
            self,
            Self::Locomotive | Self::Controller | Self::Track | Self::Accessory
        )
    }

    pub fn is_boxed_set(&self) -> bool {
        matches!(self, Self::TrainSet | Self::TrackPack)
    }
}

/// Immutable catalog product code. Non-empty; the first character carries
/// the product's family tag (see [`ProductKind`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(String);

impl ProductCode {
    pub fn new(code: impl Into<String>) -> Result<Self, DomainError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(DomainError::validation("product code cannot be empty"));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Family tag of this code, or `None` for an unclassified prefix.
    pub fn kind(&self) -> Option<ProductKind> {
        self.0.chars().next().and_then(ProductKind::from_tag)
    }

    pub fn is_component(&self) -> bool {
        self.kind().is_some_and(|k| k.is_component())
    }

    pub fn is_boxed_set(&self) -> bool {
        self.kind().is_some_and(|k| k.is_boxed_set())
    }
}

impl core::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProductCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
