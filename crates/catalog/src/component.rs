//! Atomic catalog components and their closed attribute enums.
//!
//! Each enum round-trips through the store as its canonical upper-case
//! string; an unknown stored value is a validation failure on read.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use railshop_core::{DomainError, ProductKind};

use crate::product::Product;

/// Model-railway gauge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gauge {
    N,
    OO,
    O,
    TT,
}

impl Gauge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::N => "N",
            Self::OO => "OO",
            Self::O => "O",
            Self::TT => "TT",
        }
    }
}

impl FromStr for Gauge {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N" => Ok(Self::N),
            "OO" => Ok(Self::OO),
            "O" => Ok(Self::O),
            "TT" => Ok(Self::TT),
            other => Err(DomainError::validation(format!("unknown gauge [{other}]"))),
        }
    }
}

/// Locomotive price bracket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBracket {
    Budget,
    Standard,
    Premium,
}

impl PriceBracket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "BUDGET",
            Self::Standard => "STANDARD",
            Self::Premium => "PREMIUM",
        }
    }
}

impl FromStr for PriceBracket {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUDGET" => Ok(Self::Budget),
            "STANDARD" => Ok(Self::Standard),
            "PREMIUM" => Ok(Self::Premium),
            other => Err(DomainError::validation(format!(
                "unknown price bracket [{other}]"
            ))),
        }
    }
}

/// Controller control type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    Analogue,
    Digital,
}

impl ControlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analogue => "ANALOGUE",
            Self::Digital => "DIGITAL",
        }
    }
}

impl FromStr for ControlType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANALOGUE" => Ok(Self::Analogue),
            "DIGITAL" => Ok(Self::Digital),
            other => Err(DomainError::validation(format!(
                "unknown control type [{other}]"
            ))),
        }
    }
}

/// Track piece curvature.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curvature {
    Straight,
    FirstRadius,
    SecondRadius,
    ThirdRadius,
}

impl Curvature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Straight => "STRAIGHT",
            Self::FirstRadius => "FIRST_RADIUS",
            Self::SecondRadius => "SECOND_RADIUS",
            Self::ThirdRadius => "THIRD_RADIUS",
        }
    }
}

impl FromStr for Curvature {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRAIGHT" => Ok(Self::Straight),
            "FIRST_RADIUS" => Ok(Self::FirstRadius),
            "SECOND_RADIUS" => Ok(Self::SecondRadius),
            "THIRD_RADIUS" => Ok(Self::ThirdRadius),
            other => Err(DomainError::validation(format!(
                "unknown curvature [{other}]"
            ))),
        }
    }
}

/// Attributes shared by every component family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub product: Product,
    pub brand: String,
    pub era: String,
    pub gauge: Gauge,
}

/// An atomic catalog component, tagged by family.
///
/// The variant is determined by the product code's leading tag; the
/// variant-specific attribute comes from the family's own table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Locomotive {
        info: ComponentInfo,
        price_bracket: PriceBracket,
    },
    Controller {
        info: ComponentInfo,
        control_type: ControlType,
    },
    Track {
        info: ComponentInfo,
        curvature: Curvature,
    },
    Accessory {
        info: ComponentInfo,
    },
}

impl Component {
    pub fn info(&self) -> &ComponentInfo {
        match self {
            Self::Locomotive { info, .. }
            | Self::Controller { info, .. }
            | Self::Track { info, .. }
            | Self::Accessory { info } => info,
        }
    }

    pub fn product(&self) -> &Product {
        &self.info().product
    }

    pub fn kind(&self) -> ProductKind {
        match self {
            Self::Locomotive { .. } => ProductKind::Locomotive,
            Self::Controller { .. } => ProductKind::Controller,
            Self::Track { .. } => ProductKind::Track,
            Self::Accessory { .. } => ProductKind::Accessory,
        }
    }
}
