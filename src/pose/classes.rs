use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Output space of the pose classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoseClass {
    Chair,
    Cobra,
    Dog,
    #[serde(rename = "No_Pose")]
    NoPose,
    Shoulderstand,
    Triangle,
    Tree,
    Warrior,
}

pub const CLASS_COUNT: usize = 8;

impl PoseClass {
    /// Poses a user can pick as a target, in menu order.
    pub const SELECTABLE: [PoseClass; 7] = [
        PoseClass::Tree,
        PoseClass::Chair,
        PoseClass::Cobra,
        PoseClass::Warrior,
        PoseClass::Dog,
        PoseClass::Shoulderstand,
        PoseClass::Triangle,
    ];

    /// Position of this class in the classifier's probability vector.
    pub fn class_index(self) -> usize {
        match self {
            PoseClass::Chair => 0,
            PoseClass::Cobra => 1,
            PoseClass::Dog => 2,
            PoseClass::NoPose => 3,
            PoseClass::Shoulderstand => 4,
            PoseClass::Triangle => 5,
            PoseClass::Tree => 6,
            PoseClass::Warrior => 7,
        }
    }

    pub fn is_selectable(self) -> bool {
        self != PoseClass::NoPose
    }

    pub fn intensity(self) -> Intensity {
        match self {
            PoseClass::Tree | PoseClass::Chair => Intensity::Light,
            PoseClass::Cobra | PoseClass::Dog | PoseClass::Triangle => Intensity::Medium,
            PoseClass::Warrior | PoseClass::Shoulderstand => Intensity::Intense,
            PoseClass::NoPose => Intensity::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoseClass::Chair => "Chair",
            PoseClass::Cobra => "Cobra",
            PoseClass::Dog => "Dog",
            PoseClass::NoPose => "No_Pose",
            PoseClass::Shoulderstand => "Shoulderstand",
            PoseClass::Triangle => "Triangle",
            PoseClass::Tree => "Tree",
            PoseClass::Warrior => "Warrior",
        }
    }
}

impl fmt::Display for PoseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoseClass {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "chair" => Ok(PoseClass::Chair),
            "cobra" => Ok(PoseClass::Cobra),
            "dog" => Ok(PoseClass::Dog),
            "no_pose" => Ok(PoseClass::NoPose),
            "shoulderstand" => Ok(PoseClass::Shoulderstand),
            // Older model metadata spells it this way.
            "triangle" | "traingle" => Ok(PoseClass::Triangle),
            "tree" => Ok(PoseClass::Tree),
            "warrior" => Ok(PoseClass::Warrior),
            other => Err(anyhow!("unknown pose '{other}'")),
        }
    }
}

/// Effort category used for calorie estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intensity {
    Light,
    Medium,
    Intense,
}

impl Intensity {
    pub fn calories_per_minute(self) -> f64 {
        match self {
            Intensity::Light => 2.5,
            Intensity::Medium => 4.5,
            Intensity::Intense => 6.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intensity::Light => "light",
            Intensity::Medium => "medium",
            Intensity::Intense => "intense",
        }
    }
}

impl FromStr for Intensity {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "light" => Ok(Intensity::Light),
            "medium" => Ok(Intensity::Medium),
            "intense" => Ok(Intensity::Intense),
            other => Err(anyhow!("unknown intensity '{other}'")),
        }
    }
}
