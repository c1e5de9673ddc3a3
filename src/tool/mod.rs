mod controller;

use kurbo::Point;
use serde::{Deserialize, Serialize};

pub use controller::{PointerOutcome, ToolController};

use crate::page::PageNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Select,
    Pan,
    Draw,
    Erase,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Select, Tool::Pan, Tool::Draw, Tool::Erase];

    pub fn id(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Pan => "pan",
            Self::Draw => "draw",
            Self::Erase => "erase",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.id() == value)
    }

    pub fn edits_surface(self) -> bool {
        matches!(self, Self::Draw | Self::Erase)
    }
}

/// Pointer position already mapped into one page's raster space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePoint {
    pub page: PageNumber,
    pub raster: Point,
}

impl PagePoint {
    pub fn new(page: PageNumber, raster: Point) -> Self {
        Self { page, raster }
    }
}
