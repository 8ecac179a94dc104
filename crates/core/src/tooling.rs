//! Tool magazine and coolant sub-entities of milling and turning centers.

use serde::{Deserialize, Serialize};

pub const TOOL_MAX_LIFE: f64 = 100.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolType {
    Drill,
    EndMill,
    FaceMill,
    Reamer,
    Tap,
    BoringBar,
}

impl ToolType {
    pub const ALL: [ToolType; 6] = [
        ToolType::Drill,
        ToolType::EndMill,
        ToolType::FaceMill,
        ToolType::Reamer,
        ToolType::Tap,
        ToolType::BoringBar,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Coating {
    TiN,
    TiCN,
    AlTiN,
    Uncoated,
}

impl Coating {
    pub const ALL: [Coating; 4] = [Coating::TiN, Coating::TiCN, Coating::AlTiN, Coating::Uncoated];
}

/// One magazine pocket. `current_life` is the remaining life in percent; it only
/// ever goes down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolSlot {
    pub number: u16,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub diameter: f64,
    pub length: f64,
    pub current_life: f64,
    pub max_life: f64,
    pub flutes: u8,
    pub coating: Coating,
    pub description: String,
    pub in_use: bool,
    pub total_cuts: u64,
}

impl ToolSlot {
    /// Take up to `amount` percent of life off the tool, never below zero.
    pub fn consume_life(&mut self, amount: f64) {
        self.current_life = (self.current_life - amount.max(0.0)).max(0.0);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coolant {
    /// Tank level in percent.
    pub level: f64,
    pub pressure: f64,
    pub temperature: f64,
    pub flow: f64,
}

impl Default for Coolant {
    fn default() -> Self {
        Self {
            level: 100.0,
            pressure: 50.0,
            temperature: 72.0,
            flow: 0.0,
        }
    }
}
