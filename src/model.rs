use std::collections::BTreeMap;

use image::Rgba;
use serde::{Deserialize, Serialize};

/// `user_id -> label` for one chip category, in display order of the ids.
pub type ChipEntries = BTreeMap<String, String>;

/// Chip lists of one boss keyed by category name.
pub type CategorizedChips = BTreeMap<String, ChipEntries>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChipInput {
    pub user_id: String,
    pub display_name: String,
}

impl UserChipInput {
    pub fn from_entries(entries: &ChipEntries) -> Vec<Self> {
        entries
            .iter()
            .map(|(user_id, display_name)| Self {
                user_id: user_id.clone(),
                display_name: display_name.clone(),
            })
            .collect()
    }
}

/// Snapshot of one boss at the time of rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossStatus {
    #[serde(default)]
    pub stage: Option<u32>,
    pub round: u32,
    pub current_hp: i64,
    /// Must be positive.
    pub max_hp: i64,
    pub name: String,
    pub icon_id: String,
    #[serde(default)]
    pub categorized_chips: CategorizedChips,
}

/// A labelled number in the left column of a progress summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStat {
    pub label: String,
    pub value: String,
}

/// Stat column and chip lists rendered above the boss panels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    #[serde(default)]
    pub stats: Vec<SummaryStat>,
    #[serde(default)]
    pub categorized_chips: CategorizedChips,
}

/// Input of one combined report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub summary: Option<ProgressSummary>,
    pub bosses: Vec<BossStatus>,
}

pub const RESERVATION_CATEGORY: &str = "预约";
pub const CHALLENGE_CATEGORY: &str = "挑战";
pub const STUCK_CATEGORY: &str = "挂树";
pub const COMPENSATION_CATEGORY: &str = "补偿";

/// Background tint of a chip list panel.
pub fn category_tint(category: &str) -> Rgba<u8> {
    match category {
        RESERVATION_CATEGORY => Rgba([179, 229, 252, 255]),
        CHALLENGE_CATEGORY => Rgba([220, 237, 200, 255]),
        STUCK_CATEGORY => Rgba([255, 205, 210, 255]),
        COMPENSATION_CATEGORY => Rgba([237, 231, 246, 255]),
        _ => Rgba([240, 240, 240, 255]),
    }
}
