use std::env;
use std::path::PathBuf;

const DEFAULT_FONT_PATH: &str = "assets/fonts/msyh.ttf";
const DEFAULT_AVATAR_DIR: &str = "data/user_profile";
const DEFAULT_ICON_DIR: &str = "data/boss_icon";
const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    pub font_path: PathBuf,
    pub avatar_dir: PathBuf,
    pub icon_dir: PathBuf,
    /// Segments per column of a combined report; `None` keeps one column.
    pub panels_per_column: Option<usize>,
    pub jpeg_quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            avatar_dir: PathBuf::from(DEFAULT_AVATAR_DIR),
            icon_dir: PathBuf::from(DEFAULT_ICON_DIR),
            panels_per_column: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        Self {
            font_path: path_from_env("CLAN_CARD_FONT", DEFAULT_FONT_PATH),
            avatar_dir: path_from_env("CLAN_CARD_AVATAR_DIR", DEFAULT_AVATAR_DIR),
            icon_dir: path_from_env("CLAN_CARD_ICON_DIR", DEFAULT_ICON_DIR),
            panels_per_column: panels_per_column_from_env(),
            jpeg_quality: jpeg_quality_from_env(),
        }
    }
}

fn path_from_env(name: &str, default: &str) -> PathBuf {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn panels_per_column_from_env() -> Option<usize> {
    env::var("CLAN_CARD_PANELS_PER_COLUMN")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
}

fn jpeg_quality_from_env() -> u8 {
    env::var("CLAN_CARD_JPEG_QUALITY")
        .ok()
        .and_then(|value| value.trim().parse::<u8>().ok())
        .filter(|value| (1..=100).contains(value))
        .unwrap_or(DEFAULT_JPEG_QUALITY)
}
