use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub viewport: ViewportConfig,
    pub drawing: DrawingConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ViewportConfig {
    /// Pages kept materialized on each side of the current page.
    pub page_buffer: u32,
    pub scroll_retry_attempts: u32,
    pub scroll_retry_delay_ms: u64,
    /// Extra offset subtracted from a match span so it is not glued to the edge.
    pub match_scroll_margin_px: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            page_buffer: 2,
            scroll_retry_attempts: 10,
            scroll_retry_delay_ms: 100,
            match_scroll_margin_px: 48,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DrawingConfig {
    /// Pen colour as `#rrggbb` or `#rrggbbaa`.
    pub pen_color: String,
    pub pen_width: f32,
    pub eraser_radius: f32,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            pen_color: "#ff0000".to_string(),
            pen_width: 2.0,
            eraser_radius: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub raster_memory_budget_mb: usize,
    pub raster_max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            raster_memory_budget_mb: 256,
            raster_max_entries: 32,
        }
    }
}

impl CacheConfig {
    const MEBIBYTE: usize = 1024 * 1024;

    pub fn raster_memory_budget_bytes(&self) -> usize {
        self.raster_memory_budget_mb
            .saturating_mul(Self::MEBIBYTE)
            .max(1)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    pub match_case: bool,
    pub highlight_all: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            match_case: false,
            highlight_all: true,
        }
    }
}

impl Config {
    pub fn load() -> EngineResult<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        if !path.is_file() {
            return Err(EngineError::invalid_argument(format!(
                "config path is not a regular file: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path).map_err(|source| {
            EngineError::io_with_context(
                source,
                format!("failed to read config: {}", path.display()),
            )
        })?;
        Self::from_toml_str(&raw).map_err(|err| {
            EngineError::invalid_argument(format!(
                "failed to parse config {}: {err}",
                path.display()
            ))
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Self>(raw).map(Self::sanitized)
    }

    fn sanitized(mut self) -> Self {
        self.viewport.scroll_retry_attempts = self.viewport.scroll_retry_attempts.max(1);
        self.viewport.scroll_retry_delay_ms = self.viewport.scroll_retry_delay_ms.max(1);
        let defaults = DrawingConfig::default();
        if !self.drawing.pen_width.is_finite() || self.drawing.pen_width <= 0.0 {
            self.drawing.pen_width = defaults.pen_width;
        }
        if !self.drawing.eraser_radius.is_finite() || self.drawing.eraser_radius <= 0.0 {
            self.drawing.eraser_radius = defaults.eraser_radius;
        }
        if crate::drawing::parse_hex_color(&self.drawing.pen_color).is_none() {
            self.drawing.pen_color = defaults.pen_color;
        }
        self.cache.raster_max_entries = self.cache.raster_max_entries.max(1);
        self
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("PDF_INK_CONFIG_PATH")
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Some(PathBuf::from(xdg).join("pdf-ink").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME")
        && !home.is_empty()
    {
        return Some(
            PathBuf::from(home)
                .join(".config")
                .join("pdf-ink")
                .join("config.toml"),
        );
    }
    if let Some(appdata) = std::env::var_os("APPDATA")
        && !appdata.is_empty()
    {
        return Some(PathBuf::from(appdata).join("pdf-ink").join("config.toml"));
    }
    None
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::Config;

    fn unique_temp_path(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("pdf_ink_config_{suffix}_{}_{}", process::id(), nanos));
        path
    }

    #[test]
    fn load_from_path_returns_defaults_for_missing_file() {
        let missing = unique_temp_path("missing.toml");
        let config = Config::load_from_path(&missing).expect("missing config should fallback");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_from_path_applies_partial_overrides_and_sanitizes() {
        let path = unique_temp_path("custom.toml");
        fs::write(
            &path,
            r##"
            [viewport]
            page_buffer = 4
            scroll_retry_attempts = 0
            scroll_retry_delay_ms = 0

            [drawing]
            pen_color = "not-a-colour"
            pen_width = -1.0

            [cache]
            raster_max_entries = 0
            "##,
        )
        .expect("config file should be written");

        let config = Config::load_from_path(&path).expect("config should parse");
        assert_eq!(config.viewport.page_buffer, 4);
        assert_eq!(config.viewport.scroll_retry_attempts, 1);
        assert_eq!(config.viewport.scroll_retry_delay_ms, 1);
        assert_eq!(config.viewport.match_scroll_margin_px, 48);
        assert_eq!(config.drawing.pen_color, "#ff0000");
        assert_eq!(config.drawing.pen_width, 2.0);
        assert_eq!(config.drawing.eraser_radius, 10.0);
        assert_eq!(config.cache.raster_max_entries, 1);
        assert_eq!(config.cache.raster_memory_budget_mb, 256);
        assert!(config.search.highlight_all);

        fs::remove_file(&path).expect("config file should be removed");
    }

    #[test]
    fn load_from_path_rejects_directories() {
        let dir = unique_temp_path("dir");
        fs::create_dir_all(&dir).expect("test directory should be created");

        assert!(Config::load_from_path(&dir).is_err());

        fs::remove_dir_all(&dir).expect("test directory should be removed");
    }
}
