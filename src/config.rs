use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::CaptureRegion;
use crate::error::ConfigError;

/// Directory name under the platform config dir
const APP_DIR: &str = "D4Assistant";

/// Vendor slots scanned by the restock helper
pub const RESTOCK_SLOTS: usize = 8;

/// Affix rows scanned by the enchant helper
pub const ENCHANT_AFFIXES: usize = 2;

/// Root directory for configs and logs
///
/// - macOS: ~/Library/Application Support/D4Assistant/
/// - Windows: %APPDATA%/D4Assistant/
/// - Linux: ~/.config/D4Assistant/
pub fn app_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

/// Seconds (as stored on disk) to a `Duration`; negative or NaN becomes zero
pub fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

/// Shared load/save/validate behaviour for per-tool config files
///
/// Files are flat JSON objects. Missing keys take defaults and unknown keys
/// are ignored, so older and newer files both load.
pub trait ToolConfig: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;

    /// Reject configurations a tool cannot run with
    fn validate(&self) -> Result<(), ConfigError>;

    /// Rewrite keys from older file layouts before deserializing
    fn migrate(_raw: &mut Value) {}

    fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(app_dir()?.join(Self::FILE_NAME))
    }

    /// Load from the platform config directory
    fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    /// Load `path`, writing a default file if none exists.
    ///
    /// A file that exists but cannot be parsed is left untouched and the
    /// defaults are returned.
    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("✓ Created default config at: {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        let parsed = serde_json::from_str::<Value>(&content).and_then(|mut raw| {
            Self::migrate(&mut raw);
            serde_json::from_value::<Self>(raw)
        });

        match parsed {
            Ok(config) => {
                tracing::info!("✓ Loaded config from: {}", path.display());
                Ok(config)
            }
            Err(e) => {
                tracing::error!(
                    "Config error in {}: {}. Using default configuration.",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let save_failed = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(Box::new(e)))?;
        fs::write(path, json).map_err(|e| save_failed(Box::new(e)))?;

        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Older files stored a single `target_word`
fn migrate_target_word(raw: &mut Value) {
    let Some(obj) = raw.as_object_mut() else {
        return;
    };
    if let Some(word) = obj.remove("target_word") {
        obj.insert("target_words".to_string(), Value::Array(vec![word]));
    }
}

fn require_point(name: &str, point: [i32; 2]) -> Result<(), ConfigError> {
    if point == [0, 0] {
        return Err(ConfigError::Invalid(format!("{} is not set", name)));
    }
    Ok(())
}

fn require_regions(name: &str, regions: &[[u32; 4]], count: usize) -> Result<(), ConfigError> {
    if regions.len() != count {
        return Err(ConfigError::Invalid(format!(
            "expected {} {}, found {}",
            count,
            name,
            regions.len()
        )));
    }
    require_each_region(name, regions)
}

fn require_each_region(name: &str, regions: &[[u32; 4]]) -> Result<(), ConfigError> {
    for (i, region) in regions.iter().enumerate() {
        if CaptureRegion::from_array(*region).is_empty() {
            return Err(ConfigError::Invalid(format!("{} {} is not set", name, i + 1)));
        }
    }
    Ok(())
}

fn require_target_words(words: &[String]) -> Result<(), ConfigError> {
    if !words.iter().any(|w| !w.trim().is_empty()) {
        return Err(ConfigError::Invalid("no target words configured".to_string()));
    }
    Ok(())
}

fn require_delays(delays: &[(&str, f64)]) -> Result<(), ConfigError> {
    for (name, value) in delays {
        if !value.is_finite() || *value < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be a non-negative number of seconds",
                name
            )));
        }
    }
    Ok(())
}

/// OCR tuning shared by the text-scanning tools
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Binary threshold for OCR preprocessing (0 = automatic Otsu)
    pub ocr_threshold: u8,

    /// Enable morphological opening for noise reduction
    pub enable_morph_open: bool,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            ocr_threshold: 0,
            enable_morph_open: false,
        }
    }
}

/// Vendor restock (barter) helper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestockConfig {
    /// Screen position of the vendor's restock button
    pub restock_button: [i32; 2],

    /// One [x, y, width, height] region per vendor slot
    pub scan_regions: Vec<[u32; 4]>,

    /// Item names to buy; any one of them triggers a purchase
    pub target_words: Vec<String>,

    /// Seconds to wait after each click
    pub click_delay: f64,

    /// Seconds between scan rounds
    pub loop_delay: f64,

    /// Seconds to wait after a failed round
    pub error_backoff: f64,

    #[serde(flatten)]
    pub ocr: OcrSettings,
}

impl Default for RestockConfig {
    fn default() -> Self {
        Self {
            restock_button: [0, 0],
            scan_regions: vec![[0, 0, 0, 0]; RESTOCK_SLOTS],
            target_words: vec!["Item Name".to_string()],
            click_delay: 0.1,
            loop_delay: 1.0,
            error_backoff: 5.0,
            ocr: OcrSettings::default(),
        }
    }
}

impl ToolConfig for RestockConfig {
    const FILE_NAME: &'static str = "restock_config.json";

    fn validate(&self) -> Result<(), ConfigError> {
        require_point("restock button", self.restock_button)?;
        require_regions("scan regions", &self.scan_regions, RESTOCK_SLOTS)?;
        require_target_words(&self.target_words)?;
        require_delays(&[
            ("click_delay", self.click_delay),
            ("loop_delay", self.loop_delay),
            ("error_backoff", self.error_backoff),
        ])
    }

    fn migrate(raw: &mut Value) {
        migrate_target_word(raw);
    }
}

/// Enchant (affix reroll) helper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnchantConfig {
    pub enchant_button: [i32; 2],
    pub replace_button: [i32; 2],
    pub close_button: [i32; 2],

    /// One region per offered affix
    pub scan_regions: Vec<[u32; 4]>,

    /// Button that selects the affix shown in the matching scan region
    pub scan_buttons: Vec<[i32; 2]>,

    /// Affixes to keep
    pub target_words: Vec<String>,

    /// Seconds after each click
    pub click_delay: f64,

    /// Seconds after clicking enchant, while the affixes roll
    pub enchant_delay: f64,

    /// Seconds between selecting an affix and clicking replace
    pub replace_delay: f64,

    /// Seconds between attempts
    pub loop_delay: f64,

    /// Seconds to wait after a failed attempt
    pub error_backoff: f64,

    #[serde(flatten)]
    pub ocr: OcrSettings,
}

impl Default for EnchantConfig {
    fn default() -> Self {
        Self {
            enchant_button: [0, 0],
            replace_button: [0, 0],
            close_button: [0, 0],
            scan_regions: vec![[0, 0, 0, 0]; ENCHANT_AFFIXES],
            scan_buttons: vec![[0, 0]; ENCHANT_AFFIXES],
            target_words: vec!["Target Affix".to_string()],
            click_delay: 0.1,
            enchant_delay: 1.0,
            replace_delay: 0.5,
            loop_delay: 1.0,
            error_backoff: 5.0,
            ocr: OcrSettings::default(),
        }
    }
}

impl ToolConfig for EnchantConfig {
    const FILE_NAME: &'static str = "enchant_config.json";

    fn validate(&self) -> Result<(), ConfigError> {
        require_point("enchant button", self.enchant_button)?;
        require_point("replace button", self.replace_button)?;
        require_point("close button", self.close_button)?;
        require_regions("scan regions", &self.scan_regions, ENCHANT_AFFIXES)?;
        if self.scan_buttons.len() != self.scan_regions.len() {
            return Err(ConfigError::Invalid(format!(
                "expected {} scan buttons, found {}",
                self.scan_regions.len(),
                self.scan_buttons.len()
            )));
        }
        for (i, button) in self.scan_buttons.iter().enumerate() {
            require_point(&format!("scan button {}", i + 1), *button)?;
        }
        require_target_words(&self.target_words)?;
        require_delays(&[
            ("click_delay", self.click_delay),
            ("enchant_delay", self.enchant_delay),
            ("replace_delay", self.replace_delay),
            ("loop_delay", self.loop_delay),
            ("error_backoff", self.error_backoff),
        ])
    }

    fn migrate(raw: &mut Value) {
        migrate_target_word(raw);
    }
}

/// Kurast portal helper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KurastConfig {
    /// Region searched for the portal image
    pub scan_region: [u32; 4],

    /// Path to the portal template image
    pub target_image: String,

    /// Right-clicked after the portal; [0, 0] skips it
    pub tribute_spot: [i32; 2],

    /// Clicked last; [0, 0] skips it
    pub portal_button: [i32; 2],

    pub click_delay: f64,
    pub loop_delay: f64,

    /// Minimum normalized correlation for a template hit (0, 1]
    pub confidence: f32,

    /// Seconds the pointer takes to glide to each target
    pub move_duration: f64,

    pub error_backoff: f64,
}

impl Default for KurastConfig {
    fn default() -> Self {
        Self {
            scan_region: [0, 0, 0, 0],
            target_image: String::new(),
            tribute_spot: [0, 0],
            portal_button: [0, 0],
            click_delay: 0.1,
            loop_delay: 0.5,
            confidence: 0.8,
            move_duration: 0.2,
            error_backoff: 1.0,
        }
    }
}

impl KurastConfig {
    pub fn tribute_spot(&self) -> Option<(i32, i32)> {
        optional_point(self.tribute_spot)
    }

    pub fn portal_button(&self) -> Option<(i32, i32)> {
        optional_point(self.portal_button)
    }
}

fn optional_point(point: [i32; 2]) -> Option<(i32, i32)> {
    (point != [0, 0]).then_some((point[0], point[1]))
}

impl ToolConfig for KurastConfig {
    const FILE_NAME: &'static str = "kurast_config.json";

    fn validate(&self) -> Result<(), ConfigError> {
        require_each_region("scan region", &[self.scan_region])?;
        if self.target_image.trim().is_empty() {
            return Err(ConfigError::Invalid("target image is not set".to_string()));
        }
        if !(self.confidence > 0.0 && self.confidence <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "confidence must be in (0, 1], got {}",
                self.confidence
            )));
        }
        require_delays(&[
            ("click_delay", self.click_delay),
            ("loop_delay", self.loop_delay),
            ("move_duration", self.move_duration),
            ("error_backoff", self.error_backoff),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("d4_assistant_test_{}", std::process::id()))
            .join(name)
    }

    fn valid_restock() -> RestockConfig {
        RestockConfig {
            restock_button: [900, 700],
            scan_regions: (0..RESTOCK_SLOTS as u32)
                .map(|i| [100 + i * 60, 300, 50, 20])
                .collect(),
            ..RestockConfig::default()
        }
    }

    fn valid_enchant() -> EnchantConfig {
        EnchantConfig {
            enchant_button: [500, 800],
            replace_button: [500, 850],
            close_button: [700, 850],
            scan_regions: vec![[400, 300, 300, 30], [400, 400, 300, 30]],
            scan_buttons: vec![[380, 315], [380, 415]],
            ..EnchantConfig::default()
        }
    }

    #[test]
    fn test_default_configs() {
        let restock = RestockConfig::default();
        assert_eq!(restock.scan_regions.len(), RESTOCK_SLOTS);
        assert_eq!(restock.target_words, vec!["Item Name".to_string()]);
        assert_eq!(restock.ocr.ocr_threshold, 0);

        let enchant = EnchantConfig::default();
        assert_eq!(enchant.scan_buttons.len(), ENCHANT_AFFIXES);
        assert_eq!(enchant.enchant_delay, 1.0);

        let kurast = KurastConfig::default();
        assert_eq!(kurast.confidence, 0.8);
        assert_eq!(kurast.loop_delay, 0.5);
    }

    #[test]
    fn test_defaults_do_not_validate() {
        assert!(RestockConfig::default().validate().is_err());
        assert!(EnchantConfig::default().validate().is_err());
        assert!(KurastConfig::default().validate().is_err());
    }

    #[test]
    fn test_restock_validation() {
        assert!(valid_restock().validate().is_ok());

        let mut config = valid_restock();
        config.target_words = vec!["  ".to_string(), String::new()];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("target words")));

        let mut config = valid_restock();
        config.scan_regions[3] = [0, 0, 0, 0];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("scan regions 4")));

        let mut config = valid_restock();
        config.scan_regions.pop();
        assert!(config.validate().is_err());

        let mut config = valid_restock();
        config.loop_delay = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_enchant_validation() {
        assert!(valid_enchant().validate().is_ok());

        let mut config = valid_enchant();
        config.scan_buttons[1] = [0, 0];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("scan button 2")));

        let mut config = valid_enchant();
        config.scan_buttons.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kurast_validation_and_optional_points() {
        let mut config = KurastConfig {
            scan_region: [0, 0, 800, 600],
            target_image: "images/portal.png".to_string(),
            ..KurastConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.tribute_spot(), None);

        config.tribute_spot = [640, 360];
        assert_eq!(config.tribute_spot(), Some((640, 360)));

        config.confidence = 1.5;
        assert!(config.validate().is_err());
        config.confidence = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_legacy_target_word_is_migrated() {
        let path = temp_path("legacy_restock.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"restock_button": [10, 20], "target_word": "Obducite", "unknown_key": 1}"#,
        )
        .unwrap();

        let config = RestockConfig::load_from(&path).unwrap();
        assert_eq!(config.restock_button, [10, 20]);
        assert_eq!(config.target_words, vec!["Obducite".to_string()]);
        assert_eq!(config.scan_regions.len(), RESTOCK_SLOTS);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_reads_float_second_delays() {
        let path = temp_path("enchant.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"enchant_button": [1, 2], "click_delay": 0.25, "enchant_delay": 1.5}"#,
        )
        .unwrap();

        let config = EnchantConfig::load_from(&path).unwrap();
        assert_eq!(config.enchant_button, [1, 2]);
        assert_eq!(secs(config.click_delay), Duration::from_millis(250));
        assert_eq!(config.replace_delay, 0.5);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_creates_default() {
        let path = temp_path("fresh/kurast_config.json");
        let _ = fs::remove_file(&path);

        let config = KurastConfig::load_from(&path).unwrap();
        assert_eq!(config, KurastConfig::default());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let path = temp_path("corrupt_restock.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let config = RestockConfig::load_from(&path).unwrap();
        assert_eq!(config, RestockConfig::default());
        // The broken file is left for the user to inspect
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_save_then_load_preserves_edits() {
        let path = temp_path("saved_enchant.json");
        let mut config = valid_enchant();
        config.target_words = vec!["Critical Strike Chance".to_string()];
        config.ocr.enable_morph_open = true;

        config.save_to(&path).unwrap();
        let loaded = EnchantConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_secs_clamps_invalid_values() {
        assert_eq!(secs(1.5), Duration::from_millis(1500));
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
    }
}
