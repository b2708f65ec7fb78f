use crate::domain::controller::StickConfig;
use crate::domain::models::{AttributeLayout, Bounds, Coordinate, PeerIdentity, Role};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_true")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_true(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "proximity_sync".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Per-device configuration. Both devices must agree on the identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub role: Role,
    pub layout: AttributeLayout,

    // Discovery
    pub publisher_name: String,
    pub subscriber_name: String,
    pub match_peer_name: bool,
    /// None scans continuously
    pub scan_timeout_ms: Option<u64>,
    pub retry_delay_ms: u64,

    // GATT identifiers
    pub service_uuid: String,
    pub combined_char_uuid: String,
    pub read_x_char_uuid: String,
    pub read_y_char_uuid: String,
    pub write_x_char_uuid: String,
    pub write_y_char_uuid: String,
    pub seed_from_initial_read: bool,

    // Display
    pub display_width: i32,
    pub display_height: i32,
    pub publisher_start: Coordinate,
    pub subscriber_start: Coordinate,

    // Gamepad
    pub axis_center: i32,
    pub dead_zone: i32,
    pub base_speed: i32,
    pub invert_y: bool,
    pub button_holdoff_ms: u64,

    // Game loop
    pub tick_interval_ms: u64,
    pub proximity_threshold: f64,
    pub game_over_hold_ms: u64,

    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            role: Role::Subscriber,
            layout: AttributeLayout::Split,

            publisher_name: "Duct Tape n' Prayer".to_string(),
            subscriber_name: "Proximity Client".to_string(),
            match_peer_name: true,
            scan_timeout_ms: None,
            retry_delay_ms: 1000,

            service_uuid: "7d7a7768-a9d0-4fb8-bf2b-fc994c662eb6".to_string(),
            combined_char_uuid: "009ba967-6405-49ea-8f74-86ce1d815516".to_string(),
            read_x_char_uuid: "563c64b2-9634-4f7a-9f4f-d9e3231faa56".to_string(),
            read_y_char_uuid: "aa88ac15-3e2b-4735-92ff-4c712173e9f3".to_string(),
            write_x_char_uuid: "1da468d6-993d-4387-9e71-1c826b10fff9".to_string(),
            write_y_char_uuid: "cf7b4787-d412-4e69-8b61-e2cfba89ff19".to_string(),
            seed_from_initial_read: true,

            display_width: 320,
            display_height: 240,
            publisher_start: Coordinate::new(10, 120),
            subscriber_start: Coordinate::new(300, 120),

            axis_center: 512,
            dead_zone: 10,
            base_speed: 2,
            invert_y: true,
            button_holdoff_ms: 500,

            tick_interval_ms: 30,
            proximity_threshold: 30.0,
            game_over_hold_ms: 5000,

            log_settings: LogSettings::default(),
        }
    }
}

impl Settings {
    /// Copy of these settings for the other side of the link
    pub fn for_role(&self, role: Role) -> Settings {
        Settings {
            role,
            ..self.clone()
        }
    }

    pub fn publisher_identity(&self) -> PeerIdentity {
        PeerIdentity {
            service_uuid: self.service_uuid.clone(),
            name: self.publisher_name.clone(),
        }
    }

    pub fn device_name(&self) -> &str {
        match self.role {
            Role::Publisher => &self.publisher_name,
            Role::Subscriber => &self.subscriber_name,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.layout.bounds(self.display_width, self.display_height)
    }

    pub fn start_position(&self) -> Coordinate {
        let start = match self.role {
            Role::Publisher => self.publisher_start,
            Role::Subscriber => self.subscriber_start,
        };
        self.bounds().clamp(start)
    }

    pub fn stick_config(&self) -> StickConfig {
        StickConfig {
            center: self.axis_center,
            dead_zone: self.dead_zone,
            base_speed: self.base_speed,
            invert_y: self.invert_y,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Reject values the game loop cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        let bounds = self.bounds();
        anyhow::ensure!(
            bounds.max_x > bounds.min_x && bounds.max_y > bounds.min_y,
            "Display {}x{} leaves no room to move on the {:?} layout",
            self.display_width,
            self.display_height,
            self.layout
        );
        anyhow::ensure!(
            self.axis_center > 0,
            "axis_center must be positive, got {}",
            self.axis_center
        );
        anyhow::ensure!(
            self.proximity_threshold.is_finite() && self.proximity_threshold >= 0.0,
            "proximity_threshold must be a non-negative number, got {}",
            self.proximity_threshold
        );
        Ok(())
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Self::open(settings_path)
    }

    /// Load settings from `path`, writing defaults there when the file is missing
    pub fn open(settings_path: PathBuf) -> anyhow::Result<Self> {
        let settings = if settings_path.exists() {
            Self::load_from_file(&settings_path)?
        } else {
            Settings::default()
        };

        let service = Self {
            settings,
            settings_path,
        };
        if !service.settings_path.exists() {
            service.save()?;
        }
        Ok(service)
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("ProximitySync");
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        settings
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid settings in {}: {}", path.display(), e))?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.settings_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    #[cfg(test)]
    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}
