use crate::game::autoplay::AgentModel;
use crate::game::catch_object::{
    self, BASE_DASH_SPEED, BASE_WALK_SPEED, DEFAULT_CIRCLE_SIZE, PLAYFIELD_WIDTH,
};
use ini::Ini;
use log::{info, warn};
use std::str::FromStr;
use std::sync::Mutex;

const CONFIG_PATH: &str = "autocatch.ini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    /// Playfield units per ms.
    pub walk_speed: f64,
    pub dash_speed: f64,
    /// Explicit full catch width; `None` derives it from `circle_size`.
    pub catch_width: Option<f32>,
    pub circle_size: f32,
    pub playfield_width: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            walk_speed: BASE_WALK_SPEED,
            dash_speed: BASE_DASH_SPEED,
            catch_width: None,
            circle_size: DEFAULT_CIRCLE_SIZE,
            playfield_width: PLAYFIELD_WIDTH,
        }
    }
}

impl Config {
    /// Agent limits for one timeline. A beatmap circle size takes precedence
    /// over both configured catch width and circle size.
    pub fn agent(&self, circle_size_override: Option<f32>) -> AgentModel {
        let catch_width = match circle_size_override {
            Some(cs) => catch_object::catch_width(cs),
            None => self
                .catch_width
                .unwrap_or_else(|| catch_object::catch_width(self.circle_size)),
        };
        AgentModel {
            walk_speed: self.walk_speed,
            dash_speed: self.dash_speed,
            catch_width,
            playfield_width: self.playfield_width,
        }
    }

    /// Reads known keys from `conf`, keeping defaults for missing or malformed ones.
    fn from_ini(conf: &Ini) -> Self {
        let default = Self::default();
        let get = |section: &str, key: &str| conf.get_from(Some(section), key).map(str::trim);
        let positive_f64 = |v: &str| v.parse::<f64>().ok().filter(|v| *v > 0.0 && v.is_finite());
        let positive_f32 = |v: &str| v.parse::<f32>().ok().filter(|v| *v > 0.0 && v.is_finite());

        Self {
            log_level: get("Options", "LogLevel")
                .and_then(|v| LogLevel::from_str(v).ok())
                .unwrap_or(default.log_level),
            walk_speed: get("Autoplay", "WalkSpeed")
                .and_then(positive_f64)
                .unwrap_or(default.walk_speed),
            dash_speed: get("Autoplay", "DashSpeed")
                .and_then(positive_f64)
                .unwrap_or(default.dash_speed),
            // Empty means "derive from circle size".
            catch_width: get("Autoplay", "CatchWidth")
                .and_then(positive_f32)
                .or(default.catch_width),
            circle_size: get("Autoplay", "CircleSize")
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default.circle_size),
            playfield_width: get("Autoplay", "PlayfieldWidth")
                .and_then(positive_f32)
                .unwrap_or(default.playfield_width),
        }
    }

    fn to_ini(&self) -> Ini {
        let mut conf = Ini::new();
        conf.with_section(Some("Options"))
            .set("LogLevel", self.log_level.as_str());
        conf.with_section(Some("Autoplay"))
            .set(
                "CatchWidth",
                self.catch_width.map(|w| w.to_string()).unwrap_or_default(),
            )
            .set("CircleSize", self.circle_size.to_string())
            .set("DashSpeed", self.dash_speed.to_string())
            .set("PlayfieldWidth", self.playfield_width.to_string())
            .set("WalkSpeed", self.walk_speed.to_string());
        conf
    }
}

// Global, mutable configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

fn create_default_config_file() -> Result<(), std::io::Error> {
    info!("'{CONFIG_PATH}' not found, creating with default values.");
    Config::default().to_ini().write_to_file(CONFIG_PATH)
}

pub fn load() {
    if !std::path::Path::new(CONFIG_PATH).exists()
        && let Err(e) = create_default_config_file()
    {
        warn!("Failed to create default config file: {e}");
    }

    match Ini::load_from_file(CONFIG_PATH) {
        Ok(conf) => {
            let cfg = Config::from_ini(&conf);
            if cfg.dash_speed <= cfg.walk_speed {
                warn!(
                    "DashSpeed ({}) does not exceed WalkSpeed ({}); plans will be rejected.",
                    cfg.dash_speed, cfg.walk_speed
                );
            }
            *CONFIG.lock().unwrap() = cfg;
            info!("Configuration loaded from '{CONFIG_PATH}'.");
        }
        Err(e) => {
            warn!("Failed to load '{CONFIG_PATH}': {e}. Using default values.");
        }
    }
}

pub fn get() -> Config {
    *CONFIG.lock().unwrap()
}

#[cfg(test)]
mod tests {
    use super::{Config, LogLevel};
    use crate::game::catch_object;
    use ini::Ini;

    #[test]
    fn reads_known_keys() {
        let conf = Ini::load_from_str(
            "[Options]\nLogLevel=debug\n\n[Autoplay]\nWalkSpeed=0.4\nDashSpeed=1.2\nCatchWidth=90\nPlayfieldWidth=640\n",
        )
        .unwrap();
        let cfg = Config::from_ini(&conf);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.walk_speed, 0.4);
        assert_eq!(cfg.dash_speed, 1.2);
        assert_eq!(cfg.catch_width, Some(90.0));
        assert_eq!(cfg.playfield_width, 640.0);
    }

    #[test]
    fn malformed_keys_fall_back_to_defaults() {
        let conf = Ini::load_from_str(
            "[Options]\nLogLevel=loud\n\n[Autoplay]\nWalkSpeed=-3\nDashSpeed=fast\nCatchWidth=\n",
        )
        .unwrap();
        assert_eq!(Config::from_ini(&conf), Config::default());
    }

    #[test]
    fn default_file_round_trips() {
        let default = Config::default();
        assert_eq!(Config::from_ini(&default.to_ini()), default);
    }

    #[test]
    fn beatmap_circle_size_overrides_catch_width() {
        let cfg = Config { catch_width: Some(50.0), ..Config::default() };
        assert_eq!(cfg.agent(None).catch_width, 50.0);
        assert_eq!(cfg.agent(Some(3.0)).catch_width, catch_object::catch_width(3.0));

        let derived = Config { circle_size: 7.0, ..Config::default() };
        assert_eq!(derived.agent(None).catch_width, catch_object::catch_width(7.0));
    }

    #[test]
    fn log_level_maps_to_filter() {
        assert_eq!(LogLevel::Trace.as_level_filter(), log::LevelFilter::Trace);
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
    }
}
