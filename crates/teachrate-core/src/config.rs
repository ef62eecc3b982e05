//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `teachrate.toml`,
//! `teachrate.<env>.toml`, an optional explicit file and `TEACHRATE_*` env
//! vars (`__` separates nested keys). Directory settings go through
//! [`expand_path`] so `~` and `${VAR}` work in them.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "TEACHRATE_";

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Loads the standard layers, with `extra` merged above the files but
    /// below the environment.
    pub fn load_with(extra: Option<&Path>) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("teachrate.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("teachrate.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("teachrate.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("teachrate.test.toml")),
            _ => {}
        }
        if let Some(path) = extra {
            if !path.is_file() {
                return Err(Error::InvalidConfig(format!("config file not found: {}", path.display())));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Wraps an already assembled figment; used by tests and embedders.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    /// Extracts and validates the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input: InputSettings,
    pub schema: SchemaSettings,
    pub rating: RatingScale,
    pub gpa: GpaScale,
    pub index: IndexSettings,
    pub output: OutputSettings,
    pub runtime: RuntimeSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));

        if self.input.extension.trim().is_empty() {
            return invalid("input.extension must not be empty".into());
        }
        self.input.delimiter_byte()?;

        for (field, column) in self.schema.required_columns() {
            if column.trim().is_empty() {
                return invalid(format!("schema.{field} must name a column"));
            }
        }

        if !self.rating.min.is_finite() || !self.rating.max.is_finite() || self.rating.min >= self.rating.max {
            return invalid(format!("rating range [{}, {}] is empty", self.rating.min, self.rating.max));
        }
        if self.rating.buckets == 0 {
            return invalid("rating.buckets must be at least 1".into());
        }
        if !self.gpa.min.is_finite() || !self.gpa.max.is_finite() || self.gpa.min >= self.gpa.max {
            return invalid(format!("gpa scale [{}, {}] is empty", self.gpa.min, self.gpa.max));
        }
        if self.index.min_prefix == 0 || self.index.min_prefix > self.index.max_prefix {
            return invalid(format!(
                "index prefix bounds {}..={} are inverted or zero",
                self.index.min_prefix, self.index.max_prefix
            ));
        }
        if self.output.dir.trim().is_empty() {
            return invalid("output.dir must not be empty".into());
        }
        if self.runtime.workers == Some(0) {
            return invalid("runtime.workers must be at least 1 when set".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub dir: String,
    pub extension: String,
    pub delimiter: String,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self { dir: "comment/extracted".into(), extension: "csv".into(), delimiter: ",".into() }
    }
}

impl InputSettings {
    pub fn dir_path(&self) -> PathBuf {
        expand_path(&self.dir)
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ if self.delimiter == "\\t" => Ok(b'\t'),
            _ => Err(Error::InvalidConfig(format!(
                "input.delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            ))),
        }
    }
}

/// Column names for each logical field. Columns not named here are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    pub teacher: String,
    pub college: String,
    pub course: String,
    pub semester: String,
    pub rating: String,
    pub text: String,
    pub gpa: Option<String>,
    pub aliases: Vec<String>,
    pub likes: Option<String>,
    pub dislikes: Option<String>,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            teacher: "teacher".into(),
            college: "college".into(),
            course: "course".into(),
            semester: "semester".into(),
            rating: "rating".into(),
            text: "comment".into(),
            gpa: Some("gpa".into()),
            aliases: Vec::new(),
            likes: None,
            dislikes: None,
        }
    }
}

impl SchemaSettings {
    fn required_columns(&self) -> [(&'static str, &str); 5] {
        [
            ("teacher", self.teacher.as_str()),
            ("college", self.college.as_str()),
            ("course", self.course.as_str()),
            ("rating", self.rating.as_str()),
            ("text", self.text.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
    pub buckets: usize,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 1.0, max: 5.0, buckets: 5 }
    }
}

impl RatingScale {
    pub fn contains(&self, rating: f64) -> bool {
        rating >= self.min && rating <= self.max
    }

    /// Equal-width bucket for `rating`; `max` lands in the last bucket.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn bucket(&self, rating: f64) -> usize {
        let last = self.buckets.saturating_sub(1);
        let pos = ((rating - self.min) / (self.max - self.min) * self.buckets as f64).floor();
        if pos <= 0.0 {
            0
        } else {
            (pos as usize).min(last)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpaScale {
    pub min: f64,
    pub max: f64,
}

impl Default for GpaScale {
    fn default() -> Self {
        Self { min: 0.0, max: 4.0 }
    }
}

impl GpaScale {
    pub fn contains(&self, gpa: f64) -> bool {
        gpa >= self.min && gpa <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub min_prefix: usize,
    pub max_prefix: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { min_prefix: 2, max_prefix: 12 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: String,
    pub pretty: bool,
    pub progress: bool,
    pub top_n: usize,
    pub min_ratings_for_top: u64,
    pub max_diagnostics: usize,
    pub dataset_date: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: "web/data".into(),
            pretty: false,
            progress: true,
            top_n: 20,
            min_ratings_for_top: 10,
            max_diagnostics: 50,
            dataset_date: None,
        }
    }
}

impl OutputSettings {
    pub fn dir_path(&self) -> PathBuf {
        expand_path(&self.dir)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub workers: Option<usize>,
}

/// Expands `${VAR}`/`$VAR` and a leading `~` in a configured directory.
/// Unknown variables are left as written. The path is not canonicalized.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_env = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_env).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Settings::default().validate().expect("defaults are valid");
    }

    #[test]
    fn toml_layer_overrides_defaults() {
        let figment = Figment::new().merge(Toml::string(
            "[rating]\nmin = 0.0\nmax = 10.0\n\n[schema]\nteacher = \"姓名\"\n",
        ));
        let settings = Config::from_figment(figment).settings().expect("settings");
        assert_eq!(settings.rating.max, 10.0);
        assert_eq!(settings.rating.buckets, 5);
        assert_eq!(settings.schema.teacher, "姓名");
        assert_eq!(settings.schema.college, "college");
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let mut settings = Settings::default();
        settings.rating.min = 5.0;
        settings.rating.max = 1.0;
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));

        let mut settings = Settings::default();
        settings.index.min_prefix = 13;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.input.delimiter = ";;".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn tab_delimiter_escape() {
        let input = InputSettings { delimiter: "\\t".into(), ..InputSettings::default() };
        assert_eq!(input.delimiter_byte().expect("tab"), b'\t');
    }

    #[test]
    fn buckets_cover_the_closed_range() {
        let scale = RatingScale::default();
        assert_eq!(scale.bucket(1.0), 0);
        assert_eq!(scale.bucket(2.0), 1);
        assert_eq!(scale.bucket(3.0), 2);
        assert_eq!(scale.bucket(4.0), 3);
        assert_eq!(scale.bucket(5.0), 4);
        assert_eq!(scale.bucket(4.99), 4);
    }

    #[test]
    fn expand_path_substitutes_env_vars() {
        std::env::set_var("TR_EXPAND_ROOT", "/srv/teachrate");
        assert_eq!(expand_path("${TR_EXPAND_ROOT}/web/data"), PathBuf::from("/srv/teachrate/web/data"));
        assert_eq!(expand_path("relative/dir"), PathBuf::from("relative/dir"));
    }
}
