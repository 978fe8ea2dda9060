use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::calendar::CalendarView;
use crate::timegrid::DayWindow;

const CONFIG_ENV_VAR: &str =
  "KAIRO_CONFIG";
const TIMEZONE_ENV_VAR: &str =
  "KAIRO_TIMEZONE";
const CONFIG_DIR_NAME: &str = "kairo";
const CONFIG_FILE_NAME: &str =
  "kairo.toml";
const DEFAULT_DATA_DIR_NAME: &str =
  ".kairo";

#[derive(
  Debug, Clone, PartialEq, Serialize, Deserialize,
)]
#[serde(default)]
pub struct WindowConfig {
  pub start: String,
  pub end:   String
}

impl WindowConfig {
  fn from_window(
    window: DayWindow
  ) -> Self {
    Self {
      start: window.start.to_string(),
      end:   window.end.to_string()
    }
  }

  fn day_default() -> Self {
    Self::from_window(
      DayWindow::default()
    )
  }

  fn week_default() -> Self {
    Self::from_window(
      DayWindow::week_grid()
    )
  }
}

impl Default for WindowConfig {
  fn default() -> Self {
    Self::day_default()
  }
}

#[derive(
  Debug, Clone, PartialEq, Serialize, Deserialize,
)]
#[serde(default)]
pub struct Config {
  pub timezone:      Option<String>,
  pub data_location: Option<String>,
  pub default_view:  String,
  pub color:         bool,
  pub day_view:      WindowConfig,
  pub week_view:     WindowConfig,
  #[serde(skip)]
  pub loaded_file:   Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      timezone:      None,
      data_location: None,
      default_view:  CalendarView::Month
        .as_key()
        .to_string(),
      color:         true,
      day_view:
        WindowConfig::day_default(),
      week_view:
        WindowConfig::week_default(),
      loaded_file:   None
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let path = resolve_config_path(
      config_override
    )?;

    let mut cfg =
      if let Some(path) = path {
        info!(config = %path.display(), "loading config");
        Self::load_file(&path)?
      } else {
        debug!(
          "no config file found; \
           using defaults"
        );
        Self::default()
      };

    cfg.timezone_from_env(
      std::env::var(TIMEZONE_ENV_VAR)
        .ok()
        .as_deref()
    );

    cfg.sanitize();
    Ok(cfg)
  }

  pub fn from_toml(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: Self =
      toml::from_str(text)
        .context("invalid config")?;
    cfg.sanitize();
    Ok(cfg)
  }

  /// A non-blank `KAIRO_TIMEZONE`
  /// wins over the file.
  fn timezone_from_env(
    &mut self,
    raw: Option<&str>
  ) {
    if let Some(raw) = raw.map(str::trim)
      && !raw.is_empty()
    {
      debug!(timezone = %raw, "timezone from environment");
      self.timezone = Some(raw.to_string());
    }
  }

  fn load_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let mut cfg: Self =
      toml::from_str(&text)
        .with_context(|| {
          format!(
            "failed to parse {}",
            path.display()
          )
        })?;
    cfg.loaded_file = Some(path);
    Ok(cfg)
  }

  /// Replaces values that cannot be
  /// used with their defaults.
  pub fn sanitize(&mut self) {
    if CalendarView::from_key(
      &self.default_view
    )
    .is_none()
    {
      warn!(
        view = %self.default_view,
        "unknown default_view; using month"
      );
      self.default_view =
        CalendarView::Month
          .as_key()
          .to_string();
    }

    if let Err(err) = DayWindow::parse(
      &self.day_view.start,
      &self.day_view.end
    ) {
      warn!(error = %err, "invalid [day_view]; using defaults");
      self.day_view =
        WindowConfig::day_default();
    }

    if let Err(err) = DayWindow::parse(
      &self.week_view.start,
      &self.week_view.end
    ) {
      warn!(error = %err, "invalid [week_view]; using defaults");
      self.week_view =
        WindowConfig::week_default();
    }

    if let Some(raw) =
      self.timezone.as_deref()
      && parse_timezone(raw).is_none()
    {
      warn!(timezone = %raw, "unknown timezone; using UTC");
      self.timezone = None;
    }
  }

  /// Applies `key=value` pairs from
  /// the command line.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      debug!(key = %k, value = %v, "applying override");
      let value = v.trim().to_string();
      match k.trim() {
        | "timezone" => {
          self.timezone = Some(value)
        }
        | "data_location"
        | "data.location" => {
          self.data_location =
            Some(value)
        }
        | "default_view" => {
          self.default_view = value
        }
        | "color" => {
          self.color = parse_bool(&value)
            .ok_or_else(|| {
              anyhow!(
                "color expects on/off, \
                 got: {value}"
              )
            })?
        }
        | "day_view.start" => {
          self.day_view.start = value
        }
        | "day_view.end" => {
          self.day_view.end = value
        }
        | "week_view.start" => {
          self.week_view.start = value
        }
        | "week_view.end" => {
          self.week_view.end = value
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: {other}"
          ));
        }
      }
    }
    self.sanitize();
    Ok(())
  }

  pub fn day_window(&self) -> DayWindow {
    DayWindow::parse(
      &self.day_view.start,
      &self.day_view.end
    )
    .unwrap_or_default()
  }

  pub fn week_window(
    &self
  ) -> DayWindow {
    DayWindow::parse(
      &self.week_view.start,
      &self.week_view.end
    )
    .unwrap_or_else(|_| {
      DayWindow::week_grid()
    })
  }

  pub fn default_view(
    &self
  ) -> CalendarView {
    CalendarView::from_param(
      &self.default_view
    )
  }

  pub fn timezone(&self) -> Tz {
    self
      .timezone
      .as_deref()
      .and_then(parse_timezone)
      .unwrap_or(chrono_tz::UTC)
  }

  /// The current date in the
  /// configured timezone.
  pub fn today(&self) -> NaiveDate {
    self.today_at(Utc::now())
  }

  pub fn today_at(
    &self,
    now: DateTime<Utc>
  ) -> NaiveDate {
    now
      .with_timezone(&self.timezone())
      .date_naive()
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = override_dir {
    return Ok(expand_tilde(path));
  }
  if let Some(location) =
    cfg.data_location.as_deref()
    && !location.trim().is_empty()
  {
    return Ok(expand_tilde(
      Path::new(location.trim())
    ));
  }
  default_data_dir()
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(config_env) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if config_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      config_env
    )));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    return Ok(None);
  };
  let candidate = config_dir
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(DEFAULT_DATA_DIR_NAME))
}

fn parse_timezone(
  raw: &str
) -> Option<Tz> {
  raw.trim().parse::<Tz>().ok()
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let Ok(rest) = path.strip_prefix("~")
  else {
    return path.to_path_buf();
  };
  match dirs::home_dir() {
    | Some(home)
      if rest.as_os_str().is_empty() =>
    {
      home
    }
    | Some(home) => home.join(rest),
    | None => path.to_path_buf()
  }
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;
  use crate::timegrid::TimeOfDay;

  #[test]
  fn defaults_without_file() {
    let cfg = Config::default();
    assert_eq!(
      cfg.day_window(),
      DayWindow::default()
    );
    assert_eq!(
      cfg.week_window().end,
      TimeOfDay::END_OF_DAY
    );
    assert_eq!(
      cfg.default_view(),
      CalendarView::Month
    );
    assert_eq!(
      cfg.timezone(),
      chrono_tz::UTC
    );
  }

  #[test]
  fn loads_file_and_sanitizes() {
    let dir =
      tempdir().expect("tempdir");
    let path =
      dir.path().join("kairo.toml");
    fs::write(
      &path,
      r#"
timezone = "Not/AZone"
default_view = "fortnight"
color = false

[day_view]
start = "08:00"
end = "18:00"

[week_view]
start = "20:00"
end = "07:00"
"#
    )
    .expect("write config");

    let cfg = Config::load(Some(&path))
      .expect("load");
    assert_eq!(
      cfg.loaded_file.as_deref(),
      Some(path.as_path())
    );
    assert!(!cfg.color);
    assert_eq!(cfg.timezone, None);
    assert_eq!(
      cfg.default_view,
      "month"
    );
    assert_eq!(
      cfg.day_window(),
      DayWindow::parse("08:00", "18:00")
        .expect("window")
    );
    assert_eq!(
      cfg.week_window(),
      DayWindow::week_grid()
    );
  }

  #[test]
  fn missing_explicit_file_is_an_error()
  {
    let dir =
      tempdir().expect("tempdir");
    let missing =
      dir.path().join("nope.toml");
    assert!(
      Config::load(Some(&missing))
        .is_err()
    );
  }

  #[test]
  fn overrides_apply_and_validate() {
    let mut cfg = Config::default();
    cfg
      .apply_overrides(vec![
        (
          "timezone".to_string(),
          "Asia/Seoul".to_string()
        ),
        (
          "default_view".to_string(),
          "week".to_string()
        ),
        (
          "day_view.end".to_string(),
          "20:30".to_string()
        ),
      ])
      .expect("overrides");
    assert_eq!(
      cfg.timezone(),
      chrono_tz::Asia::Seoul
    );
    assert_eq!(
      cfg.default_view(),
      CalendarView::Week
    );
    assert_eq!(
      cfg.day_window().end.to_string(),
      "20:30"
    );

    assert!(
      cfg
        .apply_overrides(vec![(
          "bogus".to_string(),
          "1".to_string()
        )])
        .is_err()
    );
  }

  fn instant(raw: &str) -> DateTime<Utc> {
    raw.parse().expect("instant")
  }

  #[test]
  fn today_follows_the_timezone() {
    let noon = instant(
      "2024-01-15T12:00:00Z"
    );
    let early = instant(
      "2024-01-15T05:00:00Z"
    );

    let mut cfg = Config::default();
    assert_eq!(
      cfg.today_at(noon).to_string(),
      "2024-01-15"
    );

    cfg
      .apply_overrides(vec![(
        "timezone".to_string(),
        "Pacific/Kiritimati".to_string()
      )])
      .expect("timezone");
    assert_eq!(
      cfg.today_at(noon).to_string(),
      "2024-01-16"
    );

    let pacific = Config::from_toml(
      "timezone = \"America/Los_Angeles\"\n"
    )
    .expect("toml");
    assert_eq!(
      pacific.today_at(early).to_string(),
      "2024-01-14"
    );
  }

  #[test]
  fn environment_timezone_wins_when_set() {
    let mut cfg = Config::from_toml(
      "timezone = \"Asia/Seoul\"\n"
    )
    .expect("toml");

    cfg.timezone_from_env(None);
    cfg.timezone_from_env(Some("   "));
    assert_eq!(
      cfg.timezone(),
      chrono_tz::Asia::Seoul
    );

    cfg.timezone_from_env(Some(
      " Pacific/Kiritimati "
    ));
    assert_eq!(
      cfg.timezone(),
      chrono_tz::Pacific::Kiritimati
    );

    cfg.timezone_from_env(Some(
      "Mars/Olympus"
    ));
    cfg.sanitize();
    assert_eq!(cfg.timezone, None);
    assert_eq!(
      cfg.timezone(),
      chrono_tz::UTC
    );
  }

  #[test]
  fn color_override_needs_a_boolean() {
    let mut cfg = Config::default();
    cfg
      .apply_overrides(vec![(
        "color".to_string(),
        "off".to_string()
      )])
      .expect("color off");
    assert!(!cfg.color);
    assert!(
      cfg
        .apply_overrides(vec![(
          "color".to_string(),
          "sometimes".to_string()
        )])
        .is_err()
    );
    assert_eq!(parse_bool(" YES "), Some(true));
  }

  #[test]
  fn tilde_expands_only_as_home() {
    assert_eq!(
      expand_tilde(Path::new("/srv/kairo")),
      PathBuf::from("/srv/kairo")
    );
    assert_eq!(
      expand_tilde(Path::new("~other/x")),
      PathBuf::from("~other/x")
    );
    if let Some(home) = dirs::home_dir() {
      assert_eq!(
        expand_tilde(Path::new("~/data")),
        home.join("data")
      );
      assert_eq!(
        expand_tilde(Path::new("~")),
        home
      );
    }
  }

  #[test]
  fn data_dir_prefers_flag_then_config()
  {
    let mut cfg = Config::default();
    cfg.data_location =
      Some("/srv/kairo".to_string());
    assert_eq!(
      resolve_data_dir(
        &cfg,
        Some(Path::new("/tmp/flag"))
      )
      .expect("dir"),
      PathBuf::from("/tmp/flag")
    );
    assert_eq!(
      resolve_data_dir(&cfg, None)
        .expect("dir"),
      PathBuf::from("/srv/kairo")
    );
  }

  #[test]
  fn parses_inline_toml() {
    let cfg = Config::from_toml(
      "default_view = \"day\"\n"
    )
    .expect("toml");
    assert_eq!(
      cfg.default_view(),
      CalendarView::Day
    );
    assert!(cfg.color);
  }
}
