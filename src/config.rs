/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Bad values are reported as warnings and replaced with their defaults.

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::grid::ColorIndex;
use crate::domain::palette::Palette;
use crate::sim::session::{Mode, PaintColor};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct EditorConfig {
    pub grid: GridConfig,
    pub editor: EditorSettings,
    pub palette: Palette,
    pub log: LogSettings,
    /// Problems found while resolving the file, for the caller to report.
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Pointer units of vertical drag per pulled level.
    pub pull_sensitivity: f32,
    pub initial_mode: Mode,
    pub initial_color: PaintColor,
    pub share_base_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings {
            pull_sensitivity: default_pull_sensitivity(),
            initial_mode: Mode::Paint,
            initial_color: PaintColor::Color(ColorIndex(0)),
            share_base_url: default_share_base_url(),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    grid: TomlGrid,
    #[serde(default)]
    editor: TomlEditor,
    #[serde(default)]
    palette: TomlPalette,
    #[serde(default)]
    log: TomlLog,
}

#[derive(Deserialize, Debug)]
struct TomlGrid {
    #[serde(default = "default_grid_size")]
    width: i64,
    #[serde(default = "default_grid_size")]
    height: i64,
}

#[derive(Deserialize, Debug)]
struct TomlEditor {
    #[serde(default = "default_pull_sensitivity")]
    pull_sensitivity: f32,
    #[serde(default = "default_initial_mode")]
    initial_mode: String,
    #[serde(default)]
    initial_color: i32,
    #[serde(default = "default_share_base_url")]
    share_base_url: String,
}

#[derive(Deserialize, Debug, Default)]
struct TomlPalette {
    #[serde(default)]
    colors: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default)]
    file: Option<String>,
}

// ── Defaults ──

const MAX_GRID_SIZE: i64 = 255;

fn default_grid_size() -> i64 { 32 }
fn default_pull_sensitivity() -> f32 { 1.0 } // one terminal row per level
fn default_initial_mode() -> String { "paint".into() }
fn default_share_base_url() -> String { "https://example.invalid/piecegrid/".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlGrid {
    fn default() -> Self {
        TomlGrid {
            width: default_grid_size(),
            height: default_grid_size(),
        }
    }
}

impl Default for TomlEditor {
    fn default() -> Self {
        TomlEditor {
            pull_sensitivity: default_pull_sensitivity(),
            initial_mode: default_initial_mode(),
            initial_color: 0,
            share_base_url: default_share_base_url(),
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog {
            level: default_log_level(),
            file: None,
        }
    }
}

// ── Loading ──

impl EditorConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/piecegrid`.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let (toml_cfg, mut warnings) = load_toml(&search_dirs);
        let mut cfg = resolve(toml_cfg);
        warnings.append(&mut cfg.warnings);
        cfg.warnings = warnings;
        cfg
    }

    /// Parse config text directly. A parse error yields defaults plus a warning.
    pub fn from_toml_str(text: &str) -> Self {
        match toml::from_str::<TomlConfig>(text) {
            Ok(t) => resolve(t),
            Err(e) => {
                let mut cfg = resolve(TomlConfig::default());
                cfg.warnings.push(format!("config.toml parse error: {e}"));
                cfg
            }
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        resolve(TomlConfig::default())
    }
}

fn resolve(t: TomlConfig) -> EditorConfig {
    let mut warnings = vec![];

    let mut size = |v: i64, axis: &str| -> usize {
        if (1..=MAX_GRID_SIZE).contains(&v) {
            v as usize
        } else {
            let clamped = v.clamp(1, MAX_GRID_SIZE);
            warnings.push(format!("grid.{axis} = {v} out of range, using {clamped}"));
            clamped as usize
        }
    };
    let grid = GridConfig {
        width: size(t.grid.width, "width"),
        height: size(t.grid.height, "height"),
    };

    let palette = if t.palette.colors.is_empty() {
        Palette::default()
    } else {
        Palette::from_hex_list(&t.palette.colors).unwrap_or_else(|| {
            warnings.push("palette.colors has an invalid entry, using the default palette".into());
            Palette::default()
        })
    };

    let pull_sensitivity = if t.editor.pull_sensitivity.is_finite() && t.editor.pull_sensitivity > 0.0 {
        t.editor.pull_sensitivity
    } else {
        warnings.push(format!(
            "editor.pull_sensitivity = {} must be positive, using {}",
            t.editor.pull_sensitivity, default_pull_sensitivity(),
        ));
        default_pull_sensitivity()
    };

    let initial_mode = t.editor.initial_mode.parse::<Mode>().unwrap_or_else(|e| {
        warnings.push(format!("editor.initial_mode: {e}"));
        Mode::Paint
    });

    let initial_color = match t.editor.initial_color {
        i if i < 0 => PaintColor::Erase,
        i => match u8::try_from(i).ok().map(ColorIndex).filter(|c| palette.contains(*c)) {
            Some(c) => PaintColor::Color(c),
            None => {
                warnings.push(format!("editor.initial_color = {i} is not in the palette, using 0"));
                PaintColor::Color(ColorIndex(0))
            }
        },
    };

    EditorConfig {
        grid,
        editor: EditorSettings {
            pull_sensitivity,
            initial_mode,
            initial_color,
            share_base_url: t.editor.share_base_url,
        },
        palette,
        log: LogSettings {
            level: t.log.level,
            file: t.log.file.map(PathBuf::from),
        },
        warnings,
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data dir (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/piecegrid");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> (TomlConfig, Vec<String>) {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return (cfg, vec![]),
                    Err(e) => {
                        return (TomlConfig::default(), vec![
                            format!("config.toml parse error: {e}; using default settings"),
                        ]);
                    }
                },
                Err(e) => {
                    return (TomlConfig::default(), vec![
                        format!("could not read {}: {e}", path.display()),
                    ]);
                }
            }
        }
    }
    (TomlConfig::default(), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = EditorConfig::from_toml_str("");
        assert_eq!(cfg.grid, GridConfig { width: 32, height: 32 });
        assert_eq!(cfg.editor, EditorSettings::default());
        assert_eq!(cfg.palette.len(), 10);
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.log.file, None);
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn values_are_read() {
        let cfg = EditorConfig::from_toml_str(r##"
            [grid]
            width = 16
            height = 8

            [editor]
            pull_sensitivity = 2.5
            initial_mode = "debug"
            initial_color = -1

            [palette]
            colors = ["#000000", "#ffffff"]

            [log]
            level = "debug"
            file = "pg.log"
        "##);
        assert_eq!(cfg.grid, GridConfig { width: 16, height: 8 });
        assert_eq!(cfg.editor.pull_sensitivity, 2.5);
        assert_eq!(cfg.editor.initial_mode, Mode::Debug);
        assert_eq!(cfg.editor.initial_color, PaintColor::Erase);
        assert_eq!(cfg.palette.len(), 2);
        assert_eq!(cfg.log.file, Some(PathBuf::from("pg.log")));
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn bad_values_fall_back_with_warnings() {
        let cfg = EditorConfig::from_toml_str(r##"
            [grid]
            width = 0
            height = 4000

            [editor]
            pull_sensitivity = -3.0
            initial_mode = "sculpt"
            initial_color = 42

            [palette]
            colors = ["#12345"]
        "##);
        assert_eq!(cfg.grid, GridConfig { width: 1, height: 255 });
        assert_eq!(cfg.editor.pull_sensitivity, 1.0);
        assert_eq!(cfg.editor.initial_mode, Mode::Paint);
        assert_eq!(cfg.editor.initial_color, PaintColor::Color(ColorIndex(0)));
        assert_eq!(cfg.palette, Palette::default());
        assert_eq!(cfg.warnings.len(), 6);
    }

    #[test]
    fn parse_error_uses_defaults() {
        let cfg = EditorConfig::from_toml_str("[grid\nwidth = ");
        assert_eq!(cfg.grid.width, 32);
        assert_eq!(cfg.warnings.len(), 1);
    }
}
