use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "labeldex";

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub keys: Keys,
    pub ui: UiColors,
    pub export: ExportConfig,
}

/// Label-sheet export settings.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Default output file when no path is given.
    pub default_output: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_output: PathBuf::from("Address_Labels.docx"),
        }
    }
}

/// Expand ~ to the home directory in paths.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub marked_fg: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            border: RgbColor::new(110, 110, 110),
            selection_bg: RgbColor::new(215, 175, 95),
            selection_fg: RgbColor::new(20, 20, 20),
            marked_fg: RgbColor::new(215, 175, 95),
            status_fg: RgbColor::new(20, 20, 20),
            status_bg: RgbColor::new(110, 160, 110),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context.
#[derive(Debug, Clone, Default)]
pub struct Keys {
    /// Keys that work in most contexts
    pub global: GlobalKeys,
    /// Keys for the contact list (including while the filter box has focus)
    pub list: ListKeys,
    /// Keys for modal dialogs (confirm, form, path input)
    pub modal: ModalKeys,
    /// Keys for single-line inline editing
    pub editor: EditorKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub search: Vec<String>,
    pub help: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ListKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub page_down: Vec<String>,
    pub page_up: Vec<String>,
    pub mark: Vec<String>,
    pub add: Vec<String>,
    pub edit: Vec<String>,
    pub edit_key: Vec<String>,
    pub delete: Vec<String>,
    pub open: Vec<String>,
    pub save: Vec<String>,
    pub save_as: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ModalKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub add_line: Vec<String>,
    pub remove_line: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EditorKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
            search: vec!["/".into()],
            help: vec!["F1".into(), "?".into()],
        }
    }
}

impl Default for ListKeys {
    fn default() -> Self {
        Self {
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            page_down: vec!["PageDown".into()],
            page_up: vec!["PageUp".into()],
            mark: vec!["Space".into()],
            add: vec!["a".into()],
            edit: vec!["e".into()],
            edit_key: vec!["K".into()],
            delete: vec!["x".into()],
            open: vec!["o".into()],
            save: vec!["w".into()],
            save_as: vec!["W".into()],
        }
    }
}

impl Default for ModalKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into()],
            confirm: vec!["Enter".into()],
            next: vec!["Tab".into(), "Down".into()],
            prev: vec!["Backtab".into(), "Up".into()],
            add_line: vec!["Ctrl+n".into()],
            remove_line: vec!["Ctrl+d".into()],
        }
    }
}

impl Default for EditorKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into()],
            confirm: vec!["Enter".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    list: ListKeysFile,
    modal: ModalKeysFile,
    editor: EditorKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    search: KeyBinding,
    help: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            search: KeyBinding::Multiple(defaults.search),
            help: KeyBinding::Multiple(defaults.help),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ListKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    page_down: KeyBinding,
    page_up: KeyBinding,
    mark: KeyBinding,
    add: KeyBinding,
    edit: KeyBinding,
    edit_key: KeyBinding,
    delete: KeyBinding,
    open: KeyBinding,
    save: KeyBinding,
    save_as: KeyBinding,
}

impl Default for ListKeysFile {
    fn default() -> Self {
        let defaults = ListKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            page_down: KeyBinding::Multiple(defaults.page_down),
            page_up: KeyBinding::Multiple(defaults.page_up),
            mark: KeyBinding::Multiple(defaults.mark),
            add: KeyBinding::Multiple(defaults.add),
            edit: KeyBinding::Multiple(defaults.edit),
            edit_key: KeyBinding::Multiple(defaults.edit_key),
            delete: KeyBinding::Multiple(defaults.delete),
            open: KeyBinding::Multiple(defaults.open),
            save: KeyBinding::Multiple(defaults.save),
            save_as: KeyBinding::Multiple(defaults.save_as),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ModalKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
    add_line: KeyBinding,
    remove_line: KeyBinding,
}

impl Default for ModalKeysFile {
    fn default() -> Self {
        let defaults = ModalKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            add_line: KeyBinding::Multiple(defaults.add_line),
            remove_line: KeyBinding::Multiple(defaults.remove_line),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EditorKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
}

impl Default for EditorKeysFile {
    fn default() -> Self {
        let defaults = EditorKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: file.global.into(),
            list: file.list.into(),
            modal: file.modal.into(),
            editor: file.editor.into(),
        }
    }
}

impl From<GlobalKeysFile> for GlobalKeys {
    fn from(file: GlobalKeysFile) -> Self {
        Self {
            quit: file.quit.into_vec(),
            search: file.search.into_vec(),
            help: file.help.into_vec(),
        }
    }
}

impl From<ListKeysFile> for ListKeys {
    fn from(file: ListKeysFile) -> Self {
        Self {
            next: file.next.into_vec(),
            prev: file.prev.into_vec(),
            page_down: file.page_down.into_vec(),
            page_up: file.page_up.into_vec(),
            mark: file.mark.into_vec(),
            add: file.add.into_vec(),
            edit: file.edit.into_vec(),
            edit_key: file.edit_key.into_vec(),
            delete: file.delete.into_vec(),
            open: file.open.into_vec(),
            save: file.save.into_vec(),
            save_as: file.save_as.into_vec(),
        }
    }
}

impl From<ModalKeysFile> for ModalKeys {
    fn from(file: ModalKeysFile) -> Self {
        Self {
            cancel: file.cancel.into_vec(),
            confirm: file.confirm.into_vec(),
            next: file.next.into_vec(),
            prev: file.prev.into_vec(),
            add_line: file.add_line.into_vec(),
            remove_line: file.remove_line.into_vec(),
        }
    }
}

impl From<EditorKeysFile> for EditorKeys {
    fn from(file: EditorKeysFile) -> Self {
        Self {
            cancel: file.cancel.into_vec(),
            confirm: file.confirm.into_vec(),
        }
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Normalize a key binding string to a canonical form for collision
/// detection. Single characters preserve case ('W' is Shift+w, distinct
/// from 'w'); named keys are case-insensitive.
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

fn validate_key_bindings(keys: &Keys) -> Result<()> {
    check_context_collisions(
        &[
            ("quit", &keys.global.quit),
            ("search", &keys.global.search),
            ("help", &keys.global.help),
        ],
        "global",
    )?;

    check_context_collisions(
        &[
            ("next", &keys.list.next),
            ("prev", &keys.list.prev),
            ("page_down", &keys.list.page_down),
            ("page_up", &keys.list.page_up),
            ("mark", &keys.list.mark),
            ("add", &keys.list.add),
            ("edit", &keys.list.edit),
            ("edit_key", &keys.list.edit_key),
            ("delete", &keys.list.delete),
            ("open", &keys.list.open),
            ("save", &keys.list.save),
            ("save_as", &keys.list.save_as),
        ],
        "list",
    )?;

    check_context_collisions(
        &[
            ("cancel", &keys.modal.cancel),
            ("confirm", &keys.modal.confirm),
            ("next", &keys.modal.next),
            ("prev", &keys.modal.prev),
            ("add_line", &keys.modal.add_line),
            ("remove_line", &keys.modal.remove_line),
        ],
        "modal",
    )?;

    check_context_collisions(
        &[
            ("cancel", &keys.editor.cancel),
            ("confirm", &keys.editor.confirm),
        ],
        "editor",
    )?;

    Ok(())
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    keys: KeysFile,
    ui: UiFile,
    export: ExportFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: ColorsFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ColorsFile {
    border: Option<RgbColor>,
    selection_bg: Option<RgbColor>,
    selection_fg: Option<RgbColor>,
    marked_fg: Option<RgbColor>,
    status_fg: Option<RgbColor>,
    status_bg: Option<RgbColor>,
}

impl From<ColorsFile> for UiColors {
    fn from(file: ColorsFile) -> Self {
        let defaults = UiColors::default();
        Self {
            border: file.border.unwrap_or(defaults.border),
            selection_bg: file.selection_bg.unwrap_or(defaults.selection_bg),
            selection_fg: file.selection_fg.unwrap_or(defaults.selection_fg),
            marked_fg: file.marked_fg.unwrap_or(defaults.marked_fg),
            status_fg: file.status_fg.unwrap_or(defaults.status_fg),
            status_bg: file.status_bg.unwrap_or(defaults.status_bg),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExportFile {
    default_output: Option<PathBuf>,
}

impl From<ExportFile> for ExportConfig {
    fn from(file: ExportFile) -> Self {
        let defaults = ExportConfig::default();
        Self {
            default_output: file
                .default_output
                .map(|p| expand_tilde(&p))
                .unwrap_or(defaults.default_output),
        }
    }
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load configuration. A missing file at the default location yields
/// defaults; an explicitly requested path must exist.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            let path = expand_tilde(path);
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path
        }
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                return Ok(Config {
                    config_path: path,
                    keys: Keys::default(),
                    ui: UiColors::default(),
                    export: ExportConfig::default(),
                });
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    let cfg_file: ConfigFile = toml::from_str(&raw)
        .with_context(|| format!("failed to parse {} as TOML", path.display()))?;

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path: path,
        keys,
        ui: cfg_file.ui.colors.into(),
        export: cfg_file.export.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        validate_key_bindings(&Keys::default()).unwrap();
    }

    #[test]
    fn single_or_list_bindings_parse() {
        let cfg: ConfigFile = toml::from_str(
            r#"
            [keys.global]
            quit = "Q"

            [keys.list]
            next = ["n", "Down"]
            "#,
        )
        .unwrap();
        let keys: Keys = cfg.keys.into();
        assert_eq!(keys.global.quit, vec!["Q"]);
        assert_eq!(keys.list.next, vec!["n", "Down"]);
        // Unspecified actions keep their defaults.
        assert_eq!(keys.list.mark, vec!["Space"]);
    }

    #[test]
    fn collisions_are_rejected() {
        let keys = Keys {
            global: GlobalKeys {
                quit: vec!["q".into()],
                search: vec!["q".into()],
                help: vec!["?".into()],
            },
            ..Keys::default()
        };
        assert!(validate_key_bindings(&keys).is_err());
    }

    #[test]
    fn case_distinguishes_single_chars_not_named_keys() {
        assert_ne!(normalize_binding("w"), normalize_binding("W"));
        assert_eq!(normalize_binding("ENTER"), normalize_binding("enter"));
    }

    #[test]
    fn colors_accept_arrays_and_maps() {
        let cfg: ConfigFile = toml::from_str(
            r#"
            [ui.colors]
            border = [1, 2, 3]
            status_bg = { r = 4, g = 5, b = 6 }
            "#,
        )
        .unwrap();
        let colors: UiColors = cfg.ui.colors.into();
        assert_eq!(colors.border.g, 2);
        assert_eq!(colors.status_bg.b, 6);
    }

    #[test]
    fn export_output_is_configurable() {
        let cfg: ConfigFile = toml::from_str(
            r#"
            [export]
            default_output = "labels.docx"
            "#,
        )
        .unwrap();
        let export: ExportConfig = cfg.export.into();
        assert_eq!(export.default_output, PathBuf::from("labels.docx"));
    }
}
