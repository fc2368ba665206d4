// i18n.rs — 运行时多语言
//
// Strings live in either:
//   A) assets/i18n/<lang>.json
//   B) assets/i18n.json (single file, format: { "<lang>": { "key": "value" } })
// Lookup order: selected lang -> English -> the key itself.
// English is also compiled in, so a missing assets dir still gives readable menus.
//
// Language selection: --lang <code>, then PANORAMA_LANG, then English.

use crate::config::flag_value;
use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const FALLBACK_LANG: &str = "en";

/// Languages offered in the menu: (code, native name).
pub const LANGUAGES: [(&str, &str); 2] = [("en", "English"), ("zh-Hans", "简体中文")];

const BUILTIN_EN: &str = include_str!("../assets/i18n/en.json");

type Table = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub lang: String,
    map: Table,
    fallback: Table,
}

static I18N: OnceCell<RwLock<Catalog>> = OnceCell::new();

impl Catalog {
    pub fn new(lang: impl Into<String>, map: Table, fallback: Table) -> Self {
        Self {
            lang: lang.into(),
            map,
            fallback,
        }
    }

    /// Load `lang` from the assets dir, English underneath it.
    pub fn load(lang: &str) -> Self {
        let fallback = load_lang(FALLBACK_LANG).unwrap_or_else(builtin_english);
        let map = if lang == FALLBACK_LANG {
            fallback.clone()
        } else {
            load_lang(lang).unwrap_or_else(|| {
                log::warn!("no strings for language '{lang}', using {FALLBACK_LANG}");
                Table::new()
            })
        };
        Self::new(lang, map, fallback)
    }

    pub fn get(&self, key: &str) -> String {
        self.map
            .get(key)
            .or_else(|| self.fallback.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    pub fn format(&self, key: &str, args: &[(&str, String)]) -> String {
        substitute(&self.get(key), args)
    }
}

/// Replace `{name}` placeholders; unknown placeholders are kept as-is.
fn substitute(template: &str, args: &[(&str, String)]) -> String {
    let mut s = template.to_string();
    for (k, v) in args {
        s = s.replace(&format!("{{{k}}}"), v);
    }
    s
}

fn builtin_english() -> Table {
    serde_json::from_str(BUILTIN_EN).unwrap_or_default()
}

fn load_json_map(path: &Path) -> Option<Table> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("ignoring {}: {e}", path.display());
            None
        }
    }
}

fn load_multi_lang_json(path: &Path, lang: &str) -> Option<Table> {
    let text = std::fs::read_to_string(path).ok()?;
    let mut all: HashMap<String, Table> = serde_json::from_str(&text).ok()?;
    all.remove(lang)
}

/// <exe_dir>/assets/<rel>, then ./assets/<rel>.
fn find_asset(rel: &Path) -> Option<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    exe_dir
        .into_iter()
        .chain(std::iter::once(PathBuf::new()))
        .map(|dir| dir.join("assets").join(rel))
        .find(|p| p.exists())
}

fn load_lang(lang: &str) -> Option<Table> {
    let per_lang = Path::new("i18n").join(format!("{lang}.json"));
    if let Some(m) = find_asset(&per_lang).and_then(|p| load_json_map(&p)) {
        return Some(m);
    }
    find_asset(Path::new("i18n.json")).and_then(|p| load_multi_lang_json(&p, lang))
}

/// Initialize the global catalog. Later calls switch language.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();
    let catalog = Catalog::load(&lang);
    log::info!("language: {lang}");

    if let Some(lock) = I18N.get() {
        if let Ok(mut w) = lock.write() {
            *w = catalog;
        }
    } else {
        let _ = I18N.set(RwLock::new(catalog));
    }
}

/// Localized text by key. Missing keys come back unchanged.
pub fn tr(key: &str) -> String {
    match I18N.get().and_then(|l| l.read().ok()) {
        Some(c) => c.get(key),
        None => key.to_string(),
    }
}

pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    substitute(&tr(key), args)
}

pub fn resolve_lang(args: &[String], env_value: Option<&str>) -> String {
    if let Some(v) = flag_value(args, "--lang") {
        return v.to_string();
    }
    env_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_LANG.to_string())
}

pub fn resolve_lang_from_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    resolve_lang(&args, std::env::var("PANORAMA_LANG").ok().as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> Table {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn lookup_falls_back_to_english_then_key() {
        let c = Catalog::new(
            "zh-Hans",
            table(&[("menu.file", "文件")]),
            table(&[("menu.file", "File"), ("menu.view", "View")]),
        );
        assert_eq!(c.get("menu.file"), "文件");
        assert_eq!(c.get("menu.view"), "View");
        assert_eq!(c.get("menu.nope"), "menu.nope");
    }

    #[test]
    fn placeholders_are_substituted() {
        let c = Catalog::new("en", table(&[("msg", "{n} of {total} ({missing})")]), Table::new());
        let s = c.format("msg", &[("n", "2".into()), ("total", "5".into())]);
        assert_eq!(s, "2 of 5 ({missing})");
    }

    #[test]
    fn builtin_english_covers_the_menus() {
        let en = builtin_english();
        for key in ["app.title", "menu.file", "menu.tools", "menu.path", "menu.view", "menu.language"] {
            assert!(en.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn translations_do_not_invent_keys() {
        let en = builtin_english();
        let zh: Table = serde_json::from_str(include_str!("../assets/i18n/zh-Hans.json")).unwrap();
        for key in zh.keys() {
            assert!(en.contains_key(key), "zh-Hans has {key} but English does not");
        }
    }

    #[test]
    fn lang_from_cli_then_env() {
        let args: Vec<String> = ["viewer", "--lang", "zh-Hans"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolve_lang(&args, Some("fr")), "zh-Hans");
        assert_eq!(resolve_lang(&[], Some(" fr ")), "fr");
        assert_eq!(resolve_lang(&[], None), FALLBACK_LANG);
    }
}
