// fonts.rs — egui UI 字体
//
// egui's bundled fonts have no CJK glyphs. Search the system font dirs and
// ./assets for the first font ab_glyph can parse and put it in front of both
// families. .ttc support in ab_glyph is patchy; unparseable files are skipped.

use panorama_annotator::i18n::{tr, tr_with};
use std::path::PathBuf;

const ASSET_FONTS: [&str; 6] = [
    "NotoSansCJK-Regular.ttc",
    "NotoSansSC-Regular.otf",
    "NotoSansSC-Regular.ttf",
    "NotoSans-Regular.ttf",
    "NotoSans-Regular.otf",
    "ui.ttf",
];

fn system_fonts() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if cfg!(windows) {
        let dir = PathBuf::from(r"C:\Windows\Fonts");
        for f in ["msyh.ttf", "msyhbd.ttf", "simhei.ttf", "Deng.ttf", "segoeui.ttf", "arial.ttf"] {
            out.push(dir.join(f));
        }
    } else if cfg!(target_os = "macos") {
        for f in [
            "/System/Library/Fonts/PingFang.ttc",
            "/System/Library/Fonts/Hiragino Sans GB.ttc",
            "/System/Library/Fonts/STHeiti Light.ttc",
            "/Library/Fonts/NotoSansSC-Regular.otf",
            "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        ] {
            out.push(PathBuf::from(f));
        }
    } else if cfg!(unix) {
        for f in [
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/opentype/noto/NotoSansSC-Regular.otf",
            "/usr/share/fonts/truetype/noto/NotoSansSC-Regular.ttf",
            "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
        ] {
            out.push(PathBuf::from(f));
        }
        if let Ok(home) = std::env::var("HOME") {
            let home = PathBuf::from(home);
            out.push(home.join(".local/share/fonts/NotoSansSC-Regular.otf"));
            out.push(home.join(".fonts/NotoSansSC-Regular.otf"));
        }
    }
    out
}

fn candidates() -> Vec<PathBuf> {
    let mut out = system_fonts();
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.to_path_buf()));
    for dir in exe_dir.into_iter().chain(std::iter::once(PathBuf::new())) {
        for f in ASSET_FONTS {
            out.push(dir.join("assets").join("fonts").join(f));
        }
    }
    out
}

fn load_first_parseable() -> Option<(PathBuf, Vec<u8>)> {
    candidates().into_iter().find_map(|path| {
        let bytes = std::fs::read(&path).ok()?;
        ab_glyph::FontRef::try_from_slice(&bytes).ok()?;
        Some((path, bytes))
    })
}

pub fn install(ctx: &egui::Context) {
    let Some((path, bytes)) = load_first_parseable() else {
        log::warn!("{}", tr("font.not_found"));
        return;
    };
    log::info!("{}", tr_with("font.using", &[("path", path.display().to_string())]));

    let mut fonts = egui::FontDefinitions::default();
    fonts.font_data.insert("ui".to_owned(), egui::FontData::from_owned(bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        if let Some(list) = fonts.families.get_mut(&family) {
            list.insert(0, "ui".to_owned());
        }
    }
    ctx.set_fonts(fonts);
}
