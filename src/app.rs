// app.rs — 应用状态、后台加载与菜单动作 (打开 / 导入 / 导出)

use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbaImage};
use panorama_annotator::annotation::overlay_items;
use panorama_annotator::export::{
    composite, export_json, export_png, rasterize_paths, to_marzipano, AnnotationDocument, ViewParameters,
};
use panorama_annotator::i18n::{tr, tr_with};
use panorama_annotator::{AnnotatorError, Controller, OverlayItem, Result, ViewerConfig, Viewport};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;

pub type LoadResult = (PathBuf, Result<RgbaImage>);

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    OpenImage,
    ImportAnnotations,
    ExportOverlayPng,
    ExportCompositePng,
    ExportAnnotationJson,
    ExportMarzipanoJson,
    ToggleFullscreen,
    SetLanguage(String),
    Exit,
}

pub struct App {
    pub config: ViewerConfig,
    pub controller: Controller,
    /// Decoded panorama at full size, kept for composited export.
    pub panorama: Option<(PathBuf, RgbaImage)>,
    pub is_loading: bool,
    pub is_fullscreen: bool,
    pub show_fps: bool,
    pub fps: f32,
    pub lang: String,
    pub message: Option<String>,
    overlay_revision: Option<u64>,
    loader: Sender<LoadResult>,
}

fn decode_image(path: &Path) -> Result<RgbaImage> {
    let file = File::open(path).map_err(|e| AnnotatorError::io(path, e))?;
    let mut reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(|e| AnnotatorError::io(path, e))?;
    reader.no_limits();
    let img = reader.decode()?;
    let (w, h) = img.dimensions();
    log::info!("{}", tr_with("log.image_loaded_size", &[("w", w.to_string()), ("h", h.to_string())]));
    Ok(img.to_rgba8())
}

/// Decode on a worker thread; the result arrives on `tx`.
pub fn start_load_image(path: PathBuf, tx: Sender<LoadResult>) {
    thread::spawn(move || {
        log::info!("{}", tr_with("log.loading_image_bg", &[("path", path.display().to_string())]));
        let result = decode_image(&path);
        if tx.send((path, result)).is_err() {
            log::error!("{}", tr("error.send_to_main_failed"));
        }
    });
}

fn save_dialog(filter_key: &str, ext: &str, default_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(&tr(filter_key), &[ext])
        .set_file_name(default_name)
        .save_file()
}

impl App {
    pub fn new(config: ViewerConfig, viewport: Viewport, lang: String, loader: Sender<LoadResult>) -> Self {
        let controller = Controller::new(&config, viewport);
        Self {
            config,
            controller,
            panorama: None,
            is_loading: false,
            is_fullscreen: false,
            show_fps: false,
            fps: 0.0,
            lang,
            message: None,
            overlay_revision: None,
            loader,
        }
    }

    pub fn load_image(&mut self, path: PathBuf) {
        self.is_loading = true;
        start_load_image(path, self.loader.clone());
    }

    /// Take a finished decode. Returns the image to upload on success.
    pub fn finish_load(&mut self, (path, result): LoadResult) -> Option<&RgbaImage> {
        self.is_loading = false;
        match result {
            Ok(img) => {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if !name.is_empty() {
                    self.controller.annotations.scene_name = name;
                }
                self.message = None;
                self.panorama = Some((path, img));
                self.panorama.as_ref().map(|(_, img)| img)
            }
            Err(e) => {
                self.report(tr_with("error.decode_image", &[("err", e.to_string())]));
                None
            }
        }
    }

    /// New overlay geometry when the annotations changed since the last call.
    pub fn overlay_update(&mut self) -> Option<Vec<OverlayItem>> {
        let set = &self.controller.annotations;
        if self.overlay_revision == Some(set.revision()) {
            return None;
        }
        self.overlay_revision = Some(set.revision());
        Some(overlay_items(
            set,
            self.config.sphere.radius,
            &set.style,
            self.config.export.hotspot_color,
        ))
    }

    fn report(&mut self, message: String) {
        log::error!("{message}");
        self.message = Some(message);
    }

    fn done(&mut self, path: &Path) {
        let message = tr_with("log.exported", &[("path", path.display().to_string())]);
        log::info!("{message}");
        self.message = Some(message);
    }

    pub fn pick_image(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter(&tr("file.filter.images"), &IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.load_image(path);
        }
    }

    /// Run a menu action that does not need the window.
    pub fn run(&mut self, action: &UiAction) {
        let result = match action {
            UiAction::OpenImage => {
                self.pick_image();
                Ok(())
            }
            UiAction::ImportAnnotations => self.import_annotations(),
            UiAction::ExportOverlayPng => self.export_overlay(),
            UiAction::ExportCompositePng => self.export_composite(),
            UiAction::ExportAnnotationJson => self.export_annotations(),
            UiAction::ExportMarzipanoJson => self.export_marzipano(),
            UiAction::ToggleFullscreen | UiAction::SetLanguage(_) | UiAction::Exit => Ok(()),
        };
        if let Err(e) = result {
            self.report(tr_with("error.export", &[("err", e.to_string())]));
        }
    }

    fn import_annotations(&mut self) -> Result<()> {
        let Some(path) = rfd::FileDialog::new()
            .add_filter(&tr("file.filter.json"), &["json"])
            .pick_file()
        else {
            return Ok(());
        };
        let doc = AnnotationDocument::load(&path)?;
        let set = doc.to_set(self.config.path.clone());
        log::info!(
            "imported {} path(s), {} hotspot(s) from {}",
            set.paths().len(),
            set.hotspots().len(),
            path.display()
        );
        self.controller.annotations = set;
        // a fresh set restarts its revision counter
        self.overlay_revision = None;
        Ok(())
    }

    fn export_overlay(&mut self) -> Result<()> {
        let Some(path) = save_dialog("file.filter.png", "png", "overlay.png") else {
            return Ok(());
        };
        let cfg = &self.config.export;
        let overlay = rasterize_paths(&self.controller.annotations, cfg.width, cfg.height, cfg)?;
        export_png(&overlay, &path)?;
        self.done(&path);
        Ok(())
    }

    fn export_composite(&mut self) -> Result<()> {
        let Some((_, panorama)) = &self.panorama else {
            self.report(tr("error.no_panorama"));
            return Ok(());
        };
        let Some(path) = save_dialog("file.filter.png", "png", "annotated.png") else {
            return Ok(());
        };
        let (w, h) = panorama.dimensions();
        let overlay = rasterize_paths(&self.controller.annotations, w, h, &self.config.export)?;
        let out = composite(panorama, &overlay);
        export_png(&out, &path)?;
        self.done(&path);
        Ok(())
    }

    fn export_annotations(&mut self) -> Result<()> {
        let Some(path) = save_dialog("file.filter.json", "json", "annotations.json") else {
            return Ok(());
        };
        export_json(&AnnotationDocument::from_set(&self.controller.annotations), &path)?;
        self.done(&path);
        Ok(())
    }

    fn export_marzipano(&mut self) -> Result<()> {
        let Some(path) = save_dialog("file.filter.json", "json", "data.json") else {
            return Ok(());
        };
        let camera = &self.controller.camera;
        let view = ViewParameters::from_look(camera.look_angles(), camera.fov.to_radians());
        let set = &self.controller.annotations;
        let data = to_marzipano(set, &set.scene_name, view, camera.auto_rotate, &self.config.export);
        export_json(&data, &path)?;
        self.done(&path);
        Ok(())
    }
}
