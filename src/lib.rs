// lib.rs — 全景标注核心：投影、相机、拾取、曲线、网格、标注与导出
//
// Everything here is GPU-free so it can be driven from tests; the window,
// wgpu renderer and egui menus live in the binary.

pub mod annotation;
pub mod camera;
pub mod config;
pub mod controller;
pub mod curve;
pub mod error;
pub mod export;
pub mod i18n;
pub mod mesh;
pub mod picking;
pub mod projection;

pub use annotation::{AnnotationId, AnnotationPath, AnnotationSet, Hotspot, HotspotKind, OverlayItem};
pub use camera::OrbitCamera;
pub use config::ViewerConfig;
pub use controller::{Controller, ControllerEvent, InputEvent, Key, PointerButton, Tool};
pub use curve::PathKind;
pub use error::{AnnotatorError, Result};
pub use mesh::Mesh;
pub use picking::Viewport;
pub use projection::YawPitch;
