// Pointer input -> annotations -> overlay geometry and exports, without a GPU.

use approx::assert_abs_diff_eq;
use glam::Vec2;
use panorama_annotator::annotation::overlay_items;
use panorama_annotator::config::{CameraConfig, ExportConfig};
use panorama_annotator::export::{
    rasterize_paths, to_json_string, to_marzipano, AnnotationDocument, ViewParameters,
};
use panorama_annotator::projection::direction_to_uv;
use panorama_annotator::{
    Controller, ControllerEvent, HotspotKind, InputEvent, PathKind, PointerButton, Tool, ViewerConfig, Viewport,
    YawPitch,
};

const VP: Viewport = Viewport {
    width: 800,
    height: 400,
};

fn controller_facing_the_seam() -> Controller {
    let config = ViewerConfig {
        camera: CameraConfig {
            auto_rotate: false,
            yaw_deg: 180.0,
            ..CameraConfig::default()
        },
        ..ViewerConfig::default()
    };
    Controller::new(&config, VP)
}

fn click(c: &mut Controller, x: f32, y: f32, button: PointerButton) -> Option<ControllerEvent> {
    let pos = Vec2::new(x, y);
    c.handle(InputEvent::PointerMove { pos });
    c.handle(InputEvent::PointerDown { pos, button });
    c.handle(InputEvent::PointerUp { pos, button })
}

/// Two points either side of the seam joined by a geodesic, plus one hotspot
/// above the horizon.
fn annotated() -> Controller {
    let mut c = controller_facing_the_seam();
    c.set_tool(Tool::DrawPath(PathKind::Geodesic));
    click(&mut c, 300.0, 200.0, PointerButton::Primary);
    click(&mut c, 500.0, 200.0, PointerButton::Primary);
    let finished = click(&mut c, 500.0, 200.0, PointerButton::Secondary);
    assert!(matches!(finished, Some(ControllerEvent::PathFinished(_))));

    c.set_tool(Tool::PlaceHotspot);
    let placed = click(&mut c, 400.0, 100.0, PointerButton::Primary);
    assert!(matches!(placed, Some(ControllerEvent::HotspotPlaced(_))));
    c
}

#[test]
fn clicks_straddle_the_seam() {
    let c = annotated();
    let path = &c.annotations.paths()[0];
    let u: Vec<f32> = path.points.iter().map(|d| direction_to_uv(*d).unwrap().x).collect();
    assert!(u[0] > 0.9 && u[0] < 1.0, "{u:?}");
    assert!(u[1] > 0.0 && u[1] < 0.1, "{u:?}");
    for p in &path.points {
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-4);
    }
    assert!(c.annotations.hotspots()[0].position.pitch > 0.0);
}

#[test]
fn overlay_geometry_is_valid() {
    let c = annotated();
    let cfg = ViewerConfig::default();
    let items = overlay_items(&c.annotations, cfg.sphere.radius, &cfg.path, cfg.export.hotspot_color);
    // one tube, one hotspot marker, no markers for a finished path
    assert_eq!(items.len(), 2);
    for item in &items {
        assert!(item.mesh.is_valid());
        assert!(item.mesh.triangle_count() > 0);
        for p in &item.mesh.positions {
            let r = glam::Vec3::from(*p).length();
            assert!(r < cfg.sphere.radius, "overlay vertex outside the panorama: {r}");
        }
    }
}

#[test]
fn raster_overlay_wraps_at_the_seam() {
    let c = annotated();
    let img = rasterize_paths(&c.annotations, 360, 180, &ExportConfig::default()).unwrap();
    assert!(img.get_pixel(0, 90)[3] > 0, "left edge");
    assert!(img.get_pixel(359, 90)[3] > 0, "right edge");
    assert_eq!(img.get_pixel(180, 90)[3], 0, "the path must not run the long way round");
}

#[test]
fn annotation_json_survives_a_round_trip() {
    let c = annotated();
    let doc = AnnotationDocument::from_set(&c.annotations);
    let text = to_json_string(&doc).unwrap();
    let back = AnnotationDocument::from_json_str(&text).unwrap();
    assert_eq!(back.paths.len(), 1);
    assert_eq!(back.paths[0].kind, PathKind::Geodesic);
    assert_eq!(back.hotspots.len(), 1);
    assert!(matches!(back.hotspots[0].kind, HotspotKind::Info { .. }));

    let set = back.to_set(ViewerConfig::default().path);
    let original = &c.annotations.paths()[0].points;
    let restored = &set.paths()[0].points;
    assert_eq!(original.len(), restored.len());
    for (a, b) in original.iter().zip(restored) {
        assert!(a.abs_diff_eq(*b, 1e-5), "{a:?} vs {b:?}");
    }
}

#[test]
fn marzipano_pitch_points_down() {
    let c = annotated();
    let view = ViewParameters::from_look(YawPitch::default(), 1.2);
    let data = to_marzipano(&c.annotations, "tour", view, false, &ExportConfig::default());
    let value: serde_json::Value = serde_json::from_str(&to_json_string(&data).unwrap()).unwrap();

    let scene = &value["scenes"][0];
    let hotspot_pitch = c.annotations.hotspots()[0].position.pitch;
    let exported = scene["infoHotspots"][0]["pitch"].as_f64().unwrap() as f32;
    assert_abs_diff_eq!(exported, -hotspot_pitch, epsilon = 1e-5);
    assert_eq!(scene["paths"][0]["points"].as_array().unwrap().len(), 2);
    assert_eq!(value["settings"]["autorotateEnabled"], false);
    assert!(scene["linkHotspots"].as_array().unwrap().is_empty());
}
