// ui.rs — 菜单栏与状态栏

use crate::app::{App, UiAction};
use panorama_annotator::curve::PathKind;
use panorama_annotator::i18n::{tr, tr_with, LANGUAGES};
use panorama_annotator::{AnnotationId, Tool};

fn tool_label(tool: Tool) -> String {
    match tool {
        Tool::Navigate => tr("tool.navigate"),
        Tool::DrawPath(PathKind::Straight) => tr("tool.path_straight"),
        Tool::DrawPath(PathKind::Smooth) => tr("tool.path_smooth"),
        Tool::DrawPath(PathKind::Geodesic) => tr("tool.path_geodesic"),
        Tool::PlaceHotspot => tr("tool.hotspot"),
    }
}

const TOOLS: [Tool; 5] = [
    Tool::Navigate,
    Tool::DrawPath(PathKind::Straight),
    Tool::DrawPath(PathKind::Smooth),
    Tool::DrawPath(PathKind::Geodesic),
    Tool::PlaceHotspot,
];

fn action_button(ui: &mut egui::Ui, key: &str, action: UiAction, actions: &mut Vec<UiAction>) {
    if ui.button(tr(key)).clicked() {
        actions.push(action);
        ui.close_menu();
    }
}

pub fn draw_ui(ctx: &egui::Context, app: &mut App) -> Vec<UiAction> {
    let mut actions = Vec::new();

    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(tr("menu.file"), |ui| {
                action_button(ui, "file.open_image", UiAction::OpenImage, &mut actions);
                action_button(ui, "file.import_annotations", UiAction::ImportAnnotations, &mut actions);
                ui.separator();
                action_button(ui, "file.export_overlay_png", UiAction::ExportOverlayPng, &mut actions);
                ui.add_enabled_ui(app.panorama.is_some(), |ui| {
                    action_button(ui, "file.export_composite_png", UiAction::ExportCompositePng, &mut actions);
                });
                action_button(ui, "file.export_annotations_json", UiAction::ExportAnnotationJson, &mut actions);
                action_button(ui, "file.export_marzipano_json", UiAction::ExportMarzipanoJson, &mut actions);
                ui.separator();
                action_button(ui, "menu.exit", UiAction::Exit, &mut actions);
            });

            ui.menu_button(tr("menu.tools"), |ui| {
                let current = app.controller.tool();
                for tool in TOOLS {
                    if ui.radio(current == tool, tool_label(tool)).clicked() {
                        app.controller.set_tool(tool);
                        ui.close_menu();
                    }
                }
            });

            ui.menu_button(tr("menu.path"), |ui| {
                let set = &mut app.controller.annotations;
                let drawing = set.active().is_some();
                if ui.add_enabled(drawing, egui::Button::new(tr("path.finish"))).clicked() {
                    if let Err(e) = set.finish_path() {
                        app.message = Some(e.to_string());
                    }
                    ui.close_menu();
                }
                if ui.button(tr("path.undo")).clicked() {
                    set.undo_point();
                    ui.close_menu();
                }
                if ui.add_enabled(drawing, egui::Button::new(tr("path.cancel"))).clicked() {
                    set.cancel_path();
                    ui.close_menu();
                }
                if !set.paths().is_empty() {
                    ui.separator();
                }
                let listed: Vec<(AnnotationId, String, [u8; 4])> =
                    set.paths().iter().map(|p| (p.id, p.name.clone(), p.color)).collect();
                for (id, name, color) in listed {
                    ui.horizontal(|ui| {
                        let mut edited = color;
                        ui.color_edit_button_srgba_unmultiplied(&mut edited);
                        if edited != color {
                            if let Some(path) = set.path_mut(id) {
                                path.color = edited;
                            }
                        }
                        ui.label(name);
                        if ui.small_button("🗑").on_hover_text(tr("path.delete")).clicked() {
                            if let Err(e) = set.remove_path(id) {
                                app.message = Some(e.to_string());
                            }
                        }
                    });
                }
                ui.separator();
                if ui.add_enabled(!set.is_empty(), egui::Button::new(tr("path.clear"))).clicked() {
                    set.clear();
                    ui.close_menu();
                }
            });

            ui.menu_button(tr("menu.view"), |ui| {
                let camera = &mut app.controller.camera;
                if ui.button(tr("view.reset")).clicked() {
                    camera.reset();
                    ui.close_menu();
                }
                ui.checkbox(&mut camera.auto_rotate, tr("view.auto_rotate"));
                let fullscreen = if app.is_fullscreen {
                    "view.fullscreen.exit"
                } else {
                    "view.fullscreen.enter"
                };
                action_button(ui, fullscreen, UiAction::ToggleFullscreen, &mut actions);

                ui.separator();
                ui.menu_button(tr("view.input_sensitivity"), |ui| {
                    ui.add(egui::Slider::new(&mut camera.sensitivity, 0.1..=5.0).text(tr("view.multiplier")));
                    if ui.button(tr("view.reset_1_0")).clicked() {
                        camera.sensitivity = 1.0;
                    }
                });
                ui.separator();
                ui.checkbox(&mut app.show_fps, tr("view.show_fps"));
            });

            ui.menu_button(tr("menu.language"), |ui| {
                for (code, name) in LANGUAGES {
                    if ui.radio(app.lang == code, name).clicked() {
                        actions.push(UiAction::SetLanguage(code.to_string()));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if app.is_loading {
                ui.label(egui::RichText::new(tr("status.loading_image")).color(egui::Color32::YELLOW));
                ui.label("|");
            } else if app.panorama.is_none() {
                ui.label(egui::RichText::new(tr("status.no_image")).color(egui::Color32::GRAY));
                ui.label("|");
            }

            let controller = &app.controller;
            ui.label(format!("{} {}", tr("status.tool_prefix"), tool_label(controller.tool())));
            ui.label("|");
            ui.label(format!("FOV: {:.1}°", controller.camera.fov));
            ui.label("|");
            ui.label(format!("Yaw: {:.1}°", controller.camera.yaw));
            ui.label("|");
            ui.label(format!("Pitch: {:.1}°", controller.camera.pitch));

            if let Some(uv) = controller.hovered_uv() {
                ui.label("|");
                ui.label(format!("u {:.4}  v {:.4}", uv.x, uv.y));
            }

            let set = &controller.annotations;
            if let Some(active) = set.active() {
                ui.label("|");
                ui.label(tr_with("status.points", &[("n", active.points.len().to_string())]));
            }
            ui.label("|");
            ui.label(tr_with(
                "status.counts",
                &[
                    ("paths", set.paths().len().to_string()),
                    ("hotspots", set.hotspots().len().to_string()),
                ],
            ));

            if app.show_fps {
                ui.label("|");
                ui.label(egui::RichText::new(format!("FPS: {:.1}", app.fps)).color(egui::Color32::GREEN));
            }

            if let Some(message) = &app.message {
                ui.label("|");
                ui.label(message.as_str());
            }
        });
    });

    actions
}
