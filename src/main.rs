// main.rs — 窗口、事件循环：winit 事件 -> Controller，渲染 + egui 菜单

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod app;
mod fonts;
mod renderer;
mod ui;

use app::{App, LoadResult, UiAction};
use glam::Vec2;
use panorama_annotator::curve::PathKind;
use panorama_annotator::i18n::{self, tr};
use panorama_annotator::{InputEvent, Key, PointerButton, Tool, ViewerConfig, Viewport};
use renderer::Renderer;

use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Instant;
use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        MouseButton::Other(_) => None,
    }
}

enum Shortcut {
    Input(InputEvent),
    Tool(Tool),
    Action(UiAction),
    ResetView,
}

fn shortcut(key: VirtualKeyCode) -> Option<Shortcut> {
    use VirtualKeyCode as K;
    Some(match key {
        K::O => Shortcut::Action(UiAction::OpenImage),
        K::F11 => Shortcut::Action(UiAction::ToggleFullscreen),
        K::R => Shortcut::ResetView,
        K::Space => Shortcut::Input(InputEvent::Key(Key::ToggleAutoRotate)),
        K::Z | K::Back => Shortcut::Input(InputEvent::Key(Key::Undo)),
        K::Return => Shortcut::Input(InputEvent::Key(Key::FinishPath)),
        K::Escape => Shortcut::Input(InputEvent::Key(Key::Cancel)),
        K::Delete => Shortcut::Input(InputEvent::Key(Key::Delete)),
        K::Key1 => Shortcut::Tool(Tool::Navigate),
        K::Key2 => Shortcut::Tool(Tool::DrawPath(PathKind::Straight)),
        K::Key3 => Shortcut::Tool(Tool::DrawPath(PathKind::Smooth)),
        K::Key4 => Shortcut::Tool(Tool::DrawPath(PathKind::Geodesic)),
        K::Key5 => Shortcut::Tool(Tool::PlaceHotspot),
        _ => return None,
    })
}

fn set_fullscreen(window: &Window, app: &mut App) {
    app.is_fullscreen = !app.is_fullscreen;
    if app.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let lang = i18n::resolve_lang_from_env();
    i18n::init(lang.clone());

    let config = match ViewerConfig::resolve() {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    };

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title(tr("app.title"))
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)
    {
        Ok(w) => w,
        Err(e) => {
            log::error!("cannot create window: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = match pollster::block_on(Renderer::new(&window, &config)) {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    // 异步加载通道
    let (tx, rx): (Sender<LoadResult>, Receiver<LoadResult>) = channel();
    let size = window.inner_size();
    let initial_image = config.initial_image.clone();
    let mut app = App::new(config, Viewport::new(size.width, size.height), lang, tx);
    if let Some(path) = initial_image {
        app.load_image(path);
    }

    let mut cursor = Vec2::ZERO;
    let mut last_frame = Instant::now();
    let mut fps_window_start = Instant::now();
    let mut frame_count = 0u32;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Ok(loaded) = rx.try_recv() {
            if let Some(img) = app.finish_load(loaded) {
                renderer.load_panorama(img);
            }
        }

        match event {
            Event::WindowEvent { event, .. } => {
                // 先让 egui 处理事件
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        app.controller
                            .handle(InputEvent::Resize(Viewport::new(new_size.width, new_size.height)));
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state != ElementState::Pressed {
                            return;
                        }
                        match input.virtual_keycode.and_then(shortcut) {
                            Some(Shortcut::Input(ev)) => {
                                if let Some(done) = app.controller.handle(ev) {
                                    log::debug!("{done:?}");
                                }
                            }
                            Some(Shortcut::Tool(tool)) => {
                                app.controller.set_tool(tool);
                            }
                            Some(Shortcut::Action(UiAction::ToggleFullscreen)) => set_fullscreen(&window, &mut app),
                            Some(Shortcut::Action(action)) => app.run(&action),
                            Some(Shortcut::ResetView) => app.controller.camera.reset(),
                            None => {}
                        }
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        let Some(button) = pointer_button(button) else {
                            return;
                        };
                        let ev = match state {
                            ElementState::Pressed => InputEvent::PointerDown { pos: cursor, button },
                            ElementState::Released => InputEvent::PointerUp { pos: cursor, button },
                        };
                        if let Some(done) = app.controller.handle(ev) {
                            log::debug!("{done:?}");
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        cursor = Vec2::new(position.x as f32, position.y as f32);
                        app.controller.handle(InputEvent::PointerMove { pos: cursor });
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        app.controller.handle(InputEvent::Wheel { delta: scroll });
                    }

                    WindowEvent::DroppedFile(path) => app.load_image(path),

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                let now = Instant::now();
                let dt = now.duration_since(last_frame).as_secs_f32();
                last_frame = now;

                frame_count += 1;
                let elapsed = now.duration_since(fps_window_start).as_secs_f32();
                if elapsed >= 1.0 {
                    app.fps = frame_count as f32 / elapsed;
                    frame_count = 0;
                    fps_window_start = now;
                }

                app.controller.update(dt);
                if let Some(items) = app.overlay_update() {
                    renderer.upload_overlay(&items);
                }
                renderer.update_camera(&app.controller.camera);

                let mut actions = Vec::new();
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    actions = ui::draw_ui(ctx, &mut app);
                });

                for action in actions {
                    match action {
                        UiAction::Exit => *control_flow = ControlFlow::Exit,
                        UiAction::ToggleFullscreen => set_fullscreen(&window, &mut app),
                        UiAction::SetLanguage(code) => {
                            i18n::init(code.clone());
                            app.lang = code;
                            window.set_title(&tr("app.title"));
                        }
                        other => app.run(&other),
                    }
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::warn!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}
