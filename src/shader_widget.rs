//! Shader widget hosting the photo city.
//!
//! The widget state owns the [`InteractionController`]; iced events are
//! translated into controller calls here and each draw hands the renderer a
//! fresh [`FrameSnapshot`]. Anything the application has to act on (hover,
//! selection, screenshots) goes back out as a [`Message`].

use std::sync::Arc;

use iced::time::Instant;
use iced::widget::shader::{self, wgpu};
use iced::{Rectangle, Size, event, keyboard, mouse, window};
use nalgebra::{Point2, Vector2};

use crate::Message;
use crate::assets::PhotoLibrary;
use crate::config::Config;
use crate::controller::{FrameSnapshot, HostRequest, InteractionController, InteractionState};
use crate::input::{InputState, NavKey};
use crate::renderer::Renderer;
use crate::scene::{CityMesh, ObjectTable};

/// Everything needed to build the scene, loaded once at startup
#[derive(Debug)]
pub(crate) struct SceneSetup {
    pub(crate) config: Config,
    pub(crate) photos: Arc<PhotoLibrary>,
    pub(crate) city: Arc<CityMesh>,
    /// Billboards as scattered at startup
    objects: ObjectTable,
}

impl SceneSetup {
    pub(crate) fn new(config: Config, photos: PhotoLibrary, city: CityMesh) -> Self {
        let objects = ObjectTable::scatter(&config.scene, &photos);
        log::info!(
            "scene ready: {} photos on {} billboards",
            photos.len(),
            objects.len()
        );
        Self {
            config,
            photos: Arc::new(photos),
            city: Arc::new(city),
            objects,
        }
    }

    fn build_controller(&self, bounds: Rectangle) -> InteractionController {
        InteractionController::new(
            self.config.camera.build_camera(),
            self.objects.clone(),
            &self.city,
            self.config.interaction.clone(),
            viewport_size(bounds),
        )
    }

    /// Frame drawn before the first event has created the controller
    fn initial_snapshot(&self, bounds: Rectangle) -> FrameSnapshot {
        let size = viewport_size(bounds);
        FrameSnapshot::capture(
            &self.config.camera.build_camera(),
            &self.objects,
            self.city.model,
            size.x / size.y,
        )
    }
}

fn viewport_size(bounds: Rectangle) -> Vector2<f32> {
    Vector2::new(bounds.width.max(1.0), bounds.height.max(1.0))
}

/// Custom primitive carrying one frame of the scene
#[derive(Debug, Clone)]
pub(crate) struct PhotoCityPrimitive {
    pub(crate) frame: FrameSnapshot,
    pub(crate) photos: Arc<PhotoLibrary>,
    pub(crate) city: Arc<CityMesh>,
}

impl shader::Primitive for PhotoCityPrimitive {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        storage: &mut shader::Storage,
        bounds: &Rectangle,
        viewport: &shader::Viewport,
    ) {
        let scale_factor = viewport.scale_factor() as f32;
        let target_size: Size<u32> = viewport.physical_size();

        if !storage.has::<Renderer>() {
            let renderer = pollster::block_on(Renderer::new(
                device,
                queue,
                format,
                *bounds,
                scale_factor,
                target_size,
                &self.photos,
                &self.city,
                self.frame.photos.len(),
            ));
            storage.store(renderer);
        }
        let Some(renderer) = storage.get_mut::<Renderer>() else {
            return;
        };
        renderer.resize(device, *bounds, scale_factor, target_size);
        renderer.update_frame(device, queue, &self.frame);
    }

    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        storage: &shader::Storage,
        target: &wgpu::TextureView,
        _clip_bounds: &Rectangle<u32>,
    ) {
        if let Some(renderer) = storage.get::<Renderer>() {
            renderer.render(encoder, target);
        }
    }
}

/// Internal state managed by the shader widget
#[derive(Default)]
pub(crate) struct PhotoCityState {
    /// Built on the first event, once the widget bounds are known
    controller: Option<InteractionController>,
    input: InputState,
    last_frame: Option<Instant>,
}

/// The shader program that drives the photo city
pub(crate) struct PhotoCityProgram {
    setup: Arc<SceneSetup>,
    fly_duration: f32,
}

impl PhotoCityProgram {
    pub(crate) fn new(setup: Arc<SceneSetup>, fly_duration: f32) -> Self {
        Self {
            setup,
            fly_duration,
        }
    }
}

impl shader::Program<Message> for PhotoCityProgram {
    type State = PhotoCityState;
    type Primitive = PhotoCityPrimitive;

    fn update(
        &self,
        state: &mut Self::State,
        event: shader::Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
        shell: &mut iced::advanced::Shell<'_, Message>,
    ) -> (event::Status, Option<Message>) {
        let controller = state
            .controller
            .get_or_insert_with(|| self.setup.build_controller(bounds));
        controller.resize(bounds.width, bounds.height);
        controller.set_fly_duration(self.fly_duration);

        let hovered_before = controller.hovered();

        let (status, message) = match event {
            shader::Event::Mouse(mouse_event) => {
                handle_mouse_event(controller, &state.input, mouse_event, bounds, cursor)
            }
            shader::Event::Keyboard(keyboard_event) => {
                state.input.update_modifiers(&keyboard_event);
                handle_keyboard_event(controller, keyboard_event)
            }
            shader::Event::RedrawRequested(now) => {
                if controller.is_animating() {
                    match state.last_frame {
                        Some(last) => controller.tick(now.duration_since(last).as_secs_f32()),
                        None => controller.tick_fixed(),
                    }
                }
                state.last_frame = controller.is_animating().then_some(now);
                (event::Status::Ignored, None)
            }
            _ => (event::Status::Ignored, None),
        };

        if controller.is_animating() {
            shell.request_redraw(window::RedrawRequest::NextFrame);
        }

        let hovered_after = controller.hovered();
        let message = message.or_else(|| {
            (hovered_before != hovered_after).then_some(Message::Hovered(hovered_after))
        });

        (status, message)
    }

    fn draw(
        &self,
        state: &Self::State,
        _cursor: mouse::Cursor,
        bounds: Rectangle,
    ) -> Self::Primitive {
        let frame = match &state.controller {
            Some(controller) => controller.frame_snapshot(),
            None => self.setup.initial_snapshot(bounds),
        };

        PhotoCityPrimitive {
            frame,
            photos: Arc::clone(&self.setup.photos),
            city: Arc::clone(&self.setup.city),
        }
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        let Some(controller) = &state.controller else {
            return mouse::Interaction::default();
        };
        match controller.state() {
            InteractionState::Dragging(_) => mouse::Interaction::Grabbing,
            InteractionState::Hovering(_) if cursor.is_over(bounds) => mouse::Interaction::Pointer,
            _ => mouse::Interaction::default(),
        }
    }
}

/// Cursor position relative to the widget, even outside its bounds
fn local_position(cursor: mouse::Cursor, bounds: Rectangle) -> Option<Point2<f32>> {
    cursor
        .position()
        .map(|position| Point2::new(position.x - bounds.x, position.y - bounds.y))
}

fn handle_mouse_event(
    controller: &mut InteractionController,
    input: &InputState,
    mouse_event: mouse::Event,
    bounds: Rectangle,
    cursor: mouse::Cursor,
) -> (event::Status, Option<Message>) {
    let dragging = matches!(controller.state(), InteractionState::Dragging(_));

    match mouse_event {
        mouse::Event::CursorMoved { .. } => {
            if dragging {
                if let Some(position) = local_position(cursor, bounds) {
                    controller.pointer_dragged(position);
                    return (event::Status::Captured, None);
                }
            } else if cursor.is_over(bounds) {
                if let Some(position) = local_position(cursor, bounds) {
                    controller.pointer_moved(position);
                }
            } else {
                controller.pointer_left();
            }
        }
        mouse::Event::ButtonPressed(button) => {
            if !cursor.is_over(bounds) {
                return (event::Status::Ignored, None);
            }
            let Some(position) = local_position(cursor, bounds) else {
                return (event::Status::Ignored, None);
            };
            let orbit = input.is_orbit_press(button);
            if orbit || button == mouse::Button::Left {
                let selected = controller.pointer_pressed(position, orbit);
                return (event::Status::Captured, selected.map(Message::Selected));
            }
        }
        mouse::Event::ButtonReleased(_) => {
            if dragging {
                controller.pointer_released();
                return (event::Status::Captured, None);
            }
        }
        mouse::Event::WheelScrolled { delta } => {
            if cursor.is_over(bounds) {
                let notches = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => y,
                    mouse::ScrollDelta::Pixels { y, .. } => y * 0.01,
                };
                controller.pointer_scrolled(notches);
                return (event::Status::Captured, None);
            }
        }
        mouse::Event::CursorLeft => controller.pointer_left(),
        mouse::Event::CursorEntered => {}
    }

    (event::Status::Ignored, None)
}

fn handle_keyboard_event(
    controller: &mut InteractionController,
    keyboard_event: keyboard::Event,
) -> (event::Status, Option<Message>) {
    let keyboard::Event::KeyPressed { key, .. } = keyboard_event else {
        return (event::Status::Ignored, None);
    };
    let Some(nav) = NavKey::from_key(&key) else {
        return (event::Status::Ignored, None);
    };

    let message = match controller.key_pressed(nav) {
        Some(HostRequest::Screenshot) => Some(Message::Screenshot),
        Some(HostRequest::DebugDump) => {
            log::info!("{}", controller.debug_summary());
            None
        }
        None => controller
            .cursor()
            .filter(|_| controller.is_animating())
            .map(Message::Selected),
    };

    (event::Status::Captured, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use iced::Point;

    fn setup() -> SceneSetup {
        let config = Config {
            scene: SceneConfig {
                photo_count: 6,
                city_blocks: 2,
                ..SceneConfig::default()
            },
            ..Config::default()
        };
        let city = CityMesh::generate(&config.scene);
        SceneSetup::new(config, PhotoLibrary::default(), city)
    }

    #[test]
    fn initial_frame_matches_the_first_controller() {
        let setup = setup();
        let bounds = Rectangle::new(Point::ORIGIN, Size::new(800.0, 600.0));

        let initial = setup.initial_snapshot(bounds);
        let live = setup.build_controller(bounds).frame_snapshot();

        assert_eq!(initial.view, live.view);
        assert_eq!(initial.projection, live.projection);
        assert_eq!(initial.city_model, live.city_model);
        assert_eq!(initial.photos.len(), 6);
        for (a, b) in initial.photos.iter().zip(&live.photos) {
            assert_eq!(a.model, b.model);
            assert!(!a.hovered);
        }
    }

    #[test]
    fn controllers_share_the_startup_scatter() {
        let setup = setup();
        let bounds = Rectangle::new(Point::ORIGIN, Size::new(0.0, 0.0));

        let first = setup.build_controller(bounds).frame_snapshot();
        let second = setup.build_controller(bounds).frame_snapshot();
        let models = |frame: &FrameSnapshot| frame.photos.iter().map(|p| p.model).collect::<Vec<_>>();
        assert_eq!(models(&first), models(&second));
        assert!(first.projection.iter().all(|v| v.is_finite()));
    }
}
