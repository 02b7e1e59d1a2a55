//! Wireframe city with clickable photo billboards.
//!
//! Hover a photo to highlight it, click it to fly the camera in front of it,
//! Shift-drag or right-drag to orbit, scroll to zoom and use the arrow keys to
//! step through the photos. Uses iced for UI and wgpu for GPU rendering.

use std::sync::Arc;

use iced::widget::{Column, Row, Shader, Slider, button, text};
use iced::{Element, Length, Settings, Task, window};

mod animation;
mod assets;
mod camera;
mod config;
mod controller;
mod error;
mod input;
mod math;
mod ray_casting;
mod renderer;
mod scene;
mod shader_widget;

use assets::PhotoLibrary;
use config::Config;
use scene::CityMesh;
use shader_widget::{PhotoCityProgram, SceneSetup};

/// Main application state - handles UI controls only
#[derive(Debug)]
pub(crate) struct PhotoCityApp {
    setup: Arc<SceneSetup>,
    fly_duration: f32,
    hovered: Option<usize>,
    selected: Option<usize>,
}

/// Messages that the application can receive
#[derive(Debug, Clone)]
pub(crate) enum Message {
    FlyDuration(f32),
    Hovered(Option<usize>),
    Selected(usize),
    Screenshot,
    ScreenshotTaken(window::Screenshot),
}

impl PhotoCityApp {
    pub(crate) fn new(setup: SceneSetup) -> Self {
        Self {
            fly_duration: setup.config.interaction.fly_duration,
            setup: Arc::new(setup),
            hovered: None,
            selected: None,
        }
    }

    pub(crate) fn title(&self) -> &'static str {
        "Photo City"
    }

    pub(crate) fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::FlyDuration(value) => {
                self.fly_duration = value;
            }
            Message::Hovered(index) => {
                self.hovered = index;
            }
            Message::Selected(index) => {
                self.selected = Some(index);
            }
            Message::Screenshot => {
                return window::get_latest()
                    .and_then(window::screenshot)
                    .map(Message::ScreenshotTaken);
            }
            Message::ScreenshotTaken(screenshot) => {
                let dir = &self.setup.config.screenshot_dir;
                match assets::save_screenshot(
                    dir,
                    &screenshot.bytes,
                    screenshot.size.width,
                    screenshot.size.height,
                ) {
                    Ok(path) => log::info!("saved screenshot to {}", path.display()),
                    Err(e) => log::error!("failed to save screenshot: {e}"),
                }
            }
        }

        Task::none()
    }

    pub(crate) fn view(&self) -> Element<Message> {
        let describe = |index: Option<usize>| match index {
            Some(index) => format!("photo {index}"),
            None => "none".to_owned(),
        };

        // Left pane with controls
        let controls = Column::new()
            .spacing(20)
            .push(
                Column::new()
                    .spacing(5)
                    .push(text(format!("Fly Duration ({:.1}s)", self.fly_duration)))
                    .push(
                        Slider::new(0.0..=5.0, self.fly_duration, Message::FlyDuration)
                            .step(0.1)
                            .width(250),
                    ),
            )
            .push(
                Column::new()
                    .spacing(5)
                    .push(text(format!("Hovered: {}", describe(self.hovered))))
                    .push(text(format!("Selected: {}", describe(self.selected))))
                    .push(text(format!("Photos loaded: {}", self.setup.photos.len()))),
            )
            .push(button("Screenshot").on_press(Message::Screenshot));

        // Right pane with 3D viewport
        let viewport = Shader::new(PhotoCityProgram::new(
            Arc::clone(&self.setup),
            self.fly_duration,
        ))
        .width(Length::Fill)
        .height(Length::Fill);

        Row::new()
            .spacing(10)
            .padding(10)
            .push(
                iced::widget::container(controls)
                    .width(Length::Shrink)
                    .height(Length::Fill),
            )
            .push(viewport)
            .into()
    }
}

fn main() -> iced::Result {
    env_logger::builder().format_timestamp(None).init();

    let config = Config::from_args();
    let photos = PhotoLibrary::load_or_empty(&config.scene.photo_dir);
    let city = CityMesh::generate(&config.scene);

    let app = PhotoCityApp::new(SceneSetup::new(config, photos, city));
    iced::application(app.title(), PhotoCityApp::update, PhotoCityApp::view)
        .settings(Settings {
            antialiasing: true,
            ..Settings::default()
        })
        .run_with(move || (app, Task::none()))
}
