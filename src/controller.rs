//! Interaction state machine tying pointer and keyboard input to picking,
//! hover tracking and camera animation.
//!
//! The controller owns the camera, the object table and the animator. Hosts
//! feed it input events and call [`InteractionController::tick`] once per
//! frame, then draw from [`InteractionController::frame_snapshot`].

use nalgebra::{Matrix4, Point2, Vector2};

use crate::animation::{CameraAnimator, framing_pose};
use crate::assets::TextureHandle;
use crate::camera::{Camera, OrbitDrag, Pose};
use crate::config::InteractionConfig;
use crate::input::NavKey;
use crate::ray_casting::pick;
use crate::scene::{CityMesh, ObjectTable};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InteractionState {
    Idle,
    Hovering(usize),
    Dragging(OrbitDrag),
    Animating,
}

/// Requests the core hands back to the host instead of handling itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostRequest {
    Screenshot,
    DebugDump,
}

/// Per-photo data the renderer needs
#[derive(Debug, Clone)]
pub(crate) struct PhotoInstance {
    pub(crate) model: Matrix4<f32>,
    pub(crate) hovered: bool,
    pub(crate) texture: Option<TextureHandle>,
}

/// Read-only view of the scene for one frame
#[derive(Debug, Clone)]
pub(crate) struct FrameSnapshot {
    pub(crate) view: Matrix4<f32>,
    pub(crate) projection: Matrix4<f32>,
    pub(crate) city_model: Matrix4<f32>,
    pub(crate) photos: Vec<PhotoInstance>,
}

impl FrameSnapshot {
    pub(crate) fn capture(
        camera: &Camera,
        objects: &ObjectTable,
        city_model: Matrix4<f32>,
        aspect: f32,
    ) -> Self {
        Self {
            view: camera.build_view_matrix(),
            projection: camera.build_projection_matrix(aspect),
            city_model,
            photos: objects
                .iter()
                .map(|object| PhotoInstance {
                    model: object.model_matrix(),
                    hovered: object.is_hovered,
                    texture: object.texture,
                })
                .collect(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct InteractionController {
    camera: Camera,
    objects: ObjectTable,
    animator: CameraAnimator,
    state: InteractionState,
    settings: InteractionConfig,
    city_model: Matrix4<f32>,
    viewport: Vector2<f32>,
    /// Photo most recently flown to, for previous/next navigation
    cursor: Option<usize>,
}

impl InteractionController {
    pub(crate) fn new(
        camera: Camera,
        objects: ObjectTable,
        city: &CityMesh,
        settings: InteractionConfig,
        viewport: Vector2<f32>,
    ) -> Self {
        Self {
            camera,
            objects,
            animator: CameraAnimator::new(),
            state: InteractionState::Idle,
            settings,
            city_model: city.model,
            viewport,
            cursor: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn camera(&self) -> &Camera {
        &self.camera
    }

    #[cfg(test)]
    pub(crate) fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    pub(crate) fn state(&self) -> &InteractionState {
        &self.state
    }

    pub(crate) fn hovered(&self) -> Option<usize> {
        self.objects.hovered()
    }

    pub(crate) fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub(crate) fn is_animating(&self) -> bool {
        self.animator.is_active()
    }

    pub(crate) fn set_fly_duration(&mut self, seconds: f32) {
        self.settings.fly_duration = seconds;
    }

    pub(crate) fn resize(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.viewport = Vector2::new(width, height);
        }
    }

    fn aspect(&self) -> f32 {
        self.viewport.x / self.viewport.y
    }

    /// Pointer moved to `position` (view-local pixels, Y down).
    pub(crate) fn pointer_moved(&mut self, position: Point2<f32>) {
        if matches!(self.state, InteractionState::Dragging(_)) {
            self.pointer_dragged(position);
            return;
        }

        let hit = pick(position, self.viewport, &self.camera, self.objects.as_slice());
        if self.objects.set_hovered(hit) {
            log::debug!("hover changed to {hit:?}");
        }

        if !matches!(self.state, InteractionState::Animating) {
            self.state = match hit {
                Some(index) => InteractionState::Hovering(index),
                None => InteractionState::Idle,
            };
        }
    }

    /// Pointer left the view, so nothing is hovered any more.
    pub(crate) fn pointer_left(&mut self) {
        if self.objects.set_hovered(None) {
            log::debug!("hover cleared");
        }
        if matches!(self.state, InteractionState::Hovering(_)) {
            self.state = InteractionState::Idle;
        }
    }

    /// Pointer button went down. `orbit` is the drag modifier (Shift or the
    /// secondary button); without it a hit photo is flown to and its index
    /// returned.
    pub(crate) fn pointer_pressed(&mut self, position: Point2<f32>, orbit: bool) -> Option<usize> {
        if orbit {
            match self.state {
                InteractionState::Animating => {
                    log::warn!("ignoring orbit drag while the camera is flying");
                }
                InteractionState::Dragging(_) => {}
                _ => {
                    log::debug!("orbit drag started at {position}");
                    self.state = InteractionState::Dragging(OrbitDrag::new(position, &self.camera));
                }
            }
            return None;
        }

        if matches!(self.state, InteractionState::Dragging(_)) {
            return None;
        }

        let index = pick(position, self.viewport, &self.camera, self.objects.as_slice())?;
        self.fly_to(index);
        Some(index)
    }

    /// Orbits the camera around its target. Only meaningful while dragging.
    pub(crate) fn pointer_dragged(&mut self, position: Point2<f32>) {
        if let InteractionState::Dragging(drag) = &self.state {
            drag.update_camera(position, &self.settings, &mut self.camera);
        }
    }

    pub(crate) fn pointer_released(&mut self) {
        if matches!(self.state, InteractionState::Dragging(_)) {
            log::debug!("orbit drag finished");
            self.settle();
        }
    }

    /// Wheel zoom by `delta` notches. Positive moves towards the hovered
    /// photo, or the current target when nothing is hovered; negative moves
    /// away.
    pub(crate) fn pointer_scrolled(&mut self, delta: f32) {
        if delta == 0.0 || matches!(self.state, InteractionState::Dragging(_)) {
            return;
        }

        let focus = self
            .objects
            .hovered()
            .and_then(|index| self.objects.get(index))
            .map_or(self.camera.target, |object| object.position);

        // One notch keeps `zoom_factor` of the distance; fractional pixel
        // deltas zoom proportionally less.
        let factor = self
            .settings
            .zoom_factor
            .clamp(0.05, 0.95)
            .powf(delta.clamp(-3.0, 3.0));
        let goal = Pose {
            eye: focus + (self.camera.eye - focus) * factor,
            target: focus,
        };

        log::debug!("zooming by {factor} towards {focus}");
        self.animator
            .start_transition(self.camera.pose(), goal, self.settings.fly_duration * 0.5);
        self.state = InteractionState::Animating;
    }

    /// Handles a navigation key. Screenshot and debug-dump keys are returned
    /// to the host.
    pub(crate) fn key_pressed(&mut self, key: NavKey) -> Option<HostRequest> {
        match key {
            NavKey::Next | NavKey::Previous => {
                if matches!(self.state, InteractionState::Dragging(_)) {
                    return None;
                }
                if let Some(index) = self.step_cursor(key) {
                    self.fly_to(index);
                }
                None
            }
            NavKey::Screenshot => Some(HostRequest::Screenshot),
            NavKey::DebugDump => Some(HostRequest::DebugDump),
        }
    }

    fn step_cursor(&self, key: NavKey) -> Option<usize> {
        if self.objects.is_empty() {
            return None;
        }
        let count = self.objects.len();
        let next = match (key, self.cursor) {
            (NavKey::Previous, Some(current)) => (current + count - 1) % count,
            (NavKey::Previous, None) => count - 1,
            (_, Some(current)) => (current + 1) % count,
            (_, None) => 0,
        };
        Some(next)
    }

    /// Starts flying the camera to frame the photo at `index`.
    pub(crate) fn fly_to(&mut self, index: usize) {
        let Some(object) = self.objects.get(index) else {
            return;
        };

        let goal = framing_pose(object, &self.camera, self.aspect());
        log::info!("flying to photo {index}");
        self.animator
            .start_transition(self.camera.pose(), goal, self.settings.fly_duration);
        self.cursor = Some(index);
        self.state = InteractionState::Animating;
    }

    /// Advances the camera animation by `delta_time` seconds.
    pub(crate) fn tick(&mut self, delta_time: f32) {
        if self.animator.advance(delta_time, &mut self.camera) {
            self.settle();
        }
    }

    fn settle(&mut self) {
        self.state = match self.objects.hovered() {
            Some(index) => InteractionState::Hovering(index),
            None => InteractionState::Idle,
        };
    }

    /// Advances the camera animation by one fixed tick, for frames with no
    /// previous timestamp to measure against.
    pub(crate) fn tick_fixed(&mut self) {
        if self.animator.advance_fixed(&mut self.camera) {
            self.settle();
        }
    }

    pub(crate) fn frame_snapshot(&self) -> FrameSnapshot {
        FrameSnapshot::capture(&self.camera, &self.objects, self.city_model, self.aspect())
    }

    /// One-line summary for the debug dump key
    pub(crate) fn debug_summary(&self) -> String {
        format!(
            "state={:?} eye={} target={} hovered={:?} cursor={:?} objects={}",
            self.state,
            self.camera.eye,
            self.camera.target,
            self.objects.hovered(),
            self.cursor,
            self.objects.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::scene::SceneObject;
    use nalgebra::{Point3, Vector3};

    const EPSILON: f32 = 1e-3;
    const CENTER: Point2<f32> = Point2::new(512.0, 384.0);

    fn camera() -> Camera {
        Camera {
            eye: Point3::new(0.0, 5.0, 15.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fovy: 45f32.to_radians(),
            znear: 0.1,
            zfar: 100.0,
        }
    }

    /// Photo whose bounding sphere has radius 2
    fn photo(x: f32, y: f32, z: f32) -> SceneObject {
        SceneObject::new(Point3::new(x, y, z), Vector3::zeros(), Vector3::new(3.2, 2.4, 1.0), None)
    }

    fn controller(objects: Vec<SceneObject>) -> InteractionController {
        let city = CityMesh::generate(&SceneConfig {
            city_blocks: 1,
            ..SceneConfig::default()
        });
        InteractionController::new(
            camera(),
            ObjectTable::new(objects),
            &city,
            InteractionConfig::default(),
            Vector2::new(1024.0, 768.0),
        )
    }

    fn finish_animation(controller: &mut InteractionController) {
        for _ in 0..10_000 {
            if !controller.is_animating() {
                return;
            }
            controller.tick_fixed();
        }
        panic!("animation never finished");
    }

    #[test]
    fn hover_follows_pointer() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0)]);

        ctl.pointer_moved(CENTER);
        assert_eq!(ctl.state(), &InteractionState::Hovering(0));
        assert_eq!(ctl.hovered(), Some(0));
        assert!(ctl.objects().get(0).is_some_and(|o| o.is_hovered));

        ctl.pointer_moved(Point2::new(0.0, 0.0));
        assert_eq!(ctl.state(), &InteractionState::Idle);
        assert_eq!(ctl.hovered(), None);
    }

    #[test]
    fn leaving_the_view_clears_hover() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0)]);
        ctl.pointer_moved(CENTER);
        ctl.pointer_left();
        assert_eq!(ctl.state(), &InteractionState::Idle);
        assert_eq!(ctl.hovered(), None);
    }

    #[test]
    fn hover_moves_between_objects() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0), photo(40.0, 0.0, 0.0)]);
        ctl.objects.set_hovered(Some(1));

        ctl.pointer_moved(CENTER);
        assert_eq!(ctl.hovered(), Some(0));
        assert_eq!(ctl.objects().iter().filter(|o| o.is_hovered).count(), 1);
    }

    #[test]
    fn click_on_photo_flies_to_framing_pose() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0)]);
        let expected = framing_pose(ctl.objects().get(0).unwrap(), ctl.camera(), 1024.0 / 768.0);

        assert_eq!(ctl.pointer_pressed(CENTER, false), Some(0));
        assert_eq!(ctl.state(), &InteractionState::Animating);
        assert_eq!(ctl.cursor(), Some(0));

        finish_animation(&mut ctl);
        assert_eq!(ctl.state(), &InteractionState::Idle);
        assert!((ctl.camera().eye - expected.eye).norm() < EPSILON);
        assert!((ctl.camera().target - expected.target).norm() < EPSILON);
    }

    #[test]
    fn click_on_empty_space_does_nothing() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0)]);
        let before = ctl.camera().clone();

        assert_eq!(ctl.pointer_pressed(Point2::new(0.0, 0.0), false), None);
        assert_eq!(ctl.state(), &InteractionState::Idle);
        assert!(!ctl.is_animating());
        ctl.tick(1.0);
        assert_eq!(ctl.camera(), &before);
    }

    #[test]
    fn hover_survives_animation_completion() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0)]);
        ctl.pointer_pressed(CENTER, false);
        ctl.pointer_moved(CENTER);
        assert_eq!(ctl.state(), &InteractionState::Animating);

        finish_animation(&mut ctl);
        assert_eq!(ctl.state(), &InteractionState::Hovering(0));
    }

    #[test]
    fn orbit_drag_moves_eye_and_keeps_target() {
        let mut ctl = controller(vec![]);
        let settings = InteractionConfig::default();

        ctl.pointer_pressed(Point2::new(400.0, 300.0), true);
        assert!(matches!(ctl.state(), InteractionState::Dragging(_)));

        ctl.pointer_moved(Point2::new(450.0, 300.0));
        let yaw = OrbitDrag::yaw_for(50.0, &settings);
        let rotated = nalgebra::Rotation3::from_axis_angle(&Vector3::y_axis(), yaw) * Vector3::new(0.0, 5.0, 15.0);
        assert!((ctl.camera().eye - Point3::from(rotated)).norm() < EPSILON);
        assert_eq!(ctl.camera().target, Point3::origin());

        ctl.pointer_released();
        assert_eq!(ctl.state(), &InteractionState::Idle);

        let settled = ctl.camera().clone();
        ctl.pointer_moved(Point2::new(10.0, 10.0));
        assert_eq!(ctl.camera(), &settled);
    }

    #[test]
    fn releasing_a_drag_keeps_the_hovered_photo() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0)]);
        ctl.pointer_moved(CENTER);
        assert_eq!(ctl.state(), &InteractionState::Hovering(0));

        ctl.pointer_pressed(CENTER, true);
        assert!(matches!(ctl.state(), InteractionState::Dragging(_)));
        ctl.pointer_released();

        assert_eq!(ctl.state(), &InteractionState::Hovering(0));
        assert_eq!(ctl.hovered(), Some(0));
    }

    #[test]
    fn drag_is_refused_while_flying() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0)]);
        ctl.pointer_pressed(CENTER, false);
        ctl.pointer_pressed(CENTER, true);
        assert_eq!(ctl.state(), &InteractionState::Animating);
    }

    #[test]
    fn key_navigation_wraps_around() {
        let mut ctl = controller(vec![
            photo(-10.0, 5.0, 0.0),
            photo(0.0, 5.0, 0.0),
            photo(10.0, 5.0, 0.0),
        ]);

        assert_eq!(ctl.key_pressed(NavKey::Previous), None);
        assert_eq!(ctl.cursor(), Some(2));
        assert_eq!(ctl.state(), &InteractionState::Animating);

        ctl.key_pressed(NavKey::Next);
        assert_eq!(ctl.cursor(), Some(0));
        ctl.key_pressed(NavKey::Next);
        ctl.key_pressed(NavKey::Next);
        ctl.key_pressed(NavKey::Next);
        assert_eq!(ctl.cursor(), Some(0));

        ctl.key_pressed(NavKey::Previous);
        assert_eq!(ctl.cursor(), Some(2));

        finish_animation(&mut ctl);
        let expected = framing_pose(ctl.objects().get(2).unwrap(), ctl.camera(), 1024.0 / 768.0);
        assert!((ctl.camera().target - expected.target).norm() < EPSILON);
    }

    #[test]
    fn key_navigation_on_empty_table_is_a_no_op() {
        let mut ctl = controller(vec![]);
        assert_eq!(ctl.key_pressed(NavKey::Next), None);
        assert_eq!(ctl.cursor(), None);
        assert_eq!(ctl.state(), &InteractionState::Idle);
    }

    #[test]
    fn passthrough_keys_go_back_to_host() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0)]);
        assert_eq!(ctl.key_pressed(NavKey::Screenshot), Some(HostRequest::Screenshot));
        assert_eq!(ctl.key_pressed(NavKey::DebugDump), Some(HostRequest::DebugDump));
        assert_eq!(ctl.state(), &InteractionState::Idle);
    }

    #[test]
    fn wheel_zooms_towards_hovered_photo() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0)]);
        ctl.pointer_moved(CENTER);
        let start = ctl.camera().eye;
        let focus = Point3::new(0.0, 5.0, 10.0);

        ctl.pointer_scrolled(1.0);
        assert_eq!(ctl.state(), &InteractionState::Animating);
        finish_animation(&mut ctl);

        let expected = focus + (start - focus) * 0.6;
        assert!((ctl.camera().eye - expected).norm() < EPSILON);
        assert!((ctl.camera().target - focus).norm() < EPSILON);
        assert_eq!(ctl.state(), &InteractionState::Hovering(0));
    }

    #[test]
    fn wheel_out_backs_away_from_target() {
        let mut ctl = controller(vec![]);
        let start = ctl.camera().eye;

        ctl.pointer_scrolled(-1.0);
        finish_animation(&mut ctl);

        assert!((ctl.camera().eye - Point3::from(start.coords / 0.6)).norm() < EPSILON);
        assert_eq!(ctl.camera().target, Point3::origin());
    }

    #[test]
    fn snapshot_mirrors_scene() {
        let mut ctl = controller(vec![photo(0.0, 5.0, 10.0), photo(30.0, 5.0, 0.0)]);
        ctl.pointer_moved(CENTER);

        let frame = ctl.frame_snapshot();
        assert_eq!(frame.photos.len(), 2);
        assert!(frame.photos[0].hovered);
        assert!(!frame.photos[1].hovered);
        assert_eq!(frame.view, ctl.camera().build_view_matrix());
        assert!(ctl.debug_summary().contains("objects=2"));
    }
}
