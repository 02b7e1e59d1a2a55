use nalgebra::{Matrix4, Point2, Point3, Rotation3, Vector3};

use crate::config::InteractionConfig;
use crate::math::{look_at, perspective};

/// Perspective camera looking from `eye` at `target`.
///
/// `eye` must differ from `target` and `0 < znear < zfar`; neither is
/// validated outside debug builds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Camera {
    pub(crate) eye: Point3<f32>,
    pub(crate) target: Point3<f32>,
    pub(crate) up: Vector3<f32>,
    /// Vertical field of view in radians
    pub(crate) fovy: f32,
    pub(crate) znear: f32,
    pub(crate) zfar: f32,
}

/// Eye and look-at target, the part of the camera that animations move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Pose {
    pub(crate) eye: Point3<f32>,
    pub(crate) target: Point3<f32>,
}

impl Camera {
    pub(crate) fn build_view_matrix(&self) -> Matrix4<f32> {
        look_at(&self.eye, &self.target, &self.up)
    }

    pub(crate) fn build_projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        perspective(self.fovy, aspect, self.znear, self.zfar)
    }

    pub(crate) fn pose(&self) -> Pose {
        Pose {
            eye: self.eye,
            target: self.target,
        }
    }

    pub(crate) fn set_pose(&mut self, pose: Pose) {
        self.eye = pose.eye;
        self.target = pose.target;
    }
}

/// Orbit drag in progress: remembers where the pointer went down and the
/// camera pose at that moment. Every update is computed from the anchor, so
/// the result only depends on the total pointer delta.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OrbitDrag {
    anchor: Point2<f32>,
    start: Pose,
}

impl OrbitDrag {
    pub(crate) fn new(anchor: Point2<f32>, camera: &Camera) -> Self {
        Self {
            anchor,
            start: camera.pose(),
        }
    }

    /// Yaw in radians for a horizontal pointer delta. Dragging right turns
    /// the camera clockwise seen from above.
    pub(crate) fn yaw_for(delta_x: f32, settings: &InteractionConfig) -> f32 {
        -delta_x * settings.orbit_sensitivity
    }

    /// Camera eye for the pointer at `position`. The target never moves.
    pub(crate) fn eye_at(&self, position: Point2<f32>, settings: &InteractionConfig) -> Point3<f32> {
        let delta = position - self.anchor;
        let yaw = Self::yaw_for(delta.x, settings);

        let offset = self.start.eye - self.start.target;
        let rotated = Rotation3::from_axis_angle(&Vector3::y_axis(), yaw) * offset;

        let height = (self.start.eye.y - delta.y * settings.height_sensitivity)
            .max(settings.min_camera_height);

        Point3::new(
            self.start.target.x + rotated.x,
            height,
            self.start.target.z + rotated.z,
        )
    }

    pub(crate) fn update_camera(
        &self,
        position: Point2<f32>,
        settings: &InteractionConfig,
        camera: &mut Camera,
    ) {
        camera.eye = self.eye_at(position, settings);
        camera.target = self.start.target;
    }
}

/// GPU-side camera data for the renderer
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct CameraUniform {
    pub(crate) view_proj: [[f32; 4]; 4],
    pub(crate) city_model: [[f32; 4]; 4],
}

impl CameraUniform {
    pub(crate) fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
            city_model: Matrix4::identity().into(),
        }
    }

    pub(crate) fn update(&mut self, view: &Matrix4<f32>, projection: &Matrix4<f32>, city_model: &Matrix4<f32>) {
        self.view_proj = (projection * view).into();
        self.city_model = (*city_model).into();
    }
}
