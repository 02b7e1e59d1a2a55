//! Eased camera fly-to transitions.
//!
//! [`CameraAnimator`] holds at most one transition. Starting another one
//! replaces it outright; callers pass the camera's current pose as the new
//! starting point so the motion stays continuous.

use nalgebra::Point3;

use crate::camera::{Camera, Pose};
use crate::math::{lerp, smoothstep};
use crate::scene::SceneObject;

/// Step used by [`CameraAnimator::advance_fixed`] for hosts without a clock
pub(crate) const FIXED_TICK: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Transition {
    pub(crate) from: Pose,
    pub(crate) to: Pose,
    /// Raw progress in [0, 1]
    pub(crate) progress: f32,
    /// Seconds; zero or less completes on the next advance
    pub(crate) duration: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) enum AnimationState {
    #[default]
    Idle,
    Active(Transition),
}

#[derive(Debug, Default)]
pub(crate) struct CameraAnimator {
    state: AnimationState,
}

impl CameraAnimator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &AnimationState {
        &self.state
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self.state, AnimationState::Active(_))
    }

    /// Begins a transition from `from` to `to`, replacing any transition in
    /// flight.
    pub(crate) fn start_transition(&mut self, from: Pose, to: Pose, duration: f32) {
        if self.is_active() {
            log::debug!("replacing in-flight camera transition");
        }
        self.state = AnimationState::Active(Transition {
            from,
            to,
            progress: 0.0,
            duration,
        });
    }

    /// Moves the active transition forward by `delta_time` seconds and writes
    /// the eased pose into `camera`. Returns `true` on the tick that finishes
    /// the transition.
    pub(crate) fn advance(&mut self, delta_time: f32, camera: &mut Camera) -> bool {
        let AnimationState::Active(transition) = &mut self.state else {
            return false;
        };

        let step = if transition.duration > 0.0 {
            delta_time.max(0.0) / transition.duration
        } else {
            1.0
        };
        transition.progress = (transition.progress + step).min(1.0);

        let t = smoothstep(0.0, 1.0, transition.progress);
        camera.set_pose(Pose {
            eye: lerp(&transition.from.eye, &transition.to.eye, t),
            target: lerp(&transition.from.target, &transition.to.target, t),
        });

        if transition.progress >= 1.0 {
            log::debug!("camera transition complete");
            self.state = AnimationState::Idle;
            true
        } else {
            false
        }
    }

    pub(crate) fn advance_fixed(&mut self, camera: &mut Camera) -> bool {
        self.advance(FIXED_TICK, camera)
    }
}

/// Camera pose that makes `object` exactly fill a viewport of the given
/// aspect ratio with the camera's current field of view.
///
/// The camera looks at the centroid of the photo's world-space corners from
/// along the yaw-facing normal. No margin is added.
pub(crate) fn framing_pose(object: &SceneObject, camera: &Camera, aspect: f32) -> Pose {
    let corners = object.world_corners();
    let centroid = Point3::from(
        corners.iter().map(|corner| corner.coords).sum::<nalgebra::Vector3<f32>>() / 4.0,
    );

    let half_width = 0.5 * (corners[1] - corners[0]).norm();
    let half_height = 0.5 * (corners[3] - corners[0]).norm();

    let tan_half_fovy = (camera.fovy * 0.5).tan();
    let tan_half_fovx = tan_half_fovy * aspect;
    let distance = (half_width / tan_half_fovx).max(half_height / tan_half_fovy);

    let yaw = object.yaw();
    let normal = nalgebra::Vector3::new(yaw.sin(), 0.0, yaw.cos());

    Pose {
        eye: centroid + normal * distance,
        target: centroid,
    }
}
