//! Ray casting for pointer-based photo selection.
//!
//! Picking is analytic: the pointer is unprojected into a world-space ray and
//! tested against each object's bounding sphere. Nothing here mutates scene
//! state, so hover handling stays with the caller.

use nalgebra::{Point2, Point3, Vector2, Vector4};

use crate::camera::Camera;
use crate::math::{Ray, intersect_ray_sphere};
use crate::scene::SceneObject;

/// Calculate the world-space ray under the pointer.
///
/// `pointer` is in view-local pixels with the origin at the top left and Y
/// growing downward. Returns `None` for an empty viewport or a camera whose
/// matrices cannot be inverted.
pub(crate) fn calculate_pointer_ray(
    pointer: Point2<f32>,
    viewport: Vector2<f32>,
    camera: &Camera,
) -> Option<Ray> {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return None;
    }

    // Screen Y grows down, NDC Y grows up
    let ndc_x = (2.0 * pointer.x / viewport.x) - 1.0;
    let ndc_y = 1.0 - (2.0 * pointer.y / viewport.y);

    let aspect = viewport.x / viewport.y;
    let inv_projection = camera.build_projection_matrix(aspect).try_inverse()?;
    let inv_view = camera.build_view_matrix().try_inverse()?;

    // Point on the near plane (depth 0), turned into a forward direction
    let eye_point = inv_projection * Vector4::new(ndc_x, ndc_y, 0.0, 1.0);
    let eye_direction = Vector4::new(eye_point.x, eye_point.y, 1.0, 0.0);

    let world_direction = (inv_view * eye_direction).xyz().normalize();
    let origin = inv_view * Vector4::new(0.0, 0.0, 0.0, 1.0);

    Some(Ray {
        origin: Point3::new(origin.x, origin.y, origin.z),
        direction: world_direction,
    })
}

/// Nearest object whose bounding sphere the ray hits. Objects are tested in
/// order and a later object must be strictly closer to win, so exact ties go
/// to the lower index.
pub(crate) fn find_intersected_object(ray: &Ray, objects: &[SceneObject]) -> Option<usize> {
    let mut closest_distance = f32::INFINITY;
    let mut closest_object = None;

    for (index, object) in objects.iter().enumerate() {
        if let Some(distance) = intersect_ray_sphere(ray, &object.bounding_sphere) {
            if distance < closest_distance {
                closest_distance = distance;
                closest_object = Some(index);
            }
        }
    }

    closest_object
}

/// Index of the object under the pointer, if any.
pub(crate) fn pick(
    pointer: Point2<f32>,
    viewport: Vector2<f32>,
    camera: &Camera,
    objects: &[SceneObject],
) -> Option<usize> {
    if objects.is_empty() {
        return None;
    }
    let ray = calculate_pointer_ray(pointer, viewport, camera)?;
    find_intersected_object(&ray, objects)
}
