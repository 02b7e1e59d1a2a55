use nalgebra::{Matrix4, Point3, Unit, Vector3};

/// 3D ray for intersection testing
#[derive(Debug, Clone)]
pub(crate) struct Ray {
    /// Ray origin point in world space
    pub(crate) origin: Point3<f32>,
    /// Ray direction vector (normalized)
    pub(crate) direction: Vector3<f32>,
}

/// Sphere used as the pick volume of a scene object
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BoundingSphere {
    pub(crate) center: Point3<f32>,
    pub(crate) radius: f32,
}

pub(crate) fn translation(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

pub(crate) fn scale(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
    Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
}

/// Rotation of `radians` about `axis`. The axis is normalized here, so a zero
/// axis yields NaNs.
pub(crate) fn rotation(radians: f32, axis: Vector3<f32>) -> Matrix4<f32> {
    debug_assert!(axis.norm_squared() > 0.0, "rotation axis must be non-zero");
    Matrix4::from_axis_angle(&Unit::new_normalize(axis), radians)
}

/// Left-handed perspective projection with depth mapped to [0, 1].
#[rustfmt::skip]
pub(crate) fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    debug_assert!(near > 0.0 && near < far, "invalid clip planes {near}..{far}");
    let y_scale = 1.0 / (fovy * 0.5).tan();
    let x_scale = y_scale / aspect;
    let depth = far / (far - near);
    Matrix4::new(
        x_scale, 0.0,     0.0,   0.0,
        0.0,     y_scale, 0.0,   0.0,
        0.0,     0.0,     depth, -near * depth,
        0.0,     0.0,     1.0,   0.0,
    )
}

/// Left-handed view matrix. `up` must not be parallel to `target - eye`.
pub(crate) fn look_at(eye: &Point3<f32>, target: &Point3<f32>, up: &Vector3<f32>) -> Matrix4<f32> {
    debug_assert!(eye != target, "camera eye and target coincide");
    debug_assert!(
        (target - eye).cross(up).norm_squared() > f32::EPSILON,
        "camera up vector is parallel to the view direction"
    );
    Matrix4::look_at_lh(eye, target, up)
}

/// Distance along `ray` to the first sphere surface in front of the origin.
///
/// Solves `|O + tD - C|² = r²`. The smaller positive root wins; when the origin
/// sits inside the sphere only the larger root is positive and the exit point
/// is reported.
pub(crate) fn intersect_ray_sphere(ray: &Ray, sphere: &BoundingSphere) -> Option<f32> {
    let oc = ray.origin - sphere.center;
    let a = ray.direction.dot(&ray.direction);
    let b = 2.0 * oc.dot(&ray.direction);
    let c = oc.dot(&oc) - sphere.radius * sphere.radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 || a == 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let near = (-b - root) / (2.0 * a);
    let far = (-b + root) / (2.0 * a);

    if near > 0.0 {
        Some(near)
    } else if far > 0.0 {
        Some(far)
    } else {
        None
    }
}

pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub(crate) fn lerp(a: &Point3<f32>, b: &Point3<f32>, t: f32) -> Point3<f32> {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    const EPSILON: f32 = 1e-4;

    fn ray(origin: Point3<f32>, toward: Point3<f32>) -> Ray {
        Ray {
            origin,
            direction: (toward - origin).normalize(),
        }
    }

    #[test]
    fn translation_moves_points() {
        let moved = translation(1.0, -2.0, 3.0).transform_point(&Point3::origin());
        assert_eq!(moved, Point3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn scale_is_per_axis() {
        let scaled = scale(2.0, 3.0, 4.0).transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_eq!(scaled, Point3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn rotation_normalizes_axis() {
        let quarter = rotation(std::f32::consts::FRAC_PI_2, Vector3::new(0.0, 5.0, 0.0));
        let rotated = quarter.transform_point(&Point3::new(0.0, 0.0, 1.0));
        assert!((rotated - Point3::new(1.0, 0.0, 0.0)).norm() < EPSILON, "{rotated}");
    }

    #[test]
    fn perspective_maps_clip_planes_to_unit_depth() {
        let proj = perspective(1.0, 1.5, 0.5, 50.0);
        let near = proj * Vector4::new(0.0, 0.0, 0.5, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, 50.0, 1.0);
        assert!((near.z / near.w).abs() < EPSILON);
        assert!((far.z / far.w - 1.0).abs() < EPSILON);
    }

    #[test]
    fn look_at_puts_target_on_positive_z() {
        let view = look_at(
            &Point3::new(0.0, 5.0, 15.0),
            &Point3::origin(),
            &Vector3::y(),
        );
        let target = view.transform_point(&Point3::origin());
        let expected = (5.0f32 * 5.0 + 15.0 * 15.0).sqrt();
        assert!(target.x.abs() < EPSILON && target.y.abs() < EPSILON);
        assert!((target.z - expected).abs() < EPSILON);
    }

    #[test]
    fn ray_hits_sphere_on_axis() {
        let sphere = BoundingSphere {
            center: Point3::new(0.0, 0.0, 10.0),
            radius: 2.0,
        };
        let hit = intersect_ray_sphere(&ray(Point3::origin(), sphere.center), &sphere);
        assert!((hit.unwrap_or_default() - 8.0).abs() < EPSILON);
    }

    #[test]
    fn ray_hits_sphere_obliquely() {
        let sphere = BoundingSphere {
            center: Point3::new(3.0, 4.0, 12.0),
            radius: 1.5,
        };
        let origin = Point3::new(-1.0, 1.0, 0.0);
        let distance = (sphere.center - origin).norm();
        let hit = intersect_ray_sphere(&ray(origin, sphere.center), &sphere);
        assert!((hit.unwrap_or_default() - (distance - 1.5)).abs() < EPSILON);
    }

    #[test]
    fn ray_from_inside_reports_exit() {
        let sphere = BoundingSphere {
            center: Point3::new(0.0, 0.0, 0.0),
            radius: 3.0,
        };
        let origin = Point3::new(0.0, 1.0, 0.0);
        for toward in [
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, -5.0, 0.0),
            Point3::new(4.0, 1.0, 2.0),
        ] {
            let hit = intersect_ray_sphere(&ray(origin, toward), &sphere);
            assert!(hit.is_some_and(|t| t > 0.0), "expected exit hit toward {toward}");
        }
        let up = intersect_ray_sphere(&ray(origin, Point3::new(0.0, 2.0, 0.0)), &sphere);
        assert!((up.unwrap_or_default() - 2.0).abs() < EPSILON);
    }

    #[test]
    fn ray_misses_behind_and_beside() {
        let sphere = BoundingSphere {
            center: Point3::new(0.0, 0.0, -10.0),
            radius: 1.0,
        };
        let forward = Ray {
            origin: Point3::origin(),
            direction: Vector3::z(),
        };
        assert_eq!(intersect_ray_sphere(&forward, &sphere), None);

        let beside = Ray {
            origin: Point3::new(5.0, 0.0, 0.0),
            direction: -Vector3::z(),
        };
        assert_eq!(intersect_ray_sphere(&beside, &sphere), None);
    }

    #[test]
    fn smoothstep_boundaries_and_monotonicity() {
        assert_eq!(smoothstep(0.0, 1.0, 0.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 1.0), 1.0);
        assert_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
        assert_eq!(smoothstep(0.0, 1.0, -3.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 7.0), 1.0);

        let mut previous = 0.0;
        for step in 0..=100 {
            let value = smoothstep(0.0, 1.0, step as f32 / 100.0);
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn lerp_is_componentwise() {
        let a = Point3::new(0.0, 10.0, -4.0);
        let b = Point3::new(10.0, 20.0, 4.0);
        assert_eq!(lerp(&a, &b, 0.0), a);
        assert_eq!(lerp(&a, &b, 1.0), b);
        assert_eq!(lerp(&a, &b, 0.25), Point3::new(2.5, 12.5, -2.0));
    }
}
