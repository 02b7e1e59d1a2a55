//! Scene contents: the photo billboards and the wireframe city under them.
//!
//! Billboards are placed once at startup and never move, so their bounding
//! spheres are computed at construction. The only mutable state is the hover
//! flag, and [`ObjectTable`] keeps at most one object hovered.

use nalgebra::{Matrix4, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::assets::{PhotoLibrary, TextureHandle};
use crate::config::SceneConfig;
use crate::math::{self, BoundingSphere};

/// Corners of the unit photo quad in object space, counter-clockwise from the
/// bottom left. The quad faces +Z.
pub(crate) const QUAD_CORNERS: [Point3<f32>; 4] = [
    Point3::new(-0.5, -0.5, 0.0),
    Point3::new(0.5, -0.5, 0.0),
    Point3::new(0.5, 0.5, 0.0),
    Point3::new(-0.5, 0.5, 0.0),
];

/// Quad vertices for the renderer: position then texture coordinate.
/// Seen from +Z the left-handed view puts world -X on the right, so `u`
/// runs along -X.
#[rustfmt::skip]
pub(crate) const QUAD_VERTICES: [[f32; 5]; 4] = [
    [-0.5, -0.5, 0.0, 1.0, 1.0],
    [ 0.5, -0.5, 0.0, 0.0, 1.0],
    [ 0.5,  0.5, 0.0, 0.0, 0.0],
    [-0.5,  0.5, 0.0, 1.0, 0.0],
];

pub(crate) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Largest cosmetic pitch/roll tilt given to a scattered photo, in radians
const MAX_TILT: f32 = 0.15;

/// One photo billboard.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SceneObject {
    pub(crate) position: Point3<f32>,
    /// Euler angles in radians: x = pitch, y = yaw, z = roll. Only yaw
    /// decides which way the photo faces.
    pub(crate) rotation: Vector3<f32>,
    pub(crate) scale: Vector3<f32>,
    pub(crate) bounding_sphere: BoundingSphere,
    pub(crate) is_hovered: bool,
    pub(crate) texture: Option<TextureHandle>,
}

impl SceneObject {
    pub(crate) fn new(
        position: Point3<f32>,
        rotation: Vector3<f32>,
        scale: Vector3<f32>,
        texture: Option<TextureHandle>,
    ) -> Self {
        let radius = 0.5 * (scale.x * scale.x + scale.y * scale.y).sqrt();
        Self {
            position,
            rotation,
            scale,
            bounding_sphere: BoundingSphere {
                center: position,
                radius,
            },
            is_hovered: false,
            texture,
        }
    }

    pub(crate) fn yaw(&self) -> f32 {
        self.rotation.y
    }

    /// Object-to-world transform: scale, roll, pitch, yaw, then translate.
    pub(crate) fn model_matrix(&self) -> Matrix4<f32> {
        math::translation(self.position.x, self.position.y, self.position.z)
            * math::rotation(self.rotation.y, Vector3::y())
            * math::rotation(self.rotation.x, Vector3::x())
            * math::rotation(self.rotation.z, Vector3::z())
            * math::scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub(crate) fn world_corners(&self) -> [Point3<f32>; 4] {
        let model = self.model_matrix();
        QUAD_CORNERS.map(|corner| model.transform_point(&corner))
    }
}

/// Ordered collection of billboards. Indices are stable for the whole
/// session: objects are never added or removed after setup.
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectTable {
    objects: Vec<SceneObject>,
}

impl ObjectTable {
    pub(crate) fn new(objects: Vec<SceneObject>) -> Self {
        Self { objects }
    }

    /// Scatters `photo_count` billboards at random inside the configured
    /// world bounds. The same seed always gives the same scene.
    pub(crate) fn scatter(config: &SceneConfig, photos: &PhotoLibrary) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let extent = config.world_extent.max(0.0);

        let objects = (0..config.photo_count)
            .map(|index| {
                let position = Point3::new(
                    sample(&mut rng, -extent, extent),
                    sample(&mut rng, config.min_height, config.max_height),
                    sample(&mut rng, -extent, extent),
                );
                let rotation = Vector3::new(
                    sample(&mut rng, -MAX_TILT, MAX_TILT),
                    sample(&mut rng, 0.0, std::f32::consts::TAU),
                    sample(&mut rng, -MAX_TILT, MAX_TILT),
                );
                let scale = Vector3::new(config.photo_width, config.photo_height, 1.0);
                SceneObject::new(position, rotation, scale, photos.handle_for(index))
            })
            .collect();

        Self::new(objects)
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&SceneObject> {
        self.objects.get(index)
    }

    pub(crate) fn as_slice(&self) -> &[SceneObject] {
        &self.objects
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub(crate) fn hovered(&self) -> Option<usize> {
        self.objects.iter().position(|object| object.is_hovered)
    }

    /// Moves the hover flag to `index`, or clears it for `None`. Returns
    /// whether anything changed. Out of range indices clear the flag.
    pub(crate) fn set_hovered(&mut self, index: Option<usize>) -> bool {
        let index = index.filter(|&i| i < self.objects.len());
        let previous = self.hovered();
        if previous == index {
            return false;
        }

        if let Some(old) = previous.and_then(|i| self.objects.get_mut(i)) {
            old.is_hovered = false;
        }
        if let Some(new) = index.and_then(|i| self.objects.get_mut(i)) {
            new.is_hovered = true;
        }
        true
    }
}

/// Wireframe city: boxes on a square grid, drawn as a line list.
///
/// Vertices live in a unit footprint (`x`, `z` in `[-0.5, 0.5]`) with heights
/// in world units; `model` stretches the footprint over the world extent.
#[derive(Debug, Clone)]
pub(crate) struct CityMesh {
    pub(crate) vertices: Vec<[f32; 3]>,
    pub(crate) model: Matrix4<f32>,
}

impl CityMesh {
    pub(crate) fn generate(config: &SceneConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        let blocks = config.city_blocks;
        let mut vertices = Vec::with_capacity(blocks * blocks * 24);

        if blocks > 0 {
            let cell = 1.0 / blocks as f32;
            let footprint = cell * 0.35;
            let tallest = (config.min_height * 0.75).max(1.0);

            for i in 0..blocks {
                for j in 0..blocks {
                    let center_x = -0.5 + (i as f32 + 0.5) * cell;
                    let center_z = -0.5 + (j as f32 + 0.5) * cell;
                    let height = sample(&mut rng, 1.0, tallest);
                    push_box_edges(
                        &mut vertices,
                        [center_x - footprint, 0.0, center_z - footprint],
                        [center_x + footprint, height, center_z + footprint],
                    );
                }
            }
        }

        let side = 2.0 * config.world_extent.max(0.0);
        Self {
            vertices,
            model: math::scale(side, 1.0, side),
        }
    }
}

fn push_box_edges(vertices: &mut Vec<[f32; 3]>, min: [f32; 3], max: [f32; 3]) {
    let corner = |x: bool, y: bool, z: bool| {
        [
            if x { max[0] } else { min[0] },
            if y { max[1] } else { min[1] },
            if z { max[2] } else { min[2] },
        ]
    };

    for y in [false, true] {
        // Bottom and top rectangles
        vertices.extend_from_slice(&[
            corner(false, y, false),
            corner(true, y, false),
            corner(true, y, false),
            corner(true, y, true),
            corner(true, y, true),
            corner(false, y, true),
            corner(false, y, true),
            corner(false, y, false),
        ]);
    }
    for (x, z) in [(false, false), (true, false), (true, true), (false, true)] {
        vertices.push(corner(x, false, z));
        vertices.push(corner(x, true, z));
    }
}

/// Uniform sample in `[low, high)`, or `low` when the range is empty.
fn sample(rng: &mut StdRng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.random_range(low..high)
    } else {
        low
    }
}
