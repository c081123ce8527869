// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Collision shape descriptions handed to the engine.
//!
//! Shape kinds form a closed set; each variant carries only the parameters
//! its constructor needs. Mesh-derived kinds are built by the engine adapter
//! from the owning node's geometry.

use echo_phys_geom::Vec3;
use tracing::warn;

/// How a mesh-derived shape is built from node geometry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MeshMode {
    /// Single convex hull around all vertices.
    Hull,
    /// Hierarchical approximate convex decomposition.
    Hacd,
    /// Volumetric approximate convex decomposition.
    Vhacd,
    /// Triangle mesh treated as convex.
    Convex,
    /// Triangle mesh treated as concave (static use only).
    Concave,
}

/// One child of a compound shape, placed relative to the body origin.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundChild {
    /// Child origin relative to the body.
    pub offset: Vec3,
    /// Child shape.
    pub shape: ShapeKind,
}

/// Collision shape kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Axis-aligned box given by full extents.
    Box {
        /// Extent along X.
        width: f32,
        /// Extent along Y.
        height: f32,
        /// Extent along Z.
        depth: f32,
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// Y-aligned cylinder.
    Cylinder {
        /// Radius of the top cap (the engine cylinder is uniform).
        radius_top: f32,
        /// Full height.
        height: f32,
    },
    /// Y-aligned cone.
    Cone {
        /// Base radius.
        radius: f32,
        /// Full height.
        height: f32,
    },
    /// Y-aligned capsule.
    Capsule {
        /// Hemisphere radius.
        radius: f32,
        /// Cylinder height between the hemispheres.
        height: f32,
    },
    /// Torus approximated by the adapter from segments.
    Torus {
        /// Distance from the torus center to the tube center.
        radius: f32,
        /// Tube radius.
        tube: f32,
        /// Segment count around the ring.
        tubular_segments: u32,
    },
    /// Flat plane built from the node geometry.
    Plane,
    /// Shape derived from node geometry.
    Mesh(MeshMode),
    /// Several child shapes merged into one compound.
    Compound(Vec<CompoundChild>),
}

impl ShapeKind {
    /// Unit box, the fallback for nodes without a recognizable shape.
    pub const UNIT_BOX: Self = Self::Box {
        width: 1.0,
        height: 1.0,
        depth: 1.0,
    };

    /// Returns `true` if the engine needs the node's geometry to build this
    /// shape (directly or through a compound child).
    pub fn needs_geometry(&self) -> bool {
        match self {
            Self::Plane | Self::Mesh(_) => true,
            Self::Compound(children) => children.iter().any(|c| c.shape.needs_geometry()),
            _ => false,
        }
    }

    /// Half extents the engine box constructor expects.
    pub fn box_half_extents(&self) -> Option<Vec3> {
        match *self {
            Self::Box {
                width,
                height,
                depth,
            } => Some(Vec3::new(width * 0.5, height * 0.5, depth * 0.5)),
            _ => None,
        }
    }
}

/// Picks the shape for a node: explicit config first, then the scene's hint,
/// then a unit box (logged).
pub fn resolve_shape(
    explicit: Option<&ShapeKind>,
    hint: Option<ShapeKind>,
    node_name: Option<&str>,
) -> ShapeKind {
    if let Some(shape) = explicit {
        return shape.clone();
    }
    if let Some(shape) = hint {
        return shape;
    }
    warn!(name = ?node_name, "shape not recognized, falling back to box");
    ShapeKind::UNIT_BOX
}
