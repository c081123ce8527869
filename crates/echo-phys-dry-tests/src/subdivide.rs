// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Slab subdivider fake.

use std::sync::{Arc, Mutex};

use echo_phys::{Fragment, GeometrySubdivider, Pose, Vec3};

use crate::scene::FakeGeometry;

/// One recorded `subdivide` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SubdivideCall {
    /// Pose of the object being split.
    pub pose: Pose,
    /// Impact point passed in.
    pub impact_point: Vec3,
    /// Impact normal passed in.
    pub impact_normal: Vec3,
    /// Piece count requested.
    pub piece_count_hint: u32,
}

#[derive(Debug, Default)]
struct SubdividerInner {
    piece_count: Option<u32>,
    calls: Vec<SubdivideCall>,
}

/// Splits a geometry's bounds into equal slabs along local X.
///
/// Uses the requested hint unless a fixed piece count was configured;
/// [`FakeSubdivider::degenerate`] always returns no fragments. Clones share
/// the call log.
#[derive(Debug, Clone, Default)]
pub struct FakeSubdivider {
    inner: Arc<Mutex<SubdividerInner>>,
}

impl FakeSubdivider {
    /// Honors the piece-count hint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always produces `count` pieces.
    pub fn with_piece_count(count: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubdividerInner {
                piece_count: Some(count),
                calls: Vec::new(),
            })),
        }
    }

    /// Always produces zero pieces.
    pub fn degenerate() -> Self {
        Self::with_piece_count(0)
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<SubdivideCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .len()
    }
}

impl GeometrySubdivider for FakeSubdivider {
    type Geometry = FakeGeometry;

    #[allow(clippy::cast_precision_loss)]
    fn subdivide(
        &mut self,
        geometry: &FakeGeometry,
        pose: Pose,
        impact_point: Vec3,
        impact_normal: Vec3,
        piece_count_hint: u32,
    ) -> Vec<Fragment<FakeGeometry>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.calls.push(SubdivideCall {
            pose,
            impact_point,
            impact_normal,
            piece_count_hint,
        });
        let count = inner.piece_count.unwrap_or(piece_count_hint);
        let Some((lo, hi)) = geometry.bounds() else {
            return Vec::new();
        };
        if count == 0 {
            return Vec::new();
        }

        let size = hi.sub(&lo);
        let width = size.x() / count as f32;
        (0..count)
            .map(|i| {
                let center = Vec3::new(
                    lo.x() + width * (i as f32 + 0.5),
                    (lo.y() + hi.y()) * 0.5,
                    (lo.z() + hi.z()) * 0.5,
                );
                Fragment {
                    geometry: FakeGeometry::cuboid(width, size.y(), size.z()),
                    pose: Pose::new(pose.transform_point(center), pose.rotation),
                }
            })
            .collect()
    }
}
