/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Spatial index for node-card hit testing.
//!
//! Cards are indexed by their world-space rectangle so point and range
//! queries use an R*-tree instead of a full O(n) card scan. Draw order is
//! iteration order, so ties at a point resolve to the card indexed last.

use euclid::default::{Box2D, Point2D};
use rstar::{AABB, Envelope, PointDistance, RTree, RTreeObject};
use uuid::Uuid;

/// A node card entry stored in the R*-tree.
struct IndexedCard {
    envelope: AABB<[f32; 2]>,
    id: Uuid,
    /// Insertion ordinal; higher draws later, so higher wins point ties.
    ordinal: usize,
}

impl RTreeObject for IndexedCard {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedCard {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        self.envelope.distance_2(point)
    }

    fn contains_point(&self, point: &[f32; 2]) -> bool {
        self.envelope.contains_point(point)
    }
}

/// Spatial index mapping world-space card rectangles to node ids.
///
/// Queries operate in world space; callers convert screen coordinates via
/// `Viewport::screen_to_world` first.
pub(crate) struct CardSpatialIndex {
    tree: RTree<IndexedCard>,
}

impl CardSpatialIndex {
    /// Build the index from `(id, world_rect)` pairs in draw order.
    pub fn build(cards: impl Iterator<Item = (Uuid, Box2D<f32>)>) -> Self {
        let entries: Vec<_> = cards
            .enumerate()
            .map(|(ordinal, (id, rect))| IndexedCard {
                envelope: AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]),
                id,
                ordinal,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Topmost card containing `point`, if any.
    pub fn card_at_point(&self, point: Point2D<f32>) -> Option<Uuid> {
        self.tree
            .locate_all_at_point(&[point.x, point.y])
            .max_by_key(|card| card.ordinal)
            .map(|card| card.id)
    }

    /// All cards whose rectangle intersects `rect`.
    pub fn cards_in_rect(&self, rect: Box2D<f32>) -> Vec<Uuid> {
        let aabb = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        self.tree
            .locate_in_envelope_intersecting(&aabb)
            .map(|card| card.id)
            .collect()
    }
}
