/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pan/zoom camera over the world-space canvas.
//!
//! `screen = world * scale + offset`. All interactive zoom goes through
//! [`Viewport::zoom_at`], which keeps the anchor point fixed on screen.

use euclid::default::{Box2D, Point2D, Size2D, Vector2D};

/// Interactive zoom bounds.
pub const SCALE_MIN: f32 = 0.25;
pub const SCALE_MAX: f32 = 2.0;

/// Fit-to-bounds never zooms in past 1:1.
pub const FIT_SCALE_MAX: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Screen-space translation applied after scaling.
    pub offset: Vector2D<f32>,
    pub scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vector2D::zero(),
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen_to_world(&self, screen: Point2D<f32>) -> Point2D<f32> {
        (screen - self.offset) / self.scale
    }

    pub fn world_to_screen(&self, world: Point2D<f32>) -> Point2D<f32> {
        world * self.scale + self.offset
    }

    /// Translate the view by a screen-space delta.
    pub fn pan(&mut self, delta: Vector2D<f32>) {
        self.offset += delta;
    }

    pub fn set_offset(&mut self, offset: Vector2D<f32>) {
        self.offset = offset;
    }

    /// Scale by `factor` (clamped to `[SCALE_MIN, SCALE_MAX]`), keeping the
    /// world point under `anchor` at the same screen position.
    pub fn zoom_at(&mut self, anchor: Point2D<f32>, factor: f32) {
        let new_scale = (self.scale * factor).clamp(SCALE_MIN, SCALE_MAX);
        let ratio = new_scale / self.scale;
        self.offset = anchor.to_vector() - (anchor.to_vector() - self.offset) * ratio;
        self.scale = new_scale;
    }

    /// Center the union of `bounds` in a viewport of `size`, padded by
    /// `padding` world units, at a scale that contains everything. Fit
    /// scale is clamped to `[SCALE_MIN, FIT_SCALE_MAX]`: small content is
    /// centered at 1:1 rather than magnified. Empty input is a no-op.
    pub fn fit_to_bounds(&mut self, bounds: &[Box2D<f32>], size: Size2D<f32>, padding: f32) {
        let mut iter = bounds.iter();
        let Some(first) = iter.next() else {
            return;
        };
        let world = iter
            .fold(*first, |acc, b| acc.union(b))
            .inflate(padding, padding);

        let width = world.width().max(f32::EPSILON);
        let height = world.height().max(f32::EPSILON);
        self.scale = (size.width / width)
            .min(size.height / height)
            .clamp(SCALE_MIN, FIT_SCALE_MAX);

        let screen_center = Point2D::new(size.width / 2.0, size.height / 2.0);
        self.offset = screen_center.to_vector() - world.center().to_vector() * self.scale;
    }

    /// Back to the identity transform.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// World-space rectangle currently visible in a viewport of `size`.
    pub fn visible_world_rect(&self, size: Size2D<f32>) -> Box2D<f32> {
        Box2D::new(
            self.screen_to_world(Point2D::zero()),
            self.screen_to_world(Point2D::new(size.width, size.height)),
        )
    }
}
