/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Grid auto-layout.
//!
//! Placement only considers node count and order, never edges: the column
//! count is the ceiling of the square root of the node count, rows fill
//! left to right, top to bottom.

use euclid::default::Point2D;

/// World-space distance between grid cells.
pub const DEFAULT_SPACING: f32 = 250.0;

/// Top-left origin of the grid.
pub const GRID_ORIGIN: Point2D<f32> = Point2D::new(50.0, 50.0);

/// Grid positions for `count` nodes in iteration order.
pub fn grid_positions(count: usize, spacing: f32) -> Vec<Point2D<f32>> {
    if count == 0 {
        return Vec::new();
    }
    let cols = (count as f32).sqrt().ceil() as usize;
    (0..count)
        .map(|i| {
            Point2D::new(
                GRID_ORIGIN.x + (i % cols) as f32 * spacing,
                GRID_ORIGIN.y + (i / cols) as f32 * spacing,
            )
        })
        .collect()
}
