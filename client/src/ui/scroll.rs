//! Row-based scrolling for the list panels

use std::ops::Range;

use macroquad::prelude::*;

/// Scroll position of one list panel, counted in whole rows
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListScroll {
    first_row: usize,
}

impl ListScroll {
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    /// Move by `rows` (negative scrolls up), staying within the list.
    pub fn scroll_by(&mut self, rows: i32, total_rows: usize, visible_rows: usize) {
        let max_first = total_rows.saturating_sub(visible_rows);
        let target = self.first_row as i64 + rows as i64;
        self.first_row = target.clamp(0, max_first as i64) as usize;
    }

    /// Re-clamp after the list shrank.
    pub fn clamp(&mut self, total_rows: usize, visible_rows: usize) {
        self.scroll_by(0, total_rows, visible_rows);
    }

    pub fn visible_range(&self, total_rows: usize, visible_rows: usize) -> Range<usize> {
        let start = self.first_row.min(total_rows);
        start..(start + visible_rows).min(total_rows)
    }

    /// Thumb position and size as fractions of the track, if a scrollbar is needed
    pub fn thumb(&self, total_rows: usize, visible_rows: usize) -> Option<(f32, f32)> {
        if total_rows <= visible_rows || total_rows == 0 {
            return None;
        }
        let size = visible_rows as f32 / total_rows as f32;
        let max_first = (total_rows - visible_rows) as f32;
        Some((self.first_row as f32 / max_first, size))
    }
}

/// Rows to scroll for this frame's mouse wheel movement
pub fn wheel_rows() -> i32 {
    let (_wheel_x, wheel_y) = mouse_wheel();
    if wheel_y > 0.0 {
        -1
    } else if wheel_y < 0.0 {
        1
    } else {
        0
    }
}

pub fn draw_scrollbar(track: Rect, position: f32, thumb_size: f32, track_color: Color, thumb_color: Color) {
    draw_rectangle(track.x, track.y, track.w, track.h, track_color);

    let thumb_height = (track.h * thumb_size).max(8.0);
    let thumb_y = track.y + (track.h - thumb_height) * position;
    draw_rectangle(track.x, thumb_y, track.w, thumb_height, thumb_color);
}
