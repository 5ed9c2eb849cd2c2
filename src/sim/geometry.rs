//! Angle conventions shared by the robot, the ball and the grid.
//!
//! Headings are degrees measured counter-clockwise from the column axis, with rows
//! growing downwards: moving `d` units along heading `h` displaces a point by
//! `(-d * sin h, d * cos h)` in (row, col).

/// Wraps an integer heading into `[0, 360)`.
pub fn normalize_heading(heading: i32) -> i32 {
    heading.rem_euclid(360)
}

/// Wraps a fractional angle into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Row/col displacement of `distance` units along `heading_deg`.
pub fn displacement(heading_deg: f64, distance: f64) -> (f64, f64) {
    let theta = heading_deg.to_radians();
    (-distance * theta.sin(), distance * theta.cos())
}

/// Bearing in `[0, 360)` from `(from_row, from_col)` towards `(to_row, to_col)`.
pub fn bearing(from_row: f64, from_col: f64, to_row: f64, to_col: f64) -> f64 {
    let d_row = to_row - from_row;
    let d_col = to_col - from_col;
    normalize_degrees((-d_row).atan2(d_col).to_degrees())
}

/// Smallest absolute difference between two angles, in `[0, 180]`.
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = normalize_degrees(a - b);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

pub fn distance(row_a: f64, col_a: f64, row_b: f64, col_b: f64) -> f64 {
    (row_a - row_b).hypot(col_a - col_b)
}
