use crate::evaluation::Tracks;
use crate::export::ExportError;
use crate::sim::grid::{Cell, Grid, HEIGHT, WIDTH};
use image::{Rgb, RgbImage};
use std::path::Path;

/// Robot steps drawn in the early colour before switching to the late one
pub const EARLY_STEPS: u32 = 20;

const WALL: Rgb<u8> = Rgb([255, 255, 255]);
const ROBOT_EARLY: Rgb<u8> = Rgb([255, 255, 0]);
const ROBOT_LATE: Rgb<u8> = Rgb([255, 0, 0]);
const BALL: Rgb<u8> = Rgb([0, 255, 0]);

/// Draws one pixel per grid cell: border and obstacles in white, the robot's path in yellow for
/// its first `EARLY_STEPS` steps and red afterwards, and the ball's path in green on top.
pub fn render_tracks(tracks: &Tracks) -> RgbImage {
    let grid = Grid::new();
    RgbImage::from_fn(WIDTH as u32, HEIGHT as u32, |x, y| {
        let (row, col) = (y as i64, x as i64);
        if tracks.ball.visited_at(row, col).is_some() {
            return BALL;
        }
        if let Some(step) = tracks.robot.visited_at(row, col) {
            return if step < EARLY_STEPS {
                ROBOT_EARLY
            } else {
                ROBOT_LATE
            };
        }
        match grid.get_cell(row, col) {
            Cell::Border | Cell::Obstacle => WALL,
            _ => Rgb([0, 0, 0]),
        }
    })
}

/// Renders the tracks and saves them, the format follows the file extension.
pub fn save_track_image(tracks: &Tracks, path: &Path) -> Result<(), ExportError> {
    render_tracks(tracks).save(path)?;
    Ok(())
}
