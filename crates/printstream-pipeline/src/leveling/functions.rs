//! Bilinear bed-height surface
//!
//! The probed samples form a rectilinear grid of `width` distinct X positions
//! by `height` distinct Y positions, in any order. Heights between samples are
//! interpolated bilinearly within the enclosing cell. Outside the probed
//! extent the surface continues along the gradient of its nearest edge point,
//! so it grows at most linearly with distance from the grid. It stays
//! continuous everywhere and passes exactly through every sample.
//!
//! Coordinates within [`GRID_TOLERANCE`] of a grid line are treated as lying
//! on that line, both when building the grid and when evaluating it.

use crate::gcode::command::CommandWord;
use crate::gcode::parser::{format_coordinate, format_number, parameters, split_comment};
use printstream_core::{GridShape, LevelingData, LevelingError, Vector3};

/// Samples whose coordinates differ by less than this share a grid line (mm)
const GRID_TOLERANCE: f64 = 1e-6;

/// Interpolation model built from one probed sample set
#[derive(Debug, Clone, PartialEq)]
pub struct LevelingFunctions {
    shape: GridShape,
    /// Distinct X positions, ascending
    xs: Vec<f64>,
    /// Distinct Y positions, ascending
    ys: Vec<f64>,
    /// Heights indexed `[row * width + col]`
    heights: Vec<f64>,
    sampled_positions: Vec<Vector3>,
    probe_offset: f64,
    data_probe_offset: f64,
}

impl LevelingFunctions {
    /// Build the surface for `data` laid out as `shape`
    ///
    /// `probe_offset` is the currently configured probe offset. When it
    /// differs from the offset recorded with the samples, the difference is
    /// added to every compensation.
    pub fn build(
        data: &LevelingData,
        shape: GridShape,
        probe_offset: f64,
    ) -> Result<Self, LevelingError> {
        if shape.width < 2 || shape.height < 2 {
            return Err(LevelingError::GridTooSmall {
                width: shape.width,
                height: shape.height,
            });
        }

        let Some(expected) = shape.sample_count() else {
            return Err(LevelingError::GridTooLarge {
                width: shape.width,
                height: shape.height,
            });
        };

        if data.len() != expected {
            return Err(LevelingError::SampleCountMismatch {
                width: shape.width,
                height: shape.height,
                expected,
                actual: data.len(),
            });
        }

        if let Some(index) = data.samples.iter().position(|s| !s.is_finite()) {
            return Err(LevelingError::NonFiniteSample { index });
        }

        for offset in [probe_offset, data.z_probe_offset] {
            if !offset.is_finite() {
                return Err(LevelingError::NonFiniteOffset { offset });
            }
        }

        let xs = grid_lines(data.samples.iter().map(|s| s.x));
        let ys = grid_lines(data.samples.iter().map(|s| s.y));
        if xs.len() != shape.width || ys.len() != shape.height {
            return Err(LevelingError::NotRectilinear {
                reason: format!(
                    "found {} distinct X and {} distinct Y positions, expected a {} grid",
                    xs.len(),
                    ys.len(),
                    shape
                ),
            });
        }

        let mut heights = vec![None; expected];
        for sample in &data.samples {
            let (Some(col), Some(row)) = (line_index(&xs, sample.x), line_index(&ys, sample.y))
            else {
                return Err(LevelingError::NotRectilinear {
                    reason: format!("sample {} is off the grid", sample),
                });
            };
            let slot = &mut heights[row * shape.width + col];
            if slot.is_some() {
                return Err(LevelingError::NotRectilinear {
                    reason: format!("two samples at X{} Y{}", xs[col], ys[row]),
                });
            }
            *slot = Some(sample.z);
        }

        // count matches and no slot is taken twice, so every slot is filled
        let heights = heights.into_iter().map(|h| h.unwrap_or(0.0)).collect();

        Ok(Self {
            shape,
            xs,
            ys,
            heights,
            sampled_positions: data.samples.clone(),
            probe_offset,
            data_probe_offset: data.z_probe_offset,
        })
    }

    /// Grid shape the model was built for
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Probe offset setting the model was built with
    pub fn probe_offset(&self) -> f64 {
        self.probe_offset
    }

    /// The samples the model was built from
    pub fn sampled_positions(&self) -> &[Vector3] {
        &self.sampled_positions
    }

    /// True when the model was built from exactly these inputs
    pub fn is_current_for(&self, data: &LevelingData, shape: GridShape, probe_offset: f64) -> bool {
        self.shape == shape
            && self.probe_offset.to_bits() == probe_offset.to_bits()
            && self.data_probe_offset.to_bits() == data.z_probe_offset.to_bits()
            && data.samples_are_same(&self.sampled_positions)
    }

    /// Surface height at `(x, y)`
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let (col, s) = locate(&self.xs, x);
        let (row, t) = locate(&self.ys, y);
        let w = self.shape.width;

        let z00 = self.heights[row * w + col];
        let z10 = self.heights[row * w + col + 1];
        let z01 = self.heights[(row + 1) * w + col];
        let z11 = self.heights[(row + 1) * w + col + 1];

        // Bilinear value and gradient at the nearest point of the cell, then
        // a first-order step out to (s, t). Inside the cell the step is zero.
        let (sc, tc) = (s.clamp(0.0, 1.0), t.clamp(0.0, 1.0));
        let at_edge = z00 * (1.0 - sc) * (1.0 - tc)
            + z10 * sc * (1.0 - tc)
            + z01 * (1.0 - sc) * tc
            + z11 * sc * tc;
        let ds = (z10 - z00) * (1.0 - tc) + (z11 - z01) * tc;
        let dt = (z01 - z00) * (1.0 - sc) + (z11 - z10) * sc;

        at_edge + ds * (s - sc) + dt * (t - tc)
    }

    /// Z compensation to add to a destination at `(x, y)`
    pub fn z_offset_at(&self, x: f64, y: f64) -> f64 {
        self.evaluate(x, y) + (self.probe_offset - self.data_probe_offset)
    }

    /// `destination` with its Z compensated
    pub fn leveled_position(&self, destination: Vector3) -> Vector3 {
        Vector3::new(
            destination.x,
            destination.y,
            destination.z + self.z_offset_at(destination.x, destination.y),
        )
    }

    /// Remove the compensation from a leveled position
    pub fn unlevel(&self, leveled: Vector3) -> Vector3 {
        Vector3::new(
            leveled.x,
            leveled.y,
            leveled.z - self.z_offset_at(leveled.x, leveled.y),
        )
    }

    /// Rewrite a move line so it targets the leveled `destination`
    ///
    /// `destination` is the full logical position the line moves to. The
    /// result names X, Y and Z explicitly, followed by the line's other
    /// parameters as written and its comment. Lines that move no axis are
    /// returned unchanged.
    pub fn apply_leveling(&self, line: &str, destination: Vector3) -> String {
        let (code, comment) = split_comment(line);
        let Some((_, span)) = CommandWord::parse(code) else {
            return line.to_string();
        };

        let is_axis = |letter: char| matches!(letter, 'X' | 'Y' | 'Z');
        if !parameters(line).any(|p| is_axis(p.letter)) {
            return line.to_string();
        }

        let leveled = self.leveled_position(destination);
        let mut out = String::with_capacity(line.len() + 24);
        out.push_str(&code[span]);
        for (letter, value) in [
            ('X', format_number(leveled.x)),
            ('Y', format_number(leveled.y)),
            ('Z', format_coordinate(leveled.z)),
        ] {
            out.push(' ');
            out.push(letter);
            out.push_str(&value);
        }
        for param in parameters(line).filter(|p| !is_axis(p.letter)) {
            out.push(' ');
            out.push(param.letter);
            out.push_str(param.raw);
        }
        if let Some(comment) = comment {
            out.push(' ');
            out.push_str(comment);
        }
        out
    }
}

/// Distinct coordinate values, ascending, merging values within tolerance
fn grid_lines(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|b, a| (*b - *a).abs() <= GRID_TOLERANCE);
    sorted
}

fn line_index(lines: &[f64], value: f64) -> Option<usize> {
    lines
        .iter()
        .position(|line| (line - value).abs() <= GRID_TOLERANCE)
}

/// Cell index and local coordinate of `value` along a grid axis
///
/// The local coordinate is 0 at the cell's lower line and 1 at its upper
/// line, and runs past that range outside the grid.
fn locate(lines: &[f64], value: f64) -> (usize, f64) {
    let last_cell = lines.len() - 2;
    let cell = lines
        .partition_point(|&line| line <= value)
        .saturating_sub(1)
        .min(last_cell);
    let (lo, hi) = (lines[cell], lines[cell + 1]);
    let local = if (value - lo).abs() <= GRID_TOLERANCE {
        0.0
    } else if (value - hi).abs() <= GRID_TOLERANCE {
        1.0
    } else {
        (value - lo) / (hi - lo)
    };
    (cell, local)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn tilted() -> LevelingData {
        // z = 0.001x + 0.002y, exactly representable by a bilinear surface
        LevelingData::from_fn(GridShape::default(), (0.0, 0.0), (200.0, 200.0), |x, y| {
            0.001 * x + 0.002 * y
        })
    }

    fn saddle() -> LevelingData {
        LevelingData::from_fn(GridShape::new(3, 2), (0.0, 0.0), (100.0, 50.0), |x, y| {
            ((x * 7.0 + y * 3.0) % 5.0) * 0.03 - 0.05
        })
    }

    #[test]
    fn test_build_rejects_bad_input() {
        let shape = GridShape::default();
        let data = LevelingData::flat(GridShape::new(2, 2), (0.0, 0.0), (10.0, 10.0), 0.0);
        assert!(matches!(
            LevelingFunctions::build(&data, shape, 0.0),
            Err(LevelingError::SampleCountMismatch { expected: 9, actual: 4, .. })
        ));
        assert!(matches!(
            LevelingFunctions::build(&data, GridShape::new(4, 1), 0.0),
            Err(LevelingError::GridTooSmall { .. })
        ));

        let mut bad = tilted();
        bad.samples[3].z = f64::NAN;
        assert!(matches!(
            LevelingFunctions::build(&bad, shape, 0.0),
            Err(LevelingError::NonFiniteSample { index: 3 })
        ));

        assert!(matches!(
            LevelingFunctions::build(&tilted(), shape, f64::INFINITY),
            Err(LevelingError::NonFiniteOffset { .. })
        ));
    }

    #[test]
    fn test_build_rejects_non_rectilinear() {
        let mut jittered = tilted();
        jittered.samples[4].x += 3.0;
        assert!(matches!(
            LevelingFunctions::build(&jittered, GridShape::default(), 0.0),
            Err(LevelingError::NotRectilinear { .. })
        ));

        let mut duplicated = tilted();
        duplicated.samples[1] = duplicated.samples[0];
        duplicated.samples[1].z = 0.5;
        assert!(LevelingFunctions::build(&duplicated, GridShape::default(), 0.0).is_err());
    }

    #[test]
    fn test_exact_at_samples() {
        for (data, shape) in [(tilted(), GridShape::default()), (saddle(), GridShape::new(3, 2))] {
            let f = LevelingFunctions::build(&data, shape, 0.0).unwrap();
            for s in &data.samples {
                assert_eq!(f.evaluate(s.x, s.y), s.z, "at {}", s);
            }
        }
    }

    #[test]
    fn test_sample_order_does_not_matter() {
        let mut data = saddle();
        data.samples.reverse();
        data.samples.swap(0, 3);
        let f = LevelingFunctions::build(&data, GridShape::new(3, 2), 0.0).unwrap();
        for s in &data.samples {
            assert_eq!(f.evaluate(s.x, s.y), s.z);
        }
    }

    #[test]
    fn test_plane_reproduced_and_extrapolated() {
        let f = LevelingFunctions::build(&tilted(), GridShape::default(), 0.0).unwrap();
        for (x, y) in [(50.0, 50.0), (137.5, 12.25), (250.0, -40.0), (-10.0, 300.0)] {
            let expected = 0.001 * x + 0.002 * y;
            assert!((f.evaluate(x, y) - expected).abs() < EPS, "at ({x}, {y})");
        }
    }

    fn bowed() -> LevelingData {
        // Corners at +-0.05 around a flat center cross; pure cross-term surface
        LevelingData::from_fn(GridShape::default(), (90.0, 90.0), (110.0, 110.0), |x, y| {
            0.05 * ((x - 100.0) / 10.0) * ((y - 100.0) / 10.0)
        })
    }

    #[test]
    fn test_extrapolation_grows_linearly_past_corners() {
        let f = LevelingFunctions::build(&bowed(), GridShape::default(), 0.0).unwrap();
        assert!((f.evaluate(110.0, 110.0) - 0.05).abs() < EPS);

        // Along the corner diagonal each 10 mm step adds the same amount
        let corner = f.evaluate(90.0, 90.0);
        let one = f.evaluate(80.0, 80.0);
        let two = f.evaluate(70.0, 70.0);
        assert!((one - corner - 0.1).abs() < EPS);
        assert!((two - one - 0.1).abs() < EPS);

        // Far corners stay within the edge slope times the distance
        for (x, y) in [(0.0, 0.0), (200.0, 200.0), (0.0, 200.0), (200.0, 0.0)] {
            let z = f.evaluate(x, y);
            assert!(z.abs() < 1.0, "({x}, {y}) -> {z}");
        }
        assert!((f.evaluate(0.0, 0.0) - 0.95).abs() < EPS);
        assert!((f.evaluate(0.0, 200.0) + 0.95).abs() < EPS);
    }

    #[test]
    fn test_continuous_leaving_the_grid() {
        let f = LevelingFunctions::build(&bowed(), GridShape::default(), 0.0).unwrap();
        for (x, y) in [(90.0, 95.0), (105.0, 110.0), (110.0, 110.0), (90.0, 90.0)] {
            let at = f.evaluate(x, y);
            for (dx, dy) in [(-1e-9, 0.0), (1e-9, 0.0), (0.0, -1e-9), (0.0, 1e-9), (1e-9, 1e-9)] {
                assert!((f.evaluate(x + dx, y + dy) - at).abs() < 1e-9, "near ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_exact_at_samples_off_line_by_less_than_tolerance() {
        let mut data = tilted();
        data.samples[4].x += GRID_TOLERANCE / 2.0;
        data.samples[5].y -= GRID_TOLERANCE / 4.0;
        let f = LevelingFunctions::build(&data, GridShape::default(), 0.0).unwrap();
        for s in &data.samples {
            assert_eq!(f.evaluate(s.x, s.y), s.z, "at {}", s);
        }
    }

    #[test]
    fn test_build_rejects_overflowing_grid() {
        let shape = GridShape::new(usize::MAX, 2);
        assert!(matches!(
            LevelingFunctions::build(&tilted(), shape, 0.0),
            Err(LevelingError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_continuous_across_cell_boundary() {
        let f = LevelingFunctions::build(&saddle(), GridShape::new(3, 2), 0.0).unwrap();
        let y = 17.0;
        let below = f.evaluate(50.0 - 1e-9, y);
        let at = f.evaluate(50.0, y);
        let above = f.evaluate(50.0 + 1e-9, y);
        assert!((below - at).abs() < 1e-9);
        assert!((above - at).abs() < 1e-9);
    }

    #[test]
    fn test_probe_offset_shifts_compensation() {
        let data = tilted().with_probe_offset(0.1);
        let f = LevelingFunctions::build(&data, GridShape::default(), 0.25).unwrap();
        assert!((f.z_offset_at(0.0, 0.0) - 0.15).abs() < EPS);
        assert_eq!(f.probe_offset(), 0.25);
        assert!(f.is_current_for(&data, GridShape::default(), 0.25));
        assert!(!f.is_current_for(&data, GridShape::default(), 0.2));
        assert!(!f.is_current_for(&tilted(), GridShape::default(), 0.25));
    }

    #[test]
    fn test_unlevel_inverts_leveling() {
        let f = LevelingFunctions::build(&saddle(), GridShape::new(3, 2), 0.0).unwrap();
        let p = Vector3::new(33.0, 21.0, 0.3);
        let back = f.unlevel(f.leveled_position(p));
        assert_eq!(back.x, p.x);
        assert_eq!(back.y, p.y);
        assert!((back.z - p.z).abs() < EPS);
    }

    #[test]
    fn test_apply_leveling_flat_grid_is_identity() {
        let data = LevelingData::flat(GridShape::default(), (0.0, 0.0), (200.0, 200.0), 0.0);
        let f = LevelingFunctions::build(&data, GridShape::default(), 0.0).unwrap();
        let line = "G1 X10 Y10 Z5 F1200";
        assert_eq!(f.apply_leveling(line, Vector3::new(10.0, 10.0, 5.0)), line);
    }

    #[test]
    fn test_apply_leveling_rewrites_z() {
        let f = LevelingFunctions::build(&tilted(), GridShape::default(), 0.0).unwrap();
        let out = f.apply_leveling("G1 X100 E1.25 F1800 ; infill", Vector3::new(100.0, 50.0, 0.2));
        assert_eq!(out, "G1 X100 Y50 Z0.4 E1.25 F1800 ; infill");

        let out = f.apply_leveling("G0 Z1", Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(out, "G0 X0 Y0 Z1");
    }

    #[test]
    fn test_apply_leveling_keeps_xy_exact() {
        let f = LevelingFunctions::build(&tilted(), GridShape::default(), 0.0).unwrap();
        let p = Vector3::new(10.000_000_4, 20.123_456_789, 0.2);
        let out = f.apply_leveling("G1 X10.0000004 Y20.123456789 Z0.2", p);
        assert_eq!(out, "G1 X10.0000004 Y20.123456789 Z0.250247");
    }

    #[test]
    fn test_apply_leveling_without_axes_is_unchanged() {
        let f = LevelingFunctions::build(&tilted(), GridShape::default(), 0.0).unwrap();
        let line = "G1 E-2 F2400 ; retract";
        assert_eq!(f.apply_leveling(line, Vector3::new(100.0, 50.0, 0.2)), line);
    }
}
