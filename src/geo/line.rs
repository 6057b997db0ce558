//! Bresenham lattice line iterators
//!
//! Both iterators yield every lattice point a straight line between two
//! integer points passes through, start and end inclusive. They are one-shot:
//! once exhausted, build a new one.

use bevy::prelude::*;

/// 2D Bresenham line over grid cells
#[derive(Debug, Clone)]
pub struct LinePoints2 {
    x: i32,
    y: i32,
    dst_x: i32,
    dst_y: i32,
    dx: i64,
    dy: i64,
    sx: i32,
    sy: i32,
    error: i64,
    first: bool,
}

impl LinePoints2 {
    pub fn new(start: IVec2, end: IVec2) -> Self {
        let dx = (i64::from(end.x) - i64::from(start.x)).abs();
        let dy = (i64::from(end.y) - i64::from(start.y)).abs();

        Self {
            x: start.x,
            y: start.y,
            dst_x: end.x,
            dst_y: end.y,
            dx,
            dy,
            sx: if start.x < end.x { 1 } else { -1 },
            sy: if start.y < end.y { 1 } else { -1 },
            error: if dx >= dy { dx / 2 } else { dy / 2 },
            first: true,
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    /// Advance to the next lattice point, returning false once the end was already produced
    pub fn step(&mut self) -> bool {
        if self.first {
            self.first = false;
            return true;
        }

        if self.dx >= self.dy {
            if self.x != self.dst_x {
                self.x += self.sx;
                self.error += self.dy;
                if self.error >= self.dx {
                    self.y += self.sy;
                    self.error -= self.dx;
                }
                return true;
            }
        } else if self.y != self.dst_y {
            self.y += self.sy;
            self.error += self.dx;
            if self.error >= self.dy {
                self.x += self.sx;
                self.error -= self.dy;
            }
            return true;
        }

        false
    }
}

impl Iterator for LinePoints2 {
    type Item = IVec2;

    fn next(&mut self) -> Option<IVec2> {
        self.step().then(|| IVec2::new(self.x, self.y))
    }
}

/// Dominant axis of a 3D line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

/// 3D Bresenham line, symmetric in all three axes
///
/// The axis with the largest absolute delta drives the walk; the two minor
/// axes keep their own error accumulators and step whenever the accumulator
/// reaches the dominant delta.
#[derive(Debug, Clone)]
pub struct LinePoints3 {
    current: [i32; 3],
    target: [i32; 3],
    delta: [i64; 3],
    sign: [i32; 3],
    major: Axis,
    error: i64,
    error2: i64,
    first: bool,
}

impl LinePoints3 {
    pub fn new(start: IVec3, end: IVec3) -> Self {
        let delta = [
            (i64::from(end.x) - i64::from(start.x)).abs(),
            (i64::from(end.y) - i64::from(start.y)).abs(),
            (i64::from(end.z) - i64::from(start.z)).abs(),
        ];
        let [dx, dy, dz] = delta;

        let major = if dx >= dy && dx >= dz {
            Axis::X
        } else if dy >= dx && dy >= dz {
            Axis::Y
        } else {
            Axis::Z
        };
        let half = delta[major as usize] / 2;

        Self {
            current: start.to_array(),
            target: end.to_array(),
            delta,
            sign: [
                if start.x < end.x { 1 } else { -1 },
                if start.y < end.y { 1 } else { -1 },
                if start.z < end.z { 1 } else { -1 },
            ],
            major,
            error: half,
            error2: half,
            first: true,
        }
    }

    pub fn x(&self) -> i32 {
        self.current[0]
    }

    pub fn y(&self) -> i32 {
        self.current[1]
    }

    pub fn z(&self) -> i32 {
        self.current[2]
    }

    /// Advance to the next lattice point, returning false once the end was already produced
    pub fn step(&mut self) -> bool {
        if self.first {
            self.first = false;
            return true;
        }

        let major = self.major as usize;
        if self.current[major] == self.target[major] {
            return false;
        }

        // Minor axes in fixed order: (Y, Z) for X, (X, Z) for Y, (X, Y) for Z
        let (minor, minor2) = match self.major {
            Axis::X => (1, 2),
            Axis::Y => (0, 2),
            Axis::Z => (0, 1),
        };
        let major_delta = self.delta[major];

        self.current[major] += self.sign[major];

        self.error += self.delta[minor];
        if self.error >= major_delta {
            self.current[minor] += self.sign[minor];
            self.error -= major_delta;
        }

        self.error2 += self.delta[minor2];
        if self.error2 >= major_delta {
            self.current[minor2] += self.sign[minor2];
            self.error2 -= major_delta;
        }

        true
    }
}

impl Iterator for LinePoints3 {
    type Item = IVec3;

    fn next(&mut self) -> Option<IVec3> {
        self.step().then(|| IVec3::from_array(self.current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unit_steps_3d(points: &[IVec3]) {
        for pair in points.windows(2) {
            let step = (pair[1] - pair[0]).abs();
            assert!(
                step.x <= 1 && step.y <= 1 && step.z <= 1,
                "Step {:?} -> {:?} moved more than one unit",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_2d_horizontal_line() {
        let points: Vec<IVec2> = LinePoints2::new(IVec2::new(0, 0), IVec2::new(4, 0)).collect();
        assert_eq!(
            points,
            vec![
                IVec2::new(0, 0),
                IVec2::new(1, 0),
                IVec2::new(2, 0),
                IVec2::new(3, 0),
                IVec2::new(4, 0),
            ]
        );
    }

    #[test]
    fn test_2d_single_point() {
        let mut line = LinePoints2::new(IVec2::new(7, -3), IVec2::new(7, -3));
        assert!(line.step());
        assert_eq!((line.x(), line.y()), (7, -3));
        assert!(!line.step());
        assert!(!line.step());
    }

    #[test]
    fn test_2d_steep_negative_line() {
        let points: Vec<IVec2> = LinePoints2::new(IVec2::new(2, 5), IVec2::new(0, -1)).collect();
        assert_eq!(points.first(), Some(&IVec2::new(2, 5)));
        assert_eq!(points.last(), Some(&IVec2::new(0, -1)));
        // Dominant axis is y: one point per row
        assert_eq!(points.len(), 7);
    }

    #[test]
    fn test_2d_diagonal_line() {
        let points: Vec<IVec2> = LinePoints2::new(IVec2::new(0, 0), IVec2::new(3, 3)).collect();
        assert_eq!(
            points,
            vec![
                IVec2::new(0, 0),
                IVec2::new(1, 1),
                IVec2::new(2, 2),
                IVec2::new(3, 3),
            ]
        );
    }

    #[test]
    fn test_3d_single_point() {
        let points: Vec<IVec3> =
            LinePoints3::new(IVec3::new(1, 2, 3), IVec3::new(1, 2, 3)).collect();
        assert_eq!(points, vec![IVec3::new(1, 2, 3)]);
    }

    #[test]
    fn test_3d_zero_delta_axis_never_steps() {
        let points: Vec<IVec3> =
            LinePoints3::new(IVec3::new(0, 5, 0), IVec3::new(6, 5, 3)).collect();
        assert_eq!(points.len(), 7);
        assert!(points.iter().all(|p| p.y == 5));
        assert_unit_steps_3d(&points);
    }

    #[test]
    fn test_3d_z_dominant_line() {
        let mut line = LinePoints3::new(IVec3::new(0, 0, 0), IVec3::new(2, 1, 10));
        let mut count = 0;
        while line.step() {
            count += 1;
        }
        assert_eq!(count, 11);
        assert_eq!((line.x(), line.y(), line.z()), (2, 1, 10));
    }

    #[test]
    fn test_3d_round_trip_endpoints_and_unit_steps() {
        let endpoints = [
            (IVec3::new(0, 0, 0), IVec3::new(10, 3, -4)),
            (IVec3::new(-5, 8, 2), IVec3::new(4, -9, 2)),
            (IVec3::new(3, 3, 100), IVec3::new(-2, 7, -30)),
            (IVec3::new(1000, -1000, 7), IVec3::new(997, -990, 12)),
            (IVec3::new(0, 0, 0), IVec3::new(1, 1, 1)),
        ];

        for (start, end) in endpoints {
            let points: Vec<IVec3> = LinePoints3::new(start, end).collect();
            assert_eq!(points.first(), Some(&start), "line {start:?} -> {end:?}");
            assert_eq!(points.last(), Some(&end), "line {start:?} -> {end:?}");

            let delta = (end - start).abs();
            let dominant = delta.x.max(delta.y).max(delta.z);
            assert_eq!(points.len() as i32, dominant + 1);
            assert_unit_steps_3d(&points);
        }
    }

    #[test]
    fn test_3d_is_symmetric_in_axes() {
        // Swapping axes of the inputs swaps axes of every produced point
        let xyz: Vec<IVec3> = LinePoints3::new(IVec3::ZERO, IVec3::new(9, 4, 2)).collect();
        let zyx: Vec<IVec3> = LinePoints3::new(IVec3::ZERO, IVec3::new(2, 4, 9)).collect();

        assert_eq!(xyz.len(), zyx.len());
        for (a, b) in xyz.iter().zip(&zyx) {
            assert_eq!((a.x, a.y, a.z), (b.z, b.y, b.x));
        }
    }
}
