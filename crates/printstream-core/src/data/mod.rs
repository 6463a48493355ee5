//! Data models for printer positions and probed bed heights
//!
//! This module provides:
//! - A 3D vector for machine coordinates
//! - Per-axis "known" tracking for positions that are only partially resolved
//! - The `PrinterMove` value type used by every stream stage
//! - Probed leveling samples and grid shape (see [`leveling`])

pub mod leveling;

pub use leveling::{GridShape, LevelingData};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Cartesian machine coordinate in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
}

impl Vector3 {
    /// The origin
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a vector from its components
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// True when every component is finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

bitflags! {
    /// Components of a [`PrinterMove`] whose absolute value is known
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct KnownAxes: u8 {
        /// X position
        const X = 1 << 0;
        /// Y position
        const Y = 1 << 1;
        /// Z position
        const Z = 1 << 2;
        /// Extrusion amount
        const E = 1 << 3;
        /// Feed rate
        const F = 1 << 4;
        /// X, Y and Z together
        const POSITION = Self::X.bits() | Self::Y.bits() | Self::Z.bits();
    }
}

/// A single component of printer state addressed by its G-Code letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// X position
    X,
    /// Y position
    Y,
    /// Z position
    Z,
    /// Extrusion amount
    E,
    /// Feed rate
    F,
}

impl Axis {
    /// Every axis in G-Code parameter order
    pub const ALL: [Axis; 5] = [Axis::X, Axis::Y, Axis::Z, Axis::E, Axis::F];

    /// Map a G-Code parameter letter to its axis
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            'E' => Some(Axis::E),
            'F' => Some(Axis::F),
            _ => None,
        }
    }

    /// The G-Code parameter letter
    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::E => 'E',
            Axis::F => 'F',
        }
    }

    /// The flag tracking whether this axis is known
    pub fn flag(self) -> KnownAxes {
        match self {
            Axis::X => KnownAxes::X,
            Axis::Y => KnownAxes::Y,
            Axis::Z => KnownAxes::Z,
            Axis::E => KnownAxes::E,
            Axis::F => KnownAxes::F,
        }
    }
}

/// Machine state as tracked by the stream stages
///
/// Holds position, extrusion and feed rate together with a per-axis "known"
/// mask. Components that are not known are stored as zero and read back as
/// `None`, so arithmetic on partially known moves never produces bogus
/// absolute values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrinterMove {
    position: Vector3,
    extrusion: f64,
    feed_rate: f64,
    known: KnownAxes,
}

impl Default for PrinterMove {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl PrinterMove {
    /// A move with nothing known
    pub const UNKNOWN: PrinterMove = PrinterMove {
        position: Vector3::ZERO,
        extrusion: 0.0,
        feed_rate: 0.0,
        known: KnownAxes::empty(),
    };

    /// Create a fully known move
    pub fn new(position: Vector3, extrusion: f64, feed_rate: f64) -> Self {
        Self {
            position,
            extrusion,
            feed_rate,
            known: KnownAxes::all(),
        }
    }

    /// Create a move with a known position and unknown extrusion/feed rate
    pub fn from_position(position: Vector3) -> Self {
        Self {
            position,
            extrusion: 0.0,
            feed_rate: 0.0,
            known: KnownAxes::POSITION,
        }
    }

    /// The set of known components
    pub fn known(&self) -> KnownAxes {
        self.known
    }

    /// True when X, Y and Z are all known
    pub fn position_fully_known(&self) -> bool {
        self.known.contains(KnownAxes::POSITION)
    }

    /// Value of one component, `None` if unknown
    pub fn get(&self, axis: Axis) -> Option<f64> {
        if !self.known.contains(axis.flag()) {
            return None;
        }
        Some(match axis {
            Axis::X => self.position.x,
            Axis::Y => self.position.y,
            Axis::Z => self.position.z,
            Axis::E => self.extrusion,
            Axis::F => self.feed_rate,
        })
    }

    /// Set one component and mark it known
    pub fn set(&mut self, axis: Axis, value: f64) {
        *self.slot(axis) = value;
        self.known.insert(axis.flag());
    }

    /// Forget one component
    pub fn clear(&mut self, axis: Axis) {
        *self.slot(axis) = 0.0;
        self.known.remove(axis.flag());
    }

    /// Builder form of [`PrinterMove::set`]
    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    /// X position, if known
    pub fn x(&self) -> Option<f64> {
        self.get(Axis::X)
    }

    /// Y position, if known
    pub fn y(&self) -> Option<f64> {
        self.get(Axis::Y)
    }

    /// Z position, if known
    pub fn z(&self) -> Option<f64> {
        self.get(Axis::Z)
    }

    /// Extrusion amount, if known
    pub fn extrusion(&self) -> Option<f64> {
        self.get(Axis::E)
    }

    /// Feed rate, if known
    pub fn feed_rate(&self) -> Option<f64> {
        self.get(Axis::F)
    }

    /// Full position, only when X, Y and Z are all known
    pub fn position(&self) -> Option<Vector3> {
        self.position_fully_known().then_some(self.position)
    }

    /// Replace the position, marking X, Y and Z known
    pub fn with_position(mut self, position: Vector3) -> Self {
        self.position = position;
        self.known.insert(KnownAxes::POSITION);
        self
    }

    /// Overwrite every component `other` knows, leaving the rest untouched
    pub fn copy_known_settings(&mut self, other: &PrinterMove) {
        for axis in Axis::ALL {
            if let Some(value) = other.get(axis) {
                self.set(axis, value);
            }
        }
    }

    fn slot(&mut self, axis: Axis) -> &mut f64 {
        match axis {
            Axis::X => &mut self.position.x,
            Axis::Y => &mut self.position.y,
            Axis::Z => &mut self.position.z,
            Axis::E => &mut self.extrusion,
            Axis::F => &mut self.feed_rate,
        }
    }

    fn combine(self, rhs: PrinterMove, op: impl Fn(f64, f64) -> f64) -> PrinterMove {
        let mut out = PrinterMove::UNKNOWN;
        for axis in Axis::ALL {
            if let (Some(a), Some(b)) = (self.get(axis), rhs.get(axis)) {
                out.set(axis, op(a, b));
            }
        }
        out
    }
}

impl Sub for PrinterMove {
    type Output = PrinterMove;

    /// Component-wise difference; a component is known only if known on both sides
    fn sub(self, rhs: PrinterMove) -> PrinterMove {
        self.combine(rhs, |a, b| a - b)
    }
}

impl Add for PrinterMove {
    type Output = PrinterMove;

    /// Component-wise sum; a component is known only if known on both sides
    fn add(self, rhs: PrinterMove) -> PrinterMove {
        self.combine(rhs, |a, b| a + b)
    }
}

impl fmt::Display for PrinterMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, axis) in Axis::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match self.get(*axis) {
                Some(value) => write!(f, "{}:{}", axis.letter(), value)?,
                None => write!(f, "{}:?", axis.letter())?,
            }
        }
        Ok(())
    }
}
