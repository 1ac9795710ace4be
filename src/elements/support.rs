//! Support conditions

use serde::{Deserialize, Serialize};

/// Fixity of the six degrees of freedom at a supported vertex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Support {
    /// Restrained in X translation
    pub dx: bool,
    /// Restrained in Y translation
    pub dy: bool,
    /// Restrained in Z translation
    pub dz: bool,
    /// Restrained in X rotation
    pub rx: bool,
    /// Restrained in Y rotation
    pub ry: bool,
    /// Restrained in Z rotation
    pub rz: bool,
}

impl Support {
    /// Create a new support with no restraints
    pub fn new() -> Self {
        Self::default()
    }

    /// All DOFs restrained
    pub fn fixed() -> Self {
        Self::from_dofs([true; 6])
    }

    /// Translations restrained, rotations free
    pub fn pinned() -> Self {
        Self::from_dofs([true, true, true, false, false, false])
    }

    /// Only vertical translation restrained
    pub fn roller_z() -> Self {
        Self::from_dofs([false, false, true, false, false, false])
    }

    pub fn from_dofs(dofs: [bool; 6]) -> Self {
        let [dx, dy, dz, rx, ry, rz] = dofs;
        Self {
            dx,
            dy,
            dz,
            rx,
            ry,
            rz,
        }
    }

    /// Fixity flags in DOF order [DX, DY, DZ, RX, RY, RZ]
    pub fn dofs(&self) -> [bool; 6] {
        [self.dx, self.dy, self.dz, self.rx, self.ry, self.rz]
    }

    /// A support without any restraint is no support at all
    pub fn is_free(&self) -> bool {
        !self.dofs().iter().any(|&d| d)
    }
}
