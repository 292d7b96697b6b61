use serde::{Deserialize, Serialize};

/// A finite set of actions `{0, 1, ..., n - 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrete {
    pub n: usize,
}

impl Discrete {
    #[must_use]
    pub const fn new(n: usize) -> Self {
        Self { n }
    }

    #[must_use]
    pub const fn contains(&self, action: usize) -> bool {
        action < self.n
    }
}

/// A bounded box of real values with a fixed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub shape: Vec<usize>,
    pub low: f32,
    pub high: f32,
}

impl BoxSpace {
    #[must_use]
    pub fn new(shape: Vec<usize>, low: f32, high: f32) -> Self {
        Self { shape, low, high }
    }

    /// Number of scalar elements in one observation.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// The same bounds with `depth` prepended to the shape.
    #[must_use]
    pub fn stacked(&self, depth: usize) -> Self {
        let mut shape = Vec::with_capacity(self.shape.len() + 1);
        shape.push(depth);
        shape.extend_from_slice(&self.shape);
        Self { shape, low: self.low, high: self.high }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_contains() {
        let space = Discrete::new(15);
        assert!(space.contains(0));
        assert!(space.contains(14));
        assert!(!space.contains(15));
    }

    #[test]
    fn test_box_stacked_prepends_depth() {
        let space = BoxSpace::new(vec![64, 64, 3], 0.0, 255.0);
        let stacked = space.stacked(4);
        assert_eq!(stacked.shape, vec![4, 64, 64, 3]);
        assert_eq!(stacked.size(), 4 * space.size());
        assert!((stacked.high - 255.0).abs() < f32::EPSILON);
    }
}
