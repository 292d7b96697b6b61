use crate::error::{EnvError, EnvResult};

/// A dense observation tensor stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Observation {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> EnvResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(EnvError::ShapeMismatch { shape, expected, actual: data.len() });
        }
        Ok(Self { shape, data })
    }

    #[must_use]
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self { shape, data: vec![0.0; len] }
    }

    /// Stack equally shaped frames along a new leading axis, oldest first.
    pub fn stack<'a, I>(frames: I) -> EnvResult<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut frames = frames.into_iter();
        let first = frames
            .next()
            .ok_or_else(|| EnvError::InvalidConfig("cannot stack zero frames".to_string()))?;

        let mut data = first.data.clone();
        let mut depth = 1;
        for frame in frames {
            if frame.shape != first.shape {
                return Err(EnvError::FrameShapeMismatch {
                    expected: first.shape.clone(),
                    actual: frame.shape.clone(),
                });
            }
            data.extend_from_slice(&frame.data);
            depth += 1;
        }

        let mut shape = Vec::with_capacity(first.shape.len() + 1);
        shape.push(depth);
        shape.extend_from_slice(&first.shape);
        Ok(Self { shape, data })
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Slice of the `index`-th entry along the leading axis.
    #[must_use]
    pub fn outer(&self, index: usize) -> Option<&[f32]> {
        let (&outer, inner) = self.shape.split_first()?;
        if index >= outer {
            return None;
        }
        let stride: usize = inner.iter().product();
        Some(&self.data[index * stride..(index + 1) * stride])
    }

    #[must_use]
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self { shape: self.shape.clone(), data: self.data.iter().copied().map(f).collect() }
    }

    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = Observation::new(vec![2, 2], vec![0.0; 3]).unwrap_err();
        assert_eq!(err, EnvError::ShapeMismatch { shape: vec![2, 2], expected: 4, actual: 3 });
    }

    #[test]
    fn test_stack_orders_oldest_first() {
        let a = Observation::new(vec![2], vec![1.0, 2.0]).unwrap();
        let b = Observation::new(vec![2], vec![3.0, 4.0]).unwrap();
        let stacked = Observation::stack([&a, &b]).unwrap();
        assert_eq!(stacked.shape(), &[2, 2]);
        assert_eq!(stacked.outer(0), Some(&[1.0, 2.0][..]));
        assert_eq!(stacked.outer(1), Some(&[3.0, 4.0][..]));
        assert_eq!(stacked.outer(2), None);
    }

    #[test]
    fn test_stack_rejects_mismatched_frames() {
        let a = Observation::zeros(vec![2]);
        let b = Observation::zeros(vec![3]);
        assert!(Observation::stack([&a, &b]).is_err());
    }

    #[test]
    fn test_stack_mismatch_reports_shapes() {
        // Same element count, different layout.
        let a = Observation::zeros(vec![2, 3]);
        let b = Observation::zeros(vec![3, 2]);
        let err = Observation::stack([&a, &a, &b]).unwrap_err();
        assert_eq!(err, EnvError::FrameShapeMismatch { expected: vec![2, 3], actual: vec![3, 2] });
        assert!(err.to_string().contains("[3, 2]"));
    }

    #[test]
    fn test_stack_empty_is_error() {
        assert!(Observation::stack(std::iter::empty::<&Observation>()).is_err());
    }
}
