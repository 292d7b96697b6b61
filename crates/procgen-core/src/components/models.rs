//! Convolutional vision network.
//!
//! Builds the layer plan for `config.model.conv_filters` against an
//! observation shape: every layer uses "same" padding except the last, which
//! uses "valid". The flattened features feed a logits head and a value head.

use procgen_training::{ConvFilter, LaunchError, LaunchResult, ModelConfig, PolicyModel};
use tracing::debug;

/// Class name the component bundles provide.
pub const VISION_NETWORK_CLASS: &str = "MyVisionNetwork";

/// One planned convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvLayer {
    pub in_channels: usize,
    pub filter: ConvFilter,
    /// `[height, width, channels]` after the layer.
    pub output: [usize; 3],
}

impl ConvLayer {
    #[must_use]
    pub fn num_params(&self) -> usize {
        let [kh, kw] = self.filter.kernel();
        let out = self.filter.out_channels() as usize;
        kh as usize * kw as usize * self.in_channels * out + out
    }
}

#[derive(Debug, Clone)]
pub struct MyVisionNetwork {
    layers: Vec<ConvLayer>,
    feature_shape: Vec<usize>,
    num_outputs: usize,
    num_params: usize,
}

/// `[H, W, C]` as is; `[D, H, W, C]` stacks frames into `D * C` channels.
fn input_dims(obs_shape: &[usize]) -> LaunchResult<[usize; 3]> {
    match *obs_shape {
        [h, w, c] => Ok([h, w, c]),
        [d, h, w, c] => Ok([h, w, d * c]),
        _ => Err(LaunchError::Model(format!(
            "expected an [H, W, C] or [D, H, W, C] observation, got {obs_shape:?}"
        ))),
    }
}

impl MyVisionNetwork {
    pub fn build(obs_shape: &[usize], num_outputs: usize, config: &ModelConfig) -> LaunchResult<Self> {
        if config.conv_filters.is_empty() {
            return Err(LaunchError::Model("conv_filters must not be empty".to_string()));
        }
        if num_outputs == 0 {
            return Err(LaunchError::Model("num_outputs must be >= 1".to_string()));
        }

        let [mut h, mut w, mut c] = input_dims(obs_shape)?;
        let last = config.conv_filters.len() - 1;
        let mut layers = Vec::with_capacity(config.conv_filters.len());

        for (i, filter) in config.conv_filters.iter().enumerate() {
            let [kh, kw] = filter.kernel();
            let (kh, kw, stride) = (kh as usize, kw as usize, filter.stride() as usize);
            let out_c = filter.out_channels() as usize;
            if kh == 0 || kw == 0 || stride == 0 || out_c == 0 {
                return Err(LaunchError::Model(format!("layer {i}: kernel, stride and channels must be >= 1")));
            }

            let (oh, ow) = if i == last {
                if h < kh || w < kw {
                    return Err(LaunchError::Model(format!(
                        "layer {i}: kernel {kh}x{kw} does not fit input {h}x{w}"
                    )));
                }
                ((h - kh) / stride + 1, (w - kw) / stride + 1)
            } else {
                (h.div_ceil(stride), w.div_ceil(stride))
            };
            if oh == 0 || ow == 0 {
                return Err(LaunchError::Model(format!("layer {i}: output is empty")));
            }

            layers.push(ConvLayer { in_channels: c, filter: *filter, output: [oh, ow, out_c] });
            (h, w, c) = (oh, ow, out_c);
        }

        let flat = h * w * c;
        let conv_params: usize = layers.iter().map(ConvLayer::num_params).sum();
        let logits_params = flat * num_outputs + num_outputs;
        let value_params = flat + 1;
        let num_params = conv_params + logits_params + value_params;

        debug!(?obs_shape, features = ?[h, w, c], num_params, "Built vision network");
        Ok(Self { layers, feature_shape: vec![h, w, c], num_outputs, num_params })
    }

    #[must_use]
    pub fn layers(&self) -> &[ConvLayer] {
        &self.layers
    }
}

impl PolicyModel for MyVisionNetwork {
    fn name(&self) -> &str {
        VISION_NETWORK_CLASS
    }

    fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    fn num_params(&self) -> usize {
        self.num_params
    }

    fn feature_shape(&self) -> &[usize] {
        &self.feature_shape
    }
}
