//! Small convolutional classifier evaluated with Candle

use candle_core::{Device, Tensor, D};
use candle_nn::{Conv2d, Conv2dConfig, Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};

/// Pixel scaling applied before the first convolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preprocess {
    /// Keep 0..255
    #[default]
    Raw,
    /// Scale to 0..1
    UnitScale,
    /// Scale to -1..1
    MobilenetV2,
}

impl Preprocess {
    pub fn apply(self, px: u8) -> f32 {
        let x = f32::from(px);
        match self {
            Self::Raw => x,
            Self::UnitScale => x / 255.0,
            Self::MobilenetV2 => x / 127.5 - 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvBlockConfig {
    pub out_channels: usize,
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,
}

/// Architecture description stored next to the weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnnConfig {
    #[serde(default)]
    pub version: Option<String>,

    /// Square input resolution
    #[serde(default = "default_input_size")]
    pub input_size: usize,

    #[serde(default = "default_channels")]
    pub channels: usize,

    #[serde(default)]
    pub preprocess: Preprocess,

    pub conv_blocks: Vec<ConvBlockConfig>,

    /// Optional dense layer between pooling and the classifier
    #[serde(default)]
    pub hidden: Option<usize>,

    pub num_classes: usize,
}

impl CnnConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.num_classes == 0 {
            return Err("num_classes must be positive".to_string());
        }
        if self.channels == 0 {
            return Err("channels must be positive".to_string());
        }
        if let Some(block) = self.conv_blocks.iter().find(|b| b.kernel_size % 2 == 0) {
            return Err(format!("kernel_size {} must be odd", block.kernel_size));
        }
        // Each block halves the resolution
        let min_size = u32::try_from(self.conv_blocks.len())
            .ok()
            .and_then(|blocks| 1usize.checked_shl(blocks))
            .ok_or_else(|| format!("too many pooling blocks ({})", self.conv_blocks.len()))?;
        if self.input_size < min_size {
            return Err(format!(
                "input_size {} too small for {} pooling blocks",
                self.input_size,
                self.conv_blocks.len()
            ));
        }
        Ok(())
    }
}

fn default_kernel_size() -> usize {
    3
}

fn default_input_size() -> usize {
    224
}

fn default_channels() -> usize {
    3
}

/// conv -> relu -> 2x2 max-pool blocks, global average pooling,
/// optional dense + relu, dense classifier, softmax
pub struct ImageCnn {
    blocks: Vec<Conv2d>,
    hidden: Option<Linear>,
    classifier: Linear,
    device: Device,
}

impl ImageCnn {
    /// Build the network, reading (or creating) weights through `vb`.
    ///
    /// Weight names: `features.{i}.{weight,bias}`, `hidden.*`, `classifier.*`.
    pub fn new(config: &CnnConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let mut blocks = Vec::with_capacity(config.conv_blocks.len());
        let mut in_channels = config.channels;

        for (i, block) in config.conv_blocks.iter().enumerate() {
            let conv_config = Conv2dConfig {
                padding: block.kernel_size / 2,
                ..Default::default()
            };
            blocks.push(candle_nn::conv2d(
                in_channels,
                block.out_channels,
                block.kernel_size,
                conv_config,
                vb.pp(format!("features.{}", i)),
            )?);
            in_channels = block.out_channels;
        }

        let hidden = match config.hidden {
            Some(width) => {
                let layer = candle_nn::linear(in_channels, width, vb.pp("hidden"))?;
                in_channels = width;
                Some(layer)
            }
            None => None,
        };

        let classifier = candle_nn::linear(in_channels, config.num_classes, vb.pp("classifier"))?;

        Ok(Self {
            blocks,
            hidden,
            classifier,
            device: vb.device().clone(),
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Class probabilities for a `[batch, height, width, channels]` input
    pub fn forward(&self, pixels: &Tensor) -> candle_core::Result<Tensor> {
        let mut x = pixels.permute((0, 3, 1, 2))?.contiguous()?;

        for conv in &self.blocks {
            x = conv.forward(&x)?.relu()?.max_pool2d(2)?;
        }

        let mut x = x.mean((2, 3))?;
        if let Some(hidden) = &self.hidden {
            x = hidden.forward(&x)?.relu()?;
        }

        let logits = self.classifier.forward(&x)?;
        candle_nn::ops::softmax(&logits, D::Minus1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn config() -> CnnConfig {
        serde_json::from_str(
            r#"{"input_size": 8, "conv_blocks": [{"out_channels": 4}, {"out_channels": 6}], "hidden": 5, "num_classes": 3}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = config();
        assert_eq!(config.channels, 3);
        assert_eq!(config.conv_blocks[0].kernel_size, 3);
        assert_eq!(config.preprocess, Preprocess::Raw);
        assert!(config.validate().is_ok());

        let mut tiny = config.clone();
        tiny.input_size = 2;
        assert!(tiny.validate().is_err());

        let mut even = config;
        even.conv_blocks[0].kernel_size = 4;
        assert!(even.validate().is_err());
    }

    #[test]
    fn test_block_count_past_word_size_is_rejected() {
        let mut deep = config();
        let block = deep.conv_blocks[0].clone();
        for count in [usize::BITS as usize, 200] {
            deep.conv_blocks = vec![block.clone(); count];
            let err = deep.validate().unwrap_err();
            assert!(err.contains("too many pooling blocks"), "{err}");
        }
    }

    #[test]
    fn test_forward_produces_distribution() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = ImageCnn::new(&config(), vb).unwrap();

        let input = Tensor::ones((1, 8, 8, 3), DType::F32, &Device::Cpu).unwrap();
        let probs = model
            .forward(&input)
            .unwrap()
            .squeeze(0)
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        assert_eq!(probs.len(), 3);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_preprocess() {
        assert_eq!(Preprocess::Raw.apply(255), 255.0);
        assert_eq!(Preprocess::UnitScale.apply(255), 1.0);
        assert_eq!(Preprocess::MobilenetV2.apply(0), -1.0);
    }
}
