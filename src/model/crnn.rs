//! Convolutional-recurrent word classifier
//!
//! Three conv/pool stages reduce a 64x256 grayscale word image to an 8x32
//! feature map, which is then read as a sequence of 32 column vectors (one
//! per reduced-width position, height and channels flattened together). A
//! bidirectional LSTM consumes that sequence left to right and right to
//! left, and the two directions' final states drive a small fully connected
//! head with one output per vocabulary class.
//!
//! This is whole-word classification over a closed vocabulary, not
//! open-vocabulary sequence decoding: the recurrence captures stroke order
//! without requiring per-character segmentation.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BiLstm, BiLstmConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::model::config::CrnnConfig;

/// A convolution stage: 3x3 same-padding conv, ReLU, 2x2 max pool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    relu: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new convolutional block
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            relu: Relu::new(),
            pool,
        }
    }

    /// Forward pass, halving both spatial dimensions
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Handwritten word classifier
#[derive(Module, Debug)]
pub struct Crnn<B: Backend> {
    conv1: ConvBlock<B>,
    conv2: ConvBlock<B>,
    conv3: ConvBlock<B>,

    rnn: BiLstm<B>,

    fc1: Linear<B>,
    dropout: Dropout,
    fc2: Linear<B>,

    num_classes: usize,
    rnn_hidden: usize,
}

impl<B: Backend> Crnn<B> {
    /// Create a new classifier from configuration
    pub fn new(config: &CrnnConfig, device: &B::Device) -> Self {
        let [f1, f2, f3] = config.conv_filters;

        let conv1 = ConvBlock::new(1, f1, config.kernel_size, device);
        let conv2 = ConvBlock::new(f1, f2, config.kernel_size, device);
        let conv3 = ConvBlock::new(f2, f3, config.kernel_size, device);

        let rnn = BiLstmConfig::new(config.features_per_step(), config.rnn_hidden, true)
            .init(device);

        let fc1 = LinearConfig::new(2 * config.rnn_hidden, config.fc_units).init(device);
        let dropout = DropoutConfig::new(config.dropout).init();
        let fc2 = LinearConfig::new(config.fc_units, config.num_classes).init(device);

        Self {
            conv1,
            conv2,
            conv3,
            rnn,
            fc1,
            dropout,
            fc2,
            num_classes: config.num_classes,
            rnn_hidden: config.rnn_hidden,
        }
    }

    /// Forward pass producing logits.
    ///
    /// # Arguments
    /// * `images` - Input tensor of shape [batch_size, 1, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        // Convolutional feature extraction: [B, 1, H, W] -> [B, C, H/8, W/8]
        let x = self.conv1.forward(images);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);

        // Reinterpret columns as timesteps: [B, C, H', W'] -> [B, W', H' * C]
        let [batch, channels, height, width] = x.dims();
        let x = x.permute([0, 3, 2, 1]);
        let x = x.reshape([batch, width, height * channels]);

        // Bidirectional pass over the column sequence
        let (seq, _state) = self.rnn.forward(x, None);
        let [_, steps, _] = seq.dims();
        let hidden = self.rnn_hidden;

        // Each direction's final state: the forward direction finishes at the
        // last column, the backward direction at the first.
        let fw = seq
            .clone()
            .slice([0..batch, (steps - 1)..steps, 0..hidden])
            .reshape([batch, hidden]);
        let bw = seq
            .slice([0..batch, 0..1, hidden..2 * hidden])
            .reshape([batch, hidden]);
        let x = Tensor::cat(vec![fw, bw], 1);

        // Classifier head
        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with softmax, for inference
    pub fn forward_probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(images);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    /// Downscaled geometry so the forward pass stays cheap in tests
    fn tiny_config(num_classes: usize) -> CrnnConfig {
        let mut config = CrnnConfig::new(num_classes);
        config.img_height = 16;
        config.img_width = 32;
        config.conv_filters = [4, 8, 16];
        config.rnn_hidden = 8;
        config.fc_units = 16;
        config
    }

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let config = tiny_config(7);
        let model = Crnn::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros(
            [3, 1, config.img_height, config.img_width],
            &device,
        );
        let output = model.forward(input);

        assert_eq!(output.dims(), [3, 7]);
    }

    #[test]
    fn test_probabilities_form_a_distribution() {
        let device = Default::default();
        let config = tiny_config(5);
        let model = Crnn::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::random(
            [4, 1, config.img_height, config.img_width],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let probs = model.forward_probabilities(input);
        assert_eq!(probs.dims(), [4, 5]);

        let values: Vec<f32> = probs.into_data().to_vec().unwrap();
        for row in values.chunks(5) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "row sums to {}", sum);
            assert!(row.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_inference_is_deterministic() {
        // Dropout must not fire outside of autodiff training
        let device = Default::default();
        let config = tiny_config(4);
        let model = Crnn::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::random(
            [2, 1, config.img_height, config.img_width],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );

        let a: Vec<f32> = model
            .forward_probabilities(input.clone())
            .into_data()
            .to_vec()
            .unwrap();
        let b: Vec<f32> = model
            .forward_probabilities(input)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_num_classes_accessor() {
        let device = Default::default();
        let model = Crnn::<TestBackend>::new(&tiny_config(11), &device);
        assert_eq!(model.num_classes(), 11);
    }
}
