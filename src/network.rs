use crate::optimizer::Adam;
use crate::param::{Network, OutputActivation};
use ndarray::{Array1, Array2, Axis};
use rand::distributions::Uniform;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Activation {
    /// max(alpha * z, z)
    LeakyRelu(f64),
    Linear,
}

impl Activation {
    pub fn forward(&self, z: &Array2<f64>) -> Array2<f64> {
        match *self {
            Activation::LeakyRelu(alpha) => z.mapv(|x| if x > 0.0 { x } else { alpha * x }),
            Activation::Linear => z.clone(),
        }
    }

    /// Derivative evaluated at the pre-activation values
    pub fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        match *self {
            Activation::LeakyRelu(alpha) => z.mapv(|x| if x > 0.0 { 1.0 } else { alpha }),
            Activation::Linear => Array2::ones(z.raw_dim()),
        }
    }
}

/// Fully connected layer computing activation(x . W + b) on a batch of row vectors.
#[derive(Clone, Debug)]
pub struct Dense {
    pub weights: Array2<f64>, // dim_in x dim_out
    pub bias: Array1<f64>,
    pub activation: Activation,
}

impl Dense {
    /// Glorot-uniform weights and zero bias
    pub fn new(dim_in: usize, dim_out: usize, activation: Activation, rng: &mut ChaCha8Rng) -> Dense {
        let limit = (6.0 / (dim_in + dim_out) as f64).sqrt();
        let distribution = Uniform::new(-limit, limit);
        Dense {
            weights: Array2::from_shape_fn((dim_in, dim_out), |_| rng.sample(distribution)),
            bias: Array1::zeros(dim_out),
            activation,
        }
    }

    pub fn dim_in(&self) -> usize {
        self.weights.nrows()
    }

    pub fn dim_out(&self) -> usize {
        self.weights.ncols()
    }

    fn pre_activation(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        self.activation.forward(&self.pre_activation(x))
    }
}

/// Loss gradient with respect to one layer's parameters.
#[derive(Clone, Debug)]
pub struct Gradients {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Mean over all entries of the squared differences
pub fn mean_squared_error(labels: &Array2<f64>, predictions: &Array2<f64>) -> f64 {
    let diff = predictions - labels;
    diff.iter().map(|d| d * d).sum::<f64>() / diff.len() as f64
}

/// Symmetric dense autoencoder: hidden encoder layers, a linear bottleneck, mirrored decoder
/// layers and an output layer as wide as the input.
#[derive(Clone, Debug)]
pub struct AutoEncoder {
    pub layers: Vec<Dense>,
    bottleneck: usize,
}

impl AutoEncoder {
    pub fn new(input_len: usize, network: &Network, rng: &mut ChaCha8Rng) -> AutoEncoder {
        let hidden = Activation::LeakyRelu(network.leaky_relu_alpha);
        let output = match network.output_activation {
            OutputActivation::leaky_relu => hidden,
            OutputActivation::linear => Activation::Linear,
        };

        let mut layers = Vec::new();
        let mut previous = input_len;

        for &width in &network.encoder_layers {
            layers.push(Dense::new(previous, width, hidden, rng));
            previous = width;
        }

        layers.push(Dense::new(previous, network.latent_size, Activation::Linear, rng));
        let bottleneck = layers.len() - 1;
        previous = network.latent_size;

        for &width in network.encoder_layers.iter().rev() {
            layers.push(Dense::new(previous, width, hidden, rng));
            previous = width;
        }

        layers.push(Dense::new(previous, input_len, output, rng));

        AutoEncoder { layers, bottleneck }
    }

    /// Layer widths from input to reconstruction
    pub fn widths(&self) -> Vec<usize> {
        std::iter::once(self.layers[0].dim_in())
            .chain(self.layers.iter().map(|layer| layer.dim_out()))
            .collect()
    }

    pub fn latent_size(&self) -> usize {
        self.layers[self.bottleneck].dim_out()
    }

    /// Bottleneck representation of every row of `x`
    pub fn encode(&self, x: &Array2<f64>) -> Array2<f64> {
        self.layers[..=self.bottleneck]
            .iter()
            .fold(x.clone(), |a, layer| layer.forward(&a))
    }

    pub fn reconstruct(&self, x: &Array2<f64>) -> Array2<f64> {
        self.layers.iter().fold(x.clone(), |a, layer| layer.forward(&a))
    }

    pub fn loss(&self, x: &Array2<f64>) -> f64 {
        mean_squared_error(x, &self.reconstruct(x))
    }

    /// Reconstruction loss of the batch and its gradient for every layer (backpropagation).
    pub fn gradients(&self, x: &Array2<f64>) -> (f64, Vec<Gradients>) {
        let mut inputs: Vec<Array2<f64>> = Vec::with_capacity(self.layers.len());
        let mut pre_activations: Vec<Array2<f64>> = Vec::with_capacity(self.layers.len());

        let mut a = x.clone();
        for layer in &self.layers {
            let z = layer.pre_activation(&a);
            let next = layer.activation.forward(&z);
            inputs.push(a);
            pre_activations.push(z);
            a = next;
        }

        let n = a.len() as f64;
        let diff = &a - x;
        let loss = diff.iter().map(|d| d * d).sum::<f64>() / n;

        let mut grad = diff * (2.0 / n);
        let mut gradients = Vec::with_capacity(self.layers.len());

        for (l, layer) in self.layers.iter().enumerate().rev() {
            let delta = &grad * &layer.activation.derivative(&pre_activations[l]);
            gradients.push(Gradients {
                weights: inputs[l].t().dot(&delta),
                bias: delta.sum_axis(Axis(0)),
            });
            if l > 0 {
                grad = delta.dot(&layer.weights.t());
            }
        }

        gradients.reverse();
        (loss, gradients)
    }

    /// One full-batch optimisation step; returns the loss measured before the update.
    pub fn train_step(&mut self, x: &Array2<f64>, optimizer: &mut Adam) -> Result<f64, String> {
        let (loss, gradients) = self.gradients(x);
        optimizer.update(&mut self.layers, &gradients)?;
        Ok(loss)
    }
}

impl fmt::Display for AutoEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<String> = self.widths().iter().map(|w| w.to_string()).collect();
        write!(f, "AutoEncoder [{}] (bottleneck {})", widths.join(" -> "), self.latent_size())
    }
}
