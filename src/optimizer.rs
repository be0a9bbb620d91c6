use crate::network::{Dense, Gradients};
use crate::param::Training;
use ndarray::{Array, Array1, Array2, Dimension, Zip};

/// First and second moment estimates of one layer.
#[derive(Clone, Debug)]
struct Moments {
    weights_m: Array2<f64>,
    weights_v: Array2<f64>,
    bias_m: Array1<f64>,
    bias_v: Array1<f64>,
}

#[derive(Clone, Debug)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    beta1_t: f64,
    beta2_t: f64,
    epsilon: f64,
    moments: Vec<Moments>,
}

impl Adam {
    /// Creates a new `Adam` optimizer holding one pair of moment estimates per parameter of `layers`.
    ///
    /// # Arguments
    /// * `layers` - The layers this instance will update, in order.
    /// * `training` - Learning rate, `beta1`, `beta2` and `epsilon`.
    pub fn new(layers: &[Dense], training: &Training) -> Self {
        let moments = layers
            .iter()
            .map(|layer| Moments {
                weights_m: Array2::zeros(layer.weights.raw_dim()),
                weights_v: Array2::zeros(layer.weights.raw_dim()),
                bias_m: Array1::zeros(layer.bias.raw_dim()),
                bias_v: Array1::zeros(layer.bias.raw_dim()),
            })
            .collect();

        Self {
            learning_rate: training.learning_rate,
            beta1: training.beta1,
            beta2: training.beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            epsilon: training.epsilon,
            moments,
        }
    }

    pub fn update(&mut self, layers: &mut [Dense], gradients: &[Gradients]) -> Result<(), String> {
        if layers.len() != self.moments.len() || gradients.len() != layers.len() {
            return Err(format!(
                "Size mismatch: {} layers, {} gradients, {} moment estimates",
                layers.len(), gradients.len(), self.moments.len()
            ));
        }
        for (layer, grad) in layers.iter().zip(gradients) {
            if layer.weights.dim() != grad.weights.dim() || layer.bias.dim() != grad.bias.dim() {
                return Err(format!(
                    "Size mismatch: layer {:?} receives weight gradient {:?}",
                    layer.weights.dim(), grad.weights.dim()
                ));
            }
        }

        self.beta1_t *= self.beta1;
        self.beta2_t *= self.beta2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = self.learning_rate * (bc2.sqrt() / bc1);

        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        for ((layer, grad), moments) in layers.iter_mut().zip(gradients).zip(self.moments.iter_mut()) {
            adam_step(&mut layer.weights, &grad.weights, &mut moments.weights_m, &mut moments.weights_v, step_size, b1, b2, eps);
            adam_step(&mut layer.bias, &grad.bias, &mut moments.bias_m, &mut moments.bias_v, step_size, b1, b2, eps);
        }

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn adam_step<D: Dimension>(
    params: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    step_size: f64,
    b1: f64,
    b2: f64,
    eps: f64,
) {
    Zip::from(params)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = b1 * *m + (1. - b1) * g;
            *v = b2 * *v + (1. - b2) * g.powi(2);
            *p -= step_size * *m / (v.sqrt() + eps);
        });
}
