//! Single LSTM layer with manual forward caching and backpropagation.
//!
//! Standard 4-gate formulation over the concatenated input `z = [x; h_prev]`:
//!
//! ```text
//! i = sigmoid(W_i z + b_i)      input gate
//! f = sigmoid(W_f z + b_f)      forget gate
//! g = tanh(W_g z + b_g)         cell candidate
//! o = sigmoid(W_o z + b_o)      output gate
//! c = f * c_prev + i * g
//! h = o * tanh(c)
//! ```
//!
//! Weights are stored flat as `[4H x (I+H)]` row-major with gate rows in
//! i/f/g/o order, mirroring how the gradient accumulator and the optimizer's
//! flat parameter vector are laid out.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// One LSTM layer's weights and biases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    pub input_dim: usize,
    pub hidden_dim: usize,
    /// Gate weights, `[4H x (I+H)]` row-major, gate order i/f/g/o.
    pub w: Vec<f64>,
    /// Gate biases, `[4H]`, same gate order.
    pub b: Vec<f64>,
}

/// Everything the backward pass needs from one forward step.
#[derive(Debug, Clone)]
pub struct StepCache {
    /// Concatenated `[x; h_prev]`, length `I+H`.
    pub z: Vec<f64>,
    pub c_prev: Vec<f64>,
    pub i: Vec<f64>,
    pub f: Vec<f64>,
    pub g: Vec<f64>,
    pub o: Vec<f64>,
    pub tanh_c: Vec<f64>,
    /// New hidden state.
    pub h: Vec<f64>,
    /// New cell state.
    pub c: Vec<f64>,
}

/// Gradient accumulator matching one layer's weight layout.
#[derive(Debug, Clone)]
pub struct LayerGrads {
    pub d_w: Vec<f64>,
    pub d_b: Vec<f64>,
}

impl LayerGrads {
    pub fn zeros(layer: &LstmLayer) -> Self {
        Self {
            d_w: vec![0.0; layer.w.len()],
            d_b: vec![0.0; layer.b.len()],
        }
    }
}

impl LstmLayer {
    /// Xavier-style uniform initialization; forget-gate biases start at 1.0
    /// so early training does not wipe the cell state.
    pub fn init(input_dim: usize, hidden_dim: usize, rng: &mut StdRng) -> Self {
        let cols = input_dim + hidden_dim;
        let std = (2.0 / (cols + hidden_dim) as f64).sqrt();

        let w: Vec<f64> = (0..4 * hidden_dim * cols)
            .map(|_| rng.gen::<f64>() * 2.0 * std - std)
            .collect();

        let mut b = vec![0.0; 4 * hidden_dim];
        for k in hidden_dim..2 * hidden_dim {
            b[k] = 1.0; // forget gate rows
        }

        Self {
            input_dim,
            hidden_dim,
            w,
            b,
        }
    }

    pub fn num_params(&self) -> usize {
        self.w.len() + self.b.len()
    }

    /// One forward step. `x` has length `input_dim`, `h_prev`/`c_prev` have
    /// length `hidden_dim`. The returned cache holds the new `h` and `c`.
    pub fn forward_step(&self, x: &[f64], h_prev: &[f64], c_prev: &[f64]) -> StepCache {
        let hd = self.hidden_dim;
        let cols = self.input_dim + hd;

        let mut z = Vec::with_capacity(cols);
        z.extend_from_slice(x);
        z.extend_from_slice(h_prev);

        // Pre-activations for all four gates
        let mut pre = self.b.clone();
        for (row, pre_k) in pre.iter_mut().enumerate() {
            let w_row = &self.w[row * cols..(row + 1) * cols];
            let mut acc = 0.0;
            for (w_kj, z_j) in w_row.iter().zip(z.iter()) {
                acc += w_kj * z_j;
            }
            *pre_k += acc;
        }

        let mut i = vec![0.0; hd];
        let mut f = vec![0.0; hd];
        let mut g = vec![0.0; hd];
        let mut o = vec![0.0; hd];
        let mut c = vec![0.0; hd];
        let mut tanh_c = vec![0.0; hd];
        let mut h = vec![0.0; hd];

        for k in 0..hd {
            i[k] = sigmoid(pre[k]);
            f[k] = sigmoid(pre[hd + k]);
            g[k] = pre[2 * hd + k].tanh();
            o[k] = sigmoid(pre[3 * hd + k]);
            c[k] = f[k] * c_prev[k] + i[k] * g[k];
            tanh_c[k] = c[k].tanh();
            h[k] = o[k] * tanh_c[k];
        }

        StepCache {
            z,
            c_prev: c_prev.to_vec(),
            i,
            f,
            g,
            o,
            tanh_c,
            h,
            c,
        }
    }

    /// Backward through one cached step.
    ///
    /// `d_h` is the loss gradient w.r.t. this step's hidden output (already
    /// summed over every consumer), `d_c_in` the gradient carried back from
    /// the next timestep's cell state. Accumulates weight gradients into
    /// `grads` and returns `(d_x, d_h_prev, d_c_prev)`.
    pub fn backward_step(
        &self,
        cache: &StepCache,
        d_h: &[f64],
        d_c_in: &[f64],
        grads: &mut LayerGrads,
    ) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let hd = self.hidden_dim;
        let cols = self.input_dim + hd;

        let mut d_z = vec![0.0; cols];
        let mut d_c_prev = vec![0.0; hd];

        for k in 0..hd {
            let tanh_c = cache.tanh_c[k];
            let d_o = d_h[k] * tanh_c;
            let d_c = d_c_in[k] + d_h[k] * cache.o[k] * (1.0 - tanh_c * tanh_c);

            let d_i = d_c * cache.g[k];
            let d_f = d_c * cache.c_prev[k];
            let d_g = d_c * cache.i[k];
            d_c_prev[k] = d_c * cache.f[k];

            // Pre-activation gradients through the gate nonlinearities
            let d_pre = [
                d_i * cache.i[k] * (1.0 - cache.i[k]),
                d_f * cache.f[k] * (1.0 - cache.f[k]),
                d_g * (1.0 - cache.g[k] * cache.g[k]),
                d_o * cache.o[k] * (1.0 - cache.o[k]),
            ];

            for (gate, dp) in d_pre.iter().enumerate() {
                let row = gate * hd + k;
                grads.d_b[row] += dp;
                let base = row * cols;
                for j in 0..cols {
                    grads.d_w[base + j] += dp * cache.z[j];
                    d_z[j] += self.w[base + j] * dp;
                }
            }
        }

        let d_x = d_z[..self.input_dim].to_vec();
        let d_h_prev = d_z[self.input_dim..].to_vec();
        (d_x, d_h_prev, d_c_prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn layer(input: usize, hidden: usize, seed: u64) -> LstmLayer {
        let mut rng = StdRng::seed_from_u64(seed);
        LstmLayer::init(input, hidden, &mut rng)
    }

    #[test]
    fn test_init_shapes_and_forget_bias() {
        let l = layer(3, 8, 42);
        assert_eq!(l.w.len(), 4 * 8 * (3 + 8));
        assert_eq!(l.b.len(), 32);
        // Forget gate biases at 1.0, others at 0.0
        assert!(l.b[..8].iter().all(|&v| v == 0.0));
        assert!(l.b[8..16].iter().all(|&v| (v - 1.0).abs() < 1e-12));
        assert!(l.b[16..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_forward_step_is_deterministic_and_bounded() {
        let l = layer(2, 4, 7);
        let x = [0.5, -0.3];
        let h = vec![0.0; 4];
        let c = vec![0.0; 4];

        let a = l.forward_step(&x, &h, &c);
        let b = l.forward_step(&x, &h, &c);
        assert_eq!(a.h, b.h);
        assert_eq!(a.c, b.c);
        // |h| <= 1 since h = sigmoid * tanh
        assert!(a.h.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn test_backward_gradient_matches_finite_difference() {
        let mut l = layer(2, 3, 99);
        let x = [0.4, -0.2];
        let h_prev = vec![0.1, -0.1, 0.05];
        let c_prev = vec![0.02, 0.0, -0.03];

        // Loss = sum(h) so d_h = ones
        let cache = l.forward_step(&x, &h_prev, &c_prev);
        let d_h = vec![1.0; 3];
        let d_c = vec![0.0; 3];
        let mut grads = LayerGrads::zeros(&l);
        l.backward_step(&cache, &d_h, &d_c, &mut grads);

        // Check a handful of weight gradients numerically
        let eps = 1e-6;
        for &idx in &[0usize, 7, 23, 41] {
            let orig = l.w[idx];
            l.w[idx] = orig + eps;
            let plus: f64 = l.forward_step(&x, &h_prev, &c_prev).h.iter().sum();
            l.w[idx] = orig - eps;
            let minus: f64 = l.forward_step(&x, &h_prev, &c_prev).h.iter().sum();
            l.w[idx] = orig;

            let numeric = (plus - minus) / (2.0 * eps);
            assert!(
                (grads.d_w[idx] - numeric).abs() < 1e-5,
                "grad mismatch at {idx}: analytic {} vs numeric {numeric}",
                grads.d_w[idx]
            );
        }
    }
}
