//! Sequence-to-sequence LSTM autoencoder for reconstruction-based anomaly
//! scoring.
//!
//! The encoder consumes a `(seq_len, features)` window and compresses it into
//! its final hidden/cell states. The decoder replays the encoder's top hidden
//! state as its input at every timestep (initial states seeded from the
//! encoder's finals per layer) and a linear projection maps each decoded
//! hidden vector back to feature space, so output shape equals input shape.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::model::lstm::{LstmLayer, StepCache};
use crate::model::Window;

/// LSTM autoencoder: stacked encoder, stacked decoder, linear output head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmAutoencoder {
    pub(crate) encoder: Vec<LstmLayer>,
    pub(crate) decoder: Vec<LstmLayer>,
    /// Output projection, `[F x H]` row-major.
    pub(crate) w_out: Vec<f64>,
    pub(crate) b_out: Vec<f64>,
    input_dim: usize,
    hidden_dim: usize,
}

/// Full forward trace kept for backpropagation: per-layer, per-timestep
/// caches for encoder and decoder plus the reconstruction itself.
#[derive(Debug)]
pub struct ForwardTrace {
    /// Encoder caches indexed `[layer][t]`.
    pub enc: Vec<Vec<StepCache>>,
    /// Decoder caches indexed `[layer][t]`.
    pub dec: Vec<Vec<StepCache>>,
    /// Encoder top hidden state replicated as decoder input.
    pub repr: Vec<f64>,
    pub recon: Window,
}

impl LstmAutoencoder {
    /// Deterministic initialization from config dimensions and a seed.
    pub fn new(cfg: &ModelConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (i_dim, h_dim, layers) = (cfg.input_dim, cfg.hidden_dim, cfg.num_layers);

        let encoder: Vec<LstmLayer> = (0..layers)
            .map(|l| LstmLayer::init(if l == 0 { i_dim } else { h_dim }, h_dim, &mut rng))
            .collect();
        let decoder: Vec<LstmLayer> = (0..layers)
            .map(|_| LstmLayer::init(h_dim, h_dim, &mut rng))
            .collect();

        let out_std = (2.0 / (h_dim + i_dim) as f64).sqrt();
        let w_out: Vec<f64> = (0..i_dim * h_dim)
            .map(|_| rng.gen::<f64>() * 2.0 * out_std - out_std)
            .collect();
        let b_out = vec![0.0; i_dim];

        Self {
            encoder,
            decoder,
            w_out,
            b_out,
            input_dim: i_dim,
            hidden_dim: h_dim,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn num_layers(&self) -> usize {
        self.encoder.len()
    }

    /// Total number of trainable parameters.
    pub fn num_params(&self) -> usize {
        self.encoder
            .iter()
            .chain(self.decoder.iter())
            .map(LstmLayer::num_params)
            .sum::<usize>()
            + self.w_out.len()
            + self.b_out.len()
    }

    /// Reconstruct a window. Inference path: deterministic, no mutation.
    pub fn forward(&self, window: &Window) -> Window {
        self.forward_cached(window).recon
    }

    /// Reconstruct a window keeping the full trace for backpropagation.
    ///
    /// The window must be non-empty with `input_dim` features per row; the
    /// extraction/validation layers upstream guarantee this.
    pub fn forward_cached(&self, window: &Window) -> ForwardTrace {
        let seq_len = window.len();
        let layers = self.encoder.len();
        let h_dim = self.hidden_dim;

        debug_assert!(seq_len > 0, "model must never see a zero-length window");

        // ====================================================================
        // Encoder: run the window through the stack, layer inputs cascading
        // ====================================================================
        let mut enc: Vec<Vec<StepCache>> = (0..layers).map(|_| Vec::with_capacity(seq_len)).collect();
        let mut h: Vec<Vec<f64>> = vec![vec![0.0; h_dim]; layers];
        let mut c: Vec<Vec<f64>> = vec![vec![0.0; h_dim]; layers];

        for row in window {
            let mut x = row.clone();
            for (l, layer) in self.encoder.iter().enumerate() {
                let cache = layer.forward_step(&x, &h[l], &c[l]);
                h[l] = cache.h.clone();
                c[l] = cache.c.clone();
                x = cache.h.clone();
                enc[l].push(cache);
            }
        }

        let repr = h[layers - 1].clone();

        // ====================================================================
        // Decoder: replay repr at every step, states seeded from encoder
        // ====================================================================
        let mut dec: Vec<Vec<StepCache>> = (0..layers).map(|_| Vec::with_capacity(seq_len)).collect();
        let mut h_d = h;
        let mut c_d = c;
        let mut recon = Vec::with_capacity(seq_len);

        for _ in 0..seq_len {
            let mut x = repr.clone();
            for (l, layer) in self.decoder.iter().enumerate() {
                let cache = layer.forward_step(&x, &h_d[l], &c_d[l]);
                h_d[l] = cache.h.clone();
                c_d[l] = cache.c.clone();
                x = cache.h.clone();
                dec[l].push(cache);
            }

            // Linear projection back to feature space
            let top = &x;
            let mut out = Vec::with_capacity(self.input_dim);
            for f in 0..self.input_dim {
                let w_row = &self.w_out[f * h_dim..(f + 1) * h_dim];
                let mut acc = self.b_out[f];
                for (w, hv) in w_row.iter().zip(top.iter()) {
                    acc += w * hv;
                }
                out.push(acc);
            }
            recon.push(out);
        }

        ForwardTrace {
            enc,
            dec,
            repr,
            recon,
        }
    }

    /// Flatten every parameter into one contiguous vector, layout matching
    /// [`unflatten_params`](Self::unflatten_params) and the grad accumulator.
    pub fn flatten_params(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.num_params());
        for layer in self.encoder.iter().chain(self.decoder.iter()) {
            flat.extend_from_slice(&layer.w);
            flat.extend_from_slice(&layer.b);
        }
        flat.extend_from_slice(&self.w_out);
        flat.extend_from_slice(&self.b_out);
        flat
    }

    /// Write a flat parameter vector back into the layer structures.
    pub fn unflatten_params(&mut self, flat: &[f64]) {
        debug_assert_eq!(flat.len(), self.num_params());
        let mut offset = 0;
        for layer in self.encoder.iter_mut().chain(self.decoder.iter_mut()) {
            let n = layer.w.len();
            layer.w.copy_from_slice(&flat[offset..offset + n]);
            offset += n;
            let n = layer.b.len();
            layer.b.copy_from_slice(&flat[offset..offset + n]);
            offset += n;
        }
        let n = self.w_out.len();
        self.w_out.copy_from_slice(&flat[offset..offset + n]);
        offset += n;
        let n = self.b_out.len();
        self.b_out.copy_from_slice(&flat[offset..offset + n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cfg() -> ModelConfig {
        ModelConfig {
            input_dim: 3,
            hidden_dim: 8,
            num_layers: 2,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_output_shape_equals_input_shape() {
        let model = LstmAutoencoder::new(&small_cfg(), 42);
        let window: Window = (0..5).map(|t| vec![t as f64 * 0.1, 0.5, -0.2]).collect();

        let recon = model.forward(&window);
        assert_eq!(recon.len(), window.len());
        assert!(recon.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn test_forward_is_deterministic_for_same_seed() {
        let cfg = small_cfg();
        let a = LstmAutoencoder::new(&cfg, 7);
        let b = LstmAutoencoder::new(&cfg, 7);
        let window: Window = vec![vec![0.1, 0.2, 0.3]; 4];
        assert_eq!(a.forward(&window), b.forward(&window));

        let c = LstmAutoencoder::new(&cfg, 8);
        assert_ne!(a.forward(&window), c.forward(&window));
    }

    #[test]
    fn test_flatten_unflatten_roundtrip() {
        let cfg = small_cfg();
        let model = LstmAutoencoder::new(&cfg, 1);
        let mut other = LstmAutoencoder::new(&cfg, 2);

        let flat = model.flatten_params();
        assert_eq!(flat.len(), model.num_params());
        other.unflatten_params(&flat);

        let window: Window = vec![vec![0.3, -0.1, 0.0]; 6];
        assert_eq!(model.forward(&window), other.forward(&window));
    }

    #[test]
    fn test_nan_input_propagates() {
        let model = LstmAutoencoder::new(&small_cfg(), 3);
        let window: Window = vec![vec![f64::NAN, 0.0, 0.0]; 3];
        let recon = model.forward(&window);
        assert!(recon.iter().flatten().any(|v| v.is_nan()));
    }
}
