//! Manual backpropagation through the LSTM autoencoder + Adam optimizer.
//!
//! The loss is plain MSE between the reconstruction and the target window,
//! averaged over timesteps and features. Gradients flow backward through the
//! output projection, the decoder stack (including its replicated-input path
//! back into the encoder representation), and finally the encoder stack via
//! the decoder's initial states. Gradient norm is clipped globally before the
//! Adam update.
//!
//! This is a placeholder training loop: no early stopping, validation split,
//! or checkpointing. It exists so the anomaly threshold has a trained model
//! to score against.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::model::autoencoder::{ForwardTrace, LstmAutoencoder};
use crate::model::lstm::LayerGrads;
use crate::model::Window;

/// Max gradient norm for global gradient clipping.
const MAX_GRAD_NORM: f64 = 5.0;

/// Errors raised when the training input violates the shape contract.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("training pair {index} has an empty window")]
    EmptyWindow { index: usize },

    #[error(
        "training pair {index} row {row} has {got} features, model expects {expected}"
    )]
    FeatureMismatch {
        index: usize,
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("training pair {index}: input has {input_len} steps, target has {target_len}")]
    LengthMismatch {
        index: usize,
        input_len: usize,
        target_len: usize,
    },
}

/// Container for training outputs.
#[derive(Debug, Clone)]
pub struct TrainingArtifacts {
    pub model: LstmAutoencoder,
    /// Mean reconstruction loss per epoch; non-empty iff at least one
    /// training pair was seen.
    pub losses: Vec<f64>,
}

/// Accumulated gradients matching the autoencoder's parameter layout.
struct GradAccum {
    encoder: Vec<LayerGrads>,
    decoder: Vec<LayerGrads>,
    d_w_out: Vec<f64>,
    d_b_out: Vec<f64>,
}

impl GradAccum {
    fn zeros(model: &LstmAutoencoder) -> Self {
        Self {
            encoder: model.encoder.iter().map(LayerGrads::zeros).collect(),
            decoder: model.decoder.iter().map(LayerGrads::zeros).collect(),
            d_w_out: vec![0.0; model.w_out.len()],
            d_b_out: vec![0.0; model.b_out.len()],
        }
    }

    /// L2 norm of all accumulated gradients.
    fn grad_norm(&self) -> f64 {
        let mut sum = 0.0;
        for lg in self.encoder.iter().chain(self.decoder.iter()) {
            for v in lg.d_w.iter().chain(lg.d_b.iter()) {
                sum += v * v;
            }
        }
        for v in self.d_w_out.iter().chain(self.d_b_out.iter()) {
            sum += v * v;
        }
        sum.sqrt()
    }

    /// Scale all gradients by a factor.
    fn scale(&mut self, factor: f64) {
        for lg in self.encoder.iter_mut().chain(self.decoder.iter_mut()) {
            for v in lg.d_w.iter_mut().chain(lg.d_b.iter_mut()) {
                *v *= factor;
            }
        }
        for v in self.d_w_out.iter_mut().chain(self.d_b_out.iter_mut()) {
            *v *= factor;
        }
    }

    /// Flatten into the optimizer's layout (must mirror
    /// `LstmAutoencoder::flatten_params`).
    fn flatten(&self) -> Vec<f64> {
        let mut flat = Vec::new();
        for lg in self.encoder.iter().chain(self.decoder.iter()) {
            flat.extend_from_slice(&lg.d_w);
            flat.extend_from_slice(&lg.d_b);
        }
        flat.extend_from_slice(&self.d_w_out);
        flat.extend_from_slice(&self.d_b_out);
        flat
    }
}

/// Adam optimizer with decaying base learning rate.
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    /// Base learning rate (decays over time).
    pub lr: f64,
    /// LR decay factor per step.
    pub decay: f64,
    /// Minimum learning rate floor.
    pub lr_floor: f64,
    /// First moment decay.
    pub beta1: f64,
    /// Second moment decay.
    pub beta2: f64,
    /// Numerical stability epsilon.
    pub eps: f64,
    /// Total steps taken.
    pub steps: u64,
    m: Vec<f64>,
    v: Vec<f64>,
}

impl AdamOptimizer {
    pub fn new(lr: f64, num_params: usize) -> Self {
        Self {
            lr,
            decay: 0.9999,
            lr_floor: lr * 0.1,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            steps: 0,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
        }
    }

    pub fn current_lr(&self) -> f64 {
        self.lr
    }

    /// Apply a bias-corrected Adam update to the flat parameter vector.
    pub fn apply(&mut self, weights_flat: &mut [f64], grads_flat: &[f64]) {
        self.steps += 1;
        let t = self.steps as f64;

        let lr_t = self.lr * (1.0 - self.beta2.powf(t)).sqrt() / (1.0 - self.beta1.powf(t));

        for i in 0..weights_flat.len() {
            let g = grads_flat[i];
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            weights_flat[i] -= lr_t * self.m[i] / (self.v[i].sqrt() + self.eps);
        }

        self.lr = (self.lr * self.decay).max(self.lr_floor);
    }
}

/// Backprop one (input, target) window through a cached forward trace.
///
/// Accumulates parameter gradients into `grads` and returns the unweighted
/// MSE loss for this window.
fn backward(
    model: &LstmAutoencoder,
    trace: &ForwardTrace,
    target: &Window,
    grads: &mut GradAccum,
) -> f64 {
    let seq_len = trace.recon.len();
    let features = model.input_dim();
    let h_dim = model.hidden_dim();
    let layers = model.num_layers();
    let norm = (seq_len * features) as f64;

    // ========================================================================
    // 1. MSE loss and its gradient w.r.t. the reconstruction
    // ========================================================================
    let mut loss = 0.0;
    let mut d_recon = vec![vec![0.0; features]; seq_len];
    for t in 0..seq_len {
        for f in 0..features {
            let err = trace.recon[t][f] - target[t][f];
            loss += err * err;
            d_recon[t][f] = 2.0 * err / norm;
        }
    }
    loss /= norm;

    // ========================================================================
    // 2. Output projection: recon[t] = W_out * h_top[t] + b_out
    // ========================================================================
    let top = layers - 1;
    let mut d_h_top: Vec<Vec<f64>> = vec![vec![0.0; h_dim]; seq_len];
    for t in 0..seq_len {
        let h_t = &trace.dec[top][t].h;
        for f in 0..features {
            let d_r = d_recon[t][f];
            grads.d_b_out[f] += d_r;
            let base = f * h_dim;
            for k in 0..h_dim {
                grads.d_w_out[base + k] += d_r * h_t[k];
                d_h_top[t][k] += d_r * model.w_out[base + k];
            }
        }
    }

    // ========================================================================
    // 3. Decoder BPTT, top layer down, latest timestep first
    // ========================================================================
    let mut carry_h: Vec<Vec<f64>> = vec![vec![0.0; h_dim]; layers];
    let mut carry_c: Vec<Vec<f64>> = vec![vec![0.0; h_dim]; layers];
    let mut d_repr = vec![0.0; h_dim];

    for t in (0..seq_len).rev() {
        // Gradient entering the top layer at t from the output projection;
        // lower layers receive the input-gradient of the layer above.
        let mut from_above = d_h_top[t].clone();
        for l in (0..layers).rev() {
            let d_h: Vec<f64> = carry_h[l]
                .iter()
                .zip(from_above.iter())
                .map(|(a, b)| a + b)
                .collect();
            let (d_x, d_h_prev, d_c_prev) =
                model.decoder[l].backward_step(&trace.dec[l][t], &d_h, &carry_c[l], &mut grads.decoder[l]);
            carry_h[l] = d_h_prev;
            carry_c[l] = d_c_prev;

            if l == 0 {
                // Decoder input at every step is the encoder representation
                for (dr, dx) in d_repr.iter_mut().zip(d_x.iter()) {
                    *dr += dx;
                }
                from_above = vec![0.0; h_dim];
            } else {
                from_above = d_x;
            }
        }
    }

    // After t=0 the carries are the gradients w.r.t. the decoder's initial
    // states, which are the encoder's final states per layer. The replicated
    // representation adds onto the encoder top layer's final hidden state.
    for (cr, dr) in carry_h[top].iter_mut().zip(d_repr.iter()) {
        *cr += dr;
    }

    // ========================================================================
    // 4. Encoder BPTT seeded from the decoder's initial-state gradients
    // ========================================================================
    for t in (0..seq_len).rev() {
        let mut from_above: Vec<f64> = Vec::new();
        for l in (0..layers).rev() {
            let mut d_h = carry_h[l].clone();
            if l != top {
                for (a, b) in d_h.iter_mut().zip(from_above.iter()) {
                    *a += b;
                }
            }
            let (d_x, d_h_prev, d_c_prev) =
                model.encoder[l].backward_step(&trace.enc[l][t], &d_h, &carry_c[l], &mut grads.encoder[l]);
            carry_h[l] = d_h_prev;
            carry_c[l] = d_c_prev;
            from_above = d_x; // discarded for l == 0 (raw input)
        }
    }

    loss
}

/// Validate the shape contract of one training pair.
fn validate_pair(
    index: usize,
    input: &Window,
    target: &Window,
    expected: usize,
) -> Result<(), TrainingError> {
    if input.is_empty() || target.is_empty() {
        return Err(TrainingError::EmptyWindow { index });
    }
    if input.len() != target.len() {
        return Err(TrainingError::LengthMismatch {
            index,
            input_len: input.len(),
            target_len: target.len(),
        });
    }
    for (row, values) in input.iter().chain(target.iter()).enumerate() {
        if values.len() != expected {
            return Err(TrainingError::FeatureMismatch {
                index,
                row: row % input.len(),
                got: values.len(),
                expected,
            });
        }
    }
    Ok(())
}

/// Train a fresh autoencoder on (input, target) window pairs.
///
/// Target is typically equal to input for pure reconstruction. Each pair is
/// one optimizer step; epochs iterate the full set. Returns the trained model
/// plus the per-epoch mean loss history.
pub fn train(
    pairs: &[(Window, Window)],
    cfg: &ModelConfig,
    seed: u64,
) -> Result<TrainingArtifacts, TrainingError> {
    for (index, (input, target)) in pairs.iter().enumerate() {
        validate_pair(index, input, target, cfg.input_dim)?;
    }

    let mut model = LstmAutoencoder::new(cfg, seed);
    let mut optimizer = AdamOptimizer::new(cfg.learning_rate, model.num_params());
    let mut losses = Vec::with_capacity(cfg.epochs);

    for epoch in 0..cfg.epochs {
        let mut epoch_loss = 0.0;
        let mut batches = 0usize;

        for (input, target) in pairs {
            let trace = model.forward_cached(input);
            let mut grads = GradAccum::zeros(&model);
            let loss = backward(&model, &trace, target, &mut grads);

            let norm = grads.grad_norm();
            if norm > MAX_GRAD_NORM {
                grads.scale(MAX_GRAD_NORM / norm);
            }

            let mut flat_w = model.flatten_params();
            optimizer.apply(&mut flat_w, &grads.flatten());
            model.unflatten_params(&flat_w);

            epoch_loss += loss;
            batches += 1;
        }

        if batches > 0 {
            let avg = epoch_loss / batches as f64;
            losses.push(avg);
            debug!(epoch, loss = avg, lr = optimizer.current_lr(), "epoch complete");
        }
    }

    info!(
        epochs = losses.len(),
        final_loss = losses.last().copied().unwrap_or(f64::NAN),
        params = model.num_params(),
        "autoencoder training finished"
    );

    Ok(TrainingArtifacts { model, losses })
}
