//! Orthogonally initialized linear layers.
//!
//! Weight matrices are drawn from a standard normal and orthonormalized with
//! Gram-Schmidt on the host, using a caller-supplied RNG so that surrogate
//! initialization is reproducible under a fixed seed.
//!
//! # Gain Values
//!
//! - 1.0: linear output heads
//! - 5/3 ≈ 1.67: tanh activations

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::TensorData;
use rand::Rng;
use rand_distr::StandardNormal;

/// Gain recommended for tanh hidden layers.
pub const TANH_GAIN: f64 = 5.0 / 3.0;

/// Configuration for [`OrthogonalLinear`].
#[derive(Debug, Clone)]
pub struct OrthogonalLinearConfig {
    /// Number of input features.
    pub d_input: usize,
    /// Number of output features.
    pub d_output: usize,
    /// Scale applied to the orthonormal weights.
    pub gain: f64,
    /// Whether to include a bias term.
    pub bias: bool,
}

impl OrthogonalLinearConfig {
    pub fn new(d_input: usize, d_output: usize) -> Self {
        Self {
            d_input,
            d_output,
            gain: 1.0,
            bias: true,
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    /// Initialize the layer, drawing weights from `rng`.
    pub fn init<B: Backend, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        device: &B::Device,
    ) -> OrthogonalLinear<B> {
        let weight = orthogonal_weights::<B, R>(self.d_output, self.d_input, self.gain, rng, device);

        let bias = if self.bias {
            Some(Param::from_tensor(Tensor::zeros([self.d_output], device)))
        } else {
            None
        };

        OrthogonalLinear {
            weight: Param::from_tensor(weight),
            bias,
            d_input: self.d_input,
            d_output: self.d_output,
        }
    }
}

/// Linear layer `y = x W^T + b` with orthogonal initial weights.
#[derive(Module, Debug)]
pub struct OrthogonalLinear<B: Backend> {
    /// Weight matrix of shape [d_output, d_input]
    pub weight: Param<Tensor<B, 2>>,
    /// Optional bias of shape [d_output]
    pub bias: Option<Param<Tensor<B, 1>>>,
    d_input: usize,
    d_output: usize,
}

impl<B: Backend> OrthogonalLinear<B> {
    /// `input` is [batch, d_input], output is [batch, d_output].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let output = input.matmul(self.weight.val().transpose());

        match &self.bias {
            Some(bias) => output + bias.val().unsqueeze_dim(0),
            None => output,
        }
    }

    pub fn d_input(&self) -> usize {
        self.d_input
    }

    pub fn d_output(&self) -> usize {
        self.d_output
    }
}

/// Orthogonal matrix of shape [rows, cols] scaled by `gain`.
///
/// Tall and square matrices get orthonormal columns, wide matrices get
/// orthonormal rows.
pub fn orthogonal_weights<B: Backend, R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    gain: f64,
    rng: &mut R,
    device: &B::Device,
) -> Tensor<B, 2> {
    let values = orthogonal_matrix(rows, cols, gain, rng);
    Tensor::from_data(TensorData::new(values, [rows, cols]), device)
}

/// Row-major orthogonal matrix on the host.
pub fn orthogonal_matrix<R: Rng + ?Sized>(rows: usize, cols: usize, gain: f64, rng: &mut R) -> Vec<f32> {
    // Orthonormalize the `k` vectors of length `n` along the longer side.
    let (n, k) = if rows >= cols { (rows, cols) } else { (cols, rows) };
    let vectors = gram_schmidt(n, k, rng);

    let mut out = vec![0.0f32; rows * cols];
    for (v, vector) in vectors.iter().enumerate() {
        for (e, &value) in vector.iter().enumerate() {
            let (r, c) = if rows >= cols { (e, v) } else { (v, e) };
            out[r * cols + c] = (value * gain) as f32;
        }
    }
    out
}

/// `k <= n` orthonormal vectors of length `n`.
fn gram_schmidt<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(k);

    while basis.len() < k {
        let mut v: Vec<f64> = (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        for b in &basis {
            let proj: f64 = v.iter().zip(b).map(|(x, y)| x * y).sum();
            for (x, y) in v.iter_mut().zip(b) {
                *x -= proj * y;
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        // Linearly dependent draw, resample.
        if norm > 1e-10 {
            v.iter_mut().for_each(|x| *x /= norm);
            basis.push(v);
        }
    }
    basis
}
