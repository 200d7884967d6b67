//! Surrogate networks.
//!
//! Both surrogates are tanh MLPs over policy points:
//! - [`ValueNet`] maps `[batch, dim] -> [batch, 1]` and approximates the
//!   normalized objective.
//! - [`DerivativeNet`] maps `[batch, dim] -> [batch, dim]` and approximates
//!   its gradient.

use burn::module::Module;
use burn::prelude::*;
use burn::tensor::activation::tanh;
use burn::tensor::backend::AutodiffBackend;
use rand::Rng;

use crate::nn::{OrthogonalLinear, OrthogonalLinearConfig, TANH_GAIN};

/// A network over policy points.
pub trait Surrogate<B: Backend>: Module<B> {
    /// `points` is [batch, dim].
    fn forward(&self, points: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Output together with `∇ₓ Σ (output ⊙ cotangent)` at `points`.
    ///
    /// The network parameters are excluded from the graph, so only the input
    /// gradient is computed. Both returned tensors are detached.
    fn forward_with_input_grad(
        &self,
        points: Tensor<B, 2>,
        cotangent: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>)
    where
        B: AutodiffBackend,
    {
        let net = self.clone().no_grad();
        let x = points.detach().require_grad();
        let output = net.forward(x.clone());

        let grads = (output.clone() * cotangent.detach()).sum().backward();
        let input_grad = match x.grad(&grads) {
            Some(grad) => Tensor::from_inner(grad),
            None => x.zeros_like().detach(),
        };

        (output.detach(), input_grad)
    }
}

/// Shape of both surrogate networks.
#[derive(Debug, Clone, Copy)]
pub struct SurrogateNetConfig {
    pub input_dim: usize,
    pub hidden_size: usize,
    pub n_hidden_layers: usize,
}

impl SurrogateNetConfig {
    pub fn new(input_dim: usize, hidden_size: usize, n_hidden_layers: usize) -> Self {
        Self {
            input_dim,
            hidden_size,
            n_hidden_layers,
        }
    }

    pub fn init_value<B: Backend, R: Rng + ?Sized>(&self, rng: &mut R, device: &B::Device) -> ValueNet<B> {
        ValueNet {
            mlp: self.init_mlp(1, rng, device),
        }
    }

    pub fn init_derivative<B: Backend, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        device: &B::Device,
    ) -> DerivativeNet<B> {
        DerivativeNet {
            mlp: self.init_mlp(self.input_dim, rng, device),
        }
    }

    fn init_mlp<B: Backend, R: Rng + ?Sized>(&self, d_output: usize, rng: &mut R, device: &B::Device) -> Mlp<B> {
        let mut hidden = Vec::with_capacity(self.n_hidden_layers);
        let mut d_in = self.input_dim;
        for _ in 0..self.n_hidden_layers {
            hidden.push(
                OrthogonalLinearConfig::new(d_in, self.hidden_size)
                    .with_gain(TANH_GAIN)
                    .init(rng, device),
            );
            d_in = self.hidden_size;
        }
        let head = OrthogonalLinearConfig::new(d_in, d_output).init(rng, device);
        Mlp { hidden, head }
    }
}

/// Tanh MLP with a linear head.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    hidden: Vec<OrthogonalLinear<B>>,
    head: OrthogonalLinear<B>,
}

impl<B: Backend> Mlp<B> {
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(input, |x, layer| tanh(layer.forward(x)));
        self.head.forward(x)
    }
}

/// Scalar value surrogate `V(x)`.
#[derive(Module, Debug)]
pub struct ValueNet<B: Backend> {
    mlp: Mlp<B>,
}

impl<B: Backend> Surrogate<B> for ValueNet<B> {
    fn forward(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp.forward(points)
    }
}

/// Gradient surrogate `g(x)`.
#[derive(Module, Debug)]
pub struct DerivativeNet<B: Backend> {
    mlp: Mlp<B>,
}

impl<B: Backend> Surrogate<B> for DerivativeNet<B> {
    fn forward(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp.forward(points)
    }
}
