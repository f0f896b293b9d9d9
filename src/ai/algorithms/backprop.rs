use ndarray::{Array1, Array2, Axis};

use crate::ai::networks::activation::{sigmoid, sigmoid_prime};
use crate::ai::networks::FeedforwardNetwork;
use crate::game::Direction;

/// One-sample stochastic gradient descent on a [`FeedforwardNetwork`].
///
/// Error signals:
///
/// ```text
/// output:  delta[L] = (softplus(z[L]) - target) * sigmoid(z[L])
/// hidden:  delta[l] = (W[l+1]^T . delta[l+1]) * sigmoid'(z[l])
/// update:  W[l] -= lr * delta[l] . a[l-1]^T
///          b[l] -= lr * delta[l]
/// ```
///
/// All error signals are computed against the pre-update weights before any
/// parameter changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backprop {
    learning_rate: f64,
}

impl Backprop {
    pub fn new(learning_rate: f64) -> Self {
        Backprop { learning_rate }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Move the network's estimate for `(phi, direction)` towards `target`.
    ///
    /// Leaves the activations of the forward pass for `(phi, direction)` in
    /// the network, so `network.output()` afterwards is the pre-update prediction.
    pub fn step(
        &self,
        network: &mut FeedforwardNetwork,
        phi: &Array1<f64>,
        direction: Direction,
        target: f64,
    ) {
        network.score(phi, direction);

        let depth = network.depth();
        let last = depth - 1;
        let mut deltas: Vec<Array1<f64>> = vec![Array1::zeros(0); depth];

        let error = network.output() - target;
        deltas[last] = network
            .pre_activation(last)
            .mapv(|z| error * sigmoid(z));

        for l in (1..last).rev() {
            let back = network.layer(l + 1).weights.t().dot(&deltas[l + 1]);
            deltas[l] = back * network.pre_activation(l).mapv(sigmoid_prime);
        }

        let gradients: Vec<Array2<f64>> = (1..depth)
            .map(|l| outer(&deltas[l], network.activation(l - 1)))
            .collect();

        for (l, grad) in (1..depth).zip(gradients) {
            let layer = network.layer_mut(l);
            layer.weights.scaled_add(-self.learning_rate, &grad);
            layer.bias.scaled_add(-self.learning_rate, &deltas[l]);
        }
    }
}

/// `column * row^T`.
fn outer(column: &Array1<f64>, row: &Array1<f64>) -> Array2<f64> {
    column
        .view()
        .insert_axis(Axis(1))
        .dot(&row.view().insert_axis(Axis(0)))
}
