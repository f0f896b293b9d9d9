//! Scalar activation functions used by the feedforward network.
//!
//! Both forms avoid evaluating `exp` of a large positive argument, so they
//! stay finite for any finite input.

/// Logistic sigmoid `1 / (1 + e^-z)`.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `sigmoid(z) * (1 - sigmoid(z))`.
pub fn sigmoid_prime(z: f64) -> f64 {
    let s = sigmoid(z);
    s * (1.0 - s)
}

/// Softplus `ln(1 + e^z)`, always `>= 0`.
pub fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}
