use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::activation::{sigmoid, softplus};
use crate::error::ShapeError;
use crate::game::Direction;

/// Trailing input slots holding the one-hot action indicator.
pub const ACTION_SLOTS: usize = 4;

/// Layer widths, input first. Validated on construction and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct LayerShape(Vec<usize>);

impl LayerShape {
    /// Checks for at least two layers, no zero widths, a scalar output, and
    /// room for the action slots in the input layer.
    pub fn new(widths: Vec<usize>) -> Result<Self, ShapeError> {
        if widths.len() < 2 {
            return Err(ShapeError::TooFewLayers(widths.len()));
        }
        if let Some(layer) = widths.iter().position(|&w| w == 0) {
            return Err(ShapeError::ZeroWidth { layer });
        }
        let output = widths[widths.len() - 1];
        if output != 1 {
            return Err(ShapeError::OutputWidth(output));
        }
        if widths[0] < ACTION_SLOTS {
            return Err(ShapeError::InputTooNarrow {
                width: widths[0],
                slots: ACTION_SLOTS,
            });
        }
        Ok(LayerShape(widths))
    }

    pub fn widths(&self) -> &[usize] {
        &self.0
    }

    /// Number of layers including the input layer.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn input_width(&self) -> usize {
        self.0[0]
    }

    /// Input slots available to the board encoding.
    pub fn phi_width(&self) -> usize {
        self.0[0] - ACTION_SLOTS
    }
}

impl TryFrom<Vec<usize>> for LayerShape {
    type Error = ShapeError;

    fn try_from(widths: Vec<usize>) -> Result<Self, Self::Error> {
        LayerShape::new(widths)
    }
}

impl From<LayerShape> for Vec<usize> {
    fn from(shape: LayerShape) -> Self {
        shape.0
    }
}

/// Parameters of one non-input layer: `weights` is `(width, previous width)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Serializable form of a network: shape plus parameters, no activations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub shape: LayerShape,
    pub layers: Vec<DenseLayer>,
}

/// Fully connected value network scoring a (board encoding, move) pair.
///
/// Hidden layers use the logistic sigmoid; the single output unit uses
/// softplus so the value estimate is unbounded above and never negative.
///
/// The per-layer activation buffers are scratch space: every call to
/// [`score`](Self::score) overwrites them, so one instance must not be
/// evaluated from two places at once.
#[derive(Debug, Clone)]
pub struct FeedforwardNetwork {
    shape: LayerShape,
    /// `layers[i - 1]` produces layer `i`.
    layers: Vec<DenseLayer>,
    pre_activations: Vec<Array1<f64>>,
    activations: Vec<Array1<f64>>,
}

impl FeedforwardNetwork {
    /// Random network with parameters drawn from uniform `[0, 1)`.
    pub fn new(shape: LayerShape) -> Self {
        Self::with_rng(shape, &mut rand::rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(shape: LayerShape, rng: &mut R) -> Self {
        let widths = shape.widths();
        let layers = (1..widths.len())
            .map(|i| DenseLayer {
                weights: Array2::from_shape_simple_fn((widths[i], widths[i - 1]), || {
                    rng.random::<f64>()
                }),
                bias: Array1::from_shape_simple_fn(widths[i], || rng.random::<f64>()),
            })
            .collect();
        let (pre_activations, activations) = scratch_buffers(&shape);
        FeedforwardNetwork {
            shape,
            layers,
            pre_activations,
            activations,
        }
    }

    /// Build a network from explicit parameters, inferring the shape.
    pub fn from_layers(layers: Vec<DenseLayer>) -> Result<Self, ShapeError> {
        let input = layers
            .first()
            .map(|l| l.weights.ncols())
            .ok_or(ShapeError::TooFewLayers(1))?;
        let mut widths = vec![input];
        widths.extend(layers.iter().map(|l| l.weights.nrows()));
        Self::with_layers(LayerShape::new(widths)?, layers)
    }

    /// Build a network from parameters that must match `shape` exactly.
    pub fn with_layers(shape: LayerShape, layers: Vec<DenseLayer>) -> Result<Self, ShapeError> {
        let widths = shape.widths();
        if layers.len() != widths.len() - 1 {
            return Err(ShapeError::LayerCount {
                expected: widths.len() - 1,
                actual: layers.len(),
            });
        }
        for (i, layer) in layers.iter().enumerate() {
            let (rows, cols) = layer.weights.dim();
            let (expected_rows, expected_cols) = (widths[i + 1], widths[i]);
            if rows != expected_rows || cols != expected_cols || layer.bias.len() != rows {
                return Err(ShapeError::LayerMismatch {
                    layer: i + 1,
                    rows,
                    cols,
                    bias: layer.bias.len(),
                    expected_rows,
                    expected_cols,
                });
            }
        }
        let (pre_activations, activations) = scratch_buffers(&shape);
        Ok(FeedforwardNetwork {
            shape,
            layers,
            pre_activations,
            activations,
        })
    }

    pub fn from_record(record: NetworkRecord) -> Result<Self, ShapeError> {
        Self::with_layers(record.shape, record.layers)
    }

    pub fn to_record(&self) -> NetworkRecord {
        NetworkRecord {
            shape: self.shape.clone(),
            layers: self.layers.clone(),
        }
    }

    pub fn shape(&self) -> &LayerShape {
        &self.shape
    }

    /// Number of layers including the input layer.
    pub fn depth(&self) -> usize {
        self.shape.depth()
    }

    /// Parameters feeding layer `index` (1-based; the input layer has none).
    pub fn layer(&self, index: usize) -> &DenseLayer {
        &self.layers[index - 1]
    }

    pub fn layer_mut(&mut self, index: usize) -> &mut DenseLayer {
        &mut self.layers[index - 1]
    }

    /// Activation of layer `index` from the most recent forward pass.
    pub fn activation(&self, index: usize) -> &Array1<f64> {
        &self.activations[index]
    }

    /// Weighted input `z` of layer `index` from the most recent forward pass.
    /// For the input layer this mirrors the activation.
    pub fn pre_activation(&self, index: usize) -> &Array1<f64> {
        &self.pre_activations[index]
    }

    /// Scalar held by the output unit after the most recent forward pass.
    pub fn output(&self) -> f64 {
        self.activations[self.depth() - 1][0]
    }

    /// Estimate the value of playing `direction` from the board encoding `phi`.
    ///
    /// `phi` fills the leading input slots (extra values are ignored, missing
    /// ones read as zero); the trailing [`ACTION_SLOTS`] hold the one-hot move.
    /// Overwrites every activation buffer.
    pub fn score(&mut self, phi: &Array1<f64>, direction: Direction) -> f64 {
        let phi_width = self.shape.phi_width();
        let input = &mut self.activations[0];
        input.fill(0.0);
        for (slot, &value) in input.iter_mut().zip(phi.iter()).take(phi_width) {
            *slot = value;
        }
        input[phi_width + direction.index()] = 1.0;
        self.pre_activations[0].assign(&self.activations[0]);

        for layer in 1..self.depth() {
            self.feedforward(layer);
        }
        self.output()
    }

    /// Recompute layer `index` from layer `index - 1`:
    /// `a = g(W · a_prev + b)` with softplus on the output layer and sigmoid elsewhere.
    ///
    /// # Panics
    /// If `index` is 0 or not below [`depth`](Self::depth).
    pub fn feedforward(&mut self, index: usize) {
        assert!(index > 0 && index < self.depth(), "no parameters feed layer {index}");
        let params = &self.layers[index - 1];
        let z = params.weights.dot(&self.activations[index - 1]) + &params.bias;
        let a = if index == self.depth() - 1 {
            z.mapv(softplus)
        } else {
            z.mapv(sigmoid)
        };
        self.pre_activations[index] = z;
        self.activations[index] = a;
    }
}

fn scratch_buffers(shape: &LayerShape) -> (Vec<Array1<f64>>, Vec<Array1<f64>>) {
    let buffers: Vec<Array1<f64>> = shape.widths().iter().map(|&w| Array1::zeros(w)).collect();
    (buffers.clone(), buffers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded(widths: Vec<usize>, seed: u64) -> FeedforwardNetwork {
        let shape = LayerShape::new(widths).unwrap();
        FeedforwardNetwork::with_rng(shape, &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_shape_validation() {
        assert_eq!(LayerShape::new(vec![8]), Err(ShapeError::TooFewLayers(1)));
        assert_eq!(LayerShape::new(vec![]), Err(ShapeError::TooFewLayers(0)));
        assert_eq!(
            LayerShape::new(vec![8, 0, 1]),
            Err(ShapeError::ZeroWidth { layer: 1 })
        );
        assert_eq!(LayerShape::new(vec![8, 4, 2]), Err(ShapeError::OutputWidth(2)));
        assert_eq!(
            LayerShape::new(vec![3, 1]),
            Err(ShapeError::InputTooNarrow { width: 3, slots: 4 })
        );
        let shape = LayerShape::new(vec![260, 500, 1]).unwrap();
        assert_eq!(shape.phi_width(), 256);
        assert_eq!(shape.depth(), 3);
    }

    #[test]
    fn test_shape_deserialize_validates() {
        let shape: LayerShape = serde_json::from_str("[8, 4, 1]").unwrap();
        assert_eq!(shape.widths(), &[8, 4, 1]);
        assert!(serde_json::from_str::<LayerShape>("[8, 4, 3]").is_err());
    }

    #[test]
    fn test_parameter_shapes_follow_layer_shape() {
        let widths = vec![20, 7, 3, 1];
        let net = seeded(widths.clone(), 1);
        for i in 1..widths.len() {
            let layer = net.layer(i);
            assert_eq!(layer.weights.nrows(), widths[i]);
            assert_eq!(layer.weights.ncols(), widths[i - 1]);
            assert_eq!(layer.bias.len(), widths[i]);
        }
        for i in 0..widths.len() {
            assert_eq!(net.activation(i).len(), widths[i]);
        }
    }

    #[test]
    fn test_initial_parameters_in_unit_interval() {
        let net = seeded(vec![12, 6, 1], 2);
        for i in 1..net.depth() {
            let layer = net.layer(i);
            assert!(layer.weights.iter().all(|&w| (0.0..1.0).contains(&w)));
            assert!(layer.bias.iter().all(|&b| (0.0..1.0).contains(&b)));
        }
    }

    #[test]
    fn test_score_sets_one_hot_in_trailing_slots() {
        let mut net = seeded(vec![8, 4, 1], 3);
        let phi = array![2.0, 0.0, 4.0, 8.0];
        net.score(&phi, Direction::Down);
        assert_eq!(
            net.activation(0),
            &array![2.0, 0.0, 4.0, 8.0, 0.0, 0.0, 1.0, 0.0]
        );

        net.score(&phi, Direction::Up);
        assert_eq!(
            net.activation(0),
            &array![2.0, 0.0, 4.0, 8.0, 1.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_score_pads_short_and_truncates_long_encodings() {
        let mut net = seeded(vec![8, 4, 1], 3);

        net.score(&array![2.0, 4.0], Direction::Left);
        assert_eq!(
            net.activation(0),
            &array![2.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        );
        let padded = net.output();
        assert_eq!(net.score(&array![2.0, 4.0, 0.0, 0.0], Direction::Left), padded);

        net.score(&array![2.0, 0.0, 4.0, 8.0, 16.0, 32.0], Direction::Right);
        assert_eq!(
            net.activation(0),
            &array![2.0, 0.0, 4.0, 8.0, 0.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_score_is_deterministic_finite_and_non_negative() {
        let mut net = seeded(vec![20, 10, 5, 1], 4);
        let phi = Array1::from_shape_fn(16, |i| (i * 128) as f64);
        for dir in Direction::ALL {
            let first = net.score(&phi, dir);
            let second = net.score(&phi, dir);
            assert_eq!(first, second);
            assert!(first.is_finite());
            assert!(first >= 0.0);
        }
    }

    #[test]
    fn test_score_matches_hand_computation() {
        // Single layer: z = w . x + b, output = softplus(z).
        let layer = DenseLayer {
            weights: array![[0.5, 0.0, 0.0, 2.0, 0.0]],
            bias: array![-1.0],
        };
        let mut net = FeedforwardNetwork::from_layers(vec![layer]).unwrap();
        let value = net.score(&array![4.0], Direction::Down);
        // 0.5 * 4 + 2.0 * 1 - 1 = 3
        assert!((value - (1.0 + 3.0f64.exp()).ln()).abs() < 1e-12);
        assert_eq!(net.pre_activation(1), &array![3.0]);
    }

    #[test]
    fn test_hidden_layers_use_sigmoid() {
        let hidden = DenseLayer {
            weights: array![[1.0, 0.0, 0.0, 0.0, 0.0]],
            bias: array![0.0],
        };
        let output = DenseLayer {
            weights: array![[1.0]],
            bias: array![0.0],
        };
        let mut net = FeedforwardNetwork::from_layers(vec![hidden, output]).unwrap();
        let value = net.score(&array![2.0], Direction::Left);
        let expected_hidden = sigmoid(2.0);
        assert!((net.activation(1)[0] - expected_hidden).abs() < 1e-12);
        assert!((value - softplus(expected_hidden)).abs() < 1e-12);
    }

    #[test]
    fn test_from_layers_rejects_mismatch() {
        let first = DenseLayer {
            weights: Array2::zeros((3, 8)),
            bias: Array1::zeros(3),
        };
        let second = DenseLayer {
            weights: Array2::zeros((1, 4)),
            bias: Array1::zeros(1),
        };
        let err = FeedforwardNetwork::from_layers(vec![first, second]).unwrap_err();
        assert!(matches!(err, ShapeError::LayerMismatch { layer: 2, .. }));

        let bad_bias = DenseLayer {
            weights: Array2::zeros((1, 8)),
            bias: Array1::zeros(2),
        };
        let err = FeedforwardNetwork::from_layers(vec![bad_bias]).unwrap_err();
        assert!(matches!(err, ShapeError::LayerMismatch { layer: 1, bias: 2, .. }));
    }

    #[test]
    fn test_with_layers_rejects_wrong_count() {
        let shape = LayerShape::new(vec![8, 4, 1]).unwrap();
        let only = DenseLayer {
            weights: Array2::zeros((4, 8)),
            bias: Array1::zeros(4),
        };
        let err = FeedforwardNetwork::with_layers(shape, vec![only]).unwrap_err();
        assert_eq!(err, ShapeError::LayerCount { expected: 2, actual: 1 });
    }

    #[test]
    fn test_record_roundtrip_preserves_scores() {
        let mut net = seeded(vec![8, 4, 1], 5);
        let phi = array![2.0, 4.0, 0.0, 2.0];
        let before = net.score(&phi, Direction::Right);

        let json = serde_json::to_string(&net.to_record()).unwrap();
        let record: NetworkRecord = serde_json::from_str(&json).unwrap();
        let mut restored = FeedforwardNetwork::from_record(record).unwrap();
        assert_eq!(restored.score(&phi, Direction::Right), before);
    }
}
