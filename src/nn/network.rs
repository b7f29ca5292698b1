use crate::config::TrainingConfig;
use crate::data::batch_indices;
use crate::error::{Result, TesseraError};
use crate::io::StateDict;
use crate::math::argmax1d;
use crate::nn::Layer;
use crate::nn::optim::Optimizer;
use crate::tensor::Tensor;
use rand::Rng;

/// `(input, expected output)` pair; expected outputs are one-hot rows
pub type Sample = (Tensor, Tensor);

/// Ordered stack of layers trained with minibatch gradient descent
///
/// The last layer receives the expected output as its backpropagation
/// error, so it is normally a [`CrossEntropyOutput`](crate::nn::CrossEntropyOutput).
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
}

impl Network {
    #[must_use]
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Self {
        Network { layers }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Names of the layers in order
    #[must_use]
    pub fn summary(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    /// Allocate every parameter that has not been loaded
    ///
    /// # Errors
    /// The first layer error
    pub fn init(&mut self) -> Result<()> {
        for layer in &mut self.layers {
            layer.init()?;
        }
        Ok(())
    }

    /// Run `input` through every layer
    ///
    /// # Errors
    /// The first layer error
    pub fn feedforward(&mut self, input: &Tensor) -> Result<Tensor> {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.feedforward(current)?;
        }
        Ok(current)
    }

    /// One forward and backward pass, accumulating gradients in every layer
    ///
    /// # Errors
    /// The first layer error
    pub fn backpropagate(&mut self, input: &Tensor, expected: &Tensor) -> Result<()> {
        self.feedforward(input)?;
        let mut error = expected.clone();
        for layer in self.layers.iter_mut().rev() {
            error = layer.backpropagate(error)?;
        }
        Ok(())
    }

    /// Backpropagate every sample in `indices`, then apply `optimizer` once
    ///
    /// # Errors
    /// `Configuration` for an index outside `data`, or the first layer error
    pub fn update_mini_batch(
        &mut self,
        data: &[Sample],
        indices: &[usize],
        optimizer: &dyn Optimizer,
    ) -> Result<()> {
        for &i in indices {
            let (input, expected) = sample(data, i)?;
            self.backpropagate(input, expected)?;
        }
        for layer in &mut self.layers {
            layer.optimize(optimizer)?;
        }
        Ok(())
    }

    /// Number of samples in `indices` whose output argmax matches the
    /// expected argmax
    ///
    /// # Errors
    /// `Configuration` for an index outside `data`, or the first layer error
    pub fn evaluate(&mut self, data: &[Sample], indices: &[usize]) -> Result<usize> {
        let mut count = 0;
        for &i in indices {
            let (input, expected) = sample(data, i)?;
            let result = self.feedforward(input)?;
            if result.len() != expected.len() {
                return Err(TesseraError::shape_mismatch(expected.shape(), result.shape()));
            }
            if argmax1d(&result)? == argmax1d(expected)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Train on `data` with the thread-local generator
    ///
    /// # Errors
    /// See [`Self::train_with_rng`]
    pub fn train(&mut self, data: &[Sample], config: &TrainingConfig) -> Result<usize> {
        self.train_with_rng(data, config, &mut rand::rng())
    }

    /// Train for `config.epochs` epochs and return the final evaluation count
    ///
    /// The trailing `validation_fraction` of `data` is held out; the rest is
    /// reshuffled into minibatches every epoch.
    ///
    /// # Errors
    /// `Configuration` on an invalid config or when nothing is left to train
    /// on, or the first layer error
    pub fn train_with_rng<R: Rng + ?Sized>(
        &mut self,
        data: &[Sample],
        config: &TrainingConfig,
        rng: &mut R,
    ) -> Result<usize> {
        config.validate()?;
        let training_size = data.len() - config.validation_size(data.len());
        if training_size == 0 {
            return Err(TesseraError::Configuration(format!(
                "no training samples left out of {}",
                data.len()
            )));
        }
        let optimizer = config.optimizer(training_size)?;
        let eval_indices: Vec<usize> = (training_size..data.len()).collect();

        log::info!("Training using {} inputs", data.len());
        for e in 0..config.epochs {
            let batches = batch_indices(training_size, config.minibatch_size, rng);
            let report_every = (batches.len() / 4).max(1);
            for (b, batch) in batches.iter().enumerate() {
                self.update_mini_batch(data, batch, &optimizer)?;
                if b % report_every == 0 {
                    log::info!("Processed batch {b} out of {}", batches.len());
                }
            }

            let result = self.evaluate(data, &eval_indices)?;
            log::info!("Epoch {e}: {result} / {}", eval_indices.len());
        }

        let result = self.evaluate(data, &eval_indices)?;
        log::info!("End result: {result} / {}", eval_indices.len());
        Ok(result)
    }

    /// Parameters of every layer, keys prefixed with the layer position
    #[must_use]
    pub fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for (i, layer) in self.layers.iter().enumerate() {
            for (key, value) in layer.state_dict() {
                state.insert(format!("{i}.{key}"), value);
            }
        }
        state
    }

    /// Route `"{i}.{key}"` entries back to layer `i`
    ///
    /// # Errors
    /// The first layer error, e.g. a missing or misshapen entry
    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let prefix = format!("{i}.");
            let sub_state: StateDict = state
                .iter()
                .filter_map(|(key, value)| {
                    key.strip_prefix(&prefix)
                        .filter(|sub_key| !sub_key.is_empty())
                        .map(|sub_key| (sub_key.to_string(), value.clone()))
                })
                .collect();
            layer.load_state_dict(&sub_state)?;
        }
        Ok(())
    }
}

fn sample(data: &[Sample], i: usize) -> Result<(&Tensor, &Tensor)> {
    data.get(i).map(|(input, expected)| (input, expected)).ok_or_else(|| {
        TesseraError::Configuration(format!("sample {i} out of range for {} samples", data.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::Activator;
    use crate::data::one_hot;
    use crate::nn::{CrossEntropyOutput, Dense};
    use crate::shape::Shape;

    fn mlp() -> Network {
        Network::new(vec![
            Box::new(Dense::new(2, 4, Activator::sigmoid())),
            Box::new(Dense::new(4, 2, Activator::softmax())),
            Box::new(CrossEntropyOutput::new()),
        ])
    }

    #[test]
    fn test_feedforward_output_is_distribution() {
        let mut net = mlp();
        net.init().unwrap();
        let out = net.feedforward(&Tensor::row(vec![0.3, -0.7])).unwrap();
        assert_eq!(out.shape(), Shape::row(2));
        assert!((out.sum() - 1.0).abs() < 1e-5);
        assert_eq!(net.summary(), vec!["Dense", "Dense", "CrossEntropyOutput"]);
    }

    #[test]
    fn test_evaluate_rejects_out_of_range_index() {
        let mut net = mlp();
        net.init().unwrap();
        let data = vec![(Tensor::row(vec![0.0, 1.0]), one_hot(1, 2).unwrap())];
        assert!(net.evaluate(&data, &[0]).unwrap() <= 1);
        assert!(matches!(
            net.evaluate(&data, &[3]),
            Err(TesseraError::Configuration(_))
        ));
    }

    #[test]
    fn test_state_dict_prefixes_layer_position() {
        let mut net = mlp();
        net.init().unwrap();
        let state = net.state_dict();
        let keys: Vec<&str> = state.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["0.bias", "0.weight", "1.bias", "1.weight"]);

        let mut other = mlp();
        other.load_state_dict(&state).unwrap();
        other.init().unwrap();
        assert_eq!(other.state_dict(), state);
    }

    #[test]
    fn test_load_state_dict_reports_missing_layer() {
        let mut net = mlp();
        net.init().unwrap();
        let mut state = net.state_dict();
        state.remove("1.weight");
        assert!(mlp().load_state_dict(&state).is_err());
    }

    #[test]
    fn test_train_rejects_empty_training_set() {
        let mut net = mlp();
        net.init().unwrap();
        assert!(matches!(
            net.train(&[], &TrainingConfig::default()),
            Err(TesseraError::Configuration(_))
        ));
    }
}
