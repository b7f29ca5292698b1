use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessera::*;

fn seeded_dense(input: usize, output: usize, activator: Activator, rng: &mut StdRng) -> Dense {
    let mut layer = Dense::new(input, output, activator);
    let w = Tensor::randn_with(Shape::matrix(output, input), 0.0, 1.0 / (input as f32).sqrt(), rng).unwrap();
    let b = Tensor::randn_with(Shape::row(output), 0.0, 1.0, rng).unwrap();
    layer.load(vec![w], vec![b]).unwrap();
    layer
}

/// Points on either side of x = 0, keeping a margin around the boundary
fn half_plane_data(n: usize, rng: &mut StdRng) -> Vec<Sample> {
    let mut data = Vec::with_capacity(n);
    while data.len() < n {
        let x: f32 = rng.random_range(-1.0..1.0);
        let y: f32 = rng.random_range(-1.0..1.0);
        if x.abs() < 0.2 {
            continue;
        }
        let label = usize::from(x > 0.0);
        data.push((Tensor::row(vec![x, y]), one_hot(label, 2).unwrap()));
    }
    data
}

fn mlp(rng: &mut StdRng) -> Network {
    Network::new(vec![
        Box::new(seeded_dense(2, 8, Activator::sigmoid(), rng)),
        Box::new(seeded_dense(8, 2, Activator::softmax(), rng)),
        Box::new(CrossEntropyOutput::new()),
    ])
}

#[test]
fn test_mlp_learns_half_plane() {
    let mut rng = StdRng::seed_from_u64(2024);
    let data = half_plane_data(300, &mut rng);
    let mut net = mlp(&mut rng);
    net.init().unwrap();

    let config = TrainingConfig {
        epochs: 20,
        minibatch_size: 10,
        learning_rate: 0.05,
        decay_rate: 0.0,
        validation_fraction: 1.0 / 6.0,
    };
    let correct = net.train_with_rng(&data, &config, &mut rng).unwrap();
    assert!(correct >= 42, "only {correct} / 50 correct");
}

#[test]
fn test_update_mini_batch_changes_parameters() {
    let mut rng = StdRng::seed_from_u64(3);
    let data = half_plane_data(20, &mut rng);
    let mut net = mlp(&mut rng);
    let before = net.state_dict();

    let optimizer = Sgd::new(5, 20, 0.0, 0.1).unwrap();
    net.update_mini_batch(&data, &[0, 1, 2, 3, 4], &optimizer).unwrap();
    assert_ne!(net.state_dict(), before);
}

fn bars(vertical: bool, offset: usize) -> Tensor {
    let mut t = Tensor::zeros(Shape::new(6, 6, 1));
    for i in 0..6 {
        if vertical {
            t[(offset, i, 0)] = 1.0;
        } else {
            t[(i, offset, 0)] = 1.0;
        }
    }
    t
}

fn cnn(algo: ConvAlgo) -> Network {
    Network::new(vec![
        Box::new(
            Conv2d::new(Shape::new(6, 6, 1), Shape::new(3, 3, 1), 4, 1, Padding::Same, Activator::relu())
                .unwrap()
                .with_algo(algo),
        ),
        Box::new(MaxPool2d::new(2, 2).unwrap()),
        Box::new(Dense::new(3 * 3 * 4, 2, Activator::softmax())),
        Box::new(CrossEntropyOutput::new()),
    ])
}

#[test]
fn test_cnn_trains_and_round_trips_through_disk() {
    let data: Vec<Sample> = (0..6)
        .flat_map(|offset| {
            [
                (bars(true, offset), one_hot(0, 2).unwrap()),
                (bars(false, offset), one_hot(1, 2).unwrap()),
            ]
        })
        .collect();

    let mut net = cnn(ConvAlgo::Im2col);
    net.init().unwrap();
    let config = TrainingConfig {
        epochs: 3,
        minibatch_size: 2,
        learning_rate: 0.01,
        decay_rate: 0.0,
        validation_fraction: 0.25,
    };
    let correct = net
        .train_with_rng(&data, &config, &mut StdRng::seed_from_u64(9))
        .unwrap();
    assert!(correct <= 3);

    let path = std::env::temp_dir().join("tessera_cnn_state.bin");
    save_state_dict(&net.state_dict(), &path).unwrap();

    // reload into a network running the other algorithm
    let mut restored = cnn(ConvAlgo::Direct);
    restored.load_state_dict(&load_state_dict(&path).unwrap()).unwrap();
    restored.init().unwrap();
    std::fs::remove_file(&path).ok();

    for (input, _) in &data {
        let a = net.feedforward(input).unwrap();
        let b = restored.feedforward(input).unwrap();
        for (x, y) in a.data().iter().zip(b.data()) {
            assert!((x - y).abs() < 1e-6);
        }
    }
}

#[test]
fn test_train_rejects_invalid_config() {
    let mut rng = StdRng::seed_from_u64(1);
    let data = half_plane_data(12, &mut rng);
    let mut net = mlp(&mut rng);
    let config = TrainingConfig {
        epochs: 0,
        ..TrainingConfig::default()
    };
    assert!(matches!(
        net.train(&data, &config),
        Err(TesseraError::Configuration(_))
    ));
}
