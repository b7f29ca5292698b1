//! Convolution algorithm comparison benchmarks
//!
//! Compares Direct vs im2col convolution across input sizes, filter sizes
//! and padding modes, for both the forward and the backward pass.
//!
//! Memory for the im2col patch matrix:
//! - Output positions: out_w * out_h
//! - Footprint: k * k * channels
//! - Memory = out_w * out_h * k * k * channels * 4 bytes (f32)

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tessera::{Activator, Conv2d, ConvAlgo, Layer, Padding, Shape, Tensor};

/// Deterministic `(width, height, channels)` input
fn input_tensor(width: usize, height: usize, channels: usize) -> Tensor {
    let shape = Shape::new(width, height, channels);
    let data = (0..shape.capacity()).map(|i| (i as f32 * 0.01).sin()).collect();
    Tensor::from_vec(shape, data).unwrap()
}

fn layer(
    size: usize,
    channels: usize,
    filters: usize,
    kernel: usize,
    padding: Padding,
    algo: ConvAlgo,
) -> Conv2d {
    let mut conv = Conv2d::new(
        Shape::new(size, size, channels),
        Shape::new(kernel, kernel, channels),
        filters,
        1,
        padding,
        Activator::relu(),
    )
    .unwrap()
    .with_algo(algo);
    conv.init().unwrap();
    conv
}

/// Calculate im2col memory usage in MB
fn im2col_memory_mb(size: usize, channels: usize, kernel: usize) -> f64 {
    let bytes = size * size * kernel * kernel * channels * 4;
    (bytes as f64) / (1024.0 * 1024.0)
}

fn bench_conv_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("conv_forward");

    // (name, size, channels, filters, kernel)
    let scenarios = [
        ("tiny", 8, 1, 4, 3),
        ("mnist", 28, 1, 20, 5),
        ("small", 16, 8, 16, 3),
        ("medium", 32, 16, 32, 3),
    ];

    for (name, size, channels, filters, kernel) in scenarios {
        for algo in [ConvAlgo::Direct, ConvAlgo::Im2col] {
            let id = BenchmarkId::new(format!("{algo:?}").to_lowercase(), name);
            group.bench_with_input(id, &(size, channels), |b, &(size, channels)| {
                let mut conv = layer(size, channels, filters, kernel, Padding::Same, algo);
                let input = input_tensor(size, size, channels);
                b.iter(|| conv.feedforward(black_box(input.clone())).unwrap());
            });
        }

        println!(
            "{name}: {size}x{size}x{channels}, {filters} filters {kernel}x{kernel}, im2col memory: {:.2} MB",
            im2col_memory_mb(size, channels, kernel)
        );
    }

    group.finish();
}

fn bench_conv_backward(c: &mut Criterion) {
    let mut group = c.benchmark_group("conv_backward");

    for size in [8, 16, 28] {
        for algo in [ConvAlgo::Direct, ConvAlgo::Im2col] {
            let id = BenchmarkId::new(format!("{algo:?}").to_lowercase(), size);
            group.bench_with_input(id, &size, |b, &size| {
                let mut conv = layer(size, 4, 8, 3, Padding::Same, algo);
                let input = input_tensor(size, size, 4);
                let error = Tensor::filled(conv.output_shape(), 0.1);
                b.iter(|| {
                    conv.feedforward(input.clone()).unwrap();
                    conv.backpropagate(black_box(error.clone())).unwrap()
                });
            });
        }
    }

    group.finish();
}

fn bench_conv_padding(c: &mut Criterion) {
    let mut group = c.benchmark_group("conv_padding");

    for padding in [Padding::Valid, Padding::Same] {
        for algo in [ConvAlgo::Direct, ConvAlgo::Im2col] {
            let id = BenchmarkId::new(format!("{algo:?}").to_lowercase(), format!("{padding:?}"));
            group.bench_function(id, |b| {
                let mut conv = layer(20, 5, 10, 3, padding, algo);
                let input = input_tensor(20, 20, 5);
                b.iter(|| conv.feedforward(black_box(input.clone())).unwrap());
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_conv_forward,
    bench_conv_backward,
    bench_conv_padding
);
criterion_main!(benches);
