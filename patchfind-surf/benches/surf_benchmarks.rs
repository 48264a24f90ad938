use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{GrayImage, Luma};
use patchfind_core::SurfConfig;
use patchfind_surf::{pyr_down, IntegralImage, SurfDetector};

/// Smooth multi-frequency texture with blob-like structure at several scales
fn create_benchmark_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let (xf, yf) = (x as f32, y as f32);
        let v = 128.0
            + 45.0 * (xf * 0.19).sin() * (yf * 0.23).cos()
            + 35.0 * ((xf - yf) * 0.07).sin()
            + ((x * 7 + y * 13) % 11) as f32;
        Luma([v.clamp(0.0, 255.0) as u8])
    })
}

fn bench_detect_and_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_and_compute");
    group.sample_size(10);

    for &(width, height) in &[(256, 256), (512, 512), (1024, 768)] {
        let img = create_benchmark_image(width, height);
        for extended in [false, true] {
            let detector = SurfDetector::new(SurfConfig {
                extended,
                ..SurfConfig::default()
            })
            .unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("{}x{}", width, height), if extended { 128 } else { 64 }),
                &(detector, &img),
                |b, (detector, img)| b.iter(|| black_box(detector.detect_and_compute(black_box(img)).unwrap())),
            );
        }
    }

    group.finish();
}

fn bench_building_blocks(c: &mut Criterion) {
    let img = create_benchmark_image(1024, 1024);
    let mut group = c.benchmark_group("building_blocks");

    group.bench_function("integral_image_1024", |b| {
        b.iter(|| black_box(IntegralImage::new(black_box(&img))))
    });

    group.bench_function("pyr_down_1024", |b| b.iter(|| black_box(pyr_down(black_box(&img)))));

    group.finish();
}

criterion_group!(benches, bench_detect_and_compute, bench_building_blocks);
criterion_main!(benches);
