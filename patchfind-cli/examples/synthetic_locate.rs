use image::{imageops, GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use patchfind_cli::annotate::draw_location;
use patchfind_cli::{LocatorBuilder, MatchStrategy, TargetDescription};
use patchfind_geometry::RelativeCenter;
use std::time::Instant;

/// Chart of 6x4 discs with shades stepping across the grid
fn chart() -> GrayImage {
    let mut img = GrayImage::from_pixel(300, 200, Luma([235]));
    for row in 0..4 {
        for col in 0..6 {
            let shade = (20 + 9 * (row * 6 + col)) as u8;
            let radius = 8 + (row * 3 + col * 5) % 11;
            draw_filled_circle_mut(&mut img, (25 + col * 50, 25 + row * 50), radius, Luma([shade]));
        }
    }
    img
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🎯 Synthetic Chart Localisation Demo");
    println!("====================================\n");

    let target = chart();
    let mut scene = GrayImage::from_pixel(800, 600, Luma([90]));
    imageops::replace(&mut scene, &imageops::rotate180(&target), 240, 160);

    let description = TargetDescription {
        x_size: 300,
        y_size: 200,
        size_in_cm: Some((15.0, 10.0)),
        patches: (0..24)
            .map(|i| RelativeCenter::new((25 + (i % 6) * 50) as f64 / 300.0, (25 + (i / 6) * 50) as f64 / 200.0))
            .collect(),
    };

    for strategy in [MatchStrategy::KdForest, MatchStrategy::BruteForce] {
        let locator = LocatorBuilder::new().strategy(strategy).build()?;
        let t0 = Instant::now();
        let loc = locator.locate(target.clone(), scene.clone(), &description)?;
        println!("📋 {:?}: {:.2?}", strategy, t0.elapsed());
        println!("   correspondences: {}, inliers: {}", loc.correspondences, loc.inliers);
        println!("   upside down: {}", loc.upside_down);
        println!("   corners: {:?}", loc.corners);
        println!("   first patch: {:?}", loc.patch_centres[0]);

        if strategy == MatchStrategy::BruteForce {
            let mut out = image::DynamicImage::ImageLuma8(scene.clone()).to_rgb8();
            draw_location(&mut out, &loc.corners, &loc.patch_centres);
            out.save("synthetic_locate.png")?;
            println!("\n✅ Saved synthetic_locate.png");
        }
    }
    Ok(())
}
