use std::hint::black_box;
use std::time::Instant;

use orbitview_common::{CameraParams, ScenePreset};
use orbitview_render::{OrbitCamera, RecordingDevice, ShaderSet, ShaderSource, TestScene};

const SHADERS: ShaderSet = ShaderSet {
    vertex: ShaderSource {
        label: "bench vertex",
        code: "",
        entry_point: "vs_main",
    },
    fragment: ShaderSource {
        label: "bench fragment",
        code: "",
        entry_point: "fs_main",
    },
};

fn bench_view_projection(iterations: usize) {
    let mut camera = OrbitCamera::new(CameraParams::default(), 16.0 / 9.0);

    let start = Instant::now();
    for i in 0..iterations {
        camera.advance(black_box(i as f64 * 16.7));
        black_box(camera.view_projection());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  view_projection ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_recorded_frames(preset: ScenePreset, frames: usize) {
    let device = RecordingDevice::new(1280, 720);
    let Ok(mut scene) = TestScene::setup(&device, &preset.config(), &SHADERS) else {
        println!("  {} setup failed", preset.name());
        return;
    };

    let start = Instant::now();
    for i in 0..frames {
        black_box(scene.draw(&device, i as f64 * 16.7));
        device.clear_events();
    }
    let elapsed = start.elapsed();
    let per_frame = elapsed / frames as u32;
    println!(
        "  draw {} ({frames} frames): {per_frame:?}/frame, total {elapsed:?}",
        preset.name()
    );
}

fn main() {
    println!("=== orbitview frame benchmarks ===\n");

    println!("Camera:");
    bench_view_projection(100_000);

    println!("\nRecorded frames:");
    for preset in ScenePreset::ALL {
        bench_recorded_frames(preset, 10_000);
    }
}
