use clap::{Parser, Subcommand};
use orbitview_common::{CameraParams, SceneConfig, ScenePreset};
use orbitview_render::{OrbitCamera, RecordingDevice, SurfaceAcquisitionError, TestScene};
use orbitview_render_wgpu::shaders_for;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orbitview-cli", about = "Headless tooling for the orbitview test scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, crate info and the built-in scene presets
    Info,
    /// Print the orbit angle, eye position and view-projection at given times
    Camera {
        /// Frame times in milliseconds
        #[arg(short, long, default_values_t = [0.0, 250.0])]
        time: Vec<f64>,
        /// Surface aspect ratio (width / height)
        #[arg(short, long, default_value = "1.7777778")]
        aspect: f32,
    },
    /// Describe the mesh a scene uploads
    Mesh {
        #[arg(short, long, default_value = "cube")]
        scene: ScenePreset,
    },
    /// Run setup and a few frames against a recording device and print every
    /// device call
    Trace {
        #[arg(short, long, default_value = "cube")]
        scene: ScenePreset,
        /// Scene config file; overrides --scene
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of ticks to draw
        #[arg(short, long, default_value = "2")]
        frames: u64,
        /// Milliseconds between ticks
        #[arg(long, default_value = "16.7")]
        step: f64,
        /// Tick whose surface acquisition should fail
        #[arg(long)]
        drop_frame: Option<u64>,
    },
    /// Load and validate a scene config file
    Validate { path: PathBuf },
    /// List the GPU adapters wgpu can see
    Adapters,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("orbitview-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", orbitview_render::crate_info());
            println!("presets:");
            for preset in ScenePreset::ALL {
                let config = preset.config();
                println!(
                    "  {:<14} mesh={:?} depth={} camera={}",
                    preset.name(),
                    config.mesh,
                    config.depth_test,
                    config.camera.is_some()
                );
            }
        }
        Commands::Camera { time, aspect } => {
            let mut camera = OrbitCamera::new(CameraParams::default(), aspect);
            for t in time {
                camera.advance(t);
                let eye = camera.eye();
                println!(
                    "t={t:.1}ms angle={:.6}rad eye=({:.3}, {:.3}, {:.3})",
                    camera.angle(),
                    eye.x,
                    eye.y,
                    eye.z
                );
                for col in camera.view_projection().to_cols_array_2d() {
                    println!(
                        "  [{:>9.4} {:>9.4} {:>9.4} {:>9.4}]",
                        col[0], col[1], col[2], col[3]
                    );
                }
            }
        }
        Commands::Mesh { scene } => {
            let mesh = scene.config().build_mesh()?;
            let layout = mesh.vertex_layout();
            println!("mesh: {}", mesh.name());
            println!("vertices: {}", mesh.vertex_count());
            match mesh.index_count() {
                Some(n) => println!("indices: {n}"),
                None => println!("indices: none"),
            }
            println!("triangles: {}", mesh.triangle_count());
            println!("stride: {} bytes", layout.array_stride);
            for a in &layout.attributes {
                println!(
                    "  location {} {:?} at offset {}",
                    a.shader_location, a.format, a.offset
                );
            }
            println!("vertex buffer: {} bytes", mesh.vertex_bytes().len());
            if let Some(bytes) = mesh.index_bytes() {
                println!("index buffer: {} bytes", bytes.len());
            }
        }
        Commands::Trace {
            scene,
            config,
            frames,
            step,
            drop_frame,
        } => {
            let config = match config {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "loading scene config");
                    SceneConfig::load(path)?
                }
                None => scene.config(),
            };
            let layout = config.build_mesh()?.vertex_layout();
            let shaders = shaders_for(&layout, config.camera.is_some())?;

            let device = RecordingDevice::new(1280, 720);
            let mut scene = TestScene::setup(&device, &config, &shaders)?;
            println!("# setup");
            print!("{}", device.trace());

            for frame in 0..frames {
                device.clear_events();
                if drop_frame == Some(frame) {
                    device.fail_next_acquire(SurfaceAcquisitionError::Outdated);
                }
                let time = frame as f64 * step;
                let outcome = scene.draw(&device, time);
                println!("# tick {frame} t={time:.1}ms -> {outcome:?}");
                print!("{}", device.trace());
            }

            let stats = scene.stats();
            println!(
                "# presented={} dropped={}",
                stats.presented, stats.dropped
            );
        }
        Commands::Validate { path } => {
            let config = SceneConfig::load(&path)?;
            println!("{}: ok", path.display());
            println!("  mesh={:?} depth={}", config.mesh, config.depth_test);
            if let Some(cam) = config.camera {
                println!(
                    "  camera fov={}deg near={} far={} radius={} height={} speed={}",
                    cam.fov_degrees,
                    cam.near,
                    cam.far,
                    cam.orbit_radius,
                    cam.eye_height,
                    cam.angular_speed
                );
            }
        }
        Commands::Adapters => {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapters = instance.enumerate_adapters(wgpu::Backends::all());
            if adapters.is_empty() {
                println!("no adapters found");
            }
            for adapter in adapters {
                let info = adapter.get_info();
                println!(
                    "{} ({:?}, {})",
                    info.name,
                    info.device_type,
                    info.backend.to_str()
                );
            }
        }
    }

    Ok(())
}
