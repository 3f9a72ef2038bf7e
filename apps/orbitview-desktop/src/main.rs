mod schedule;

use anyhow::{Context, Result};
use clap::Parser;
use orbitview_common::{SceneConfig, ScenePreset};
use orbitview_render::{FrameOutcome, TestScene};
use orbitview_render_wgpu::{WgpuContext, shaders_for};
use schedule::{Schedule, Ticker};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

const STATS_PERIOD: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "orbitview-desktop", about = "Orbiting test scene in a desktop window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Built-in scene: triangle, cube or cube-no-depth
    #[arg(long, default_value = "cube")]
    scene: ScenePreset,

    /// Scene config file (.yaml, .yml or .json); overrides --scene
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tick source driving the renderer
    #[arg(long, value_enum, default_value_t = Schedule::Refresh)]
    schedule: Schedule,

    /// Tick rate for --schedule interval
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Initial window width in physical pixels
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Initial window height in physical pixels
    #[arg(long, default_value = "720")]
    height: u32,
}

/// Window, device and scene, created together on first resume.
struct Running {
    window: Arc<Window>,
    gpu: WgpuContext,
    scene: TestScene<WgpuContext>,
}

struct OrbitApp {
    config: SceneConfig,
    size: PhysicalSize<u32>,
    ticker: Ticker,
    started: Instant,
    last_stats: Instant,
    running: Option<Running>,
    fatal: Option<anyhow::Error>,
}

impl OrbitApp {
    fn new(config: SceneConfig, size: PhysicalSize<u32>, ticker: Ticker) -> Self {
        let now = Instant::now();
        Self {
            config,
            size,
            ticker,
            started: now,
            last_stats: now,
            running: None,
            fatal: None,
        }
    }

    fn setup(&self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let attrs = Window::default_attributes()
            .with_title("orbitview")
            .with_inner_size(self.size)
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);
        let size = window.inner_size();

        let gpu = WgpuContext::new(window.clone(), size.width, size.height)?;
        let layout = self.config.build_mesh()?.vertex_layout();
        let shaders = shaders_for(&layout, self.config.camera.is_some())?;
        let scene = TestScene::setup(&gpu, &self.config, &shaders)?;

        Ok(Running { window, gpu, scene })
    }

    fn tick(&mut self) {
        let Some(running) = &mut self.running else {
            return;
        };
        let time = self.started.elapsed().as_secs_f64() * 1000.0;
        if let FrameOutcome::Dropped(e) = running.scene.draw(&running.gpu, time) {
            tracing::debug!("tick at {time:.1}ms skipped: {e}");
        }

        if self.last_stats.elapsed() >= STATS_PERIOD {
            let stats = running.scene.stats();
            tracing::info!(
                presented = stats.presented,
                dropped = stats.dropped,
                "frame stats"
            );
            self.last_stats = Instant::now();
        }
    }
}

impl ApplicationHandler for OrbitApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.fatal.is_some() {
            return;
        }

        match self.setup(event_loop) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
                self.started = Instant::now();
            }
            Err(e) => {
                tracing::error!("setup failed: {e:#}");
                self.fatal = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                // aspect ratio and surface size stay at their setup values
                tracing::debug!("ignoring resize to {}x{}", size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                self.tick();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = &self.running else {
            return;
        };
        if self.ticker.poll(Instant::now()) {
            running.window.request_redraw();
        }
        event_loop.set_control_flow(self.ticker.control_flow());
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading scene config {}", path.display()))?,
        None => cli.scene.config(),
    };
    tracing::info!(
        mesh = ?config.mesh,
        depth = config.depth_test,
        schedule = ?cli.schedule,
        "orbitview-desktop starting"
    );

    let event_loop = EventLoop::new()?;
    let ticker = Ticker::new(cli.schedule, cli.fps, Instant::now());
    event_loop.set_control_flow(ticker.control_flow());

    let mut app = OrbitApp::new(config, PhysicalSize::new(cli.width, cli.height), ticker);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
