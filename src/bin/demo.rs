//! Command-line entry point: loads an OBJ mesh (and optional BMP texture),
//! opens a window and runs the renderer against it.
//!
//! Usage: `demo <mesh.obj> [texture.bmp] [width] [height]`

use std::path::Path;

use tile_rend::app::App;
use tile_rend::orchestrator::{Orchestrator, RenderConfig};
use tile_rend::resources::{load_bmp, load_obj};
use tile_rend::scene::Scene;
use winit::event_loop::EventLoop;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let mesh_path = args.next().unwrap_or_else(|| {
        eprintln!("usage: demo <mesh.obj> [texture.bmp] [width] [height]");
        std::process::exit(1);
    });
    let texture_path = args.next().filter(|p| !p.is_empty());
    let width: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(1024);
    let height: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(768);

    let mesh_path = Path::new(&mesh_path);
    let mesh = load_obj(mesh_path)?;
    let texture = texture_path.as_deref().map(|p| load_bmp(Path::new(p))).transpose()?;

    let scene = Scene::new(width as f32 / height as f32);
    let mut orchestrator = Orchestrator::new(RenderConfig::default(), mesh, texture, width, height);
    orchestrator.load_meshlets_or_build(mesh_path);

    let event_loop = EventLoop::new()?;
    let mut app = App::new("tile_rend", width, height, scene, orchestrator);
    event_loop.run_app(&mut app)?;
    Ok(())
}
