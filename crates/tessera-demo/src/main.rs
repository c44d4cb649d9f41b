//! Two canvases of spinning sprites.
//!
//! Keys:
//! - Space: attach or detach every sprite of the back canvas to its batch
//! - D: reshuffle depths
//! - Escape: quit

use anyhow::Result;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use tessera_engine::canvas::{Anchor, Camera2D, Projection};
use tessera_engine::coords::{Rect, Vec2, Viewport};
use tessera_engine::core::{App, AppControl, FrameCtx};
use tessera_engine::device::GpuInit;
use tessera_engine::logging::{LoggingConfig, init_logging};
use tessera_engine::paint::{Color, ColorMask};
use tessera_engine::render::SpriteRenderer;
use tessera_engine::sprite::{Shader, Texture};
use tessera_engine::window::{Runtime, RuntimeConfig};
use tessera_engine::{BatchId, Canvas, SpriteDesc, SpriteId, Stage, StageConfig, Transform2D};

const SPRITES: usize = 200;
const CHECKER: u32 = 64;
const BACK: u32 = 0;
const FRONT: u32 = 1;

/// Deterministic sequence for placement and depths.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }
}

fn checker_pixels(size: u32, cell: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            let v = if on { 255 } else { 64 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    pixels
}

struct Placed {
    id: SpriteId,
    home: Vec2,
    spin: f32,
}

struct Scene {
    batch: BatchId,
    back: Vec<Placed>,
    banner: SpriteId,
    batched: bool,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    ToggleBatch,
    Reshuffle,
}

struct Demo {
    stage: Stage,
    renderer: SpriteRenderer,
    scene: Option<Scene>,
    rng: Lcg,
    pending: Vec<Action>,
}

impl Demo {
    fn new() -> Self {
        Self {
            stage: Stage::new(StageConfig::default()),
            renderer: SpriteRenderer::new(),
            scene: None,
            rng: Lcg(0x5eed),
            pending: Vec::new(),
        }
    }

    fn build_scene(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, viewport: Viewport) -> Result<Scene> {
        let texture = Texture::from_rgba8(
            device,
            queue,
            "checker",
            CHECKER,
            CHECKER,
            &checker_pixels(CHECKER, 8),
        )?;

        let world = Projection::from_viewport(viewport, Anchor::Center);
        self.stage.add_canvas(Canvas::new(BACK).with_projection(world))?;
        self.stage.add_canvas(
            Canvas::new(FRONT).with_projection(Projection::from_viewport(viewport, Anchor::TopLeft)),
        )?;

        let batch = self.stage.create_batch(texture.clone(), Shader::sprite())?;

        let mut back = Vec::with_capacity(SPRITES);
        for i in 0..SPRITES {
            let tint = Color::from_straight(self.rng.next_f32(), self.rng.next_f32(), 1.0, 0.9);
            let column = (i % 3) as f32 * 16.0;
            let desc = SpriteDesc::new(texture.clone())
                .with_target_area(Rect::new(column, 0.0, 32.0, 32.0))
                .with_color_mask(ColorMask::vertical(tint, Color::WHITE))
                .with_depth(self.rng.next_f32() * 0.99)
                .in_canvas(BACK);
            let id = self.stage.create_sprite(desc)?;
            self.stage.attach(batch, id)?;

            let home = Vec2::new(
                (self.rng.next_f32() - 0.5) * viewport.width,
                (self.rng.next_f32() - 0.5) * viewport.height,
            );
            back.push(Placed {
                id,
                home,
                spin: self.rng.next_f32() * 2.0 - 1.0,
            });
        }

        let banner = self.stage.create_sprite(
            SpriteDesc::new(texture)
                .with_color_mask(ColorMask::uniform(Color::from_straight(1.0, 0.8, 0.2, 1.0)))
                .with_depth(0.5)
                .in_canvas(FRONT),
        )?;

        log::info!("demo: {} sprites in batch {batch:?}", back.len());
        Ok(Scene {
            batch,
            back,
            banner,
            batched: true,
        })
    }

    fn apply(&mut self, action: Action) -> Result<()> {
        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };
        match action {
            Action::ToggleBatch => {
                for placed in &scene.back {
                    if scene.batched {
                        self.stage.detach(scene.batch, placed.id)?;
                    } else {
                        self.stage.attach(scene.batch, placed.id)?;
                    }
                }
                scene.batched = !scene.batched;
                log::info!("demo: batched = {}", scene.batched);
            }
            Action::Reshuffle => {
                for placed in &scene.back {
                    self.stage.set_depth(placed.id, self.rng.next_f32() * 0.99)?;
                }
                log::info!("demo: depths reshuffled");
            }
        }
        Ok(())
    }
}

impl App for Demo {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return AppControl::Continue;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
            PhysicalKey::Code(KeyCode::Space) => self.pending.push(Action::ToggleBatch),
            PhysicalKey::Code(KeyCode::KeyD) => self.pending.push(Action::Reshuffle),
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let (w, h) = ctx.window.physical_size();
        let viewport = Viewport::new(w, h);
        if !viewport.is_valid() {
            return AppControl::Continue;
        }

        if self.scene.is_none() {
            match self.build_scene(ctx.gpu.device(), ctx.gpu.queue(), viewport) {
                Ok(scene) => self.scene = Some(scene),
                Err(e) => {
                    log::error!("demo: scene setup failed: {e:#}");
                    return AppControl::Exit;
                }
            }
        }

        for action in std::mem::take(&mut self.pending) {
            if let Err(e) = self.apply(action) {
                log::warn!("demo: {action:?} failed: {e}");
            }
        }

        let t = ctx.time.elapsed;
        if let Ok(back) = self.stage.canvas_mut(BACK) {
            back.set_projection(Projection::from_viewport(viewport, Anchor::Center));
            back.set_camera(Camera2D {
                rotation: (t * 0.1).sin() * 0.2,
                ..Camera2D::IDENTITY
            });
        }
        if let Ok(front) = self.stage.canvas_mut(FRONT) {
            front.set_projection(Projection::from_viewport(viewport, Anchor::TopLeft));
        }

        let Some(scene) = self.scene.as_ref() else {
            return AppControl::Continue;
        };
        let (stage, renderer) = (&mut self.stage, &mut self.renderer);

        ctx.render(Color::from_rgba8(18, 20, 28, 255), |rctx, target| {
            let mut backend = renderer.backend(rctx, target);

            for placed in &scene.back {
                let transform = Transform2D::at(placed.home).with_rotation(t * placed.spin);
                if let Err(e) = stage.draw_sprite(placed.id, transform, &mut backend) {
                    log::warn!("demo: {:?} not drawn: {e}", placed.id);
                }
            }
            let banner = Transform2D::at(Vec2::new(48.0, 48.0)).with_scale(Vec2::splat(1.0 + 0.1 * t.sin()));
            if let Err(e) = stage.draw_sprite(scene.banner, banner, &mut backend) {
                log::warn!("demo: banner not drawn: {e}");
            }
            if let Err(e) = stage.draw_batch(scene.batch, &mut backend) {
                log::warn!("demo: batch not drawn: {e}");
            }
        })
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "tessera sprites".to_string(),
        ..RuntimeConfig::default()
    };
    let gpu = GpuInit {
        present_mode: wgpu::PresentMode::AutoVsync,
        ..GpuInit::default()
    };
    Runtime::run(config, gpu, Demo::new())
}
