// SPDX-License-Identifier: GPL-3.0-only

use crate::{Timber, state::State};
use smithay::{
    backend::{
        renderer::{damage::OutputDamageTracker, glow::GlowRenderer},
        winit::{self, WinitEvent, WinitGraphicsBackend},
    },
    output::{Mode, Output, PhysicalProperties, Subpixel},
    reexports::calloop::EventLoop,
    utils::Transform,
};
use std::time::Duration;

#[derive(Debug)]
pub struct WinitState {
    pub backend: WinitGraphicsBackend<GlowRenderer>,
    pub output: Output,
    pub damage_tracker: OutputDamageTracker,
    pub shaders: crate::render::Shaders,
}

impl WinitState {
    pub fn render(&mut self, state: &mut State) -> Result<(), Box<dyn std::error::Error>> {
        let age = self.backend.buffer_age().unwrap_or(0);
        let (renderer, mut fb) = self.backend.bind()?;

        let result = crate::render::render_output(
            renderer,
            &mut fb,
            &mut self.damage_tracker,
            age,
            state,
            &self.output,
            &self.shaders,
        )?;

        std::mem::drop(fb);
        self.backend.submit(result.damage.map(|x| x.as_slice()))?;

        let elapsed = state.start_time.elapsed();
        let output = self.output.clone();

        // frame callbacks for every visible client
        if let Some(screen) = state.screen_by_output(&output) {
            for id in state.visible_clients(screen) {
                state.clients[id]
                    .window
                    .send_frame(&output, elapsed, Some(Duration::ZERO), |_, _| {
                        Some(output.clone())
                    });
            }
        }

        state.popups.cleanup();
        self.backend.window().request_redraw();
        Ok(())
    }
}

pub fn init(
    event_loop: &mut EventLoop<Timber>,
    timber: &mut Timber,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut backend, winit) = winit::init()?;
    let shaders = crate::render::compile_shaders(backend.renderer());

    let mode = Mode {
        size: backend.window_size(),
        refresh: 60_000,
    };

    let output = Output::new(
        "winit".to_string(),
        PhysicalProperties {
            size: (0, 0).into(),
            subpixel: Subpixel::Unknown,
            make: "Smithay".into(),
            model: "Winit".into(),
            serial_number: "Unknown".into(),
        },
    );

    // the global id is not needed for winit
    let _global = output.create_global::<Timber>(&timber.state.display_handle);
    output.change_current_state(
        Some(mode),
        Some(Transform::Flipped180),
        None,
        Some((0, 0).into()),
    );
    output.set_preferred(mode);

    timber.state.add_screen(output.clone());

    let damage_tracker = OutputDamageTracker::from_output(&output);

    timber.backend = crate::backend::Backend::Winit(WinitState {
        backend,
        output,
        damage_tracker,
        shaders,
    });

    event_loop
        .handle()
        .insert_source(winit, move |event, _, timber| {
            match event {
                WinitEvent::Resized { size, .. } => {
                    let output = timber.backend.winit().output.clone();
                    output.change_current_state(
                        Some(Mode {
                            size,
                            refresh: 60_000,
                        }),
                        None,
                        None,
                        None,
                    );
                    timber.state.output_resized(&output);
                }
                WinitEvent::Input(event) => timber.process_input_event(event),
                WinitEvent::Redraw => {
                    let ws = timber.backend.winit();
                    if let Err(err) = ws.render(&mut timber.state) {
                        tracing::error!(?err, "Failed to render frame.");
                    }
                }
                WinitEvent::CloseRequested => {
                    // the only output is gone: drop its screen and stop
                    let output = timber.backend.winit().output.clone();
                    if let Some(idx) = timber.state.screen_by_output(&output)
                        && timber.state.remove_screen(idx)
                    {
                        return;
                    }
                    timber.state.loop_signal.stop();
                }
                _ => (),
            };
        })?;

    Ok(())
}
