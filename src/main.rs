// SPDX-License-Identifier: GPL-3.0-only

use anyhow::Context;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("run") => {
            init_logging();
            if let Err(err) = run() {
                eprintln!("timber: {err:#}");
                std::process::exit(1);
            }
        }
        // any other invocation is a client command
        _ => std::process::exit(timber::control::remote::run(&args)),
    }
}

fn run() -> anyhow::Result<()> {
    let (mut event_loop, mut timber) = timber::Timber::new();

    timber::backend::winit::init(&mut event_loop, &mut timber)
        .map_err(|err| anyhow::anyhow!("winit backend: {err}"))?;

    unsafe {
        std::env::remove_var("DISPLAY");
        std::env::set_var("WAYLAND_DISPLAY", &timber.state.socket);
        std::env::set_var("XDG_SESSION_TYPE", "wayland");
        std::env::set_var("XDG_CURRENT_DESKTOP", "timber");
    }

    let display = timber.state.socket.to_string_lossy().into_owned();
    timber::control::init(&event_loop.handle(), &display).context("control socket")?;
    timber::control::init_signals(&event_loop.handle()).context("signal handling")?;

    // the config script typically issues `binding add` commands
    if let Ok(config) = std::env::var("TMBR_CONFIG_PATH") {
        timber::control::spawn(&config, &[]);
    }

    event_loop.run(None, &mut timber, |timber| timber.state.flush_clients())?;

    Ok(())
}

fn init_logging() {
    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().init();
    }
}
