mod host;

use std::path::PathBuf;

use pathcanvas::view::settings::load_settings;
use pathcanvas::view::{Canvas, EngineSettings};

/// Usage: `pathcanvas [pathway.json] [settings.toml]`
fn main() -> eframe::Result<()> {
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let path = args.next();
    let settings = match args.next() {
        Some(p) => load_settings(&p).unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to default settings");
            EngineSettings::default()
        }),
        None => EngineSettings::default(),
    };
    let (pathway, status) = host::load_pathway(path.as_ref());
    let canvas = Canvas::new(pathway).with_settings(settings);

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Pathway canvas",
        native_options,
        Box::new(move |cc| {
            let app = host::HostApp::new(cc, canvas, host::render::PainterTable::default(), path)
                .with_status(status);
            Ok(Box::new(app))
        }),
    )
}
