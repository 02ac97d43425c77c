use std::process::ExitCode;

use mogl_engine::device::GpuInit;
use mogl_engine::logging::{init_logging, LoggingConfig};
use mogl_engine::window::{Runtime, RuntimeConfig};

mod app;

use app::{QuadApp, QuadConfig};

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let app = QuadApp::new(QuadConfig::default());

    match Runtime::run(RuntimeConfig::default(), GpuInit::default(), app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("mogl failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
