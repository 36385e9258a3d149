use anyhow::{Context, Result};
use log::{error, info};

use libxsvf::xsvf::player::Xsvf;
use libxsvf::xsvf::XsvfError;

mod demo_vector;

fn setup_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .filter(|meta| !meta.target().contains("xsvf::tap"))
        .apply()?;
    Ok(())
}

#[cfg(feature = "ftdi")]
fn play(data: &[u8]) -> std::result::Result<usize, XsvfError> {
    use libxsvf::interface::ftdi_bitbang::FtdiBitBang;

    let interface = FtdiBitBang::new(0x0403, 0x6010);
    let mut xsvf = Xsvf::new(data, interface);
    xsvf.run_to_completion().map(|()| xsvf.bytes_processed())
}

#[cfg(not(feature = "ftdi"))]
fn play(data: &[u8]) -> std::result::Result<usize, XsvfError> {
    use libxsvf::interface::sim::SimTap;

    info!("no hardware backend selected, dry-running against the TAP simulator");
    let mut xsvf = Xsvf::new(data, SimTap::new());
    xsvf.run_to_completion().map(|()| xsvf.bytes_processed())
}

fn main() -> Result<()> {
    setup_logger().context("logger setup failed")?;

    info!(
        "starting XSVF playback, {} bytes of vector data",
        demo_vector::DEMO_VECTOR.len()
    );
    match play(demo_vector::DEMO_VECTOR) {
        Ok(bytes) => {
            info!("playback complete, {} bytes processed", bytes);
            Ok(())
        }
        Err(e) => {
            error!("playback failed: {}", e);
            Err(e.into())
        }
    }
}
