//! Devices command - list webcams and audio endpoints

use anyhow::{Context, Result};
use screenreel_core::types::AudioFlow;
use screenreel_core::Backends;
use tracing::warn;

/// Print every camera and audio endpoint the recorder can open
pub async fn devices() -> Result<()> {
    let backends = Backends::native().context("No capture backends on this platform")?;

    println!("ScreenReel - Capture Devices\n");

    println!("Webcams:");
    match backends.camera.list_devices() {
        Ok(cameras) if cameras.is_empty() => println!("  (none)"),
        Ok(cameras) => {
            for (index, name) in cameras.iter().enumerate() {
                println!("  [{}] {}", index, name);
            }
        }
        Err(e) => {
            warn!("Camera enumeration failed: {}", e);
            println!("  (unavailable: {})", e);
        }
    }
    println!();

    for (title, flow) in [
        ("Microphones", AudioFlow::Capture),
        ("Speakers", AudioFlow::Render),
    ] {
        println!("{}:", title);
        let default = backends.audio.resolve(flow).ok().map(|d| d.name);
        match backends.audio.list(flow) {
            Ok(names) if names.is_empty() => println!("  (none)"),
            Ok(names) => {
                for name in names {
                    let marker = if default.as_deref() == Some(name.as_str()) {
                        " (default)"
                    } else {
                        ""
                    };
                    println!("  {}{}", name, marker);
                }
            }
            Err(e) => println!("  (unavailable: {})", e),
        }
        println!();
    }

    println!("Use 'screenreel record --webcam <index>' to add a webcam overlay.");

    Ok(())
}
