//! Global pointer polling

use crate::types::PointerState;

/// Source of the current pointer position and primary button state
pub trait PointerSource: Send {
    /// Snapshot in desktop coordinates
    fn pointer(&self) -> PointerState;
}

#[cfg(windows)]
pub use device_query_backend::DeviceQueryPointer;

#[cfg(windows)]
mod device_query_backend {
    use device_query::{DeviceQuery, DeviceState};

    use super::PointerSource;
    use crate::types::{Point, PointerState};

    /// Polls the OS pointer through device_query
    #[derive(Debug, Default)]
    pub struct DeviceQueryPointer;

    impl PointerSource for DeviceQueryPointer {
        fn pointer(&self) -> PointerState {
            let mouse = DeviceState::new().get_mouse();
            PointerState {
                position: Point::new(mouse.coords.0, mouse.coords.1),
                // Index 1 is the left button
                primary_pressed: mouse.button_pressed.get(1).copied().unwrap_or(false),
            }
        }
    }
}
