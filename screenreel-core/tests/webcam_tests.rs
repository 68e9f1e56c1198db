//! Integration tests for the webcam acquisition loop

mod mocks;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mocks::MockCamera;
use screenreel_core::capture::WebcamSource;
use screenreel_core::error::ReelError;
use screenreel_core::types::Frame;

fn wait_for(mut condition: impl FnMut() -> bool, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn test_no_devices_is_device_unavailable() {
    let (camera, _) = MockCamera::with_devices(Vec::new(), 4, 4, [0, 0, 0, 255]);
    let mut webcam = WebcamSource::new(Arc::new(camera));

    let err = webcam.initialize(0).unwrap_err();
    assert!(matches!(err, ReelError::DeviceUnavailable(_)));
    assert!(webcam.start().is_err());
}

#[test]
fn test_out_of_range_index_falls_back_to_first() {
    let (camera, state) = MockCamera::new(4, 4, [0, 0, 0, 255]);
    let mut webcam = WebcamSource::new(Arc::new(camera));

    webcam.initialize(7).unwrap();
    assert_eq!(webcam.device_index(), Some(0));
    webcam.start().unwrap();
    assert_eq!(*state.opened_index.lock(), Some(0));
}

#[test]
fn test_start_delivers_frames() {
    let (camera, state) = MockCamera::new(6, 4, [1, 2, 3, 255]);
    let mut webcam = WebcamSource::new(Arc::new(camera));
    webcam.initialize(1).unwrap();
    webcam.start().unwrap();

    assert!(webcam.is_running());
    assert_eq!(webcam.resolution(), Some((6, 4)));
    assert!(wait_for(|| webcam.frames_acquired() > 0, Duration::from_secs(5)));

    let mut frame = Frame::default();
    assert!(webcam.copy_frame_into(&mut frame));
    assert_eq!((frame.width, frame.height), (6, 4));
    assert_eq!(frame.pixel(5, 3), Some([1, 2, 3, 255]));

    // Starting again while running is a no-op
    webcam.start().unwrap();
    assert_eq!(state.live_streams.load(Ordering::SeqCst), 1);

    webcam.stop();
    webcam.stop();
    assert!(!webcam.is_running());
    assert_eq!(state.live_streams.load(Ordering::SeqCst), 0);
}

#[test]
fn test_open_failure_reported_from_start() {
    let (camera, state) = MockCamera::new(4, 4, [0, 0, 0, 255]);
    state.fail_open.store(true, Ordering::SeqCst);
    let mut webcam = WebcamSource::new(Arc::new(camera));
    webcam.initialize(0).unwrap();

    let err = webcam.start().unwrap_err();
    assert!(matches!(err, ReelError::DeviceUnavailable(_)));
    assert!(!webcam.is_running());

    // Device becomes available again
    state.fail_open.store(false, Ordering::SeqCst);
    webcam.start().unwrap();
    assert!(webcam.is_running());
}

#[test]
fn test_cleanup_clears_cache() {
    let (camera, state) = MockCamera::new(4, 4, [9, 9, 9, 255]);
    let mut webcam = WebcamSource::new(Arc::new(camera));
    webcam.initialize(0).unwrap();
    webcam.start().unwrap();
    assert!(wait_for(|| webcam.get_frame().is_some(), Duration::from_secs(5)));

    webcam.cleanup();
    assert!(webcam.get_frame().is_none());
    assert_eq!(webcam.device_index(), None);
    assert_eq!(state.live_streams.load(Ordering::SeqCst), 0);
}

#[test]
fn test_repeated_errors_end_the_loop() {
    let (camera, state) = MockCamera::new(4, 4, [0, 0, 0, 255]);
    let mut webcam = WebcamSource::new(Arc::new(camera));
    webcam.initialize(0).unwrap();
    webcam.start().unwrap();

    state.fail_reads.store(true, Ordering::SeqCst);
    assert!(wait_for(|| !webcam.is_running(), Duration::from_secs(10)));
    assert!(webcam
        .failure()
        .map(|f| f.contains("unplugged"))
        .unwrap_or(false));

    // A fresh start clears the failure
    state.fail_reads.store(false, Ordering::SeqCst);
    webcam.start().unwrap();
    assert!(webcam.failure().is_none());
}
