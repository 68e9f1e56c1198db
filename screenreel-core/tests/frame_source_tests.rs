//! Integration tests for the duplication frame source

mod mocks;

use mocks::{MockScreen, ScreenStep};
use screenreel_core::capture::FrameSource;
use screenreel_core::error::ReelError;
use screenreel_core::types::{CaptureRegion, CropRect, Frame, Point};

#[test]
fn test_capture_before_initialize_fails() {
    let (screen, _) = MockScreen::new(64, 64, [1, 1, 1, 255]);
    let mut source = FrameSource::new(Box::new(screen));
    let mut frame = Frame::default();

    let err = source.capture_frame(&mut frame).unwrap_err();
    assert!(matches!(err, ReelError::AcquisitionUnavailable(_)));
}

#[test]
fn test_initialize_failure_is_acquisition_unavailable() {
    let (screen, state) = MockScreen::new(64, 64, [1, 1, 1, 255]);
    state.lock().fail_open = true;
    let mut source = FrameSource::new(Box::new(screen));

    assert!(matches!(
        source.initialize(),
        Err(ReelError::AcquisitionUnavailable(_))
    ));
    assert!(!source.is_initialized());
}

#[test]
fn test_initialize_is_idempotent() {
    let (screen, state) = MockScreen::new(64, 64, [1, 1, 1, 255]);
    let mut source = FrameSource::new(Box::new(screen));
    source.initialize().unwrap();
    source.initialize().unwrap();
    assert_eq!(state.lock().opens, 1);
    assert_eq!(source.native_dimensions(), Some((64, 64)));
}

#[test]
fn test_crop_copies_region_rows() {
    let (screen, state) = MockScreen::new(40, 30, [7, 7, 7, 255]);
    let mut source = FrameSource::new(Box::new(screen));
    source.initialize().unwrap();
    source.set_region(CaptureRegion::from_origin_size(10, 5, 21, 11));

    // Odd sizes round down to even
    assert_eq!(
        source.crop().unwrap(),
        CropRect {
            x: 10,
            y: 5,
            width: 20,
            height: 10
        }
    );
    assert_eq!(source.capture_origin(), Point::new(10, 5));

    let mut frame = Frame::default();
    source.capture_frame(&mut frame).unwrap();
    assert_eq!((frame.width, frame.height), (20, 10));
    assert_eq!(frame.data.len(), 20 * 10 * 4);
    assert_eq!(frame.pixel(19, 9), Some([7, 7, 7, 255]));
    assert_eq!(state.lock().acquisitions, 1);
}

#[test]
fn test_staging_recreated_only_on_native_resize() {
    let (screen, state) = MockScreen::new(32, 32, [1, 2, 3, 255]);
    let mut source = FrameSource::new(Box::new(screen));
    source.initialize().unwrap();
    let mut frame = Frame::default();

    for _ in 0..5 {
        source.capture_frame(&mut frame).unwrap();
    }
    assert_eq!(source.staging_recreations(), 1);

    state.lock().script.push_back(ScreenStep::Resize(48, 32));
    source.capture_frame(&mut frame).unwrap();
    source.capture_frame(&mut frame).unwrap();
    assert_eq!(source.staging_recreations(), 2);
    assert_eq!((frame.width, frame.height), (48, 32));
    assert_eq!(source.frames_captured(), 7);
}

#[test]
fn test_no_new_frame_leaves_output_untouched() {
    let (screen, state) = MockScreen::new(16, 16, [5, 5, 5, 255]);
    let mut source = FrameSource::new(Box::new(screen));
    source.initialize().unwrap();
    let mut frame = Frame::default();
    source.capture_frame(&mut frame).unwrap();

    state.lock().script.push_back(ScreenStep::Unchanged);
    let err = source.capture_frame(&mut frame).unwrap_err();
    assert!(err.is_soft());
    assert_eq!(frame.pixel(0, 0), Some([5, 5, 5, 255]));
}

#[test]
fn test_region_off_display_is_config_error() {
    let (screen, _) = MockScreen::new(100, 100, [0, 0, 0, 255]);
    let mut source = FrameSource::new(Box::new(screen));
    source.initialize().unwrap();
    source.set_region(CaptureRegion::from_origin_size(-50, -50, 40, 40));

    assert!(matches!(
        source.planned_dimensions(),
        Err(ReelError::Config(_))
    ));
}

#[test]
fn test_reinitialize_and_cleanup() {
    let (screen, state) = MockScreen::new(16, 16, [0, 0, 0, 255]);
    let mut source = FrameSource::new(Box::new(screen));
    source.initialize().unwrap();
    source.reinitialize().unwrap();
    assert_eq!(state.lock().opens, 2);

    source.cleanup();
    source.cleanup();
    assert!(!source.is_initialized());
    assert_eq!(source.native_dimensions(), None);
}

fn capture_gradient_region(crop_readback: bool) -> (Frame, u64, Option<CropRect>) {
    let (screen, state) = MockScreen::new(40, 30, [0, 0, 0, 255]);
    {
        let mut state = state.lock();
        state.gradient = true;
        state.crop_readback = crop_readback;
    }
    let mut source = FrameSource::new(Box::new(screen));
    source.initialize().unwrap();
    source.set_region(CaptureRegion::from_origin_size(10, 5, 21, 11));

    let mut frame = Frame::default();
    for _ in 0..3 {
        source.capture_frame(&mut frame).unwrap();
    }
    let last_crop = state.lock().last_crop;
    (frame, source.staging_recreations(), last_crop)
}

#[test]
fn test_channel_is_asked_for_the_crop() {
    let (_, _, requested) = capture_gradient_region(false);
    assert_eq!(
        requested,
        Some(CropRect {
            x: 10,
            y: 5,
            width: 20,
            height: 10
        })
    );
}

#[test]
fn test_cropped_readback_matches_full_readback() {
    let (full, _, _) = capture_gradient_region(false);
    let (cropped, recreations, _) = capture_gradient_region(true);

    assert_eq!((cropped.width, cropped.height), (20, 10));
    assert_eq!(cropped.pixel(0, 0), Some([10, 5, 0, 255]));
    assert_eq!(cropped.pixel(19, 9), Some([29, 14, 0, 255]));
    assert_eq!(cropped, full);
    assert_eq!(recreations, 1);
}
