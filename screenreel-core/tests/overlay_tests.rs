//! Integration tests for the software compositor

mod mocks;

use mocks::solid_frame;
use screenreel_core::overlay::{
    composite_pip, draw_cursor, draw_highlight, pip_size, Color, CURSOR_HEIGHT, CURSOR_WIDTH,
};
use screenreel_core::types::{Frame, Point};

#[test]
fn test_pip_nearest_neighbour_2x2_into_4x4() {
    // 2x2 webcam: four distinct pixels
    let pip: Vec<u8> = [
        [10, 0, 0, 0],
        [20, 0, 0, 0],
        [30, 0, 0, 0],
        [40, 0, 0, 0],
    ]
    .concat();
    let mut screen = solid_frame(8, 20, [0, 0, 0, 255]);

    // 20 rows at 0.2 gives a 4x4 PIP
    assert_eq!(pip_size(20, 2, 2, 0.2), (4, 4));
    composite_pip(&mut screen.data, 8, 20, &pip, 2, 2, Point::new(0, 0), 0.2);

    let expect = |x: u32, y: u32, b: u8| {
        assert_eq!(screen.pixel(x, y), Some([b, 0, 0, 255]), "pixel ({}, {})", x, y);
    };
    expect(0, 0, 10);
    expect(1, 1, 10);
    expect(2, 0, 20);
    expect(3, 1, 20);
    expect(0, 2, 30);
    expect(1, 3, 30);
    expect(2, 2, 40);
    expect(3, 3, 40);
    assert_eq!(screen.pixel(4, 0), Some([0, 0, 0, 255]));
    assert_eq!(screen.pixel(0, 4), Some([0, 0, 0, 255]));
}

#[test]
fn test_pip_nearest_neighbour_4x4_into_2x2() {
    // 4x4 webcam: blue channel encodes the source index times ten
    let pip: Vec<u8> = (0..16u8).flat_map(|i| [i * 10, 0, 0, 255]).collect();
    let mut screen = solid_frame(6, 10, [0, 0, 0, 255]);

    // 10 rows at 0.2 gives a 2x2 PIP
    assert_eq!(pip_size(10, 4, 4, 0.2), (2, 2));
    composite_pip(&mut screen.data, 6, 10, &pip, 4, 4, Point::new(1, 1), 0.2);

    // src_x = x*4/2, src_y = y*4/2
    let expect = |x: u32, y: u32, b: u8| {
        assert_eq!(screen.pixel(x, y), Some([b, 0, 0, 255]), "pixel ({}, {})", x, y);
    };
    expect(1, 1, 0);
    expect(2, 1, 20);
    expect(1, 2, 80);
    expect(2, 2, 100);
    assert_eq!(screen.pixel(3, 1), Some([0, 0, 0, 255]));
    assert_eq!(screen.pixel(1, 3), Some([0, 0, 0, 255]));
    assert_eq!(screen.pixel(0, 0), Some([0, 0, 0, 255]));
}

#[test]
fn test_pip_forces_opaque_alpha() {
    let pip = vec![200, 100, 50, 0];
    let mut screen = solid_frame(10, 10, [0, 0, 0, 7]);
    composite_pip(&mut screen.data, 10, 10, &pip, 1, 1, Point::new(3, 3), 0.5);
    assert_eq!(screen.pixel(3, 3), Some([200, 100, 50, 255]));
    assert_eq!(screen.pixel(2, 3), Some([0, 0, 0, 7]));
}

#[test]
fn test_pip_clipped_at_negative_origin() {
    let pip = solid_frame(4, 4, [9, 9, 9, 255]);
    let mut screen = solid_frame(10, 10, [0, 0, 0, 255]);

    // 5x5 PIP with its top-left two pixels off screen
    composite_pip(&mut screen.data, 10, 10, &pip.data, 4, 4, Point::new(-2, -2), 0.5);
    assert_eq!(screen.pixel(0, 0), Some([9, 9, 9, 255]));
    assert_eq!(screen.pixel(2, 2), Some([9, 9, 9, 255]));
    assert_eq!(screen.pixel(3, 3), Some([0, 0, 0, 255]));
}

#[test]
fn test_pip_fully_offscreen_is_noop() {
    let pip = solid_frame(4, 4, [9, 9, 9, 255]);
    let mut screen = solid_frame(10, 10, [1, 2, 3, 255]);
    let before = screen.clone();

    composite_pip(&mut screen.data, 10, 10, &pip.data, 4, 4, Point::new(50, 50), 0.5);
    composite_pip(&mut screen.data, 10, 10, &pip.data, 4, 4, Point::new(-20, 0), 0.5);
    assert_eq!(screen, before);
}

#[test]
fn test_highlight_boundary_is_inclusive() {
    let mut frame = solid_frame(64, 64, [100, 100, 100, 77]);
    draw_highlight(
        &mut frame.data,
        64,
        64,
        Point::new(32, 32),
        10,
        Color::rgba(255, 255, 0, 100),
    );

    let inside = frame.pixel(42, 32).unwrap();
    assert_ne!(&inside[..3], &[100, 100, 100]);
    // Alpha byte is never touched
    assert_eq!(inside[3], 77);

    // dx=7, dy=7: 98 <= 100
    assert_ne!(frame.pixel(39, 39), Some([100, 100, 100, 77]));
    // dx=8, dy=7: 113 > 100
    assert_eq!(frame.pixel(40, 39), Some([100, 100, 100, 77]));
    assert_eq!(frame.pixel(43, 32), Some([100, 100, 100, 77]));
}

#[test]
fn test_highlight_blend_truncates() {
    let mut frame = solid_frame(3, 3, [100, 100, 100, 255]);
    draw_highlight(
        &mut frame.data,
        3,
        3,
        Point::new(1, 1),
        0,
        Color::rgba(255, 255, 0, 100),
    );

    // a = 100/255; B: 100*(1-a) = 60.78, G/R: 60.78 + 100 = 160.78
    assert_eq!(frame.pixel(1, 1), Some([60, 160, 160, 255]));
    assert_eq!(frame.pixel(0, 1), Some([100, 100, 100, 255]));
}

#[test]
fn test_highlight_clipped_at_corner() {
    let mut frame = solid_frame(20, 20, [0, 0, 0, 255]);
    draw_highlight(
        &mut frame.data,
        20,
        20,
        Point::new(0, 0),
        25,
        Color::rgba(255, 0, 0, 150),
    );
    assert_ne!(frame.pixel(0, 0), Some([0, 0, 0, 255]));
    assert_ne!(frame.pixel(17, 17), Some([0, 0, 0, 255]));
    assert_eq!(frame.pixel(19, 19), Some([0, 0, 0, 255]));
}

#[test]
fn test_cursor_keeps_alpha_and_clips() {
    let mut frame = solid_frame(30, 30, [128, 128, 128, 9]);
    draw_cursor(&mut frame.data, 30, 30, Point::new(25, 25));

    assert_eq!(frame.pixel(25, 25), Some([0, 0, 0, 9]));
    assert_eq!(frame.data.len(), 30 * 30 * 4);

    let mut frame = Frame::black(CURSOR_WIDTH as u32, CURSOR_HEIGHT as u32);
    draw_cursor(
        &mut frame.data,
        CURSOR_WIDTH as u32,
        CURSOR_HEIGHT as u32,
        Point::new(0, 0),
    );
    // Second column of row 3 is fill
    assert_eq!(frame.pixel(1, 3), Some([255, 255, 255, 255]));
}
