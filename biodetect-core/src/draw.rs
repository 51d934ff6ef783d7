//! Annotating frames with detection reports.

use image::{Rgb, RgbImage};
use imageproc::drawing;
use imageproc::rect::Rect;

use crate::detect::Report;
use crate::detect::head::FaceBox;
use crate::landmark::Landmark;

const MARKER: Rgb<u8> = Rgb([255, 0, 0]);
const BONE: Rgb<u8> = Rgb([0, 255, 0]);
const FACE: Rgb<u8> = Rgb([0, 0, 255]);
const MARKER_RADIUS: i32 = 3;

// Shoulder, elbow, wrist on each side, joined at the shoulders
const ARM_CONNECTIVITY: &[(usize, usize)] = &[(0, 1), (1, 2), (3, 4), (4, 5), (0, 3)];

const HAND_CONNECTIVITY: &[(usize, usize)] = &[
    // palm
    (0, 1),
    (1, 5),
    (5, 9),
    (9, 13),
    (13, 17),
    (17, 0),
    // thumb
    (1, 2),
    (2, 3),
    (3, 4),
    // index
    (5, 6),
    (6, 7),
    (7, 8),
    // middle
    (9, 10),
    (10, 11),
    (11, 12),
    // ring
    (13, 14),
    (14, 15),
    (15, 16),
    // pinky
    (17, 18),
    (18, 19),
    (19, 20),
];

const POSE_CONNECTIVITY: &[(usize, usize)] = &[
    // torso
    (11, 12),
    (11, 23),
    (12, 24),
    (23, 24),
    // arms
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
    // legs
    (23, 25),
    (25, 27),
    (24, 26),
    (26, 28),
];

pub fn annotate(img: &mut RgbImage, report: &Report) {
    match report {
        Report::Arm(r) => {
            let points: Vec<_> = r.landmarks.iter().map(|l| (l.x as f32, l.y as f32)).collect();
            draw_skeleton(img, &points, ARM_CONNECTIVITY);
        }
        Report::ArmFingers(r) => {
            for hand in &r.hands {
                let points: Vec<_> = hand.landmarks.iter().map(|l| (l.x as f32, l.y as f32)).collect();
                draw_skeleton(img, &points, HAND_CONNECTIVITY);
            }
        }
        Report::Eyes(r) => {
            for lm in &r.landmarks {
                draw_marker(img, lm.x as f32, lm.y as f32);
            }
        }
        Report::Head(r) => {
            for face in &r.faces {
                draw_face(img, face);
            }
        }
        Report::People(r) => {
            let points: Vec<_> = r.landmarks.iter().map(|l: &Landmark| (l.x as f32, l.y as f32)).collect();
            draw_skeleton(img, &points, POSE_CONNECTIVITY);
        }
    }
}

fn draw_skeleton(img: &mut RgbImage, points: &[(f32, f32)], connectivity: &[(usize, usize)]) {
    for &(a, b) in connectivity {
        if let (Some(&a), Some(&b)) = (points.get(a), points.get(b)) {
            drawing::draw_line_segment_mut(img, a, b, BONE);
        }
    }
    for &(x, y) in points {
        draw_marker(img, x, y);
    }
}

fn draw_marker(img: &mut RgbImage, x: f32, y: f32) {
    drawing::draw_filled_circle_mut(img, (x as i32, y as i32), MARKER_RADIUS, MARKER);
}

fn draw_face(img: &mut RgbImage, face: &FaceBox) {
    if face.width <= 0 || face.height <= 0 {
        return;
    }
    let rect = Rect::at(face.xmin, face.ymin).of_size(face.width as u32, face.height as u32);
    drawing::draw_hollow_rect_mut(img, rect, FACE);
}
