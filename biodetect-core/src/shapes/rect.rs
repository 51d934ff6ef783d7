/// Pixel rect, anchored at its top left corner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn from_tl(x: u32, y: u32, w: u32, h: u32) -> Rect {
        Rect { x, y, w, h }
    }

    pub fn left(&self) -> u32 {
        self.x
    }

    pub fn top(&self) -> u32 {
        self.y
    }
}


/// Rect in relative image coordinates (0..1 on both axes), anchored at its centerpoint.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RectF32 {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF32 {
    pub fn from_center(xc: f32, yc: f32, w: f32, h: f32) -> RectF32 {
        RectF32 { x: xc, y: yc, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x - self.w / 2.
    }
    pub fn right(&self) -> f32 {
        self.x + self.w / 2.
    }
    pub fn top(&self) -> f32 {
        self.y - self.h / 2.
    }
    pub fn bottom(&self) -> f32 {
        self.y + self.h / 2.
    }
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    pub fn scale(&mut self, mag: f32) -> RectF32 {
        self.w *= mag;
        self.h *= mag;

        *self
    }

    pub fn shift(&mut self, dx: f32, dy: f32) -> RectF32 {
        self.x += dx;
        self.y += dy;

        *self
    }

    /// Grows the shorter side so the rect is square in pixel space for an
    /// image of the given dimensions.
    pub fn square(&mut self, img_width: u32, img_height: u32) -> RectF32 {
        let w_px = self.w * img_width as f32;
        let h_px = self.h * img_height as f32;
        let side = w_px.max(h_px);

        self.w = side / img_width as f32;
        self.h = side / img_height as f32;

        *self
    }

    /// Pixel rect clamped to the image. `None` when nothing of it is inside.
    pub fn to_pixels(&self, img_width: u32, img_height: u32) -> Option<Rect> {
        let left = (self.left() * img_width as f32).round().max(0.) as u32;
        let top = (self.top() * img_height as f32).round().max(0.) as u32;
        let right = ((self.right() * img_width as f32).round().max(0.) as u32).min(img_width);
        let bottom = ((self.bottom() * img_height as f32).round().max(0.) as u32).min(img_height);

        if left >= right || top >= bottom {
            return None;
        }

        Some(Rect::from_tl(left, top, right - left, bottom - top))
    }

    /// Intersection over union, as a percentage.
    pub fn overlap_pct(&self, other: &RectF32) -> f32 {
        let x_min = self.left().max(other.left());
        let x_max = self.right().min(other.right());
        let y_min = self.top().max(other.top());
        let y_max = self.bottom().min(other.bottom());

        let overlap_area = if x_min < x_max && y_min < y_max {
            (x_max - x_min) * (y_max - y_min)
        } else {
            0.
        };

        let area_delta = self.area() + other.area() - overlap_area;

        if area_delta > 0. {
            overlap_area / area_delta * 100.
        } else {
            0.
        }
    }
}
