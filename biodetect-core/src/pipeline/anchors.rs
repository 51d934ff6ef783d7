use crate::shapes::point::PointF32;

/// Anchor grid for a single-shot detector with fixed size anchors
/// (MediaPipe's `SsdAnchorsCalculator` with `fixed_anchor_size: true`).
///
/// Consecutive layers sharing a stride are merged into one feature map.
/// Every layer contributes two anchors per cell: aspect ratio 1.0 and the
/// interpolated scale. Since anchors are fixed size only centers matter.
#[derive(Debug, Clone, Copy)]
pub struct AnchorOptions {
    pub input_width: u32,
    pub input_height: u32,
    pub strides: &'static [u32],
}

pub const FACE_SHORT_RANGE: AnchorOptions = AnchorOptions {
    input_width: 128,
    input_height: 128,
    strides: &[8, 16, 16, 16],
};

pub const PALM: AnchorOptions = AnchorOptions {
    input_width: 192,
    input_height: 192,
    strides: &[8, 16, 16, 16],
};

const ANCHORS_PER_LAYER: usize = 2;

pub fn gen_anchors(opts: &AnchorOptions) -> Vec<PointF32> {
    let mut anchors = Vec::new();

    let mut layer_id = 0;
    while layer_id < opts.strides.len() {
        let stride = opts.strides[layer_id];

        let mut last_same_stride_layer = layer_id;
        while last_same_stride_layer < opts.strides.len()
            && opts.strides[last_same_stride_layer] == stride
        {
            last_same_stride_layer += 1;
        }
        let per_cell = (last_same_stride_layer - layer_id) * ANCHORS_PER_LAYER;

        let fm_height = opts.input_height.div_ceil(stride);
        let fm_width = opts.input_width.div_ceil(stride);

        for y in 0..fm_height {
            for x in 0..fm_width {
                let center = PointF32::new(
                    (x as f32 + 0.5) / fm_width as f32,
                    (y as f32 + 0.5) / fm_height as f32,
                );
                anchors.extend(std::iter::repeat_n(center, per_cell));
            }
        }

        layer_id = last_same_stride_layer;
    }

    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_anchor_count() {
        let anchors = gen_anchors(&FACE_SHORT_RANGE);
        assert_eq!(anchors.len(), 896);

        assert_eq!(anchors[0], PointF32::new(0.5 / 16., 0.5 / 16.));
        assert_eq!(anchors[1], anchors[0]);
        assert_eq!(anchors[2], PointF32::new(1.5 / 16., 0.5 / 16.));

        // first anchor of the merged 16px stride layers
        assert_eq!(anchors[512], PointF32::new(0.5 / 8., 0.5 / 8.));
        assert_eq!(anchors[517], anchors[512]);
        assert_eq!(anchors[518], PointF32::new(1.5 / 8., 0.5 / 8.));
    }

    #[test]
    fn test_palm_anchor_count() {
        let anchors = gen_anchors(&PALM);
        assert_eq!(anchors.len(), 2016);
        assert_eq!(anchors[2015], PointF32::new(11.5 / 12., 11.5 / 12.));
    }
}
