//! Bounding-box overlap and suppression shared by the detection backends.

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Greedy NMS: sort by score descending, suppress overlapping boxes.
///
/// `key` yields `(bbox, score)` for each candidate.
pub fn nms<T: Clone>(items: &mut [T], iou_thresh: f64, key: impl Fn(&T) -> ([f64; 4], f32)) -> Vec<T> {
    items.sort_by(|a, b| key(b).1.total_cmp(&key(a).1));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; items.len()];

    for i in 0..items.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(items[i].clone());
        let (bi, _) = key(&items[i]);
        for j in (i + 1)..items.len() {
            if suppressed[j] {
                continue;
            }
            if bbox_iou(&bi, &key(&items[j]).0) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}
