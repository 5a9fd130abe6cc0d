use super::*;
use kurbo::{RoundedRect, Shape};

const TAIL_POS: f64 = 0.3;
const TAIL_WIDTH: f64 = 0.15;
const TAIL_HEIGHT: f64 = 0.2;
const ROUNDNESS: f64 = 10.0;

pub struct SpeechBubbleIcon;
impl IconShape for SpeechBubbleIcon {
    fn metadata(&self) -> IconMetadata {
        IconMetadata { id: "speech_bubble".to_string(), name: "Speech Bubble".to_string(), category: "symbols".to_string() }
    }

    fn build_path(&self, w: f64, h: f64) -> BezPath {
        let (hw, hh) = (w / 2.0, h / 2.0);
        let tail_h = h * TAIL_HEIGHT;
        let bubble_bottom = hh - tail_h;
        let r = ROUNDNESS.min(hw).min((h - tail_h) / 2.0);

        let mut path = RoundedRect::new(-hw, -hh, hw, bubble_bottom, r).to_path(0.1);

        // Tail as a separate subpath overlapping the bubble's bottom edge.
        let tail_x = -hw + w * TAIL_POS;
        let tail_w = w * TAIL_WIDTH;
        path.move_to((tail_x - tail_w / 2.0, bubble_bottom - 1.0));
        path.line_to((tail_x, hh));
        path.line_to((tail_x + tail_w / 2.0, bubble_bottom - 1.0));
        path.close_path();
        path
    }
}
