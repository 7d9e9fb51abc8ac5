mod line;
mod source;

pub use line::{
    classify, classify_scene_marker, is_comment, ClassifiedLine, SceneMarker, LINE_PATTERNS,
};
pub use source::{normalize_lines, LineShape, SourceLine};
