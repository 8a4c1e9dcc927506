/// Video identifier of a keyframe path: its first non-empty `/` segment.
///
/// `L01_V001/000123.jpg` and `/L01_V001/000123.jpg` both map to `L01_V001`.
/// Surrounding whitespace in the segment is dropped.
/// Returns `None` for paths with no segment at all.
pub fn video_id_of(path: &str) -> Option<&str> {
    path.split('/')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
}
