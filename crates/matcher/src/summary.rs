use hashbrown::HashMap;

use crate::types::{FusedFrame, VideoSummary};
use crate::video::video_id_of;

/// Reduces a frame list to one card per video.
///
/// Cards are ordered by `contexts_matched` (descending); ties keep the order
/// in which videos first appear in `frames`. Frames whose video cannot be
/// determined are skipped.
pub fn summarize(frames: &[FusedFrame], sample_frames: usize) -> Vec<VideoSummary> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&FusedFrame>)> = Vec::new();

    for frame in frames {
        let video_id = if frame.item.video_id.is_empty() {
            video_id_of(&frame.item.path)
        } else {
            Some(frame.item.video_id.as_str())
        };
        let Some(video_id) = video_id else {
            continue;
        };
        let slot = *positions.entry(video_id).or_insert_with(|| {
            groups.push((video_id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(frame);
    }

    let mut summaries: Vec<VideoSummary> = groups
        .into_iter()
        .filter_map(|(video_id, members)| {
            let first = members.first()?;
            // first maximum wins on ties
            let best = members.iter().skip(1).fold(*first, |best, frame| {
                if frame.item.score > best.item.score {
                    *frame
                } else {
                    best
                }
            });
            let avg_score = members
                .iter()
                .map(|f| f64::from(f.item.score))
                .sum::<f64>()
                / members.len() as f64;

            Some(VideoSummary {
                video_id: video_id.to_string(),
                contexts_matched: first.contexts_matched(),
                total_frames: members.len(),
                avg_score,
                best_frame: best.clone(),
                sample_frames: members
                    .iter()
                    .take(sample_frames)
                    .map(|f| (*f).clone())
                    .collect(),
            })
        })
        .collect();

    summaries.sort_by(|a, b| b.contexts_matched.cmp(&a.contexts_matched));
    summaries
}
