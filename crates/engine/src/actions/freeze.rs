//! Freeze-frame insertion.
//!
//! The only asynchronous verb. The frame under the playhead is decoded and
//! stored as a still first; the timeline is touched only after both
//! succeed, in one command.

use splice_common::timeline_to_source;
use splice_timeline::{generate_id, TimelineError, TimelineItem};
use tracing::{debug, warn};

use crate::collaborators::{AssetStore, FrameDecoder};
use crate::engine::TimelineEngine;
use crate::error::EngineResult;

impl TimelineEngine {
    /// Hold the frame under the playhead for the configured duration.
    ///
    /// The clip is split at the playhead, the still goes between the
    /// halves, and everything after it on the track moves right. Returns
    /// the id of the still, which is selected.
    pub async fn insert_freeze_frame(
        &mut self,
        decoder: &impl FrameDecoder,
        assets: &impl AssetStore,
        item_id: &str,
    ) -> EngineResult<String> {
        let item = self.ensure_item_editable(item_id)?.clone();
        let frame = self.playback.current_frame();
        let Some(source) = item.source().filter(|_| !item.is_audio()) else {
            return Err(TimelineError::NotMediaItem {
                item_id: item_id.to_string(),
            }
            .into());
        };
        if !item.contains_frame(frame) {
            return Err(TimelineError::invalid(format!(
                "playhead {frame} is outside item {item_id}"
            ))
            .into());
        }

        let fps = self.fps();
        let source_frame = (source.source_start
            + timeline_to_source(frame - item.from, source.rate(fps)))
        .clamp(source.source_start, (source.source_end - 1).max(source.source_start));

        let decoded = decoder
            .decode_frame(&source.media_id, source_frame)
            .await
            .inspect_err(|err| warn!(item_id, error = %err, "Freeze frame decode failed"))?;
        let asset = assets
            .store_still(&decoded)
            .await
            .inspect_err(|err| warn!(item_id, error = %err, "Freeze frame store failed"))?;

        let duration = self.config.default_freeze_frame_duration;
        let still_id = self.execute("Insert freeze frame", |e| {
            if frame > item.from {
                let out = e.state.items.split_item(item_id, frame, fps)?;
                e.apply(out);
            }
            let later = e.items_from(&item.track_id, frame, &[]);
            let out = e.state.items.shift_items(&later, duration);
            e.apply(out);

            let still = TimelineItem::image(generate_id(), &item.track_id, frame, duration, &asset.media_id)
                .with_label("Freeze frame");
            let out = e.state.items.add_item(still);
            Ok(e.apply(out))
        })?;
        debug!(item_id, frame, source_frame, still_id = %still_id, "Inserted freeze frame");
        self.select(std::slice::from_ref(&still_id));
        Ok(still_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{DecodedFrame, StoredAsset};
    use crate::error::{CollaboratorError, EngineError};
    use splice_common::Frame;
    use splice_timeline::{MediaSource, TimelineTrack};

    struct Decoder {
        fail: bool,
    }

    impl FrameDecoder for Decoder {
        async fn decode_frame(&self, media_id: &str, source_frame: Frame) -> Result<DecodedFrame, CollaboratorError> {
            if self.fail {
                return Err(CollaboratorError::Decode {
                    media_id: media_id.to_string(),
                    reason: "corrupt stream".into(),
                });
            }
            Ok(DecodedFrame {
                media_id: media_id.to_string(),
                source_frame,
                width: 2,
                height: 2,
                data: vec![0; 16],
            })
        }
    }

    struct Assets;

    impl AssetStore for Assets {
        async fn store_still(&self, frame: &DecodedFrame) -> Result<StoredAsset, CollaboratorError> {
            Ok(StoredAsset {
                media_id: format!("{}@{}", frame.media_id, frame.source_frame),
            })
        }
    }

    fn engine() -> TimelineEngine {
        let mut engine = TimelineEngine::default();
        engine.state.items.add_track(TimelineTrack::new("t1", "V1", 0.0));
        engine.state.items.add_track(TimelineTrack::new("t2", "V2", 1.0));
        let src = MediaSource::new("m", 300, 30.0).with_bounds(100, 190);
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::video("v", "t1", 0, 90, src));
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::text("after", "t1", 120, 30, "after"));
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::text("other", "t2", 120, 30, "other"));
        engine
    }

    #[tokio::test]
    async fn splits_clip_and_inserts_still() {
        let mut engine = engine();
        engine.playback_mut().set_current_frame(30);
        let still = engine
            .insert_freeze_frame(&Decoder { fail: false }, &Assets, "v")
            .await
            .unwrap();

        let image = engine.item(&still).unwrap();
        assert_eq!((image.from, image.duration_in_frames), (30, 60));
        assert_eq!(image.media_id(), Some("m@130"));
        assert_eq!(engine.item("v").unwrap().duration_in_frames, 30);
        let right = engine
            .state()
            .items
            .items_on_track("t1")
            .into_iter()
            .find(|i| i.from == 90)
            .map(|i| i.duration_in_frames);
        assert_eq!(right, Some(60));
        assert_eq!(engine.item("after").unwrap().from, 180);
        assert_eq!(engine.item("other").unwrap().from, 120);
        assert_eq!(engine.selection().selected_item_ids(), vec![still]);

        assert_eq!(engine.undo_count(), 1);
        engine.undo();
        assert_eq!(engine.state().items.items().len(), 3);
    }

    #[tokio::test]
    async fn decode_failure_leaves_timeline_alone() {
        let mut engine = engine();
        engine.playback_mut().set_current_frame(30);
        let before = engine.state().clone();
        let err = engine
            .insert_freeze_frame(&Decoder { fail: true }, &Assets, "v")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Collaborator(CollaboratorError::Decode { .. })));
        assert_eq!(engine.state(), &before);
        assert!(!engine.can_undo());
    }

    #[tokio::test]
    async fn rejects_playhead_outside_clip_and_non_media() {
        let mut engine = engine();
        engine.playback_mut().set_current_frame(100);
        assert!(engine
            .insert_freeze_frame(&Decoder { fail: false }, &Assets, "v")
            .await
            .is_err());
        engine.playback_mut().set_current_frame(125);
        assert!(engine
            .insert_freeze_frame(&Decoder { fail: false }, &Assets, "after")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn playhead_at_clip_start_skips_split() {
        let mut engine = engine();
        engine.playback_mut().set_current_frame(0);
        engine
            .insert_freeze_frame(&Decoder { fail: false }, &Assets, "v")
            .await
            .unwrap();
        assert_eq!(engine.item("v").unwrap().from, 60);
        assert_eq!(engine.item("v").unwrap().duration_in_frames, 90);
    }
}
