// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media indexing into the shared content pool.
//!
//! One classification+insert path serves both triggers: the source-channel
//! listener (gated by `settings.auto_index`) and the manual admin path
//! (DM media from an admin, which bypasses the gate).

use relaypost_core::{IndexCandidate, MediaKind, RelaypostError};
use relaypost_storage::queries::content;
use relaypost_storage::Database;
use teloxide::types::Message;
use tracing::{debug, info};

/// Index a media candidate into the content pool.
///
/// `force` bypasses the `auto_index` gate (manual admin indexing).
/// Returns `true` only when a new item was inserted; a natural-key
/// collision or a closed gate returns `false`.
pub async fn index_media(
    db: &Database,
    auto_index: bool,
    force: bool,
    candidate: &IndexCandidate,
) -> Result<bool, RelaypostError> {
    if !force && !auto_index {
        debug!(
            natural_key = candidate.natural_key.as_str(),
            "auto indexing disabled, skipping"
        );
        return Ok(false);
    }

    let inserted = content::insert_item(db, candidate).await?;
    if inserted {
        info!(
            natural_key = candidate.natural_key.as_str(),
            display_name = candidate.display_name.as_str(),
            sequence_marker = candidate.sequence_marker,
            "indexed media item"
        );
    } else {
        debug!(
            natural_key = candidate.natural_key.as_str(),
            "duplicate media item, not indexed"
        );
    }
    Ok(inserted)
}

/// Extract an indexable candidate from a Telegram message.
///
/// Videos and photos qualify; for photos the largest size is taken.
/// The message id becomes the sequence marker, which both orders
/// delivery and locates the source message for post-delivery cleanup.
pub fn candidate_from_message(msg: &Message) -> Option<IndexCandidate> {
    if let Some(video) = msg.video() {
        return Some(IndexCandidate {
            natural_key: video.file.id.0.clone(),
            display_name: video
                .file_name
                .clone()
                .unwrap_or_else(|| format!("video-{}", msg.id.0)),
            media_kind: MediaKind::Video,
            sequence_marker: i64::from(msg.id.0),
        });
    }

    if let Some(photos) = msg.photo() {
        // Telegram lists sizes smallest first.
        let best = photos.last()?;
        return Some(IndexCandidate {
            natural_key: best.file.id.0.clone(),
            display_name: format!("photo-{}", msg.id.0),
            media_kind: MediaKind::Photo,
            sequence_marker: i64::from(msg.id.0),
        });
    }

    None
}
