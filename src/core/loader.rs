use crate::domain::model::{Feature, LoadSummary, Session};
use crate::domain::ports::{AttributePolicy, FeatureSink};
use crate::utils::error::Result;
use std::collections::HashSet;

/// Replace every feature in the layer behind `sink` with `features`.
///
/// An empty input leaves the layer untouched: no authentication, no delete.
/// With [`AttributePolicy::KnownFields`] the layer schema is read before the
/// delete, and attributes the layer does not define are dropped.
/// Uploads go out sequentially in `batch_size` chunks.
pub async fn replace_all<S: FeatureSink>(
    sink: &S,
    mut features: Vec<Feature>,
    batch_size: usize,
    policy: AttributePolicy,
) -> Result<LoadSummary> {
    if features.is_empty() {
        tracing::info!("📭 No features to upload; feature layer left untouched");
        return Ok(LoadSummary {
            skipped: true,
            ..Default::default()
        });
    }

    let session = sink.authenticate().await?;
    tracing::info!("🔐 Logged in as: {}", session.username);

    let dropped_attributes = match policy {
        AttributePolicy::All => 0,
        AttributePolicy::KnownFields => restrict_to_layer(sink, &session, &mut features).await?,
    };

    let deleted = sink.delete_all(&session).await?;
    tracing::info!("🗑️ Deleted {} existing features", deleted);

    let mut summary = LoadSummary {
        deleted,
        dropped_attributes,
        ..Default::default()
    };

    for (index, chunk) in features.chunks(batch_size.max(1)).enumerate() {
        let outcome = sink.add_features(&session, chunk).await?;
        summary.batches += 1;
        summary.uploaded += outcome.added;
        summary.failed += outcome.failed;

        if outcome.failed > 0 {
            tracing::warn!(
                "⚠️ Batch {}: {} of {} features rejected",
                index + 1,
                outcome.failed,
                chunk.len()
            );
        }
        tracing::info!(
            "📤 Batch {}: uploaded {} features (total {})",
            index + 1,
            outcome.added,
            summary.uploaded
        );
    }

    tracing::info!(
        "✅ Upload complete: {} features in {} batches",
        summary.uploaded,
        summary.batches
    );
    Ok(summary)
}

/// ArcGIS 欄位名稱不分大小寫
async fn restrict_to_layer<S: FeatureSink>(
    sink: &S,
    session: &Session,
    features: &mut [Feature],
) -> Result<usize> {
    let fields = sink.layer_fields(session).await?;
    tracing::debug!("Layer fields: {}", fields.join(", "));
    let known: HashSet<String> = fields.iter().map(|name| name.to_lowercase()).collect();

    let mut dropped = 0;
    for feature in features.iter_mut() {
        let before = feature.attributes.len();
        feature
            .attributes
            .retain(|name, _| known.contains(&name.to_lowercase()));
        dropped += before - feature.attributes.len();
    }

    if dropped > 0 {
        tracing::info!("🔧 Dropped {} attributes the layer does not define", dropped);
    }
    Ok(dropped)
}
