//! End-to-end lifecycle scenarios: ingest → link → mutate → delete →
//! reconcile, over the in-memory blob store and repository fakes.

use std::sync::Arc;

use atelier_core::models::Identity;
use atelier_db::{AssetStore, OwnershipLedger};
use atelier_services::catalog::{AlbumInput, PostInput};
use atelier_services::test_helpers::{jpeg_image, png_image, test_identity, InMemoryDb};
use atelier_services::{
    CatalogService, IngestFile, IngestRequest, IngestService, MediaLimits, MutationService,
    ReclaimService, ReconcileConfig, ReconcileService,
};
use atelier_storage::{BlobStore, MemoryBlobStore};

struct World {
    blobs: Arc<MemoryBlobStore>,
    db: Arc<InMemoryDb>,
    ingest: IngestService,
    mutations: MutationService,
    reclaim: ReclaimService,
    reconcile: ReconcileService,
    catalog: CatalogService,
    caller: Identity,
}

fn world() -> World {
    let blobs = Arc::new(MemoryBlobStore::new());
    let db = Arc::new(InMemoryDb::new());
    let limits = MediaLimits {
        max_upload_bytes: 100 * 1024 * 1024,
        large_max_mp: 25,
        upload_prefix: "uploads/".to_string(),
        allowed_content_types: vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "image/gif".to_string(),
            "image/webp".to_string(),
            "image/bmp".to_string(),
        ],
    };

    World {
        ingest: IngestService::new(
            blobs.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            limits.clone(),
        ),
        mutations: MutationService::new(blobs.clone(), db.clone(), limits),
        reclaim: ReclaimService::new(
            blobs.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
        ),
        reconcile: ReconcileService::new(
            blobs.clone(),
            db.clone(),
            ReconcileConfig {
                upload_prefix: "uploads/".to_string(),
                stale_hours: 0,
            },
        ),
        catalog: CatalogService::new(db.clone(), db.clone(), db.clone(), db.clone()),
        caller: test_identity(),
        blobs,
        db,
    }
}

fn single_file(name: &str, data: Vec<u8>, content_type: &str) -> IngestRequest {
    IngestRequest {
        files: vec![IngestFile {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            data,
        }],
        album_id: None,
        caption: String::new(),
        alt_text: String::new(),
    }
}

#[tokio::test]
async fn test_single_jpeg_ingest_scenario() {
    let w = world();

    let assets = w
        .ingest
        .ingest_batch(
            single_file("photo.jpg", jpeg_image(800, 600), "image/jpeg"),
            &w.caller,
        )
        .await
        .unwrap();

    let asset = &assets[0];
    assert_eq!((asset.width, asset.height), (Some(800), Some(600)));
    assert!(!w.db.is_referenced(asset.id).await.unwrap());

    // Thumb on disk really is capped at 400 on its longer edge.
    let thumb_bytes = w.blobs.get(asset.thumb_key()).await.unwrap();
    let thumb = image::load_from_memory(&thumb_bytes).unwrap();
    use image::GenericImageView;
    assert_eq!(thumb.dimensions(), (400, 300));

    // Unreferenced but finalized: the sweep must not touch it, and no
    // cascade can delete it.
    assert_eq!(w.reconcile.reconcile().await.unwrap(), 0);
    assert!(w.db.get(asset.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_shared_asset_outlives_one_owner_then_dies_with_the_last() {
    let w = world();

    let album = w
        .catalog
        .create_album(
            AlbumInput {
                title: "Album X".to_string(),
                slug: "album-x".to_string(),
                description: String::new(),
            },
            &w.caller,
        )
        .await
        .unwrap();

    let mut request = single_file("shared.png", png_image(320, 240), "image/png");
    request.album_id = Some(album.id);
    let asset = w
        .ingest
        .ingest_batch(request, &w.caller)
        .await
        .unwrap()
        .remove(0);

    let post = w
        .catalog
        .create_post(
            PostInput {
                title: "Post Y".to_string(),
                slug: "post-y".to_string(),
                summary: String::new(),
                markdown: "body".to_string(),
                status: "published".to_string(),
                published_at: None,
            },
            &w.caller,
        )
        .await
        .unwrap();
    w.catalog
        .set_post_assets(post.id, &[asset.id])
        .await
        .unwrap();

    // Delete Post Y: the asset survives and Album X still lists it.
    w.reclaim.delete_post(post.id).await.unwrap();
    let listed = w.catalog.list_album_assets(album.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, asset.id);

    // Delete Album X: the asset and all three blobs are gone.
    let keys = asset.storage_keys();
    w.reclaim.delete_album(album.id).await.unwrap();
    assert!(w.db.get(asset.id).await.unwrap().is_none());
    for key in keys {
        assert!(!w.blobs.has_key(&key));
    }
    assert_eq!(w.blobs.object_count(), 0);
}

#[tokio::test]
async fn test_rotate_scenario_retires_old_keys() {
    let w = world();

    let asset = w
        .ingest
        .ingest_batch(
            single_file("photo.jpg", jpeg_image(640, 480), "image/jpeg"),
            &w.caller,
        )
        .await
        .unwrap()
        .remove(0);
    let old_keys = asset.storage_keys();

    let rotated = w.mutations.rotate(asset.id, 90).await.unwrap();

    assert_eq!(rotated.id, asset.id);
    assert_eq!((rotated.width, rotated.height), (Some(480), Some(640)));
    for key in &old_keys {
        assert!(!w.blobs.has_key(key));
    }
    let new_keys = rotated.storage_keys();
    assert!(new_keys.iter().all(|k| !old_keys.contains(k)));
    for key in &new_keys {
        assert!(w.blobs.has_key(key));
    }
}

#[tokio::test]
async fn test_no_unreferenced_blobs_after_any_ingest_outcome() {
    let w = world();

    // A successful ingest and a failed (corrupt) one.
    w.ingest
        .ingest_batch(
            single_file("good.jpg", jpeg_image(64, 64), "image/jpeg"),
            &w.caller,
        )
        .await
        .unwrap();
    w.ingest
        .ingest_batch(
            single_file("bad.jpg", vec![0, 1, 2, 3], "image/jpeg"),
            &w.caller,
        )
        .await
        .unwrap_err();

    // With no staleness cutoff, every object under the prefix must be
    // referenced by a finalized row.
    assert_eq!(w.reconcile.reconcile().await.unwrap(), 0);
    assert_eq!(w.blobs.object_count(), 3);
}

#[tokio::test]
async fn test_replace_then_reconcile_finds_nothing() {
    let w = world();

    let asset = w
        .ingest
        .ingest_batch(
            single_file("photo.jpg", jpeg_image(256, 256), "image/jpeg"),
            &w.caller,
        )
        .await
        .unwrap()
        .remove(0);

    w.mutations
        .replace(
            asset.id,
            IngestFile {
                file_name: "replacement.png".to_string(),
                content_type: "image/png".to_string(),
                data: png_image(128, 128),
            },
        )
        .await
        .unwrap();

    // The swap already deleted the old set; the sweep finds no orphans and
    // a second run is also a no-op.
    assert_eq!(w.blobs.object_count(), 3);
    assert_eq!(w.reconcile.reconcile().await.unwrap(), 0);
    assert_eq!(w.reconcile.reconcile().await.unwrap(), 0);
}

#[tokio::test]
async fn test_reference_count_invariant_across_owner_changes() {
    let w = world();

    let asset = w
        .ingest
        .ingest_batch(
            single_file("photo.jpg", jpeg_image(64, 64), "image/jpeg"),
            &w.caller,
        )
        .await
        .unwrap()
        .remove(0);

    assert!(!w.db.is_referenced(asset.id).await.unwrap());

    let album = w
        .catalog
        .create_album(
            AlbumInput {
                title: "A".to_string(),
                slug: "a".to_string(),
                description: String::new(),
            },
            &w.caller,
        )
        .await
        .unwrap();
    w.catalog.add_album_asset(album.id, asset.id).await.unwrap();
    assert!(w.db.is_referenced(asset.id).await.unwrap());

    w.catalog
        .remove_album_asset(album.id, asset.id)
        .await
        .unwrap();
    assert!(!w.db.is_referenced(asset.id).await.unwrap());

    // Explicit membership removal does not reclaim; the asset is still in
    // the library until explicitly deleted.
    assert!(w.db.get(asset.id).await.unwrap().is_some());
    w.reclaim.delete_asset(asset.id).await.unwrap();
    assert!(w.db.get(asset.id).await.unwrap().is_none());
    assert_eq!(w.blobs.object_count(), 0);
}
