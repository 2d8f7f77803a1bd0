/// Integration tests: image validation, streamed upload and delete.
mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ecoaction_client::upload::{self, ImageFile, STATE_COMPLETE, STATE_ERROR, UploadProgress};
use ecoaction_client::{ClientError, UploadRejected};

use common::{EMAIL, FakeServer, PASSWORD};

#[tokio::test]
async fn oversized_image_is_rejected_before_any_request() {
    let server = FakeServer::start().await;
    let (client, _) = server.client("upload_big");
    client.context.login(EMAIL, PASSWORD).await.unwrap();

    let file = ImageFile::new("huge.png", "image/png", vec![7u8; 6 * 1024 * 1024]);
    let progress = Arc::new(UploadProgress::new());
    let err = client
        .upload_image(&file, progress.clone(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Upload(UploadRejected::TooLarge { .. })
    ));
    assert_eq!(server.backend.hits("POST /api/upload"), 0);
}

#[tokio::test]
async fn text_file_is_rejected_before_any_request() {
    let server = FakeServer::start().await;
    let (client, path) = server.client("upload_txt");
    client.context.login(EMAIL, PASSWORD).await.unwrap();

    let txt = path.with_file_name("notes.txt");
    std::fs::write(&txt, b"not an image").unwrap();
    let file = ImageFile::from_path(&txt).await.unwrap();
    assert_eq!(file.content_type, "text/plain");

    let progress = Arc::new(UploadProgress::new());
    let err = client
        .upload_image(&file, progress.clone(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Upload(UploadRejected::UnsupportedType { .. })
    ));
    assert_eq!(progress.state(), STATE_ERROR);
    assert_eq!(server.backend.hits("POST /api/upload"), 0);
}

#[tokio::test]
async fn upload_streams_the_file_and_reports_progress() {
    let server = FakeServer::start().await;
    let (client, path) = server.client("upload_ok");
    client.context.login(EMAIL, PASSWORD).await.unwrap();

    let size = 200 * 1024 + 17;
    let png = path.with_file_name("river.png");
    std::fs::write(&png, vec![0x89u8; size]).unwrap();
    let file = ImageFile::from_path(&png).await.unwrap();

    let progress = Arc::new(UploadProgress::new());
    let last_seen = Arc::new(AtomicU64::new(0));
    let seen = last_seen.clone();
    let uploaded = client
        .upload_image(
            &file,
            progress.clone(),
            Some(Arc::new(move |done: u64, _total: u64| {
                seen.store(done, Ordering::Relaxed);
            })),
        )
        .await
        .unwrap();

    assert!(uploaded.image_url.starts_with("/uploads/"));
    assert_eq!(upload::extract_filename(&uploaded.image_url), Some(uploaded.filename.as_str()));
    assert_eq!(progress.state(), STATE_COMPLETE);
    assert_eq!(progress.fraction(), 1.0);
    assert_eq!(last_seen.load(Ordering::Relaxed), size as u64);

    let received = server.backend.uploads();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], ("river.png".to_string(), "image/png".to_string(), size));

    client.delete_image(&uploaded.filename).await.unwrap();
    assert_eq!(server.backend.hits("DELETE /api/upload/image/"), 1);
}

#[tokio::test]
async fn upload_needs_a_session_and_a_safe_filename() {
    let server = FakeServer::start().await;
    let (client, _) = server.client("upload_anon");

    let file = ImageFile::new("a.png", "image/png", vec![1u8; 10]);
    let err = client
        .upload_image(&file, Arc::new(UploadProgress::new()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));

    client.context.login(EMAIL, PASSWORD).await.unwrap();
    let err = client.delete_image("../etc/passwd").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Upload(UploadRejected::InvalidFilename)
    ));
    assert_eq!(server.backend.hits("DELETE"), 0);
}
