//! Gallery sync engine walkthrough
//!
//! Drives the whole engine against an in-process fake backend:
//! 1. Load the gallery collection
//! 2. Apply optimistic mutations (like, download)
//! 3. Request a transformation and receive the result on the push channel
//!
//! Run: cargo run --example gallery_sync

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prism_client::{
    ApiTransport, ClientResult, Credential, ImageQuery, MemoryChannelHub, PrismClient,
    TransformOutcome, TransformationDraft, UploadRequest,
};
use shared::message::PushMessage;
use shared::models::{Image, Like, Transformation, TransformedImage};
use shared::query::PaginatedResponse;
use shared::util::now_millis;

/// Minimal in-process backend for the walkthrough
struct DemoServer {
    images: Arc<Mutex<Vec<Image>>>,
    hub: MemoryChannelHub,
}

#[async_trait]
impl ApiTransport for DemoServer {
    async fn list_images(&self, _query: &ImageQuery) -> ClientResult<PaginatedResponse<Image>> {
        Ok(PaginatedResponse::single_page(
            self.images.lock().unwrap().clone(),
        ))
    }

    async fn upload_image(&self, upload: UploadRequest) -> ClientResult<Image> {
        let image = Image {
            id: format!("img-{}", self.images.lock().unwrap().len() + 1),
            original_name: upload.file_name,
            size: upload.bytes.len() as u64,
            secure_url: "https://cdn.example/upload.jpg".to_string(),
            created_at: now_millis(),
            updated_at: now_millis(),
            is_public: false,
            downloads_count: 0,
            likes: vec![],
            transformed_images: vec![],
        };
        self.images.lock().unwrap().push(image.clone());
        Ok(image)
    }

    async fn delete_image(&self, image_id: &str) -> ClientResult<()> {
        self.images.lock().unwrap().retain(|i| i.id != image_id);
        Ok(())
    }

    async fn delete_transformed_image(&self, transformed_id: &str) -> ClientResult<()> {
        for img in self.images.lock().unwrap().iter_mut() {
            img.transformed_images.retain(|t| t.id != transformed_id);
        }
        Ok(())
    }

    async fn set_like(&self, image_id: &str, liked: bool) -> ClientResult<()> {
        let mut images = self.images.lock().unwrap();
        if let Some(img) = images.iter_mut().find(|i| i.id == image_id) {
            img.likes.retain(|l| l.user_id != "demo-user");
            if liked {
                img.likes.push(Like {
                    id: "srv-like-1".to_string(),
                    user_id: "demo-user".to_string(),
                });
            }
        }
        Ok(())
    }

    async fn set_visibility(&self, image_id: &str, is_public: bool) -> ClientResult<()> {
        let mut images = self.images.lock().unwrap();
        if let Some(img) = images.iter_mut().find(|i| i.id == image_id) {
            img.is_public = is_public;
        }
        Ok(())
    }

    async fn record_download(&self, image_id: &str) -> ClientResult<()> {
        let mut images = self.images.lock().unwrap();
        if let Some(img) = images.iter_mut().find(|i| i.id == image_id) {
            img.downloads_count += 1;
        }
        Ok(())
    }

    async fn request_transformation(
        &self,
        image_id: &str,
        transformation: &Transformation,
    ) -> ClientResult<TransformOutcome> {
        // Accept the job; server truth and the push event both land when
        // the background job completes
        let record = TransformedImage {
            id: "t-1".to_string(),
            original_image_id: image_id.to_string(),
            parent_id: None,
            size: 512,
            secure_url: "https://cdn.example/t-1.jpg".to_string(),
            transformation: transformation.clone(),
            created_at: now_millis(),
            updated_at: now_millis(),
        };
        let hub = self.hub.clone();
        let images = self.images.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            if let Some(img) = images
                .lock()
                .unwrap()
                .iter_mut()
                .find(|i| i.id == record.original_image_id)
            {
                img.transformed_images.push(record.clone());
            }
            hub.publish(PushMessage::job_succeeded(&record));
        });
        Ok(TransformOutcome::Accepted {
            job_id: "job-1".to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("\n✨ Gallery Sync Walkthrough");
    println!("===========================\n");

    let hub = MemoryChannelHub::new();
    let server = Arc::new(DemoServer {
        images: Arc::new(Mutex::new(vec![])),
        hub: hub.clone(),
    });

    let client = PrismClient::new(server, Arc::new(hub.clone()));
    let _watch = client.subscribe(|collection| {
        println!("  [store] {} image(s) in the gallery", collection.len());
    });

    client
        .set_credential(Some(Credential::new("demo-user", "demo-token")))
        .await;
    client.load(ImageQuery::mine()).await?;

    println!("📤 Uploading sunset.png...");
    let uploaded = client.upload("sunset.png", vec![0u8; 2048])?.settled().await?;
    println!("   -> id {}", uploaded.id);

    println!("❤️ Liking it (optimistic)...");
    client.toggle_like(&uploaded.id)?.settled().await?;

    println!("⬇️ Recording a download (optimistic)...");
    client.record_download(&uploaded.id)?.settled().await?;

    println!("🎨 Requesting grayscale + rotate...");
    let mut notifications = client.notifications();
    let mut draft = TransformationDraft::new();
    draft.set_grayscale(true);
    draft.set_rotate(Some(90));
    client.request_transformation(&uploaded.id, &draft)?.settled().await?;

    let notification = notifications.recv().await?;
    println!("🔔 {} — {}", notification.title, notification.message);

    let collection = client.read().expect("gallery loaded");
    let image = &collection[0];
    println!(
        "\n✅ Final state: {} like(s), {} download(s), {} transformed image(s)",
        image.likes.len(),
        image.downloads_count,
        image.transformed_images.len()
    );

    Ok(())
}
