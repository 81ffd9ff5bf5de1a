#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgba};
use tokio::sync::{Mutex, Notify, Semaphore};

use profile_shared::capabilities::StoreError;
use profile_shared::config::EditorConfig;
use profile_shared::image_processing::{ImageProcessingError, ImageProcessor};
use profile_shared::model::{GeoPoint, ImageSelection, PreviewRef, ProfileSnapshot};
use profile_shared::shell::{ImageDecoder, ProfileStore};
use profile_shared::{Services, SimulatedShell};

pub fn nyc() -> GeoPoint {
    GeoPoint::new(40.7128, -74.0060).unwrap()
}

pub fn valid_snapshot() -> ProfileSnapshot {
    let mut s = ProfileSnapshot::default();
    s.identity.name = "Main Street Pharmacy".into();
    s.identity.license_number = "PH-12345".into();
    s.identity.phone = "(555) 123-4567".into();
    s.identity.email = "info@mainstreet.example".into();
    s.location.street = "123 Main St".into();
    s.location.city = "New York".into();
    s.location.state = "NY".into();
    s.location.zip_code = "10001".into();
    s.location.country = "USA".into();
    s.location.coordinates = Some(nyc());
    s
}

/// Simulated services with the device sitting in New York.
pub fn test_services(initial: ProfileSnapshot) -> Services {
    Services::simulated(initial, nyc(), &EditorConfig::default())
}

pub async fn open(services: Services) -> Arc<SimulatedShell> {
    Arc::new(SimulatedShell::open(services, &EditorConfig::default()).await.unwrap())
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 128, 255]));
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    out
}

pub fn png_selection(name: &str) -> ImageSelection {
    ImageSelection::new(name, "image/png", png(8, 8))
}

/// Store whose saves block until the test releases them, so a save can be
/// held in flight deterministically.
pub struct GatedStore {
    stored: Mutex<ProfileSnapshot>,
    gate: Semaphore,
    pub started: Notify,
    saves: AtomicUsize,
}

impl GatedStore {
    pub fn new(initial: ProfileSnapshot) -> Arc<Self> {
        Arc::new(Self {
            stored: Mutex::new(initial),
            gate: Semaphore::new(0),
            started: Notify::new(),
            saves: AtomicUsize::new(0),
        })
    }

    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn stored(&self) -> ProfileSnapshot {
        self.stored.lock().await.clone()
    }

    async fn write(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| StoreError::SaveFailed(e.to_string()))?;
        permit.forget();
        *self.stored.lock().await = snapshot.clone();
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for GatedStore {
    async fn load(&self) -> Result<ProfileSnapshot, StoreError> {
        Ok(self.stored.lock().await.clone())
    }

    async fn save(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        self.write(snapshot).await
    }

    async fn save_draft(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        self.write(snapshot).await
    }
}

/// Real decoder that holds every result until the test releases it, like a
/// slow device decoding a large photo.
pub struct GatedDecoder {
    inner: ImageProcessor,
    gate: Semaphore,
    pub started: Notify,
}

impl GatedDecoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: ImageProcessor::with_defaults(),
            gate: Semaphore::new(0),
            started: Notify::new(),
        })
    }

    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl ImageDecoder for GatedDecoder {
    async fn decode(&self, image: &ImageSelection) -> Result<PreviewRef, ImageProcessingError> {
        let preview = self.inner.decode(image).await;
        self.started.notify_one();
        let permit = self.gate.acquire().await.map_err(|_| ImageProcessingError::TaskFailed)?;
        permit.forget();
        preview
    }
}
