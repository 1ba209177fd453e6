use std::path::PathBuf;

use tracing::{debug, warn};

use pxbridge_proto::{
    parse_extent, parse_layer_line, CropRect, InputMode, LayerEntry, LayerSpec, OutputMode,
    Request,
};
use pxbridge_shm::{generate_key, SegmentRegistry, SharedSegment};

use crate::error::{BridgeError, Result};
use crate::exchange::{Exchange, ExchangeConfig, SocketExchange};
use crate::image::ImageBuffer;

/// Plugin-side client of the host bridge protocol.
///
/// Owns the output-segment registry, so every segment this process creates
/// for an output batch is detached and unlinked exactly once — before the
/// next batch, or when the bridge is dropped. All operations are blocking
/// and strictly one-request-then-one-response; there is no pipelining and
/// no concurrent use.
pub struct HostBridge<E = SocketExchange> {
    exchange: E,
    registry: SegmentRegistry,
}

impl HostBridge<SocketExchange> {
    /// Bridge to the host socket at `path` with default bounds.
    pub fn connect(path: impl Into<PathBuf>) -> Self {
        Self::with_exchange(SocketExchange::new(path))
    }

    /// Bridge with explicit exchange bounds.
    pub fn connect_with_config(path: impl Into<PathBuf>, config: ExchangeConfig) -> Self {
        Self::with_exchange(SocketExchange::with_config(path, config))
    }
}

impl<E: Exchange> HostBridge<E> {
    /// Bridge over a caller-provided transport.
    pub fn with_exchange(exchange: E) -> Self {
        Self {
            exchange,
            registry: SegmentRegistry::new(),
        }
    }

    /// Query the pixel extent of the layer set selected by `mode`.
    pub fn layers_extent(&mut self, mode: InputMode) -> Result<(u32, u32)> {
        let response = self
            .exchange
            .exchange(&Request::LayersExtent { mode }.encode())?;
        let text = String::from_utf8_lossy(&response);
        let extent = parse_extent(text.trim())?;
        debug!(width = extent.0, height = extent.1, "layers extent");
        Ok(extent)
    }

    /// Fetch the images the host stages for `rect` and `mode`.
    ///
    /// The all-negative sentinel rectangle selects the entire image. Images
    /// are returned in response-line order. Malformed lines are skipped
    /// with a warning; an entry whose segment cannot be read yields a
    /// zero-filled image of the declared geometry so indices stay aligned
    /// with what the host announced.
    pub fn cropped_images(&mut self, rect: CropRect, mode: InputMode) -> Result<Vec<ImageBuffer>> {
        let request = Request::CroppedImages { rect, mode };
        let response = self.exchange.exchange(&request.encode())?;
        let text = String::from_utf8_lossy(&response);

        let mut entries: Vec<LayerEntry> = Vec::new();
        for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
            match parse_layer_line(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(%err, "skipping malformed layer line"),
            }
        }
        debug!(count = entries.len(), "host staged input layers");

        let mut images = Vec::with_capacity(entries.len());
        for entry in &entries {
            images.push(copy_from_segment(entry));
        }

        // Let the host release its staged segments; the response (if any)
        // carries nothing we need.
        if let Err(err) = self.exchange.exchange(&Request::Detach.encode()) {
            warn!(%err, "detach notification failed");
        }

        Ok(images)
    }

    /// Publish `images` back to the host through fresh shared segments.
    ///
    /// Segments from the previous batch are released first. On any segment
    /// failure the partial batch is released and nothing is sent, so the
    /// host never sees keys it cannot consume.
    pub fn output_images(&mut self, images: &[ImageBuffer], mode: OutputMode) -> Result<()> {
        self.registry.release_all();

        let mut layers = Vec::with_capacity(images.len());
        for image in images {
            let key = generate_key();
            match stage_output_segment(&key, image) {
                Ok(segment) => {
                    layers.push(LayerSpec {
                        key,
                        name: image.name().as_bytes().to_vec(),
                        channels: image.channels(),
                        width: image.width(),
                        height: image.height(),
                    });
                    self.registry.register(segment);
                }
                Err(err) => {
                    warn!(key = %key, %err, "failed to stage output segment; dropping batch");
                    self.registry.release_all();
                    return Err(err);
                }
            }
        }

        let request = Request::OutputImages { mode, layers };
        // Fire-and-forget: the response payload is discarded.
        self.exchange.exchange(&request.encode())?;
        debug!(count = images.len(), "published output batch");
        Ok(())
    }

    /// Release every tracked output segment now. Idempotent.
    pub fn release_segments(&mut self) {
        self.registry.release_all();
    }

    /// Number of currently-live output segments.
    pub fn live_segments(&self) -> usize {
        self.registry.len()
    }
}

/// Attach, lock, and bulk-copy one staged entry into a fresh image.
///
/// Any failure degrades to a zero-filled image of the declared geometry so
/// the batch keeps its announced shape.
fn copy_from_segment(entry: &LayerEntry) -> ImageBuffer {
    match read_segment(entry) {
        Ok(image) => image,
        Err(err) => {
            warn!(key = %entry.key, %err, "could not read staged segment; using zeroed image");
            ImageBuffer::zeroed(entry.name.clone(), entry.width, entry.height, entry.channels)
        }
    }
}

fn read_segment(entry: &LayerEntry) -> Result<ImageBuffer> {
    let expected = entry.byte_len();
    let mut segment = SharedSegment::attach_read_only(&entry.key)?;
    if segment.len() < expected {
        return Err(BridgeError::ShortSegment {
            key: entry.key.clone(),
            expected,
            got: segment.len(),
        });
    }
    let guard = segment.lock()?;
    ImageBuffer::from_bytes(
        entry.name.clone(),
        entry.width,
        entry.height,
        entry.channels,
        &guard.bytes()[..expected],
    )
}

fn stage_output_segment(key: &str, image: &ImageBuffer) -> Result<SharedSegment> {
    let mut segment = SharedSegment::create(key, image.byte_len())?;
    {
        let mut guard = segment.lock()?;
        guard.write(image.as_bytes())?;
    }
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use pxbridge_proto::hex;
    use pxbridge_shm::ShmError;

    use super::*;

    /// In-memory stand-in for the socket exchange: records every request
    /// and replays canned responses.
    struct MockExchange {
        seen: Arc<Mutex<Vec<String>>>,
        responses: VecDeque<Result<Vec<u8>>>,
    }

    impl MockExchange {
        fn new(responses: Vec<Result<Vec<u8>>>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    seen: Arc::clone(&seen),
                    responses: responses.into_iter().collect(),
                },
                seen,
            )
        }
    }

    impl Exchange for MockExchange {
        fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>> {
            self.seen
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(request).into_owned());
            self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn stage_input_segment(samples: &[f32]) -> (String, SharedSegment) {
        let key = generate_key();
        let image =
            ImageBuffer::from_samples("staged", 1, 1, samples.len() as u32, samples.to_vec())
                .unwrap();
        let segment = stage_output_segment(&key, &image).unwrap();
        (key, segment)
    }

    #[test]
    fn layers_extent_parses_response() {
        let (mock, seen) = MockExchange::new(vec![Ok(b"800,600".to_vec())]);
        let mut bridge = HostBridge::with_exchange(mock);

        let extent = bridge.layers_extent(InputMode::Active).unwrap();
        assert_eq!(extent, (800, 600));
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            ["command=get_image_size\nmode=1"]
        );
    }

    #[test]
    fn layers_extent_rejects_malformed_response() {
        for response in [b"".to_vec(), b"garbage".to_vec(), b"1,2,3".to_vec()] {
            let (mock, _) = MockExchange::new(vec![Ok(response)]);
            let mut bridge = HostBridge::with_exchange(mock);
            let err = bridge.layers_extent(InputMode::All).unwrap_err();
            assert!(matches!(err, BridgeError::Proto(_)));
        }
    }

    #[test]
    fn cropped_images_decodes_staged_segments_in_order() {
        let first: Vec<f32> = (0..4).map(|i| i as f32).collect();
        let second: Vec<f32> = (0..4).map(|i| 10.0 + i as f32).collect();
        let (key_a, _seg_a) = stage_input_segment(&first);
        let (key_b, _seg_b) = stage_input_segment(&second);

        let response = format!(
            "{key_a},{},4,1,1\n{key_b},{},4,1,1\n",
            hex::encode(b"alpha"),
            hex::encode(b"beta")
        );
        let (mock, seen) = MockExchange::new(vec![Ok(response.into_bytes()), Ok(Vec::new())]);
        let mut bridge = HostBridge::with_exchange(mock);

        let images = bridge
            .cropped_images(CropRect::full_image(), InputMode::All)
            .unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].name(), "alpha");
        assert_eq!(images[0].data(), first.as_slice());
        assert_eq!(images[1].name(), "beta");
        assert_eq!(images[1].data(), second.as_slice());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2, "crop request plus detach notification");
        assert_eq!(
            seen[0],
            "command=get_cropped_images\nmode=2\ncroprect=0,0,1,1"
        );
        assert_eq!(seen[1], "command=detach");
    }

    #[test]
    fn malformed_lines_are_skipped_without_shifting_order() {
        let samples: Vec<f32> = vec![1.5, 2.5, 3.5, 4.5];
        let (key, _seg) = stage_input_segment(&samples);

        let response = format!(
            "{key},{},4,1,1\nnot-a-layer-line\n{key},{},4,1,1\n",
            hex::encode(b"one"),
            hex::encode(b"two")
        );
        let (mock, _) = MockExchange::new(vec![Ok(response.into_bytes()), Ok(Vec::new())]);
        let mut bridge = HostBridge::with_exchange(mock);

        let images = bridge
            .cropped_images(CropRect::full_image(), InputMode::Active)
            .unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].name(), "one");
        assert_eq!(images[1].name(), "two");
    }

    #[test]
    fn unreadable_segment_yields_zeroed_placeholder() {
        let response = format!("px-test-gone-0,{},4,2,2\n", hex::encode(b"missing"));
        let (mock, _) = MockExchange::new(vec![Ok(response.into_bytes()), Ok(Vec::new())]);
        let mut bridge = HostBridge::with_exchange(mock);

        let images = bridge
            .cropped_images(CropRect::full_image(), InputMode::Active)
            .unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name(), "missing");
        assert_eq!(images[0].sample_count(), 2 * 2 * 4);
        assert!(images[0].data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_crop_response_means_no_layers() {
        let (mock, _) = MockExchange::new(vec![Ok(Vec::new()), Ok(Vec::new())]);
        let mut bridge = HostBridge::with_exchange(mock);

        let images = bridge
            .cropped_images(CropRect::full_image(), InputMode::Active)
            .unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn output_images_publishes_readable_segments() {
        let image = ImageBuffer::from_samples(
            "layer01",
            2,
            2,
            4,
            (0..16).map(|i| i as f32).collect(),
        )
        .unwrap();

        let (mock, seen) = MockExchange::new(vec![Ok(Vec::new())]);
        let mut bridge = HostBridge::with_exchange(mock);

        bridge
            .output_images(std::slice::from_ref(&image), OutputMode::InPlace)
            .unwrap();
        assert_eq!(bridge.live_segments(), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let message = &seen[0];
        assert!(message.starts_with("command=output_images\nmode=0\n"));

        // The announced key must be attachable and hold the image bytes.
        let line = message
            .lines()
            .find(|l| l.starts_with("layer="))
            .expect("one layer line");
        let entry = parse_layer_line(line.trim_start_matches("layer=")).unwrap();
        assert_eq!(entry.name, "layer01");
        assert_eq!((entry.channels, entry.width, entry.height), (4, 2, 2));

        let decoded = copy_from_segment(&entry);
        assert_eq!(decoded.data(), image.data());
    }

    #[test]
    fn second_batch_replaces_first_batch_segments() {
        let batch1: Vec<ImageBuffer> = (0..3)
            .map(|i| ImageBuffer::zeroed(format!("a{i}"), 2, 2, 4))
            .collect();
        let batch2: Vec<ImageBuffer> = (0..2)
            .map(|i| ImageBuffer::zeroed(format!("b{i}"), 2, 2, 4))
            .collect();

        let (mock, seen) = MockExchange::new(vec![Ok(Vec::new()), Ok(Vec::new())]);
        let mut bridge = HostBridge::with_exchange(mock);

        bridge.output_images(&batch1, OutputMode::InPlace).unwrap();
        assert_eq!(bridge.live_segments(), 3);

        let first_keys: Vec<String> = {
            let seen = seen.lock().unwrap();
            seen[0]
                .lines()
                .filter(|l| l.starts_with("layer="))
                .map(|l| l.trim_start_matches("layer=").split(',').next().unwrap().to_string())
                .collect()
        };

        bridge.output_images(&batch2, OutputMode::InPlace).unwrap();
        assert_eq!(bridge.live_segments(), batch2.len());

        // First batch segments are fully unlinked.
        for key in first_keys {
            assert!(SharedSegment::attach_read_only(&key).is_err());
        }
    }

    #[test]
    fn segment_failure_drops_partial_batch_without_sending() {
        let good = ImageBuffer::zeroed("ok", 2, 2, 4);
        // Zero geometry cannot back a segment; creation fails mid-batch.
        let bad = ImageBuffer::zeroed("broken", 0, 0, 4);

        let (mock, seen) = MockExchange::new(vec![]);
        let mut bridge = HostBridge::with_exchange(mock);

        let err = bridge
            .output_images(&[good, bad], OutputMode::NewLayers)
            .unwrap_err();
        assert!(matches!(err, BridgeError::Shm(ShmError::ZeroSize { .. })));
        assert_eq!(bridge.live_segments(), 0, "partial batch must be released");
        assert!(
            seen.lock().unwrap().is_empty(),
            "no command may be sent for a dropped batch"
        );
    }

    #[test]
    fn exchange_failure_on_output_propagates() {
        let image = ImageBuffer::zeroed("x", 1, 1, 4);
        let (mock, _) = MockExchange::new(vec![Err(BridgeError::Timeout(
            std::time::Duration::from_secs(1),
        ))]);
        let mut bridge = HostBridge::with_exchange(mock);

        let err = bridge
            .output_images(std::slice::from_ref(&image), OutputMode::InPlace)
            .unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(_)));
        // Segments stay tracked; the next batch (or drop) releases them.
        assert_eq!(bridge.live_segments(), 1);
    }

    #[test]
    fn release_segments_is_idempotent() {
        let (mock, _) = MockExchange::new(vec![Ok(Vec::new())]);
        let mut bridge = HostBridge::with_exchange(mock);
        bridge
            .output_images(&[ImageBuffer::zeroed("x", 1, 1, 4)], OutputMode::InPlace)
            .unwrap();
        assert_eq!(bridge.live_segments(), 1);

        bridge.release_segments();
        bridge.release_segments();
        assert_eq!(bridge.live_segments(), 0);
    }
}
