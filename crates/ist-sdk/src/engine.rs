use std::sync::Arc;

use ist_history::resolve_image_id;
use ist_layers::{LayerIndex, ViewAssembler};
use ist_mutation::{Cancellation, MutationCoordinator, TagWrite};
use ist_refs::{parse_name_and_id, parse_name_and_tag, validate_stream_name};
use ist_store::{ImageStore, StreamStore};
use ist_types::{
    ImageStream, ImageStreamImage, ImageStreamLayers, ImageStreamMapping, ImageStreamTag,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{SdkError, SdkResult};
use crate::hostname::{RegistryHostnameSource, StaticHostname};

/// High-level image stream tag API.
pub struct Engine {
    streams: Arc<dyn StreamStore>,
    images: Arc<dyn ImageStore>,
    layers: Arc<dyn LayerIndex>,
    hostnames: Arc<dyn RegistryHostnameSource>,
    config: EngineConfig,
}

impl Engine {
    /// Build an engine over the given stores. The registry hostname comes
    /// from `config` until [`with_hostname_source`](Self::with_hostname_source)
    /// replaces it.
    pub fn new(
        streams: Arc<dyn StreamStore>,
        images: Arc<dyn ImageStore>,
        layers: Arc<dyn LayerIndex>,
        config: EngineConfig,
    ) -> Self {
        let hostnames = Arc::new(StaticHostname::new(config.registry_hostname.clone()));
        Self {
            streams,
            images,
            layers,
            hostnames,
            config,
        }
    }

    pub fn with_hostname_source(mut self, source: Arc<dyn RegistryHostnameSource>) -> Self {
        self.hostnames = source;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- Streams ----

    /// Read a stream with its repository filled in.
    pub fn get_stream(&self, namespace: &str, name: &str) -> SdkResult<ImageStream> {
        let mut stream = self.read_stream(namespace, name)?;
        stream.status.docker_image_repository = stream
            .docker_image_repository(self.hostnames.internal_hostname().as_deref());
        Ok(stream)
    }

    /// Re-resolve every tag of a stream against its current sources.
    pub fn reconcile(
        &self,
        namespace: &str,
        name: &str,
        cancel: &Cancellation,
    ) -> SdkResult<ImageStream> {
        Ok(self.coordinator().reconcile(namespace, name, cancel)?)
    }

    // ---- Image stream tags ----

    /// Read `<stream>:<tag>`.
    ///
    /// A tag with a history carries the image of its latest event; a tag
    /// declared only in the spec has no image.
    pub fn get_tag(&self, namespace: &str, name: &str) -> SdkResult<ImageStreamTag> {
        let (stream_name, tag) = parse_name_and_tag(name)?;
        let stream = self.read_stream(namespace, &stream_name)?;
        self.tag_view(&stream, &tag, true)
    }

    /// Every tag of every stream in `namespace`, sorted by name.
    ///
    /// Images missing from the image store are omitted rather than failing
    /// the listing.
    pub fn list_tags(&self, namespace: &str) -> SdkResult<Vec<ImageStreamTag>> {
        let mut tags = Vec::new();
        for stream in self.streams.list_streams(namespace)? {
            for tag in stream.tag_names() {
                tags.push(self.tag_view(&stream, &tag, false)?);
            }
        }
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    /// Declare a new tag. Fails with `AlreadyExists` if the spec has it.
    pub fn create_tag(
        &self,
        namespace: &str,
        tag: &ImageStreamTag,
        cancel: &Cancellation,
    ) -> SdkResult<ImageStreamTag> {
        self.write_tag(namespace, tag, TagWrite::create(), cancel)
    }

    /// Create or replace a tag.
    ///
    /// A non-empty `resource_version` on `tag` must match the stored stream.
    /// Without one, concurrent writers are retried over.
    pub fn update_tag(
        &self,
        namespace: &str,
        tag: &ImageStreamTag,
        cancel: &Cancellation,
    ) -> SdkResult<ImageStreamTag> {
        let write = TagWrite::update(Some(tag.resource_version.clone()));
        self.write_tag(namespace, tag, write, cancel)
    }

    /// Remove `<stream>:<tag>` from spec and status.
    pub fn delete_tag(&self, namespace: &str, name: &str, cancel: &Cancellation) -> SdkResult<()> {
        let (stream, tag) = parse_name_and_tag(name)?;
        self.coordinator().delete_tag(namespace, &stream, &tag, cancel)?;
        debug!(namespace, stream = %stream, tag = %tag, "deleted image stream tag");
        Ok(())
    }

    // ---- Images ----

    /// Read `<stream>@<id>`, where `id` is a digest or an unambiguous prefix.
    pub fn get_image(&self, namespace: &str, name: &str) -> SdkResult<ImageStreamImage> {
        let (stream_name, id) = parse_name_and_id(name)?;
        let stream = self.read_stream(namespace, &stream_name)?;
        let event = resolve_image_id(&stream, &id)?;
        let mut image = self
            .images
            .get_image(&event.image)?
            .ok_or_else(|| SdkError::ImageNotFound(event.image.clone()))?;
        image.docker_image_reference = event.docker_image_reference;
        Ok(ImageStreamImage {
            namespace: namespace.to_string(),
            name: format!("{stream_name}@{}", image.name),
            image,
        })
    }

    /// Store the mapping's image and make it the head of the mapped tag.
    pub fn create_mapping(
        &self,
        mapping: &ImageStreamMapping,
        cancel: &Cancellation,
    ) -> SdkResult<ImageStream> {
        validate_stream_name(&mapping.name)?;
        if mapping.image.name.is_empty() {
            return Err(SdkError::Invalid("mapping image must have a name".into()));
        }
        match self.images.create_image(&mapping.image) {
            Ok(_) => debug!(image = %mapping.image.name, "stored image"),
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self.coordinator().create_mapping(
            &mapping.namespace,
            &mapping.name,
            &mapping.tag,
            &mapping.image,
            cancel,
        )?)
    }

    // ---- Layers ----

    /// Blob and manifest view of every image in a stream's histories.
    pub fn get_layers(&self, namespace: &str, name: &str) -> SdkResult<ImageStreamLayers> {
        let stream = self.read_stream(namespace, name)?;
        let view = ViewAssembler::new(&*self.layers)
            .with_retry_delay(self.config.layer_retry_delay())
            .assemble(&stream)?;
        Ok(view)
    }

    fn coordinator(&self) -> MutationCoordinator<'_, dyn StreamStore> {
        MutationCoordinator::new(&*self.streams)
            .with_policy(self.config.retry_policy())
            .with_create_stream_on_missing(self.config.create_stream_on_missing)
            .with_registry_hostname(self.hostnames.internal_hostname())
    }

    fn read_stream(&self, namespace: &str, name: &str) -> SdkResult<ImageStream> {
        self.streams
            .get_stream(namespace, name)?
            .ok_or_else(|| SdkError::StreamNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    fn write_tag(
        &self,
        namespace: &str,
        view: &ImageStreamTag,
        write: TagWrite,
        cancel: &Cancellation,
    ) -> SdkResult<ImageStreamTag> {
        let (stream_name, tag) = parse_name_and_tag(&view.name)?;
        validate_stream_name(&stream_name)?;
        let mut reference = view
            .tag
            .clone()
            .ok_or_else(|| SdkError::Invalid(format!("{} carries no tag reference", view.name)))?;
        if reference.name.is_empty() {
            reference.name = tag.clone();
        } else if reference.name != tag {
            return Err(SdkError::Invalid(format!(
                "tag reference {:?} does not match {}",
                reference.name, view.name
            )));
        }

        let stream = self
            .coordinator()
            .create_or_update_tag(namespace, &stream_name, &reference, &write, cancel)?;
        self.tag_view(&stream, &tag, false)
    }

    fn tag_view(&self, stream: &ImageStream, tag: &str, strict: bool) -> SdkResult<ImageStreamTag> {
        let spec = stream.spec_tag(tag);
        let latest = stream.latest(tag);
        if spec.is_none() && latest.is_none() {
            return Err(SdkError::TagNotFound {
                stream: stream.key(),
                tag: tag.to_string(),
            });
        }

        let mut view = ImageStreamTag::new(stream.namespace(), stream.name(), tag);
        view.resource_version = stream.metadata.resource_version.clone();
        view.tag = spec.cloned();
        if let Some(event) = latest {
            view.generation = event.generation;
            if !event.image.is_empty() {
                match self.images.get_image(&event.image)? {
                    Some(mut image) => {
                        image.docker_image_reference = event.docker_image_reference.clone();
                        view.image = Some(image);
                    }
                    None if strict => return Err(SdkError::ImageNotFound(event.image.clone())),
                    None => {}
                }
            }
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use ist_layers::InMemoryLayerIndex;
    use ist_store::{InMemoryImageStore, InMemoryStreamStore};
    use ist_types::{Image, LayerDescriptor, ObjectReference, Reason, TagReference};

    struct Fixture {
        streams: Arc<InMemoryStreamStore>,
        layers: Arc<InMemoryLayerIndex>,
        engine: Engine,
    }

    fn fixture() -> Fixture {
        let streams = Arc::new(InMemoryStreamStore::new());
        let images = Arc::new(InMemoryImageStore::new());
        let layers = Arc::new(InMemoryLayerIndex::new());
        layers.mark_synced();
        let config = EngineConfig {
            registry_hostname: Some("registry:5000".into()),
            layer_retry_delay_ms: 0,
            ..EngineConfig::default()
        };
        let engine = Engine::new(streams.clone(), images, layers.clone(), config);
        Fixture {
            streams,
            layers,
            engine,
        }
    }

    fn mapping(stream: &str, tag: &str, image: Image) -> ImageStreamMapping {
        ImageStreamMapping {
            namespace: "test".into(),
            name: stream.into(),
            tag: tag.into(),
            image,
        }
    }

    fn istag(name: &str, from: ObjectReference) -> ImageStreamTag {
        let (stream, tag) = name.split_once(':').unwrap();
        ImageStreamTag::new("test", stream, tag).with_tag(TagReference::new(tag).with_from(from))
    }

    #[test]
    fn mapping_on_empty_stream() {
        let f = fixture();
        f.streams.create_stream(&ImageStream::new("test", "is")).unwrap();
        let cancel = Cancellation::new();
        let stream = f
            .engine
            .create_mapping(&mapping("is", "latest", Image::new("sha256:deadbeef")), &cancel)
            .unwrap();

        let items = stream.history("latest").unwrap().items();
        assert_eq!(items[0].image, "sha256:deadbeef");
        assert_eq!(items[0].docker_image_reference, "registry:5000/test/is@sha256:deadbeef");
        assert_eq!(stream.generation(), 1);

        let view = f.engine.get_tag("test", "is:latest").unwrap();
        let image = view.image.unwrap();
        assert_eq!(image.name, "sha256:deadbeef");
        assert_eq!(image.docker_image_reference, "registry:5000/test/is@sha256:deadbeef");
        assert_eq!(view.generation, 1);
    }

    #[test]
    fn remapping_existing_image_is_tolerated() {
        let f = fixture();
        let cancel = Cancellation::new();
        f.engine
            .create_mapping(&mapping("is", "a", Image::new("sha256:aa")), &cancel)
            .unwrap();
        let stream = f
            .engine
            .create_mapping(&mapping("is", "b", Image::new("sha256:aa")), &cancel)
            .unwrap();
        assert_eq!(stream.latest("b").unwrap().image, "sha256:aa");
    }

    #[test]
    fn retargeting_prepends_event() {
        let f = fixture();
        let cancel = Cancellation::new();
        f.engine
            .create_tag("test", &istag("is:t1", ObjectReference::docker_image("A")), &cancel)
            .unwrap();
        let view = f
            .engine
            .update_tag("test", &istag("is:t1", ObjectReference::docker_image("B")), &cancel)
            .unwrap();
        assert!(view.image.is_none());

        let stream = f.engine.get_stream("test", "is").unwrap();
        let items = stream.history("t1").unwrap().items();
        assert_eq!(items.len(), 2);
        assert_eq!((items[0].image.as_str(), items[0].docker_image_reference.as_str()), ("", "B"));
        assert_eq!(items[1].docker_image_reference, "A");
        assert_eq!(stream.status.docker_image_repository, "registry:5000/test/is");
    }

    #[test]
    fn create_existing_tag_is_already_exists() {
        let f = fixture();
        let cancel = Cancellation::new();
        let tag = istag("is:t", ObjectReference::docker_image("nginx"));
        f.engine.create_tag("test", &tag, &cancel).unwrap();
        let err = f.engine.create_tag("test", &tag, &cancel).unwrap_err();
        assert_eq!(err.reason(), Reason::AlreadyExists);
    }

    #[test]
    fn stale_resource_version_is_conflict() {
        let f = fixture();
        let cancel = Cancellation::new();
        let created = f
            .engine
            .create_tag("test", &istag("is:t", ObjectReference::docker_image("nginx")), &cancel)
            .unwrap();

        let mut first = istag("is:t", ObjectReference::docker_image("redis"));
        first.resource_version = created.resource_version.clone();
        f.engine.update_tag("test", &first, &cancel).unwrap();

        let mut stale = istag("is:t", ObjectReference::docker_image("httpd"));
        stale.resource_version = created.resource_version;
        let err = f.engine.update_tag("test", &stale, &cancel).unwrap_err();
        assert_eq!(err.reason(), Reason::Conflict);
    }

    #[test]
    fn mismatched_tag_name_is_invalid() {
        let f = fixture();
        let mut view = istag("is:t", ObjectReference::docker_image("nginx"));
        view.tag.as_mut().unwrap().name = "other".into();
        let err = f.engine.create_tag("test", &view, &Cancellation::new()).unwrap_err();
        assert_eq!(err.reason(), Reason::Invalid);

        let bare = ImageStreamTag::new("test", "is", "t");
        let err = f.engine.create_tag("test", &bare, &Cancellation::new()).unwrap_err();
        assert_eq!(err.reason(), Reason::Invalid);
    }

    #[test]
    fn malformed_names_are_bad_request() {
        let f = fixture();
        assert_eq!(f.engine.get_tag("test", "no-colon").unwrap_err().reason(), Reason::BadRequest);
        assert_eq!(f.engine.get_image("test", "no-at").unwrap_err().reason(), Reason::BadRequest);
    }

    #[test]
    fn delete_spec_only_then_missing() {
        let f = fixture();
        let cancel = Cancellation::new();
        let spec_only = ImageStreamTag::new("test", "is", "t").with_tag(TagReference::new("t"));
        f.engine.create_tag("test", &spec_only, &cancel).unwrap();
        assert!(f.engine.get_tag("test", "is:t").unwrap().image.is_none());

        f.engine.delete_tag("test", "is:t", &cancel).unwrap();
        let err = f.engine.delete_tag("test", "is:t", &cancel).unwrap_err();
        assert_eq!(err.reason(), Reason::NotFound);
        assert_eq!(f.engine.get_tag("test", "is:t").unwrap_err().reason(), Reason::NotFound);
    }

    #[test]
    fn list_tags_spans_streams() {
        let f = fixture();
        let cancel = Cancellation::new();
        f.engine
            .create_mapping(&mapping("web", "latest", Image::new("sha256:aa")), &cancel)
            .unwrap();
        f.engine
            .create_tag("test", &istag("api:v1", ObjectReference::docker_image("api:1")), &cancel)
            .unwrap();
        let names: Vec<String> = f
            .engine
            .list_tags("test")
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["api:v1", "web:latest"]);
        assert!(f.engine.list_tags("empty").unwrap().is_empty());
    }

    #[test]
    fn image_by_prefix() {
        let f = fixture();
        let cancel = Cancellation::new();
        f.engine
            .create_mapping(&mapping("is", "latest", Image::new("sha256:abcdef12")), &cancel)
            .unwrap();
        let isi = f.engine.get_image("test", "is@abcd").unwrap();
        assert_eq!(isi.name, "is@sha256:abcdef12");
        assert_eq!(isi.image.docker_image_reference, "registry:5000/test/is@sha256:abcdef12");

        let err = f.engine.get_image("test", "is@ffff").unwrap_err();
        assert_eq!(err.reason(), Reason::NotFound);
    }

    #[test]
    fn tracking_tag_follows_mapping() {
        let f = fixture();
        let cancel = Cancellation::new();
        f.engine
            .create_tag("test", &istag("is:prod", ObjectReference::image_stream_tag("is:latest")), &cancel)
            .unwrap();
        f.engine
            .create_mapping(&mapping("is", "latest", Image::new("sha256:aa")), &cancel)
            .unwrap();
        let prod = f.engine.get_tag("test", "is:prod").unwrap();
        assert_eq!(prod.image.unwrap().name, "sha256:aa");
    }

    #[test]
    fn layers_of_mapped_images() {
        let f = fixture();
        let cancel = Cancellation::new();
        let image = Image::new("sha256:aa")
            .with_layers(vec![LayerDescriptor::new("sha256:l1", 5, "gzip")]);
        f.layers.upsert_image(&image).unwrap();
        f.engine
            .create_mapping(&mapping("is", "latest", image), &cancel)
            .unwrap();
        f.engine
            .create_mapping(&mapping("is", "next", Image::new("sha256:bb")), &cancel)
            .unwrap();

        let view = f.engine.get_layers("test", "is").unwrap();
        assert_eq!(view.images["sha256:aa"].layers, vec!["sha256:l1"]);
        assert!(view.images["sha256:bb"].image_missing);
        assert_eq!(f.engine.get_layers("test", "nope").unwrap_err().reason(), Reason::NotFound);
    }

    #[test]
    fn unsynced_layer_index_is_server_timeout() {
        let streams = Arc::new(InMemoryStreamStore::new());
        streams.create_stream(&ImageStream::new("test", "is")).unwrap();
        let engine = Engine::new(
            streams,
            Arc::new(InMemoryImageStore::new()),
            Arc::new(InMemoryLayerIndex::new()),
            EngineConfig::default(),
        );
        let err = engine.get_layers("test", "is").unwrap_err();
        assert_eq!(err.reason(), Reason::ServerTimeout);
    }

    struct CountingHostname(AtomicUsize);

    impl RegistryHostnameSource for CountingHostname {
        fn internal_hostname(&self) -> Option<String> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Some(format!("registry-{n}"))
        }
    }

    #[test]
    fn hostname_is_read_per_call() {
        let f = fixture();
        let engine = f
            .engine
            .with_hostname_source(Arc::new(CountingHostname(AtomicUsize::new(0))));
        let cancel = Cancellation::new();
        engine
            .create_mapping(&mapping("is", "a", Image::new("sha256:aa")), &cancel)
            .unwrap();
        let stream = engine
            .create_mapping(&mapping("is", "b", Image::new("sha256:bb")), &cancel)
            .unwrap();
        assert_eq!(stream.latest("a").unwrap().docker_image_reference, "registry-0/test/is@sha256:aa");
        assert_eq!(stream.latest("b").unwrap().docker_image_reference, "registry-1/test/is@sha256:bb");
    }

    #[test]
    fn cancelled_mapping_fails() {
        let f = fixture();
        let cancel = Cancellation::new();
        cancel.cancel();
        let err = f
            .engine
            .create_mapping(&mapping("is", "a", Image::new("sha256:aa")), &cancel)
            .unwrap_err();
        assert_eq!(err.reason(), Reason::Cancelled);
    }

    #[test]
    fn views_serialize_with_resource_names() {
        let f = fixture();
        let cancel = Cancellation::new();
        f.engine
            .create_mapping(&mapping("is", "latest", Image::new("sha256:aa")), &cancel)
            .unwrap();
        let json = serde_json::to_value(f.engine.get_tag("test", "is:latest").unwrap()).unwrap();
        assert_eq!(json["name"], "is:latest");
        assert_eq!(json["image"]["name"], "sha256:aa");
    }
}
