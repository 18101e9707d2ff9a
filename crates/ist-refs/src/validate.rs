//! Structural validation of tag references.
//!
//! Validation runs when a tag reference is written, so the resolver can match
//! exhaustively on [`FromKind`] without re-checking shapes.

use ist_types::{FromKind, TagReference};

use crate::error::{RefError, Result};
use crate::names::validate_tag_name;
use crate::parse::{parse_name_and_id, split_from_name};
use crate::reference::DockerImageReference;

/// Validate the tag reference stored under `key` in a stream's spec.
pub fn validate_tag_reference(key: &str, tag: &TagReference) -> Result<()> {
    let invalid = |reason: String| RefError::InvalidTagReference {
        tag: key.to_string(),
        reason,
    };

    validate_tag_name(key).map_err(|e| invalid(e.to_string()))?;
    if tag.name != key {
        return Err(invalid(format!(
            "name {:?} does not match its key",
            tag.name
        )));
    }

    let Some(from) = &tag.from else {
        return Ok(());
    };
    if from.name.is_empty() {
        return Err(invalid(format!("from.name is required for kind {}", from.kind)));
    }

    match from.kind {
        FromKind::DockerImage => {
            DockerImageReference::parse(&from.name).map_err(|e| invalid(e.to_string()))?;
        }
        FromKind::ImageStreamTag => {
            // Owner names are placeholders: only the shape is checked here.
            let target = split_from_name(&from.name, from.namespace.as_deref(), "-", "-")
                .map_err(|e| invalid(e.to_string()))?;
            validate_tag_name(&target.tag).map_err(|e| invalid(e.to_string()))?;
        }
        FromKind::ImageStreamImage => {
            let rest = from
                .name
                .split_once('/')
                .map(|(_, rest)| rest)
                .unwrap_or(&from.name);
            parse_name_and_id(rest).map_err(|e| invalid(e.to_string()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ist_types::ObjectReference;

    fn tag_from(from: ObjectReference) -> TagReference {
        TagReference::new("t").with_from(from)
    }

    #[test]
    fn empty_from_is_valid() {
        assert!(validate_tag_reference("t", &TagReference::new("t")).is_ok());
    }

    #[test]
    fn key_must_match_name() {
        let err = validate_tag_reference("other", &TagReference::new("t")).unwrap_err();
        assert!(matches!(err, RefError::InvalidTagReference { ref tag, .. } if tag == "other"));
    }

    #[test]
    fn invalid_key_is_rejected() {
        assert!(validate_tag_reference("a:b", &TagReference::new("a:b")).is_err());
    }

    #[test]
    fn docker_image_must_parse() {
        assert!(validate_tag_reference("t", &tag_from(ObjectReference::docker_image("nginx:1.25"))).is_ok());
        assert!(validate_tag_reference("t", &tag_from(ObjectReference::docker_image("bad@ref"))).is_err());
        assert!(validate_tag_reference("t", &tag_from(ObjectReference::docker_image(""))).is_err());
    }

    #[test]
    fn image_stream_tag_shapes() {
        for ok in ["latest", "is:latest", "ns/is:latest"] {
            assert!(
                validate_tag_reference("t", &tag_from(ObjectReference::image_stream_tag(ok))).is_ok(),
                "{ok}"
            );
        }
        for bad in ["is:", "ns/latest", "a:b:c", "bad tag"] {
            assert!(
                validate_tag_reference("t", &tag_from(ObjectReference::image_stream_tag(bad))).is_err(),
                "{bad}"
            );
        }
    }

    #[test]
    fn image_stream_image_shapes() {
        assert!(validate_tag_reference("t", &tag_from(ObjectReference::image_stream_image("is@sha256:aa"))).is_ok());
        assert!(validate_tag_reference("t", &tag_from(ObjectReference::image_stream_image("ns/is@abc"))).is_ok());
        assert!(validate_tag_reference("t", &tag_from(ObjectReference::image_stream_image("is"))).is_err());
    }

    #[test]
    fn errors_are_invalid_class() {
        let err = validate_tag_reference("t", &tag_from(ObjectReference::docker_image(""))).unwrap_err();
        assert_eq!(err.reason(), ist_types::Reason::Invalid);
    }
}
