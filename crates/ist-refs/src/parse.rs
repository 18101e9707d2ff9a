//! Parsing of `stream:tag` and `stream@id` names.

use crate::error::{RefError, Result};

/// Split `"<stream>:<tag>"` into `(stream, tag)`.
///
/// Exactly one `:` is allowed and both parts must be non-empty. Names
/// containing `@` are image stream images and are rejected.
pub fn parse_name_and_tag(input: &str) -> Result<(String, String)> {
    if input.contains('@') {
        return Err(RefError::malformed(
            input,
            "is an image stream image, not an image stream tag",
        ));
    }
    let mut parts = input.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(tag), None) => {
            if name.is_empty() || tag.is_empty() {
                return Err(RefError::malformed(input, "must have a name and a tag"));
            }
            Ok((name.to_string(), tag.to_string()))
        }
        _ => Err(RefError::malformed(input, "expected exactly one ':' delimiter")),
    }
}

/// Split `"<stream>@<id>"` into `(stream, id)`.
///
/// Exactly one `@` is allowed and both parts must be non-empty. The id may
/// itself contain `:` (`sha256:...`).
pub fn parse_name_and_id(input: &str) -> Result<(String, String)> {
    let mut parts = input.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(id), None) => {
            if name.is_empty() || id.is_empty() {
                return Err(RefError::malformed(input, "must have a name and an id"));
            }
            Ok((name.to_string(), id.to_string()))
        }
        _ => Err(RefError::malformed(input, "expected exactly one '@' delimiter")),
    }
}

/// Target of an `ImageStreamTag` source after namespace defaulting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TagTarget {
    pub namespace: String,
    pub stream: String,
    pub tag: String,
}

impl TagTarget {
    /// Returns `true` if the target lives in the given stream.
    pub fn is_stream(&self, namespace: &str, stream: &str) -> bool {
        self.namespace == namespace && self.stream == stream
    }
}

/// Target of an `ImageStreamImage` source after namespace defaulting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageTarget {
    pub namespace: String,
    pub stream: String,
    pub id: String,
}

/// Split an optional `<namespace>/` prefix off a `from` name.
fn split_namespace<'a>(input: &'a str, name: &'a str) -> Result<(Option<&'a str>, &'a str)> {
    match name.split_once('/') {
        None => Ok((None, name)),
        Some((ns, rest)) => {
            if ns.is_empty() || rest.is_empty() || rest.contains('/') {
                return Err(RefError::malformed(
                    input,
                    "expected at most one '/' between namespace and name",
                ));
            }
            Ok((Some(ns), rest))
        }
    }
}

/// Resolve an `ImageStreamTag` `from` name against its owner.
///
/// Accepts `"<namespace>/<stream>:<tag>"`, `"<stream>:<tag>"`, and a bare
/// `"<tag>"` (same stream). The namespace embedded in the name wins over
/// `from_namespace`, which wins over `owner_namespace`.
pub fn split_from_name(
    name: &str,
    from_namespace: Option<&str>,
    owner_namespace: &str,
    owner_stream: &str,
) -> Result<TagTarget> {
    if name.is_empty() {
        return Err(RefError::malformed(name, "name must not be empty"));
    }
    let (embedded_ns, rest) = split_namespace(name, name)?;
    let namespace = embedded_ns
        .or(from_namespace.filter(|ns| !ns.is_empty()))
        .unwrap_or(owner_namespace)
        .to_string();

    if rest.contains(':') || rest.contains('@') {
        let (stream, tag) = parse_name_and_tag(rest).map_err(|_| {
            RefError::malformed(name, "expected [<namespace>/]<stream>:<tag>")
        })?;
        return Ok(TagTarget {
            namespace,
            stream,
            tag,
        });
    }

    if embedded_ns.is_some() {
        return Err(RefError::malformed(
            name,
            "a namespaced reference must name a stream and a tag",
        ));
    }
    Ok(TagTarget {
        namespace,
        stream: owner_stream.to_string(),
        tag: rest.to_string(),
    })
}

/// Resolve an `ImageStreamImage` `from` name (`"[<namespace>/]<stream>@<id>"`).
pub fn split_image_name(
    name: &str,
    from_namespace: Option<&str>,
    owner_namespace: &str,
) -> Result<ImageTarget> {
    let (embedded_ns, rest) = split_namespace(name, name)?;
    let namespace = embedded_ns
        .or(from_namespace.filter(|ns| !ns.is_empty()))
        .unwrap_or(owner_namespace)
        .to_string();
    let (stream, id) = parse_name_and_id(rest)?;
    Ok(ImageTarget {
        namespace,
        stream,
        id,
    })
}
