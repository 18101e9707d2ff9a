use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ist",
    about = "Image stream tags: declare, map, and inspect container image tags",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Namespace the command operates in
    #[arg(short, long, global = true, default_value = "default")]
    pub namespace: String,

    /// JSON file holding streams, images, and layer rows
    #[arg(long, global = true, default_value = "ist-state.json")]
    pub state: PathBuf,

    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read, list, set, or delete image stream tags
    Tag(TagArgs),
    /// Show an image of a stream by digest or digest prefix
    Image(ImageArgs),
    /// Record an image as the new head of a tag
    Map(MapArgs),
    /// Show the blobs and manifests referenced by a stream
    Layers(LayersArgs),
    /// Re-resolve every tag of a stream against its sources
    Reconcile(ReconcileArgs),
    /// Show a whole image stream
    Stream(StreamArgs),
}

#[derive(Args)]
pub struct TagArgs {
    #[command(subcommand)]
    pub action: TagAction,
}

#[derive(Subcommand)]
pub enum TagAction {
    /// Show `<stream>:<tag>`
    Get { name: String },
    /// List every tag in the namespace
    List,
    /// Point `<stream>:<tag>` at a source
    Set(SetTagArgs),
    /// Remove `<stream>:<tag>`
    Delete { name: String },
}

#[derive(Args)]
pub struct SetTagArgs {
    /// `<stream>:<tag>`
    pub name: String,
    /// Source name: a pull spec, `[ns/]stream:tag`, or `[ns/]stream@id`
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long, value_enum, default_value = "docker-image")]
    pub kind: SourceKind,
    /// Namespace of the source stream
    #[arg(long)]
    pub from_namespace: Option<String>,
    /// Only write if the stream is still at this resourceVersion
    #[arg(long)]
    pub resource_version: Option<String>,
    /// Fail if the tag already exists
    #[arg(long)]
    pub create: bool,
    /// Tag annotations as key=value
    #[arg(long = "annotation", value_parser = parse_key_value)]
    pub annotations: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    DockerImage,
    ImageStreamTag,
    ImageStreamImage,
}

#[derive(Args)]
pub struct ImageArgs {
    /// `<stream>@<id>`
    pub name: String,
}

#[derive(Args)]
pub struct MapArgs {
    pub stream: String,
    pub tag: String,
    /// Image digest
    pub image: String,
    /// Pull spec of the image; defaults to `<repository>@<digest>`
    #[arg(long)]
    pub reference: Option<String>,
    /// Layer as `<digest>:<size>`, base first
    #[arg(long = "layer", value_parser = parse_layer)]
    pub layers: Vec<(String, u64)>,
    /// Child manifest digests, making the image a manifest list
    #[arg(long = "manifest")]
    pub manifests: Vec<String>,
}

#[derive(Args)]
pub struct LayersArgs {
    pub stream: String,
}

#[derive(Args)]
pub struct ReconcileArgs {
    pub stream: String,
}

#[derive(Args)]
pub struct StreamArgs {
    pub name: String,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

/// `sha256:abc:1024` splits at the last ':'.
fn parse_layer(s: &str) -> Result<(String, u64), String> {
    let (digest, size) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected <digest>:<size>, got {s:?}"))?;
    let size = size
        .parse::<u64>()
        .map_err(|e| format!("invalid layer size in {s:?}: {e}"))?;
    Ok((digest.to_string(), size))
}
