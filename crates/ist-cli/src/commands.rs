use anyhow::Context;
use colored::Colorize;
use ist_sdk::{
    Cancellation, Engine, EngineConfig, Image, ImageStreamMapping, ImageStreamTag, ObjectReference,
    SdkError, TagReference,
};
use ist_types::image::{MEDIA_TYPE_LAYER_GZIP, MEDIA_TYPE_MANIFEST_LIST, MEDIA_TYPE_MANIFEST_V2};
use ist_types::{FromKind, LayerDescriptor};
use serde::Serialize;

use crate::cli::*;
use crate::state::Workspace;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let workspace = Workspace::load(&cli.state)?;
    let engine = workspace.engine(config);
    let ctx = Ctx {
        engine: &engine,
        namespace: &cli.namespace,
        format: &cli.format,
        cancel: Cancellation::new(),
    };

    let mutated = match cli.command {
        Command::Tag(args) => cmd_tag(&ctx, args.action)?,
        Command::Image(args) => cmd_image(&ctx, &args.name)?,
        Command::Map(args) => cmd_map(&ctx, &workspace, args)?,
        Command::Layers(args) => cmd_layers(&ctx, &args.stream)?,
        Command::Reconcile(args) => cmd_reconcile(&ctx, &args.stream)?,
        Command::Stream(args) => cmd_stream(&ctx, &args.name)?,
    };
    if mutated {
        workspace.save()?;
    }
    Ok(())
}

struct Ctx<'a> {
    engine: &'a Engine,
    namespace: &'a str,
    format: &'a OutputFormat,
    cancel: Cancellation,
}

impl Ctx<'_> {
    /// Print `value` as JSON, or run `text` for the human format.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => text(value),
        }
        Ok(())
    }
}

/// Keep the engine's reason code visible in the CLI error.
fn reasoned(e: SdkError) -> anyhow::Error {
    anyhow::anyhow!("{} [{}]", e, e.reason())
}

fn cmd_tag(ctx: &Ctx<'_>, action: TagAction) -> anyhow::Result<bool> {
    match action {
        TagAction::Get { name } => {
            let tag = ctx.engine.get_tag(ctx.namespace, &name).map_err(reasoned)?;
            ctx.emit(&tag, print_tag)?;
            Ok(false)
        }
        TagAction::List => {
            let tags = ctx.engine.list_tags(ctx.namespace).map_err(reasoned)?;
            ctx.emit(&tags, |tags| {
                if tags.is_empty() {
                    println!("No tags in {}.", ctx.namespace.bold());
                }
                for tag in tags {
                    let image = tag
                        .image
                        .as_ref()
                        .map(|i| i.name.as_str())
                        .unwrap_or("<none>");
                    println!("{}  {}  {}", tag.name.yellow().bold(), image.dimmed(), source_of(tag));
                }
            })?;
            Ok(false)
        }
        TagAction::Set(args) => {
            let (view, create) = tag_view_from(ctx.namespace, args);
            let written = if create {
                ctx.engine.create_tag(ctx.namespace, &view, &ctx.cancel)
            } else {
                ctx.engine.update_tag(ctx.namespace, &view, &ctx.cancel)
            }
            .map_err(reasoned)?;
            ctx.emit(&written, |tag| {
                println!("{} Set {}", "✓".green().bold(), tag.name.yellow());
                print_tag(tag);
            })?;
            Ok(true)
        }
        TagAction::Delete { name } => {
            ctx.engine
                .delete_tag(ctx.namespace, &name, &ctx.cancel)
                .map_err(reasoned)?;
            println!("Deleted tag {}", name.yellow());
            Ok(true)
        }
    }
}

/// Build the tag view `tag set` writes, and whether it must be a create.
fn tag_view_from(namespace: &str, args: SetTagArgs) -> (ImageStreamTag, bool) {
    let mut reference = TagReference::new("");
    if let Some(from) = args.from {
        let kind = match args.kind {
            SourceKind::DockerImage => FromKind::DockerImage,
            SourceKind::ImageStreamTag => FromKind::ImageStreamTag,
            SourceKind::ImageStreamImage => FromKind::ImageStreamImage,
        };
        let mut source = ObjectReference::new(kind, from);
        if let Some(ns) = args.from_namespace {
            source = source.in_namespace(ns);
        }
        reference = reference.with_from(source);
    }
    reference.annotations.extend(args.annotations);

    let view = ImageStreamTag {
        namespace: namespace.to_string(),
        name: args.name,
        resource_version: args.resource_version.unwrap_or_default(),
        tag: Some(reference),
        image: None,
        generation: 0,
    };
    (view, args.create)
}

fn cmd_image(ctx: &Ctx<'_>, name: &str) -> anyhow::Result<bool> {
    let isimage = ctx.engine.get_image(ctx.namespace, name).map_err(reasoned)?;
    ctx.emit(&isimage, |isimage| {
        println!("Image {}", isimage.name.yellow().bold());
        println!("  Pull spec: {}", isimage.image.docker_image_reference.cyan());
        print_image(&isimage.image);
    })?;
    Ok(false)
}

fn cmd_map(ctx: &Ctx<'_>, workspace: &Workspace, args: MapArgs) -> anyhow::Result<bool> {
    let mut image = Image::new(args.image).with_layers(
        args.layers
            .into_iter()
            .map(|(digest, size)| LayerDescriptor::new(digest, size, MEDIA_TYPE_LAYER_GZIP))
            .collect(),
    );
    image.manifest_media_type = if args.manifests.is_empty() {
        MEDIA_TYPE_MANIFEST_V2.to_string()
    } else {
        MEDIA_TYPE_MANIFEST_LIST.to_string()
    };
    image = image.with_manifests(args.manifests);
    if let Some(reference) = args.reference {
        image = image.with_reference(reference);
    }

    let mapping = ImageStreamMapping {
        namespace: ctx.namespace.to_string(),
        name: args.stream,
        tag: args.tag,
        image,
    };
    let stream = ctx
        .engine
        .create_mapping(&mapping, &ctx.cancel)
        .map_err(reasoned)?;
    // The image store's watcher would normally feed the layer index.
    workspace.layers.upsert_image(&mapping.image)?;

    ctx.emit(&stream, |stream| {
        println!(
            "{} Mapped {} to {}:{}",
            "✓".green().bold(),
            mapping.image.name.cyan(),
            stream.name().bold(),
            mapping.tag.yellow()
        );
        if let Some(history) = stream.history(&mapping.tag) {
            println!("  History: {} events", history.len());
        }
    })?;
    Ok(true)
}

fn cmd_layers(ctx: &Ctx<'_>, stream: &str) -> anyhow::Result<bool> {
    let view = ctx.engine.get_layers(ctx.namespace, stream).map_err(reasoned)?;
    ctx.emit(&view, |view| {
        println!("{} ({} blobs)", "Blobs".bold(), view.blobs.len());
        for (digest, data) in &view.blobs {
            let size = data.size.map(|s| s.to_string()).unwrap_or_else(|| "?".into());
            println!("  {}  {:>10}  {}", digest, size, data.media_type.dimmed());
        }
        println!("{} ({})", "Images".bold(), view.images.len());
        for (digest, refs) in &view.images {
            if refs.image_missing {
                println!("  {}  {}", digest, "missing".red());
            } else {
                println!("  {}  {} layers", digest, refs.layers.len());
            }
        }
    })?;
    Ok(false)
}

fn cmd_reconcile(ctx: &Ctx<'_>, stream: &str) -> anyhow::Result<bool> {
    let stream = ctx
        .engine
        .reconcile(ctx.namespace, stream, &ctx.cancel)
        .map_err(reasoned)?;
    ctx.emit(&stream, |stream| {
        println!(
            "{} Reconciled {} (generation {})",
            "✓".green().bold(),
            stream.key().bold(),
            stream.generation()
        );
    })?;
    Ok(true)
}

fn cmd_stream(ctx: &Ctx<'_>, name: &str) -> anyhow::Result<bool> {
    let stream = ctx.engine.get_stream(ctx.namespace, name).map_err(reasoned)?;
    ctx.emit(&stream, |stream| {
        println!("Stream {}", stream.key().yellow().bold());
        println!("  Generation: {}", stream.generation());
        println!("  Resource version: {}", stream.metadata.resource_version);
        if !stream.status.docker_image_repository.is_empty() {
            println!("  Repository: {}", stream.status.docker_image_repository.cyan());
        }
        for tag in stream.tag_names() {
            let head = stream
                .latest(&tag)
                .map(|e| e.docker_image_reference.as_str())
                .unwrap_or("<none>");
            let events = stream.history(&tag).map(|h| h.len()).unwrap_or(0);
            println!("  {}  {}  ({} events)", tag.yellow(), head, events);
        }
    })?;
    Ok(false)
}

fn print_tag(tag: &ImageStreamTag) {
    println!("Tag {}  (rv {})", tag.name.yellow().bold(), tag.resource_version);
    println!("  Source: {}", source_of(tag));
    match &tag.image {
        Some(image) => {
            println!("  Image: {}", image.name.cyan());
            println!("  Pull spec: {}", image.docker_image_reference);
            println!("  Generation: {}", tag.generation);
        }
        None => println!("  Image: {}", "<none>".dimmed()),
    }
}

fn print_image(image: &Image) {
    if !image.manifests.is_empty() {
        println!("  Manifests:");
        for child in &image.manifests {
            println!("    {child}");
        }
    }
    for layer in &image.layers {
        let size = layer.size.map(|s| s.to_string()).unwrap_or_else(|| "?".into());
        println!("  Layer {}  {}", layer.name, size.dimmed());
    }
}

fn source_of(tag: &ImageStreamTag) -> String {
    match tag.tag.as_ref().and_then(|t| t.from.as_ref()) {
        Some(from) => match &from.namespace {
            Some(ns) => format!("{} {}/{}", from.kind.as_str(), ns, from.name),
            None => format!("{} {}", from.kind.as_str(), from.name),
        },
        None => "-".to_string(),
    }
}
