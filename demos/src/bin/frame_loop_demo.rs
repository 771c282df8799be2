//! # Frame Loop Demo
//!
//! Drives a deferred-style frame through the render graph on the dummy
//! backend: shadow map, G-buffer, async-compute ambient occlusion, compute
//! lighting and a tonemap into an imported backbuffer.
//!
//! ```bash
//! # Run 120 frames and dump the last frame's graph
//! ./frame_loop_demo --max-frames 120 --graphviz frame.dot
//! ```

use std::sync::Arc;

use clap::Parser;
use redlilium_rendergraph::backend::{QueueType, TextureHandle};
use redlilium_rendergraph::types::{ShaderResourceViewDescriptor, UnorderedAccessViewDescriptor};
use redlilium_rendergraph::{
    AccessFlags, DummyDevice, LoadOp, PassType, RecordingCommandList, RenderGraph,
    RenderGraphConfig, RgHandle, TextureDescriptor, TextureFormat, TextureUsage,
};

/// Render graph frame loop on the dummy backend.
#[derive(Parser, Debug)]
#[command(name = "frame_loop_demo", version)]
struct Args {
    /// Number of frames to run.
    #[arg(long, default_value = "8")]
    max_frames: u64,

    /// Backbuffer width in pixels.
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Backbuffer height in pixels.
    #[arg(long, default_value = "720")]
    height: u32,

    /// Run ambient occlusion on the graphics queue instead of async compute.
    #[arg(long)]
    no_async_compute: bool,

    /// Frames an idle transient survives before it is destroyed.
    #[arg(long, default_value = "30")]
    eviction_frames: u64,

    /// Write the last frame's graph to this file in DOT format.
    #[arg(long)]
    graphviz: Option<String>,
}

#[derive(Default)]
struct ShadowData {
    map: RgHandle,
}

#[derive(Default)]
struct GBufferData {
    albedo: RgHandle,
    normal: RgHandle,
    depth: RgHandle,
}

#[derive(Default)]
struct ComputeData {
    output: RgHandle,
    groups: (u32, u32),
}

#[derive(Default)]
struct TonemapData {
    hdr: RgHandle,
    backbuffer: RgHandle,
}

fn declare_frame(graph: &mut RenderGraph, args: &Args, backbuffer: TextureHandle) {
    let (width, height) = (args.width, args.height);
    let groups = (width.div_ceil(8), height.div_ceil(8));

    let shadow = graph
        .add_pass::<ShadowData, _, _>(
            "shadow",
            PassType::Graphics,
            |data, builder| {
                let desc = TextureDescriptor::new_2d(2048, 2048, TextureFormat::Depth32Float, TextureUsage::empty());
                let map = builder.create_texture(desc, "shadow_map");
                data.map = builder.write_depth(map, 0, LoadOp::clear_depth(1.0), LoadOp::DontCare);
            },
            |_, context| {
                context.command_list().draw(36, 64);
                Ok(())
            },
        )
        .map;

    let gbuffer = graph.event_scope("geometry", |graph| {
        let gbuffer = graph.add_pass::<GBufferData, _, _>(
            "gbuffer",
            PassType::Graphics,
            |data, builder| {
                let color = TextureDescriptor::new_2d(width, height, TextureFormat::Rgba8Unorm, TextureUsage::empty());
                let normal = TextureDescriptor::new_2d(width, height, TextureFormat::Rgb10A2Unorm, TextureUsage::empty());
                let depth = TextureDescriptor::new_2d(width, height, TextureFormat::Depth32Float, TextureUsage::empty());

                let albedo = builder.create_texture(color, "albedo");
                let normal = builder.create_texture(normal, "normal");
                let depth = builder.create_texture(depth, "depth");
                data.albedo = builder.write_color(0, albedo, 0, LoadOp::clear_color(0.0, 0.0, 0.0, 1.0));
                data.normal = builder.write_color(1, normal, 0, LoadOp::DontCare);
                data.depth = builder.write_depth(depth, 0, LoadOp::clear_depth(1.0), LoadOp::DontCare);
            },
            |_, context| {
                context.command_list().draw(36, 1024);
                Ok(())
            },
        );
        (gbuffer.albedo, gbuffer.normal, gbuffer.depth)
    });
    let (albedo, normal, depth) = gbuffer;

    let ao_queue = if args.no_async_compute {
        PassType::Compute
    } else {
        PassType::AsyncCompute
    };
    let ao = graph
        .add_pass::<ComputeData, _, _>(
            "ambient_occlusion",
            ao_queue,
            |data, builder| {
                builder.read(depth, AccessFlags::COMPUTE_SRV, 0);
                let desc = TextureDescriptor::new_2d(width, height, TextureFormat::R8Unorm, TextureUsage::empty());
                let ao = builder.create_texture(desc, "ambient_occlusion");
                data.output = builder.write(ao, AccessFlags::COMPUTE_UAV, 0);
                data.groups = groups;
            },
            |data, context| {
                context.unordered_access_view(data.output, UnorderedAccessViewDescriptor::default())?;
                context.command_list().dispatch(data.groups.0, data.groups.1, 1);
                Ok(())
            },
        )
        .output;

    let hdr = graph
        .add_pass::<ComputeData, _, _>(
            "lighting",
            PassType::Compute,
            |data, builder| {
                for input in [shadow, albedo, normal, ao] {
                    builder.read(input, AccessFlags::COMPUTE_SRV, 0);
                }
                let desc = TextureDescriptor::new_2d(width, height, TextureFormat::Rgba16Float, TextureUsage::empty());
                let hdr = builder.create_texture(desc, "hdr");
                data.output = builder.write(hdr, AccessFlags::COMPUTE_UAV, 0);
                data.groups = groups;
            },
            |data, context| {
                context.unordered_access_view(data.output, UnorderedAccessViewDescriptor::default())?;
                context.command_list().dispatch(data.groups.0, data.groups.1, 1);
                Ok(())
            },
        )
        .output;

    let desc = TextureDescriptor::new_2d(width, height, TextureFormat::Bgra8Unorm, TextureUsage::RENDER_ATTACHMENT)
        .with_label("backbuffer");
    let imported = graph.import_texture(backbuffer, desc, AccessFlags::PRESENT);
    let output = graph
        .add_pass::<TonemapData, _, _>(
            "tonemap",
            PassType::Graphics,
            |data, builder| {
                data.hdr = builder.read(hdr, AccessFlags::PIXEL_SHADER_SRV, 0);
                data.backbuffer = builder.write_color(0, imported, 0, LoadOp::DontCare);
            },
            |data, context| {
                context.shader_resource_view(data.hdr, ShaderResourceViewDescriptor::texture_mip(0, 0))?;
                context.command_list().draw(3, 1);
                Ok(())
            },
        )
        .backbuffer;
    graph.present(output, AccessFlags::PRESENT);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    redlilium_rendergraph::init();

    let device = Arc::new(DummyDevice::new());
    let config = RenderGraphConfig::default().with_eviction_frames(args.eviction_frames);
    let mut graph = RenderGraph::with_config(device.clone(), config)?;
    let mut graphics = RecordingCommandList::new(QueueType::Graphics);
    let mut compute = RecordingCommandList::new(QueueType::Compute);
    let backbuffer = TextureHandle::new(u64::MAX);

    for frame in 0..args.max_frames {
        device.advance_frame();
        graph.clear();

        declare_frame(&mut graph, &args, backbuffer);
        graph.compile()?;
        graph.execute(&mut graphics, &mut compute)?;

        let graphics_commands = graphics.take_commands();
        let compute_commands = compute.take_commands();
        log::debug!(
            "frame {frame}: {} graphics commands, {} compute commands, fences {}/{}",
            graphics_commands.len(),
            compute_commands.len(),
            graph.graphics_fence_value(),
            graph.compute_fence_value()
        );
    }

    let stats = device.stats();
    log::info!(
        "ran {} frames: {} heaps, {} textures, {} views created; {} heap slots live",
        args.max_frames,
        stats.heaps_created,
        stats.textures_created,
        stats.views_created,
        graph.allocator().slot_count()
    );

    if let Some(path) = &args.graphviz {
        std::fs::write(path, graph.export_graphviz())?;
        log::info!("wrote render graph to {path}");
    }

    Ok(())
}
