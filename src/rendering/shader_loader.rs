use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, channel},
        Arc,
    },
    time::Duration,
};

use anyhow::Context;
use id_arena::{Arena, Id};
use notify_debouncer_mini::{
    new_debouncer_opt, notify::*, DebounceEventResult, DebouncedEventKind, Debouncer,
};
use pollster::block_on;
use wgpu::{PollType, RenderPipeline};

const SHADER_FOLDER: &str = "src/shaders";

type PipelineFactory = Box<
    dyn Sync
        + Send
        + Fn(&wgpu::Device, &ShaderDefinition, &str) -> anyhow::Result<wgpu::RenderPipeline>,
>;

#[derive(Debug, Clone)]
pub struct ShaderDefinition {
    pub name: &'static str,
    /// File name inside the shader folder, watched for changes.
    pub path: &'static str,
    /// Copy of the file compiled into the binary, used when the folder is absent.
    pub embedded_source: &'static str,
}

impl ShaderDefinition {
    fn read_source(&self) -> anyhow::Result<String> {
        let path = Path::new(SHADER_FOLDER).join(self.path);

        if !path.exists() {
            return Ok(self.embedded_source.to_string());
        }

        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read shader file {}", path.display()))
    }
}

pub struct ShaderEntry {
    pipeline_id: PipelineId,
    def: ShaderDefinition,
    factory: PipelineFactory,
}

pub type PipelineId = Id<PipelineCacheEntry>;

#[derive(Default)]
pub struct PipelineCacheEntry(Option<wgpu::RenderPipeline>);

impl PipelineCacheEntry {
    pub fn set_pipeline(&mut self, pipeline: wgpu::RenderPipeline) {
        self.0 = Some(pipeline);
    }
}

pub struct PipelineCacheBuilder {
    shaders: Arena<ShaderEntry>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCacheBuilder {
    pub fn new() -> Self {
        Self {
            shaders: Arena::new(),
            pipelines: Arena::new(),
        }
    }

    pub fn add_shader(
        &mut self,
        shader_def: ShaderDefinition,
        factory: PipelineFactory,
    ) -> PipelineId {
        let pipeline_id = self.pipelines.alloc(PipelineCacheEntry::default());
        self.shaders.alloc(ShaderEntry {
            pipeline_id,
            def: shader_def,
            factory,
        });
        pipeline_id
    }

    pub fn build(self) -> PipelineCache {
        PipelineCache {
            shaders: Arc::new(self.shaders),
            pipelines: self.pipelines,
        }
    }
}

pub struct PipelineCache {
    shaders: Arc<Arena<ShaderEntry>>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCache {
    pub fn get(&self, id: PipelineId) -> Option<&RenderPipeline> {
        self.pipelines.get(id).and_then(|entry| entry.0.as_ref())
    }

    fn get_entry_mut(&mut self, id: PipelineId) -> Option<&mut PipelineCacheEntry> {
        self.pipelines.get_mut(id)
    }
}

/// Compiles every registered pipeline up front, then recompiles pipelines on a
/// watcher thread whenever their shader file changes on disk.
pub(crate) struct ShaderLoader {
    pub cache: PipelineCache,
    receiver: mpsc::Receiver<(&'static str, PipelineId, wgpu::RenderPipeline)>,
    _debouncer: Option<Debouncer<RecommendedWatcher>>,
}

impl ShaderLoader {
    pub fn new(device: wgpu::Device, cache_builder: PipelineCacheBuilder) -> anyhow::Result<Self> {
        let mut cache = cache_builder.build();

        let shaders = cache.shaders.clone();
        for (_, shader) in shaders.iter() {
            let pipeline = compile(&device, &shader.def, &shader.factory)
                .with_context(|| format!("Failed to compile shader: {}", shader.def.name))?;

            if let Some(entry) = cache.get_entry_mut(shader.pipeline_id) {
                entry.set_pipeline(pipeline);
            }
        }

        let (send_new_pipelines, recv_new_pipelines) = channel();

        let debouncer = match watch_shader_folder(device, shaders, send_new_pipelines) {
            Ok(debouncer) => Some(debouncer),
            Err(error) => {
                log::info!("Shader hot reload disabled: {:#}", error);
                None
            }
        };

        Ok(Self {
            cache,
            receiver: recv_new_pipelines,
            _debouncer: debouncer,
        })
    }

    pub(crate) fn load_pending_shaders(&mut self) {
        while let Ok((name, pipeline_id, pipeline)) = self.receiver.try_recv() {
            if let Some(entry) = self.cache.get_entry_mut(pipeline_id) {
                log::info!("Shader reloaded: {}", name);
                entry.set_pipeline(pipeline);
            }
        }
    }
}

fn watch_shader_folder(
    device: wgpu::Device,
    shaders: Arc<Arena<ShaderEntry>>,
    send_new_pipelines: mpsc::Sender<(&'static str, PipelineId, wgpu::RenderPipeline)>,
) -> anyhow::Result<Debouncer<RecommendedWatcher>> {
    let absolute_shader_folder: PathBuf = Path::new(SHADER_FOLDER)
        .canonicalize()
        .with_context(|| format!("Shader folder {} not found", SHADER_FOLDER))?;

    let mut debouncer = new_debouncer_opt(
        notify_debouncer_mini::Config::default().with_timeout(Duration::from_millis(100)),
        move |res: DebounceEventResult| match res {
            Ok(events) => {
                for event in events {
                    if event.kind != DebouncedEventKind::Any {
                        continue;
                    }

                    for (_, entry) in shaders
                        .iter()
                        .filter(|(_, entry)| event.path.ends_with(entry.def.path))
                    {
                        match compile(&device, &entry.def, &entry.factory) {
                            Ok(pipeline) => {
                                if send_new_pipelines
                                    .send((entry.def.name, entry.pipeline_id, pipeline))
                                    .is_err()
                                {
                                    return;
                                }
                            }
                            Err(e) => log::error!("Failed to reload shader: {:#}", e),
                        }
                    }
                }
            }
            Err(e) => log::error!("Error debouncing shader changes: {}", e),
        },
    )
    .context("Failed to create shader watcher")?;

    debouncer
        .watcher()
        .watch(&absolute_shader_folder, RecursiveMode::Recursive)
        .context("Failed to watch shader folder")?;

    Ok(debouncer)
}

fn compile(
    device: &wgpu::Device,
    shader_def: &ShaderDefinition,
    factory: &PipelineFactory,
) -> anyhow::Result<wgpu::RenderPipeline> {
    let shader_code = shader_def.read_source()?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline = factory(device, shader_def, &shader_code);

    device
        .poll(PollType::Wait)
        .context("Failed to poll device after shader compilation.")?;

    let error = block_on(device.pop_error_scope());

    if let Some(error) = error {
        return Err(anyhow::anyhow!(
            "Shader compilation failed for {}: {}",
            shader_def.name,
            error
        ));
    };

    pipeline
}
