//! GPU mirror of the active model.
//!
//! [`ModelRenderer`] uploads one vertex, index and instance buffer per mesh
//! when a model becomes active. Material state is synced lazily: each frame
//! only materials flagged dirty get their tint uniform rewritten and their
//! bind group rebuilt. Decoded surface images are uploaded once per texture
//! handle and shared by every mesh that uses them.

use std::{cell::RefCell, collections::HashMap, rc::Weak};

use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{material::Material, scene_graph::Model, texture::Texture},
    pipelines::basic::MaterialUniform,
    resources::texture::TextureHandle,
};

struct GpuMesh {
    name: String,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
    instance_buffer: wgpu::Buffer,
    material: Weak<RefCell<Material>>,
    material_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Texture id and whether its pixels were bound (false: blank stand-in).
    bound_texture: Option<(u64, bool)>,
}

#[derive(Default)]
pub struct ModelRenderer {
    generation: Option<u64>,
    meshes: Vec<GpuMesh>,
    textures: HashMap<u64, Texture>,
}

impl ModelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the GPU state in line with `model`. Buffers are rebuilt when the
    /// load generation changes, materials whenever they are dirty.
    pub fn sync(&mut self, ctx: &Context, generation: u64, model: Option<&Model>) {
        let Some(model) = model else {
            if !self.meshes.is_empty() {
                self.meshes.clear();
                self.textures.clear();
            }
            self.generation = None;
            return;
        };

        if self.generation != Some(generation) {
            self.upload(ctx, model);
            self.generation = Some(generation);
        }

        for mesh in &mut self.meshes {
            let Some(material) = mesh.material.upgrade() else {
                continue;
            };
            let mut material = material.borrow_mut();
            let texture = material.texture().cloned();
            let ready = texture.as_ref().is_some_and(|t| t.image().is_some());
            let wanted = texture.as_ref().map(|t| (t.id(), ready));
            if !material.take_dirty() && wanted == mesh.bound_texture {
                continue;
            }

            let uniform = MaterialUniform {
                tint: material.tint().to_linear(),
            };
            ctx.queue
                .write_buffer(&mesh.material_buffer, 0, bytemuck::cast_slice(&[uniform]));

            if wanted != mesh.bound_texture {
                let view = texture_for(ctx, &mut self.textures, texture.as_ref());
                mesh.bind_group = mk_material_bind_group(ctx, view, &mesh.material_buffer, &mesh.name);
                mesh.bound_texture = wanted;
            }
        }

        // Drop uploads no mesh refers to anymore.
        let in_use = self
            .meshes
            .iter()
            .filter_map(|mesh| mesh.bound_texture.map(|(id, _)| id))
            .collect::<Vec<_>>();
        self.textures.retain(|id, _| in_use.contains(id));
    }

    pub fn draw(&self, ctx: &Context, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&ctx.pipeline);
        render_pass.set_bind_group(1, &ctx.camera.bind_group, &[]);
        render_pass.set_bind_group(2, &ctx.light.bind_group, &[]);
        for mesh in &self.meshes {
            render_pass.set_bind_group(0, &mesh.bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, mesh.instance_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.num_elements, 0, 0..1);
        }
    }

    fn upload(&mut self, ctx: &Context, model: &Model) {
        self.meshes.clear();
        self.textures.clear();
        for (node, mesh, world) in model.meshes() {
            if mesh.geometry.is_empty() {
                log::warn!("Mesh {} has no triangles, skipping", node.name);
                continue;
            }
            let vertex_buffer = ctx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Vertex Buffer", node.name)),
                    contents: bytemuck::cast_slice(&mesh.geometry.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
            let index_buffer = ctx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Index Buffer", node.name)),
                    contents: bytemuck::cast_slice(&mesh.geometry.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
            let instance_buffer = ctx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Instance Buffer", node.name)),
                    contents: bytemuck::cast_slice(&[world.to_raw()]),
                    usage: wgpu::BufferUsages::VERTEX,
                });
            let uniform = MaterialUniform {
                tint: mesh.material().tint().to_linear(),
            };
            let material_buffer = ctx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Material Buffer", node.name)),
                    contents: bytemuck::cast_slice(&[uniform]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
            let bind_group = mk_material_bind_group(ctx, &ctx.blank, &material_buffer, &node.name);

            // Force the first sync to bind the real material state.
            mesh.material_mut().mark_dirty();
            self.meshes.push(GpuMesh {
                name: node.name.clone(),
                vertex_buffer,
                index_buffer,
                num_elements: mesh.geometry.indices.len() as u32,
                instance_buffer,
                material: mesh.material_link(),
                material_buffer,
                bind_group,
                bound_texture: None,
            });
        }
        log::info!("Uploaded {} meshes of {}", self.meshes.len(), model.source);
    }
}

/// The GPU texture for `handle`, uploading it on first use. Pending and failed
/// handles get the blank texture.
fn texture_for<'a>(
    ctx: &'a Context,
    cache: &'a mut HashMap<u64, Texture>,
    handle: Option<&TextureHandle>,
) -> &'a Texture {
    let Some(handle) = handle else {
        return &ctx.blank;
    };
    let Some(image) = handle.image() else {
        return &ctx.blank;
    };
    cache.entry(handle.id()).or_insert_with(|| {
        Texture::from_image(&ctx.device, &ctx.queue, &image, Some(handle.source()))
    })
}

fn mk_material_bind_group(
    ctx: &Context,
    texture: &Texture,
    material_buffer: &wgpu::Buffer,
    label: &str,
) -> wgpu::BindGroup {
    let sampler = texture.sampler.as_ref().unwrap_or(&ctx.sampler);
    ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &ctx.material_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: material_buffer.as_entire_binding(),
            },
        ],
        label: Some(&format!("{label} Material Bind Group")),
    })
}
