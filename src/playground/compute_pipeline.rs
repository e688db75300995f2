//! Compute pipelines built from a binding layout
//!
//! One bind group layout and one bind group are shared by every entry point
//! of a program, so auxiliary passes and the main pass see the same resources.

use std::collections::HashMap;

use eframe::wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindingResource, CommandEncoder, ComputePassDescriptor, ComputePipelineDescriptor, Device,
    PipelineCompilationOptions, PipelineLayoutDescriptor, ShaderModuleDescriptor, ShaderSource,
    TextureView, TextureViewDescriptor,
};

use super::bindings::{layout_entries, BindingKind, Bindings};
use super::resources::{GpuResource, ResourceKind, ResourceMap};
use crate::utils::ShaderError;

pub struct ComputePipeline {
    label: String,
    bindings: Bindings,
    bind_group_layout: BindGroupLayout,
    pipelines: HashMap<String, eframe::wgpu::ComputePipeline>,
    bind_group: Option<BindGroup>,
}

impl ComputePipeline {
    /// Create the shader module and one pipeline per entry point.
    pub fn new(device: &Device, label: &str, code: &str, bindings: Bindings, entry_points: &[&str]) -> Self {
        log::debug!("[ComputePipeline] Creating {} ({} entry points)", label, entry_points.len());

        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(label),
            source: ShaderSource::Wgsl(code.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some(&format!("{}_bgl", label)),
            entries: &layout_entries(&bindings),
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(&format!("{}_layout", label)),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipelines = entry_points
            .iter()
            .map(|entry_point| {
                let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
                    label: Some(entry_point),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some(entry_point),
                    compilation_options: PipelineCompilationOptions::default(),
                    cache: None,
                });
                (entry_point.to_string(), pipeline)
            })
            .collect();

        Self {
            label: label.to_string(),
            bindings,
            bind_group_layout,
            pipelines,
            bind_group: None,
        }
    }

    /// Bind every layout entry to its allocated resource.
    pub fn create_bind_group(&mut self, device: &Device, resources: &ResourceMap) -> Result<(), ShaderError> {
        let missing = unbound_resources(&self.bindings, |name| resources.get(name).map(GpuResource::kind));
        if !missing.is_empty() {
            return Err(ShaderError::resource(format!(
                "Cannot create bind-group. The following resources are not bound: {}",
                missing.join(", ")
            )));
        }

        let views: Vec<(u32, TextureView)> = self
            .bindings
            .iter()
            .filter_map(|(name, descriptor)| match resources.get(name) {
                Some(GpuResource::Texture(texture)) => {
                    Some((descriptor.binding, texture.create_view(&TextureViewDescriptor::default())))
                }
                _ => None,
            })
            .collect();

        let mut entries: Vec<BindGroupEntry<'_>> = self
            .bindings
            .iter()
            .filter_map(|(name, descriptor)| match resources.get(name) {
                Some(GpuResource::Buffer(buffer)) => Some(BindGroupEntry {
                    binding: descriptor.binding,
                    resource: buffer.as_entire_binding(),
                }),
                _ => None,
            })
            .collect();
        entries.extend(views.iter().map(|(binding, view)| BindGroupEntry {
            binding: *binding,
            resource: BindingResource::TextureView(view),
        }));

        self.bind_group = Some(device.create_bind_group(&BindGroupDescriptor {
            label: Some(&format!("{}_bg", self.label)),
            layout: &self.bind_group_layout,
            entries: &entries,
        }));
        Ok(())
    }

    /// Record one compute pass for `entry_point`.
    pub fn dispatch(
        &self,
        encoder: &mut CommandEncoder,
        entry_point: &str,
        workgroups: [u32; 3],
    ) -> Result<(), ShaderError> {
        let pipeline = self
            .pipelines
            .get(entry_point)
            .ok_or_else(|| ShaderError::not_ready(format!("no pipeline for {}", entry_point)))?;
        let bind_group = self
            .bind_group
            .as_ref()
            .ok_or_else(|| ShaderError::not_ready("bind group not created"))?;

        let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some(entry_point),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
        Ok(())
    }
}

/// Names of bindings with no compatible resource, in binding-name order.
pub fn unbound_resources(bindings: &Bindings, lookup: impl Fn(&str) -> Option<ResourceKind>) -> Vec<String> {
    bindings
        .iter()
        .filter(|(name, descriptor)| {
            let expected = match descriptor.kind {
                Some(BindingKind::UniformBuffer) | Some(BindingKind::StorageBuffer { .. }) => ResourceKind::Buffer,
                Some(BindingKind::Texture { .. }) | Some(BindingKind::StorageTexture { .. }) => ResourceKind::Texture,
                None => return true,
            };
            lookup(name) != Some(expected)
        })
        .map(|(name, _)| name.clone())
        .collect()
}
