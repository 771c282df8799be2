//! Memoized view creation.

use std::collections::HashMap;

use crate::backend::{BackendResult, GpuDevice, GpuResource, ViewHandle};
use crate::types::ViewDescriptor;

/// Views keyed by the object they view and the view descriptor.
#[derive(Debug, Default)]
pub struct ViewCache {
    views: HashMap<(GpuResource, ViewDescriptor), ViewHandle>,
}

impl ViewCache {
    pub fn get_or_create(
        &mut self,
        device: &dyn GpuDevice,
        object: GpuResource,
        desc: ViewDescriptor,
        name: &str,
    ) -> BackendResult<ViewHandle> {
        if let Some(&view) = self.views.get(&(object, desc)) {
            return Ok(view);
        }

        let view = match &desc {
            ViewDescriptor::ShaderResource(srv) => {
                device.create_shader_resource_view(object, srv, name)?
            }
            ViewDescriptor::UnorderedAccess(uav) => {
                device.create_unordered_access_view(object, uav, name)?
            }
        };
        self.views.insert((object, desc), view);
        Ok(view)
    }

    /// Destroy every cached view of `object`.
    pub fn remove_object(&mut self, device: &dyn GpuDevice, object: GpuResource) {
        self.views.retain(|(viewed, _), view| {
            if *viewed == object {
                device.destroy_view(*view);
                false
            } else {
                true
            }
        });
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
