// SPDX-License-Identifier: MPL-2.0

use crate::context::Context;
use crate::data::DataObject;
use crate::errors::{BridgeError, BridgeResult, ObjectKind};
use crate::managed::Managed;
use crate::native::{NativeApi, ServiceHandle};
use crate::utils::{cstring, lock};
use std::sync::{Arc, Mutex};
use tracing::debug;

struct ServiceShared {
    api: Arc<dyn NativeApi>,
    type_id: String,
    name: String,
    base: Mutex<Managed<ServiceHandle>>,
}

/// A streaming destination (server, key, protocol)
///
/// Clones share one reference. An output given the service with
/// [`Output::set_service`](super::Output::set_service) keeps a clone; with
/// [`Output::set_owned_service`](super::Output::set_owned_service) it also
/// disposes it.
#[derive(Clone)]
pub struct Service {
    shared: Arc<ServiceShared>,
}

impl Service {
    pub fn create(
        ctx: &Context,
        type_id: &str,
        name: &str,
        settings: Option<&DataObject>,
    ) -> BridgeResult<Self> {
        ctx.ensure_live()?;
        let settings = settings.map(DataObject::handle).transpose()?.unwrap_or_default();
        let handle = ctx
            .api()
            .service_create(&cstring(type_id)?, &cstring(name)?, settings);
        if handle.is_null() {
            return Err(BridgeError::CreationFailed {
                kind: ObjectKind::Service,
                type_id: type_id.to_string(),
            });
        }
        debug!(type_id, name, %handle, "Created service");
        Ok(Self {
            shared: Arc::new(ServiceShared {
                api: ctx.api().clone(),
                type_id: type_id.to_string(),
                name: name.to_string(),
                base: Mutex::new(Managed::wrap(ctx.api().clone(), handle, true)?),
            }),
        })
    }

    pub fn handle(&self) -> BridgeResult<ServiceHandle> {
        lock(&self.shared.base).access()
    }

    pub fn type_id(&self) -> &str {
        &self.shared.type_id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn same_service(&self, other: &Service) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn update(&self, settings: &DataObject) -> BridgeResult<()> {
        self.shared
            .api
            .service_update(self.handle()?, settings.handle()?);
        Ok(())
    }

    /// Whether the destination is configured well enough to try connecting
    pub fn can_try_to_connect(&self) -> BridgeResult<bool> {
        Ok(self.shared.api.service_can_try_to_connect(self.handle()?))
    }

    pub fn dispose(&self) {
        lock(&self.shared.base).release();
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.shared.base).is_released()
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.shared.name)
            .field("type_id", &self.shared.type_id)
            .field("base", &*lock(&self.shared.base))
            .finish()
    }
}
