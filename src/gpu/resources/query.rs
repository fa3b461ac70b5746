use crate::gpu::device::Device;
use crate::gpu::driver::native::{native, Driver};
use crate::gpu::driver::types::NativeHandle;
use crate::gpu::error::Result;
use crate::gpu::structs::QueryKind;
use crate::utils::Handle;

#[derive(Debug)]
pub struct Query {
    kind: QueryKind,
    pub(crate) native: NativeHandle,
}

impl Query {
    #[inline]
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.native
    }
}

impl<D: Driver> Device<D> {
    pub fn make_query(&mut self, name: &str, kind: QueryKind) -> Result<Handle<Query>> {
        let target = native(&self.driver, kind)?;
        let handle = self.driver.create_query(name, target);
        self.register(name, Query { kind, native: handle })
    }

    /// Latest result of a finished query, `None` while it is still pending.
    pub fn query_result(&mut self, query: Handle<Query>) -> Result<Option<u64>> {
        let native = self.objects.get(query)?.native;
        Ok(self.driver.query_result(native))
    }
}
