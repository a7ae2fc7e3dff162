//! Service registry: the method table of `PhactoryAPI`.

use crate::schema::*;
use pruntime_wire::MessageSchema;

/// Method names of `PhactoryAPI`.
pub mod method {
    pub const GET_INFO: &str = "GetInfo";
    pub const SYNC_HEADER: &str = "SyncHeader";
    pub const SYNC_PARA_HEADER: &str = "SyncParaHeader";
    pub const SYNC_COMBINED_HEADERS: &str = "SyncCombinedHeaders";
    pub const DISPATCH_BLOCKS: &str = "DispatchBlocks";
    pub const INIT_RUNTIME: &str = "InitRuntime";
    pub const GET_RUNTIME_INFO: &str = "GetRuntimeInfo";
    pub const GET_EGRESS_MESSAGES: &str = "GetEgressMessages";
    pub const CONTRACT_QUERY: &str = "ContractQuery";
    pub const GET_WORKER_STATE: &str = "GetWorkerState";
    pub const ECHO: &str = "Echo";
}

/// One unary method: a name and its request/response schemas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub request: &'static MessageSchema,
    pub response: &'static MessageSchema,
}

impl MethodDescriptor {
    pub const fn new(
        name: &'static str,
        request: &'static MessageSchema,
        response: &'static MessageSchema,
    ) -> Self {
        Self {
            name,
            request,
            response,
        }
    }
}

/// Immutable method table of one service.
#[derive(Debug)]
pub struct ServiceRegistry {
    pub package: &'static str,
    pub service: &'static str,
    pub methods: &'static [MethodDescriptor],
}

impl ServiceRegistry {
    /// Looks a method up by short name (`Echo`) or full path
    /// (`/pruntime_rpc.PhactoryAPI/Echo`).
    pub fn method(&self, name: &str) -> Option<&'static MethodDescriptor> {
        let methods: &'static [MethodDescriptor] = self.methods;
        let short = self.strip_prefix(name).unwrap_or(name);
        methods.iter().find(|m| m.name == short)
    }

    /// Full path of a method: `/package.Service/Method`.
    pub fn full_name(&self, method: &MethodDescriptor) -> String {
        format!("/{}.{}/{}", self.package, self.service, method.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static MethodDescriptor> {
        let methods: &'static [MethodDescriptor] = self.methods;
        methods.iter()
    }

    fn strip_prefix<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix('/')?
            .strip_prefix(self.package)?
            .strip_prefix('.')?
            .strip_prefix(self.service)?
            .strip_prefix('/')
    }
}

/// Methods of the `pruntime_rpc.PhactoryAPI` service.
pub static PHACTORY_API: ServiceRegistry = ServiceRegistry {
    package: "pruntime_rpc",
    service: "PhactoryAPI",
    methods: &[
        MethodDescriptor::new(method::GET_INFO, &EMPTY, &PHACTORY_INFO),
        MethodDescriptor::new(method::SYNC_HEADER, &HEADERS_TO_SYNC, &SYNCED_TO),
        MethodDescriptor::new(method::SYNC_PARA_HEADER, &PARA_HEADERS_TO_SYNC, &SYNCED_TO),
        MethodDescriptor::new(
            method::SYNC_COMBINED_HEADERS,
            &COMBINED_HEADERS_TO_SYNC,
            &HEADERS_SYNCED_TO,
        ),
        MethodDescriptor::new(method::DISPATCH_BLOCKS, &BLOCKS, &SYNCED_TO),
        MethodDescriptor::new(
            method::INIT_RUNTIME,
            &INIT_RUNTIME_REQUEST,
            &INIT_RUNTIME_RESPONSE,
        ),
        MethodDescriptor::new(method::GET_RUNTIME_INFO, &EMPTY, &INIT_RUNTIME_RESPONSE),
        MethodDescriptor::new(
            method::GET_EGRESS_MESSAGES,
            &EMPTY,
            &GET_EGRESS_MESSAGES_RESPONSE,
        ),
        MethodDescriptor::new(
            method::CONTRACT_QUERY,
            &CONTRACT_QUERY_REQUEST,
            &CONTRACT_QUERY_RESPONSE,
        ),
        MethodDescriptor::new(
            method::GET_WORKER_STATE,
            &GET_WORKER_STATE_REQUEST,
            &WORKER_STATE,
        ),
        MethodDescriptor::new(method::ECHO, &ECHO_MESSAGE, &ECHO_MESSAGE),
    ],
};
