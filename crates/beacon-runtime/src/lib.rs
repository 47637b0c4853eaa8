pub mod gateway;
pub mod registry;
pub mod store;

pub use gateway::{ApiError, ApiResponse, GatewayServer};
pub use registry::{
    Discovery, HealthReport, HeartbeatReceipt, Registry, Removal, ServiceLedger, SweepCoordinator,
    SweepReport,
};
pub use store::MemoryStore;
