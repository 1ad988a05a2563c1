//! Model management and loading infrastructure.

pub mod device;
pub mod gateway;
#[cfg(feature = "local-inference")]
pub mod source;

pub use device::Device;
pub use gateway::{
    GatewaySlot, GatewayStatus, LocalVisionModel, ModelGateway, ModelLoader, ModelSpec, SlotState,
    UnavailableLoader,
};
#[cfg(feature = "local-inference")]
pub use source::{ModelFiles, ModelSource};
