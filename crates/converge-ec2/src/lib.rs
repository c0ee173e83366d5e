//! Converge EC2
//!
//! Drives EC2 transit gateway networking objects to their desired state on
//! top of the converge engine.
//!
//! # Supported Resources
//!
//! - **Transit Gateway**: create (adopting a gateway with the same name) and delete
//! - **Route Table**: association and propagation with an attachment
//! - **Multicast Domain**: subnet associations (fan-out)
//! - **IPAM Pool**: CIDR provisioning and deprovisioning
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │               orchestrator (caller)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                  converge-ec2                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Converger (flows)                       │   │
//! │  │  mutator ──► retry ──► wait / wait_all   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────────────┐     │
//! │  │    Probes    │  │  Presets + profiles  │     │
//! │  └──────┬───────┘  └──────────────────────┘     │
//! └─────────┼───────────────────────────────────────┘
//!           │
//! ┌─────────▼───────────────────────────────────────┐
//! │       trait ControlPlane (EC2 API client)       │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod flows;
pub mod probes;
pub mod provider;
pub mod status;
pub mod waits;

// Re-exports
pub use error::{Ec2Error, FlowError, FlowResult, Result, is_not_found, is_retryable_code};
pub use flows::Converger;
pub use probes::{StatusSnapshot, existing, observe};
pub use provider::{
    ControlPlane, IpamPool, IpamPoolCidr, MulticastDomainAssociation, RouteTable,
    RouteTableAssociation, RouteTablePropagation, TransitGateway, TransitGatewayRequest,
    VpcAttachment,
};
pub use status::{Operation, ResourceKind, profile_name};
pub use waits::{preset, retry_preset};
