//! Status vocabularies and resource kinds
//!
//! The strings are the states the EC2 API reports for each object kind.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod transit_gateway {
    pub const PENDING: &str = "pending";
    pub const AVAILABLE: &str = "available";
    pub const MODIFYING: &str = "modifying";
    pub const DELETING: &str = "deleting";
    pub const DELETED: &str = "deleted";
}

pub mod vpc_attachment {
    pub const INITIATING: &str = "initiating";
    pub const INITIATING_REQUEST: &str = "initiatingRequest";
    pub const PENDING_ACCEPTANCE: &str = "pendingAcceptance";
    pub const ROLLING_BACK: &str = "rollingBack";
    pub const PENDING: &str = "pending";
    pub const AVAILABLE: &str = "available";
    pub const MODIFYING: &str = "modifying";
    pub const DELETING: &str = "deleting";
    pub const DELETED: &str = "deleted";
    pub const FAILED: &str = "failed";
    pub const REJECTED: &str = "rejected";
    pub const REJECTING: &str = "rejecting";
    pub const FAILING: &str = "failing";
}

pub mod route_table {
    pub const PENDING: &str = "pending";
    pub const AVAILABLE: &str = "available";
    pub const DELETING: &str = "deleting";
    pub const DELETED: &str = "deleted";
}

/// Route table associations and multicast domain subnet associations
pub mod association {
    pub const ASSOCIATING: &str = "associating";
    pub const ASSOCIATED: &str = "associated";
    pub const DISASSOCIATING: &str = "disassociating";
    pub const DISASSOCIATED: &str = "disassociated";
    pub const FAILED: &str = "failed";
    pub const REJECTED: &str = "rejected";
}

pub mod propagation {
    pub const ENABLING: &str = "enabling";
    pub const ENABLED: &str = "enabled";
    pub const DISABLING: &str = "disabling";
    pub const DISABLED: &str = "disabled";
}

pub mod ipam_pool {
    pub const CREATE_IN_PROGRESS: &str = "create-in-progress";
    pub const CREATE_COMPLETE: &str = "create-complete";
    pub const CREATE_FAILED: &str = "create-failed";
    pub const MODIFY_IN_PROGRESS: &str = "modify-in-progress";
    pub const MODIFY_COMPLETE: &str = "modify-complete";
    pub const MODIFY_FAILED: &str = "modify-failed";
    pub const DELETE_IN_PROGRESS: &str = "delete-in-progress";
    pub const DELETE_COMPLETE: &str = "delete-complete";
    pub const DELETE_FAILED: &str = "delete-failed";
}

pub mod ipam_pool_cidr {
    pub const PENDING_PROVISION: &str = "pending-provision";
    pub const PROVISIONED: &str = "provisioned";
    pub const FAILED_PROVISION: &str = "failed-provision";
    pub const PENDING_DEPROVISION: &str = "pending-deprovision";
    pub const DEPROVISIONED: &str = "deprovisioned";
    pub const FAILED_DEPROVISION: &str = "failed-deprovision";
}

/// Kinds of objects the resource layer knows how to converge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    TransitGateway,
    VpcAttachment,
    RouteTable,
    RouteTableAssociation,
    RouteTablePropagation,
    IpamPool,
    IpamPoolCidr,
    MulticastDomainAssociation,
}

impl ResourceKind {
    /// Identifier used in profile names
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::TransitGateway => "transit_gateway",
            ResourceKind::VpcAttachment => "vpc_attachment",
            ResourceKind::RouteTable => "route_table",
            ResourceKind::RouteTableAssociation => "route_table_association",
            ResourceKind::RouteTablePropagation => "route_table_propagation",
            ResourceKind::IpamPool => "ipam_pool",
            ResourceKind::IpamPoolCidr => "ipam_pool_cidr",
            ResourceKind::MulticastDomainAssociation => "multicast_domain_association",
        }
    }

    /// Name for messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::TransitGateway => "EC2 Transit Gateway",
            ResourceKind::VpcAttachment => "EC2 Transit Gateway VPC Attachment",
            ResourceKind::RouteTable => "EC2 Transit Gateway Route Table",
            ResourceKind::RouteTableAssociation => "EC2 Transit Gateway Route Table Association",
            ResourceKind::RouteTablePropagation => "EC2 Transit Gateway Route Table Propagation",
            ResourceKind::IpamPool => "IPAM Pool",
            ResourceKind::IpamPoolCidr => "IPAM Pool CIDR",
            ResourceKind::MulticastDomainAssociation => {
                "EC2 Transit Gateway Multicast Domain Association"
            }
        }
    }

    /// Statuses under which a described object counts as gone
    pub(crate) fn gone_statuses(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::TransitGateway => &[transit_gateway::DELETED],
            ResourceKind::VpcAttachment => &[vpc_attachment::DELETED],
            ResourceKind::RouteTable => &[route_table::DELETED],
            ResourceKind::RouteTableAssociation | ResourceKind::MulticastDomainAssociation => {
                &[association::DISASSOCIATED]
            }
            ResourceKind::RouteTablePropagation => &[propagation::DISABLED],
            ResourceKind::IpamPool => &[ipam_pool::DELETE_COMPLETE],
            ResourceKind::IpamPoolCidr => &[ipam_pool_cidr::DEPROVISIONED],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Lifecycle operation a wait follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create, associate, enable or provision
    Create,
    Accept,
    Update,
    /// Delete, disassociate, disable or deprovision
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Accept => "accept",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Config profile name for a (kind, operation) pair, e.g. `transit_gateway.create`
pub fn profile_name(kind: ResourceKind, operation: Operation) -> String {
    format!("{}.{}", kind.as_str(), operation.as_str())
}
