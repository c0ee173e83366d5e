//! Control plane trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Control plane abstraction trait
///
/// Read operations return [`Ec2Error::NotFound`](crate::Ec2Error::NotFound)
/// (or an API error whose code ends in `.NotFound`) when the object does not
/// exist. Mutating operations only submit the request; callers wait for the
/// object to converge.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Submit a transit gateway creation
    async fn create_transit_gateway(&self, request: &TransitGatewayRequest)
    -> Result<TransitGateway>;

    async fn describe_transit_gateway(&self, id: &str) -> Result<TransitGateway>;

    /// Transit gateways carrying the `Name` tag `name`, in any state
    async fn find_transit_gateways_by_name(&self, name: &str) -> Result<Vec<TransitGateway>>;

    async fn delete_transit_gateway(&self, id: &str) -> Result<()>;

    async fn describe_vpc_attachment(&self, id: &str) -> Result<VpcAttachment>;

    async fn describe_route_table(&self, id: &str) -> Result<RouteTable>;

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> Result<RouteTableAssociation>;

    async fn describe_route_table_association(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> Result<RouteTableAssociation>;

    async fn disassociate_route_table(&self, route_table_id: &str, attachment_id: &str)
    -> Result<()>;

    async fn enable_propagation(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> Result<RouteTablePropagation>;

    async fn describe_propagation(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> Result<RouteTablePropagation>;

    async fn disable_propagation(&self, route_table_id: &str, attachment_id: &str) -> Result<()>;

    /// Associate several subnets of one attachment with a multicast domain
    async fn associate_multicast_subnets(
        &self,
        domain_id: &str,
        attachment_id: &str,
        subnet_ids: &[String],
    ) -> Result<()>;

    async fn describe_multicast_association(
        &self,
        domain_id: &str,
        attachment_id: &str,
        subnet_id: &str,
    ) -> Result<MulticastDomainAssociation>;

    async fn disassociate_multicast_subnets(
        &self,
        domain_id: &str,
        attachment_id: &str,
        subnet_ids: &[String],
    ) -> Result<()>;

    async fn describe_ipam_pool(&self, id: &str) -> Result<IpamPool>;

    async fn provision_pool_cidr(&self, pool_id: &str, cidr: &str) -> Result<IpamPoolCidr>;

    async fn describe_pool_cidr(&self, pool_id: &str, cidr: &str) -> Result<IpamPoolCidr>;

    async fn deprovision_pool_cidr(&self, pool_id: &str, cidr: &str) -> Result<()>;
}

/// Transit gateway creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitGatewayRequest {
    /// Stored as the `Name` tag and used to find a gateway created by an
    /// earlier, interrupted run
    pub name: String,

    pub description: Option<String>,

    pub amazon_side_asn: Option<u64>,

    pub tags: BTreeMap<String, String>,
}

impl TransitGatewayRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitGateway {
    pub id: String,
    pub state: String,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl TransitGateway {
    pub fn name(&self) -> Option<&str> {
        self.tags.get("Name").map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcAttachment {
    pub id: String,
    pub transit_gateway_id: String,
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    pub id: String,
    pub transit_gateway_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTableAssociation {
    pub route_table_id: String,
    pub attachment_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTablePropagation {
    pub route_table_id: String,
    pub attachment_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MulticastDomainAssociation {
    pub domain_id: String,
    pub attachment_id: String,
    pub subnet_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpamPool {
    pub id: String,
    pub state: String,
    pub state_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpamPoolCidr {
    pub pool_id: String,
    pub cidr: String,
    pub state: String,
    pub failure_reason: Option<String>,
}
