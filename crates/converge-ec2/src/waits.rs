//! Built-in wait and retry presets per (kind, operation)
//!
//! Every preset can be overridden through a config profile named
//! `"<kind>.<operation>"` (see [`profile_name`]).

use crate::error::{Ec2Error, FlowError, FlowResult, is_retryable_code};
use crate::status::{
    Operation, ResourceKind, association, ipam_pool, ipam_pool_cidr, profile_name, propagation,
    route_table, transit_gateway, vpc_attachment,
};
use converge_config::ConvergeConfig;
use converge_core::{RetryPolicy, WaitSpec};
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

pub const TRANSIT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const VPC_ATTACHMENT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const ROUTE_TABLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const ROUTE_TABLE_ASSOCIATION_CREATED_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const ROUTE_TABLE_ASSOCIATION_DELETED_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const ROUTE_TABLE_PROPAGATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const IPAM_POOL_TIMEOUT: Duration = Duration::from_secs(20 * 60);
pub const IPAM_POOL_CIDR_TIMEOUT: Duration = Duration::from_secs(20 * 60);
pub const MULTICAST_DOMAIN_ASSOCIATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// How long a mutating call may keep failing with a transient code
pub const INCORRECT_STATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const IPAM_DELAY: Duration = Duration::from_secs(5);

/// Built-in `WaitSpec` for `kind` and `operation`, or `None` when the pair
/// has no wait
pub fn preset(kind: ResourceKind, operation: Operation) -> Option<WaitSpec> {
    use Operation::*;
    use ResourceKind::*;

    let spec = match (kind, operation) {
        (TransitGateway, Create) => {
            WaitSpec::new([transit_gateway::PENDING], [transit_gateway::AVAILABLE])
                .with_timeout(TRANSIT_GATEWAY_TIMEOUT)
        }
        (TransitGateway, Update) => {
            WaitSpec::new([transit_gateway::MODIFYING], [transit_gateway::AVAILABLE])
                .with_timeout(TRANSIT_GATEWAY_TIMEOUT)
        }
        (TransitGateway, Delete) => {
            WaitSpec::until_absent([transit_gateway::AVAILABLE, transit_gateway::DELETING])
                .with_timeout(TRANSIT_GATEWAY_TIMEOUT)
        }

        (VpcAttachment, Create) => WaitSpec::new(
            [vpc_attachment::FAILING, vpc_attachment::PENDING],
            [vpc_attachment::AVAILABLE, vpc_attachment::PENDING_ACCEPTANCE],
        )
        .with_failure([vpc_attachment::FAILED, vpc_attachment::REJECTED])
        .with_timeout(VPC_ATTACHMENT_TIMEOUT),
        (VpcAttachment, Accept) => WaitSpec::new(
            [vpc_attachment::PENDING, vpc_attachment::PENDING_ACCEPTANCE],
            [vpc_attachment::AVAILABLE],
        )
        .with_timeout(VPC_ATTACHMENT_TIMEOUT),
        (VpcAttachment, Update) => {
            WaitSpec::new([vpc_attachment::MODIFYING], [vpc_attachment::AVAILABLE])
                .with_timeout(VPC_ATTACHMENT_TIMEOUT)
        }
        (VpcAttachment, Delete) => WaitSpec::new(
            [
                vpc_attachment::AVAILABLE,
                vpc_attachment::DELETING,
                vpc_attachment::PENDING_ACCEPTANCE,
                vpc_attachment::REJECTING,
            ],
            [vpc_attachment::DELETED],
        )
        .with_not_found_as_target(1)
        .with_timeout(VPC_ATTACHMENT_TIMEOUT),

        (RouteTable, Create) => WaitSpec::new([route_table::PENDING], [route_table::AVAILABLE])
            .with_timeout(ROUTE_TABLE_TIMEOUT),
        (RouteTable, Delete) => {
            WaitSpec::until_absent([route_table::AVAILABLE, route_table::DELETING])
                .with_timeout(ROUTE_TABLE_TIMEOUT)
        }

        (RouteTableAssociation, Create) => {
            WaitSpec::new([association::ASSOCIATING], [association::ASSOCIATED])
                .with_timeout(ROUTE_TABLE_ASSOCIATION_CREATED_TIMEOUT)
        }
        (RouteTableAssociation, Delete) => {
            WaitSpec::until_absent([association::ASSOCIATED, association::DISASSOCIATING])
                .with_not_found_as_target(1)
                .with_timeout(ROUTE_TABLE_ASSOCIATION_DELETED_TIMEOUT)
        }

        (RouteTablePropagation, Create) => {
            WaitSpec::new([propagation::ENABLING], [propagation::ENABLED])
                .with_timeout(ROUTE_TABLE_PROPAGATION_TIMEOUT)
        }
        (RouteTablePropagation, Delete) => WaitSpec::until_absent([propagation::DISABLING])
            .with_timeout(ROUTE_TABLE_PROPAGATION_TIMEOUT),

        (IpamPool, Create) => WaitSpec::new(
            [ipam_pool::CREATE_IN_PROGRESS],
            [ipam_pool::CREATE_COMPLETE],
        )
        .with_failure([ipam_pool::CREATE_FAILED])
        .with_delay(IPAM_DELAY)
        .with_timeout(IPAM_POOL_TIMEOUT),
        (IpamPool, Update) => WaitSpec::new(
            [ipam_pool::MODIFY_IN_PROGRESS],
            [ipam_pool::MODIFY_COMPLETE],
        )
        .with_failure([ipam_pool::MODIFY_FAILED])
        .with_delay(IPAM_DELAY)
        .with_timeout(IPAM_POOL_TIMEOUT),
        (IpamPool, Delete) => WaitSpec::until_absent([ipam_pool::DELETE_IN_PROGRESS])
            .with_failure([ipam_pool::DELETE_FAILED])
            .with_delay(IPAM_DELAY)
            .with_timeout(IPAM_POOL_TIMEOUT),

        (IpamPoolCidr, Create) => WaitSpec::new(
            [ipam_pool_cidr::PENDING_PROVISION],
            [ipam_pool_cidr::PROVISIONED],
        )
        .with_failure([ipam_pool_cidr::FAILED_PROVISION])
        .with_delay(IPAM_DELAY)
        .with_timeout(IPAM_POOL_CIDR_TIMEOUT),
        (IpamPoolCidr, Delete) => WaitSpec::until_absent([
            ipam_pool_cidr::PENDING_DEPROVISION,
            ipam_pool_cidr::PROVISIONED,
        ])
        .with_failure([ipam_pool_cidr::FAILED_DEPROVISION])
        .with_delay(IPAM_DELAY)
        .with_timeout(IPAM_POOL_CIDR_TIMEOUT),

        (MulticastDomainAssociation, Create) => {
            WaitSpec::new([association::ASSOCIATING], [association::ASSOCIATED])
                .with_failure([association::FAILED, association::REJECTED])
                .with_timeout(MULTICAST_DOMAIN_ASSOCIATION_TIMEOUT)
        }
        (MulticastDomainAssociation, Delete) => {
            WaitSpec::until_absent([association::ASSOCIATED, association::DISASSOCIATING])
                .with_timeout(MULTICAST_DOMAIN_ASSOCIATION_TIMEOUT)
        }

        _ => return None,
    };

    Some(spec)
}

/// Built-in retry policy for the mutating call behind `kind` and `operation`
pub fn retry_preset(_kind: ResourceKind, operation: Operation) -> RetryPolicy<Ec2Error> {
    match operation {
        Operation::Delete => RetryPolicy::new(INCORRECT_STATE_TIMEOUT, is_retryable_code),
        _ => RetryPolicy::new(MINUTE, |e: &Ec2Error| e.has_code("IncorrectState")),
    }
}

/// Preset overlaid with the matching config profile
pub fn wait_spec(
    config: &ConvergeConfig,
    kind: ResourceKind,
    operation: Operation,
) -> FlowResult<WaitSpec> {
    let preset =
        preset(kind, operation).ok_or(FlowError::UnsupportedOperation { kind, operation })?;
    Ok(config.wait_spec(&profile_name(kind, operation), preset)?)
}

/// Retry preset overlaid with the matching config profile
pub fn retry_policy(
    config: &ConvergeConfig,
    kind: ResourceKind,
    operation: Operation,
) -> FlowResult<RetryPolicy<Ec2Error>> {
    Ok(config.retry_policy(
        &profile_name(kind, operation),
        retry_preset(kind, operation),
    )?)
}
