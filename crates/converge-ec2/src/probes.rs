//! Probe builders over a [`ControlPlane`]
//!
//! Each builder returns a [`Probe`] that describes one object and translates
//! "not found" answers (and states that mean the object is gone) into
//! [`ProbeResult::NotFound`].

use crate::error::{Ec2Error, Result};
use crate::provider::{
    ControlPlane, IpamPool, IpamPoolCidr, MulticastDomainAssociation, RouteTable,
    RouteTableAssociation, RouteTablePropagation, TransitGateway, VpcAttachment,
};
use crate::status::ResourceKind;
use converge_core::{Probe, ProbeResult};

/// A described object that reports a status
pub trait StatusSnapshot {
    fn state(&self) -> &str;

    /// Failure detail reported alongside the status
    fn reason(&self) -> Option<&str> {
        None
    }
}

macro_rules! impl_status_snapshot {
    ($($ty:ty),* $(,)?) => {
        $(impl StatusSnapshot for $ty {
            fn state(&self) -> &str {
                &self.state
            }
        })*
    };
}

impl_status_snapshot!(
    TransitGateway,
    VpcAttachment,
    RouteTable,
    RouteTableAssociation,
    RouteTablePropagation,
    MulticastDomainAssociation,
);

impl StatusSnapshot for IpamPool {
    fn state(&self) -> &str {
        &self.state
    }

    fn reason(&self) -> Option<&str> {
        self.state_message.as_deref()
    }
}

impl StatusSnapshot for IpamPoolCidr {
    fn state(&self) -> &str {
        &self.state
    }

    fn reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}

/// Turn a describe result into a probe observation
pub fn observe<T: StatusSnapshot>(
    kind: ResourceKind,
    described: Result<T>,
) -> Result<ProbeResult<T>> {
    match described {
        Ok(object) if kind.gone_statuses().iter().any(|s| *s == object.state()) => {
            Ok(ProbeResult::NotFound)
        }
        Ok(object) => {
            let status = object.state().to_string();
            let reason = object.reason().map(str::to_string);
            let found = ProbeResult::found(status, object);
            Ok(match reason {
                Some(reason) => found.with_reason(reason),
                None => found,
            })
        }
        Err(e) if e.is_not_found() => Ok(ProbeResult::NotFound),
        Err(e) => Err(e),
    }
}

/// Turn a describe result into the answer of an existence check
pub fn existing<T: StatusSnapshot>(kind: ResourceKind, described: Result<T>) -> Result<Option<T>> {
    Ok(observe(kind, described)?.into_snapshot())
}

pub fn status_transit_gateway<'a, C: ControlPlane + ?Sized>(
    cp: &'a C,
    id: &'a str,
) -> impl Probe<Snapshot = TransitGateway, Error = Ec2Error> + 'a {
    move || async move {
        observe(
            ResourceKind::TransitGateway,
            cp.describe_transit_gateway(id).await,
        )
    }
}

pub fn status_vpc_attachment<'a, C: ControlPlane + ?Sized>(
    cp: &'a C,
    id: &'a str,
) -> impl Probe<Snapshot = VpcAttachment, Error = Ec2Error> + 'a {
    move || async move {
        observe(
            ResourceKind::VpcAttachment,
            cp.describe_vpc_attachment(id).await,
        )
    }
}

pub fn status_route_table<'a, C: ControlPlane + ?Sized>(
    cp: &'a C,
    id: &'a str,
) -> impl Probe<Snapshot = RouteTable, Error = Ec2Error> + 'a {
    move || async move { observe(ResourceKind::RouteTable, cp.describe_route_table(id).await) }
}

pub fn status_route_table_association<'a, C: ControlPlane + ?Sized>(
    cp: &'a C,
    route_table_id: &'a str,
    attachment_id: &'a str,
) -> impl Probe<Snapshot = RouteTableAssociation, Error = Ec2Error> + 'a {
    move || async move {
        observe(
            ResourceKind::RouteTableAssociation,
            cp.describe_route_table_association(route_table_id, attachment_id)
                .await,
        )
    }
}

pub fn status_route_table_propagation<'a, C: ControlPlane + ?Sized>(
    cp: &'a C,
    route_table_id: &'a str,
    attachment_id: &'a str,
) -> impl Probe<Snapshot = RouteTablePropagation, Error = Ec2Error> + 'a {
    move || async move {
        observe(
            ResourceKind::RouteTablePropagation,
            cp.describe_propagation(route_table_id, attachment_id).await,
        )
    }
}

pub fn status_multicast_association<'a, C: ControlPlane + ?Sized>(
    cp: &'a C,
    domain_id: &'a str,
    attachment_id: &'a str,
    subnet_id: &'a str,
) -> impl Probe<Snapshot = MulticastDomainAssociation, Error = Ec2Error> + 'a {
    move || async move {
        observe(
            ResourceKind::MulticastDomainAssociation,
            cp.describe_multicast_association(domain_id, attachment_id, subnet_id)
                .await,
        )
    }
}

pub fn status_ipam_pool<'a, C: ControlPlane + ?Sized>(
    cp: &'a C,
    id: &'a str,
) -> impl Probe<Snapshot = IpamPool, Error = Ec2Error> + 'a {
    move || async move { observe(ResourceKind::IpamPool, cp.describe_ipam_pool(id).await) }
}

pub fn status_ipam_pool_cidr<'a, C: ControlPlane + ?Sized>(
    cp: &'a C,
    pool_id: &'a str,
    cidr: &'a str,
) -> impl Probe<Snapshot = IpamPoolCidr, Error = Ec2Error> + 'a {
    move || async move {
        observe(
            ResourceKind::IpamPoolCidr,
            cp.describe_pool_cidr(pool_id, cidr).await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ipam_pool_cidr, transit_gateway};

    fn cidr(state: &str, failure_reason: Option<&str>) -> IpamPoolCidr {
        IpamPoolCidr {
            pool_id: "ipam-pool-1".to_string(),
            cidr: "10.0.0.0/16".to_string(),
            state: state.to_string(),
            failure_reason: failure_reason.map(str::to_string),
        }
    }

    #[test]
    fn test_not_found_error_is_absence() {
        let described: Result<TransitGateway> = Err(Ec2Error::api(
            "InvalidTransitGatewayID.NotFound",
            "The transitGateway ID 'tgw-1' does not exist",
        ));
        assert!(
            observe(ResourceKind::TransitGateway, described)
                .unwrap()
                .is_not_found()
        );
    }

    #[test]
    fn test_deleted_state_is_absence() {
        let described = Ok(TransitGateway {
            id: "tgw-1".to_string(),
            state: transit_gateway::DELETED.to_string(),
            description: None,
            tags: Default::default(),
        });
        assert!(
            existing(ResourceKind::TransitGateway, described)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_other_errors_propagate() {
        let described: Result<TransitGateway> = Err(Ec2Error::api("UnauthorizedOperation", "no"));
        assert!(observe(ResourceKind::TransitGateway, described).is_err());
    }

    #[test]
    fn test_failure_reason_is_attached() {
        let observed = observe(
            ResourceKind::IpamPoolCidr,
            Ok(cidr(
                ipam_pool_cidr::FAILED_PROVISION,
                Some("CIDR overlaps an existing allocation"),
            )),
        )
        .unwrap();

        match observed {
            ProbeResult::Found { status, reason, .. } => {
                assert_eq!(status, ipam_pool_cidr::FAILED_PROVISION);
                assert_eq!(
                    reason.as_deref(),
                    Some("CIDR overlaps an existing allocation")
                );
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }
}
