//! Create/delete flows
//!
//! Each flow is check-then-act through the idempotent mutator, with the
//! mutating call wrapped in the transient-retry policy, followed by a wait for
//! the object to converge.

use crate::error::{ERR_CODE_ALREADY_ASSOCIATED, Ec2Error, FlowError, FlowResult};
use crate::probes::{
    existing, status_ipam_pool_cidr, status_multicast_association,
    status_route_table_association, status_route_table_propagation, status_transit_gateway,
};
use crate::provider::{
    ControlPlane, IpamPoolCidr, RouteTableAssociation, RouteTablePropagation, TransitGateway,
    TransitGatewayRequest,
};
use crate::status::{Operation, ResourceKind, transit_gateway};
use crate::waits;
use converge_config::ConvergeConfig;
use converge_core::{
    CompositeKey, IdempotentMutator, RetryPolicy, WaitSpec, create_or_associate,
    delete_or_disassociate, retry, wait, wait_all,
};

/// Drives EC2 networking objects to their desired state
pub struct Converger<'a, C: ?Sized> {
    control_plane: &'a C,
    config: ConvergeConfig,
}

impl<'a, C: ControlPlane + ?Sized> Converger<'a, C> {
    pub fn new(control_plane: &'a C) -> Self {
        Self {
            control_plane,
            config: ConvergeConfig::default(),
        }
    }

    /// Override the built-in presets with config profiles
    pub fn with_config(mut self, config: ConvergeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ConvergeConfig {
        &self.config
    }

    fn wait_spec(&self, kind: ResourceKind, operation: Operation) -> FlowResult<WaitSpec> {
        waits::wait_spec(&self.config, kind, operation)
    }

    fn retry_policy(
        &self,
        kind: ResourceKind,
        operation: Operation,
    ) -> FlowResult<RetryPolicy<Ec2Error>> {
        waits::retry_policy(&self.config, kind, operation)
    }

    /// Create a transit gateway, or adopt a live one carrying the same name,
    /// and wait until it is available
    pub async fn create_transit_gateway(
        &self,
        request: &TransitGatewayRequest,
    ) -> FlowResult<TransitGateway> {
        let kind = ResourceKind::TransitGateway;
        let spec = self.wait_spec(kind, Operation::Create)?;
        let policy = &self.retry_policy(kind, Operation::Create)?;
        let cp = self.control_plane;

        let gateway = create_or_associate(
            move || async move {
                let found = cp.find_transit_gateways_by_name(&request.name).await?;
                Ok::<_, FlowError>(found.into_iter().find(|tgw| {
                    tgw.state != transit_gateway::DELETING && tgw.state != transit_gateway::DELETED
                }))
            },
            move || async move {
                tracing::info!("Creating transit gateway: {}", request.name);
                Ok::<_, FlowError>(retry(|| cp.create_transit_gateway(request), policy).await?)
            },
        )
        .await?;

        tracing::debug!("Waiting for transit gateway {} to become available", gateway.id);
        let settled = wait(status_transit_gateway(cp, &gateway.id), &spec)
            .await
            .map_err(|e| FlowError::wait(kind, &gateway.id, Operation::Create, e))?;

        tracing::info!("Transit gateway {} is available", gateway.id);
        Ok(settled.unwrap_or(gateway))
    }

    /// Delete a transit gateway and wait until it is gone
    pub async fn delete_transit_gateway(&self, id: &str) -> FlowResult<()> {
        let kind = ResourceKind::TransitGateway;
        let spec = self.wait_spec(kind, Operation::Delete)?;
        let policy = &self.retry_policy(kind, Operation::Delete)?;
        let cp = self.control_plane;

        delete_or_disassociate(
            move || async move {
                Ok::<_, FlowError>(existing(kind, cp.describe_transit_gateway(id).await)?)
            },
            move || async move {
                tracing::info!("Deleting transit gateway: {}", id);
                retry(|| cp.delete_transit_gateway(id), policy).await?;
                Ok::<_, FlowError>(())
            },
        )
        .await?;

        wait(status_transit_gateway(cp, id), &spec)
            .await
            .map_err(|e| FlowError::wait(kind, id, Operation::Delete, e))?;

        tracing::info!("Transit gateway {} deleted", id);
        Ok(())
    }

    /// Associate a route table with an attachment and wait until the
    /// association is active. Returns the association ID.
    pub async fn associate_route_table(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> FlowResult<CompositeKey> {
        let kind = ResourceKind::RouteTableAssociation;
        let key = CompositeKey::new(&[route_table_id, attachment_id])?;
        let spec = self.wait_spec(kind, Operation::Create)?;
        let policy = &self.retry_policy(kind, Operation::Create)?;
        let cp = self.control_plane;

        IdempotentMutator::new()
            .recheck_on(|e: &FlowError| e.has_code(ERR_CODE_ALREADY_ASSOCIATED))
            .create_or_associate(
                move || async move {
                    Ok::<_, FlowError>(existing(
                        kind,
                        cp.describe_route_table_association(route_table_id, attachment_id)
                            .await,
                    )?)
                },
                move || async move {
                    tracing::info!(
                        "Associating route table {}",
                        key_of(route_table_id, attachment_id)
                    );
                    let association: RouteTableAssociation = retry(
                        || cp.associate_route_table(route_table_id, attachment_id),
                        policy,
                    )
                    .await?;
                    Ok::<_, FlowError>(association)
                },
            )
            .await?;

        wait(
            status_route_table_association(cp, route_table_id, attachment_id),
            &spec,
        )
        .await
        .map_err(|e| FlowError::wait(kind, key.to_string(), Operation::Create, e))?;

        tracing::info!("Route table association {} is active", key);
        Ok(key)
    }

    /// Remove the association `id` (as returned by
    /// [`associate_route_table`](Self::associate_route_table)) and wait until it is gone
    pub async fn disassociate_route_table(&self, id: &str) -> FlowResult<()> {
        let kind = ResourceKind::RouteTableAssociation;
        let key = CompositeKey::parse(id, 2)?;
        let (route_table_id, attachment_id) = (&key.parts()[0], &key.parts()[1]);
        let spec = self.wait_spec(kind, Operation::Delete)?;
        let policy = &self.retry_policy(kind, Operation::Delete)?;
        let cp = self.control_plane;

        IdempotentMutator::new()
            .recheck_on(FlowError::is_not_found)
            .delete_or_disassociate(
                move || async move {
                    Ok::<_, FlowError>(existing(
                        kind,
                        cp.describe_route_table_association(route_table_id, attachment_id)
                            .await,
                    )?)
                },
                move || async move {
                    tracing::info!("Disassociating route table {}", id);
                    retry(
                        || cp.disassociate_route_table(route_table_id, attachment_id),
                        policy,
                    )
                    .await?;
                    Ok::<_, FlowError>(())
                },
            )
            .await?;

        wait(
            status_route_table_association(cp, route_table_id, attachment_id),
            &spec,
        )
        .await
        .map_err(|e| FlowError::wait(kind, id, Operation::Delete, e))?;

        Ok(())
    }

    /// Enable propagation of an attachment's routes into a route table.
    /// Returns the propagation ID.
    pub async fn enable_propagation(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> FlowResult<CompositeKey> {
        let kind = ResourceKind::RouteTablePropagation;
        let key = CompositeKey::new(&[route_table_id, attachment_id])?;
        let spec = self.wait_spec(kind, Operation::Create)?;
        let policy = &self.retry_policy(kind, Operation::Create)?;
        let cp = self.control_plane;

        create_or_associate(
            move || async move {
                Ok::<_, FlowError>(existing(
                    kind,
                    cp.describe_propagation(route_table_id, attachment_id).await,
                )?)
            },
            move || async move {
                tracing::info!(
                    "Enabling propagation {}",
                    key_of(route_table_id, attachment_id)
                );
                let propagation: RouteTablePropagation = retry(
                    || cp.enable_propagation(route_table_id, attachment_id),
                    policy,
                )
                .await?;
                Ok::<_, FlowError>(propagation)
            },
        )
        .await?;

        wait(
            status_route_table_propagation(cp, route_table_id, attachment_id),
            &spec,
        )
        .await
        .map_err(|e| FlowError::wait(kind, key.to_string(), Operation::Create, e))?;

        Ok(key)
    }

    /// Disable the propagation `id` and wait until it is gone.
    ///
    /// A route table deleted in the meantime takes the propagation with it;
    /// its `InvalidRouteTableID.NotFound` answer counts as gone.
    pub async fn disable_propagation(&self, id: &str) -> FlowResult<()> {
        let kind = ResourceKind::RouteTablePropagation;
        let key = CompositeKey::parse(id, 2)?;
        let (route_table_id, attachment_id) = (&key.parts()[0], &key.parts()[1]);
        let spec = self.wait_spec(kind, Operation::Delete)?;
        let policy = &self.retry_policy(kind, Operation::Delete)?;
        let cp = self.control_plane;

        IdempotentMutator::new()
            .recheck_on(FlowError::is_not_found)
            .delete_or_disassociate(
                move || async move {
                    Ok::<_, FlowError>(existing(
                        kind,
                        cp.describe_propagation(route_table_id, attachment_id).await,
                    )?)
                },
                move || async move {
                    tracing::info!("Disabling propagation {}", id);
                    retry(
                        || cp.disable_propagation(route_table_id, attachment_id),
                        policy,
                    )
                    .await?;
                    Ok::<_, FlowError>(())
                },
            )
            .await?;

        wait(
            status_route_table_propagation(cp, route_table_id, attachment_id),
            &spec,
        )
        .await
        .map_err(|e| FlowError::wait(kind, id, Operation::Delete, e))?;

        Ok(())
    }

    /// Associate `subnet_ids` of an attachment with a multicast domain and
    /// wait until every association is active.
    ///
    /// Subnets that are already associated are left alone; the rest are
    /// submitted in one request. Returns one association ID per subnet, in
    /// the order given.
    pub async fn associate_multicast_subnets(
        &self,
        domain_id: &str,
        attachment_id: &str,
        subnet_ids: &[String],
    ) -> FlowResult<Vec<CompositeKey>> {
        let kind = ResourceKind::MulticastDomainAssociation;
        let keys = subnet_ids
            .iter()
            .map(|subnet_id| CompositeKey::new(&[domain_id, attachment_id, subnet_id.as_str()]))
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Ok(keys);
        }

        let spec = self.wait_spec(kind, Operation::Create)?;
        let policy = self.retry_policy(kind, Operation::Create)?;
        let cp = self.control_plane;

        let mut missing = Vec::new();
        for subnet_id in subnet_ids {
            let described = cp
                .describe_multicast_association(domain_id, attachment_id, subnet_id)
                .await;
            if existing(kind, described)?.is_none() {
                missing.push(subnet_id.clone());
            }
        }

        if missing.is_empty() {
            tracing::debug!(
                "All {} subnets already associated with multicast domain {}",
                subnet_ids.len(),
                domain_id
            );
        } else {
            tracing::info!(
                "Associating {} subnets with multicast domain {}",
                missing.len(),
                domain_id
            );
            retry(
                || cp.associate_multicast_subnets(domain_id, attachment_id, &missing),
                &policy,
            )
            .await?;
        }

        let children = subnet_ids
            .iter()
            .zip(&keys)
            .map(|(subnet_id, key)| {
                (
                    key.to_string(),
                    status_multicast_association(cp, domain_id, attachment_id, subnet_id),
                )
            })
            .collect();

        wait_all(children, &spec).await.map_err(|e| {
            FlowError::wait(
                kind,
                key_of(domain_id, attachment_id),
                Operation::Create,
                e,
            )
        })?;

        Ok(keys)
    }

    /// Disassociate `subnet_ids` from a multicast domain and wait until every
    /// association is gone
    pub async fn disassociate_multicast_subnets(
        &self,
        domain_id: &str,
        attachment_id: &str,
        subnet_ids: &[String],
    ) -> FlowResult<()> {
        let kind = ResourceKind::MulticastDomainAssociation;
        if subnet_ids.is_empty() {
            return Ok(());
        }

        let spec = self.wait_spec(kind, Operation::Delete)?;
        let policy = self.retry_policy(kind, Operation::Delete)?;
        let cp = self.control_plane;

        let mut present = Vec::new();
        for subnet_id in subnet_ids {
            let described = cp
                .describe_multicast_association(domain_id, attachment_id, subnet_id)
                .await;
            if existing(kind, described)?.is_some() {
                present.push(subnet_id.clone());
            }
        }

        if present.is_empty() {
            tracing::debug!(
                "No subnets associated with multicast domain {}, nothing to delete",
                domain_id
            );
            return Ok(());
        }

        tracing::info!(
            "Disassociating {} subnets from multicast domain {}",
            present.len(),
            domain_id
        );
        retry(
            || cp.disassociate_multicast_subnets(domain_id, attachment_id, &present),
            &policy,
        )
        .await?;

        let children = present
            .iter()
            .map(|subnet_id| {
                (
                    subnet_id.clone(),
                    status_multicast_association(cp, domain_id, attachment_id, subnet_id),
                )
            })
            .collect();

        wait_all(children, &spec).await.map_err(|e| {
            FlowError::wait(
                kind,
                key_of(domain_id, attachment_id),
                Operation::Delete,
                e,
            )
        })?;

        Ok(())
    }

    /// Provision `cidr` into an IPAM pool and wait until it is provisioned.
    ///
    /// A failed provisioning is reported with the pool's failure reason.
    pub async fn provision_pool_cidr(&self, pool_id: &str, cidr: &str) -> FlowResult<IpamPoolCidr> {
        let kind = ResourceKind::IpamPoolCidr;
        let key = CompositeKey::new(&[pool_id, cidr])?;
        let spec = self.wait_spec(kind, Operation::Create)?;
        let policy = &self.retry_policy(kind, Operation::Create)?;
        let cp = self.control_plane;

        let provisioned = create_or_associate(
            move || async move {
                Ok::<_, FlowError>(existing(kind, cp.describe_pool_cidr(pool_id, cidr).await)?)
            },
            move || async move {
                tracing::info!("Provisioning {} into IPAM pool {}", cidr, pool_id);
                Ok::<_, FlowError>(retry(|| cp.provision_pool_cidr(pool_id, cidr), policy).await?)
            },
        )
        .await?;

        let settled = wait(status_ipam_pool_cidr(cp, pool_id, cidr), &spec)
            .await
            .map_err(|e| FlowError::wait(kind, key.to_string(), Operation::Create, e))?;

        Ok(settled.unwrap_or(provisioned))
    }

    /// Deprovision the pool CIDR `id` (`<pool-id>,<cidr>`) and wait until it is gone
    pub async fn deprovision_pool_cidr(&self, id: &str) -> FlowResult<()> {
        let kind = ResourceKind::IpamPoolCidr;
        let key = CompositeKey::parse(id, 2)?;
        let (pool_id, cidr) = (&key.parts()[0], &key.parts()[1]);
        let spec = self.wait_spec(kind, Operation::Delete)?;
        let policy = &self.retry_policy(kind, Operation::Delete)?;
        let cp = self.control_plane;

        delete_or_disassociate(
            move || async move {
                Ok::<_, FlowError>(existing(kind, cp.describe_pool_cidr(pool_id, cidr).await)?)
            },
            move || async move {
                tracing::info!("Deprovisioning {} from IPAM pool {}", cidr, pool_id);
                retry(|| cp.deprovision_pool_cidr(pool_id, cidr), policy).await?;
                Ok::<_, FlowError>(())
            },
        )
        .await?;

        wait(status_ipam_pool_cidr(cp, pool_id, cidr), &spec)
            .await
            .map_err(|e| FlowError::wait(kind, id, Operation::Delete, e))?;

        Ok(())
    }
}

/// Composite ID for log and error messages; falls back to the raw parts when
/// one of them contains the separator
fn key_of(first: &str, second: &str) -> String {
    CompositeKey::new(&[first, second])
        .map(|key| key.to_string())
        .unwrap_or_else(|_| format!("{} / {}", first, second))
}
