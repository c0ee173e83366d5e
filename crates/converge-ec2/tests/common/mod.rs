use async_trait::async_trait;
use converge_ec2::{
    ControlPlane, Ec2Error, IpamPool, IpamPoolCidr, MulticastDomainAssociation, ResourceKind,
    Result, RouteTable, RouteTableAssociation, RouteTablePropagation, TransitGateway,
    TransitGatewayRequest, VpcAttachment,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// In-memory control plane whose objects walk through scripted states.
///
/// Every describe advances an object by one state until the last one, which
/// then sticks. A `None` state means the object is absent.
#[derive(Default)]
pub struct FakeControlPlane {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<String, VecDeque<Option<String>>>,
    gateways: BTreeMap<String, String>,
    reasons: BTreeMap<String, String>,
    scripts: BTreeMap<&'static str, Vec<Option<String>>>,
    failures: BTreeMap<&'static str, VecDeque<(Ec2Error, bool)>>,
    calls: BTreeMap<&'static str, u32>,
    submitted: Vec<Vec<String>>,
    next_id: u32,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn states(script: &[Option<&str>]) -> Vec<Option<String>> {
    script.iter().map(|s| s.map(str::to_string)).collect()
}

fn default_script(op: &str) -> &'static [Option<&'static str>] {
    match op {
        "create_transit_gateway" => &[Some("pending"), Some("pending"), Some("available")],
        "delete_transit_gateway" => &[Some("deleting"), Some("deleted")],
        "associate_route_table" | "associate_multicast_subnets" => {
            &[Some("associating"), Some("associated")]
        }
        "disassociate_route_table" => &[Some("disassociating"), None],
        "disassociate_multicast_subnets" => &[Some("disassociating"), Some("disassociated")],
        "enable_propagation" => &[Some("enabling"), Some("enabled")],
        "disable_propagation" => &[Some("disabling"), None],
        "provision_pool_cidr" => &[Some("pending-provision"), Some("provisioned")],
        "deprovision_pool_cidr" => &[Some("pending-deprovision"), Some("deprovisioned")],
        _ => &[None],
    }
}

pub fn rta_key(route_table_id: &str, attachment_id: &str) -> String {
    format!("rta:{}:{}", route_table_id, attachment_id)
}

pub fn propagation_key(route_table_id: &str, attachment_id: &str) -> String {
    format!("prop:{}:{}", route_table_id, attachment_id)
}

pub fn multicast_key(domain_id: &str, attachment_id: &str, subnet_id: &str) -> String {
    format!("mc:{}:{}:{}", domain_id, attachment_id, subnet_id)
}

pub fn cidr_key(pool_id: &str, cidr: &str) -> String {
    format!("cidr:{}:{}", pool_id, cidr)
}

#[allow(dead_code)]
impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an object in place with the given state progression
    pub fn seed(&self, key: impl Into<String>, script: &[Option<&str>]) {
        let mut state = self.state.lock().unwrap();
        state.objects.insert(key.into(), states(script).into());
    }

    pub fn seed_gateway(&self, id: &str, name: &str, script: &[Option<&str>]) {
        self.seed(id, script);
        let mut state = self.state.lock().unwrap();
        state.gateways.insert(id.to_string(), name.to_string());
    }

    /// Failure detail reported with the object at `key`
    pub fn set_reason(&self, key: impl Into<String>, reason: &str) {
        let mut state = self.state.lock().unwrap();
        state.reasons.insert(key.into(), reason.to_string());
    }

    /// State progression installed by the next calls of a mutating operation
    pub fn script(&self, op: &'static str, script: &[Option<&str>]) {
        let mut state = self.state.lock().unwrap();
        state.scripts.insert(op, states(script));
    }

    /// Make the next call of `op` fail without side effects
    pub fn fail_next(&self, op: &'static str, error: Ec2Error) {
        let mut state = self.state.lock().unwrap();
        state
            .failures
            .entry(op)
            .or_default()
            .push_back((error, false));
    }

    /// Make the next call of `op` take effect and still report `error`, as
    /// when a concurrent writer wins the race
    pub fn fail_next_after_applying(&self, op: &'static str, error: Ec2Error) {
        let mut state = self.state.lock().unwrap();
        state.failures.entry(op).or_default().push_back((error, true));
    }

    pub fn calls(&self, op: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.calls.get(op).copied().unwrap_or(0)
    }

    /// Subnet lists passed to multicast (dis)association calls
    pub fn submitted(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn current(&self, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.objects.get(key).and_then(|s| s.front().cloned().flatten())
    }

    /// Record the call and decide whether it fails and whether it applies
    fn begin(&self, op: &'static str) -> (Option<Ec2Error>, bool) {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(op).or_default() += 1;
        match state.failures.get_mut(op).and_then(VecDeque::pop_front) {
            Some((error, applies)) => (Some(error), applies),
            None => (None, true),
        }
    }

    fn apply(&self, op: &'static str, key: &str) {
        let mut state = self.state.lock().unwrap();
        let script = state
            .scripts
            .get(op)
            .cloned()
            .unwrap_or_else(|| states(default_script(op)));
        state.objects.insert(key.to_string(), script.into());
    }

    fn mutate(&self, op: &'static str, keys: &[String]) -> Result<()> {
        let (error, applies) = self.begin(op);
        if applies {
            for key in keys {
                self.apply(op, key);
            }
        }
        match error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Advance the object at `key` and return its state
    fn advance(&self, op: &'static str, kind: ResourceKind, key: &str) -> Result<String> {
        if let (Some(error), _) = self.begin(op) {
            return Err(error);
        }
        let mut state = self.state.lock().unwrap();
        let current = match state.objects.get_mut(key) {
            Some(script) => {
                if script.len() > 1 {
                    script.pop_front().flatten()
                } else {
                    script.front().cloned().flatten()
                }
            }
            None => None,
        };
        current.ok_or_else(|| Ec2Error::not_found(kind, key))
    }

    fn peek(&self, key: &str) -> Option<String> {
        self.current(key)
    }

    fn reason(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().reasons.get(key).cloned()
    }

    fn gateway(&self, id: &str, state: String) -> TransitGateway {
        let name = self.state.lock().unwrap().gateways.get(id).cloned();
        TransitGateway {
            id: id.to_string(),
            state,
            description: None,
            tags: name
                .into_iter()
                .map(|name| ("Name".to_string(), name))
                .collect(),
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn create_transit_gateway(
        &self,
        request: &TransitGatewayRequest,
    ) -> Result<TransitGateway> {
        let id = {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            format!("tgw-{:04}", state.next_id)
        };
        self.mutate("create_transit_gateway", std::slice::from_ref(&id))?;
        self.state
            .lock()
            .unwrap()
            .gateways
            .insert(id.clone(), request.name.clone());
        let state = self.peek(&id).unwrap_or_default();
        Ok(self.gateway(&id, state))
    }

    async fn describe_transit_gateway(&self, id: &str) -> Result<TransitGateway> {
        let state = self.advance("describe_transit_gateway", ResourceKind::TransitGateway, id)?;
        Ok(self.gateway(id, state))
    }

    async fn find_transit_gateways_by_name(&self, name: &str) -> Result<Vec<TransitGateway>> {
        let ids: Vec<String> = {
            let state = self.state.lock().unwrap();
            state
                .gateways
                .iter()
                .filter(|(_, n)| n.as_str() == name)
                .map(|(id, _)| id.clone())
                .collect()
        };
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                let state = self.peek(&id)?;
                Some(self.gateway(&id, state))
            })
            .collect())
    }

    async fn delete_transit_gateway(&self, id: &str) -> Result<()> {
        self.mutate("delete_transit_gateway", &[id.to_string()])
    }

    async fn describe_vpc_attachment(&self, id: &str) -> Result<VpcAttachment> {
        let state = self.advance(
            "describe_vpc_attachment",
            ResourceKind::VpcAttachment,
            &format!("att:{}", id),
        )?;
        Ok(VpcAttachment {
            id: id.to_string(),
            transit_gateway_id: "tgw-0001".to_string(),
            vpc_id: "vpc-0001".to_string(),
            subnet_ids: Vec::new(),
            state,
        })
    }

    async fn describe_route_table(&self, id: &str) -> Result<RouteTable> {
        let state = self.advance(
            "describe_route_table",
            ResourceKind::RouteTable,
            &format!("rt:{}", id),
        )?;
        Ok(RouteTable {
            id: id.to_string(),
            transit_gateway_id: "tgw-0001".to_string(),
            state,
        })
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> Result<RouteTableAssociation> {
        let key = rta_key(route_table_id, attachment_id);
        self.mutate("associate_route_table", std::slice::from_ref(&key))?;
        Ok(RouteTableAssociation {
            route_table_id: route_table_id.to_string(),
            attachment_id: attachment_id.to_string(),
            state: self.peek(&key).unwrap_or_default(),
        })
    }

    async fn describe_route_table_association(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> Result<RouteTableAssociation> {
        let state = self.advance(
            "describe_route_table_association",
            ResourceKind::RouteTableAssociation,
            &rta_key(route_table_id, attachment_id),
        )?;
        Ok(RouteTableAssociation {
            route_table_id: route_table_id.to_string(),
            attachment_id: attachment_id.to_string(),
            state,
        })
    }

    async fn disassociate_route_table(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> Result<()> {
        self.mutate(
            "disassociate_route_table",
            &[rta_key(route_table_id, attachment_id)],
        )
    }

    async fn enable_propagation(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> Result<RouteTablePropagation> {
        let key = propagation_key(route_table_id, attachment_id);
        self.mutate("enable_propagation", std::slice::from_ref(&key))?;
        Ok(RouteTablePropagation {
            route_table_id: route_table_id.to_string(),
            attachment_id: attachment_id.to_string(),
            state: self.peek(&key).unwrap_or_default(),
        })
    }

    async fn describe_propagation(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> Result<RouteTablePropagation> {
        let state = self.advance(
            "describe_propagation",
            ResourceKind::RouteTablePropagation,
            &propagation_key(route_table_id, attachment_id),
        )?;
        Ok(RouteTablePropagation {
            route_table_id: route_table_id.to_string(),
            attachment_id: attachment_id.to_string(),
            state,
        })
    }

    async fn disable_propagation(&self, route_table_id: &str, attachment_id: &str) -> Result<()> {
        self.mutate(
            "disable_propagation",
            &[propagation_key(route_table_id, attachment_id)],
        )
    }

    async fn associate_multicast_subnets(
        &self,
        domain_id: &str,
        attachment_id: &str,
        subnet_ids: &[String],
    ) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .submitted
            .push(subnet_ids.to_vec());
        let keys: Vec<String> = subnet_ids
            .iter()
            .map(|subnet| multicast_key(domain_id, attachment_id, subnet))
            .collect();
        self.mutate("associate_multicast_subnets", &keys)
    }

    async fn describe_multicast_association(
        &self,
        domain_id: &str,
        attachment_id: &str,
        subnet_id: &str,
    ) -> Result<MulticastDomainAssociation> {
        let state = self.advance(
            "describe_multicast_association",
            ResourceKind::MulticastDomainAssociation,
            &multicast_key(domain_id, attachment_id, subnet_id),
        )?;
        Ok(MulticastDomainAssociation {
            domain_id: domain_id.to_string(),
            attachment_id: attachment_id.to_string(),
            subnet_id: subnet_id.to_string(),
            state,
        })
    }

    async fn disassociate_multicast_subnets(
        &self,
        domain_id: &str,
        attachment_id: &str,
        subnet_ids: &[String],
    ) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .submitted
            .push(subnet_ids.to_vec());
        let keys: Vec<String> = subnet_ids
            .iter()
            .map(|subnet| multicast_key(domain_id, attachment_id, subnet))
            .collect();
        self.mutate("disassociate_multicast_subnets", &keys)
    }

    async fn describe_ipam_pool(&self, id: &str) -> Result<IpamPool> {
        let key = format!("pool:{}", id);
        let state = self.advance("describe_ipam_pool", ResourceKind::IpamPool, &key)?;
        Ok(IpamPool {
            id: id.to_string(),
            state,
            state_message: self.reason(&key),
        })
    }

    async fn provision_pool_cidr(&self, pool_id: &str, cidr: &str) -> Result<IpamPoolCidr> {
        let key = cidr_key(pool_id, cidr);
        self.mutate("provision_pool_cidr", std::slice::from_ref(&key))?;
        Ok(IpamPoolCidr {
            pool_id: pool_id.to_string(),
            cidr: cidr.to_string(),
            state: self.peek(&key).unwrap_or_default(),
            failure_reason: None,
        })
    }

    async fn describe_pool_cidr(&self, pool_id: &str, cidr: &str) -> Result<IpamPoolCidr> {
        let key = cidr_key(pool_id, cidr);
        let state = self.advance("describe_pool_cidr", ResourceKind::IpamPoolCidr, &key)?;
        Ok(IpamPoolCidr {
            pool_id: pool_id.to_string(),
            cidr: cidr.to_string(),
            state,
            failure_reason: self.reason(&key),
        })
    }

    async fn deprovision_pool_cidr(&self, pool_id: &str, cidr: &str) -> Result<()> {
        self.mutate("deprovision_pool_cidr", &[cidr_key(pool_id, cidr)])
    }
}
