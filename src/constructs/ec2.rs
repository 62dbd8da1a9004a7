//! EC2 networking constructs.

use serde_json::{json, Value as JsonValue};
use std::fmt;

use super::Stack;
use crate::error::{Error, Result};
use crate::template::intrinsic::get_att;
use crate::template::CfnResource;

/// CIDR matching every IPv4 address
pub const ANY_IPV4: &str = "0.0.0.0/0";

/// IP protocol of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// TCP
    Tcp,
    /// UDP
    Udp,
    /// Every protocol
    All,
}

impl Protocol {
    /// Value of `IpProtocol`
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::All => "-1",
        }
    }
}

/// Protocol and port range of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    protocol: Protocol,
    from_port: u16,
    to_port: u16,
}

impl Port {
    /// A single TCP port
    pub fn tcp(port: u16) -> Self {
        Self::tcp_range(port, port)
    }

    /// An inclusive TCP port range
    pub fn tcp_range(from_port: u16, to_port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from_port,
            to_port,
        }
    }

    /// A single UDP port
    pub fn udp(port: u16) -> Self {
        Self {
            protocol: Protocol::Udp,
            from_port: port,
            to_port: port,
        }
    }

    /// Every protocol and port
    pub fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            from_port: 0,
            to_port: 0,
        }
    }

    /// Protocol of the rule
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// First port of the range
    pub fn from_port(&self) -> u16 {
        self.from_port
    }

    /// Last port of the range
    pub fn to_port(&self) -> u16 {
        self.to_port
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.protocol {
            Protocol::All => return write!(f, "ALL TRAFFIC"),
            Protocol::Tcp => "",
            Protocol::Udp => "UDP ",
        };
        if self.from_port == self.to_port {
            write!(f, "{}{}", prefix, self.from_port)
        } else {
            write!(f, "{}{}-{}", prefix, self.from_port, self.to_port)
        }
    }
}

/// Source of inbound traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    cidr: String,
}

impl Peer {
    /// Every IPv4 address
    pub fn any_ipv4() -> Self {
        Self::ipv4(ANY_IPV4)
    }

    /// An IPv4 CIDR block
    pub fn ipv4(cidr: impl Into<String>) -> Self {
        Self { cidr: cidr.into() }
    }

    /// CIDR block of the peer
    pub fn cidr(&self) -> &str {
        &self.cidr
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cidr)
    }
}

/// Properties of a security group
#[derive(Debug, Clone)]
pub struct SecurityGroupProps {
    /// VPC the group belongs to
    pub vpc_id: String,
    /// Group description
    pub description: String,
    /// Add the default allow-all egress rule
    pub allow_all_outbound: bool,
}

/// Handle to a declared security group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroup {
    logical_id: String,
}

impl SecurityGroup {
    /// Declare a security group at `<id>/Resource`
    pub fn new(stack: &mut Stack, id: &str, props: SecurityGroupProps) -> Result<Self> {
        let mut properties = json!({
            "GroupDescription": props.description,
            "VpcId": props.vpc_id,
        });
        if props.allow_all_outbound {
            properties["SecurityGroupEgress"] = json!([{
                "CidrIp": ANY_IPV4,
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": Protocol::All.as_str(),
            }]);
        }

        let logical_id = stack.add_resource(
            &[id, "Resource"],
            CfnResource::new("AWS::EC2::SecurityGroup", properties),
        )?;
        Ok(Self { logical_id })
    }

    /// Logical ID of the group
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// `Fn::GetAtt [sg, GroupId]`
    pub fn security_group_id(&self) -> JsonValue {
        get_att(&self.logical_id, "GroupId")
    }

    /// Append an inline ingress rule
    pub fn add_ingress_rule(&self, stack: &mut Stack, peer: Peer, port: Port) -> Result<()> {
        let mut rule = json!({
            "CidrIp": peer.cidr(),
            "Description": format!("from {}:{}", peer, port),
            "IpProtocol": port.protocol().as_str(),
        });
        if port.protocol() != Protocol::All {
            rule["FromPort"] = json!(port.from_port());
            rule["ToPort"] = json!(port.to_port());
        }

        let resource = stack
            .resource_mut(&self.logical_id)
            .ok_or_else(|| Error::ConstructNotFound(self.logical_id.clone()))?;
        match resource.properties.get_mut("SecurityGroupIngress") {
            Some(JsonValue::Array(rules)) => rules.push(rule),
            _ => resource.properties["SecurityGroupIngress"] = json!([rule]),
        }
        Ok(())
    }
}
