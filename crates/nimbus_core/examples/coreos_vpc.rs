//! Builds a CoreOS cluster template inside an existing VPC and prints it.
//!
//! Run with `cargo run -p nimbus_core --example coreos_vpc`.

use nimbus_core::{props, Reference, Serializer, TemplateRegistry, TemplateResult, Value};

const TEMPLATE: &str = "CoreOS Stack";

fn main() -> TemplateResult<()> {
    let registry = TemplateRegistry::new();

    registry.build(TEMPLATE, |t| {
        t.description("Launches a CoreOS cluster")?;

        t.mapping(
            "RegionMap",
            props! {
                "us-east-1" => props! { "AMI" => "ami-8c4e83e4" },
                "us-west-2" => props! { "AMI" => "ami-2d4e371d" },
                "eu-west-1" => props! { "AMI" => "ami-c75b8cb0" },
            },
        )?;

        t.parameter(
            "InstanceType",
            props! {
                "Description" => "EC2 instance type (m1.small, etc).",
                "Type" => "String",
                "Default" => "t1.micro",
            },
        )?;
        t.parameter(
            "ClusterSize",
            props! {
                "Description" => "Number of nodes in cluster (3-12).",
                "Type" => "Number",
                "Default" => "3",
                "MinValue" => "3",
                "MaxValue" => "12",
            },
        )?;
        t.parameter(
            "AllowSSHFrom",
            props! {
                "Description" => "The net block (CIDR) that SSH is available to.",
                "Type" => "String",
                "Default" => "0.0.0.0/0",
            },
        )?;
        t.parameter(
            "VpcId",
            props! {
                "Description" => "VpcId of your existing Virtual Private Cloud (VPC).",
                "Type" => "String",
            },
        )?;
        t.parameter(
            "Subnets",
            props! {
                "Description" => "The list of SubnetIds where the stack will be launched",
                "Type" => "CommaDelimitedList",
            },
        )?;

        let group = t.resource(
            "CoreOSSecurityGroup",
            props! {
                "Type" => "AWS::EC2::SecurityGroup",
                "Properties" => props! {
                    "GroupDescription" => "CoreOS SecurityGroup",
                    "VpcId" => Reference::to("VpcId"),
                    "SecurityGroupIngress" => vec![Value::from(props! {
                        "IpProtocol" => "tcp",
                        "FromPort" => "22",
                        "ToPort" => "22",
                        "CidrIp" => Reference::to("AllowSSHFrom"),
                    })],
                },
            },
        )?;

        let etcd = t.resource(
            "Ingress4001",
            props! {
                "Type" => "AWS::EC2::SecurityGroupIngress",
                "Properties" => props! {
                    "GroupId" => group.attribute("GroupId"),
                    "IpProtocol" => "tcp",
                    "FromPort" => "4001",
                    "ToPort" => "4001",
                    "SourceSecurityGroupId" => group.attribute("GroupId"),
                },
            },
        )?;

        // Peer traffic uses the same rule on another port.
        let peer = t
            .fragment(nimbus_core::Section::Resources, etcd.name())
            .unwrap_or_default()
            .mutate_all([
                (nimbus_core::Path::parse("Properties.FromPort")?, Value::from("7001")),
                (nimbus_core::Path::parse("Properties.ToPort")?, Value::from("7001")),
            ])?;
        t.resource("Ingress7001", peer.into_properties())?;

        t.resource(
            "CoreOSServerAutoScale",
            props! {
                "Type" => "AWS::AutoScaling::AutoScalingGroup",
                "Properties" => props! {
                    "VPCZoneIdentifier" => Reference::to("Subnets"),
                    "LaunchConfigurationName" => Reference::to("CoreOSServerLaunchConfig"),
                    "MinSize" => "3",
                    "MaxSize" => "12",
                    "DesiredCapacity" => Reference::to("ClusterSize"),
                    "Tags" => vec![Value::from(props! {
                        "Key" => "Name",
                        "Value" => Reference::to("AWS::StackName"),
                        "PropagateAtLaunch" => true,
                    })],
                },
            },
        )?;

        t.resource(
            "CoreOSServerLaunchConfig",
            props! {
                "Type" => "AWS::AutoScaling::LaunchConfiguration",
                "Properties" => props! {
                    "ImageId" => props! {
                        "Fn::FindInMap" => vec![
                            Value::from("RegionMap"),
                            Value::from(Reference::to("AWS::Region")),
                            Value::from("AMI"),
                        ],
                    },
                    "InstanceType" => Reference::to("InstanceType"),
                    "SecurityGroups" => vec![Value::from(&group)],
                },
            },
        )?;

        Ok(())
    })?;

    println!("{}", Serializer::output(&registry, TEMPLATE)?);
    Ok(())
}
