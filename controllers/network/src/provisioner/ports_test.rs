//! Unit tests for Ironic port reconciliation
//!
//! Runs the provisioner against `MockIronicClient` and asserts on the
//! resulting port records and on the calls that were made.

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::provisioner::ports::{build_local_link_connection, dedup_nics_by_mac, switchport_matches};
    use crate::provisioner::{PortProvisioner, SwitchPortConfig};
    use crate::test_utils::*;
    use crds::SwitchportMode;
    use ironic_client::{MockIronicClient, PatchOperation};
    use serde_json::json;
    use std::collections::HashMap;

    const NODE: &str = "node-1";

    fn access(vlan: i32) -> SwitchPortConfig {
        SwitchPortConfig {
            mode: SwitchportMode::Access,
            native_vlan: vlan,
            allowed_vlans: vec![],
            mtu: None,
        }
    }

    fn trunk(native: i32, allowed: Vec<i32>, mtu: Option<i32>) -> SwitchPortConfig {
        SwitchPortConfig {
            mode: SwitchportMode::Trunk,
            native_vlan: native,
            allowed_vlans: allowed,
            mtu,
        }
    }

    fn configs(entries: &[(&str, SwitchPortConfig)]) -> HashMap<String, SwitchPortConfig> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_dedup_nics_by_mac() {
        let nics = vec![
            create_test_nic("eth0", "AA:BB:CC:DD:EE:01"),
            create_test_nic("eth0", "aa:bb:cc:dd:ee:01"),
            create_test_nic("eth1", ""),
            create_test_nic("eth2", "aa:bb:cc:dd:ee:02"),
        ];
        let unique = dedup_nics_by_mac(&nics);
        assert_eq!(unique.len(), 2);
        // first seen wins
        assert_eq!(unique[0].mac, "AA:BB:CC:DD:EE:01");
        assert_eq!(unique[1].name, "eth2");
        assert!(dedup_nics_by_mac(&[]).is_empty());
    }

    #[test]
    fn test_build_local_link_connection() {
        let mut nic = create_test_nic_with_lldp("eth0", "aa:bb:cc:dd:ee:01", "00:11:22:33:44:55", "Ethernet1/1");
        let llc = build_local_link_connection(&nic).unwrap();
        assert_eq!(llc.len(), 2);
        assert_eq!(llc["switch_id"], json!("00:11:22:33:44:55"));
        assert_eq!(llc["port_id"], json!("Ethernet1/1"));

        if let Some(lldp) = nic.lldp.as_mut() {
            lldp.switch_system_name = "switch.example.com".to_string();
        }
        let llc = build_local_link_connection(&nic).unwrap();
        assert_eq!(llc["switch_info"], json!("switch.example.com"));

        assert!(build_local_link_connection(&create_test_nic("eth0", "aa:bb:cc:dd:ee:01")).is_none());

        nic.lldp = Some(Default::default());
        assert!(build_local_link_connection(&nic).is_none());
    }

    #[test]
    fn test_switchport_matches() {
        let desired = trunk(100, vec![200, 300], Some(9000));

        assert!(!switchport_matches(None, &desired));
        assert!(!switchport_matches(Some(&json!("trunk")), &desired));
        assert!(switchport_matches(
            Some(&json!({"mode": "trunk", "native_vlan": 100, "allowed_vlans": [200, 300], "mtu": 9000})),
            &desired
        ));
        // numbers decoded as floats still match
        assert!(switchport_matches(
            Some(&json!({"mode": "trunk", "native_vlan": 100.0, "allowed_vlans": [200.0, 300.0], "mtu": 9000.0})),
            &desired
        ));
        // VLAN order is significant
        assert!(!switchport_matches(
            Some(&json!({"mode": "trunk", "native_vlan": 100, "allowed_vlans": [300, 200], "mtu": 9000})),
            &desired
        ));
        assert!(!switchport_matches(
            Some(&json!({"mode": "access", "native_vlan": 100, "allowed_vlans": [200, 300], "mtu": 9000})),
            &desired
        ));
    }

    #[test]
    fn test_switchport_matches_optional_fields() {
        let no_mtu = access(100);
        assert!(switchport_matches(Some(&json!({"mode": "access", "native_vlan": 100})), &no_mtu));
        assert!(!switchport_matches(
            Some(&json!({"mode": "access", "native_vlan": 100, "mtu": 1500})),
            &no_mtu
        ));
        assert!(switchport_matches(
            Some(&json!({"mode": "access", "native_vlan": 100, "allowed_vlans": []})),
            &no_mtu
        ));
        assert!(!switchport_matches(
            Some(&json!({"mode": "access", "native_vlan": 100, "allowed_vlans": [5]})),
            &no_mtu
        ));
        assert!(switchport_matches(Some(&json!({"mode": "access"})), &access(0)));
    }

    #[tokio::test]
    async fn test_ensure_ports_requires_node() {
        let mock = MockIronicClient::new("http://ironic:6385");
        let host = create_test_host("worker-0", "metal3", None, None, vec![]);
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());

        let err = provisioner.ensure_ports(None).await.unwrap_err();
        assert!(matches!(err, ControllerError::NodeNotRegistered(_)));
        assert!(err.to_string().contains("node not registered"));
        assert!(provisioner.ensure_ports(Some("")).await.is_err());
    }

    #[tokio::test]
    async fn test_pxe_port_created_before_inspection() {
        let mock = MockIronicClient::new("http://ironic:6385");
        let host = create_test_host("worker-0", "metal3", Some(NODE), Some("aa:bb:cc:dd:ee:01"), vec![]);
        let provisioner = PortProvisioner::new(&mock, &host, configs(&[("AA:BB:CC:DD:EE:01", access(100))]));

        provisioner.ensure_ports(Some(NODE)).await.unwrap();

        let created = mock.created_ports();
        assert_eq!(created.len(), 1);
        assert!(created[0].pxe_enabled);
        assert_eq!(created[0].address, "aa:bb:cc:dd:ee:01");
        let extra = created[0].extra.as_ref().unwrap();
        assert_eq!(extra["switchport"], json!({"mode": "access", "native_vlan": 100}));
    }

    #[tokio::test]
    async fn test_pxe_port_skipped_when_node_has_port_or_mac_taken() {
        let mock = MockIronicClient::new("http://ironic:6385");
        mock.add_port(create_test_port("port-x", "other-node", "aa:bb:cc:dd:ee:01", true));
        let host = create_test_host("worker-0", "metal3", Some(NODE), Some("aa:bb:cc:dd:ee:01"), vec![]);
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());
        provisioner.ensure_ports(Some(NODE)).await.unwrap();
        assert!(mock.created_ports().is_empty());

        let mock = MockIronicClient::new("http://ironic:6385");
        mock.add_port(create_test_port("port-y", NODE, "aa:bb:cc:dd:ee:09", false));
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());
        provisioner.ensure_ports(Some(NODE)).await.unwrap();
        assert!(mock.created_ports().is_empty());
    }

    #[tokio::test]
    async fn test_ports_created_for_inspected_nics() {
        let mock = MockIronicClient::new("http://ironic:6385");
        let nics = vec![
            create_test_nic_with_lldp("eth0", "aa:bb:cc:dd:ee:01", "00:11:22:33:44:55", "Ethernet1/1"),
            create_test_nic("eth1", "aa:bb:cc:dd:ee:02"),
            create_test_nic("eth1", "AA:BB:CC:DD:EE:02"),
        ];
        let host = create_test_host("worker-0", "metal3", Some(NODE), Some("AA:BB:CC:DD:EE:01"), nics);
        let provisioner = PortProvisioner::new(
            &mock,
            &host,
            configs(&[("eth0", access(100)), ("aa:bb:cc:dd:ee:02", trunk(10, vec![20, 30], Some(9000)))]),
        );

        provisioner.ensure_ports(Some(NODE)).await.unwrap();

        let created = mock.created_ports();
        assert_eq!(created.len(), 2);
        let eth0 = &created[0];
        assert!(eth0.pxe_enabled, "boot MAC match is case-insensitive");
        assert_eq!(eth0.local_link_connection.as_ref().unwrap()["port_id"], json!("Ethernet1/1"));
        assert_eq!(eth0.extra.as_ref().unwrap()["switchport"]["native_vlan"], json!(100));
        let eth1 = &created[1];
        assert!(!eth1.pxe_enabled);
        assert!(eth1.local_link_connection.is_none());
        assert_eq!(
            eth1.extra.as_ref().unwrap()["switchport"],
            json!({"mode": "trunk", "native_vlan": 10, "allowed_vlans": [20, 30], "mtu": 9000})
        );
    }

    #[tokio::test]
    async fn test_existing_port_patched_only_on_divergence() {
        let mock = MockIronicClient::new("http://ironic:6385");
        let mut port = create_test_port("port-1", NODE, "aa:bb:cc:dd:ee:01", true);
        port.extra.insert("switchport".to_string(), json!({"mode": "access", "native_vlan": 100.0}));
        port.local_link_connection.insert("switch_id".to_string(), json!("ff:ff:ff:ff:ff:ff"));
        mock.add_port(port);

        let nics = vec![create_test_nic_with_lldp("eth0", "aa:bb:cc:dd:ee:01", "00:11:22:33:44:55", "Ethernet1/1")];
        let mut host = create_test_host("worker-0", "metal3", Some(NODE), Some("aa:bb:cc:dd:ee:01"), nics);

        // Already converged: no update call at all
        let provisioner = PortProvisioner::new(&mock, &host, configs(&[("eth0", access(100))]));
        provisioner.ensure_ports(Some(NODE)).await.unwrap();
        assert!(mock.port_patches().is_empty());

        // VLAN change replaces the payload; LLDP data on the port is kept
        let provisioner = PortProvisioner::new(&mock, &host, configs(&[("eth0", access(200))]));
        provisioner.ensure_ports(Some(NODE)).await.unwrap();
        let patches = mock.port_patches();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].0, "port-1");
        assert_eq!(
            patches[0].1,
            vec![PatchOperation::Add {
                path: "/extra/switchport".to_string(),
                value: json!({"mode": "access", "native_vlan": 200}),
            }]
        );
        assert_eq!(mock.ports()[0].local_link_connection["switch_id"], json!("ff:ff:ff:ff:ff:ff"));

        // Boot MAC moved away: PXE flag flips and config removal clears the payload
        host.spec.boot_mac_address = Some("aa:bb:cc:dd:ee:99".to_string());
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());
        provisioner.ensure_ports(Some(NODE)).await.unwrap();
        let patches = mock.port_patches();
        assert_eq!(patches.len(), 2);
        let paths: Vec<&str> = patches[1].1.iter().map(PatchOperation::path).collect();
        assert_eq!(paths, vec!["/pxe_enabled", "/extra/switchport"]);
        assert!(matches!(patches[1].1[1], PatchOperation::Remove { .. }));
        let stored = &mock.ports()[0];
        assert!(!stored.pxe_enabled);
        assert!(stored.switchport().is_none());
    }

    #[tokio::test]
    async fn test_link_connection_added_when_missing() {
        let mock = MockIronicClient::new("http://ironic:6385");
        mock.add_port(create_test_port("port-1", NODE, "aa:bb:cc:dd:ee:01", false));
        let nics = vec![create_test_nic_with_lldp("eth0", "aa:bb:cc:dd:ee:01", "00:11:22:33:44:55", "Ethernet1/1")];
        let host = create_test_host("worker-0", "metal3", Some(NODE), None, nics);
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());

        provisioner.ensure_ports(Some(NODE)).await.unwrap();

        let patches = mock.port_patches();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].1[0].path(), "/local_link_connection");
        assert!(mock.ports()[0].has_local_link_connection());
    }

    #[tokio::test]
    async fn test_partial_failure_reports_aggregate() {
        let mock = MockIronicClient::new("http://ironic:6385");
        let nics = vec![
            create_test_nic("eth0", "aa:bb:cc:dd:ee:01"),
            create_test_nic("eth1", "aa:bb:cc:dd:ee:02"),
            create_test_nic("eth2", "aa:bb:cc:dd:ee:03"),
        ];
        mock.fail_port_operations_for("aa:bb:cc:dd:ee:02");
        let host = create_test_host("worker-0", "metal3", Some(NODE), None, nics);
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());

        let err = provisioner.ensure_ports(Some(NODE)).await.unwrap_err();

        let ControllerError::PortReconciliation { failed, total, ref summary } = err else {
            panic!("unexpected error: {}", err);
        };
        assert_eq!((failed, total), (1, 3));
        assert!(summary.starts_with("eth1(aa:bb:cc:dd:ee:02): "));
        assert!(err.to_string().starts_with("failed to ensure 1/3 ports: "));
        // the other NICs were still processed
        assert_eq!(mock.created_ports().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_total_counts_attempted_nics() {
        let mock = MockIronicClient::new("http://ironic:6385");
        let nics = vec![
            create_test_nic("eth0", "aa:bb:cc:dd:ee:01"),
            create_test_nic("eth0.dup", "AA:BB:CC:DD:EE:01"),
            create_test_nic("eth1", "aa:bb:cc:dd:ee:02"),
            create_test_nic("bmc", ""),
        ];
        mock.fail_port_operations_for("aa:bb:cc:dd:ee:01");
        let host = create_test_host("worker-0", "metal3", Some(NODE), None, nics);
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());

        let err = provisioner.ensure_ports(Some(NODE)).await.unwrap_err();

        // duplicate MACs and NICs without a MAC are never attempted
        let ControllerError::PortReconciliation { failed, total, .. } = err else {
            panic!("unexpected error: {}", err);
        };
        assert_eq!((failed, total), (1, 2));
        assert_eq!(mock.created_ports().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_summary_is_capped() {
        let mock = MockIronicClient::new("http://ironic:6385");
        let macs = ["aa:bb:cc:dd:ee:01", "aa:bb:cc:dd:ee:02", "aa:bb:cc:dd:ee:03", "aa:bb:cc:dd:ee:04"];
        let nics = macs
            .iter()
            .enumerate()
            .map(|(i, mac)| {
                mock.fail_port_operations_for(mac);
                create_test_nic(&format!("eth{}", i), mac)
            })
            .collect();
        let host = create_test_host("worker-0", "metal3", Some(NODE), None, nics);
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());

        let err = provisioner.ensure_ports(Some(NODE)).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("failed to ensure 4/4 ports: "));
        assert_eq!(message.matches("; ").count(), 2);
        assert!(!message.contains("eth3"));
    }
}
